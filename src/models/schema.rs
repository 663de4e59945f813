//! Canonical schema element types
//!
//! These are the building blocks every Snapshot is made of. They are plain
//! values: the builder creates them, everything downstream only reads them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Semantic type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Json,
    /// Untyped ("any") field in the source schema language
    Dynamic,
    Reference,
}

impl FieldType {
    /// Parse a source type name. Unknown names map to `Dynamic`.
    pub fn parse(raw: &str) -> Self {
        Self::parse_known(raw).unwrap_or(FieldType::Dynamic)
    }

    /// Parse a source type name, returning `None` for unknown names
    pub fn parse_known(raw: &str) -> Option<Self> {
        let ty = match raw.trim().to_lowercase().as_str() {
            "string" | "text" => FieldType::String,
            "number" | "integer" | "float" => FieldType::Number,
            "boolean" | "bool" => FieldType::Boolean,
            "date" | "datetime" | "timestamp" => FieldType::Date,
            "json" | "object" => FieldType::Json,
            "dynamic" | "any" => FieldType::Dynamic,
            "reference" | "ref" => FieldType::Reference,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Json => "json",
            FieldType::Dynamic => "dynamic",
            FieldType::Reference => "reference",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub optional: bool,
    pub indexed: bool,
    /// Always implies `indexed`
    pub unique: bool,
}

impl FieldSpec {
    /// Create a field, normalizing `unique` so it always implies `indexed`
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        optional: bool,
        indexed: bool,
        unique: bool,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            optional,
            indexed: indexed || unique,
            unique,
        }
    }

    /// Required, unindexed field of the given type
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, false, false, false)
    }
}

/// An entity and its fields, ordered by field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySpec {
    pub name: String,
    pub fields: BTreeMap<String, FieldSpec>,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Relationship cardinality on one side of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::One => f.write_str("one"),
            Cardinality::Many => f.write_str("many"),
        }
    }
}

/// One side of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSide {
    pub entity: String,
    pub cardinality: Cardinality,
    pub label: String,
}

impl fmt::Display for RelationshipSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.entity, self.label, self.cardinality)
    }
}

/// A named link between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSpec {
    pub name: String,
    pub forward: RelationshipSide,
    pub reverse: RelationshipSide,
}

impl RelationshipSpec {
    /// Does either side of this relationship point at `entity`?
    pub fn touches(&self, entity: &str) -> bool {
        self.forward.entity == entity || self.reverse.entity == entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_parse() {
        assert_eq!(FieldType::parse("string"), FieldType::String);
        assert_eq!(FieldType::parse("ANY"), FieldType::Dynamic);
        assert_eq!(FieldType::parse("ref"), FieldType::Reference);
        assert_eq!(FieldType::parse("timestamp"), FieldType::Date);
        assert_eq!(FieldType::parse("mystery"), FieldType::Dynamic);
        assert_eq!(FieldType::parse_known("mystery"), None);
    }

    #[test]
    fn test_unique_implies_indexed() {
        let field = FieldSpec::new("sku", FieldType::String, false, false, true);
        assert!(field.unique);
        assert!(field.indexed);
    }

    #[test]
    fn test_field_type_serializes_lowercase() {
        let field = FieldSpec::required("total", FieldType::Number);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "number");
        assert_eq!(json["optional"], false);
    }
}
