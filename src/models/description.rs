//! Schema description input
//!
//! The read-only description of the entity store's schema, as exported by
//! that service. This is the only input the Snapshot Builder accepts.

use crate::error::EngineResult;
use crate::models::schema::Cardinality;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Field definition as written in the description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Source type name; missing or unknown types become `dynamic`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub unique: bool,
}

impl FieldDefinition {
    pub fn typed(field_type: impl Into<String>) -> Self {
        Self {
            field_type: Some(field_type.into()),
            ..Default::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// One side of a link in the description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSide {
    #[serde(alias = "on")]
    pub entity: String,
    #[serde(alias = "has")]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub label: String,
}

impl LinkSide {
    pub fn new(entity: impl Into<String>, cardinality: Cardinality, label: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            cardinality,
            label: label.into(),
        }
    }
}

/// Link definition in the description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefinition {
    pub forward: LinkSide,
    pub reverse: LinkSide,
}

/// Entity name -> field name -> definition
pub type EntityDefinitions = BTreeMap<String, BTreeMap<String, FieldDefinition>>;

/// Full schema description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    #[serde(default)]
    pub entities: EntityDefinitions,
    #[serde(default, alias = "relationships")]
    pub links: BTreeMap<String, LinkDefinition>,
}

impl SchemaDescription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entity with the given fields
    pub fn with_entity<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldDefinition)>,
        S: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(field, def)| (field.into(), def))
            .collect();
        self.entities.insert(name.into(), fields);
        self
    }

    /// Add (or replace) a link
    pub fn with_link(mut self, name: impl Into<String>, forward: LinkSide, reverse: LinkSide) -> Self {
        self.links.insert(name.into(), LinkDefinition { forward, reverse });
        self
    }

    /// Parse a description from JSON text
    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read a description from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_aliases_and_defaults() {
        let raw = r#"{
            "entities": {
                "orders": { "total": { "type": "number" }, "note": {} },
                "customers": { "email": { "type": "string", "unique": true } }
            },
            "relationships": {
                "orderCustomer": {
                    "forward": { "on": "orders", "has": "one", "label": "customer" },
                    "reverse": { "entity": "customers", "cardinality": "many", "label": "orders" }
                }
            }
        }"#;

        let description = SchemaDescription::from_json_str(raw).unwrap();
        let orders = &description.entities["orders"];
        assert_eq!(orders["total"].field_type.as_deref(), Some("number"));
        assert_eq!(orders["note"], FieldDefinition::default());
        assert!(description.entities["customers"]["email"].unique);

        let link = &description.links["orderCustomer"];
        assert_eq!(link.forward.entity, "orders");
        assert_eq!(link.forward.cardinality, Cardinality::One);
        assert_eq!(link.reverse.cardinality, Cardinality::Many);
    }

    #[test]
    fn test_unknown_cardinality_is_rejected() {
        let raw = r#"{ "entities": {}, "links": { "x": {
            "forward": { "entity": "a", "cardinality": "several" },
            "reverse": { "entity": "b", "cardinality": "one" } } } }"#;
        assert!(SchemaDescription::from_json_str(raw).is_err());
    }
}
