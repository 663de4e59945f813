//! Snapshot Builder
//!
//! Turns a schema description into an immutable, checksummed Snapshot.
//! Think of this as "git commit" for the data model: every other component
//! only ever works on Snapshots.

use crate::error::{EngineError, EngineResult};
use crate::models::{
    EntitySpec, FieldDefinition, FieldSpec, FieldType, LinkSide, RelationshipSide,
    RelationshipSpec, SchemaDescription,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Point-in-time structural representation of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    id: Uuid,
    timestamp: DateTime<Utc>,
    version: String,
    entities: BTreeMap<String, EntitySpec>,
    relationships: BTreeMap<String, RelationshipSpec>,
    checksum: String,
}

impl Snapshot {
    /// Assemble a snapshot from already-canonical parts.
    ///
    /// Fails with `MalformedRelationship` if a relationship side references
    /// an entity that is not part of `entities`.
    pub fn from_parts(
        version: impl Into<String>,
        entities: BTreeMap<String, EntitySpec>,
        relationships: BTreeMap<String, RelationshipSpec>,
    ) -> EngineResult<Self> {
        for relationship in relationships.values() {
            for side in [&relationship.forward, &relationship.reverse] {
                if !entities.contains_key(&side.entity) {
                    return Err(EngineError::MalformedRelationship {
                        relationship: relationship.name.clone(),
                        entity: side.entity.clone(),
                    });
                }
            }
        }

        let checksum = Self::compute_checksum(&entities, &relationships);

        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            version: version.into(),
            entities,
            relationships,
            checksum,
        })
    }

    /// An empty baseline, used when no previous snapshot exists
    pub fn empty(version: impl Into<String>) -> Self {
        let entities = BTreeMap::new();
        let relationships = BTreeMap::new();
        let checksum = Self::compute_checksum(&entities, &relationships);
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            version: version.into(),
            entities,
            relationships,
            checksum,
        }
    }

    /// Compute checksum from schema content.
    ///
    /// Entities, fields and relationships are visited in name order, so two
    /// descriptions with the same content always hash the same. Identity,
    /// timestamp and version label are not part of the content. Every record
    /// is a tag byte followed by length-prefixed components, so no choice of
    /// names or labels can make two different structures hash alike.
    pub fn compute_checksum(
        entities: &BTreeMap<String, EntitySpec>,
        relationships: &BTreeMap<String, RelationshipSpec>,
    ) -> String {
        let mut hasher = Sha256::new();

        for (name, entity) in entities {
            hash_record(&mut hasher, b'E', &[name.as_str()]);
            for field in entity.fields.values() {
                hash_record(
                    &mut hasher,
                    b'F',
                    &[
                        name.as_str(),
                        field.name.as_str(),
                        field.field_type.as_str(),
                        flag(field.optional),
                        flag(field.indexed),
                        flag(field.unique),
                    ],
                );
            }
        }

        for relationship in relationships.values() {
            let forward = relationship.forward.cardinality.to_string();
            let reverse = relationship.reverse.cardinality.to_string();
            hash_record(
                &mut hasher,
                b'R',
                &[
                    relationship.name.as_str(),
                    relationship.forward.entity.as_str(),
                    forward.as_str(),
                    relationship.forward.label.as_str(),
                    relationship.reverse.entity.as_str(),
                    reverse.as_str(),
                    relationship.reverse.label.as_str(),
                ],
            );
        }

        format!("{:x}", hasher.finalize())
    }

    /// Recompute the checksum and compare it with the stored one
    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.entities, &self.relationships) == self.checksum
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn entities(&self) -> &BTreeMap<String, EntitySpec> {
        &self.entities
    }

    pub fn relationships(&self) -> &BTreeMap<String, RelationshipSpec> {
        &self.relationships
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.entities.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipSpec> {
        self.relationships.get(name)
    }

    pub fn field_count(&self) -> usize {
        self.entities.values().map(EntitySpec::field_count).sum()
    }
}

fn hash_record(hasher: &mut Sha256, tag: u8, parts: &[&str]) {
    hasher.update([tag]);
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Builds Snapshots from schema descriptions
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Build an immutable Snapshot from a description
    pub fn build(description: &SchemaDescription, version: impl Into<String>) -> EngineResult<Snapshot> {
        let entities: BTreeMap<String, EntitySpec> = description
            .entities
            .iter()
            .map(|(name, fields)| {
                let mut entity = EntitySpec::new(name.clone());
                for (field_name, definition) in fields {
                    entity = entity.with_field(Self::field_from_definition(name, field_name, definition));
                }
                (name.clone(), entity)
            })
            .collect();

        let relationships: BTreeMap<String, RelationshipSpec> = description
            .links
            .iter()
            .map(|(name, link)| {
                (
                    name.clone(),
                    RelationshipSpec {
                        name: name.clone(),
                        forward: Self::side_from_link(&link.forward),
                        reverse: Self::side_from_link(&link.reverse),
                    },
                )
            })
            .collect();

        let snapshot = Snapshot::from_parts(version, entities, relationships)?;

        debug!(
            "Built snapshot '{}': {} entities, {} fields, {} relationships, checksum {}",
            snapshot.version(),
            snapshot.entities().len(),
            snapshot.field_count(),
            snapshot.relationships().len(),
            &snapshot.checksum()[..12]
        );

        Ok(snapshot)
    }

    fn field_from_definition(entity: &str, name: &str, definition: &FieldDefinition) -> FieldSpec {
        let field_type = definition
            .field_type
            .as_deref()
            .map(FieldType::parse)
            .unwrap_or(FieldType::Dynamic);

        if definition.unique && !definition.indexed {
            debug!("{}.{} is unique but not indexed; marking it indexed", entity, name);
        }

        FieldSpec::new(
            name,
            field_type,
            definition.optional,
            definition.indexed,
            definition.unique,
        )
    }

    fn side_from_link(side: &LinkSide) -> RelationshipSide {
        RelationshipSide {
            entity: side.entity.clone(),
            cardinality: side.cardinality,
            label: side.label.clone(),
        }
    }
}
