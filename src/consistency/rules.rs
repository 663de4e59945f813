//! Consistency rule catalog
//!
//! Static tables the analyzer checks against. Nothing here depends on
//! runtime state, so analysis of the same Snapshot is always identical.

use serde::{Deserialize, Serialize};

use super::analyzer::{InconsistencyKind, Severity};

/// A consistency rule definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub kind: InconsistencyKind,
    pub name: String,
    pub description: String,
    pub severity: Severity,
}

/// Deprecated field name -> canonical replacement
pub const DEPRECATED_FIELDS: &[(&str, &str)] = &[
    ("qty", "quantity"),
    ("desc", "description"),
    ("img", "imageUrl"),
    ("image", "imageUrl"),
    ("stock", "stockQuantity"),
    ("cost", "costPrice"),
    ("created", "createdAt"),
    ("updated", "updatedAt"),
];

/// Parent-like entities and the role names that should be references
pub const RELATIONSHIP_ROLES: &[(&str, &[&str])] = &[
    ("products", &["brand", "category", "supplier", "vendor"]),
    ("orders", &["customer", "store", "cashier", "employee"]),
    ("orderItems", &["order", "product"]),
    ("inventory", &["product", "location", "warehouse", "supplier"]),
    ("transactions", &["order", "customer", "cashier"]),
];

/// Canonical entity name -> alias that models the same concept
pub const ENTITY_ALIASES: &[(&str, &str)] = &[
    ("customers", "clients"),
    ("products", "items"),
    ("orders", "sales"),
    ("inventory", "stock"),
    ("suppliers", "vendors"),
    ("categories", "productCategories"),
    ("employees", "staff"),
];

/// Words that legitimately end in "at"
pub const AT_SUFFIX_EXEMPT: &[&str] = &[
    "format", "lat", "stat", "chat", "seat", "flat", "repeat", "heat", "boat", "combat", "threat",
];

/// Names that always denote a timestamp
pub const TIMESTAMP_NAMES: &[&str] = &["date", "timestamp"];

/// Suffixes that denote a timestamp (`createdAt`, `deliveryDate`)
pub const TIMESTAMP_SUFFIXES: &[&str] = &["At", "Date"];

/// Names that always denote money
pub const MONETARY_NAMES: &[&str] = &[
    "price", "cost", "total", "subtotal", "amount", "tax", "discount", "balance",
];

/// Suffixes that denote money (`unitPrice`, `grandTotal`)
pub const MONETARY_SUFFIXES: &[&str] = &["Price", "Cost", "Total", "Amount"];

/// Canonical replacement for a deprecated field name
pub fn canonical_field(deprecated: &str) -> Option<&'static str> {
    DEPRECATED_FIELDS
        .iter()
        .find(|(old, _)| *old == deprecated)
        .map(|(_, canonical)| *canonical)
}

/// Reserved relationship roles for a parent-like entity
pub fn relationship_roles(entity: &str) -> &'static [&'static str] {
    RELATIONSHIP_ROLES
        .iter()
        .find(|(name, _)| *name == entity)
        .map(|(_, roles)| *roles)
        .unwrap_or(&[])
}

fn has_suffix_after_lowercase(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| {
        name.strip_suffix(suffix)
            .and_then(|stem| stem.chars().last())
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

/// Does the name imply a timestamp?
pub fn implies_timestamp(name: &str) -> bool {
    TIMESTAMP_NAMES.contains(&name) || has_suffix_after_lowercase(name, TIMESTAMP_SUFFIXES)
}

/// Does the name imply a monetary value?
pub fn implies_money(name: &str) -> bool {
    MONETARY_NAMES.contains(&name) || has_suffix_after_lowercase(name, MONETARY_SUFFIXES)
}

/// The full rule catalog, for listing
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "C001".to_string(),
            kind: InconsistencyKind::FieldNaming,
            name: "camelCase Field Names".to_string(),
            description: "Field names must start with a lowercase letter and contain only letters and digits".to_string(),
            severity: Severity::Low,
        },
        Rule {
            id: "C002".to_string(),
            kind: InconsistencyKind::FieldNaming,
            name: "Timestamp Suffix".to_string(),
            description: "Timestamp fields end in a capitalized 'At' (createdAt, not createdat)".to_string(),
            severity: Severity::Medium,
        },
        Rule {
            id: "C003".to_string(),
            kind: InconsistencyKind::DuplicateField,
            name: "Deprecated Duplicate Field".to_string(),
            description: "A deprecated field and its canonical replacement must not coexist".to_string(),
            severity: Severity::High,
        },
        Rule {
            id: "C004".to_string(),
            kind: InconsistencyKind::TypeMisuse,
            name: "Dynamic Field".to_string(),
            description: "Fields typed 'any' should use a structured type".to_string(),
            severity: Severity::Medium,
        },
        Rule {
            id: "C005".to_string(),
            kind: InconsistencyKind::TypeMisuse,
            name: "Timestamp Type".to_string(),
            description: "Fields named like timestamps must be typed date".to_string(),
            severity: Severity::Medium,
        },
        Rule {
            id: "C006".to_string(),
            kind: InconsistencyKind::TypeMisuse,
            name: "Monetary Type".to_string(),
            description: "Fields named like money must be typed number".to_string(),
            severity: Severity::High,
        },
        Rule {
            id: "C007".to_string(),
            kind: InconsistencyKind::MissingRelationship,
            name: "Free-text Relationship".to_string(),
            description: "Relationship roles on parent entities must be reference fields, not strings".to_string(),
            severity: Severity::High,
        },
        Rule {
            id: "C008".to_string(),
            kind: InconsistencyKind::DuplicateEntity,
            name: "Duplicate Entity".to_string(),
            description: "Two entities must not model the same concept".to_string(),
            severity: Severity::High,
        },
    ]
}
