//! Custom attribute compatibility

use riskcat_model::AttributeDefinition;
use serde::{Deserialize, Serialize};

/// How an attribute definition changed between template versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeChange {
    Removal,
    Modification,
}

/// Whether every value valid under `old` stays valid under `new`
#[must_use]
pub fn is_compatible(old: &AttributeDefinition, new: &AttributeDefinition) -> bool {
    match (old, new) {
        (
            AttributeDefinition::Enum { allowed_values: old },
            AttributeDefinition::Enum { allowed_values: new },
        ) => old.iter().all(|v| new.contains(v)),
        (AttributeDefinition::List { item: old }, AttributeDefinition::List { item: new }) => {
            is_compatible(old, new)
        }
        _ => old == new,
    }
}

/// Change of an attribute, `None` when values carry over
#[must_use]
pub fn attribute_change(
    old: &AttributeDefinition,
    new: Option<&AttributeDefinition>,
) -> Option<AttributeChange> {
    match new {
        None => Some(AttributeChange::Removal),
        Some(new) if !is_compatible(old, new) => Some(AttributeChange::Modification),
        Some(_) => None,
    }
}
