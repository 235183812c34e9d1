//! Model errors

use crate::ids::ItemId;

/// Errors raised while building or validating model values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Version string is not `major.minor.patch`
    #[error("invalid template version: {0}")]
    InvalidVersion(String),

    /// Two template items share the same symbolic id
    #[error("duplicate template item: {0}")]
    DuplicateItem(ItemId),

    /// Risk definition failed structural validation
    #[error("invalid risk definition '{id}': {reason}")]
    InvalidRiskDefinition { id: String, reason: String },

    /// Unknown enumeration literal
    #[error("unknown {kind}: {value}")]
    UnknownLiteral { kind: &'static str, value: String },
}

impl ModelError {
    pub(crate) fn invalid_risk_definition(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRiskDefinition {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}
