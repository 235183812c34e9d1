//! Error types for the catalog service
//!
//! Wraps the errors of every layer so callers handle one type and classify
//! it with [`CoreError::is_not_found`], [`CoreError::is_retryable`] and
//! [`CoreError::is_integrity`].

use crate::config::ConfigError;
use riskcat_incarnation::{ApplyError, RepositoryError, ResolveError};
use riskcat_migration::MigrationError;
use riskcat_model::ModelError;

/// Main service error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model data is inconsistent
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Request could not be resolved
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Plan could not be applied, nothing was written
    #[error("apply failed: {0}")]
    Apply(#[from] ApplyError),

    /// Repository failure outside resolve/apply
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Migration could not be evaluated
    #[error("migration failed: {0}")]
    Migration(#[from] MigrationError),
}

impl CoreError {
    /// Repository error at the root, whichever layer reported it
    fn repository(&self) -> Option<&RepositoryError> {
        match self {
            Self::Repository(e)
            | Self::Resolve(ResolveError::Repository(e))
            | Self::Apply(ApplyError::Repository(e)) => Some(e),
            _ => None,
        }
    }

    /// Check if an addressed entity does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Resolve(ResolveError::ItemNotFound(_))
                | Self::Apply(
                    ApplyError::UnitNotFound(_)
                        | ApplyError::ItemNotFound(_)
                        | ApplyError::ElementNotFound(_)
                )
        ) || matches!(
            self.repository(),
            Some(RepositoryError::UnitNotFound(_) | RepositoryError::ElementNotFound(_))
        )
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.repository().is_some_and(RepositoryError::is_retryable)
    }

    /// Check if error is a data integrity or constraint violation
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::Model(_)
                | Self::Apply(
                    ApplyError::MissingTarget { .. }
                        | ApplyError::InvalidSubType { .. }
                        | ApplyError::ModelConsistency(_)
                        | ApplyError::InvalidRiskValue { .. }
                        | ApplyError::ForeignElement { .. }
                )
                | Self::Migration(MigrationError::InvalidTemplate(_))
        ) || self
            .repository()
            .is_some_and(RepositoryError::is_constraint_violation)
    }
}
