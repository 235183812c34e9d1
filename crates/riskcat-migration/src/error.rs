//! Error types for migration
//!
//! Breaking changes are not errors: a blocked migration is a regular
//! outcome. These errors mean the migration could not be evaluated at all.

use crate::state::MigrationState;
use riskcat_model::{ModelError, TemplateVersion};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Target template carries an inconsistent risk definition
    #[error("invalid domain template: {0}")]
    InvalidTemplate(#[from] ModelError),

    /// State machine was driven out of order
    #[error("illegal migration transition: {from} -> {to}")]
    IllegalTransition {
        from: MigrationState,
        to: MigrationState,
    },

    /// Target template is older than the domain's
    #[error("cannot migrate domain from template {current} down to {target}")]
    Downgrade {
        current: TemplateVersion,
        target: TemplateVersion,
    },
}
