//! Riskcat Migration - domain template upgrades
//!
//! - [`diff_risk_definition`] compares two versions of a risk definition
//!   positionally and reports typed [`RiskDefinitionChange`]s
//! - [`MigrationOrchestrator`] cross-checks those changes and the element
//!   type definitions against live client data and either migrates the
//!   domain or blocks with the full list of [`BreakingChange`]s
//!
//! # Example
//!
//! ```rust
//! use riskcat_migration::prelude::*;
//! use riskcat_model::prelude::*;
//! use std::collections::BTreeSet;
//!
//! let template = DomainTemplate::new("demo", TemplateVersion::new(1, 0, 0));
//! let domain = Domain::from_template(&template);
//! let target = DomainTemplate::new("demo", TemplateVersion::new(1, 1, 0));
//!
//! let outcome = MigrationOrchestrator::new()
//!     .evaluate(&domain, &target, &[], &BTreeSet::new())
//!     .unwrap();
//! assert_eq!(outcome.new_domain().unwrap().template_version, target.version);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod breaking;
pub mod change;
pub mod compatibility;
pub mod differ;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use breaking::BreakingChange;
pub use change::{
    ChangeEffect, ChangeKind, ChangeSet, ChangeTarget, MatrixDimension, RiskDefinitionChange,
};
pub use compatibility::{attribute_change, is_compatible, AttributeChange};
pub use differ::{diff_risk_definition, new_risk_definition};
pub use error::MigrationError;
pub use orchestrator::{MigrationOrchestrator, MigrationOutcome};
pub use state::{allowed_transitions, validate_transition, MigrationState, Trail};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for migration
    pub use crate::{
        diff_risk_definition, BreakingChange, ChangeKind, ChangeSet, MigrationOrchestrator,
        MigrationOutcome, MigrationState, RiskDefinitionChange,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
