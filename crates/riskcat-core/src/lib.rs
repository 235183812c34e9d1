//! Riskcat Core - catalog service facade
//!
//! Wires the incarnation and migration engines to a repository:
//! - [`CoreConfig`] loaded from TOML with per-section defaults
//! - [`CatalogService`] exposing resolve, apply, diff and migrate
//! - [`CoreError`] wrapping every layer's error with classification helpers
//!
//! # Example
//!
//! ```rust
//! use riskcat_core::prelude::*;
//! use riskcat_model::prelude::*;
//!
//! let service = CatalogService::in_memory(CoreConfig::new());
//! let template = DomainTemplate::new("demo", TemplateVersion::new(1, 0, 0));
//! let domain = Domain::from_template(&template);
//!
//! let target = DomainTemplate::new("demo", TemplateVersion::new(1, 0, 1));
//! let outcome = service
//!     .evaluate_migration(&domain, &target, &Default::default())
//!     .unwrap();
//! assert!(outcome.is_migrated());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod service;

pub use config::{
    ConfigError, CoreConfig, IncarnationSettings, MigrationSettings, RepositorySettings,
};
pub use error::CoreError;
pub use service::CatalogService;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for the service
    pub use crate::{CatalogService, CoreConfig, CoreError};
    pub use riskcat_incarnation::{IncarnationPlan, IncarnationRequest};
    pub use riskcat_migration::{ChangeKind, MigrationOutcome};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
