//! Riskcat Incarnation - materialize catalog items as elements
//!
//! Two steps, with the caller in between:
//! - [`IncarnationResolver`] expands requested items into an
//!   [`IncarnationPlan`] (create vs reuse, resolved references, creation order)
//! - [`IncarnationApplier`] creates the elements and wires their relations in
//!   one repository commit
//!
//! # Example
//!
//! ```rust
//! use riskcat_incarnation::prelude::*;
//! use riskcat_model::prelude::*;
//!
//! let mut domain = Domain::from_template(&DomainTemplate::new("demo", TemplateVersion::new(1, 0, 0)));
//! let control = TemplateItem::catalog(domain.id, "Backup", ElementType::Control);
//! let item = control.id;
//! domain.catalog_items.push(control);
//! let graph = domain.graph().unwrap();
//!
//! let repository = InMemoryRepository::new();
//! let unit = Unit::new(UnitId::new(), "unit", vec![domain.id]);
//! repository.insert_unit(unit.clone());
//!
//! let request = IncarnationRequest::new(unit.id, domain.id, vec![item]);
//! let options = request.options(&domain.incarnation_configuration);
//! let plan = IncarnationResolver::new(&graph, &repository).resolve(&request, &options).unwrap();
//! let applied = IncarnationApplier::new(&graph, &domain, &repository).apply(&plan).unwrap();
//! assert_eq!(applied.created.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod applier;
pub mod error;
pub mod memory;
pub mod ordering;
pub mod plan;
pub mod repository;
pub mod resolver;

pub use applier::{AppliedIncarnation, IncarnationApplier};
pub use error::{ApplyError, RepositoryError, ResolveError};
pub use memory::InMemoryRepository;
pub use ordering::{creation_order, respects_dependencies};
pub use plan::{
    AuxiliaryTarget, Disposition, IncarnationDescription, IncarnationPlan, IncarnationRequest,
    IntegrityIssue, ReferenceTarget, ResolveOptions, ResolvedReference,
};
pub use repository::{ElementBatch, ElementRepository, IncarnationGuard};
pub use resolver::IncarnationResolver;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for incarnation
    pub use crate::{
        Disposition, ElementRepository, InMemoryRepository, IncarnationApplier, IncarnationPlan,
        IncarnationRequest, IncarnationResolver, ReferenceTarget, ResolveOptions,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
