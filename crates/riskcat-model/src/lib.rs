//! Riskcat Model - catalog, element and risk definition types
//!
//! Shared vocabulary of the incarnation and migration engines:
//! - Template items and typed tailoring references, held in an arena graph
//! - Profiles bundling template items
//! - Concrete elements, units and their relations
//! - Domains, domain templates, element type definitions
//! - Risk definitions with their probability, impact and risk value scales
//!
//! # Example
//!
//! ```rust
//! use riskcat_model::prelude::*;
//!
//! let domain = DomainId::new();
//! let control = TemplateItem::catalog(domain, "Backup policy", ElementType::Control);
//! let asset = TemplateItem::catalog(domain, "File server", ElementType::Asset)
//!     .with_reference(control.id, TailoringReferenceKind::Copy);
//!
//! let graph = TemplateGraph::new([asset, control]).unwrap();
//! assert_eq!(graph.len(), 2);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod catalog;
pub mod domain;
pub mod element;
pub mod error;
pub mod graph;
pub mod ids;
pub mod profile;
pub mod risk;
pub mod translation;
pub mod version;

pub use catalog::{
    AuxiliaryRole, ItemNamespace, ReferenceFilter, TailoringReference, TailoringReferenceKind,
    TailoringReferenceType, TemplateItem,
};
pub use domain::{
    AttributeDefinition, CustomAspectDefinition, Domain, DomainTemplate, ElementTypeDefinition,
    IncarnationConfiguration, IncarnationLookup, LinkDefinition, RequestMode, SubTypeDefinition,
};
pub use element::{
    AppliedItem, CellRef, ControlImplementation, CustomAspects, CustomLink, Element, ElementType,
    ImplementationStatus, RequirementImplementation, Risk, RiskValueRef, Unit,
};
pub use error::ModelError;
pub use graph::TemplateGraph;
pub use ids::{
    DomainId, DomainTemplateId, ElementId, ItemId, ProfileId, TailoringReferenceId, UnitId,
};
pub use profile::Profile;
pub use risk::{
    CategoryDefinition, Level, MatrixCell, ProbabilityDefinition, RiskDefinition, ValueMatrix,
};
pub use translation::Translations;
pub use version::TemplateVersion;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the model
    pub use crate::{
        CellRef, Domain, DomainId, DomainTemplate, Element, ElementId, ElementType,
        IncarnationLookup, ItemId, RequestMode, RiskDefinition, RiskValueRef,
        TailoringReferenceKind, TailoringReferenceType, TemplateGraph, TemplateItem,
        TemplateVersion, Unit, UnitId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
