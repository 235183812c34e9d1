//! Error types for incarnation
//!
//! - [`ResolveError`]: the request itself cannot be planned
//! - [`ApplyError`]: the plan cannot be materialized, nothing was written
//! - [`RepositoryError`]: storage rejected or failed a read or commit

use riskcat_model::{DomainId, ElementId, ItemId, UnitId};

/// Errors while resolving a request into a plan
///
/// Dangling and cross-namespace references are not errors; they are
/// collected as integrity issues on the plan.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No items were requested
    #[error("incarnation request contains no items")]
    EmptyRequest,

    /// A requested item is unknown in the request's namespace
    #[error("catalog item not found: {0}")]
    ItemNotFound(ItemId),

    /// Repository failure during lookup
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors while applying a plan
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Target unit does not exist
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Target unit does not work with the plan's domain
    #[error("unit {unit} is not associated with domain {domain}")]
    UnitNotInDomain { unit: UnitId, domain: DomainId },

    /// Plan was resolved for another domain
    #[error("plan targets domain {actual}, applier works on {expected}")]
    DomainMismatch { expected: DomainId, actual: DomainId },

    /// Plan refers to an item missing from the template graph
    #[error("template item not found: {0}")]
    ItemNotFound(ItemId),

    /// Plan refers to an existing element that cannot be loaded
    #[error("element not found: {0}")]
    ElementNotFound(ElementId),

    /// Existing element lives in another unit
    #[error("element {element} does not belong to unit {unit}")]
    ForeignElement { element: ElementId, unit: UnitId },

    /// Plan is structurally broken (bad index, duplicate element id)
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Reference target was neither planned nor resolved to an element
    #[error("{target} not included in request but required by {required_by}")]
    MissingTarget { target: ItemId, required_by: ItemId },

    /// Sub-type or status not defined in the domain
    #[error("item {item}: sub-type '{sub_type}' with status '{status}' is not defined")]
    InvalidSubType {
        item: ItemId,
        sub_type: String,
        status: String,
    },

    /// Reference cannot be realized between these element types
    #[error("model consistency violated: {0}")]
    ModelConsistency(String),

    /// Risk value points outside the domain's risk definitions
    #[error("item {item}: invalid risk value in '{risk_definition}': {reason}")]
    InvalidRiskValue {
        item: ItemId,
        risk_definition: String,
        reason: String,
    },

    /// Commit rejected or storage failure
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApplyError {
    /// Whether re-resolving and re-applying may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository(e) if e.is_retryable())
    }
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Unit does not exist
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Element to modify does not exist
    #[error("element not found: {0}")]
    ElementNotFound(ElementId),

    /// Element to create already exists
    #[error("element already exists: {0}")]
    ElementExists(ElementId),

    /// Container-level duplicate-name constraint
    #[error("element name '{name}' already used in unit {unit}")]
    DuplicateName { unit: UnitId, name: String },

    /// Another request incarnated the item between lookup and commit
    #[error("item {item} was incarnated concurrently as {element}")]
    ConcurrentIncarnation { item: ItemId, element: ElementId },

    /// Storage not reachable
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Check if error is a constraint violation
    #[inline]
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName { .. } | Self::ElementExists(_) | Self::ConcurrentIncarnation { .. }
        )
    }
}
