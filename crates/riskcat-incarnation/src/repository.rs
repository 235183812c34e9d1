//! Repository seam
//!
//! The algorithms never persist anything themselves. Reads go through
//! [`ElementRepository`]; all writes of one apply call are handed over as a
//! single [`ElementBatch`] which the repository commits atomically.

use crate::error::RepositoryError;
use riskcat_model::{DomainId, Element, ElementId, ItemId, TemplateVersion, Unit, UnitId};

/// Incarnation that must not exist when a batch is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncarnationGuard {
    pub item: ItemId,
    /// Only incarnations of this version conflict, any version if `None`
    pub version: Option<TemplateVersion>,
}

impl IncarnationGuard {
    /// Whether `element` violates the guard
    #[must_use]
    pub fn is_violated_by(&self, element: &Element) -> bool {
        element.applied_item.is_some_and(|applied| {
            applied.item == self.item && self.version.map_or(true, |v| v == applied.version)
        })
    }
}

/// All writes of one apply call
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBatch {
    pub unit: UnitId,
    pub domain: DomainId,
    /// New elements, in creation order
    pub created: Vec<Element>,
    /// Existing elements with new relations
    pub modified: Vec<Element>,
    pub guards: Vec<IncarnationGuard>,
}

impl ElementBatch {
    #[must_use]
    pub fn new(unit: UnitId, domain: DomainId) -> Self {
        Self {
            unit,
            domain,
            created: Vec::new(),
            modified: Vec::new(),
            guards: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty()
    }
}

/// Storage for units and elements
pub trait ElementRepository {
    /// Unit by id
    fn find_unit(&self, id: UnitId) -> Result<Option<Unit>, RepositoryError>;

    /// Element by id
    fn find_element(&self, id: ElementId) -> Result<Option<Element>, RepositoryError>;

    /// Elements of a unit incarnated from any of `items` in a domain
    fn find_incarnations(
        &self,
        unit: UnitId,
        domain: DomainId,
        items: &[ItemId],
    ) -> Result<Vec<Element>, RepositoryError>;

    /// Every element associated with a domain, across units
    fn elements_in_domain(&self, domain: DomainId) -> Result<Vec<Element>, RepositoryError>;

    /// Write a batch atomically: either everything or nothing
    fn commit(&self, batch: ElementBatch) -> Result<Vec<ElementId>, RepositoryError>;
}

impl<R: ElementRepository + ?Sized> ElementRepository for &R {
    fn find_unit(&self, id: UnitId) -> Result<Option<Unit>, RepositoryError> {
        (**self).find_unit(id)
    }

    fn find_element(&self, id: ElementId) -> Result<Option<Element>, RepositoryError> {
        (**self).find_element(id)
    }

    fn find_incarnations(
        &self,
        unit: UnitId,
        domain: DomainId,
        items: &[ItemId],
    ) -> Result<Vec<Element>, RepositoryError> {
        (**self).find_incarnations(unit, domain, items)
    }

    fn elements_in_domain(&self, domain: DomainId) -> Result<Vec<Element>, RepositoryError> {
        (**self).elements_in_domain(domain)
    }

    fn commit(&self, batch: ElementBatch) -> Result<Vec<ElementId>, RepositoryError> {
        (**self).commit(batch)
    }
}
