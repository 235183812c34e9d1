//! In-memory repository
//!
//! Holds units and elements behind one `RwLock`. A commit takes the write
//! lock once, checks every constraint, and only then writes. A failing batch
//! leaves the store untouched.

use crate::error::RepositoryError;
use crate::repository::{ElementBatch, ElementRepository};
use indexmap::IndexMap;
use parking_lot::RwLock;
use riskcat_model::{DomainId, Element, ElementId, ItemId, Unit, UnitId};
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Store {
    units: IndexMap<UnitId, Unit>,
    elements: IndexMap<ElementId, Element>,
}

/// Repository keeping everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    enforce_unique_names: bool,
}

impl InMemoryRepository {
    /// Empty repository without name constraint
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject element names already used in the same unit
    #[must_use]
    pub fn with_unique_names(mut self, enforce: bool) -> Self {
        self.enforce_unique_names = enforce;
        self
    }

    /// Seed a unit
    pub fn insert_unit(&self, unit: Unit) {
        self.store.write().units.insert(unit.id, unit);
    }

    /// Seed an element, bypassing constraints
    pub fn insert_element(&self, element: Element) {
        self.store.write().elements.insert(element.id, element);
    }

    /// Snapshot of all elements in insertion order
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        self.store.read().elements.values().cloned().collect()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.store.read().elements.len()
    }

    fn check(store: &Store, batch: &ElementBatch, unique_names: bool) -> Result<(), RepositoryError> {
        if !store.units.contains_key(&batch.unit) {
            return Err(RepositoryError::UnitNotFound(batch.unit));
        }
        if let Some(e) = batch.created.iter().find(|e| store.elements.contains_key(&e.id)) {
            return Err(RepositoryError::ElementExists(e.id));
        }
        if let Some(e) = batch.modified.iter().find(|e| !store.elements.contains_key(&e.id)) {
            return Err(RepositoryError::ElementNotFound(e.id));
        }

        for guard in &batch.guards {
            let existing = store.elements.values().find(|e| {
                e.owner == batch.unit && e.domain == batch.domain && guard.is_violated_by(e)
            });
            if let Some(existing) = existing {
                return Err(RepositoryError::ConcurrentIncarnation {
                    item: guard.item,
                    element: existing.id,
                });
            }
        }

        if unique_names {
            let modified: HashSet<ElementId> = batch.modified.iter().map(|e| e.id).collect();
            let mut names: HashSet<&str> = store
                .elements
                .values()
                .filter(|e| e.owner == batch.unit && !modified.contains(&e.id))
                .chain(batch.modified.iter())
                .map(|e| e.name.as_str())
                .collect();
            for element in &batch.created {
                if !names.insert(element.name.as_str()) {
                    return Err(RepositoryError::DuplicateName {
                        unit: batch.unit,
                        name: element.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ElementRepository for InMemoryRepository {
    fn find_unit(&self, id: UnitId) -> Result<Option<Unit>, RepositoryError> {
        Ok(self.store.read().units.get(&id).cloned())
    }

    fn find_element(&self, id: ElementId) -> Result<Option<Element>, RepositoryError> {
        Ok(self.store.read().elements.get(&id).cloned())
    }

    fn find_incarnations(
        &self,
        unit: UnitId,
        domain: DomainId,
        items: &[ItemId],
    ) -> Result<Vec<Element>, RepositoryError> {
        let items: HashSet<ItemId> = items.iter().copied().collect();
        Ok(self
            .store
            .read()
            .elements
            .values()
            .filter(|e| e.owner == unit && e.domain == domain)
            .filter(|e| e.applied_item.is_some_and(|a| items.contains(&a.item)))
            .cloned()
            .collect())
    }

    fn elements_in_domain(&self, domain: DomainId) -> Result<Vec<Element>, RepositoryError> {
        Ok(self
            .store
            .read()
            .elements
            .values()
            .filter(|e| e.domain == domain)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: ElementBatch) -> Result<Vec<ElementId>, RepositoryError> {
        let mut store = self.store.write();
        Self::check(&store, &batch, self.enforce_unique_names)?;

        let created: Vec<ElementId> = batch.created.iter().map(|e| e.id).collect();
        for element in batch.modified.into_iter().chain(batch.created) {
            store.elements.insert(element.id, element);
        }
        tracing::debug!(
            "committed batch to unit {}: {} created",
            batch.unit,
            created.len()
        );
        Ok(created)
    }
}
