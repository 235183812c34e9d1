//! Arena of template items
//!
//! The reference graph may contain cycles, so items are never linked by
//! pointer. They live in a flat arena and refer to each other by [`ItemId`];
//! traversals track visited ids.

use crate::catalog::TemplateItem;
use crate::error::ModelError;
use crate::ids::ItemId;
use std::collections::HashMap;

/// Read-only graph of template items
#[derive(Debug, Clone, Default)]
pub struct TemplateGraph {
    items: Vec<TemplateItem>,
    index: HashMap<ItemId, usize>,
}

impl TemplateGraph {
    /// Build a graph, rejecting duplicate ids
    pub fn new(items: impl IntoIterator<Item = TemplateItem>) -> Result<Self, ModelError> {
        let mut graph = Self::default();
        for item in items {
            if graph.index.contains_key(&item.id) {
                return Err(ModelError::DuplicateItem(item.id));
            }
            graph.index.insert(item.id, graph.items.len());
            graph.items.push(item);
        }
        Ok(graph)
    }

    /// Item by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&TemplateItem> {
        self.index.get(&id).map(|&idx| &self.items[idx])
    }

    /// Arena position of an item
    #[inline]
    #[must_use]
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &TemplateItem> {
        self.items.iter()
    }

    /// Number of references pointing at ids outside the graph
    #[must_use]
    pub fn dangling_reference_count(&self) -> usize {
        self.items
            .iter()
            .flat_map(|i| &i.tailoring_references)
            .filter(|r| !self.contains(r.target))
            .count()
    }
}
