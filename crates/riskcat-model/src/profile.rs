//! Profiles: preconfigured bundles of template items

use crate::catalog::{ItemNamespace, TemplateItem};
use crate::error::ModelError;
use crate::graph::TemplateGraph;
use crate::ids::ProfileId;
use serde::{Deserialize, Serialize};

/// Named, ordered bundle of profile items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProfileId::new(),
            name: name.into(),
            description: None,
            language: None,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_item(mut self, item: TemplateItem) -> Self {
        self.items.push(item);
        self
    }

    #[inline]
    #[must_use]
    pub const fn namespace(&self) -> ItemNamespace {
        ItemNamespace::Profile(self.id)
    }

    /// Graph over the profile's items
    pub fn graph(&self) -> Result<TemplateGraph, ModelError> {
        TemplateGraph::new(self.items.iter().cloned())
    }
}
