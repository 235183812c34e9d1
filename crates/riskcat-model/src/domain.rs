//! Domains, domain templates and element type definitions

use crate::catalog::{ItemNamespace, ReferenceFilter, TailoringReferenceType, TemplateItem};
use crate::element::ElementType;
use crate::error::ModelError;
use crate::graph::TemplateGraph;
use crate::ids::{DomainId, DomainTemplateId};
use crate::risk::RiskDefinition;
use crate::translation::Translations;
use crate::version::TemplateVersion;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// Whether incarnation pulls in the reference closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestMode {
    /// Requested items only, plus what referential integrity demands
    Manual,
    /// Full transitive reference closure
    #[default]
    Default,
}

/// When to reuse an element already incarnated from the same item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncarnationLookup {
    /// Always create
    Never,
    /// Reuse for items reached through references, create requested items
    #[default]
    ForReferencedItems,
    /// Reuse whenever an incarnation exists
    Always,
    /// Reuse when the incarnation was made from the same template version
    SameVersion,
}

impl IncarnationLookup {
    /// Whether lookup applies to an item requested directly or reached by reference
    #[inline]
    #[must_use]
    pub const fn applies_to(self, requested: bool) -> bool {
        match self {
            Self::Never => false,
            Self::ForReferencedItems => !requested,
            Self::Always | Self::SameVersion => true,
        }
    }
}

impl Display for IncarnationLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Never => "NEVER",
            Self::ForReferencedItems => "FOR_REFERENCED_ITEMS",
            Self::Always => "ALWAYS",
            Self::SameVersion => "SAME_VERSION",
        })
    }
}

/// Domain-level incarnation defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncarnationConfiguration {
    pub mode: RequestMode,
    pub lookup: IncarnationLookup,
    pub include: Option<BTreeSet<TailoringReferenceType>>,
    pub exclude: Option<BTreeSet<TailoringReferenceType>>,
}

impl IncarnationConfiguration {
    /// Reference filter from the configured include/exclude sets
    #[must_use]
    pub fn filter(&self) -> ReferenceFilter {
        ReferenceFilter::new(self.include.clone(), self.exclude.clone().unwrap_or_default())
    }
}

/// Sub-type of an element type with its allowed statuses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTypeDefinition {
    pub statuses: Vec<String>,
    #[serde(default)]
    pub translations: Translations,
}

/// Type of a custom attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeDefinition {
    Text,
    Integer,
    Boolean,
    Date,
    Enum { allowed_values: Vec<String> },
    List { item: Box<AttributeDefinition> },
}

/// Named group of custom attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAspectDefinition {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
}

/// Allowed custom link type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefinition {
    pub target_type: ElementType,
    #[serde(default)]
    pub target_sub_type: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDefinition>,
}

/// Schema of one element type within a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementTypeDefinition {
    pub element_type: ElementType,
    #[serde(default)]
    pub sub_types: BTreeMap<String, SubTypeDefinition>,
    #[serde(default)]
    pub custom_aspects: BTreeMap<String, CustomAspectDefinition>,
    #[serde(default)]
    pub links: BTreeMap<String, LinkDefinition>,
    #[serde(default)]
    pub translations: Translations,
}

impl ElementTypeDefinition {
    #[must_use]
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            sub_types: BTreeMap::new(),
            custom_aspects: BTreeMap::new(),
            links: BTreeMap::new(),
            translations: Translations::new(),
        }
    }

    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>, statuses: &[&str]) -> Self {
        self.sub_types.insert(
            sub_type.into(),
            SubTypeDefinition {
                statuses: statuses.iter().map(ToString::to_string).collect(),
                translations: Translations::new(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_attribute(
        mut self,
        aspect: impl Into<String>,
        attribute: impl Into<String>,
        definition: AttributeDefinition,
    ) -> Self {
        self.custom_aspects
            .entry(aspect.into())
            .or_default()
            .attributes
            .insert(attribute.into(), definition);
        self
    }

    /// Whether a status is allowed for a sub-type
    #[must_use]
    pub fn allows(&self, sub_type: &str, status: &str) -> bool {
        self.sub_types
            .get(sub_type)
            .is_some_and(|s| s.statuses.iter().any(|st| st == status))
    }
}

/// Versioned, reusable definition a client's domain is derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainTemplate {
    pub id: DomainTemplateId,
    pub name: String,
    pub version: TemplateVersion,
    #[serde(default)]
    pub risk_definitions: Vec<RiskDefinition>,
    #[serde(default)]
    pub element_type_definitions: Vec<ElementTypeDefinition>,
}

impl DomainTemplate {
    #[must_use]
    pub fn new(name: impl Into<String>, version: TemplateVersion) -> Self {
        Self {
            id: DomainTemplateId::new(),
            name: name.into(),
            version,
            risk_definitions: Vec::new(),
            element_type_definitions: Vec::new(),
        }
    }

    #[must_use]
    pub fn risk_definition(&self, id: &str) -> Option<&RiskDefinition> {
        self.risk_definitions.iter().find(|d| d.id == id)
    }
}

/// A client's domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub template_id: DomainTemplateId,
    pub template_version: TemplateVersion,
    #[serde(default)]
    pub risk_definitions: Vec<RiskDefinition>,
    #[serde(default)]
    pub element_type_definitions: Vec<ElementTypeDefinition>,
    #[serde(default)]
    pub incarnation_configuration: IncarnationConfiguration,
    #[serde(default)]
    pub catalog_items: Vec<TemplateItem>,
}

impl Domain {
    /// New domain derived from a template
    #[must_use]
    pub fn from_template(template: &DomainTemplate) -> Self {
        Self {
            id: DomainId::new(),
            name: template.name.clone(),
            template_id: template.id,
            template_version: template.version,
            risk_definitions: template.risk_definitions.clone(),
            element_type_definitions: template.element_type_definitions.clone(),
            incarnation_configuration: IncarnationConfiguration::default(),
            catalog_items: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn namespace(&self) -> ItemNamespace {
        ItemNamespace::Domain(self.id)
    }

    #[must_use]
    pub fn risk_definition(&self, id: &str) -> Option<&RiskDefinition> {
        self.risk_definitions.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn element_type_definition(
        &self,
        element_type: ElementType,
    ) -> Option<&ElementTypeDefinition> {
        self.element_type_definitions
            .iter()
            .find(|d| d.element_type == element_type)
    }

    /// Graph over the domain's catalog
    pub fn graph(&self) -> Result<TemplateGraph, ModelError> {
        TemplateGraph::new(self.catalog_items.iter().cloned())
    }
}
