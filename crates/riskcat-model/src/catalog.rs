//! Template items and tailoring references
//!
//! Catalog items and profile items share one shape, [`TemplateItem`]. Edges
//! between them are [`TailoringReference`]s whose [`TailoringReferenceKind`]
//! decides what incarnation does with the target:
//!
//! - `Copy` / `CopyAlways`: structural copy, always incarnated with the origin
//! - `Link` / `LinkExternal`: typed link (external is the reversed direction)
//! - `Part` / `Composite`: composition (composite is reversed)
//! - `Scope` / `Member`: scope membership (member is reversed)
//! - `Risk`: scenario binding carrying owner, mitigation and risk values
//! - `ControlImplementation` / `RequirementImplementation`: control bindings

use crate::element::{CustomAspects, ElementType, ImplementationStatus, RiskValueRef};
use crate::error::ModelError;
use crate::ids::{DomainId, ItemId, ProfileId, TailoringReferenceId};
use crate::version::TemplateVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Where a template item lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemNamespace {
    /// Catalog of a domain
    Domain(DomainId),
    /// Profile bundle
    Profile(ProfileId),
}

impl Display for ItemNamespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(id) => write!(f, "domain {id}"),
            Self::Profile(id) => write!(f, "profile {id}"),
        }
    }
}

/// Payload-free tag of a tailoring reference
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TailoringReferenceType {
    Copy,
    CopyAlways,
    Link,
    LinkExternal,
    Part,
    Composite,
    Scope,
    Member,
    Risk,
    ControlImplementation,
    RequirementImplementation,
}

impl TailoringReferenceType {
    pub const ALL: [Self; 11] = [
        Self::Copy,
        Self::CopyAlways,
        Self::Link,
        Self::LinkExternal,
        Self::Part,
        Self::Composite,
        Self::Scope,
        Self::Member,
        Self::Risk,
        Self::ControlImplementation,
        Self::RequirementImplementation,
    ];

    /// Structural copy references, incarnated together with their origin
    #[inline]
    #[must_use]
    pub const fn is_copy(self) -> bool {
        matches!(self, Self::Copy | Self::CopyAlways)
    }

    /// References whose target must exist for the origin to be consistent
    #[inline]
    #[must_use]
    pub const fn is_integrity_required(self) -> bool {
        matches!(
            self,
            Self::Risk | Self::ControlImplementation | Self::RequirementImplementation
        )
    }

    /// The same relation seen from the other end
    #[must_use]
    pub const fn inverse(self) -> Option<Self> {
        match self {
            Self::Link => Some(Self::LinkExternal),
            Self::LinkExternal => Some(Self::Link),
            Self::Part => Some(Self::Composite),
            Self::Composite => Some(Self::Part),
            Self::Scope => Some(Self::Member),
            Self::Member => Some(Self::Scope),
            _ => None,
        }
    }

    /// Literal as used in configuration and JSON
    #[must_use]
    pub const fn literal(self) -> &'static str {
        match self {
            Self::Copy => "COPY",
            Self::CopyAlways => "COPY_ALWAYS",
            Self::Link => "LINK",
            Self::LinkExternal => "LINK_EXTERNAL",
            Self::Part => "PART",
            Self::Composite => "COMPOSITE",
            Self::Scope => "SCOPE",
            Self::Member => "MEMBER",
            Self::Risk => "RISK",
            Self::ControlImplementation => "CONTROL_IMPLEMENTATION",
            Self::RequirementImplementation => "REQUIREMENT_IMPLEMENTATION",
        }
    }
}

impl Display for TailoringReferenceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

impl FromStr for TailoringReferenceType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.literal().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownLiteral {
                kind: "tailoring reference type",
                value: s.to_string(),
            })
    }
}

/// Role of an additional item a reference points at besides its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuxiliaryRole {
    RiskOwner,
    Mitigation,
    Responsible,
}

impl Display for AuxiliaryRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RiskOwner => "risk owner",
            Self::Mitigation => "mitigation",
            Self::Responsible => "responsible",
        })
    }
}

/// Reference semantics together with their payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TailoringReferenceKind {
    Copy,
    CopyAlways,
    Link {
        link_type: String,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
    LinkExternal {
        link_type: String,
        #[serde(default)]
        attributes: BTreeMap<String, Value>,
    },
    Part,
    Composite,
    Scope,
    Member,
    Risk {
        #[serde(default)]
        owner: Option<ItemId>,
        #[serde(default)]
        mitigation: Option<ItemId>,
        #[serde(default)]
        values: Vec<RiskValueRef>,
    },
    ControlImplementation {
        #[serde(default)]
        responsible: Option<ItemId>,
        #[serde(default)]
        description: Option<String>,
    },
    RequirementImplementation {
        #[serde(default)]
        status: ImplementationStatus,
        #[serde(default)]
        statement: Option<String>,
        #[serde(default)]
        responsible: Option<ItemId>,
    },
}

impl TailoringReferenceKind {
    /// Plain link
    #[must_use]
    pub fn link(link_type: impl Into<String>) -> Self {
        Self::Link {
            link_type: link_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Risk without owner, mitigation or values
    #[must_use]
    pub fn risk() -> Self {
        Self::Risk {
            owner: None,
            mitigation: None,
            values: Vec::new(),
        }
    }

    /// Payload-free tag
    #[must_use]
    pub const fn reference_type(&self) -> TailoringReferenceType {
        match self {
            Self::Copy => TailoringReferenceType::Copy,
            Self::CopyAlways => TailoringReferenceType::CopyAlways,
            Self::Link { .. } => TailoringReferenceType::Link,
            Self::LinkExternal { .. } => TailoringReferenceType::LinkExternal,
            Self::Part => TailoringReferenceType::Part,
            Self::Composite => TailoringReferenceType::Composite,
            Self::Scope => TailoringReferenceType::Scope,
            Self::Member => TailoringReferenceType::Member,
            Self::Risk { .. } => TailoringReferenceType::Risk,
            Self::ControlImplementation { .. } => TailoringReferenceType::ControlImplementation,
            Self::RequirementImplementation { .. } => {
                TailoringReferenceType::RequirementImplementation
            }
        }
    }

    /// Link type for link references
    #[must_use]
    pub fn link_type(&self) -> Option<&str> {
        match self {
            Self::Link { link_type, .. } | Self::LinkExternal { link_type, .. } => Some(link_type),
            _ => None,
        }
    }

    /// Items referenced through the payload (owner, mitigation, responsible)
    #[must_use]
    pub fn auxiliary_items(&self) -> Vec<(AuxiliaryRole, ItemId)> {
        match self {
            Self::Risk {
                owner, mitigation, ..
            } => owner
                .map(|o| (AuxiliaryRole::RiskOwner, o))
                .into_iter()
                .chain(mitigation.map(|m| (AuxiliaryRole::Mitigation, m)))
                .collect(),
            Self::ControlImplementation { responsible, .. }
            | Self::RequirementImplementation { responsible, .. } => responsible
                .map(|r| vec![(AuxiliaryRole::Responsible, r)])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Directed, typed edge between two template items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoringReference {
    pub id: TailoringReferenceId,
    pub target: ItemId,
    #[serde(flatten)]
    pub kind: TailoringReferenceKind,
}

impl TailoringReference {
    #[must_use]
    pub fn new(target: ItemId, kind: TailoringReferenceKind) -> Self {
        Self {
            id: TailoringReferenceId::new(),
            target,
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub const fn reference_type(&self) -> TailoringReferenceType {
        self.kind.reference_type()
    }
}

/// Which reference types a traversal may follow
///
/// An explicit include set restricts traversal to its members; the exclude
/// set always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFilter {
    #[serde(default)]
    pub include: Option<BTreeSet<TailoringReferenceType>>,
    #[serde(default)]
    pub exclude: BTreeSet<TailoringReferenceType>,
}

impl ReferenceFilter {
    /// Filter admitting every reference type
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(
        include: Option<BTreeSet<TailoringReferenceType>>,
        exclude: BTreeSet<TailoringReferenceType>,
    ) -> Self {
        Self { include, exclude }
    }

    /// Whether references of this type may be followed
    #[must_use]
    pub fn admits(&self, reference_type: TailoringReferenceType) -> bool {
        !self.exclude.contains(&reference_type)
            && self
                .include
                .as_ref()
                .map_or(true, |include| include.contains(&reference_type))
    }
}

/// Catalog item or profile item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub id: ItemId,
    pub namespace: ItemNamespace,
    /// Catalog item a profile item was derived from
    #[serde(default)]
    pub applied_catalog_item: Option<ItemId>,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub element_type: ElementType,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub custom_aspects: CustomAspects,
    #[serde(default)]
    pub template_version: TemplateVersion,
    #[serde(default)]
    pub tailoring_references: Vec<TailoringReference>,
}

impl TemplateItem {
    /// New catalog item in a domain
    #[must_use]
    pub fn catalog(domain: DomainId, name: impl Into<String>, element_type: ElementType) -> Self {
        Self::in_namespace(ItemNamespace::Domain(domain), name.into(), element_type)
    }

    /// New profile item
    #[must_use]
    pub fn profile(profile: ProfileId, name: impl Into<String>, element_type: ElementType) -> Self {
        Self::in_namespace(ItemNamespace::Profile(profile), name.into(), element_type)
    }

    fn in_namespace(namespace: ItemNamespace, name: String, element_type: ElementType) -> Self {
        Self {
            id: ItemId::new(),
            namespace,
            applied_catalog_item: None,
            name,
            abbreviation: None,
            description: None,
            element_type,
            sub_type: None,
            status: None,
            custom_aspects: CustomAspects::new(),
            template_version: TemplateVersion::default(),
            tailoring_references: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>, status: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: TemplateVersion) -> Self {
        self.template_version = version;
        self
    }

    #[must_use]
    pub fn with_applied_catalog_item(mut self, item: ItemId) -> Self {
        self.applied_catalog_item = Some(item);
        self
    }

    /// Add an outgoing reference
    #[must_use]
    pub fn with_reference(mut self, target: ItemId, kind: TailoringReferenceKind) -> Self {
        self.tailoring_references
            .push(TailoringReference::new(target, kind));
        self
    }

    /// Catalog item elements incarnated from this item are tagged with
    ///
    /// Catalog items apply themselves; profile items apply the catalog item
    /// they were derived from, if any.
    #[must_use]
    pub fn applied_item(&self) -> Option<ItemId> {
        match self.namespace {
            ItemNamespace::Domain(_) => Some(self.id),
            ItemNamespace::Profile(_) => self.applied_catalog_item,
        }
    }

    /// References of one type
    pub fn references_of(
        &self,
        reference_type: TailoringReferenceType,
    ) -> impl Iterator<Item = &TailoringReference> {
        self.tailoring_references
            .iter()
            .filter(move |r| r.reference_type() == reference_type)
    }
}
