//! Incarnation requests and plans
//!
//! A plan is transient: it is computed per request, shown to the caller, maybe
//! edited (create vs reuse, unresolved targets) and then applied or dropped.

use riskcat_model::{
    AuxiliaryRole, DomainId, ElementId, IncarnationConfiguration, IncarnationLookup, ItemId,
    ItemNamespace, ReferenceFilter, RequestMode, TailoringReferenceId, TailoringReferenceKind,
    TailoringReferenceType, UnitId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Request to incarnate template items into a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncarnationRequest {
    pub unit: UnitId,
    pub domain: DomainId,
    /// Source of the items, defaults to the domain's catalog
    #[serde(default)]
    pub namespace: Option<ItemNamespace>,
    pub items: Vec<ItemId>,
    #[serde(default)]
    pub mode: Option<RequestMode>,
    #[serde(default)]
    pub lookup: Option<IncarnationLookup>,
    #[serde(default)]
    pub include: Option<BTreeSet<TailoringReferenceType>>,
    #[serde(default)]
    pub exclude: Option<BTreeSet<TailoringReferenceType>>,
}

impl IncarnationRequest {
    /// Request with all options left to the defaults
    #[must_use]
    pub fn new(unit: UnitId, domain: DomainId, items: Vec<ItemId>) -> Self {
        Self {
            unit,
            domain,
            namespace: None,
            items,
            mode: None,
            lookup: None,
            include: None,
            exclude: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: IncarnationLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    #[must_use]
    pub fn with_include(mut self, include: impl IntoIterator<Item = TailoringReferenceType>) -> Self {
        self.include = Some(include.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, exclude: impl IntoIterator<Item = TailoringReferenceType>) -> Self {
        self.exclude = Some(exclude.into_iter().collect());
        self
    }

    /// Take items from a profile instead of the domain catalog
    #[must_use]
    pub fn with_namespace(mut self, namespace: ItemNamespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Namespace requested items must belong to
    #[must_use]
    pub fn source(&self) -> ItemNamespace {
        self.namespace.unwrap_or(ItemNamespace::Domain(self.domain))
    }

    /// Effective options, falling back to `defaults`
    ///
    /// Include and exclude are overridden together: if the request names
    /// either, the defaults for both are ignored.
    #[must_use]
    pub fn options(&self, defaults: &IncarnationConfiguration) -> ResolveOptions {
        let filter = if self.include.is_some() || self.exclude.is_some() {
            ReferenceFilter::new(self.include.clone(), self.exclude.clone().unwrap_or_default())
        } else {
            defaults.filter()
        };
        ResolveOptions {
            mode: self.mode.unwrap_or(defaults.mode),
            lookup: self.lookup.unwrap_or(defaults.lookup),
            filter,
            merge_bidirectional_references: false,
        }
    }
}

/// Fully determined resolver options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub mode: RequestMode,
    pub lookup: IncarnationLookup,
    pub filter: ReferenceFilter,
    /// Keep only one direction of PART/COMPOSITE, SCOPE/MEMBER, LINK/LINK_EXTERNAL
    pub merge_bidirectional_references: bool,
}

impl ResolveOptions {
    #[must_use]
    pub fn with_merge_bidirectional_references(mut self, merge: bool) -> Self {
        self.merge_bidirectional_references = merge;
        self
    }
}

/// Whether a description creates a new element or reuses one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// Create an element with a pre-allocated id
    ///
    /// `guarded` creations fail at commit time if an incarnation of the item
    /// appeared since the lookup.
    Create { element: ElementId, guarded: bool },
    /// Reuse an existing incarnation
    Reuse { element: ElementId },
}

impl Disposition {
    /// Element the description stands for
    #[inline]
    #[must_use]
    pub const fn element(&self) -> ElementId {
        match self {
            Self::Create { element, .. } | Self::Reuse { element } => *element,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }
}

/// Where a reference points after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceTarget {
    /// Another description of the same plan, by position
    Planned(usize),
    /// Existing element outside the plan
    Existing(ElementId),
    /// Neither planned nor found; must be fixed before applying
    Unresolved(ItemId),
}

/// Owner, mitigation or responsible item of a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryTarget {
    pub role: AuxiliaryRole,
    pub item: ItemId,
    pub target: ReferenceTarget,
}

/// Outgoing reference of a description with its resolved target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub reference: TailoringReferenceId,
    pub target_item: ItemId,
    pub kind: TailoringReferenceKind,
    pub target: ReferenceTarget,
    #[serde(default)]
    pub auxiliary: Vec<AuxiliaryTarget>,
}

impl ResolvedReference {
    #[inline]
    #[must_use]
    pub fn reference_type(&self) -> TailoringReferenceType {
        self.kind.reference_type()
    }

    /// All targets, main target first
    pub fn targets(&self) -> impl Iterator<Item = ReferenceTarget> + '_ {
        std::iter::once(self.target).chain(self.auxiliary.iter().map(|a| a.target))
    }
}

/// One plan entry: a template item and the element standing for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncarnationDescription {
    pub item: ItemId,
    /// Requested directly or part of a requested item's copy closure
    pub requested: bool,
    pub disposition: Disposition,
    #[serde(default)]
    pub references: Vec<ResolvedReference>,
}

/// Reference that could not be resolved inside the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityIssue {
    /// Target id is unknown
    DanglingReference {
        origin: ItemId,
        reference: TailoringReferenceId,
        target: ItemId,
    },
    /// Target belongs to another domain or profile
    CrossNamespace {
        origin: ItemId,
        reference: TailoringReferenceId,
        target: ItemId,
        namespace: ItemNamespace,
    },
}

impl IntegrityIssue {
    /// Item whose reference is broken
    #[must_use]
    pub const fn origin(&self) -> ItemId {
        match self {
            Self::DanglingReference { origin, .. } | Self::CrossNamespace { origin, .. } => *origin,
        }
    }
}

/// Computed incarnation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncarnationPlan {
    pub unit: UnitId,
    pub domain: DomainId,
    pub lookup: IncarnationLookup,
    /// Requested items first, then discovery order
    pub descriptions: Vec<IncarnationDescription>,
    /// Positions into `descriptions`, reference targets before their origins
    ///
    /// Reported for callers; the applier recomputes the order from the
    /// references so that a plan edited after resolution stays consistent.
    pub creation_order: Vec<usize>,
    #[serde(default)]
    pub issues: Vec<IntegrityIssue>,
}

impl IncarnationPlan {
    /// Number of elements the plan creates
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.descriptions
            .iter()
            .filter(|d| d.disposition.is_create())
            .count()
    }

    /// Number of existing elements the plan reuses
    #[must_use]
    pub fn reuse_count(&self) -> usize {
        self.descriptions.len() - self.create_count()
    }

    /// Description of an item
    #[must_use]
    pub fn description_for(&self, item: ItemId) -> Option<&IncarnationDescription> {
        self.descriptions.iter().find(|d| d.item == item)
    }

    /// Items referenced but neither planned nor found
    #[must_use]
    pub fn unresolved(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self
            .descriptions
            .iter()
            .flat_map(|d| &d.references)
            .flat_map(ResolvedReference::targets)
            .filter_map(|t| match t {
                ReferenceTarget::Unresolved(item) => Some(item),
                _ => None,
            })
            .collect();
        items.sort_unstable();
        items.dedup();
        items
    }

    /// No integrity issues and no unresolved targets
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty() && self.unresolved().is_empty()
    }
}
