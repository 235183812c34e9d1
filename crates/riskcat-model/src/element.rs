//! Concrete elements living inside a client's unit
//!
//! Elements are what incarnation produces and what migration must not break:
//! sub-type assignments, custom aspect values and risk values all refer to
//! definitions in the domain.

use crate::error::ModelError;
use crate::ids::{DomainId, ElementId, ItemId, UnitId};
use crate::version::TemplateVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Custom aspect values: aspect id -> attribute id -> value
pub type CustomAspects = BTreeMap<String, BTreeMap<String, Value>>;

/// Element types of the domain model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    Asset,
    Control,
    Document,
    Incident,
    Person,
    Process,
    Scenario,
    Scope,
}

impl ElementType {
    /// All element types
    pub const ALL: [Self; 8] = [
        Self::Asset,
        Self::Control,
        Self::Document,
        Self::Incident,
        Self::Person,
        Self::Process,
        Self::Scenario,
        Self::Scope,
    ];

    /// Whether elements of this type can carry risks and control implementations
    #[inline]
    #[must_use]
    pub const fn is_risk_affected(self) -> bool {
        matches!(self, Self::Asset | Self::Process | Self::Scope)
    }

    /// Whether elements of this type can be composed of parts
    #[inline]
    #[must_use]
    pub const fn is_composite(self) -> bool {
        !matches!(self, Self::Scope)
    }

    /// Singular lowercase term
    #[must_use]
    pub const fn term(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Control => "control",
            Self::Document => "document",
            Self::Incident => "incident",
            Self::Person => "person",
            Self::Process => "process",
            Self::Scenario => "scenario",
            Self::Scope => "scope",
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.term())
    }
}

impl FromStr for ElementType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.term().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownLiteral {
                kind: "element type",
                value: s.to_string(),
            })
    }
}

/// Which template item (and version) an element was incarnated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppliedItem {
    pub item: ItemId,
    pub version: TemplateVersion,
}

/// Directed, typed link between two elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomLink {
    pub link_type: String,
    pub target: ElementId,
    pub domain: DomainId,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

/// Position in a category's risk matrix
///
/// Rows follow the category's impact levels, columns the probability levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

impl CellRef {
    #[inline]
    #[must_use]
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.column)
    }
}

/// A risk value pointing into a risk definition's matrix by position
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RiskValueRef {
    pub risk_definition: String,
    pub category: usize,
    pub cell: CellRef,
}

impl RiskValueRef {
    #[must_use]
    pub fn new(risk_definition: impl Into<String>, category: usize, cell: CellRef) -> Self {
        Self {
            risk_definition: risk_definition.into(),
            category,
            cell,
        }
    }
}

/// Risk of a risk-affected element regarding one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub scenario: ElementId,
    pub domain: DomainId,
    pub owner: Option<ElementId>,
    pub mitigation: Option<ElementId>,
    #[serde(default)]
    pub values: Vec<RiskValueRef>,
}

/// Implementation state of a requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplementationStatus {
    Yes,
    No,
    Partial,
    NotApplicable,
    #[default]
    Unknown,
}

/// Control implemented by a risk-affected element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlImplementation {
    pub control: ElementId,
    pub responsible: Option<ElementId>,
    pub description: Option<String>,
}

/// Requirement (control) fulfilment tracked on a risk-affected element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementImplementation {
    pub control: ElementId,
    pub status: ImplementationStatus,
    pub statement: Option<String>,
    pub responsible: Option<ElementId>,
}

/// Concrete element in a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub owner: UnitId,
    pub domain: DomainId,
    pub name: String,
    pub abbreviation: Option<String>,
    pub description: Option<String>,
    pub element_type: ElementType,
    pub sub_type: Option<String>,
    pub status: Option<String>,
    pub applied_item: Option<AppliedItem>,
    #[serde(default)]
    pub custom_aspects: CustomAspects,
    #[serde(default)]
    pub links: Vec<CustomLink>,
    #[serde(default)]
    pub parts: Vec<ElementId>,
    #[serde(default)]
    pub members: Vec<ElementId>,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub control_implementations: Vec<ControlImplementation>,
    #[serde(default)]
    pub requirement_implementations: Vec<RequirementImplementation>,
}

impl Element {
    /// Create a bare element
    #[must_use]
    pub fn new(
        id: ElementId,
        owner: UnitId,
        domain: DomainId,
        name: impl Into<String>,
        element_type: ElementType,
    ) -> Self {
        Self {
            id,
            owner,
            domain,
            name: name.into(),
            abbreviation: None,
            description: None,
            element_type,
            sub_type: None,
            status: None,
            applied_item: None,
            custom_aspects: CustomAspects::new(),
            links: Vec::new(),
            parts: Vec::new(),
            members: Vec::new(),
            risks: Vec::new(),
            control_implementations: Vec::new(),
            requirement_implementations: Vec::new(),
        }
    }

    /// With sub-type and status
    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>, status: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self.status = Some(status.into());
        self
    }

    /// With the template item it was incarnated from
    #[must_use]
    pub fn with_applied_item(mut self, item: ItemId, version: TemplateVersion) -> Self {
        self.applied_item = Some(AppliedItem { item, version });
        self
    }

    /// Whether this element was incarnated from `item`
    #[inline]
    #[must_use]
    pub fn is_incarnation_of(&self, item: ItemId) -> bool {
        self.applied_item.is_some_and(|applied| applied.item == item)
    }

    /// Add a link unless an identical one exists
    pub fn add_link(&mut self, link: CustomLink) -> bool {
        let exists = self
            .links
            .iter()
            .any(|l| l.link_type == link.link_type && l.target == link.target);
        if !exists {
            self.links.push(link);
        }
        !exists
    }

    /// Add a part unless already present
    pub fn add_part(&mut self, part: ElementId) -> bool {
        push_unique(&mut self.parts, part)
    }

    /// Add a scope member unless already present
    pub fn add_member(&mut self, member: ElementId) -> bool {
        push_unique(&mut self.members, member)
    }

    /// Get or create the risk for a scenario
    pub fn obtain_risk(&mut self, scenario: ElementId, domain: DomainId) -> &mut Risk {
        let pos = match self.risks.iter().position(|r| r.scenario == scenario) {
            Some(pos) => pos,
            None => {
                self.risks.push(Risk {
                    scenario,
                    domain,
                    owner: None,
                    mitigation: None,
                    values: Vec::new(),
                });
                self.risks.len() - 1
            }
        };
        &mut self.risks[pos]
    }

    /// All risk values carried by this element's risks
    pub fn risk_values(&self) -> impl Iterator<Item = &RiskValueRef> {
        self.risks.iter().flat_map(|r| r.values.iter())
    }

    /// Value of a custom aspect attribute
    #[must_use]
    pub fn attribute_value(&self, aspect: &str, attribute: &str) -> Option<&Value> {
        self.custom_aspects.get(aspect)?.get(attribute)
    }
}

fn push_unique(list: &mut Vec<ElementId>, id: ElementId) -> bool {
    if list.contains(&id) {
        false
    } else {
        list.push(id);
        true
    }
}

/// Container for a client's elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub domains: Vec<DomainId>,
}

impl Unit {
    #[must_use]
    pub fn new(id: UnitId, name: impl Into<String>, domains: Vec<DomainId>) -> Self {
        Self {
            id,
            name: name.into(),
            domains,
        }
    }

    /// Whether the unit works with `domain`
    #[inline]
    #[must_use]
    pub fn is_associated_with(&self, domain: DomainId) -> bool {
        self.domains.contains(&domain)
    }
}
