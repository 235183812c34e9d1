//! Breaking changes
//!
//! A breaking change blocks the whole migration of a domain. Each variant
//! names the offending change and, where data is affected, the element
//! holding it, so the client knows what to reassign before retrying.

use crate::change::RiskDefinitionChange;
use crate::compatibility::AttributeChange;
use riskcat_model::{CellRef, ElementId, ElementType};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakingChange {
    /// Change of a kind the caller did not accept
    UnacceptedChange {
        risk_definition: String,
        change: RiskDefinitionChange,
    },
    /// Removed axis entry still referenced by a risk value
    RiskValueInUse {
        risk_definition: String,
        category: usize,
        cell: CellRef,
        element: ElementId,
        change: RiskDefinitionChange,
    },
    /// Risk definition missing from the template but still in use
    RiskDefinitionRemoved {
        risk_definition: String,
        element: ElementId,
    },
    /// Removed sub-type still assigned to an element
    SubTypeInUse {
        element_type: ElementType,
        sub_type: String,
        element: ElementId,
    },
    /// Removed status still assigned to an element
    StatusInUse {
        element_type: ElementType,
        sub_type: String,
        status: String,
        element: ElementId,
    },
    /// Attribute removed or changed incompatibly while an element holds a value
    AttributeInUse {
        element_type: ElementType,
        aspect: String,
        attribute: String,
        change: AttributeChange,
        element: ElementId,
    },
}

impl BreakingChange {
    /// Element whose data is affected, if any
    #[must_use]
    pub const fn element(&self) -> Option<ElementId> {
        match self {
            Self::UnacceptedChange { .. } => None,
            Self::RiskValueInUse { element, .. }
            | Self::RiskDefinitionRemoved { element, .. }
            | Self::SubTypeInUse { element, .. }
            | Self::StatusInUse { element, .. }
            | Self::AttributeInUse { element, .. } => Some(*element),
        }
    }
}

impl Display for BreakingChange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnacceptedChange {
                risk_definition,
                change,
            } => write!(
                f,
                "risk definition '{risk_definition}': {} not accepted",
                change.kind()
            ),
            Self::RiskValueInUse {
                risk_definition,
                category,
                cell,
                element,
                change,
            } => write!(
                f,
                "risk definition '{risk_definition}': {} affects value at {cell} of category {category} held by {element}",
                change.kind()
            ),
            Self::RiskDefinitionRemoved {
                risk_definition,
                element,
            } => write!(
                f,
                "risk definition '{risk_definition}' removed but used by {element}"
            ),
            Self::SubTypeInUse {
                element_type,
                sub_type,
                element,
            } => write!(
                f,
                "{element_type} sub-type '{sub_type}' removed but used by {element}"
            ),
            Self::StatusInUse {
                element_type,
                sub_type,
                status,
                element,
            } => write!(
                f,
                "{element_type} sub-type '{sub_type}' status '{status}' removed but used by {element}"
            ),
            Self::AttributeInUse {
                element_type,
                aspect,
                attribute,
                change,
                element,
            } => write!(
                f,
                "{element_type} attribute '{aspect}.{attribute}' {change:?} but set on {element}"
            ),
        }
    }
}
