//! Risk definition changes
//!
//! The closed set of structural differences between two versions of a risk
//! definition, their kinds, and the effects they have on client data.

use indexmap::IndexSet;
use riskcat_model::{CellRef, ModelError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Axis of a risk definition that gained or lost an entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "axis", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixDimension {
    /// Criteria category, `index` is its position
    Category { id: String },
    /// Probability level, `index` is the matrix column
    Probability,
    /// Impact level of a category, `index` is the matrix row
    Impact { category: String },
    /// Risk value level, `index` is the ordinal
    RiskValue,
    /// Value matrix of a category, `index` is the category position
    Matrix { category: String },
}

/// Element of a risk definition carrying a color or translations
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeTarget {
    Definition,
    Probability,
    ProbabilityLevel { index: usize },
    RiskValue { index: usize },
    Category { id: String },
    Impact { category: String, index: usize },
    MatrixCell { category: String, cell: CellRef },
}

/// One structural difference between two versions of a risk definition
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDefinitionChange {
    /// The template introduces a definition the domain does not have
    NewRiskDefinition { risk_definition: String },
    /// Color of a level or cell changed
    ColorDiff {
        target: ChangeTarget,
        old: Option<String>,
        new: Option<String>,
    },
    /// Axis entry added at `index`
    RiskMatrixAdd {
        dimension: MatrixDimension,
        index: usize,
        label: Option<String>,
    },
    /// Axis entry removed at `index`
    RiskMatrixRemove {
        dimension: MatrixDimension,
        index: usize,
        label: Option<String>,
    },
    /// Cell value changed
    RiskMatrixDiff {
        category: String,
        cell: CellRef,
        old: usize,
        new: usize,
    },
    /// Translated text changed, added or removed
    TranslationDiff {
        target: ChangeTarget,
        locale: String,
        field: String,
        old: Option<String>,
        new: Option<String>,
    },
}

impl RiskDefinitionChange {
    /// Payload-free kind
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::NewRiskDefinition { .. } => ChangeKind::NewRiskDefinition,
            Self::ColorDiff { .. } => ChangeKind::ColorDiff,
            Self::RiskMatrixAdd { .. } => ChangeKind::RiskMatrixAdd,
            Self::RiskMatrixRemove { .. } => ChangeKind::RiskMatrixRemove,
            Self::RiskMatrixDiff { .. } => ChangeKind::RiskMatrixDiff,
            Self::TranslationDiff { .. } => ChangeKind::TranslationDiff,
        }
    }

    /// What applying this change does to existing risk values
    #[must_use]
    pub fn effects(&self) -> Vec<ChangeEffect> {
        match self {
            Self::NewRiskDefinition { .. } | Self::ColorDiff { .. } | Self::TranslationDiff { .. } => {
                Vec::new()
            }
            Self::RiskMatrixDiff { .. } => vec![ChangeEffect::RiskRecalculation],
            Self::RiskMatrixAdd { dimension, .. } => match dimension {
                MatrixDimension::Category { id } => vec![ChangeEffect::RiskValueCategoryAddition {
                    category: id.clone(),
                }],
                MatrixDimension::Matrix { category } => vec![
                    ChangeEffect::RiskValueCategoryAddition {
                        category: category.clone(),
                    },
                    ChangeEffect::RiskRecalculation,
                ],
                _ => vec![ChangeEffect::RiskRecalculation],
            },
            Self::RiskMatrixRemove { dimension, .. } => match dimension {
                MatrixDimension::Category { id } => vec![ChangeEffect::RiskValueCategoryRemoval {
                    category: id.clone(),
                }],
                MatrixDimension::Matrix { category } => vec![
                    ChangeEffect::RiskValueCategoryRemoval {
                        category: category.clone(),
                    },
                    ChangeEffect::RiskRecalculation,
                ],
                _ => vec![ChangeEffect::RiskRecalculation],
            },
        }
    }
}

/// Kind of a risk definition change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    NewRiskDefinition,
    ColorDiff,
    RiskMatrixAdd,
    RiskMatrixDiff,
    RiskMatrixRemove,
    TranslationDiff,
}

impl ChangeKind {
    pub const ALL: [Self; 6] = [
        Self::NewRiskDefinition,
        Self::ColorDiff,
        Self::RiskMatrixAdd,
        Self::RiskMatrixDiff,
        Self::RiskMatrixRemove,
        Self::TranslationDiff,
    ];

    /// Kinds accepted without being listed: they never touch risk values
    #[must_use]
    pub fn default_inert() -> BTreeSet<Self> {
        [Self::NewRiskDefinition, Self::TranslationDiff, Self::ColorDiff].into()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NewRiskDefinition => "NewRiskDefinition",
            Self::ColorDiff => "ColorDiff",
            Self::RiskMatrixAdd => "RiskMatrixAdd",
            Self::RiskMatrixDiff => "RiskMatrixDiff",
            Self::RiskMatrixRemove => "RiskMatrixRemove",
            Self::TranslationDiff => "TranslationDiff",
        }
    }
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChangeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownLiteral {
                kind: "change kind",
                value: s.to_string(),
            })
    }
}

/// Consequence of a change for client risk data
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEffect {
    /// Derived risk values must be recomputed
    RiskRecalculation,
    /// Risks gain values for a new category
    RiskValueCategoryAddition { category: String },
    /// Risk values of a category are dropped
    RiskValueCategoryRemoval { category: String },
}

/// Changes of one risk definition, in discovery order, without duplicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub risk_definition: String,
    changes: IndexSet<RiskDefinitionChange>,
}

impl ChangeSet {
    #[must_use]
    pub fn new(risk_definition: impl Into<String>) -> Self {
        Self {
            risk_definition: risk_definition.into(),
            changes: IndexSet::new(),
        }
    }

    /// Add a change, returning false if it was already present
    pub fn push(&mut self, change: RiskDefinitionChange) -> bool {
        self.changes.insert(change)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskDefinitionChange> {
        self.changes.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, change: &RiskDefinitionChange) -> bool {
        self.changes.contains(change)
    }

    /// Kinds present
    #[must_use]
    pub fn kinds(&self) -> BTreeSet<ChangeKind> {
        self.changes.iter().map(RiskDefinitionChange::kind).collect()
    }

    /// Changes of one kind
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &RiskDefinitionChange> {
        self.changes.iter().filter(move |c| c.kind() == kind)
    }

    /// Distinct effects of all changes
    #[must_use]
    pub fn effects(&self) -> IndexSet<ChangeEffect> {
        self.changes.iter().flat_map(RiskDefinitionChange::effects).collect()
    }

    #[must_use]
    pub fn requires_risk_recalculation(&self) -> bool {
        self.effects().contains(&ChangeEffect::RiskRecalculation)
    }

    /// Whether client risk data must be migrated when applying
    #[must_use]
    pub fn requires_migration(&self) -> bool {
        !self.effects().is_empty()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a RiskDefinitionChange;
    type IntoIter = indexmap::set::Iter<'a, RiskDefinitionChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remove(dimension: MatrixDimension) -> RiskDefinitionChange {
        RiskDefinitionChange::RiskMatrixRemove {
            dimension,
            index: 0,
            label: None,
        }
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut set = ChangeSet::new("DSRA");
        assert!(set.push(remove(MatrixDimension::Probability)));
        assert!(!set.push(remove(MatrixDimension::Probability)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn cosmetic_changes_need_no_migration() {
        let mut set = ChangeSet::new("DSRA");
        set.push(RiskDefinitionChange::ColorDiff {
            target: ChangeTarget::RiskValue { index: 0 },
            old: Some("#fff".into()),
            new: Some("#000".into()),
        });
        assert!(!set.requires_migration());
        assert!(!set.requires_risk_recalculation());
    }

    #[test]
    fn category_removal_drops_values_without_recalculation() {
        let mut set = ChangeSet::new("DSRA");
        set.push(remove(MatrixDimension::Category { id: "C".into() }));
        assert!(set.requires_migration());
        assert!(!set.requires_risk_recalculation());
        assert_eq!(
            set.effects().into_iter().collect::<Vec<_>>(),
            vec![ChangeEffect::RiskValueCategoryRemoval {
                category: "C".into()
            }]
        );
    }

    #[test]
    fn matrix_cell_change_requires_recalculation() {
        let mut set = ChangeSet::new("DSRA");
        set.push(RiskDefinitionChange::RiskMatrixDiff {
            category: "C".into(),
            cell: CellRef::new(0, 0),
            old: 0,
            new: 1,
        });
        assert!(set.requires_risk_recalculation());
    }

    #[test]
    fn kind_names_parse() {
        for kind in ChangeKind::ALL {
            assert_eq!(kind.name().parse::<ChangeKind>().unwrap(), kind);
        }
        assert!("Rename".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn change_serializes_with_type_tag() {
        let json = serde_json::to_value(remove(MatrixDimension::Impact {
            category: "C".into(),
        }))
        .unwrap();
        assert_eq!(json["type"], "RISK_MATRIX_REMOVE");
        assert_eq!(json["dimension"]["axis"], "IMPACT");
        assert_eq!(json["dimension"]["category"], "C");
    }
}
