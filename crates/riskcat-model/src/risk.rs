//! Risk definitions
//!
//! A risk definition describes how risks are evaluated in a domain:
//!
//! - an ordered probability scale
//! - an ordered risk value scale
//! - criteria categories, each with an ordered impact scale and an optional
//!   value matrix (`rows = impacts`, `columns = probabilities`)
//!
//! Risk values on elements point into these scales by position, so every
//! structural change to the axes matters to migration.

use crate::element::CellRef;
use crate::error::ModelError;
use crate::translation::Translations;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One step on an ordered scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub ordinal: usize,
    #[serde(default)]
    pub html_color: Option<String>,
    #[serde(default)]
    pub translations: Translations,
}

impl Level {
    #[must_use]
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            html_color: None,
            translations: Translations::new(),
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.html_color = Some(color.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, locale: &str, name: &str) -> Self {
        self.translations.insert(locale, "name", name);
        self
    }

    /// Name in a locale, for reporting
    #[must_use]
    pub fn name(&self, locale: &str) -> Option<&str> {
        self.translations.name(locale)
    }
}

/// Probability axis of a risk definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityDefinition {
    pub levels: Vec<Level>,
    #[serde(default)]
    pub translations: Translations,
}

/// Single cell of a value matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    /// Ordinal on the risk value scale
    pub value: usize,
    #[serde(default)]
    pub html_color: Option<String>,
}

impl MatrixCell {
    #[must_use]
    pub fn new(value: usize) -> Self {
        Self {
            value,
            html_color: None,
        }
    }
}

/// Value matrix, `matrix[impact][probability]`
pub type ValueMatrix = Vec<Vec<MatrixCell>>;

/// Criteria category (confidentiality, integrity, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub id: String,
    pub potential_impacts: Vec<Level>,
    #[serde(default)]
    pub value_matrix: Option<ValueMatrix>,
    #[serde(default)]
    pub translations: Translations,
}

impl CategoryDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, potential_impacts: Vec<Level>) -> Self {
        Self {
            id: id.into(),
            potential_impacts,
            value_matrix: None,
            translations: Translations::new(),
        }
    }

    #[must_use]
    pub fn with_matrix(mut self, matrix: ValueMatrix) -> Self {
        self.value_matrix = Some(matrix);
        self
    }

    /// Whether risk values can be derived for this category
    #[inline]
    #[must_use]
    pub fn is_risk_category(&self) -> bool {
        self.value_matrix.is_some()
    }

    /// Matrix cell at a position
    #[must_use]
    pub fn cell(&self, cell: CellRef) -> Option<&MatrixCell> {
        self.value_matrix.as_ref()?.get(cell.row)?.get(cell.column)
    }
}

/// Risk definition of a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDefinition {
    pub id: String,
    pub probability: ProbabilityDefinition,
    pub risk_values: Vec<Level>,
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
    #[serde(default)]
    pub translations: Translations,
}

impl RiskDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            probability: ProbabilityDefinition::default(),
            risk_values: Vec::new(),
            categories: Vec::new(),
            translations: Translations::new(),
        }
    }

    #[must_use]
    pub fn with_probability(mut self, levels: Vec<Level>) -> Self {
        self.probability.levels = levels;
        self
    }

    #[must_use]
    pub fn with_risk_values(mut self, levels: Vec<Level>) -> Self {
        self.risk_values = levels;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: CategoryDefinition) -> Self {
        self.categories.push(category);
        self
    }

    /// Category by id
    #[must_use]
    pub fn category(&self, id: &str) -> Option<&CategoryDefinition> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Check the matrix shapes against the axes
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.id.as_str()) {
                return Err(ModelError::invalid_risk_definition(
                    &self.id,
                    format!("duplicate category '{}'", category.id),
                ));
            }
            let Some(matrix) = &category.value_matrix else {
                continue;
            };
            if matrix.len() != category.potential_impacts.len() {
                return Err(ModelError::invalid_risk_definition(
                    &self.id,
                    format!(
                        "category '{}' has {} matrix rows for {} impacts",
                        category.id,
                        matrix.len(),
                        category.potential_impacts.len()
                    ),
                ));
            }
            for (row, cells) in matrix.iter().enumerate() {
                if cells.len() != self.probability.levels.len() {
                    return Err(ModelError::invalid_risk_definition(
                        &self.id,
                        format!(
                            "category '{}' row {row} has {} cells for {} probabilities",
                            category.id,
                            cells.len(),
                            self.probability.levels.len()
                        ),
                    ));
                }
                if let Some(column) = cells.iter().position(|c| c.value >= self.risk_values.len())
                {
                    return Err(ModelError::invalid_risk_definition(
                        &self.id,
                        format!(
                            "category '{}' cell ({row},{column}) exceeds the risk value scale",
                            category.id
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
