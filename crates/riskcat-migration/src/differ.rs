//! Risk definition differ
//!
//! Compares two versions of a risk definition position by position. Risk
//! values point into the matrix by index, so an entry that moved is reported
//! as removed at its old position and added at its new one. Reporting a
//! rename as remove + add is acceptable; missing a structural change is not.

use crate::change::{ChangeSet, ChangeTarget, MatrixDimension, RiskDefinitionChange};
use riskcat_model::{CategoryDefinition, CellRef, Level, RiskDefinition, Translations, ValueMatrix};

const LABEL_LOCALE: &str = "en";

/// Structural changes from `old` to `new`
///
/// Identical inputs yield an empty set.
#[must_use]
pub fn diff_risk_definition(old: &RiskDefinition, new: &RiskDefinition) -> ChangeSet {
    let mut changes = ChangeSet::new(&new.id);

    diff_translations(&mut changes, &ChangeTarget::Definition, &old.translations, &new.translations);
    diff_translations(
        &mut changes,
        &ChangeTarget::Probability,
        &old.probability.translations,
        &new.probability.translations,
    );
    diff_levels(
        &mut changes,
        &old.probability.levels,
        &new.probability.levels,
        &MatrixDimension::Probability,
        |index| ChangeTarget::ProbabilityLevel { index },
    );
    diff_levels(
        &mut changes,
        &old.risk_values,
        &new.risk_values,
        &MatrixDimension::RiskValue,
        |index| ChangeTarget::RiskValue { index },
    );

    let count = old.categories.len().max(new.categories.len());
    for index in 0..count {
        match (old.categories.get(index), new.categories.get(index)) {
            (Some(o), Some(n)) if o.id == n.id => diff_category(&mut changes, index, o, n),
            (o, n) => {
                if let Some(o) = o {
                    changes.push(RiskDefinitionChange::RiskMatrixRemove {
                        dimension: MatrixDimension::Category { id: o.id.clone() },
                        index,
                        label: category_label(o),
                    });
                }
                if let Some(n) = n {
                    changes.push(RiskDefinitionChange::RiskMatrixAdd {
                        dimension: MatrixDimension::Category { id: n.id.clone() },
                        index,
                        label: category_label(n),
                    });
                }
            }
        }
    }

    tracing::debug!("risk definition '{}': {} changes", new.id, changes.len());
    changes
}

/// Change set announcing a definition the domain does not have yet
#[must_use]
pub fn new_risk_definition(definition: &RiskDefinition) -> ChangeSet {
    let mut changes = ChangeSet::new(&definition.id);
    changes.push(RiskDefinitionChange::NewRiskDefinition {
        risk_definition: definition.id.clone(),
    });
    changes
}

fn diff_category(
    changes: &mut ChangeSet,
    index: usize,
    old: &CategoryDefinition,
    new: &CategoryDefinition,
) {
    let id = &new.id;
    diff_translations(
        changes,
        &ChangeTarget::Category { id: id.clone() },
        &old.translations,
        &new.translations,
    );
    diff_levels(
        changes,
        &old.potential_impacts,
        &new.potential_impacts,
        &MatrixDimension::Impact {
            category: id.clone(),
        },
        |index| ChangeTarget::Impact {
            category: id.clone(),
            index,
        },
    );

    match (&old.value_matrix, &new.value_matrix) {
        (Some(_), None) => {
            changes.push(RiskDefinitionChange::RiskMatrixRemove {
                dimension: MatrixDimension::Matrix {
                    category: id.clone(),
                },
                index,
                label: category_label(old),
            });
        }
        (None, Some(_)) => {
            changes.push(RiskDefinitionChange::RiskMatrixAdd {
                dimension: MatrixDimension::Matrix {
                    category: id.clone(),
                },
                index,
                label: category_label(new),
            });
        }
        (Some(o), Some(n)) => diff_cells(changes, id, o, n),
        (None, None) => {}
    }
}

/// Cells inside the region both matrices cover
fn diff_cells(changes: &mut ChangeSet, category: &str, old: &ValueMatrix, new: &ValueMatrix) {
    for (row, (old_row, new_row)) in old.iter().zip(new).enumerate() {
        for (column, (o, n)) in old_row.iter().zip(new_row).enumerate() {
            let cell = CellRef::new(row, column);
            if o.value != n.value {
                changes.push(RiskDefinitionChange::RiskMatrixDiff {
                    category: category.to_string(),
                    cell,
                    old: o.value,
                    new: n.value,
                });
            } else if o.html_color != n.html_color {
                changes.push(RiskDefinitionChange::ColorDiff {
                    target: ChangeTarget::MatrixCell {
                        category: category.to_string(),
                        cell,
                    },
                    old: o.html_color.clone(),
                    new: n.html_color.clone(),
                });
            }
        }
    }
}

fn diff_levels(
    changes: &mut ChangeSet,
    old: &[Level],
    new: &[Level],
    dimension: &MatrixDimension,
    target: impl Fn(usize) -> ChangeTarget,
) {
    for index in 0..old.len().max(new.len()) {
        match (old.get(index), new.get(index)) {
            (Some(o), Some(n)) => {
                if o.html_color != n.html_color {
                    changes.push(RiskDefinitionChange::ColorDiff {
                        target: target(index),
                        old: o.html_color.clone(),
                        new: n.html_color.clone(),
                    });
                }
                diff_translations(changes, &target(index), &o.translations, &n.translations);
            }
            (Some(o), None) => {
                changes.push(RiskDefinitionChange::RiskMatrixRemove {
                    dimension: dimension.clone(),
                    index,
                    label: o.name(LABEL_LOCALE).map(str::to_string),
                });
            }
            (None, Some(n)) => {
                changes.push(RiskDefinitionChange::RiskMatrixAdd {
                    dimension: dimension.clone(),
                    index,
                    label: n.name(LABEL_LOCALE).map(str::to_string),
                });
            }
            (None, None) => {}
        }
    }
}

fn diff_translations(
    changes: &mut ChangeSet,
    target: &ChangeTarget,
    old: &Translations,
    new: &Translations,
) {
    for (locale, field) in old.keys_union(new) {
        let (o, n) = (old.get(locale, field), new.get(locale, field));
        if o != n {
            changes.push(RiskDefinitionChange::TranslationDiff {
                target: target.clone(),
                locale: locale.to_string(),
                field: field.to_string(),
                old: o.map(str::to_string),
                new: n.map(str::to_string),
            });
        }
    }
}

fn category_label(category: &CategoryDefinition) -> Option<String> {
    Some(
        category
            .translations
            .name(LABEL_LOCALE)
            .unwrap_or(&category.id)
            .to_string(),
    )
}
