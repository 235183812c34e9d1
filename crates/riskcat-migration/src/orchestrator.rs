//! Migration Orchestrator
//!
//! Decides whether a domain can move to a newer template version without
//! corrupting client data:
//!
//! 1. Diff every risk definition of the template against the domain's.
//! 2. Every removal is checked against the risk values of live elements; each
//!    value it invalidates is a breaking change naming the element and cell.
//! 3. Other changes of a kind neither accepted by the caller nor inert are
//!    breaking.
//! 4. Element type definitions are checked against sub-types, statuses and
//!    attribute values of live elements.
//!
//! Any breaking change blocks the migration and the domain is returned
//! untouched. Otherwise the migrated domain is built from a copy.

use crate::breaking::BreakingChange;
use crate::change::{ChangeEffect, ChangeKind, ChangeSet, MatrixDimension, RiskDefinitionChange};
use crate::compatibility::attribute_change;
use crate::differ::{diff_risk_definition, new_risk_definition};
use crate::error::MigrationError;
use crate::state::{MigrationState, Trail};
use indexmap::IndexSet;
use riskcat_model::{
    Domain, DomainTemplate, Element, ElementTypeDefinition, RiskDefinition, RiskValueRef,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Result of evaluating a migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationOutcome {
    /// Every change was applied to a copy of the domain
    Migrated {
        domain: Box<Domain>,
        changes: Vec<ChangeSet>,
        trail: Trail,
    },
    /// Nothing was applied
    Blocked {
        breaking_changes: Vec<BreakingChange>,
        changes: Vec<ChangeSet>,
        trail: Trail,
    },
}

impl MigrationOutcome {
    #[must_use]
    pub const fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated { .. })
    }

    /// Migrated domain, unset when blocked
    #[must_use]
    pub fn new_domain(&self) -> Option<&Domain> {
        match self {
            Self::Migrated { domain, .. } => Some(domain),
            Self::Blocked { .. } => None,
        }
    }

    /// Breaking changes, empty when migrated
    #[must_use]
    pub fn breaking_changes(&self) -> &[BreakingChange] {
        match self {
            Self::Migrated { .. } => &[],
            Self::Blocked {
                breaking_changes, ..
            } => breaking_changes,
        }
    }

    #[must_use]
    pub fn changes(&self) -> &[ChangeSet] {
        match self {
            Self::Migrated { changes, .. } | Self::Blocked { changes, .. } => changes,
        }
    }

    /// Effects on client risk data across all risk definitions
    #[must_use]
    pub fn effects(&self) -> IndexSet<(String, ChangeEffect)> {
        self.changes()
            .iter()
            .flat_map(|set| {
                set.effects()
                    .into_iter()
                    .map(|effect| (set.risk_definition.clone(), effect))
            })
            .collect()
    }

    #[must_use]
    pub fn trail(&self) -> &Trail {
        match self {
            Self::Migrated { trail, .. } | Self::Blocked { trail, .. } => trail,
        }
    }

    #[must_use]
    pub fn state(&self) -> MigrationState {
        self.trail().current()
    }
}

/// Evaluates and applies domain template migrations
#[derive(Debug, Clone)]
pub struct MigrationOrchestrator {
    inert: BTreeSet<ChangeKind>,
}

impl Default for MigrationOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationOrchestrator {
    /// Orchestrator with the default inert change kinds
    #[must_use]
    pub fn new() -> Self {
        Self {
            inert: ChangeKind::default_inert(),
        }
    }

    /// Replace the change kinds accepted without being listed
    #[must_use]
    pub fn with_inert(mut self, inert: BTreeSet<ChangeKind>) -> Self {
        self.inert = inert;
        self
    }

    #[must_use]
    pub fn inert(&self) -> &BTreeSet<ChangeKind> {
        &self.inert
    }

    /// Evaluate migrating `domain` to `template`
    ///
    /// `elements` are the live elements of the domain. The domain is never
    /// modified; on success the outcome carries the migrated copy.
    pub fn evaluate(
        &self,
        domain: &Domain,
        template: &DomainTemplate,
        elements: &[Element],
        accepted: &BTreeSet<ChangeKind>,
    ) -> Result<MigrationOutcome, MigrationError> {
        if template.version < domain.template_version {
            return Err(MigrationError::Downgrade {
                current: domain.template_version,
                target: template.version,
            });
        }
        for definition in &template.risk_definitions {
            definition.validate()?;
        }
        if domain.template_version.is_major_upgrade_to(&template.version) {
            info!(
                "major template upgrade for domain {}: {} -> {}",
                domain.id, domain.template_version, template.version
            );
        }

        let mut trail = Trail::new();
        let elements: Vec<&Element> = elements.iter().filter(|e| e.domain == domain.id).collect();
        let accepted: BTreeSet<ChangeKind> = accepted.union(&self.inert).copied().collect();

        let mut changes = Vec::new();
        let mut breaking = Vec::new();

        for new in &template.risk_definitions {
            let set = if let Some(old) = domain.risk_definition(&new.id) {
                let set = diff_risk_definition(old, new);
                breaking.extend(classify(&set, old, &elements, &accepted));
                set
            } else {
                let set = new_risk_definition(new);
                breaking.extend(unaccepted(&set, &accepted));
                set
            };
            if !set.is_empty() {
                changes.push(set);
            }
        }
        breaking.extend(removed_risk_definitions(domain, template, &elements));
        breaking.extend(element_type_breaks(
            &domain.element_type_definitions,
            &template.element_type_definitions,
            &elements,
        ));

        let change_count: usize = changes.iter().map(ChangeSet::len).sum();
        debug!(
            "domain {}: {} risk definition changes, {} breaking",
            domain.id,
            change_count,
            breaking.len()
        );

        if !breaking.is_empty() {
            trail.advance(MigrationState::Blocked)?;
            warn!(
                "migration of domain {} to {} blocked by {} breaking changes",
                domain.id,
                template.version,
                breaking.len()
            );
            return Ok(MigrationOutcome::Blocked {
                breaking_changes: breaking,
                changes,
                trail,
            });
        }

        trail.advance(MigrationState::Applying)?;
        let migrated = migrate(domain, template);
        trail.advance(MigrationState::Migrated)?;
        info!(
            "domain {} migrated to template {} ({} changes)",
            domain.id, template.version, change_count
        );
        Ok(MigrationOutcome::Migrated {
            domain: Box::new(migrated),
            changes,
            trail,
        })
    }
}

fn migrate(domain: &Domain, template: &DomainTemplate) -> Domain {
    let mut migrated = domain.clone();
    migrated.template_id = template.id;
    migrated.template_version = template.version;
    migrated.risk_definitions = template.risk_definitions.clone();
    migrated.element_type_definitions = template.element_type_definitions.clone();
    migrated
}

fn unaccepted(set: &ChangeSet, accepted: &BTreeSet<ChangeKind>) -> Vec<BreakingChange> {
    set.iter()
        .filter(|change| !accepted.contains(&change.kind()))
        .map(|change| BreakingChange::UnacceptedChange {
            risk_definition: set.risk_definition.clone(),
            change: change.clone(),
        })
        .collect()
}

/// Breaking changes of one risk definition's change set
///
/// Removals are checked against live risk values whether accepted or not.
/// A removal hitting data is reported once per risk value; any other change
/// outside `accepted` is reported as unaccepted.
fn classify(
    set: &ChangeSet,
    old: &RiskDefinition,
    elements: &[&Element],
    accepted: &BTreeSet<ChangeKind>,
) -> Vec<BreakingChange> {
    let mut breaking = Vec::new();
    for change in set.iter() {
        let hits = values_in_use(change, old, elements);
        if !hits.is_empty() {
            breaking.extend(hits);
        } else if !accepted.contains(&change.kind()) {
            breaking.push(BreakingChange::UnacceptedChange {
                risk_definition: set.risk_definition.clone(),
                change: change.clone(),
            });
        }
    }
    breaking
}

/// Risk values of `elements` invalidated by a change
fn values_in_use(
    change: &RiskDefinitionChange,
    old: &RiskDefinition,
    elements: &[&Element],
) -> Vec<BreakingChange> {
    let mut breaking = Vec::new();
    for element in elements {
        for value in element.risk_values() {
            if value.risk_definition == old.id && removal_hits(change, old, value) {
                breaking.push(BreakingChange::RiskValueInUse {
                    risk_definition: old.id.clone(),
                    category: value.category,
                    cell: value.cell,
                    element: element.id,
                    change: change.clone(),
                });
            }
        }
    }
    breaking
}

/// Whether a removed axis entry is referenced by a risk value
fn removal_hits(
    change: &RiskDefinitionChange,
    old: &RiskDefinition,
    value: &RiskValueRef,
) -> bool {
    let RiskDefinitionChange::RiskMatrixRemove {
        dimension, index, ..
    } = change
    else {
        return false;
    };
    match dimension {
        MatrixDimension::Category { .. } | MatrixDimension::Matrix { .. } => {
            value.category == *index
        }
        MatrixDimension::Impact { category } => {
            old.categories.iter().position(|c| &c.id == category) == Some(value.category)
                && value.cell.row == *index
        }
        MatrixDimension::Probability => value.cell.column == *index,
        MatrixDimension::RiskValue => old
            .categories
            .get(value.category)
            .and_then(|c| c.cell(value.cell))
            .is_some_and(|cell| cell.value == *index),
    }
}

fn removed_risk_definitions(
    domain: &Domain,
    template: &DomainTemplate,
    elements: &[&Element],
) -> Vec<BreakingChange> {
    let mut breaking = Vec::new();
    for definition in &domain.risk_definitions {
        if template.risk_definition(&definition.id).is_some() {
            continue;
        }
        let users: BTreeSet<_> = elements
            .iter()
            .filter(|e| e.risk_values().any(|v| v.risk_definition == definition.id))
            .map(|e| e.id)
            .collect();
        if users.is_empty() {
            debug!("dropping unused risk definition '{}'", definition.id);
        }
        breaking.extend(
            users
                .into_iter()
                .map(|element| BreakingChange::RiskDefinitionRemoved {
                    risk_definition: definition.id.clone(),
                    element,
                }),
        );
    }
    breaking
}

fn element_type_breaks(
    old: &[ElementTypeDefinition],
    new: &[ElementTypeDefinition],
    elements: &[&Element],
) -> Vec<BreakingChange> {
    let mut breaking = Vec::new();
    for old_def in old {
        let new_def = new.iter().find(|d| d.element_type == old_def.element_type);
        let of_type = || {
            elements
                .iter()
                .filter(|e| e.element_type == old_def.element_type)
        };

        for (sub_type, definition) in &old_def.sub_types {
            let Some(new_sub) = new_def.and_then(|d| d.sub_types.get(sub_type)) else {
                breaking.extend(
                    of_type()
                        .filter(|e| e.sub_type.as_deref() == Some(sub_type.as_str()))
                        .map(|e| BreakingChange::SubTypeInUse {
                            element_type: old_def.element_type,
                            sub_type: sub_type.clone(),
                            element: e.id,
                        }),
                );
                continue;
            };
            for status in definition
                .statuses
                .iter()
                .filter(|s| !new_sub.statuses.contains(s))
            {
                breaking.extend(
                    of_type()
                        .filter(|e| {
                            e.sub_type.as_deref() == Some(sub_type.as_str())
                                && e.status.as_deref() == Some(status.as_str())
                        })
                        .map(|e| BreakingChange::StatusInUse {
                            element_type: old_def.element_type,
                            sub_type: sub_type.clone(),
                            status: status.clone(),
                            element: e.id,
                        }),
                );
            }
        }

        for (aspect, definition) in &old_def.custom_aspects {
            for (attribute, old_attr) in &definition.attributes {
                let new_attr = new_def
                    .and_then(|d| d.custom_aspects.get(aspect))
                    .and_then(|a| a.attributes.get(attribute));
                let Some(change) = attribute_change(old_attr, new_attr) else {
                    continue;
                };
                breaking.extend(
                    of_type()
                        .filter(|e| e.attribute_value(aspect, attribute).is_some())
                        .map(|e| BreakingChange::AttributeInUse {
                            element_type: old_def.element_type,
                            aspect: aspect.clone(),
                            attribute: attribute.clone(),
                            change,
                            element: e.id,
                        }),
                );
            }
        }
    }
    breaking
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use riskcat_model::{CellRef, ElementType, TemplateVersion};
    use riskcat_test_utils as fixtures;

    fn template(version: TemplateVersion) -> DomainTemplate {
        fixtures::domain_template(version)
    }

    #[test]
    fn unchanged_template_migrates_version_only() {
        let domain = fixtures::domain();
        let target = template(TemplateVersion::new(1, 1, 0));
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[], &BTreeSet::new())
            .unwrap();
        let migrated = outcome.new_domain().unwrap();
        assert_eq!(migrated.template_version, TemplateVersion::new(1, 1, 0));
        assert!(outcome.changes().is_empty());
        assert_eq!(
            outcome.trail().states(),
            &[
                MigrationState::Evaluating,
                MigrationState::Applying,
                MigrationState::Migrated
            ]
        );
    }

    #[test]
    fn downgrade_is_rejected() {
        let mut domain = fixtures::domain();
        domain.template_version = TemplateVersion::new(2, 0, 0);
        let err = MigrationOrchestrator::new()
            .evaluate(&domain, &template(TemplateVersion::new(1, 0, 0)), &[], &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, MigrationError::Downgrade { .. }));
    }

    #[test]
    fn invalid_template_is_rejected() {
        let domain = fixtures::domain();
        let mut target = template(TemplateVersion::new(1, 1, 0));
        target.risk_definitions[0].risk_values.truncate(1);
        let err = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[], &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidTemplate(_)));
    }

    #[test]
    fn unaccepted_removal_blocks_without_data() {
        let domain = fixtures::domain();
        let mut target = template(TemplateVersion::new(1, 1, 0));
        target.risk_definitions[0] = fixtures::dsra_without_impact(2);
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[], &BTreeSet::new())
            .unwrap();
        assert_eq!(outcome.state(), MigrationState::Blocked);
        assert!(matches!(
            outcome.breaking_changes(),
            [BreakingChange::UnacceptedChange { .. }]
        ));
    }

    #[test]
    fn unaccepted_removal_with_data_names_the_value() {
        let domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let asset = fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(2, 0));
        let mut target = template(TemplateVersion::new(1, 1, 0));
        target.risk_definitions[0] = fixtures::dsra_without_impact(2);
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[asset.clone()], &BTreeSet::new())
            .unwrap();
        assert!(matches!(
            outcome.breaking_changes(),
            [BreakingChange::RiskValueInUse { element, cell, .. }]
                if *element == asset.id && *cell == CellRef::new(2, 0)
        ));
    }

    #[test]
    fn accepted_removal_without_data_migrates() {
        let domain = fixtures::domain();
        let mut target = template(TemplateVersion::new(1, 1, 0));
        target.risk_definitions[0] = fixtures::dsra_without_impact(2);
        let outcome = MigrationOrchestrator::new()
            .evaluate(
                &domain,
                &target,
                &[],
                &[ChangeKind::RiskMatrixRemove].into(),
            )
            .unwrap();
        let migrated = outcome.new_domain().unwrap();
        assert_eq!(migrated.risk_definitions[0].categories[0].potential_impacts.len(), 2);
        assert!(outcome
            .effects()
            .contains(&("DSRA".to_string(), ChangeEffect::RiskRecalculation)));
    }

    #[test]
    fn probability_removal_hits_column() {
        let domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let mut target = template(TemplateVersion::new(1, 1, 0));
        let dsra = &mut target.risk_definitions[0];
        dsra.probability.levels.pop();
        for category in &mut dsra.categories {
            if let Some(matrix) = category.value_matrix.as_mut() {
                for row in matrix.iter_mut() {
                    row.pop();
                }
            }
        }
        let asset = fixtures::asset_with_risk_value(&unit, &domain, 1, CellRef::new(0, 2));
        let untouched = fixtures::asset_with_risk_value(&unit, &domain, 1, CellRef::new(2, 1));

        let outcome = MigrationOrchestrator::new()
            .evaluate(
                &domain,
                &target,
                &[asset.clone(), untouched],
                &[ChangeKind::RiskMatrixRemove].into(),
            )
            .unwrap();
        let affected: Vec<_> = outcome
            .breaking_changes()
            .iter()
            .filter_map(BreakingChange::element)
            .collect();
        assert_eq!(affected, vec![asset.id]);
    }

    #[test]
    fn unused_removed_definition_is_dropped() {
        let domain = fixtures::domain();
        let mut target = template(TemplateVersion::new(1, 1, 0));
        target.risk_definitions.clear();
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[], &BTreeSet::new())
            .unwrap();
        assert!(outcome.new_domain().unwrap().risk_definitions.is_empty());
    }

    #[test]
    fn removed_definition_in_use_blocks() {
        let domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let mut target = template(TemplateVersion::new(2, 0, 0));
        target.risk_definitions.clear();
        let asset = fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(0, 0));
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[asset.clone()], &BTreeSet::new())
            .unwrap();
        assert_eq!(
            outcome.breaking_changes(),
            &[BreakingChange::RiskDefinitionRemoved {
                risk_definition: "DSRA".into(),
                element: asset.id,
            }]
        );
    }

    #[test]
    fn new_definition_is_inert_by_default() {
        let domain = fixtures::domain();
        let mut target = template(TemplateVersion::new(1, 1, 0));
        let mut extra = fixtures::dsra();
        extra.id = "GDPR".into();
        target.risk_definitions.push(extra);
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[], &BTreeSet::new())
            .unwrap();
        assert!(outcome.is_migrated());

        let strict = MigrationOrchestrator::new()
            .with_inert(BTreeSet::new())
            .evaluate(&domain, &target, &[], &BTreeSet::new())
            .unwrap();
        assert!(!strict.is_migrated());
    }

    #[test]
    fn elements_of_other_domains_are_ignored() {
        let domain = fixtures::domain();
        let other = fixtures::domain();
        let unit = fixtures::unit_in(&other);
        let mut target = template(TemplateVersion::new(2, 0, 0));
        target.risk_definitions.clear();
        let asset = fixtures::asset_with_risk_value(&unit, &other, 0, CellRef::new(0, 0));
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[asset], &BTreeSet::new())
            .unwrap();
        assert!(outcome.is_migrated());
    }

    #[test]
    fn removed_sub_type_in_use_blocks() {
        let domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let mut target = template(TemplateVersion::new(2, 0, 0));
        for definition in &mut target.element_type_definitions {
            if definition.element_type == ElementType::Asset {
                definition.sub_types.remove("AST_Datatype");
            }
        }
        let element = fixtures::element(&unit, &domain, "Customer data", ElementType::Asset)
            .with_sub_type("AST_Datatype", "NEW");
        let outcome = MigrationOrchestrator::new()
            .evaluate(&domain, &target, &[element.clone()], &BTreeSet::new())
            .unwrap();
        assert_eq!(
            outcome.breaking_changes(),
            &[BreakingChange::SubTypeInUse {
                element_type: ElementType::Asset,
                sub_type: "AST_Datatype".into(),
                element: element.id,
            }]
        );
    }
}
