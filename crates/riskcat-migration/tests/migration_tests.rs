use pretty_assertions::assert_eq;
use riskcat_migration::{
    AttributeChange, BreakingChange, ChangeKind, MatrixDimension, MigrationOrchestrator,
    MigrationState, RiskDefinitionChange,
};
use riskcat_model::{AttributeDefinition, CellRef, ElementType, TemplateVersion};
use riskcat_test_utils as fixtures;
use serde_json::json;
use std::collections::BTreeSet;

fn accepting_removals() -> BTreeSet<ChangeKind> {
    [ChangeKind::RiskMatrixRemove].into()
}

#[test]
fn removed_impact_row_in_use_blocks_migration() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    target.risk_definitions = vec![fixtures::dsra_without_impact(2)];
    let asset = fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(2, 1));

    let before = domain.clone();
    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[asset.clone()], &accepting_removals())
        .unwrap();

    assert_eq!(
        outcome.breaking_changes(),
        &[BreakingChange::RiskValueInUse {
            risk_definition: "DSRA".into(),
            category: 0,
            cell: CellRef::new(2, 1),
            element: asset.id,
            change: RiskDefinitionChange::RiskMatrixRemove {
                dimension: MatrixDimension::Impact {
                    category: "C".into()
                },
                index: 2,
                label: Some("Level 2".into()),
            },
        }]
    );
    assert!(outcome.new_domain().is_none());
    assert_eq!(outcome.state(), MigrationState::Blocked);
    assert_eq!(domain, before);
}

#[test]
fn removed_impact_row_in_use_is_reported_without_accepted_kinds() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    target.risk_definitions = vec![fixtures::dsra_without_impact(2)];
    let asset = fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(2, 1));

    let before = domain.clone();
    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[asset.clone()], &BTreeSet::new())
        .unwrap();

    let breaking = outcome.breaking_changes();
    assert_eq!(breaking.len(), 1);
    assert!(matches!(
        &breaking[0],
        BreakingChange::RiskValueInUse { risk_definition, category: 0, cell, element, .. }
            if risk_definition == "DSRA" && *cell == CellRef::new(2, 1) && *element == asset.id
    ));
    assert!(outcome.new_domain().is_none());
    assert_eq!(outcome.state(), MigrationState::Blocked);
    assert_eq!(domain, before);
}

#[test]
fn unaccepted_removal_outside_used_values_is_still_unaccepted() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    target.risk_definitions = vec![fixtures::dsra_without_impact(2)];
    let asset = fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(1, 1));

    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[asset], &BTreeSet::new())
        .unwrap();

    assert!(matches!(
        outcome.breaking_changes(),
        [BreakingChange::UnacceptedChange { change: RiskDefinitionChange::RiskMatrixRemove { index: 2, .. }, .. }]
    ));
}

#[test]
fn values_outside_removed_row_do_not_block() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    target.risk_definitions = vec![fixtures::dsra_without_impact(2)];
    let elements = [
        fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(1, 2)),
        fixtures::asset_with_risk_value(&unit, &domain, 1, CellRef::new(2, 1)),
    ];

    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &elements, &accepting_removals())
        .unwrap();

    let migrated = outcome.new_domain().unwrap();
    assert_eq!(migrated.id, domain.id);
    assert_eq!(migrated.template_id, target.id);
    assert_eq!(migrated.risk_definitions, target.risk_definitions);
}

#[test]
fn blocked_outcome_reports_every_breaking_change() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    let mut dsra = fixtures::dsra_without_impact(2);
    dsra.categories.remove(1);
    target.risk_definitions = vec![dsra];
    let elements = [
        fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(2, 0)),
        fixtures::asset_with_risk_value(&unit, &domain, 1, CellRef::new(0, 0)),
    ];

    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &elements, &accepting_removals())
        .unwrap();

    let affected: BTreeSet<_> = outcome
        .breaking_changes()
        .iter()
        .filter_map(BreakingChange::element)
        .collect();
    assert_eq!(affected, elements.iter().map(|e| e.id).collect());
    assert!(outcome.new_domain().is_none());
}

#[test]
fn removed_status_in_use_blocks() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    for definition in &mut target.element_type_definitions {
        if let Some(server) = definition.sub_types.get_mut("AST_Server") {
            server.statuses.retain(|s| s != "IN_OPERATION");
        }
    }
    let server = fixtures::element(&unit, &domain, "Mail server", ElementType::Asset)
        .with_sub_type("AST_Server", "IN_OPERATION");
    let fresh = fixtures::element(&unit, &domain, "Web server", ElementType::Asset)
        .with_sub_type("AST_Server", "NEW");

    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[server.clone(), fresh], &BTreeSet::new())
        .unwrap();

    assert_eq!(
        outcome.breaking_changes(),
        &[BreakingChange::StatusInUse {
            element_type: ElementType::Asset,
            sub_type: "AST_Server".into(),
            status: "IN_OPERATION".into(),
            element: server.id,
        }]
    );
}

#[test]
fn narrowed_enum_attribute_in_use_blocks() {
    let domain = fixtures::domain();
    let unit = fixtures::unit_in(&domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    for definition in &mut target.element_type_definitions {
        if let Some(aspect) = definition.custom_aspects.get_mut("asset_details") {
            aspect.attributes.insert(
                "asset_kind".into(),
                AttributeDefinition::Enum {
                    allowed_values: vec!["physical".into()],
                },
            );
        }
    }
    let mut asset = fixtures::element(&unit, &domain, "VM", ElementType::Asset);
    asset
        .custom_aspects
        .entry("asset_details".into())
        .or_default()
        .insert("asset_kind".into(), json!("virtual"));

    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[asset.clone()], &BTreeSet::new())
        .unwrap();

    assert_eq!(
        outcome.breaking_changes(),
        &[BreakingChange::AttributeInUse {
            element_type: ElementType::Asset,
            aspect: "asset_details".into(),
            attribute: "asset_kind".into(),
            change: AttributeChange::Modification,
            element: asset.id,
        }]
    );
}

#[test]
fn widened_enum_and_unused_attribute_removal_migrate() {
    let domain = fixtures::domain();
    let mut target = fixtures::domain_template(TemplateVersion::new(1, 1, 0));
    for definition in &mut target.element_type_definitions {
        if let Some(aspect) = definition.custom_aspects.get_mut("asset_details") {
            aspect.attributes.remove("asset_owner");
            aspect.attributes.insert(
                "asset_kind".into(),
                AttributeDefinition::Enum {
                    allowed_values: vec!["physical".into(), "virtual".into(), "cloud".into()],
                },
            );
        }
    }

    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[], &BTreeSet::new())
        .unwrap();

    assert!(outcome.is_migrated());
    assert_eq!(
        outcome.new_domain().unwrap().element_type_definitions,
        target.element_type_definitions
    );
}

#[test]
fn outcome_serializes_with_state_tag() {
    let domain = fixtures::domain();
    let target = fixtures::domain_template(TemplateVersion::new(1, 0, 1));
    let outcome = MigrationOrchestrator::new()
        .evaluate(&domain, &target, &[], &BTreeSet::new())
        .unwrap();
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["state"], "MIGRATED");
    assert_eq!(value["trail"], json!(["EVALUATING", "APPLYING", "MIGRATED"]));
}
