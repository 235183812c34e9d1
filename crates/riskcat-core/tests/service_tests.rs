use pretty_assertions::assert_eq;
use riskcat_core::{CatalogService, CoreConfig};
use riskcat_incarnation::{ElementRepository, IncarnationRequest, InMemoryRepository};
use riskcat_migration::{BreakingChange, ChangeKind};
use riskcat_model::{
    CellRef, Domain, ElementType, IncarnationLookup, ItemId, TailoringReferenceType,
    TemplateVersion, Unit,
};
use riskcat_test_utils as fixtures;
use std::collections::BTreeSet;

fn chain_domain() -> (Domain, [ItemId; 3]) {
    let mut domain = fixtures::domain();
    let (items, ids) = fixtures::copy_link_chain(domain.id);
    domain.catalog_items = items;
    (domain, ids)
}

fn service_with_unit(config: CoreConfig, domain: &Domain) -> (CatalogService<InMemoryRepository>, Unit) {
    let service = CatalogService::in_memory(config);
    let unit = fixtures::unit_in(domain);
    service.repository().insert_unit(unit.clone());
    (service, unit)
}

#[test]
fn configured_lookup_makes_second_request_reuse() {
    let (domain, [a, _, _]) = chain_domain();
    let (service, unit) = service_with_unit(
        CoreConfig::new().with_default_lookup(IncarnationLookup::Always),
        &domain,
    );
    let graph = domain.graph().unwrap();
    let request = IncarnationRequest::new(unit.id, domain.id, vec![a]);

    let applied = service.incarnate(&domain, &graph, &request).unwrap();
    assert_eq!(applied.created.len(), 3);

    let second = service.resolve_incarnation(&domain, &graph, &request).unwrap();
    assert_eq!(second.create_count(), 0);
    assert_eq!(second.reuse_count(), 3);
}

#[test]
fn request_filter_overrides_configured_filter() {
    let (domain, [a, _, _]) = chain_domain();
    let (service, unit) = service_with_unit(
        CoreConfig::new()
            .with_default_filter(None, Some([TailoringReferenceType::Link].into())),
        &domain,
    );
    let graph = domain.graph().unwrap();

    let request = IncarnationRequest::new(unit.id, domain.id, vec![a]);
    let plan = service.resolve_incarnation(&domain, &graph, &request).unwrap();
    assert_eq!(plan.descriptions.len(), 2);

    let request = request.with_include([TailoringReferenceType::Copy, TailoringReferenceType::Link]);
    let plan = service.resolve_incarnation(&domain, &graph, &request).unwrap();
    assert_eq!(plan.descriptions.len(), 3);
}

#[test]
fn configured_unique_names_reject_duplicates_as_integrity_error() {
    let (domain, [a, _, _]) = chain_domain();
    let (service, unit) =
        service_with_unit(CoreConfig::new().with_unique_names(true), &domain);
    service
        .repository()
        .insert_element(fixtures::element(&unit, &domain, "C", ElementType::Control));
    let graph = domain.graph().unwrap();

    let err = service
        .incarnate(&domain, &graph, &IncarnationRequest::new(unit.id, domain.id, vec![a]))
        .unwrap_err();
    assert!(err.is_integrity());
    assert!(!err.is_retryable());
    assert_eq!(service.repository().element_count(), 1);
}

#[test]
fn migration_reads_live_values_from_repository() {
    let domain = fixtures::domain();
    let (service, unit) = service_with_unit(CoreConfig::new(), &domain);
    let asset = fixtures::asset_with_risk_value(&unit, &domain, 0, CellRef::new(2, 1));
    service.repository().insert_element(asset.clone());

    let mut target = fixtures::domain_template(TemplateVersion::new(2, 0, 0));
    target.risk_definitions = vec![fixtures::dsra_without_impact(2)];
    let accepted: BTreeSet<_> = [ChangeKind::RiskMatrixRemove].into();

    let before = domain.clone();
    let outcome = service.evaluate_migration(&domain, &target, &accepted).unwrap();
    assert!(matches!(
        outcome.breaking_changes(),
        [BreakingChange::RiskValueInUse { cell, element, .. }]
            if *cell == CellRef::new(2, 1) && *element == asset.id
    ));
    assert!(outcome.new_domain().is_none());
    assert_eq!(domain, before);
    assert_eq!(
        service.repository().elements_in_domain(domain.id).unwrap().len(),
        1
    );
}

#[test]
fn configured_inert_kinds_are_respected() {
    let domain = fixtures::domain();
    let (service, _) =
        service_with_unit(CoreConfig::new().with_inert_change_kinds([]), &domain);
    let mut target = fixtures::domain_template(TemplateVersion::new(1, 1, 0));
    target.risk_definitions[0].translations.insert("en", "name", "Data security");

    let outcome = service
        .evaluate_migration(&domain, &target, &BTreeSet::new())
        .unwrap();
    assert!(!outcome.is_migrated());

    let outcome = service
        .evaluate_migration(&domain, &target, &[ChangeKind::TranslationDiff].into())
        .unwrap();
    assert!(outcome.is_migrated());
}

#[test]
fn diff_through_service() {
    let service = CatalogService::in_memory(CoreConfig::new());
    let changes = service.diff_risk_definition(&fixtures::dsra(), &fixtures::dsra_without_impact(0));
    assert!(changes.kinds().contains(&ChangeKind::RiskMatrixRemove));
    assert!(changes.requires_risk_recalculation());
}
