use proptest::prelude::*;
use riskcat_incarnation::{
    respects_dependencies, InMemoryRepository, IncarnationApplier, IncarnationRequest,
    IncarnationResolver, ResolveOptions,
};
use riskcat_model::{IncarnationLookup, ItemId, RequestMode};
use riskcat_test_utils as fixtures;
use std::collections::HashSet;

proptest! {
    #[test]
    fn prop_resolution_visits_each_item_once(
        (count, edges) in fixtures::arb_edges(12),
        requested in 0..12usize,
        manual in any::<bool>(),
    ) {
        let domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let (graph, ids) = fixtures::graph_from_edges(domain.id, count, &edges);
        let repo = InMemoryRepository::new();
        repo.insert_unit(unit.clone());

        let request = IncarnationRequest::new(unit.id, domain.id, vec![ids[requested % count]]);
        let options = ResolveOptions {
            mode: if manual { RequestMode::Manual } else { RequestMode::Default },
            ..ResolveOptions::default()
        };
        let plan = IncarnationResolver::new(&graph, &repo).resolve(&request, &options).unwrap();

        let items: HashSet<ItemId> = plan.descriptions.iter().map(|d| d.item).collect();
        prop_assert_eq!(items.len(), plan.descriptions.len());
        prop_assert!(plan.descriptions.len() <= count);

        let mut order = plan.creation_order.clone();
        order.sort_unstable();
        prop_assert_eq!(order, (0..plan.descriptions.len()).collect::<Vec<_>>());
        prop_assert!(respects_dependencies(&plan.descriptions, &plan.creation_order));
    }

    #[test]
    fn prop_applied_order_creates_targets_first(
        (count, edges) in fixtures::arb_edges(10),
    ) {
        let mut domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let (graph, ids) = fixtures::graph_from_edges(domain.id, count, &edges);
        domain.catalog_items = graph.iter().cloned().collect();
        let repo = InMemoryRepository::new();
        repo.insert_unit(unit.clone());

        let request = IncarnationRequest::new(unit.id, domain.id, vec![ids[0]]);
        let plan = IncarnationResolver::new(&graph, &repo)
            .resolve(&request, &ResolveOptions::default())
            .unwrap();
        let applied = IncarnationApplier::new(&graph, &domain, &repo).apply(&plan).unwrap();

        let expected: Vec<_> = plan
            .creation_order
            .iter()
            .map(|&i| plan.descriptions[i].disposition.element())
            .collect();
        prop_assert_eq!(applied.created, expected);
    }

    #[test]
    fn prop_repeated_resolution_with_always_only_reuses(
        (count, edges) in fixtures::arb_edges(10),
    ) {
        let domain = fixtures::domain();
        let unit = fixtures::unit_in(&domain);
        let (graph, ids) = fixtures::graph_from_edges(domain.id, count, &edges);
        let repo = InMemoryRepository::new();
        repo.insert_unit(unit.clone());

        let request = IncarnationRequest::new(unit.id, domain.id, vec![ids[0]])
            .with_lookup(IncarnationLookup::Always);
        let options = request.options(&domain.incarnation_configuration);
        let resolver = IncarnationResolver::new(&graph, &repo);

        let first = resolver.resolve(&request, &options).unwrap();
        IncarnationApplier::new(&graph, &domain, &repo).apply(&first).unwrap();

        let second = resolver.resolve(&request, &options).unwrap();
        prop_assert_eq!(second.create_count(), 0);
        prop_assert_eq!(second.descriptions.len(), first.descriptions.len());
    }
}
