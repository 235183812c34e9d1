//! Incarnation resolver
//!
//! Expands requested template items into an [`IncarnationPlan`]:
//!
//! 1. Requested items must exist in the request's namespace.
//! 2. Every requested item brings its copy closure.
//! 3. DEFAULT mode walks all admitted references breadth-first; MANUAL mode
//!    only follows references needed for referential integrity.
//! 4. Each planned item is created or, if the lookup policy allows and an
//!    incarnation exists in the unit, reused. References of reused items are
//!    only followed under the ALWAYS lookup; the walk is repeated without
//!    them until the set of reused items is stable.
//! 5. References are resolved to planned descriptions, existing elements, or
//!    left unresolved. Broken references become integrity issues.
//!
//! Every item is visited at most once, so reference cycles terminate.

use crate::error::ResolveError;
use crate::ordering::creation_order;
use crate::plan::{
    AuxiliaryTarget, Disposition, IncarnationDescription, IncarnationPlan, IncarnationRequest,
    IntegrityIssue, ReferenceTarget, ResolveOptions, ResolvedReference,
};
use crate::repository::ElementRepository;
use indexmap::IndexMap;
use riskcat_model::{
    Element, ElementId, IncarnationLookup, ItemId, ItemNamespace, RequestMode, TailoringReference,
    TailoringReferenceType, TemplateGraph, TemplateItem,
};
use std::collections::{HashMap, HashSet, VecDeque};

/// Resolves requests against a template graph and a unit's existing elements
#[derive(Debug)]
pub struct IncarnationResolver<'a, R: ?Sized> {
    graph: &'a TemplateGraph,
    repository: &'a R,
}

impl<'a, R: ElementRepository + ?Sized> IncarnationResolver<'a, R> {
    #[must_use]
    pub fn new(graph: &'a TemplateGraph, repository: &'a R) -> Self {
        Self { graph, repository }
    }

    /// Compute the plan for a request
    pub fn resolve(
        &self,
        request: &IncarnationRequest,
        options: &ResolveOptions,
    ) -> Result<IncarnationPlan, ResolveError> {
        if request.items.is_empty() {
            return Err(ResolveError::EmptyRequest);
        }
        let namespace = request.source();
        for &id in &request.items {
            if !self.graph.get(id).is_some_and(|i| i.namespace == namespace) {
                return Err(ResolveError::ItemNotFound(id));
            }
        }
        tracing::info!(
            "resolving {} requested items into unit {} (mode {:?}, lookup {})",
            request.items.len(),
            request.unit,
            options.mode,
            options.lookup
        );

        let mut incarnations = Incarnations::default();
        let mut reused = HashSet::new();
        let walk = loop {
            let mut walk = Walk::new(self.graph, namespace, options, reused.clone());
            for &id in &request.items {
                walk.plan_with_copies(id, true);
            }
            match options.mode {
                RequestMode::Default => walk.expand(|_| true),
                RequestMode::Manual => walk.expand(TailoringReferenceType::is_integrity_required),
            }
            self.look_up(request, options.lookup, &walk, &mut incarnations)?;
            if options.lookup == IncarnationLookup::Always {
                break walk;
            }
            let newly_reused: Vec<ItemId> = walk
                .planned
                .iter()
                .filter(|&(id, &requested)| {
                    !reused.contains(id)
                        && options.lookup.applies_to(requested)
                        && walk
                            .item(*id)
                            .and_then(|item| incarnations.existing(options.lookup, item))
                            .is_some()
                })
                .map(|(&id, _)| id)
                .collect();
            if newly_reused.is_empty() {
                break walk;
            }
            tracing::debug!(
                "not following references of {} reused items",
                newly_reused.len()
            );
            reused.extend(newly_reused);
        };

        let mut builder = PlanBuilder {
            walk: &walk,
            options,
            incarnations: &incarnations.by_item,
            issues: Vec::new(),
        };
        let mut descriptions = builder.descriptions();
        let issues = builder.issues;

        if options.merge_bidirectional_references {
            merge_bidirectional(&mut descriptions);
        }
        for issue in &issues {
            tracing::warn!("integrity issue in incarnation plan: {:?}", issue);
        }

        let plan = IncarnationPlan {
            unit: request.unit,
            domain: request.domain,
            lookup: options.lookup,
            creation_order: creation_order(&descriptions),
            descriptions,
            issues,
        };
        tracing::info!(
            "incarnation plan: {} descriptions ({} create, {} reuse), {} integrity issues",
            plan.descriptions.len(),
            plan.create_count(),
            plan.reuse_count(),
            plan.issues.len()
        );
        Ok(plan)
    }

    /// Fetch incarnations of planned or referenced items not looked up yet
    fn look_up(
        &self,
        request: &IncarnationRequest,
        lookup: IncarnationLookup,
        walk: &Walk<'_>,
        found: &mut Incarnations,
    ) -> Result<(), ResolveError> {
        if lookup == IncarnationLookup::Never {
            return Ok(());
        }
        let mut candidates: Vec<ItemId> = walk
            .planned
            .keys()
            .chain(walk.unplanned_targets().iter())
            .filter_map(|&id| self.graph.get(id)?.applied_item())
            .filter(|id| !found.queried.contains(id))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        if candidates.is_empty() {
            return Ok(());
        }

        found.queried.extend(candidates.iter().copied());
        for element in
            self.repository
                .find_incarnations(request.unit, request.domain, &candidates)?
        {
            if let Some(applied) = element.applied_item {
                found.by_item.entry(applied.item).or_default().push(element);
            }
        }
        tracing::debug!(
            "found existing incarnations for {} of {} queried items",
            found.by_item.len(),
            found.queried.len()
        );
        Ok(())
    }
}

/// Existing elements of the unit by the catalog item they were incarnated from
#[derive(Default)]
struct Incarnations {
    by_item: HashMap<ItemId, Vec<Element>>,
    queried: HashSet<ItemId>,
}

impl Incarnations {
    fn existing(&self, lookup: IncarnationLookup, item: &TemplateItem) -> Option<ElementId> {
        existing_incarnation(&self.by_item, lookup, item)
    }
}

/// Existing incarnation of an item satisfying the lookup policy
fn existing_incarnation(
    incarnations: &HashMap<ItemId, Vec<Element>>,
    lookup: IncarnationLookup,
    item: &TemplateItem,
) -> Option<ElementId> {
    let applied = item.applied_item()?;
    let same_version = lookup == IncarnationLookup::SameVersion;
    incarnations
        .get(&applied)?
        .iter()
        .find(|e| {
            !same_version
                || e.applied_item
                    .is_some_and(|a| a.version == item.template_version)
        })
        .map(|e| e.id)
}

/// Cycle-safe traversal collecting the items to plan
struct Walk<'g> {
    graph: &'g TemplateGraph,
    namespace: ItemNamespace,
    options: &'g ResolveOptions,
    /// Planned item -> requested (directly or through a requested item's copies)
    planned: IndexMap<ItemId, bool>,
    /// Reused items whose references are not followed
    reused: HashSet<ItemId>,
}

impl<'g> Walk<'g> {
    fn new(
        graph: &'g TemplateGraph,
        namespace: ItemNamespace,
        options: &'g ResolveOptions,
        reused: HashSet<ItemId>,
    ) -> Self {
        Self {
            graph,
            namespace,
            options,
            planned: IndexMap::new(),
            reused,
        }
    }

    /// References of an item that the walk follows
    fn followed(&self, item: &'g TemplateItem) -> Vec<&'g TailoringReference> {
        if self.reused.contains(&item.id) {
            return Vec::new();
        }
        self.admitted(item).collect()
    }

    fn item(&self, id: ItemId) -> Option<&'g TemplateItem> {
        self.graph.get(id).filter(|i| i.namespace == self.namespace)
    }

    fn admitted(&self, item: &'g TemplateItem) -> impl Iterator<Item = &'g TailoringReference> + 'g {
        let options: &'g ResolveOptions = self.options;
        item.tailoring_references
            .iter()
            .filter(move |r| options.filter.admits(r.reference_type()))
    }

    /// Plan an item and its copy closure, returning what was newly planned
    fn plan_with_copies(&mut self, id: ItemId, requested: bool) -> Vec<ItemId> {
        let mut added = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(id) = queue.pop_front() {
            let Some(item) = self.item(id) else {
                continue;
            };
            if self.planned.contains_key(&id) {
                continue;
            }
            self.planned.insert(id, requested);
            added.push(id);
            let copies: Vec<ItemId> = self
                .followed(item)
                .into_iter()
                .filter(|r| r.reference_type().is_copy())
                .map(|r| r.target)
                .collect();
            queue.extend(copies);
        }
        added
    }

    /// Breadth-first expansion over references accepted by `follow`
    fn expand(&mut self, follow: impl Fn(TailoringReferenceType) -> bool) {
        let mut frontier: Vec<ItemId> = self.planned.keys().copied().collect();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for id in frontier {
                let Some(item) = self.item(id) else {
                    continue;
                };
                let targets: Vec<ItemId> = self
                    .followed(item)
                    .into_iter()
                    .filter(|r| follow(r.reference_type()))
                    .flat_map(|r| {
                        std::iter::once(r.target)
                            .chain(r.kind.auxiliary_items().into_iter().map(|(_, i)| i))
                    })
                    .collect();
                for target in targets {
                    next.extend(self.plan_with_copies(target, false));
                }
            }
            frontier = next;
        }
    }

    /// Valid reference targets of planned items that were not planned themselves
    fn unplanned_targets(&self) -> Vec<ItemId> {
        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        for &id in self.planned.keys() {
            let Some(item) = self.item(id) else {
                continue;
            };
            for reference in self.followed(item) {
                let aux = reference.kind.auxiliary_items().into_iter().map(|(_, i)| i);
                for target in std::iter::once(reference.target).chain(aux) {
                    if !self.planned.contains_key(&target)
                        && self.item(target).is_some()
                        && seen.insert(target)
                    {
                        targets.push(target);
                    }
                }
            }
        }
        targets
    }
}

/// Turns the walk into descriptions
struct PlanBuilder<'w, 'g> {
    walk: &'w Walk<'g>,
    options: &'w ResolveOptions,
    incarnations: &'w HashMap<ItemId, Vec<Element>>,
    issues: Vec<IntegrityIssue>,
}

impl PlanBuilder<'_, '_> {
    fn descriptions(&mut self) -> Vec<IncarnationDescription> {
        let walk = self.walk;
        let mut descriptions = Vec::with_capacity(walk.planned.len());
        for (&id, &requested) in &walk.planned {
            let Some(item) = walk.item(id) else {
                continue;
            };
            let disposition = self.disposition(item, requested);
            let references = walk
                .followed(item)
                .into_iter()
                .filter_map(|r| self.resolve_reference(item, r))
                .collect();
            descriptions.push(IncarnationDescription {
                item: id,
                requested,
                disposition,
                references,
            });
        }
        descriptions
    }

    fn disposition(&self, item: &TemplateItem, requested: bool) -> Disposition {
        let lookup = self.options.lookup;
        if !lookup.applies_to(requested) {
            return Disposition::Create {
                element: ElementId::new(),
                guarded: false,
            };
        }
        match self.existing(item) {
            Some(element) => Disposition::Reuse { element },
            None => Disposition::Create {
                element: ElementId::new(),
                guarded: item.applied_item().is_some(),
            },
        }
    }

    fn existing(&self, item: &TemplateItem) -> Option<ElementId> {
        existing_incarnation(self.incarnations, self.options.lookup, item)
    }

    fn resolve_reference(
        &mut self,
        origin: &TemplateItem,
        reference: &TailoringReference,
    ) -> Option<ResolvedReference> {
        let target = self.resolve_target(origin, reference, reference.target)?;
        let auxiliary = reference
            .kind
            .auxiliary_items()
            .into_iter()
            .filter_map(|(role, item)| {
                self.resolve_target(origin, reference, item)
                    .map(|target| AuxiliaryTarget { role, item, target })
            })
            .collect();
        Some(ResolvedReference {
            reference: reference.id,
            target_item: reference.target,
            kind: reference.kind.clone(),
            target,
            auxiliary,
        })
    }

    fn resolve_target(
        &mut self,
        origin: &TemplateItem,
        reference: &TailoringReference,
        target: ItemId,
    ) -> Option<ReferenceTarget> {
        let Some(item) = self.walk.graph.get(target) else {
            self.issues.push(IntegrityIssue::DanglingReference {
                origin: origin.id,
                reference: reference.id,
                target,
            });
            return None;
        };
        if item.namespace != self.walk.namespace {
            self.issues.push(IntegrityIssue::CrossNamespace {
                origin: origin.id,
                reference: reference.id,
                target,
                namespace: item.namespace,
            });
            return None;
        }
        if let Some(position) = self.walk.planned.get_index_of(&target) {
            return Some(ReferenceTarget::Planned(position));
        }
        let existing = self
            .options
            .lookup
            .applies_to(false)
            .then(|| self.existing(item))
            .flatten();
        Some(existing.map_or(
            ReferenceTarget::Unresolved(target),
            ReferenceTarget::Existing,
        ))
    }
}

/// Keep one direction of each bidirectional relation between planned items
fn merge_bidirectional(descriptions: &mut [IncarnationDescription]) {
    let mut seen = HashSet::new();
    let mut dropped = 0usize;
    for (origin, description) in descriptions.iter_mut().enumerate() {
        description.references.retain(|r| {
            let keep = relation_key(origin, r).map_or(true, |key| seen.insert(key));
            if !keep {
                dropped += 1;
            }
            keep
        });
    }
    if dropped > 0 {
        tracing::debug!("merged {} bidirectional references", dropped);
    }
}

/// Direction-independent identity of a relation
fn relation_key(
    origin: usize,
    reference: &ResolvedReference,
) -> Option<(usize, usize, TailoringReferenceType, Option<String>)> {
    let ReferenceTarget::Planned(target) = reference.target else {
        return None;
    };
    let link_type = reference.kind.link_type().map(str::to_string);
    match reference.reference_type() {
        TailoringReferenceType::Part => Some((origin, target, TailoringReferenceType::Part, None)),
        TailoringReferenceType::Composite => {
            Some((target, origin, TailoringReferenceType::Part, None))
        }
        TailoringReferenceType::Member => {
            Some((origin, target, TailoringReferenceType::Scope, None))
        }
        TailoringReferenceType::Scope => {
            Some((target, origin, TailoringReferenceType::Scope, None))
        }
        TailoringReferenceType::Link => {
            Some((origin, target, TailoringReferenceType::Link, link_type))
        }
        TailoringReferenceType::LinkExternal => {
            Some((target, origin, TailoringReferenceType::Link, link_type))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use pretty_assertions::assert_eq;
    use riskcat_model::{
        DomainId, ElementType, TailoringReferenceKind, TemplateVersion, Unit, UnitId,
    };

    struct Fixture {
        domain: DomainId,
        unit: UnitId,
        repo: InMemoryRepository,
    }

    impl Fixture {
        fn new() -> Self {
            let domain = DomainId::new();
            let unit = UnitId::new();
            let repo = InMemoryRepository::new();
            repo.insert_unit(Unit::new(unit, "unit", vec![domain]));
            Self { domain, unit, repo }
        }

        fn item(&self, name: &str, element_type: ElementType) -> TemplateItem {
            TemplateItem::catalog(self.domain, name, element_type)
        }

        fn resolve(
            &self,
            graph: &TemplateGraph,
            items: Vec<ItemId>,
            options: &ResolveOptions,
        ) -> Result<IncarnationPlan, ResolveError> {
            let request = IncarnationRequest::new(self.unit, self.domain, items);
            IncarnationResolver::new(graph, &self.repo).resolve(&request, options)
        }
    }

    fn default_options() -> ResolveOptions {
        ResolveOptions::default()
    }

    #[test]
    fn copy_then_link_chain_is_planned_in_dependency_order() {
        let fx = Fixture::new();
        let c = fx.item("C", ElementType::Control);
        let b = fx
            .item("B", ElementType::Control)
            .with_reference(c.id, TailoringReferenceKind::link("relates"));
        let a = fx
            .item("A", ElementType::Control)
            .with_reference(b.id, TailoringReferenceKind::Copy);
        let ids = [a.id, b.id, c.id];
        let graph = TemplateGraph::new([c, b, a]).unwrap();

        let plan = fx.resolve(&graph, vec![ids[0]], &default_options()).unwrap();

        let items: Vec<ItemId> = plan.descriptions.iter().map(|d| d.item).collect();
        assert_eq!(items, ids.to_vec());
        assert_eq!(plan.descriptions[0].references[0].target, ReferenceTarget::Planned(1));
        assert_eq!(plan.descriptions[1].references[0].target, ReferenceTarget::Planned(2));
        assert_eq!(plan.creation_order, vec![2, 1, 0]);
        assert!(plan.is_complete());
    }

    #[test]
    fn empty_request_is_rejected() {
        let fx = Fixture::new();
        let graph = TemplateGraph::default();
        assert!(matches!(
            fx.resolve(&graph, vec![], &default_options()),
            Err(ResolveError::EmptyRequest)
        ));
    }

    #[test]
    fn unknown_or_foreign_requested_item_is_not_found() {
        let fx = Fixture::new();
        let foreign = TemplateItem::catalog(DomainId::new(), "x", ElementType::Asset);
        let foreign_id = foreign.id;
        let graph = TemplateGraph::new([foreign]).unwrap();

        assert!(matches!(
            fx.resolve(&graph, vec![ItemId::new()], &default_options()),
            Err(ResolveError::ItemNotFound(_))
        ));
        assert!(matches!(
            fx.resolve(&graph, vec![foreign_id], &default_options()),
            Err(ResolveError::ItemNotFound(id)) if id == foreign_id
        ));
    }

    #[test]
    fn cycle_resolves_each_item_once() {
        let fx = Fixture::new();
        let mut a = fx.item("A", ElementType::Asset);
        let b = fx
            .item("B", ElementType::Asset)
            .with_reference(a.id, TailoringReferenceKind::Part);
        a = a.with_reference(b.id, TailoringReferenceKind::Composite);
        let a_id = a.id;
        let graph = TemplateGraph::new([a, b]).unwrap();

        let plan = fx.resolve(&graph, vec![a_id], &default_options()).unwrap();
        assert_eq!(plan.descriptions.len(), 2);
        assert_eq!(plan.creation_order.len(), 2);
    }

    #[test]
    fn dangling_and_cross_namespace_references_become_issues() {
        let fx = Fixture::new();
        let foreign = TemplateItem::catalog(DomainId::new(), "F", ElementType::Control);
        let a = fx
            .item("A", ElementType::Asset)
            .with_reference(ItemId::new(), TailoringReferenceKind::link("x"))
            .with_reference(foreign.id, TailoringReferenceKind::link("y"));
        let a_id = a.id;
        let graph = TemplateGraph::new([a, foreign]).unwrap();

        let plan = fx.resolve(&graph, vec![a_id], &default_options()).unwrap();
        assert_eq!(plan.descriptions.len(), 1);
        assert!(plan.descriptions[0].references.is_empty());
        assert_eq!(plan.issues.len(), 2);
        assert!(matches!(plan.issues[0], IntegrityIssue::DanglingReference { .. }));
        assert!(matches!(plan.issues[1], IntegrityIssue::CrossNamespace { .. }));
        assert!(!plan.is_complete());
    }

    #[test]
    fn manual_mode_plans_integrity_targets_only() {
        let fx = Fixture::new();
        let scenario = fx.item("S", ElementType::Scenario);
        let doc = fx.item("D", ElementType::Document);
        let asset = fx
            .item("A", ElementType::Asset)
            .with_reference(scenario.id, TailoringReferenceKind::risk())
            .with_reference(doc.id, TailoringReferenceKind::link("documented_by"));
        let (a_id, s_id, d_id) = (asset.id, scenario.id, doc.id);
        let graph = TemplateGraph::new([asset, scenario, doc]).unwrap();

        let options = ResolveOptions {
            mode: RequestMode::Manual,
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &options).unwrap();

        let items: Vec<ItemId> = plan.descriptions.iter().map(|d| d.item).collect();
        assert_eq!(items, vec![a_id, s_id]);
        assert_eq!(plan.unresolved(), vec![d_id]);
    }

    #[test]
    fn manual_mode_reuses_existing_link_target() {
        let fx = Fixture::new();
        let doc = fx.item("D", ElementType::Document);
        let asset = fx
            .item("A", ElementType::Asset)
            .with_reference(doc.id, TailoringReferenceKind::link("documented_by"));
        let existing = Element::new(ElementId::new(), fx.unit, fx.domain, "D", ElementType::Document)
            .with_applied_item(doc.id, doc.template_version);
        let existing_id = existing.id;
        fx.repo.insert_element(existing);
        let a_id = asset.id;
        let graph = TemplateGraph::new([asset, doc]).unwrap();

        let options = ResolveOptions {
            mode: RequestMode::Manual,
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &options).unwrap();
        assert_eq!(plan.descriptions.len(), 1);
        assert_eq!(
            plan.descriptions[0].references[0].target,
            ReferenceTarget::Existing(existing_id)
        );
    }

    #[test]
    fn excluded_reference_types_are_not_followed() {
        let fx = Fixture::new();
        let b = fx.item("B", ElementType::Asset);
        let a = fx
            .item("A", ElementType::Asset)
            .with_reference(b.id, TailoringReferenceKind::Part);
        let a_id = a.id;
        let graph = TemplateGraph::new([a, b]).unwrap();

        let options = ResolveOptions {
            filter: riskcat_model::ReferenceFilter::new(None, [TailoringReferenceType::Part].into()),
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &options).unwrap();
        assert_eq!(plan.descriptions.len(), 1);
        assert!(plan.descriptions[0].references.is_empty());
    }

    #[test]
    fn same_version_lookup_ignores_older_incarnations() {
        let fx = Fixture::new();
        let a = fx
            .item("A", ElementType::Control)
            .with_version(TemplateVersion::new(2, 0, 0));
        fx.repo.insert_element(
            Element::new(ElementId::new(), fx.unit, fx.domain, "A", ElementType::Control)
                .with_applied_item(a.id, TemplateVersion::new(1, 0, 0)),
        );
        let a_id = a.id;
        let graph = TemplateGraph::new([a]).unwrap();

        let same_version = ResolveOptions {
            lookup: IncarnationLookup::SameVersion,
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &same_version).unwrap();
        assert!(plan.descriptions[0].disposition.is_create());

        let always = ResolveOptions {
            lookup: IncarnationLookup::Always,
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &always).unwrap();
        assert!(!plan.descriptions[0].disposition.is_create());
    }

    #[test]
    fn referenced_items_are_reused_by_default_lookup() {
        let fx = Fixture::new();
        let b = fx.item("B", ElementType::Control);
        let a = fx
            .item("A", ElementType::Asset)
            .with_reference(b.id, TailoringReferenceKind::ControlImplementation {
                responsible: None,
                description: None,
            });
        fx.repo.insert_element(
            Element::new(ElementId::new(), fx.unit, fx.domain, "B", ElementType::Control)
                .with_applied_item(b.id, b.template_version),
        );
        fx.repo.insert_element(
            Element::new(ElementId::new(), fx.unit, fx.domain, "A", ElementType::Asset)
                .with_applied_item(a.id, a.template_version),
        );
        let a_id = a.id;
        let graph = TemplateGraph::new([a, b]).unwrap();

        let plan = fx.resolve(&graph, vec![a_id], &default_options()).unwrap();
        assert!(plan.descriptions[0].disposition.is_create());
        assert!(!plan.descriptions[1].disposition.is_create());
    }

    #[test]
    fn references_of_reused_items_are_not_followed() {
        // A -> B -> C with B already incarnated
        let fx = Fixture::new();
        let c = fx.item("C", ElementType::Control);
        let b = fx
            .item("B", ElementType::Control)
            .with_reference(c.id, TailoringReferenceKind::link("relates_to"));
        let a = fx
            .item("A", ElementType::Control)
            .with_reference(b.id, TailoringReferenceKind::link("relates_to"));
        let existing = Element::new(ElementId::new(), fx.unit, fx.domain, "B", ElementType::Control)
            .with_applied_item(b.id, b.template_version);
        let existing_id = existing.id;
        fx.repo.insert_element(existing);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let graph = TemplateGraph::new([a, b, c]).unwrap();

        let plan = fx.resolve(&graph, vec![a_id], &default_options()).unwrap();
        let items: Vec<ItemId> = plan.descriptions.iter().map(|d| d.item).collect();
        assert_eq!(items, vec![a_id, b_id]);
        assert_eq!(
            plan.descriptions[1].disposition,
            Disposition::Reuse { element: existing_id }
        );
        assert!(plan.descriptions[1].references.is_empty());
        assert!(plan.description_for(c_id).is_none());
        assert!(plan.is_complete());

        let always = ResolveOptions {
            lookup: IncarnationLookup::Always,
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &always).unwrap();
        assert_eq!(plan.descriptions.len(), 3);
        assert!(plan.description_for(c_id).is_some());
    }

    #[test]
    fn copies_of_reused_items_are_not_planned() {
        let fx = Fixture::new();
        let c = fx.item("C", ElementType::Control);
        let b = fx
            .item("B", ElementType::Control)
            .with_reference(c.id, TailoringReferenceKind::Copy);
        let a = fx
            .item("A", ElementType::Control)
            .with_reference(b.id, TailoringReferenceKind::link("relates_to"));
        fx.repo.insert_element(
            Element::new(ElementId::new(), fx.unit, fx.domain, "B", ElementType::Control)
                .with_applied_item(b.id, b.template_version),
        );
        let a_id = a.id;
        let graph = TemplateGraph::new([a, b, c]).unwrap();

        let plan = fx.resolve(&graph, vec![a_id], &default_options()).unwrap();
        assert_eq!(plan.descriptions.len(), 2);
        assert_eq!(plan.create_count(), 1);
    }

    #[test]
    fn bidirectional_references_are_merged() {
        let fx = Fixture::new();
        let mut a = fx.item("A", ElementType::Asset);
        let b = fx
            .item("B", ElementType::Asset)
            .with_reference(a.id, TailoringReferenceKind::Composite);
        a = a.with_reference(b.id, TailoringReferenceKind::Part);
        let a_id = a.id;
        let graph = TemplateGraph::new([a, b]).unwrap();

        let merged = default_options().with_merge_bidirectional_references(true);
        let plan = fx.resolve(&graph, vec![a_id], &merged).unwrap();
        let total: usize = plan.descriptions.iter().map(|d| d.references.len()).sum();
        assert_eq!(total, 1);

        let plan = fx.resolve(&graph, vec![a_id], &default_options()).unwrap();
        let total: usize = plan.descriptions.iter().map(|d| d.references.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn risk_owner_is_pulled_into_the_plan() {
        let fx = Fixture::new();
        let person = fx.item("P", ElementType::Person);
        let scenario = fx.item("S", ElementType::Scenario);
        let asset = fx.item("A", ElementType::Asset).with_reference(
            scenario.id,
            TailoringReferenceKind::Risk {
                owner: Some(person.id),
                mitigation: None,
                values: Vec::new(),
            },
        );
        let a_id = asset.id;
        let graph = TemplateGraph::new([asset, scenario, person]).unwrap();

        let options = ResolveOptions {
            mode: RequestMode::Manual,
            ..ResolveOptions::default()
        };
        let plan = fx.resolve(&graph, vec![a_id], &options).unwrap();
        assert_eq!(plan.descriptions.len(), 3);
        let risk = &plan.descriptions[0].references[0];
        assert_eq!(risk.auxiliary.len(), 1);
        assert_eq!(risk.auxiliary[0].target, ReferenceTarget::Planned(2));
    }
}
