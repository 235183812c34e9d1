//! Creation order of a plan
//!
//! Stable topological order over the planned references: every reference
//! target is created before its origin. Ties go to the lower plan position.
//! Reference cycles cannot be ordered; they are broken at the lowest
//! remaining position of a cycle that no other remaining item feeds into, so
//! the order stays total and deterministic and edges between cycles still hold.

use crate::plan::{IncarnationDescription, ReferenceTarget};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Order in which the descriptions' elements are created
///
/// Returns every position of `descriptions` exactly once. Targets that are
/// out of range are ignored here; the applier rejects them.
#[must_use]
pub fn creation_order(descriptions: &[IncarnationDescription]) -> Vec<usize> {
    let graph = dependency_graph(descriptions);
    let count = descriptions.len();
    let component = components(&graph, count);

    let mut in_degree: Vec<usize> = (0..count)
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
        .filter(|&n| in_degree[n] == 0)
        .map(Reverse)
        .collect();
    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let next = match ready.pop() {
            Some(Reverse(n)) if placed[n] => continue,
            Some(Reverse(n)) => n,
            None => {
                // Only cycles remain
                let Some(n) = (0..count).find(|&n| {
                    !placed[n] && is_source_component(&graph, &component, &placed, component[n])
                }) else {
                    break;
                };
                tracing::debug!("breaking reference cycle at plan position {}", n);
                n
            }
        };
        placed[next] = true;
        order.push(next);
        for dependent in graph.neighbors_directed(next, Direction::Outgoing) {
            in_degree[dependent] = in_degree[dependent].saturating_sub(1);
            if in_degree[dependent] == 0 && !placed[dependent] {
                ready.push(Reverse(dependent));
            }
        }
    }
    order
}

/// Edges run from a target to the descriptions that reference it
fn dependency_graph(descriptions: &[IncarnationDescription]) -> DiGraphMap<usize, ()> {
    let mut graph = DiGraphMap::with_capacity(descriptions.len(), descriptions.len());
    for n in 0..descriptions.len() {
        graph.add_node(n);
    }
    for (origin, description) in descriptions.iter().enumerate() {
        for reference in &description.references {
            for target in reference.targets() {
                if let ReferenceTarget::Planned(target) = target {
                    if target != origin && target < descriptions.len() {
                        graph.add_edge(target, origin, ());
                    }
                }
            }
        }
    }
    graph
}

/// Strongly connected component of every position
fn components(graph: &DiGraphMap<usize, ()>, count: usize) -> Vec<usize> {
    let mut component = vec![0; count];
    for (index, scc) in tarjan_scc(graph).into_iter().enumerate() {
        for node in scc {
            component[node] = index;
        }
    }
    component
}

/// No unplaced item outside the component feeds into it
fn is_source_component(
    graph: &DiGraphMap<usize, ()>,
    component: &[usize],
    placed: &[bool],
    target: usize,
) -> bool {
    (0..component.len())
        .filter(|&n| component[n] == target && !placed[n])
        .all(|n| {
            graph
                .neighbors_directed(n, Direction::Incoming)
                .all(|p| placed[p] || component[p] == target)
        })
}

/// Whether `order` is a permutation of the plan that creates every target
/// before its origin
///
/// Edges inside a reference cycle cannot all hold and are skipped; edges
/// between different cycles or acyclic items are checked.
#[must_use]
pub fn respects_dependencies(descriptions: &[IncarnationDescription], order: &[usize]) -> bool {
    let count = descriptions.len();
    if order.len() != count {
        return false;
    }
    let mut position = vec![usize::MAX; count];
    for (pos, &n) in order.iter().enumerate() {
        match position.get_mut(n) {
            Some(slot) if *slot == usize::MAX => *slot = pos,
            _ => return false,
        }
    }
    let graph = dependency_graph(descriptions);
    let component = components(&graph, count);
    graph
        .all_edges()
        .filter(|&(target, origin, _)| component[target] != component[origin])
        .all(|(target, origin, _)| position[target] < position[origin])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Disposition, ResolvedReference};
    use riskcat_model::{ElementId, ItemId, TailoringReferenceId, TailoringReferenceKind};

    fn description(targets: &[usize]) -> IncarnationDescription {
        IncarnationDescription {
            item: ItemId::new(),
            requested: true,
            disposition: Disposition::Create {
                element: ElementId::new(),
                guarded: false,
            },
            references: targets
                .iter()
                .map(|&t| ResolvedReference {
                    reference: TailoringReferenceId::new(),
                    target_item: ItemId::new(),
                    kind: TailoringReferenceKind::Copy,
                    target: ReferenceTarget::Planned(t),
                    auxiliary: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn chain_is_created_targets_first() {
        // A -> B -> C
        let plan = vec![description(&[1]), description(&[2]), description(&[])];
        let order = creation_order(&plan);
        assert_eq!(order, vec![2, 1, 0]);
        assert!(respects_dependencies(&plan, &order));
    }

    #[test]
    fn independent_items_keep_plan_order() {
        let plan = vec![description(&[]), description(&[]), description(&[])];
        assert_eq!(creation_order(&plan), vec![0, 1, 2]);
    }

    #[test]
    fn cycle_is_broken_at_lowest_position() {
        // 0 -> 1 -> 0, 2 independent
        let plan = vec![description(&[1]), description(&[0]), description(&[])];
        let order = creation_order(&plan);
        assert_eq!(order, vec![2, 0, 1]);
        assert!(respects_dependencies(&plan, &order));
    }

    #[test]
    fn cycle_feeding_an_item_is_created_first() {
        // 0 -> 1 <-> 2: the cycle must precede 0 although 0 has the lowest position
        let plan = vec![description(&[1]), description(&[2]), description(&[1])];
        let order = creation_order(&plan);
        assert_eq!(order, vec![1, 0, 2]);
        assert!(respects_dependencies(&plan, &order));
        assert!(!respects_dependencies(&plan, &[0, 1, 2]));
    }

    #[test]
    fn order_must_be_a_permutation() {
        let plan = vec![description(&[]), description(&[])];
        assert!(!respects_dependencies(&plan, &[0]));
        assert!(!respects_dependencies(&plan, &[0, 0]));
        assert!(!respects_dependencies(&plan, &[0, 5]));
    }

    #[test]
    fn out_of_range_targets_are_ignored() {
        let plan = vec![description(&[7])];
        assert_eq!(creation_order(&plan), vec![0]);
    }

    #[test]
    fn empty_plan() {
        assert!(creation_order(&[]).is_empty());
    }
}
