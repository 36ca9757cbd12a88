// This module holds the two recursion passes of tree construction. Classification runs
// on the flat records: every ordinary node reachable through child references from a
// recursion init node belongs to an unwound recursive chain and becomes RecursionNormal.
// Weighting runs on the linked tree: for each init node, the work of its sinks at each
// depth is accumulated on every ancestor between the sink and the init node, and each
// ancestor's weight is its share of the init node's accumulated work. The weights are
// returned as a map keyed by (node, depth) and applied by the builder in one step.

//! Recursion classification and cross-depth weight propagation.

use super::node::{NodeId, RegionNode};
use crate::core::error::{PlanError, PlanResult};
use crate::trace::{DecodedRecord, NodeKind};
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;

/// Recursion weights keyed by node and depth.
pub type RecursionWeights = HashMap<(NodeId, usize), f64>;

/// Reclassify ordinary descendants of every recursion init node.
///
/// `index` maps uids to positions in `records`. Returns the number of nodes
/// reclassified.
pub fn classify_recursion(
    records: &mut [DecodedRecord],
    index: &HashMap<u64, usize>,
) -> PlanResult<usize> {
    let inits: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.kind == NodeKind::RecursionInit)
        .map(|(pos, _)| pos)
        .collect();

    let mut reclassified = 0;
    let mut visited = HashSet::new();
    for init in inits {
        visited.clear();
        let mut queue = VecDeque::from([init]);
        visited.insert(init);

        while let Some(current) = queue.pop_front() {
            if records[current].kind == NodeKind::Normal {
                records[current].kind = NodeKind::RecursionNormal;
                reclassified += 1;
            }

            let parent_uid = records[current].uid;
            for &child in &records[current].child_uids {
                let pos = *index.get(&child).ok_or(PlanError::DanglingChildReference {
                    parent: parent_uid,
                    child,
                })?;
                if visited.insert(pos) {
                    queue.push_back(pos);
                }
            }
        }
    }

    log::debug!("Reclassified {} nodes as recursive", reclassified);
    Ok(reclassified)
}

/// Compute the recursion weight of every node on a sink-to-init path.
///
/// `nodes` must be linked (parents set) and sinks must have their recursion
/// target resolved.
pub fn compute_recursion_weights(nodes: &[RegionNode]) -> PlanResult<RecursionWeights> {
    let mut sinks_by_init: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in nodes {
        if node.kind == NodeKind::RecursionInit {
            sinks_by_init.entry(node.id).or_default();
        }
    }
    for node in nodes.iter().filter(|n| n.kind == NodeKind::RecursionSink) {
        let target = node.recursion_target.ok_or(PlanError::InvalidRecursionTarget {
            sink: node.uid,
            target: 0,
        })?;
        sinks_by_init.entry(target).or_default().push(node.id);
    }

    let mut inits: Vec<NodeId> = sinks_by_init.keys().copied().collect();
    inits.sort();

    let mut weights = RecursionWeights::new();
    for init in inits {
        let sinks = &sinks_by_init[&init];
        propagate_init(nodes, init, sinks, &mut weights)?;
    }
    Ok(weights)
}

fn propagate_init(
    nodes: &[RegionNode],
    init: NodeId,
    sinks: &[NodeId],
    weights: &mut RecursionWeights,
) -> PlanResult<()> {
    let init_node = &nodes[init.index()];
    let stop = init_node.parent;
    let max_depth = sinks
        .iter()
        .map(|s| nodes[s.index()].recursion_depth())
        .max()
        .unwrap_or(0);

    log::debug!(
        "Recursion init {}: {} sinks, {} depths",
        init_node.uid,
        sinks.len(),
        max_depth
    );

    for depth in 0..max_depth {
        let mut work: HashMap<NodeId, u64> = HashMap::new();

        for &sink in sinks {
            let sink_node = &nodes[sink.index()];
            let stats = sink_node.stats.as_slice();
            if stats.len() <= depth {
                continue;
            }
            let sink_work = stats[depth].total_work;

            let mut current = sink_node.parent;
            let mut reached_init = false;
            while current != stop {
                let Some(ancestor) = current else {
                    break;
                };
                *work.entry(ancestor).or_insert(0) += sink_work;
                reached_init |= ancestor == init;
                current = nodes[ancestor.index()].parent;
            }

            if !reached_init {
                return Err(PlanError::SinkOutsideRecursion {
                    sink: sink_node.uid,
                    init: init_node.uid,
                });
            }
        }

        let init_work = work.get(&init).copied().unwrap_or(0);
        for (&node, &node_work) in &work {
            let weight = if init_work == 0 {
                0.0
            } else {
                node_work as f64 / init_work as f64
            };
            log::trace!(
                "Weight of node {} at depth {} is {:.4}",
                nodes[node.index()].uid,
                depth,
                weight
            );
            weights.insert((node, depth), weight);
        }
    }
    Ok(())
}

/// Store computed weights into the matching per-depth statistics.
pub fn apply_recursion_weights(nodes: &mut [RegionNode], weights: &RecursionWeights) {
    for (&(node, depth), &weight) in weights {
        if let Some(stat) = nodes[node.index()].stats.depth_mut(depth) {
            stat.recursion_weight = weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::test::{forest, record};

    fn weight(weights: &RecursionWeights, node: NodeId, depth: usize) -> f64 {
        weights.get(&(node, depth)).copied().unwrap_or(0.0)
    }

    #[test]
    fn test_weights_split_across_branches() {
        let forest = forest(vec![
            record(1, 0, 2000, 2000).with_children([2]),
            record(2, 1, 1000, 500)
                .with_kind(NodeKind::RecursionInit)
                .with_children([3, 4]),
            record(3, 3, 400, 400).with_children([5]),
            record(4, 3, 200, 200).with_children([6]),
            record(5, 1, 300, 300).with_recursion_target(2),
            record(6, 1, 100, 100).with_recursion_target(2),
        ]);
        let id = |uid| forest.node_by_uid(uid).unwrap().id();

        let weights = compute_recursion_weights(&forest.nodes).unwrap();
        assert_eq!(weight(&weights, id(2), 0), 1.0);
        assert_eq!(weight(&weights, id(3), 0), 0.75);
        assert_eq!(weight(&weights, id(4), 0), 0.25);
        assert!(!weights.contains_key(&(id(1), 0)));
        assert!(!weights.contains_key(&(id(5), 0)));

        let branch_sum = weight(&weights, id(3), 0) + weight(&weights, id(4), 0);
        assert!((branch_sum - 1.0).abs() < 1e-12);

        // Work reaching the init at depth 0 is the sum of its sinks' work.
        let init_work: f64 = [5, 6]
            .iter()
            .map(|&uid| forest.node_by_uid(uid).unwrap().total_work() as f64)
            .sum();
        let attributed: f64 = [id(3), id(4)]
            .iter()
            .map(|&node| weight(&weights, node, 0) * init_work)
            .sum();
        assert!((attributed - init_work).abs() < 1e-9);

        let stat_weight = |uid| {
            forest
                .node_by_uid(uid)
                .unwrap()
                .stats()
                .outermost()
                .recursion_weight
        };
        assert_eq!(stat_weight(3), 0.75);
        assert_eq!(stat_weight(4), 0.25);
    }

    #[test]
    fn test_sinks_below_init_share_its_weight() {
        let forest = forest(vec![
            record(1, 1, 900, 300)
                .with_kind(NodeKind::RecursionInit)
                .with_children([2, 3]),
            record(2, 1, 250, 250).with_recursion_target(1),
            record(3, 1, 150, 150).with_recursion_target(1),
        ]);

        let weights = compute_recursion_weights(&forest.nodes).unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weight(&weights, forest.root_id(), 0), 1.0);
        assert_eq!(forest.root().self_parallelism(), 3.0);
    }

    #[test]
    fn test_deeper_depths_get_their_own_weights() {
        let deep = |total, spw| crate::trace::RegionStat::new(1, total, spw);
        let forest = forest(vec![
            record(1, 1, 1000, 500)
                .with_kind(NodeKind::RecursionInit)
                .with_stat(deep(400, 400))
                .with_children([2]),
            record(2, 1, 400, 400)
                .with_recursion_target(1)
                .with_stat(deep(100, 100)),
        ]);

        let weights = compute_recursion_weights(&forest.nodes).unwrap();
        assert_eq!(weight(&weights, forest.root_id(), 0), 1.0);
        assert_eq!(weight(&weights, forest.root_id(), 1), 1.0);
        assert!((forest.root().self_parallelism() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_classification_counts_normal_descendants() {
        let mut records = vec![
            record(1, 1, 100, 100)
                .with_kind(NodeKind::RecursionInit)
                .with_children([2]),
            record(2, 3, 80, 80).with_children([3]),
            record(3, 1, 40, 40).with_recursion_target(1),
        ];
        let index: HashMap<u64, usize> = records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.uid, pos))
            .collect();

        assert_eq!(classify_recursion(&mut records, &index).unwrap(), 1);
        assert_eq!(records[1].kind, NodeKind::RecursionNormal);
        assert_eq!(records[2].kind, NodeKind::RecursionSink);
    }
}
