//! Exclusion sets handed to the planner.
//!
//! Each filter returns the nodes the planner must never mark parallel. Filters
//! combine by set union, e.g. `non_doall_set(f).extend(below_self_parallelism(f, 2.0))`.

use crate::forest::{NodeId, RegionForest};
use crate::regions::RegionKind;
use hashbrown::HashSet;

/// Nodes whose static region is not a loop.
pub fn non_loop_set(forest: &RegionForest) -> HashSet<NodeId> {
    forest
        .all_nodes()
        .filter(|n| n.region().kind != RegionKind::Loop)
        .map(|n| n.id())
        .collect()
}

/// Nodes that are not independently parallel loops.
pub fn non_doall_set(forest: &RegionForest) -> HashSet<NodeId> {
    forest
        .all_nodes()
        .filter(|n| n.region().kind != RegionKind::Loop || !n.parallel_bit())
        .map(|n| n.id())
        .collect()
}

/// Nodes with self-parallelism below `min`.
pub fn below_self_parallelism(forest: &RegionForest, min: f64) -> HashSet<NodeId> {
    forest
        .all_nodes()
        .filter(|n| n.self_parallelism() < min)
        .map(|n| n.id())
        .collect()
}
