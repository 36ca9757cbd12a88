// This module defines RegionNode, one dynamic region instance in the region tree, and
// the self-parallelism computations attached to it. A node either carries a single
// statistic block (plain) or one block per unwound recursion depth (recursive). Plain
// self-parallelism is read from its block; recursive self-parallelism combines the
// depths deepest-first, discounting at each depth the savings already achieved by the
// deeper levels in proportion to the recursion weight of that depth. Values below one
// are rejected rather than clamped. Nodes are stored in the forest arena and refer to
// their parent and children by NodeId, never by pointer.

//! Region tree nodes and self-parallelism.

use crate::core::error::{PlanError, PlanResult};
use crate::regions::{RegionKind, StaticRegion};
use crate::trace::{NodeKind, RegionStat};
use std::fmt;

/// Values this close below 1.0 are floating-point noise, not a broken trace.
const SELF_PARALLELISM_TOLERANCE: f64 = 1e-9;

/// Stable handle of a node inside its [`RegionForest`](super::RegionForest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// How a region can be parallelized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParallelismType {
    /// Leaf region: only instruction-level parallelism.
    Ilp,
    /// Loop whose iterations are independent.
    Doall,
    /// Loop with cross-iteration dependences.
    Doacross,
    /// Any other region: task-level parallelism.
    Tlp,
}

impl fmt::Display for ParallelismType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParallelismType::Ilp => "ILP",
            ParallelismType::Doall => "DOALL",
            ParallelismType::Doacross => "DOACROSS",
            ParallelismType::Tlp => "TLP",
        };
        f.write_str(name)
    }
}

/// Statistics of a node: one block, or one per recursion depth.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeStats {
    Plain(RegionStat),
    /// Never empty; index 0 is the outermost depth.
    Recursive(Vec<RegionStat>),
}

impl NodeStats {
    pub fn outermost(&self) -> &RegionStat {
        match self {
            NodeStats::Plain(stat) => stat,
            NodeStats::Recursive(stats) => &stats[0],
        }
    }

    pub fn as_slice(&self) -> &[RegionStat] {
        match self {
            NodeStats::Plain(stat) => std::slice::from_ref(stat),
            NodeStats::Recursive(stats) => stats,
        }
    }

    pub(crate) fn depth_mut(&mut self, depth: usize) -> Option<&mut RegionStat> {
        match self {
            NodeStats::Plain(_) => None,
            NodeStats::Recursive(stats) => stats.get_mut(depth),
        }
    }
}

/// One dynamic region instance in the region tree.
#[derive(Debug, Clone)]
pub struct RegionNode {
    pub(crate) id: NodeId,
    pub(crate) uid: u64,
    pub(crate) region: StaticRegion,
    pub(crate) call_site: Option<StaticRegion>,
    pub(crate) kind: NodeKind,
    pub(crate) instance_count: u64,
    pub(crate) parallel_bit: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) stats: NodeStats,
    pub(crate) recursion_target: Option<NodeId>,
    pub(crate) self_parallelism: f64,
}

impl RegionNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Dynamic node id from the trace.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn region(&self) -> &StaticRegion {
        &self.region
    }

    pub fn call_site(&self) -> Option<&StaticRegion> {
        self.call_site.as_ref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn instance_count(&self) -> u64 {
        self.instance_count
    }

    pub fn parallel_bit(&self) -> bool {
        self.parallel_bit
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_recursive(&self) -> bool {
        matches!(self.stats, NodeStats::Recursive(_))
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Number of recursion depths with statistics (1 for plain nodes).
    pub fn recursion_depth(&self) -> usize {
        self.stats.as_slice().len()
    }

    /// Init node targeted by a recursion sink.
    pub fn recursion_target(&self) -> Option<NodeId> {
        self.recursion_target
    }

    /// Work of all instances at the outermost depth.
    pub fn total_work(&self) -> u64 {
        self.stats.outermost().total_work
    }

    pub fn avg_work(&self) -> u64 {
        self.stats.outermost().avg_work()
    }

    pub fn self_parallelism(&self) -> f64 {
        self.self_parallelism
    }

    pub fn total_parallelism(&self) -> f64 {
        self.stats.outermost().total_parallelism()
    }

    /// Smallest self-parallelism observed at any depth.
    pub fn min_self_parallelism(&self) -> f64 {
        match &self.stats {
            NodeStats::Plain(stat) => stat.min_self_parallelism(),
            NodeStats::Recursive(stats) => stats
                .iter()
                .map(RegionStat::self_parallelism)
                .fold(f64::MAX, f64::min),
        }
    }

    /// Largest self-parallelism observed at any depth, never below 1.0.
    pub fn max_self_parallelism(&self) -> f64 {
        match &self.stats {
            NodeStats::Plain(stat) => stat.max_self_parallelism(),
            NodeStats::Recursive(stats) => stats
                .iter()
                .map(RegionStat::self_parallelism)
                .fold(1.0, f64::max),
        }
    }

    pub fn avg_iterations(&self) -> f64 {
        self.stats.outermost().avg_iterations()
    }

    pub fn min_iterations(&self) -> u64 {
        self.stats.outermost().min_iterations
    }

    pub fn max_iterations(&self) -> u64 {
        self.stats.outermost().max_iterations
    }

    pub fn parallelism_type(&self) -> ParallelismType {
        if self.is_leaf() {
            return ParallelismType::Ilp;
        }
        match (self.region.kind, self.parallel_bit) {
            (RegionKind::Loop, true) => ParallelismType::Doall,
            (RegionKind::Loop, false) => ParallelismType::Doacross,
            _ => ParallelismType::Tlp,
        }
    }

    /// Compute and cache self-parallelism once recursion weights are final.
    pub(crate) fn finalize_self_parallelism(&mut self) -> PlanResult<()> {
        self.self_parallelism = match &self.stats {
            NodeStats::Plain(stat) => checked_plain_self_parallelism(self.uid, stat)?,
            NodeStats::Recursive(stats) => {
                checked_self_parallelism(self.uid, recursive_self_parallelism(stats))?
            }
        };
        Ok(())
    }
}

impl fmt::Display for RegionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} work = {}, sp = {:.2}, children = {}",
            self.uid,
            self.region,
            self.avg_work(),
            self.self_parallelism,
            self.children.len()
        )?;
        if let (Some(call_site), RegionKind::Func) = (&self.call_site, self.region.kind) {
            write!(f, "\tcalled at {}:{}", call_site.module, call_site.start_line)?;
        }
        Ok(())
    }
}

/// Self-parallelism of a node with a single statistic block.
pub fn plain_self_parallelism(stat: &RegionStat) -> f64 {
    stat.self_parallelism()
}

/// Plain self-parallelism, rejecting `self_parallel_work > total_work` exactly.
pub fn checked_plain_self_parallelism(uid: u64, stat: &RegionStat) -> PlanResult<f64> {
    let value = plain_self_parallelism(stat);
    if stat.total_work < stat.self_parallel_work || !value.is_finite() {
        return Err(PlanError::InvalidSelfParallelism { uid, value });
    }
    Ok(value.max(1.0))
}

/// Self-parallelism of a recursive node from its per-depth statistics.
///
/// Work measured at depth `i` still contains the unparallelized work of the
/// deeper levels, so the savings of depth `i + 1` (scaled by the recursion
/// weight of depth `i`) are removed before applying depth `i`'s own
/// self-parallelism.
pub fn recursive_self_parallelism(stats: &[RegionStat]) -> f64 {
    let Some(outermost) = stats.first() else {
        return 1.0;
    };

    let mut savings = 0.0;
    for stat in stats.iter().rev() {
        let total = stat.total_work as f64;
        let adjusted = total - savings * stat.recursion_weight;
        savings = total - adjusted / stat.self_parallelism();
    }

    let total = outermost.total_work as f64;
    if total == 0.0 {
        return 1.0;
    }
    total / (total - savings)
}

/// Reject self-parallelism below one or not finite.
///
/// Used for the recursive recurrence, whose floating-point result may land a
/// rounding error below one.
pub fn checked_self_parallelism(uid: u64, value: f64) -> PlanResult<f64> {
    if !value.is_finite() || value < 1.0 - SELF_PARALLELISM_TOLERANCE {
        return Err(PlanError::InvalidSelfParallelism { uid, value });
    }
    Ok(value.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(total_work: u64, self_parallel_work: u64) -> RegionStat {
        RegionStat::new(1, total_work, self_parallel_work)
    }

    #[test]
    fn test_plain_self_parallelism() {
        assert_eq!(plain_self_parallelism(&stat(1000, 250)), 4.0);
        assert_eq!(plain_self_parallelism(&stat(0, 0)), 1.0);
    }

    #[test]
    fn test_recursive_two_depths() {
        let mut outer = stat(1000, 500);
        outer.recursion_weight = 1.0;
        let inner = stat(400, 400);

        let sp = recursive_self_parallelism(&[outer, inner]);
        assert!((sp - 2.0).abs() < 1e-12, "sp = {sp}");
    }

    #[test]
    fn test_recursive_savings_compound() {
        // depth 1 saves 200 of 400; depth 0 sees 1000 - 200 = 800 left, halves it.
        let mut outer = stat(1000, 500);
        outer.recursion_weight = 1.0;
        let inner = stat(400, 200);

        let sp = recursive_self_parallelism(&[outer, inner]);
        // savings[0] = 1000 - 800 / 2 = 600
        assert!((sp - 2.5).abs() < 1e-12, "sp = {sp}");
    }

    #[test]
    fn test_recursive_single_depth_matches_plain() {
        let s = stat(900, 300);
        assert_eq!(recursive_self_parallelism(&[s.clone()]), plain_self_parallelism(&s));
    }

    #[test]
    fn test_below_one_is_rejected() {
        let value = plain_self_parallelism(&stat(100, 200));
        assert!(matches!(
            checked_self_parallelism(42, value),
            Err(PlanError::InvalidSelfParallelism { uid: 42, .. })
        ));
        assert!(checked_self_parallelism(1, f64::INFINITY).is_err());
        assert_eq!(checked_self_parallelism(1, 1.0 - 1e-12).unwrap(), 1.0);
    }

    #[test]
    fn test_plain_check_is_exact_for_large_counters() {
        let off_by_one = stat(2_000_000_000, 2_000_000_001);
        assert!(matches!(
            checked_plain_self_parallelism(7, &off_by_one),
            Err(PlanError::InvalidSelfParallelism { uid: 7, .. })
        ));
        assert_eq!(
            checked_plain_self_parallelism(7, &stat(2_000_000_001, 2_000_000_001)).unwrap(),
            1.0
        );
        assert!(checked_plain_self_parallelism(7, &stat(10, 0)).is_err());
        assert_eq!(checked_plain_self_parallelism(7, &stat(0, 0)).unwrap(), 1.0);
    }

    #[test]
    fn test_recursive_below_one_is_rejected() {
        let mut outer = stat(100, 400);
        outer.recursion_weight = 1.0;
        let value = recursive_self_parallelism(&[outer, stat(50, 50)]);
        assert!(value < 1.0, "sp = {value}");
        assert!(checked_self_parallelism(3, value).is_err());
    }
}
