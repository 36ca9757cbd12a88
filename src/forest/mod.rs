// This module provides RegionForest, the single-rooted tree of dynamic region instances
// reconstructed from a trace. Nodes live in one arena vector and refer to each other by
// NodeId, so parent back-references need no shared ownership and the forest is
// immutable, Send and Sync once built: several planners can read it concurrently. The
// builder submodule performs construction and validation, recursion holds the recursion
// classification and weighting passes, and node defines RegionNode with its derived
// metrics. The query surface here covers lookup by handle, uid and static region,
// leaves, coverage and ideal time reduction, ancestor walks, call-site context for
// reports, and per-kind region counts.

//! Region tree reconstruction and queries.

pub mod builder;
pub mod node;
pub mod recursion;

pub use node::{
    checked_plain_self_parallelism, checked_self_parallelism, plain_self_parallelism,
    recursive_self_parallelism, NodeId, NodeStats, ParallelismType, RegionNode,
};
pub use recursion::{compute_recursion_weights, RecursionWeights};

use crate::core::error::PlanResult;
use crate::regions::{RegionKind, StaticRegion, StaticRegionTable};
use crate::trace::DecodedRecord;
use hashbrown::HashMap;
use std::fmt;

/// Single-rooted tree of region instances.
#[derive(Debug, Clone)]
pub struct RegionForest {
    pub(crate) nodes: Vec<RegionNode>,
    pub(crate) root: NodeId,
    pub(crate) by_uid: HashMap<u64, NodeId>,
    pub(crate) by_region: HashMap<u64, Vec<NodeId>>,
}

impl RegionForest {
    /// Link decoded records into a tree.
    pub fn build(table: &StaticRegionTable, records: Vec<DecodedRecord>) -> PlanResult<Self> {
        builder::build(table, records)
    }

    pub fn root(&self) -> &RegionNode {
        &self.nodes[self.root.index()]
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Node behind a handle issued by this forest.
    pub fn node(&self, id: NodeId) -> &RegionNode {
        &self.nodes[id.index()]
    }

    pub fn node_by_uid(&self, uid: u64) -> Option<&RegionNode> {
        self.by_uid.get(&uid).map(|&id| self.node(id))
    }

    /// Every node, in trace order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &RegionNode> {
        self.nodes.iter()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &RegionNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Instances of one static region.
    pub fn nodes_for(&self, static_region_id: u64) -> impl Iterator<Item = &RegionNode> {
        self.by_region
            .get(&static_region_id)
            .into_iter()
            .flatten()
            .map(|&id| self.node(id))
    }

    pub fn children<'a>(
        &'a self,
        node: &'a RegionNode,
    ) -> impl Iterator<Item = &'a RegionNode> + 'a {
        node.children.iter().map(|&id| self.node(id))
    }

    pub fn parent(&self, node: &RegionNode) -> Option<&RegionNode> {
        node.parent.map(|id| self.node(id))
    }

    /// Strict ancestors of `node`, nearest first.
    pub fn ancestors<'a>(&'a self, node: &RegionNode) -> impl Iterator<Item = &'a RegionNode> + 'a {
        std::iter::successors(self.parent(node), move |n| self.parent(n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Work of `node` not attributed to any child.
    pub fn exclusive_work(&self, node: &RegionNode) -> u64 {
        let children: u64 = self.children(node).map(RegionNode::total_work).sum();
        node.total_work().saturating_sub(children)
    }

    /// Share of the program's total work spent in `node`, in percent.
    pub fn coverage(&self, node: &RegionNode) -> f64 {
        let root_work = self.root().total_work();
        if root_work == 0 {
            return 0.0;
        }
        100.0 * node.total_work() as f64 / root_work as f64
    }

    /// Time reduction if `node` alone ran with its full self-parallelism, in percent.
    pub fn time_reduction(&self, node: &RegionNode) -> f64 {
        self.coverage(node) * (1.0 - 1.0 / node.self_parallelism())
    }

    /// Nodes whose ideal time reduction exceeds `threshold` percent.
    pub fn nodes_above(&self, threshold: f64) -> impl Iterator<Item = &RegionNode> {
        self.nodes
            .iter()
            .filter(move |n| self.time_reduction(n) > threshold)
    }

    /// The node itself followed by each enclosing function instance that has a
    /// call site, up to but excluding the root.
    pub fn call_context<'a>(&'a self, node: &'a RegionNode) -> Vec<ContextFrame<'a>> {
        let mut frames = vec![ContextFrame::new(node)];
        frames.extend(
            self.ancestors(node)
                .take_while(|n| n.id != self.root)
                .filter(|n| n.region.is_function() && n.call_site.is_some())
                .map(ContextFrame::new),
        );
        frames
    }

    /// Node counts per static region kind.
    pub fn region_counts(&self) -> RegionCounts {
        let mut counts = RegionCounts::default();
        for node in &self.nodes {
            counts.total += 1;
            match node.region.kind {
                RegionKind::Loop => counts.loops += 1,
                RegionKind::Func => counts.functions += 1,
                RegionKind::Body | RegionKind::CallSite => counts.bodies += 1,
            }
        }
        counts
    }
}

/// One line of a region's calling context.
#[derive(Debug, Clone, Copy)]
pub struct ContextFrame<'a> {
    pub region: &'a StaticRegion,
    pub call_site: Option<&'a StaticRegion>,
}

impl<'a> ContextFrame<'a> {
    fn new(node: &'a RegionNode) -> Self {
        Self {
            region: &node.region,
            call_site: node.call_site.as_ref(),
        }
    }
}

impl fmt::Display for ContextFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.region.kind, self.call_site) {
            (RegionKind::Func, Some(site)) => write!(
                f,
                "{} called at file {}, line {}",
                self.region, site.module, site.start_line
            ),
            (RegionKind::Func, None) => {
                write!(f, "{} called at file root, line 0", self.region)
            }
            _ => write!(f, "{}", self.region),
        }
    }
}

/// Region instance counts by kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionCounts {
    pub total: usize,
    pub loops: usize,
    pub functions: usize,
    pub bodies: usize,
}

impl fmt::Display for RegionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region Count (Total / Loop / Func / Body) = {} / {} / {} / {}",
            self.total, self.loops, self.functions, self.bodies
        )
    }
}
