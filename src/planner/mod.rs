// This module provides the bottom-up dynamic-programming planner. Starting from the
// leaves, each node is evaluated once all of its children have been retired: its own
// point is the share of program time saved by running it in parallel under the cost
// model, and it competes against the summed points of its children. The larger side
// wins, so a region and any of its descendants are never chosen together; this is the
// maximum weight independent set on a tree with ancestor/descendant conflicts. The
// scratch point and chosen-set tables live only for one plan() call, which lets several
// planners read the same forest at once. The filter submodule builds exclusion sets and
// plan holds the result types.

//! Parallelization planning over a region forest.

pub mod filter;
pub mod plan;

pub use filter::{below_self_parallelism, non_doall_set, non_loop_set};
pub use plan::{Plan, PlanEntry};

use crate::core::error::{PlanError, PlanResult};
use crate::cost::CostModel;
use crate::forest::{NodeId, RegionForest, RegionNode};
use hashbrown::HashSet;
use std::collections::VecDeque;

/// Bottom-up dynamic-programming planner.
pub struct DpPlanner<'a> {
    forest: &'a RegionForest,
    model: &'a dyn CostModel,
}

impl<'a> DpPlanner<'a> {
    pub fn new(forest: &'a RegionForest, model: &'a dyn CostModel) -> Self {
        Self { forest, model }
    }

    /// Time saved by parallelizing `node` alone, in percent of root time.
    pub fn self_point(&self, node: &RegionNode, root_serial_time: f64) -> f64 {
        let parallel = self.model.estimate_parallel_time(node);
        let serial = self.model.estimate_serial_time(node);
        let speedup = if parallel > 0.0 && parallel < serial {
            serial / parallel
        } else {
            1.0
        };
        let coverage = 100.0 * serial * node.instance_count() as f64 / root_serial_time;
        (coverage - coverage / speedup).max(0.0)
    }

    /// Choose the regions to parallelize; nodes in `exclude` are never chosen.
    pub fn plan(&self, exclude: &HashSet<NodeId>) -> PlanResult<Plan> {
        let forest = self.forest;
        let root = forest.root();
        let root_serial_time = self.model.estimate_serial_time(root);
        if root_serial_time <= 0.0 {
            return Err(PlanError::ZeroSerialTime);
        }

        let count = forest.len();
        let mut point = vec![0.0f64; count];
        let mut chosen: Vec<Vec<NodeId>> = vec![Vec::new(); count];
        let mut pending: Vec<usize> = forest.all_nodes().map(|n| n.children().len()).collect();
        let mut queue: VecDeque<NodeId> = forest.leaves().map(RegionNode::id).collect();
        let mut evaluated = 0usize;

        while let Some(id) = queue.pop_front() {
            let node = forest.node(id);
            evaluated += 1;

            let children_sum: f64 = node.children().iter().map(|c| point[c.index()]).sum();
            let self_point = if exclude.contains(&id) {
                0.0
            } else {
                self.self_point(node, root_serial_time)
            };

            if self_point > children_sum {
                log::trace!(
                    "{} [{}]: self {:.3} > children {:.3}, choosing it",
                    id,
                    node.uid(),
                    self_point,
                    children_sum
                );
                point[id.index()] = self_point;
                chosen[id.index()] = vec![id];
            } else {
                log::trace!(
                    "{} [{}]: self {:.3} <= children {:.3}",
                    id,
                    node.uid(),
                    self_point,
                    children_sum
                );
                let mut union = Vec::new();
                for child in node.children() {
                    union.append(&mut chosen[child.index()]);
                }
                point[id.index()] = children_sum;
                chosen[id.index()] = union;
            }

            if let Some(parent) = node.parent() {
                let remaining = &mut pending[parent.index()];
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(parent);
                }
            }
        }
        debug_assert_eq!(evaluated, count);

        let target = *self.model.target();
        let mut entries: Vec<PlanEntry> = std::mem::take(&mut chosen[forest.root_id().index()])
            .into_iter()
            .map(|id| {
                let node = forest.node(id);
                PlanEntry {
                    region: id,
                    uid: node.uid(),
                    assigned_core_count: assigned_cores(target.core_count, node.self_parallelism()),
                    time_reduction: point[id.index()],
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.time_reduction
                .total_cmp(&a.time_reduction)
                .then(a.region.cmp(&b.region))
        });

        let total_time_reduction = point[forest.root_id().index()];
        log::info!(
            "Plan ({}): {} regions, time reduction {:.2}%",
            self.model.name(),
            entries.len(),
            total_time_reduction
        );

        Ok(Plan {
            entries,
            target,
            model: self.model.name(),
            total_time_reduction,
            serial_time: root_serial_time,
        })
    }
}

fn assigned_cores(core_count: u32, self_parallelism: f64) -> u32 {
    let wanted = self_parallelism.ceil();
    if wanted >= f64::from(core_count) {
        core_count
    } else {
        (wanted as u32).max(1)
    }
}
