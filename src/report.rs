//! Human-readable plan report.

use crate::forest::RegionForest;
use crate::planner::Plan;
use std::fmt;

/// Formats a [`Plan`] against the forest it was made from.
pub struct PlanReport<'a> {
    forest: &'a RegionForest,
    plan: &'a Plan,
    min_reduction: f64,
}

impl<'a> PlanReport<'a> {
    pub fn new(forest: &'a RegionForest, plan: &'a Plan) -> Self {
        Self {
            forest,
            plan,
            min_reduction: 0.0,
        }
    }

    /// Hide entries below `min_reduction` percent.
    pub fn with_min_reduction(mut self, min_reduction: f64) -> Self {
        self.min_reduction = min_reduction;
        self
    }
}

impl fmt::Display for PlanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan;
        writeln!(f, "Target : {} ({})", plan.target, plan.model)?;
        writeln!(f, "{}", self.forest.region_counts())?;
        writeln!(
            f,
            "Speedup: {:.2}, Serial time: {:.0}, Parallel time: {:.0}, Time reduction: {:.2}%",
            plan.speedup(),
            plan.serial_time,
            plan.parallel_time(),
            plan.total_time_reduction
        )?;

        for (rank, entry) in plan.entries_above(self.min_reduction).enumerate() {
            let node = self.forest.node(entry.region);
            writeln!(f)?;
            writeln!(
                f,
                "[{:3}] TimeRed({}) = {:.2}%",
                rank, entry.assigned_core_count, entry.time_reduction
            )?;
            writeln!(
                f,
                "      id = {}, {} {}, coverage = {:.2}%",
                node.uid(),
                node.parallelism_type(),
                node.kind(),
                self.forest.coverage(node)
            )?;
            writeln!(
                f,
                "      self-p = {:.2} [{:.2} - {:.2}], avg work = {}, instances = {}",
                node.self_parallelism(),
                node.min_self_parallelism(),
                node.max_self_parallelism(),
                node.avg_work(),
                node.instance_count()
            )?;
            for frame in self.forest.call_context(node) {
                writeln!(f, "      {frame}")?;
            }
        }
        Ok(())
    }
}
