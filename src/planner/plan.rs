//! Planner output.

use crate::cost::Target;
use crate::forest::NodeId;
use std::fmt;

/// One region the plan marks parallel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    pub region: NodeId,
    /// Trace uid of the region instance.
    pub uid: u64,
    pub assigned_core_count: u32,
    /// Estimated reduction of whole-program time, in percent.
    pub time_reduction: f64,
}

impl fmt::Display for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:.2}% on {} cores",
            self.uid, self.time_reduction, self.assigned_core_count
        )
    }
}

/// A set of regions to parallelize and the estimated benefit.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Sorted by descending time reduction.
    pub entries: Vec<PlanEntry>,
    pub target: Target,
    /// Cost model the plan was made with.
    pub model: &'static str,
    pub total_time_reduction: f64,
    /// Serial time of the root region.
    pub serial_time: f64,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whole-program speedup implied by the total time reduction.
    pub fn speedup(&self) -> f64 {
        let remaining = 100.0 - self.total_time_reduction;
        if remaining <= 0.0 {
            return f64::INFINITY;
        }
        100.0 / remaining
    }

    /// Estimated root time after applying the plan.
    pub fn parallel_time(&self) -> f64 {
        self.serial_time * (100.0 - self.total_time_reduction) / 100.0
    }

    /// Entries whose time reduction is at least `min_reduction` percent.
    pub fn entries_above(&self, min_reduction: f64) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(move |e| e.time_reduction >= min_reduction)
    }

    pub fn contains(&self, region: NodeId) -> bool {
        self.entries.iter().any(|e| e.region == region)
    }
}
