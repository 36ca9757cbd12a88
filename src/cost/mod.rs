// This module defines the cost models the planner consults to estimate how long one
// instance of a region takes serially and in parallel on the target machine. CostModel
// is a small trait so new models plug in without touching the planner. The plain
// model divides the average work by the usable core count and adds the per-region
// overhead; the bandwidth models put a memory-bandwidth floor under that time (best case
// assumes the cache absorbs part of the traffic, worst case assumes none of it); the
// cache-aware model adds the service time of cache misses to both the serial and the
// parallel estimate. Every model is non-negative and non-decreasing in the overhead.

//! Per-region time estimation strategies.

pub mod bandwidth;
pub mod cache;
pub mod memory;
pub mod target;

pub use bandwidth::{BandwidthBound, BandwidthModel};
pub use cache::{CacheAwareModel, CacheStatTable};
pub use memory::{MemoryAverages, MemoryCounters, MemoryProfile};
pub use target::Target;

use crate::forest::RegionNode;

/// Estimates the time of one region instance on a target.
pub trait CostModel: Send + Sync {
    /// Machine being modelled.
    fn target(&self) -> &Target;

    /// Time of one instance when the region runs in parallel.
    fn estimate_parallel_time(&self, node: &RegionNode) -> f64;

    /// Time of one instance when the region runs serially.
    fn estimate_serial_time(&self, node: &RegionNode) -> f64 {
        node.avg_work() as f64
    }

    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;
}

impl<M: CostModel + ?Sized> CostModel for Box<M> {
    fn target(&self) -> &Target {
        (**self).target()
    }

    fn estimate_parallel_time(&self, node: &RegionNode) -> f64 {
        (**self).estimate_parallel_time(node)
    }

    fn estimate_serial_time(&self, node: &RegionNode) -> f64 {
        (**self).estimate_serial_time(node)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Average work spread over the usable cores, plus the per-region overhead.
pub fn overhead_parallel_time(node: &RegionNode, target: &Target) -> f64 {
    let cores = target.usable_cores(node.self_parallelism());
    node.avg_work() as f64 / cores + f64::from(target.overhead)
}

/// Work spread over the usable cores with a fixed overhead per region.
#[derive(Debug, Clone)]
pub struct PlainModel {
    target: Target,
}

impl PlainModel {
    pub fn new(target: Target) -> Self {
        Self { target }
    }
}

impl CostModel for PlainModel {
    fn target(&self) -> &Target {
        &self.target
    }

    fn estimate_parallel_time(&self, node: &RegionNode) -> f64 {
        overhead_parallel_time(node, &self.target)
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}
