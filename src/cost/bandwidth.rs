//! Memory-bandwidth limited cost models.
//!
//! A parallel region can never finish faster than the time needed to move its
//! data: `clock_mhz * bytes / bandwidth_mb_per_s` cycles, where `bytes` is four
//! bytes per average read and write. The best case assumes the last-level cache
//! absorbs `cache_mb` of that traffic; the worst case assumes no reuse and a
//! lower sustained bandwidth.

use super::memory::MemoryProfile;
use super::target::Target;
use super::{overhead_parallel_time, CostModel};
use crate::forest::RegionNode;

const DEFAULT_CLOCK_MHZ: u32 = 2400;
const DEFAULT_BEST_BANDWIDTH_MB: u32 = 25_000;
const DEFAULT_WORST_BANDWIDTH_MB: u32 = 10_000;
const DEFAULT_CACHE_MB: u32 = 16;
const BYTES_PER_ACCESS: f64 = 4.0;

/// Which end of the bandwidth estimate to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthBound {
    Best,
    Worst,
}

/// Overhead model with a memory-bandwidth floor.
#[derive(Debug, Clone)]
pub struct BandwidthModel {
    target: Target,
    memory: MemoryProfile,
    bound: BandwidthBound,
}

impl BandwidthModel {
    pub fn new(target: Target, memory: MemoryProfile, bound: BandwidthBound) -> Self {
        Self {
            target,
            memory,
            bound,
        }
    }

    pub fn best(target: Target, memory: MemoryProfile) -> Self {
        Self::new(target, memory, BandwidthBound::Best)
    }

    pub fn worst(target: Target, memory: MemoryProfile) -> Self {
        Self::new(target, memory, BandwidthBound::Worst)
    }

    fn clock_mhz(&self) -> f64 {
        f64::from(self.target.clock_mhz.unwrap_or(DEFAULT_CLOCK_MHZ))
    }

    fn bandwidth_mb(&self) -> f64 {
        let default = match self.bound {
            BandwidthBound::Best => DEFAULT_BEST_BANDWIDTH_MB,
            BandwidthBound::Worst => DEFAULT_WORST_BANDWIDTH_MB,
        };
        f64::from(self.target.bandwidth_mb_per_s.unwrap_or(default).max(1))
    }

    fn cache_bytes(&self) -> f64 {
        match self.bound {
            BandwidthBound::Best => {
                f64::from(self.target.cache_mb.unwrap_or(DEFAULT_CACHE_MB)) * 1024.0 * 1024.0
            }
            BandwidthBound::Worst => 0.0,
        }
    }

    /// Cycles needed to stream one instance's data.
    pub fn bandwidth_time(&self, node: &RegionNode) -> f64 {
        let avg = self.memory.averages(node);
        let bytes = ((avg.reads + avg.writes) * BYTES_PER_ACCESS - self.cache_bytes()).max(0.0);
        self.clock_mhz() * bytes / self.bandwidth_mb()
    }
}

impl CostModel for BandwidthModel {
    fn target(&self) -> &Target {
        &self.target
    }

    fn estimate_parallel_time(&self, node: &RegionNode) -> f64 {
        let compute = overhead_parallel_time(node, &self.target);
        compute.max(self.bandwidth_time(node))
    }

    fn name(&self) -> &'static str {
        match self.bound {
            BandwidthBound::Best => "bandwidth-best",
            BandwidthBound::Worst => "bandwidth-worst",
        }
    }
}
