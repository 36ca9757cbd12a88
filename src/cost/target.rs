//! Target machine description.

use std::fmt;

/// Machine the plan is made for. Immutable once handed to a cost model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub core_count: u32,
    /// Fixed cost, in work units, charged for every parallel region instance.
    pub overhead: u32,
    pub clock_mhz: Option<u32>,
    pub bandwidth_mb_per_s: Option<u32>,
    pub cache_mb: Option<u32>,
}

impl Target {
    pub fn new(core_count: u32, overhead: u32) -> Self {
        Self {
            core_count,
            overhead,
            clock_mhz: None,
            bandwidth_mb_per_s: None,
            cache_mb: None,
        }
    }

    pub fn with_clock_mhz(mut self, mhz: u32) -> Self {
        self.clock_mhz = Some(mhz);
        self
    }

    pub fn with_bandwidth_mb_per_s(mut self, mb: u32) -> Self {
        self.bandwidth_mb_per_s = Some(mb);
        self
    }

    pub fn with_cache_mb(mut self, mb: u32) -> Self {
        self.cache_mb = Some(mb);
        self
    }

    /// Cores usable by a region with the given self-parallelism.
    pub fn usable_cores(&self, self_parallelism: f64) -> f64 {
        f64::from(self.core_count.max(1)).min(self_parallelism)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NumCore = {}, Overhead = {}", self.core_count, self.overhead)?;
        if let Some(mhz) = self.clock_mhz {
            write!(f, ", Clock = {mhz} MHz")?;
        }
        if let Some(mb) = self.bandwidth_mb_per_s {
            write!(f, ", Bandwidth = {mb} MB/s")?;
        }
        if let Some(mb) = self.cache_mb {
            write!(f, ", Cache = {mb} MB")?;
        }
        Ok(())
    }
}
