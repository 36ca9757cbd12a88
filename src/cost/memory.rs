//! Per-node memory access counters.
//!
//! The region trace does not record memory traffic, so the bandwidth and cache
//! models read it from a side table: one row per node uid with the totals
//! `reads writes loads stores` summed over all instances. Nodes without a row
//! have no memory traffic.

use crate::core::error::PlanResult;
use crate::core::text::{self, FieldSplit};
use crate::forest::RegionNode;
use hashbrown::HashMap;
use std::path::Path;

/// Memory access totals of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCounters {
    pub reads: u64,
    pub writes: u64,
    pub loads: u64,
    pub stores: u64,
}

/// Memory counters keyed by node uid.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfile {
    counters: HashMap<u64, MemoryCounters>,
}

impl MemoryProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        let profile = Self::parse_str(&text::read_text(path)?)?;
        log::info!("Loaded memory counters for {} nodes from {}", profile.len(), path.display());
        Ok(profile)
    }

    pub fn parse_str(contents: &str) -> PlanResult<Self> {
        let mut profile = Self::new();
        for row in text::rows(contents, FieldSplit::Whitespace) {
            row.expect_fields(5)?;
            let uid = row.parse(0, "uid")?;
            profile.insert(
                uid,
                MemoryCounters {
                    reads: row.parse(1, "reads")?,
                    writes: row.parse(2, "writes")?,
                    loads: row.parse(3, "loads")?,
                    stores: row.parse(4, "stores")?,
                },
            );
        }
        Ok(profile)
    }

    pub fn insert(&mut self, uid: u64, counters: MemoryCounters) {
        self.counters.insert(uid, counters);
    }

    pub fn get(&self, uid: u64) -> MemoryCounters {
        self.counters.get(&uid).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Per-instance averages for `node`.
    pub fn averages(&self, node: &RegionNode) -> MemoryAverages {
        let counters = self.get(node.uid());
        let instances = node.instance_count().max(1) as f64;
        MemoryAverages {
            reads: counters.reads as f64 / instances,
            writes: counters.writes as f64 / instances,
            loads: counters.loads as f64 / instances,
            stores: counters.stores as f64 / instances,
        }
    }
}

/// Per-instance memory access averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryAverages {
    pub reads: f64,
    pub writes: f64,
    pub loads: f64,
    pub stores: f64,
}
