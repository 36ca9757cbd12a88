//! Cache-aware cost model.
//!
//! Miss rates come from a measured table with one row per core count:
//! `core_count  l1_read%  l1_write%  l2_read%  l2_write%`, tab separated. A
//! lookup for `n` cores uses the row with the smallest core count `>= n`.
//! Every estimate is charged the service time of its misses, which grows with
//! the core count once a level stops scaling.

use super::memory::MemoryProfile;
use super::target::Target;
use super::{overhead_parallel_time, CostModel};
use crate::core::error::{PlanError, PlanResult};
use crate::core::text::{self, FieldSplit};
use crate::forest::RegionNode;
use std::path::Path;

/// Service time in cycles and scaling limit in cores, per cache level.
const CACHE_LEVELS: [CacheLevel; 2] = [
    CacheLevel {
        service_time: 10.0,
        scale_limit: 64,
    },
    CacheLevel {
        service_time: 200.0,
        scale_limit: 8,
    },
];

#[derive(Debug, Clone, Copy)]
struct CacheLevel {
    service_time: f64,
    scale_limit: u32,
}

/// Read and write miss rates of one cache level, as fractions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MissRates {
    pub read: f64,
    pub write: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct CacheRow {
    core_count: u32,
    levels: [MissRates; 2],
}

/// Measured miss rates indexed by core count.
#[derive(Debug, Clone, Default)]
pub struct CacheStatTable {
    /// Sorted by ascending core count.
    rows: Vec<CacheRow>,
}

impl CacheStatTable {
    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let path = path.as_ref();
        let table = Self::parse_str(&text::read_text(path)?)?;
        log::info!("Loaded {} cache rows from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn parse_str(contents: &str) -> PlanResult<Self> {
        let mut rows = Vec::new();
        for row in text::rows(contents, FieldSplit::Tabs) {
            row.expect_fields(5)?;
            let percent = |index: usize, name: &str| -> PlanResult<f64> {
                Ok(row.parse::<f64>(index, name)? * 0.01)
            };
            rows.push(CacheRow {
                core_count: row.parse(0, "core_count")?,
                levels: [
                    MissRates {
                        read: percent(1, "l1_read_miss")?,
                        write: percent(2, "l1_write_miss")?,
                    },
                    MissRates {
                        read: percent(3, "l2_read_miss")?,
                        write: percent(4, "l2_write_miss")?,
                    },
                ],
            });
        }
        rows.sort_by_key(|row| row.core_count);
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Largest core count the table covers.
    pub fn max_core_count(&self) -> Option<u32> {
        self.rows.last().map(|row| row.core_count)
    }

    /// Miss rates of `level` (0 = L1, 1 = L2) for `core_count` cores.
    pub fn miss_rates(&self, core_count: u32, level: usize) -> Option<MissRates> {
        self.rows
            .iter()
            .find(|row| row.core_count >= core_count)
            .and_then(|row| row.levels.get(level).copied())
    }
}

/// Overhead model plus cache-miss service time.
#[derive(Debug, Clone)]
pub struct CacheAwareModel {
    target: Target,
    table: CacheStatTable,
    memory: MemoryProfile,
}

impl CacheAwareModel {
    /// Fails unless the table has a row for `target.core_count` cores.
    pub fn new(target: Target, table: CacheStatTable, memory: MemoryProfile) -> PlanResult<Self> {
        if table.miss_rates(target.core_count.max(1), 0).is_none() {
            return Err(PlanError::CacheTable {
                reason: match table.max_core_count() {
                    Some(max) => format!(
                        "no row covers {} cores (largest row is {max})",
                        target.core_count
                    ),
                    None => "table is empty".to_string(),
                },
            });
        }
        Ok(Self {
            target,
            table,
            memory,
        })
    }

    /// Cycles spent servicing one instance's misses on `core_count` cores.
    pub fn service_time(&self, node: &RegionNode, core_count: u32) -> f64 {
        let avg = self.memory.averages(node);
        let core_count = core_count.max(1);
        CACHE_LEVELS
            .iter()
            .enumerate()
            .map(|(level, cache)| {
                let rates = self
                    .table
                    .miss_rates(core_count, level)
                    .unwrap_or_default();
                let misses = avg.loads * rates.read + avg.stores * rates.write;
                let sharing = f64::from(core_count.min(cache.scale_limit));
                misses * cache.service_time / sharing
            })
            .sum()
    }
}

impl CostModel for CacheAwareModel {
    fn target(&self) -> &Target {
        &self.target
    }

    fn estimate_parallel_time(&self, node: &RegionNode) -> f64 {
        let cores = self.target.usable_cores(node.self_parallelism()).floor() as u32;
        overhead_parallel_time(node, &self.target) + self.service_time(node, cores)
    }

    fn estimate_serial_time(&self, node: &RegionNode) -> f64 {
        node.avg_work() as f64 + self.service_time(node, 1)
    }

    fn name(&self) -> &'static str {
        "cache"
    }
}
