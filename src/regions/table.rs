//! Loader for the `sregions.txt` static region table.
//!
//! Each non-blank line describes one region or call site with six fields:
//! `id kind module function start_line end_line`. Two sub-formats exist: the
//! legacy one separates fields by whitespace, the newer one by tabs (which lets
//! module and function names contain spaces). Call-site rows use the kind
//! `callsite` and live in their own id space.

use super::{RegionKind, StaticRegion};
use crate::core::error::{PlanError, PlanResult};
use crate::core::text::{self, FieldSplit, TextLine};
use hashbrown::HashMap;
use std::path::Path;

/// Which textual sub-format a region table is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionFileFormat {
    /// Decide per line: tab-delimited if the line contains a tab.
    #[default]
    Auto,
    /// Newer tab-delimited rows.
    Tabbed,
    /// Legacy whitespace-tokenized rows.
    Whitespace,
}

impl RegionFileFormat {
    fn field_split(self) -> FieldSplit {
        match self {
            RegionFileFormat::Auto => FieldSplit::Auto,
            RegionFileFormat::Tabbed => FieldSplit::Tabs,
            RegionFileFormat::Whitespace => FieldSplit::Whitespace,
        }
    }
}

/// Immutable id-keyed tables of static regions and call sites.
#[derive(Debug, Clone)]
pub struct StaticRegionTable {
    regions: HashMap<u64, StaticRegion>,
    call_sites: HashMap<u64, StaticRegion>,
}

impl Default for StaticRegionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticRegionTable {
    /// A table holding only the synthetic root region.
    pub fn new() -> Self {
        let mut regions = HashMap::new();
        regions.insert(StaticRegion::ROOT_ID, StaticRegion::root());
        Self {
            regions,
            call_sites: HashMap::new(),
        }
    }

    /// Load a table from disk, detecting the sub-format per line.
    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        Self::load_with_format(path, RegionFileFormat::Auto)
    }

    pub fn load_with_format(path: impl AsRef<Path>, format: RegionFileFormat) -> PlanResult<Self> {
        let path = path.as_ref();
        let contents = text::read_text(path)?;
        let table = Self::parse_str(&contents, format)?;
        log::info!(
            "Loaded {} static regions and {} call sites from {}",
            table.regions.len(),
            table.call_sites.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse table text.
    pub fn parse_str(contents: &str, format: RegionFileFormat) -> PlanResult<Self> {
        let mut table = Self::new();
        for row in text::rows(contents, format.field_split()) {
            let region = parse_row(&row)?;
            table.insert(region);
        }
        Ok(table)
    }

    /// Add a descriptor, routing call sites to their own table.
    pub fn insert(&mut self, region: StaticRegion) {
        let target = if region.kind == RegionKind::CallSite {
            &mut self.call_sites
        } else {
            &mut self.regions
        };
        if let Some(previous) = target.insert(region.id, region) {
            log::warn!("Duplicate static descriptor id {}; keeping the later row", previous.id);
        }
    }

    /// Look up a region by id.
    pub fn get(&self, id: u64) -> PlanResult<&StaticRegion> {
        self.regions.get(&id).ok_or(PlanError::UnknownRegion { id })
    }

    /// Look up a call site by id.
    pub fn call_site(&self, id: u64) -> PlanResult<&StaticRegion> {
        self.call_sites
            .get(&id)
            .ok_or(PlanError::UnknownCallSite { id })
    }

    /// All regions of one kind, ordered by id.
    pub fn regions_of_kind(&self, kind: RegionKind) -> Vec<&StaticRegion> {
        let mut found: Vec<_> = self.regions.values().filter(|r| r.kind == kind).collect();
        found.sort_by_key(|r| r.id);
        found
    }

    /// Number of regions, including the synthetic root.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn call_site_count(&self) -> usize {
        self.call_sites.len()
    }
}

fn parse_row(row: &TextLine<'_>) -> PlanResult<StaticRegion> {
    row.expect_fields(6)?;

    let kind_str = row.field(1, "kind")?;
    let kind = RegionKind::from_descriptor(kind_str)
        .ok_or_else(|| PlanError::parse(row.number, format!("unknown region kind '{kind_str}'")))?;

    Ok(StaticRegion {
        id: row.parse(0, "id")?,
        kind,
        module: row.field(2, "module")?.to_string(),
        function: row.field(3, "function")?.to_string(),
        start_line: row.parse(4, "start_line")?,
        end_line: row.parse(5, "end_line")?,
    })
}
