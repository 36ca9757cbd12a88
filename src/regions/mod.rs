// This module models the static side of a profile: the immutable descriptors of every
// function, loop and loop body the instrumenter assigned an id to, plus the call-site
// descriptors used to tell apart different dynamic instances of the same function.
// StaticRegion is a plain value type; RegionKind is its classification; the table
// submodule loads both kinds of descriptor from the sregions.txt text file and keeps
// call sites in a separate id space from regions.

//! Static region and call-site descriptors.

pub mod table;

pub use table::{RegionFileFormat, StaticRegionTable};

use std::fmt;

/// Classification of a static region descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionKind {
    Func,
    Loop,
    Body,
    CallSite,
}

impl RegionKind {
    /// Parse the kind column of a region table row.
    pub fn from_descriptor(kind: &str) -> Option<Self> {
        match kind {
            "func" => Some(RegionKind::Func),
            "loop" => Some(RegionKind::Loop),
            "loop-body" | "loop_body" => Some(RegionKind::Body),
            "callsite" => Some(RegionKind::CallSite),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegionKind::Func => "func",
            RegionKind::Loop => "loop",
            RegionKind::Body => "loop_body",
            RegionKind::CallSite => "callsite",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable descriptor of a function, loop, loop body or call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticRegion {
    pub id: u64,
    pub kind: RegionKind,
    pub module: String,
    pub function: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl StaticRegion {
    /// Id of the synthetic region that encloses the whole program.
    pub const ROOT_ID: u64 = 0;

    /// The synthetic root region, implicitly present in every table.
    pub fn root() -> Self {
        Self {
            id: Self::ROOT_ID,
            kind: RegionKind::Loop,
            module: "root".to_string(),
            function: "root".to_string(),
            start_line: 0,
            end_line: 0,
        }
    }

    pub fn is_loop(&self) -> bool {
        self.kind == RegionKind::Loop
    }

    pub fn is_function(&self) -> bool {
        self.kind == RegionKind::Func
    }
}

impl fmt::Display for StaticRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{}-{}] ({})",
            self.module, self.function, self.start_line, self.end_line, self.kind
        )
    }
}
