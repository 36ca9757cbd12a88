// This module defines the error type shared by every stage of the planner, built on the
// thiserror crate. PlanError covers the whole pipeline: malformed region-table lines,
// truncated or inconsistent binary trace records, structural violations found while
// linking the region tree (dangling children, duplicate parents, zero or several roots,
// detached cycles), broken recursion bookkeeping, unknown static region or call-site ids,
// self-parallelism values below one, and planner preconditions such as a zero-work root.
// Every variant carries the offending line, byte offset or node uid so that the binary
// can report a precise diagnostic. None of these errors is recoverable within one run;
// callers propagate them with `?` up to the process boundary.

//! Error types for trace analysis and planning.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for loading, building and planning.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("trace decode error at byte {offset}: {reason}")]
    Decode { offset: u64, reason: String },

    #[error("record {uid} has unknown node kind {kind}")]
    UnknownNodeKind { uid: u64, kind: u64 },

    #[error("record {uid} appears more than once in the trace")]
    DuplicateUid { uid: u64 },

    #[error("node {parent} lists child {child} which has no record")]
    DanglingChildReference { parent: u64, child: u64 },

    #[error("node {child} is claimed by both {first} and {second}")]
    DuplicateParent { child: u64, first: u64, second: u64 },

    #[error("region tree has no root")]
    NoRoot,

    #[error("region tree has {} roots: {roots:?}", roots.len())]
    MultipleRoots { roots: Vec<u64> },

    #[error("{count} nodes are not reachable from the root (cyclic child references)")]
    UnreachableNodes { count: usize },

    #[error("node {uid} carries no statistics")]
    MissingStatistics { uid: u64 },

    #[error("recursion sink {sink} targets {target}, which is not a recursion init node")]
    InvalidRecursionTarget { sink: u64, target: u64 },

    #[error("recursion sink {sink} is not a descendant of its init node {init}")]
    SinkOutsideRecursion { sink: u64, init: u64 },

    #[error("unknown static region id {id}")]
    UnknownRegion { id: u64 },

    #[error("unknown call site id {id}")]
    UnknownCallSite { id: u64 },

    #[error("node {uid} has self-parallelism {value}, expected at least 1.0")]
    InvalidSelfParallelism { uid: u64, value: f64 },

    #[error("root region has zero serial time")]
    ZeroSerialTime,

    #[error("cache table: {reason}")]
    CacheTable { reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlanError {
    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        PlanError::Parse {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlanError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for planner operations.
pub type PlanResult<T> = Result<T, PlanError>;
