//! Flat trace records and their per-depth statistics.

use std::fmt;

/// Recursion role of a dynamic region node.
///
/// `RecursionNormal` never appears on the wire: it is assigned while building
/// the region tree to ordinary nodes found below a recursion init node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Normal,
    RecursionInit,
    RecursionSink,
    RecursionNormal,
}

impl NodeKind {
    /// Decode the `node_kind` field of a trace record.
    pub fn from_wire(code: u64) -> Option<Self> {
        match code {
            0 => Some(NodeKind::Normal),
            1 => Some(NodeKind::RecursionInit),
            2 => Some(NodeKind::RecursionSink),
            _ => None,
        }
    }

    /// Code written to the trace. Reclassified nodes are stored as normal.
    pub fn wire_code(self) -> u64 {
        match self {
            NodeKind::Normal | NodeKind::RecursionNormal => 0,
            NodeKind::RecursionInit => 1,
            NodeKind::RecursionSink => 2,
        }
    }

    /// True for every kind that belongs to an unwound recursive chain.
    pub fn is_recursive(self) -> bool {
        self != NodeKind::Normal
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Normal => "Norm",
            NodeKind::RecursionInit => "RInit",
            NodeKind::RecursionSink => "RSink",
            NodeKind::RecursionNormal => "RNorm",
        };
        f.write_str(name)
    }
}

/// Aggregated statistics of one node at one recursion depth.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStat {
    pub instance_count: u64,
    pub total_work: u64,
    pub total_parallel_work: u64,
    pub self_parallel_work: u64,
    /// Smallest per-instance self-parallelism, in hundredths as stored in the trace.
    pub min_self_parallelism_x100: u64,
    pub max_self_parallelism_x100: u64,
    pub total_iterations: u64,
    pub min_iterations: u64,
    pub max_iterations: u64,
    /// Fraction of the enclosing recursion's unwound work flowing through this
    /// node at this depth. Assigned while building the region tree.
    pub recursion_weight: f64,
}

impl RegionStat {
    /// Statistics with the given work counters and neutral extremes.
    pub fn new(instance_count: u64, total_work: u64, self_parallel_work: u64) -> Self {
        let self_parallelism = ratio(total_work, self_parallel_work);
        Self {
            instance_count,
            total_work,
            total_parallel_work: self_parallel_work,
            self_parallel_work,
            min_self_parallelism_x100: to_hundredths(self_parallelism),
            max_self_parallelism_x100: to_hundredths(self_parallelism),
            total_iterations: 0,
            min_iterations: 0,
            max_iterations: 0,
            recursion_weight: 0.0,
        }
    }

    pub fn with_iterations(mut self, total: u64, min: u64, max: u64) -> Self {
        self.total_iterations = total;
        self.min_iterations = min;
        self.max_iterations = max;
        self
    }

    pub fn with_total_parallel_work(mut self, work: u64) -> Self {
        self.total_parallel_work = work;
        self
    }

    /// `total_work / self_parallel_work`; a node without work is serial.
    pub fn self_parallelism(&self) -> f64 {
        ratio(self.total_work, self.self_parallel_work)
    }

    pub fn min_self_parallelism(&self) -> f64 {
        self.min_self_parallelism_x100 as f64 / 100.0
    }

    pub fn max_self_parallelism(&self) -> f64 {
        self.max_self_parallelism_x100 as f64 / 100.0
    }

    /// `total_work / total_parallel_work`, the critical-path bound including callees.
    pub fn total_parallelism(&self) -> f64 {
        ratio(self.total_work, self.total_parallel_work)
    }

    pub fn avg_work(&self) -> u64 {
        self.total_work / self.instance_count.max(1)
    }

    pub fn avg_iterations(&self) -> f64 {
        self.total_iterations as f64 / self.instance_count.max(1) as f64
    }
}

fn to_hundredths(value: f64) -> u64 {
    (value * 100.0).round() as u64
}

fn ratio(work: u64, reduced: u64) -> f64 {
    if work == 0 {
        1.0
    } else {
        work as f64 / reduced as f64
    }
}

/// One dynamic region node exactly as stored in the binary trace.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub uid: u64,
    pub static_region_id: u64,
    /// Call-site descriptor id, 0 when the node has none.
    pub call_site_id: u64,
    pub kind: NodeKind,
    /// Init node targeted by a sink; 0 for every other kind.
    pub recursion_target_uid: u64,
    pub instance_count: u64,
    pub parallel_bit: bool,
    pub child_uids: Vec<u64>,
    /// Statistics per recursion depth, outermost first.
    pub stats: Vec<RegionStat>,
}

impl DecodedRecord {
    pub fn new(uid: u64, static_region_id: u64) -> Self {
        Self {
            uid,
            static_region_id,
            call_site_id: 0,
            kind: NodeKind::Normal,
            recursion_target_uid: 0,
            instance_count: 1,
            parallel_bit: false,
            child_uids: Vec::new(),
            stats: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_call_site(mut self, call_site_id: u64) -> Self {
        self.call_site_id = call_site_id;
        self
    }

    /// Mark this record as a sink of the recursion rooted at `init_uid`.
    pub fn with_recursion_target(mut self, init_uid: u64) -> Self {
        self.kind = NodeKind::RecursionSink;
        self.recursion_target_uid = init_uid;
        self
    }

    pub fn with_instances(mut self, count: u64) -> Self {
        self.instance_count = count;
        self
    }

    pub fn with_parallel_bit(mut self, parallel: bool) -> Self {
        self.parallel_bit = parallel;
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = u64>) -> Self {
        self.child_uids.extend(children);
        self
    }

    pub fn with_stat(mut self, stat: RegionStat) -> Self {
        self.stats.push(stat);
        self
    }
}

impl fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {} sid: {:x} cid: {:x} type: {} rtarget: {} instance: {} pbit: {} children: {} stats: {}",
            self.uid,
            self.static_region_id,
            self.call_site_id,
            self.kind,
            self.recursion_target_uid,
            self.instance_count,
            self.parallel_bit,
            self.child_uids.len(),
            self.stats.len()
        )
    }
}
