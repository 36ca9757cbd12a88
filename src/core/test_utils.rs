//! Fixture helpers for unit tests.
//!
//! Builds small static region tables and forests from inline records so tests
//! can state only the shape and work figures they care about.

#[cfg(test)]
pub mod test {
    use crate::forest::RegionForest;
    use crate::regions::{RegionFileFormat, StaticRegionTable};
    use crate::trace::{DecodedRecord, RegionStat};

    /// Regions used by fixtures: 1 is a function, 2 and 3 loops, 4 a loop body.
    pub const FIXTURE_REGIONS: &str = "\
1\tfunc\tmain.c\tmain\t1\t40
2\tloop\tmain.c\tmain\t5\t20
3\tloop\tmain.c\twork\t22\t30
4\tloop-body\tmain.c\twork\t23\t29
7\tcallsite\tmain.c\tmain\t12\t12
";

    pub fn fixture_table() -> StaticRegionTable {
        StaticRegionTable::parse_str(FIXTURE_REGIONS, RegionFileFormat::Tabbed)
            .expect("fixture table parses")
    }

    /// A one-instance record of region `sid` with the given work figures.
    pub fn record(uid: u64, sid: u64, total_work: u64, self_parallel_work: u64) -> DecodedRecord {
        DecodedRecord::new(uid, sid).with_stat(RegionStat::new(1, total_work, self_parallel_work))
    }

    /// Build a forest over the fixture table.
    pub fn forest(records: Vec<DecodedRecord>) -> RegionForest {
        RegionForest::build(&fixture_table(), records).expect("fixture forest builds")
    }
}
