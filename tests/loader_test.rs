//! Tests for the text inputs: region table, cache table and memory profile.

use kremlin_planner::cost::{CacheStatTable, MemoryProfile};
use kremlin_planner::regions::{RegionKind, StaticRegion, StaticRegionTable};
use kremlin_planner::PlanError;
use std::path::PathBuf;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("kremlin-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_region_table_from_file() {
    let path = temp_file(
        "sregions.txt",
        "1\tfunc\tmy module.c\tmain\t1\t50\n\
         2 loop legacy.c work 4 12\n\
         \n\
         3\tloop_body\tmy module.c\tmain\t5\t9\n\
         8\tcallsite\tmy module.c\tmain\t20\t20\n",
    );
    let table = StaticRegionTable::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(table.len(), 4);
    assert_eq!(table.call_site_count(), 1);
    assert_eq!(table.get(1).unwrap().module, "my module.c");
    assert_eq!(table.get(2).unwrap().kind, RegionKind::Loop);
    assert_eq!(table.get(3).unwrap().kind, RegionKind::Body);
    assert_eq!(table.call_site(8).unwrap().start_line, 20);
    assert!(matches!(table.get(8), Err(PlanError::UnknownRegion { id: 8 })));

    let root = table.get(StaticRegion::ROOT_ID).unwrap();
    assert_eq!(root.kind, RegionKind::Loop);
    assert_eq!(root.function, "root");

    let loops: Vec<u64> = table
        .regions_of_kind(RegionKind::Loop)
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(loops, vec![0, 2]);
}

#[test]
fn test_bad_region_line_reports_line_number() {
    let path = temp_file("bad-sregions.txt", "1 func a.c main 1 5\n2 branch a.c main 2 3\n");
    let err = StaticRegionTable::load(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(err, PlanError::Parse { line: 2, .. }), "{err}");
}

#[test]
fn test_cache_table_from_file() {
    let path = temp_file("cache.txt", "8\t4\t2\t1\t0.5\n2\t10\t5\t2\t1\n");
    let table = CacheStatTable::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(table.len(), 2);
    let rates = table.miss_rates(3, 0).unwrap();
    assert!((rates.read - 0.04).abs() < 1e-12);
    assert!((table.miss_rates(2, 1).unwrap().read - 0.02).abs() < 1e-12);
}

#[test]
fn test_memory_profile_from_file() {
    let path = temp_file("memory.txt", "5 100 20 60 10\n6 0 0 0 0\n");
    let profile = MemoryProfile::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(profile.len(), 2);
    assert_eq!(profile.get(5).loads, 60);
    assert_eq!(profile.get(7).reads, 0);
}

#[test]
fn test_missing_inputs() {
    let missing = std::env::temp_dir().join("kremlin-missing-input.txt");
    assert!(matches!(
        StaticRegionTable::load(&missing),
        Err(PlanError::Io { .. })
    ));
    assert!(matches!(
        CacheStatTable::load(&missing),
        Err(PlanError::Io { .. })
    ));
}
