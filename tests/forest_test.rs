//! Tests for region tree construction and queries.

use hashbrown::HashSet;
use kremlin_planner::forest::{NodeStats, ParallelismType, RegionForest};
use kremlin_planner::regions::{RegionFileFormat, StaticRegionTable};
use kremlin_planner::trace::{decode_bytes, encode_records, DecodedRecord, NodeKind, RegionStat};
use kremlin_planner::PlanError;

const REGIONS: &str = "\
1\tfunc\tsolver.c\tmain\t1\t80
2\tloop\tsolver.c\tmain\t10\t30
3\tloop\tsolver.c\tsweep\t40\t60
4\tloop-body\tsolver.c\tsweep\t41\t59
5\tfunc\tsolver.c\tsweep\t38\t62
9\tcallsite\tsolver.c\tmain\t25\t25
";

fn table() -> StaticRegionTable {
    StaticRegionTable::parse_str(REGIONS, RegionFileFormat::Auto).unwrap()
}

fn record(uid: u64, sid: u64, total_work: u64, self_parallel_work: u64) -> DecodedRecord {
    DecodedRecord::new(uid, sid).with_stat(RegionStat::new(1, total_work, self_parallel_work))
}

fn program() -> Vec<DecodedRecord> {
    vec![
        record(100, 1, 10_000, 10_000).with_children([101, 104]),
        record(101, 2, 6_000, 2_000)
            .with_parallel_bit(true)
            .with_children([102]),
        record(102, 5, 5_000, 5_000)
            .with_call_site(9)
            .with_children([103]),
        record(103, 3, 4_500, 1_500),
        record(104, 3, 3_000, 3_000),
    ]
}

#[test]
fn test_tree_invariant() {
    let forest = RegionForest::build(&table(), program()).unwrap();

    let roots: Vec<_> = forest.all_nodes().filter(|n| n.parent().is_none()).collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].uid(), 100);

    for node in forest.all_nodes() {
        let mut seen = HashSet::new();
        assert!(node.children().iter().all(|c| seen.insert(*c)));

        if let Some(parent) = forest.parent(node) {
            assert!(parent.children().contains(&node.id()));
        }
    }
}

#[test]
fn test_built_from_decoded_bytes() {
    let bytes = encode_records(&program());
    let forest = RegionForest::build(&table(), decode_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(forest.len(), 5);
    assert_eq!(forest.root().uid(), 100);
}

#[test]
fn test_coverage_sums_for_two_levels() {
    let forest = RegionForest::build(
        &table(),
        vec![
            record(1, 1, 1000, 1000).with_children([2, 3, 4]),
            record(2, 2, 500, 100),
            record(3, 3, 300, 300),
            record(4, 3, 200, 50),
        ],
    )
    .unwrap();

    let root = forest.root();
    assert_eq!(forest.coverage(root), 100.0);
    let sum: f64 = forest.children(root).map(|c| forest.coverage(c)).sum();
    assert!((sum - 100.0).abs() < 1e-9, "sum = {sum}");

    let partial = RegionForest::build(
        &table(),
        vec![
            record(1, 1, 1000, 1000).with_children([2]),
            record(2, 2, 400, 100),
        ],
    )
    .unwrap();
    let sum: f64 = partial
        .children(partial.root())
        .map(|c| partial.coverage(c))
        .sum();
    assert!(sum < 100.0);
    assert_eq!(partial.exclusive_work(partial.root()), 600);
}

#[test]
fn test_self_parallelism_floor() {
    let err = RegionForest::build(
        &table(),
        vec![
            record(1, 1, 1000, 1000).with_children([2]),
            record(2, 2, 100, 400),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::InvalidSelfParallelism { uid: 2, .. }));

    let forest = RegionForest::build(&table(), program()).unwrap();
    assert!(forest.all_nodes().all(|n| n.self_parallelism() >= 1.0));
}

#[test]
fn test_self_parallelism_floor_with_large_counters() {
    let err = RegionForest::build(
        &table(),
        vec![
            record(1, 1, 4_000_000_000, 4_000_000_000).with_children([2]),
            record(2, 2, 2_000_000_000, 2_000_000_001),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::InvalidSelfParallelism { uid: 2, .. }));
}

#[test]
fn test_recursive_self_parallelism_floor() {
    let err = RegionForest::build(
        &table(),
        vec![
            DecodedRecord::new(1, 5)
                .with_kind(NodeKind::RecursionInit)
                .with_children([2])
                .with_stat(RegionStat::new(1, 100, 400)),
            DecodedRecord::new(2, 5)
                .with_recursion_target(1)
                .with_stat(RegionStat::new(1, 50, 50)),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, PlanError::InvalidSelfParallelism { uid: 1, .. }));
}

#[test]
fn test_recursive_scenario_self_parallelism() {
    let forest = RegionForest::build(
        &table(),
        vec![
            DecodedRecord::new(1, 5)
                .with_kind(NodeKind::RecursionInit)
                .with_children([2])
                .with_stat(RegionStat::new(1, 1000, 500))
                .with_stat(RegionStat::new(1, 400, 400)),
            DecodedRecord::new(2, 5)
                .with_recursion_target(1)
                .with_stat(RegionStat::new(1, 1000, 1000))
                .with_stat(RegionStat::new(1, 400, 400)),
        ],
    )
    .unwrap();

    let init = forest.root();
    match init.stats() {
        NodeStats::Recursive(stats) => assert_eq!(stats[0].recursion_weight, 1.0),
        NodeStats::Plain(_) => panic!("init node should be recursive"),
    }
    assert!((init.self_parallelism() - 2.0).abs() < 1e-12);
    assert_eq!(init.recursion_depth(), 2);
}

#[test]
fn test_sink_outside_its_recursion() {
    let err = RegionForest::build(
        &table(),
        vec![
            record(1, 1, 1000, 1000).with_children([2, 3]),
            record(2, 5, 400, 400).with_kind(NodeKind::RecursionInit),
            record(3, 5, 200, 200).with_recursion_target(2),
        ],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PlanError::SinkOutsideRecursion { sink: 3, init: 2 }
    ));
}

#[test]
fn test_queries() {
    let forest = RegionForest::build(&table(), program()).unwrap();

    let sweeps: Vec<u64> = forest.nodes_for(3).map(|n| n.uid()).collect();
    assert_eq!(sweeps.len(), 2);
    assert!(sweeps.contains(&103) && sweeps.contains(&104));
    assert_eq!(forest.nodes_for(42).count(), 0);

    let leaves: HashSet<u64> = forest.leaves().map(|n| n.uid()).collect();
    assert_eq!(leaves, HashSet::from_iter([103, 104]));

    let inner = forest.node_by_uid(103).unwrap();
    let chain: Vec<u64> = forest.ancestors(inner).map(|n| n.uid()).collect();
    assert_eq!(chain, vec![102, 101, 100]);

    assert_eq!(
        forest.node_by_uid(101).unwrap().parallelism_type(),
        ParallelismType::Doall
    );
    assert_eq!(
        forest.node_by_uid(102).unwrap().parallelism_type(),
        ParallelismType::Tlp
    );
    assert_eq!(inner.parallelism_type(), ParallelismType::Ilp);

    // 103: coverage 45%, self-parallelism 3
    assert!((forest.time_reduction(inner) - 30.0).abs() < 1e-9);
    let above: Vec<u64> = forest.nodes_above(25.0).map(|n| n.uid()).collect();
    assert_eq!(above, vec![101, 103]);
}

#[test]
fn test_call_context_and_counts() {
    let forest = RegionForest::build(&table(), program()).unwrap();
    let inner = forest.node_by_uid(103).unwrap();

    let frames: Vec<String> = forest
        .call_context(inner)
        .iter()
        .map(|f| f.to_string())
        .collect();
    assert_eq!(frames.len(), 2);
    assert!(frames[1].contains("sweep"), "{}", frames[1]);
    assert!(frames[1].contains("line 25"), "{}", frames[1]);

    let counts = forest.region_counts();
    assert_eq!(counts.total, 5);
    assert_eq!(counts.loops, 3);
    assert_eq!(counts.functions, 2);
    assert_eq!(counts.bodies, 0);
}

#[test]
fn test_forest_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RegionForest>();
}
