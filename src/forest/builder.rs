//! Construction of a [`RegionForest`] from decoded trace records.
//!
//! Steps, in order: index records by uid, classify recursive nodes, create one
//! arena node per record, link parents through child references, find the
//! single root, resolve recursion targets, propagate recursion weights and
//! finally compute each node's self-parallelism. Any structural violation
//! aborts the build.

use super::node::{NodeId, NodeStats, RegionNode};
use super::recursion::{apply_recursion_weights, classify_recursion, compute_recursion_weights};
use super::RegionForest;
use crate::core::error::{PlanError, PlanResult};
use crate::regions::StaticRegionTable;
use crate::trace::{DecodedRecord, NodeKind};
use hashbrown::HashMap;

pub(super) fn build(
    table: &StaticRegionTable,
    mut records: Vec<DecodedRecord>,
) -> PlanResult<RegionForest> {
    let index = index_records(&records)?;
    classify_recursion(&mut records, &index)?;

    let mut nodes = records
        .iter()
        .enumerate()
        .map(|(pos, record)| create_node(table, NodeId(pos as u32), record))
        .collect::<PlanResult<Vec<_>>>()?;

    link_parents(&mut nodes, &records, &index)?;
    let root = find_root(&nodes)?;
    check_reachable(&nodes, root)?;
    resolve_recursion_targets(&mut nodes, &records, &index)?;

    let weights = compute_recursion_weights(&nodes)?;
    apply_recursion_weights(&mut nodes, &weights);

    for node in &mut nodes {
        node.finalize_self_parallelism()?;
    }

    let mut by_uid = HashMap::with_capacity(nodes.len());
    let mut by_region: HashMap<u64, Vec<NodeId>> = HashMap::new();
    for node in &nodes {
        by_uid.insert(node.uid, node.id);
        by_region.entry(node.region.id).or_default().push(node.id);
    }

    log::info!(
        "Built region tree: {} nodes, root {}, {} recursion weights",
        nodes.len(),
        nodes[root.index()].uid,
        weights.len()
    );

    Ok(RegionForest {
        nodes,
        root,
        by_uid,
        by_region,
    })
}

fn index_records(records: &[DecodedRecord]) -> PlanResult<HashMap<u64, usize>> {
    let mut index = HashMap::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        if index.insert(record.uid, pos).is_some() {
            return Err(PlanError::DuplicateUid { uid: record.uid });
        }
    }
    Ok(index)
}

fn create_node(
    table: &StaticRegionTable,
    id: NodeId,
    record: &DecodedRecord,
) -> PlanResult<RegionNode> {
    let region = table.get(record.static_region_id)?.clone();
    let call_site = match record.call_site_id {
        0 => None,
        site => Some(table.call_site(site)?.clone()),
    };

    let stats = match record.stats.as_slice() {
        [] => return Err(PlanError::MissingStatistics { uid: record.uid }),
        [single] if !record.kind.is_recursive() => NodeStats::Plain(single.clone()),
        many => NodeStats::Recursive(many.to_vec()),
    };

    Ok(RegionNode {
        id,
        uid: record.uid,
        region,
        call_site,
        kind: record.kind,
        instance_count: record.instance_count,
        parallel_bit: record.parallel_bit,
        parent: None,
        children: Vec::with_capacity(record.child_uids.len()),
        stats,
        recursion_target: None,
        self_parallelism: 1.0,
    })
}

fn link_parents(
    nodes: &mut [RegionNode],
    records: &[DecodedRecord],
    index: &HashMap<u64, usize>,
) -> PlanResult<()> {
    for (pos, record) in records.iter().enumerate() {
        for &child_uid in &record.child_uids {
            let child_pos = *index
                .get(&child_uid)
                .ok_or(PlanError::DanglingChildReference {
                    parent: record.uid,
                    child: child_uid,
                })?;

            if let Some(existing) = nodes[child_pos].parent {
                return Err(PlanError::DuplicateParent {
                    child: child_uid,
                    first: nodes[existing.index()].uid,
                    second: record.uid,
                });
            }

            let parent_id = nodes[pos].id;
            let child_id = nodes[child_pos].id;
            nodes[child_pos].parent = Some(parent_id);
            nodes[pos].children.push(child_id);
        }
    }
    Ok(())
}

fn find_root(nodes: &[RegionNode]) -> PlanResult<NodeId> {
    let roots: Vec<&RegionNode> = nodes.iter().filter(|n| n.parent.is_none()).collect();
    match roots.as_slice() {
        [] => Err(PlanError::NoRoot),
        [root] => Ok(root.id),
        many => {
            let mut uids: Vec<u64> = many.iter().map(|n| n.uid).collect();
            uids.sort_unstable();
            Err(PlanError::MultipleRoots { roots: uids })
        }
    }
}

/// With one parent per node, anything not reachable from the root sits on a cycle.
fn check_reachable(nodes: &[RegionNode], root: NodeId) -> PlanResult<()> {
    let mut seen = vec![false; nodes.len()];
    let mut stack = vec![root];
    let mut reached = 0;

    while let Some(current) = stack.pop() {
        if std::mem::replace(&mut seen[current.index()], true) {
            continue;
        }
        reached += 1;
        stack.extend_from_slice(&nodes[current.index()].children);
    }

    if reached != nodes.len() {
        return Err(PlanError::UnreachableNodes {
            count: nodes.len() - reached,
        });
    }
    Ok(())
}

fn resolve_recursion_targets(
    nodes: &mut [RegionNode],
    records: &[DecodedRecord],
    index: &HashMap<u64, usize>,
) -> PlanResult<()> {
    for (pos, record) in records.iter().enumerate() {
        if record.kind != NodeKind::RecursionSink {
            continue;
        }

        let target = record.recursion_target_uid;
        let invalid = PlanError::InvalidRecursionTarget {
            sink: record.uid,
            target,
        };
        let target_pos = *index.get(&target).ok_or(invalid)?;
        if nodes[target_pos].kind != NodeKind::RecursionInit {
            return Err(PlanError::InvalidRecursionTarget {
                sink: record.uid,
                target,
            });
        }
        nodes[pos].recursion_target = Some(nodes[target_pos].id);
    }
    Ok(())
}
