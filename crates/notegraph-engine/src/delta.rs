use std::collections::HashMap;

use anyhow::{bail, Result};
use notegraph_core::{DeltaOp, NodeId};

use crate::store::VisualStateStore;

/// Counters for one delta application, logged and returned to the caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    pub nodes_dropped: usize,
    pub edges_dropped: usize,
    pub nodes_added: usize,
    pub nodes_updated: usize,
    pub edges_upserted: usize,
    pub skipped: usize,
    /// Ids added by this batch; the engine pulls these through the solver so
    /// they settle without reheating the whole layout.
    pub added_ids: Vec<NodeId>,
}

/// Apply structural operations to the live store without a teardown.
///
/// Node positions are captured by id up front and restored after the rebuild,
/// so surviving nodes stay put; fresh nodes get a deterministic seed
/// placement. Unknown ids are skipped (data can run ahead of filter state).
/// An edge-upsert whose key is already bound to different endpoints is a
/// fatal consistency violation: the batch stops there, with the structure
/// rebuilt from whatever was applied before the bad op.
pub fn apply_ops(
    store: &mut VisualStateStore,
    ops: &[DeltaOp],
    preserve_motion: bool,
) -> Result<DeltaReport> {
    let mut positions: HashMap<NodeId, [f32; 2]> = HashMap::with_capacity(store.node_count());
    for (id, &i) in &store.index_by_node {
        positions.insert(id.clone(), store.node_position(i));
    }

    let mut index: HashMap<NodeId, usize> = store.index_by_node.clone();
    let result = run_ops(store, ops, preserve_motion, &mut index, &mut positions);
    let report = match result {
        Ok(report) => report,
        Err(err) => {
            finish(store, &positions);
            return Err(err);
        }
    };

    finish(store, &positions);
    tracing::debug!(
        nodes_dropped = report.nodes_dropped,
        edges_dropped = report.edges_dropped,
        nodes_added = report.nodes_added,
        nodes_updated = report.nodes_updated,
        edges_upserted = report.edges_upserted,
        skipped = report.skipped,
        "delta applied"
    );
    Ok(report)
}

fn run_ops(
    store: &mut VisualStateStore,
    ops: &[DeltaOp],
    preserve_motion: bool,
    index: &mut HashMap<NodeId, usize>,
    positions: &mut HashMap<NodeId, [f32; 2]>,
) -> Result<DeltaReport> {
    let mut report = DeltaReport::default();

    for op in ops {
        match op {
            DeltaOp::NodeDrop { id } => {
                let Some(i) = index.remove(id) else {
                    tracing::debug!(id = %id.0, "node_drop for unknown id");
                    report.skipped += 1;
                    continue;
                };
                store.nodes.remove(i);
                for slot in index.values_mut() {
                    if *slot > i {
                        *slot -= 1;
                    }
                }
                positions.remove(id);
                report.nodes_dropped += 1;
            }
            DeltaOp::EdgeDrop { key } => {
                if store.remove_raw_edge(key) {
                    report.edges_dropped += 1;
                } else {
                    tracing::debug!(key = %key, "edge_drop for unknown key");
                    report.skipped += 1;
                }
            }
            DeltaOp::NodeAdd { node } => match index.get(&node.id) {
                Some(&i) => {
                    store.nodes[i] = node.clone();
                    report.nodes_updated += 1;
                }
                None => {
                    index.insert(node.id.clone(), store.nodes.len());
                    report.added_ids.push(node.id.clone());
                    store.nodes.push(node.clone());
                    report.nodes_added += 1;
                }
            },
            DeltaOp::NodeUpdate { node } => {
                let Some(&i) = index.get(&node.id) else {
                    tracing::debug!(id = %node.id.0, "node_update for unknown id");
                    report.skipped += 1;
                    continue;
                };
                store.nodes[i] = node.clone();
                if !preserve_motion {
                    positions.remove(&node.id);
                }
                report.nodes_updated += 1;
            }
            DeltaOp::EdgeUpsert { edge, key } => {
                let key = key.clone().unwrap_or_else(|| edge.stable_key());
                match store.raw_index_by_key.get(&key) {
                    Some(&i) => {
                        let existing = &store.raw_edges[i];
                        if existing.source != edge.source || existing.target != edge.target {
                            bail!(
                                "delta edge key collision: key {key:?} is bound to \
                                 {}->{} and cannot rebind to {}->{}",
                                existing.source.0,
                                existing.target.0,
                                edge.source.0,
                                edge.target.0
                            );
                        }
                        store.raw_edges[i] = edge.clone();
                    }
                    None => {
                        store.raw_index_by_key.insert(key, store.raw_edges.len());
                        store.raw_edges.push(edge.clone());
                    }
                }
                report.edges_upserted += 1;
            }
        }
    }

    Ok(report)
}

fn finish(store: &mut VisualStateStore, positions: &HashMap<NodeId, [f32; 2]>) {
    store.rebuild_structure();
    let total = store.node_count();
    for i in 0..total {
        let id = store.nodes[i].id.clone();
        let xy = positions
            .get(&id)
            .copied()
            .unwrap_or_else(|| VisualStateStore::seed_position(i, total));
        store.set_node_position(i, xy);
    }
}
