use std::collections::hash_map::Entry;
use std::collections::HashMap;

use notegraph_core::{EdgeRecord, NodeId};

use crate::store::RenderedEdge;

#[derive(Default)]
struct GroupAcc {
    first_real: Option<(usize, usize, String, Option<String>)>, // (source, target, key, fid)
    real_forward: bool,
    real_reverse: bool,
    flow_forward: bool,
    flow_reverse: bool,
    any_bidirectional: bool,
}

/// Collapse raw edge records into drawable edges. Records sharing an
/// unordered node pair and layer merge; when both directions carry a real
/// record, or any record is marked bidirectional, the rendered edge is
/// bidirectional. flow_only records are never rendered themselves, they only
/// seed reverse particle motion when no real reverse record exists.
pub fn collapse_edges(
    index_by_node: &HashMap<NodeId, usize>,
    raw: &[EdgeRecord],
) -> Vec<RenderedEdge> {
    let mut order: Vec<(usize, usize, String)> = Vec::new();
    let mut groups: HashMap<(usize, usize, String), GroupAcc> = HashMap::new();

    for record in raw {
        let (Some(&s), Some(&t)) = (
            index_by_node.get(&record.source),
            index_by_node.get(&record.target),
        ) else {
            // Data may run ahead of the active set; unmapped endpoints are
            // not an error.
            tracing::debug!(
                source = %record.source.0,
                target = %record.target.0,
                layer = %record.layer,
                "skipping edge with unmapped endpoint"
            );
            continue;
        };

        let group_key = (s.min(t), s.max(t), record.layer.clone());
        let acc = match groups.entry(group_key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                order.push(entry.key().clone());
                entry.insert(GroupAcc::default())
            }
        };

        // Orientation relative to the (min, max) pair ordering.
        let forward = s <= t;
        if record.flow_only() {
            if forward {
                acc.flow_forward = true;
            } else {
                acc.flow_reverse = true;
            }
            continue;
        }

        if forward {
            acc.real_forward = true;
        } else {
            acc.real_reverse = true;
        }
        if record.bidirectional() {
            acc.any_bidirectional = true;
        }
        if acc.first_real.is_none() {
            acc.first_real = Some((
                s,
                t,
                record.stable_key(),
                record.fid().map(str::to_string),
            ));
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for group_key in order {
        let acc = &groups[&group_key];
        let Some((source, target, key, fid)) = acc.first_real.clone() else {
            continue; // flow_only records with no real counterpart
        };

        let self_loop = source == target;
        let bidirectional =
            acc.any_bidirectional || (!self_loop && acc.real_forward && acc.real_reverse);

        // Flow seeding against the representative direction.
        let rep_forward = source <= target;
        let (flow_opposite, real_opposite) = if rep_forward {
            (acc.flow_reverse, acc.real_reverse)
        } else {
            (acc.flow_forward, acc.real_forward)
        };
        let flow_reverse = !bidirectional && flow_opposite && !real_opposite;

        out.push(RenderedEdge {
            key,
            source,
            target,
            layer: group_key.2,
            fid,
            bidirectional,
            flow_reverse,
        });
    }
    out
}
