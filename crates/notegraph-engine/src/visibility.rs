use notegraph_core::GraphConfig;

use crate::store::VisualStateStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    pub node: Vec<bool>,
    pub edge: Vec<bool>,
}

/// Resolve layer/note-type filters into node and edge visibility masks.
///
/// Content nodes (notes, kanji) are visible when their note type is not
/// hidden. Connector nodes (family hubs, note-type hubs, kanji hubs) carry no
/// content and become visible only when a visible edge ties them to an
/// already-visible node. Support propagates in exactly two passes, not to a
/// fixed point: a hub more than two hops from the nearest content node stays
/// hidden.
pub fn resolve(store: &VisualStateStore, config: &GraphConfig) -> Visibility {
    let e = store.edge_count();

    let mut node: Vec<bool> = store
        .nodes
        .iter()
        .map(|record| {
            if record.kind.is_connector() {
                false
            } else {
                config.note_type_visible(&record.note_type)
            }
        })
        .collect();

    for _ in 0..2 {
        // Support is read from the start-of-pass mask so one pass moves
        // support exactly one hop, independent of edge order.
        let before = node.clone();
        let mut gained = false;
        for rendered in &store.rendered {
            if !config.layer_enabled(&rendered.layer) {
                continue;
            }
            for (this, other) in [
                (rendered.source, rendered.target),
                (rendered.target, rendered.source),
            ] {
                if !node[this] && before[other] && store.nodes[this].kind.is_connector() {
                    node[this] = true;
                    gained = true;
                }
            }
        }
        if !gained {
            break;
        }
    }

    let mut edge = vec![false; e];
    for (ei, rendered) in store.rendered.iter().enumerate() {
        edge[ei] =
            config.layer_enabled(&rendered.layer) && node[rendered.source] && node[rendered.target];
    }

    Visibility { node, edge }
}
