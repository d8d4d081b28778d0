use std::collections::{BTreeSet, VecDeque};

use crate::adjacency::AdjacencyTables;
use crate::store::VisualStateStore;

/// The emphasized node/edge subset driven by selection and context. Masks
/// answer membership; the ordered lists exist so successive focus states can
/// be diffed cheaply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusState {
    pub active: bool,
    pub node_mask: Vec<bool>,
    pub edge_mask: Vec<bool>,
    pub node_list: Vec<usize>,
    pub edge_list: Vec<usize>,
}

impl FocusState {
    pub fn cleared(node_count: usize, edge_count: usize) -> Self {
        Self {
            active: false,
            node_mask: vec![false; node_count],
            edge_mask: vec![false; edge_count],
            node_list: Vec::new(),
            edge_list: Vec::new(),
        }
    }

    fn mark_node(&mut self, index: usize) {
        if !self.node_mask[index] {
            self.node_mask[index] = true;
            self.node_list.push(index);
        }
    }

    fn mark_edge(&mut self, index: usize) {
        if !self.edge_mask[index] {
            self.edge_mask[index] = true;
            self.edge_list.push(index);
        }
    }
}

/// Compute the focus set for the given seed indices (selection ∪ context).
///
/// Per seed: the seed itself, every touching edge with both endpoints, then a
/// breadth-first expansion along family-relationship edges whose family id is
/// one of the seed's own family keys. A seed without family keys expands
/// along all family edges; a bare family hub has no key of its own to filter
/// by. Seeds are unioned.
pub fn compute(store: &VisualStateStore, tables: &AdjacencyTables, seeds: &[usize]) -> FocusState {
    let mut state = FocusState::cleared(store.node_count(), store.edge_count());
    if seeds.is_empty() {
        return state;
    }
    state.active = true;

    for &seed in seeds {
        if seed >= store.node_count() {
            tracing::debug!(seed, "skipping out-of-range focus seed");
            continue;
        }
        state.mark_node(seed);

        // Direct neighbors always join, regardless of layer.
        for &ei in &tables.touching[seed] {
            let ei = ei as usize;
            state.mark_edge(ei);
            state.mark_node(tables.source[ei] as usize);
            state.mark_node(tables.target[ei] as usize);
        }

        let keys: BTreeSet<&str> = store.nodes[seed]
            .families
            .keys()
            .map(String::as_str)
            .collect();

        let mut visited = vec![false; store.node_count()];
        visited[seed] = true;
        let mut queue = VecDeque::new();
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            for &ei in &tables.family_out[current] {
                let ei = ei as usize;
                let edge = &store.rendered[ei];
                if !keys.is_empty() {
                    match edge.fid.as_deref() {
                        Some(fid) if keys.contains(fid) => {}
                        _ => continue,
                    }
                }

                state.mark_edge(ei);
                state.mark_node(edge.source);
                state.mark_node(edge.target);

                let next = if edge.source == current {
                    edge.target
                } else {
                    edge.source
                };
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }

    state
}
