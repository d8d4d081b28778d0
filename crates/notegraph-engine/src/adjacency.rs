use smallvec::SmallVec;

use crate::store::VisualStateStore;

#[derive(Debug, Default, Clone)]
pub struct AdjacencyTables {
    /// Per node: indices of every rendered edge touching it.
    pub touching: Vec<SmallVec<[u32; 8]>>,
    /// Per node: indices of family-relationship edges leaving it
    /// (bidirectional family edges appear at both endpoints).
    pub family_out: Vec<SmallVec<[u32; 4]>>,
    /// Parallel resolved endpoint arrays for every rendered edge.
    pub source: Vec<u32>,
    pub target: Vec<u32>,
}

/// Lazily rebuilt adjacency over the active set. Validity is keyed to the
/// store's structure epoch plus node/edge counts; any mismatch triggers a
/// rebuild on the next `get`.
#[derive(Debug, Default)]
pub struct AdjacencyCache {
    tables: AdjacencyTables,
    built_epoch: Option<u64>,
    node_count: usize,
    edge_count: usize,
}

impl AdjacencyCache {
    pub fn invalidate(&mut self) {
        self.built_epoch = None;
    }

    pub fn get(&mut self, store: &VisualStateStore) -> &AdjacencyTables {
        let fresh = self.built_epoch == Some(store.epoch)
            && self.node_count == store.node_count()
            && self.edge_count == store.edge_count();
        if !fresh {
            self.rebuild(store);
        }
        &self.tables
    }

    fn rebuild(&mut self, store: &VisualStateStore) {
        let n = store.node_count();
        let e = store.edge_count();

        self.tables.touching.clear();
        self.tables.touching.resize(n, SmallVec::new());
        self.tables.family_out.clear();
        self.tables.family_out.resize(n, SmallVec::new());
        self.tables.source.clear();
        self.tables.target.clear();
        self.tables.source.reserve(e);
        self.tables.target.reserve(e);

        for (ei, edge) in store.rendered.iter().enumerate() {
            let (s, t) = (edge.source, edge.target);
            self.tables.source.push(s as u32);
            self.tables.target.push(t as u32);
            if s >= n || t >= n {
                continue; // stale index; skipped, not fatal
            }

            self.tables.touching[s].push(ei as u32);
            if t != s {
                self.tables.touching[t].push(ei as u32);
            }

            if notegraph_core::is_family_layer(&edge.layer) {
                self.tables.family_out[s].push(ei as u32);
                if edge.bidirectional && t != s {
                    self.tables.family_out[t].push(ei as u32);
                }
            }
        }

        self.built_epoch = Some(store.epoch);
        self.node_count = n;
        self.edge_count = e;
        tracing::debug!(nodes = n, edges = e, "adjacency rebuilt");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{edge, note, snapshot};
    use serde_json::json;

    fn store_of(edges: Vec<notegraph_core::EdgeRecord>) -> VisualStateStore {
        let mut store = VisualStateStore::default();
        store.load_snapshot(snapshot(vec![note("a"), note("b"), note("c")], edges));
        store
    }

    #[test]
    fn touching_lists_cover_both_endpoints() {
        let store = store_of(vec![
            edge("a", "b", "examples", json!({})),
            edge("b", "c", "examples", json!({})),
        ]);
        let mut cache = AdjacencyCache::default();
        let tables = cache.get(&store);

        assert_eq!(tables.touching[0].as_slice(), &[0]);
        assert_eq!(tables.touching[1].as_slice(), &[0, 1]);
        assert_eq!(tables.touching[2].as_slice(), &[1]);
        assert_eq!(tables.source, vec![0, 1]);
        assert_eq!(tables.target, vec![1, 2]);
    }

    #[test]
    fn family_edges_are_outgoing_only_unless_bidirectional() {
        let store = store_of(vec![
            edge("a", "b", "priority", json!({"fid": "F1"})),
            edge("b", "c", "family", json!({"fid": "F2", "bidirectional": true})),
            edge("a", "c", "examples", json!({})),
        ]);
        let mut cache = AdjacencyCache::default();
        let tables = cache.get(&store);

        assert_eq!(tables.family_out[0].as_slice(), &[0]);
        assert_eq!(tables.family_out[1].as_slice(), &[1]);
        assert_eq!(tables.family_out[2].as_slice(), &[1]);
    }

    #[test]
    fn cache_rebuilds_only_when_structure_changes() {
        let mut store = store_of(vec![edge("a", "b", "examples", json!({}))]);
        let mut cache = AdjacencyCache::default();
        cache.get(&store);
        let epoch = cache.built_epoch;

        cache.get(&store);
        assert_eq!(cache.built_epoch, epoch);

        store.insert_raw_edge(edge("b", "c", "examples", json!({})));
        store.rebuild_structure();
        cache.get(&store);
        assert_ne!(cache.built_epoch, epoch);
        assert_eq!(cache.tables.touching[2].len(), 1);
    }
}
