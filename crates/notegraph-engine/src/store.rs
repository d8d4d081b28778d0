use std::collections::HashMap;

use notegraph_core::{EdgeRecord, GraphSnapshot, NodeId, NodeKind, NodeRecord};

use crate::collapse;

/// One drawable edge after collapsing; raw records sharing an unordered pair
/// and layer may merge into a single rendered edge.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEdge {
    pub key: String,
    pub source: usize,
    pub target: usize,
    pub layer: String,
    pub fid: Option<String>,
    pub bidirectional: bool,
    /// A flow_only counterpart exists against the rendered direction and no
    /// real reverse edge does; particles may run backwards along this edge.
    pub flow_reverse: bool,
}

#[derive(Debug, Default)]
pub struct NodeBuffers {
    pub position: Vec<f32>, // xy interleaved
    pub base_color: Vec<f32>,
    pub color: Vec<f32>,
    pub base_size: Vec<f32>,
    pub size: Vec<f32>,
    pub type_code: Vec<u8>,
    pub visible: Vec<bool>,
}

#[derive(Debug, Default)]
pub struct EdgeBuffers {
    pub base_color: Vec<f32>,
    pub color: Vec<f32>,
    pub width: Vec<f32>,
    pub style_code: Vec<u8>,
    pub distance: Vec<f32>,
    pub strength: Vec<f32>,
    pub base_flow: Vec<bool>,
    pub flow: Vec<bool>,
    pub bidirectional: Vec<bool>,
    pub visible: Vec<bool>,
}

/// Flat visual state for the active node/edge set. Exclusively owned by the
/// synchronization path; buffers are resized on structural change and reused
/// otherwise.
#[derive(Debug, Default)]
pub struct VisualStateStore {
    pub nodes: Vec<NodeRecord>,
    pub raw_edges: Vec<EdgeRecord>,
    pub raw_index_by_key: HashMap<String, usize>,
    pub rendered: Vec<RenderedEdge>,

    pub index_by_node: HashMap<NodeId, usize>,
    pub index_by_edge_key: HashMap<String, usize>,

    pub node_buf: NodeBuffers,
    pub edge_buf: EdgeBuffers,

    /// Bumped on every structural rebuild; consumers holding derived tables
    /// compare epochs instead of chasing reference identity.
    pub epoch: u64,
}

impl VisualStateStore {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.rendered.len()
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.index_by_node.get(id).copied()
    }

    pub fn node_position(&self, index: usize) -> [f32; 2] {
        [
            self.node_buf.position[index * 2],
            self.node_buf.position[index * 2 + 1],
        ]
    }

    pub fn set_node_position(&mut self, index: usize, xy: [f32; 2]) {
        self.node_buf.position[index * 2] = xy[0];
        self.node_buf.position[index * 2 + 1] = xy[1];
    }

    /// Wholesale replacement from a fresh data snapshot. Duplicate edge keys
    /// collapse to the last record seen.
    pub fn load_snapshot(&mut self, snapshot: GraphSnapshot) {
        self.nodes = snapshot.nodes;
        self.raw_edges.clear();
        self.raw_index_by_key.clear();
        for edge in snapshot.edges {
            self.insert_raw_edge(edge);
        }
        self.rebuild_structure();
    }

    pub fn insert_raw_edge(&mut self, edge: EdgeRecord) {
        let key = edge.stable_key();
        match self.raw_index_by_key.get(&key) {
            Some(&i) => self.raw_edges[i] = edge,
            None => {
                self.raw_index_by_key.insert(key, self.raw_edges.len());
                self.raw_edges.push(edge);
            }
        }
    }

    pub fn remove_raw_edge(&mut self, key: &str) -> bool {
        let Some(index) = self.raw_index_by_key.remove(key) else {
            return false;
        };
        self.raw_edges.remove(index);
        for slot in self.raw_index_by_key.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        true
    }

    /// Rebuild index maps, rendered edges and buffer extents after any change
    /// to the active node/edge set. Positions of surviving nodes are the
    /// caller's concern (captured by id and restored around this call).
    pub fn rebuild_structure(&mut self) {
        self.index_by_node.clear();
        for (i, node) in self.nodes.iter().enumerate() {
            self.index_by_node.insert(node.id.clone(), i);
        }

        self.rendered = collapse::collapse_edges(&self.index_by_node, &self.raw_edges);
        self.index_by_edge_key.clear();
        for (i, edge) in self.rendered.iter().enumerate() {
            self.index_by_edge_key.insert(edge.key.clone(), i);
        }

        self.resize_buffers();
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn resize_buffers(&mut self) {
        let n = self.nodes.len();
        let e = self.rendered.len();

        self.node_buf.position.resize(n * 2, 0.0);
        self.node_buf.base_color.resize(n * 4, 0.0);
        self.node_buf.color.resize(n * 4, 0.0);
        self.node_buf.base_size.resize(n, 0.0);
        self.node_buf.size.resize(n, 0.0);
        self.node_buf.type_code.resize(n, 0);
        self.node_buf.visible.resize(n, true);

        self.edge_buf.base_color.resize(e * 4, 0.0);
        self.edge_buf.color.resize(e * 4, 0.0);
        self.edge_buf.width.resize(e, 1.0);
        self.edge_buf.style_code.resize(e, 0);
        self.edge_buf.distance.resize(e, 0.0);
        self.edge_buf.strength.resize(e, 0.0);
        self.edge_buf.base_flow.resize(e, false);
        self.edge_buf.flow.resize(e, false);
        self.edge_buf.bidirectional.resize(e, false);
        self.edge_buf.visible.resize(e, true);
    }

    /// Deterministic initial placement for nodes with no prior position; the
    /// solver takes over from here.
    pub fn seed_position(index: usize, total: usize) -> [f32; 2] {
        let n = total.max(1) as f32;
        let t = (index as f32) / n * std::f32::consts::TAU;
        let r = 40.0 + n.sqrt() * 6.0;
        [r * t.cos(), r * t.sin()]
    }

    pub fn type_code_for(kind: NodeKind) -> u8 {
        match kind {
            NodeKind::Note => 0,
            NodeKind::Family => 1,
            NodeKind::NoteTypeHub => 2,
            NodeKind::Kanji => 3,
            NodeKind::KanjiHub => 4,
        }
    }
}
