use notegraph_core::{
    EdgeRecord, GraphSnapshot, NodeId, NodeKind, NodeRecord, Rgba,
};
use serde_json::Value;

use crate::renderer::{Renderer, RendererCaps, Solver};

pub fn note(id: &str) -> NodeRecord {
    NodeRecord {
        id: NodeId(id.to_string()),
        label: id.to_string(),
        kind: NodeKind::Note,
        note_type: "basic".to_string(),
        layers: Default::default(),
        families: Default::default(),
        card_status: Vec::new(),
    }
}

pub fn hub(id: &str) -> NodeRecord {
    NodeRecord {
        kind: NodeKind::Family,
        ..note(id)
    }
}

pub fn family_note(id: &str, families: &[(&str, i64)]) -> NodeRecord {
    let mut record = note(id);
    record.families = families
        .iter()
        .map(|(fid, prio)| (fid.to_string(), *prio))
        .collect();
    record
}

pub fn edge(source: &str, target: &str, layer: &str, meta: Value) -> EdgeRecord {
    let Value::Object(meta) = meta else {
        panic!("meta must be a JSON object");
    };
    EdgeRecord {
        source: NodeId(source.to_string()),
        target: NodeId(target.to_string()),
        layer: layer.to_string(),
        meta,
    }
}

pub fn snapshot(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> GraphSnapshot {
    GraphSnapshot { nodes, edges }
}

/// Renderer double that records every buffer write.
pub struct StubRenderer {
    pub caps: RendererCaps,
    pub node_positions: Vec<f32>,
    pub node_colors: Vec<f32>,
    pub node_sizes: Vec<f32>,
    pub node_type_codes: Vec<u8>,
    pub link_colors: Vec<f32>,
    pub link_widths: Vec<f32>,
    pub link_style_codes: Vec<u8>,
    pub link_flow: Vec<bool>,
    pub link_bidirectional: Vec<bool>,
    pub full_node_style_writes: usize,
    pub full_link_style_writes: usize,
    pub node_patches: usize,
    pub link_patches: usize,
    pub fit_view_calls: usize,
    pub render_calls: usize,
}

impl Default for StubRenderer {
    fn default() -> Self {
        Self {
            caps: RendererCaps {
                node_patch: true,
                link_patch: true,
                flow: true,
                fit_view: true,
            },
            node_positions: Vec::new(),
            node_colors: Vec::new(),
            node_sizes: Vec::new(),
            node_type_codes: Vec::new(),
            link_colors: Vec::new(),
            link_widths: Vec::new(),
            link_style_codes: Vec::new(),
            link_flow: Vec::new(),
            link_bidirectional: Vec::new(),
            full_node_style_writes: 0,
            full_link_style_writes: 0,
            node_patches: 0,
            link_patches: 0,
            fit_view_calls: 0,
            render_calls: 0,
        }
    }
}

impl StubRenderer {
    pub fn without_patch_support() -> Self {
        Self {
            caps: RendererCaps {
                node_patch: false,
                link_patch: false,
                flow: true,
                fit_view: true,
            },
            ..Default::default()
        }
    }

    pub fn style_write_count(&self) -> usize {
        self.full_node_style_writes
            + self.full_link_style_writes
            + self.node_patches
            + self.link_patches
    }
}

impl Renderer for StubRenderer {
    fn caps(&self) -> RendererCaps {
        self.caps
    }

    fn set_node_positions(&mut self, xy: &[f32]) {
        self.node_positions = xy.to_vec();
    }
    fn set_node_colors(&mut self, rgba: &[f32]) {
        self.node_colors = rgba.to_vec();
        self.full_node_style_writes += 1;
    }
    fn set_node_sizes(&mut self, sizes: &[f32]) {
        self.node_sizes = sizes.to_vec();
    }
    fn set_node_type_codes(&mut self, codes: &[u8]) {
        self.node_type_codes = codes.to_vec();
    }

    fn set_link_colors(&mut self, rgba: &[f32]) {
        self.link_colors = rgba.to_vec();
        self.full_link_style_writes += 1;
    }
    fn set_link_widths(&mut self, widths: &[f32]) {
        self.link_widths = widths.to_vec();
    }
    fn set_link_style_codes(&mut self, codes: &[u8]) {
        self.link_style_codes = codes.to_vec();
    }
    fn set_link_flow_mask(&mut self, flow: &[bool]) {
        self.link_flow = flow.to_vec();
    }
    fn set_link_bidirectional_mask(&mut self, bidirectional: &[bool]) {
        self.link_bidirectional = bidirectional.to_vec();
    }

    fn patch_node_style(&mut self, index: usize, color: Rgba, size: f32) {
        if self.node_colors.len() >= (index + 1) * 4 {
            self.node_colors[index * 4..index * 4 + 4].copy_from_slice(&color);
        }
        if self.node_sizes.len() > index {
            self.node_sizes[index] = size;
        }
        self.node_patches += 1;
    }

    fn patch_link_style(&mut self, index: usize, color: Rgba, width: f32, flow: bool) {
        if self.link_colors.len() >= (index + 1) * 4 {
            self.link_colors[index * 4..index * 4 + 4].copy_from_slice(&color);
        }
        if self.link_widths.len() > index {
            self.link_widths[index] = width;
        }
        if self.link_flow.len() > index {
            self.link_flow[index] = flow;
        }
        self.link_patches += 1;
    }

    fn space_to_screen(&self, xy: [f32; 2]) -> [f32; 2] {
        xy
    }
    fn screen_to_space(&self, xy: [f32; 2]) -> [f32; 2] {
        xy
    }
    fn node_screen_radius(&self, index: usize) -> f32 {
        self.node_sizes.get(index).copied().unwrap_or(4.0).max(1.0)
    }

    fn fit_view(&mut self) {
        self.fit_view_calls += 1;
    }
    fn render(&mut self, _alpha: f32) {
        self.render_calls += 1;
    }
}

/// Solver double recording lifecycle calls and pushed edge parameters.
pub struct StubSolver {
    pub distances: Vec<f32>,
    pub strengths: Vec<f32>,
    pub positions: Vec<f32>,
    pub running: bool,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub reheat_calls: usize,
    pub pulled: Vec<usize>,
}

impl Default for StubSolver {
    fn default() -> Self {
        Self {
            distances: Vec::new(),
            strengths: Vec::new(),
            positions: Vec::new(),
            running: false,
            start_calls: 0,
            stop_calls: 0,
            reheat_calls: 0,
            pulled: Vec::new(),
        }
    }
}

impl Solver for StubSolver {
    fn start(&mut self, _alpha: f32) {
        self.running = true;
        self.start_calls += 1;
    }
    fn stop(&mut self, _keep_state: bool) {
        self.running = false;
        self.stop_calls += 1;
    }
    fn reheat(&mut self, _alpha: f32) {
        self.running = true;
        self.reheat_calls += 1;
    }

    fn default_link_distance(&self) -> f32 {
        100.0
    }
    fn default_link_strength(&self) -> f32 {
        1.0
    }
    fn set_link_distances(&mut self, distances: &[f32]) {
        self.distances = distances.to_vec();
    }
    fn set_link_strengths(&mut self, strengths: &[f32]) {
        self.strengths = strengths.to_vec();
    }

    fn pull_nodes(&mut self, indices: &[usize], _alpha: f32) {
        self.pulled.extend_from_slice(indices);
    }

    fn positions(&self) -> &[f32] {
        &self.positions
    }
}
