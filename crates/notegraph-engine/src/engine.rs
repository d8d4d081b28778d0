use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use notegraph_core::{DeltaOp, GraphConfig, GraphSnapshot, NodeId};

use crate::adjacency::AdjacencyCache;
use crate::anim::Animations;
use crate::delta;
use crate::focus::{self, FocusState};
use crate::interaction::{Interaction, InteractionEvent};
use crate::metric;
use crate::renderer::{Renderer, RendererCaps, Solver};
use crate::store::VisualStateStore;
use crate::style::{self, AppliedSnapshot, UpdatePlan};

#[derive(Debug, Clone, Copy)]
pub struct DeltaOptions {
    /// Keep on-screen position/velocity for updated nodes.
    pub preserve_motion: bool,
    pub reheat_alpha: f32,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self {
            preserve_motion: true,
            reheat_alpha: 0.3,
        }
    }
}

/// Fresh base-tier attributes accompanying a delta batch, covering the entire
/// resulting active set. The engine recomputes the base itself when these are
/// absent or don't match the post-delta extents.
#[derive(Debug, Default, Clone)]
pub struct BaseStyleBuffers {
    pub node_color: Vec<f32>,
    pub node_size: Vec<f32>,
    pub node_visible: Vec<bool>,
    pub edge_color: Vec<f32>,
    pub edge_width: Vec<f32>,
    pub edge_flow: Vec<bool>,
    pub edge_visible: Vec<bool>,
}

/// The synchronization engine: keeps the renderer's attribute buffers
/// consistent with solver positions, interaction state, filters and
/// structural deltas, writing as little as it can get away with.
pub struct GraphSync<R: Renderer, S: Solver> {
    renderer: R,
    solver: S,
    caps: RendererCaps,
    config: GraphConfig,
    store: VisualStateStore,
    adjacency: AdjacencyCache,
    interaction: Interaction,
    applied: Option<AppliedSnapshot>,
    base_dirty: bool,
    anims: Animations,
    solver_running: bool,
}

impl<R: Renderer, S: Solver> GraphSync<R, S> {
    pub fn new(renderer: R, solver: S, config: GraphConfig) -> Self {
        let caps = renderer.caps();
        Self {
            renderer,
            solver,
            caps,
            config,
            store: VisualStateStore::default(),
            adjacency: AdjacencyCache::default(),
            interaction: Interaction::Idle,
            applied: None,
            base_dirty: true,
            anims: Animations::default(),
            solver_running: false,
        }
    }

    pub fn store(&self) -> &VisualStateStore {
        &self.store
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GraphConfig) {
        self.config = config;
        self.base_dirty = true;
    }

    // ----- Full rebuild from a fresh snapshot -----
    pub fn apply_graph_data(&mut self, snapshot: GraphSnapshot, fit_view: bool) {
        self.solver.stop(true);
        self.solver_running = false;

        let mut kept: HashMap<NodeId, [f32; 2]> = HashMap::with_capacity(self.store.node_count());
        for (id, &i) in &self.store.index_by_node {
            kept.insert(id.clone(), self.store.node_position(i));
        }

        self.store.load_snapshot(snapshot);
        let total = self.store.node_count();
        for i in 0..total {
            let id = self.store.nodes[i].id.clone();
            let xy = kept
                .get(&id)
                .copied()
                .unwrap_or_else(|| VisualStateStore::seed_position(i, total));
            self.store.set_node_position(i, xy);
        }

        self.adjacency.invalidate();
        self.interaction = Interaction::Idle;
        self.anims.clear();
        style::refresh_base(&mut self.store, &self.config);
        self.push_structure();
        self.apply_physics_to_graph();

        self.solver.start(1.0);
        self.solver_running = true;
        if fit_view && self.caps.fit_view {
            self.renderer.fit_view();
        }

        self.applied = None;
        self.base_dirty = true;
        self.apply_visual_styles(None);

        tracing::info!(
            nodes = self.store.node_count(),
            edges = self.store.edge_count(),
            "graph data applied"
        );
    }

    // ----- Incremental structural update -----
    pub fn apply_graph_delta_ops(
        &mut self,
        ops: &[DeltaOp],
        buffers: Option<BaseStyleBuffers>,
        options: DeltaOptions,
    ) -> Result<()> {
        if ops.is_empty() && buffers.is_none() {
            return Ok(());
        }

        let selected_ids: Vec<NodeId> = self
            .interaction
            .selected()
            .iter()
            .filter_map(|&i| self.store.nodes.get(i).map(|n| n.id.clone()))
            .collect();
        let context_id = self
            .interaction
            .context()
            .and_then(|i| self.store.nodes.get(i).map(|n| n.id.clone()));
        let hover_id = self
            .interaction
            .hovered()
            .and_then(|i| self.store.nodes.get(i).map(|n| n.id.clone()));

        self.solver.stop(true);
        self.solver_running = false;

        let result = delta::apply_ops(&mut self.store, ops, options.preserve_motion);
        self.adjacency.invalidate();

        let adopted = match buffers {
            Some(fresh) => self.adopt_base_buffers(fresh),
            None => false,
        };
        if !adopted {
            style::refresh_base(&mut self.store, &self.config);
        }

        self.interaction =
            self.remap_interaction(&selected_ids, context_id.as_ref(), hover_id.as_ref());

        self.push_structure();
        self.apply_physics_to_graph();
        self.solver.reheat(options.reheat_alpha);
        self.solver_running = true;

        if let Ok(report) = &result {
            let fresh: Vec<usize> = report
                .added_ids
                .iter()
                .filter_map(|id| self.store.node_index(id))
                .collect();
            if !fresh.is_empty() {
                self.solver.pull_nodes(&fresh, 1.0);
            }
        }

        self.applied = None;
        self.base_dirty = true;
        self.apply_visual_styles(None);

        result.map(|_| ())
    }

    // ----- Interaction presentation -----
    pub fn apply_visual_styles(&mut self, render_alpha: Option<f32>) {
        let seeds = self.interaction.seeds();
        let selected = self.interaction.selected().to_vec();
        let context = self.interaction.context();
        let hovered = self.interaction.hovered();

        let tables = self.adjacency.get(&self.store);
        let focus = if seeds.is_empty() {
            FocusState::cleared(self.store.node_count(), self.store.edge_count())
        } else {
            focus::compute(&self.store, tables, &seeds)
        };
        let current = AppliedSnapshot {
            focus,
            selected,
            context,
            hovered,
        };

        let plan = style::plan_update(self.applied.as_ref(), &current, self.base_dirty, tables);
        let targets: Option<(Vec<usize>, Vec<usize>)> = match &plan {
            UpdatePlan::Noop => {
                self.applied = Some(current);
                if let Some(alpha) = render_alpha {
                    self.renderer.render(alpha);
                }
                return;
            }
            UpdatePlan::Full => None,
            UpdatePlan::HoverPatch { leave, enter } => {
                let mut nodes = BTreeSet::new();
                let mut edges = BTreeSet::new();
                for node in [*leave, *enter].into_iter().flatten() {
                    nodes.insert(node);
                    if let Some(touching) = tables.touching.get(node) {
                        edges.extend(touching.iter().map(|&ei| ei as usize));
                    }
                }
                Some((nodes.into_iter().collect(), edges.into_iter().collect()))
            }
            UpdatePlan::FocusPatch { nodes, edges } => Some((nodes.clone(), edges.clone())),
        };

        let (node_targets, edge_targets) = match &targets {
            Some((nodes, edges)) => (Some(nodes.as_slice()), Some(edges.as_slice())),
            None => (None, None),
        };
        let (restyled_nodes, restyled_edges) = style::restyle(
            &mut self.store,
            &current.focus,
            &current.selected,
            current.context,
            current.hovered,
            self.config.skip_focus_dim,
            node_targets,
            edge_targets,
        );
        self.push_styles(targets.is_none(), &restyled_nodes, &restyled_edges);

        self.applied = Some(current);
        self.base_dirty = false;
        if let Some(alpha) = render_alpha {
            self.renderer.render(alpha);
        }
    }

    // ----- Solver configuration -----
    pub fn apply_physics_to_graph(&mut self) {
        metric::apply_to_solver(&mut self.store, &self.config, &mut self.solver);
    }

    pub fn on_interaction(&mut self, event: InteractionEvent) {
        self.interaction = self.interaction.clone().apply(event);
        self.apply_visual_styles(None);
    }

    /// Copy solver positions into the store and renderer; called once per
    /// animation frame while the solver runs.
    pub fn sync_positions(&mut self) {
        let xy = self.solver.positions();
        if xy.len() == self.store.node_buf.position.len() {
            self.store.node_buf.position.copy_from_slice(xy);
        } else if !xy.is_empty() {
            tracing::debug!(
                solver = xy.len(),
                store = self.store.node_buf.position.len(),
                "solver position extent mismatch"
            );
        }
        self.renderer.set_node_positions(&self.store.node_buf.position);
    }

    pub fn solver_running(&self) -> bool {
        self.solver_running
    }

    /// Hit-test a screen point against visible nodes using the renderer's
    /// projection and per-point screen radius.
    pub fn node_at_screen(&self, screen: [f32; 2]) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..self.store.node_count() {
            if !self.store.node_buf.visible[i] {
                continue;
            }
            let p = self.renderer.space_to_screen(self.store.node_position(i));
            let dx = p[0] - screen[0];
            let dy = p[1] - screen[1];
            let d2 = dx * dx + dy * dy;
            let r = self.renderer.node_screen_radius(i);
            if d2 <= r * r && best.map_or(true, |(_, bd)| d2 < bd) {
                best = Some((i, d2));
            }
        }
        best.map(|(i, _)| i)
    }

    // ----- Animations -----
    pub fn pulse_node_size(&mut self, node: usize, target_scale: f32, duration: f32) {
        if node >= self.store.node_count() {
            return;
        }
        let scale = if target_scale.is_finite() && target_scale > 0.0 {
            target_scale
        } else {
            1.0
        };
        let from = self.store.node_buf.size[node];
        let to = self.store.node_buf.base_size[node] * scale;
        self.anims.pulse_node(node, from, to, duration);
    }

    pub fn request_edge_flow(&mut self, edge: usize, flow: bool) {
        if edge < self.store.edge_count() {
            self.anims.request_flow(edge, flow);
        }
    }

    pub fn advance_animations(&mut self, dt: f32) {
        let frame = self.anims.advance(dt);
        if frame.is_empty() {
            return;
        }
        let mut nodes = Vec::with_capacity(frame.node_sizes.len());
        for (i, size) in frame.node_sizes {
            if i < self.store.node_count() {
                self.store.node_buf.size[i] = size.max(0.0);
                nodes.push(i);
            }
        }
        let mut edges = Vec::with_capacity(frame.edge_flow.len());
        for (ei, flow) in frame.edge_flow {
            if ei < self.store.edge_count() {
                self.store.edge_buf.flow[ei] = flow;
                edges.push(ei);
            }
        }
        self.push_styles(false, &nodes, &edges);
    }

    // ----- Renderer plumbing -----
    fn push_structure(&mut self) {
        self.renderer.set_node_positions(&self.store.node_buf.position);
        self.renderer.set_node_type_codes(&self.store.node_buf.type_code);
        self.renderer.set_link_style_codes(&self.store.edge_buf.style_code);
        self.renderer
            .set_link_bidirectional_mask(&self.store.edge_buf.bidirectional);
    }

    fn push_styles(&mut self, full: bool, nodes: &[usize], edges: &[usize]) {
        if full {
            self.renderer.set_node_colors(&self.store.node_buf.color);
            self.renderer.set_node_sizes(&self.store.node_buf.size);
            self.renderer.set_link_colors(&self.store.edge_buf.color);
            self.renderer.set_link_widths(&self.store.edge_buf.width);
            if self.caps.flow {
                self.renderer.set_link_flow_mask(&self.store.edge_buf.flow);
            }
            return;
        }

        if nodes.is_empty() && edges.is_empty() {
            return;
        }

        if self.caps.node_patch {
            for &i in nodes {
                let color = self.store.node_buf.color[i * 4..i * 4 + 4]
                    .try_into()
                    .unwrap();
                self.renderer
                    .patch_node_style(i, color, self.store.node_buf.size[i]);
            }
        } else if !nodes.is_empty() {
            self.renderer.set_node_colors(&self.store.node_buf.color);
            self.renderer.set_node_sizes(&self.store.node_buf.size);
        }

        if self.caps.link_patch {
            for &ei in edges {
                let color = self.store.edge_buf.color[ei * 4..ei * 4 + 4]
                    .try_into()
                    .unwrap();
                self.renderer.patch_link_style(
                    ei,
                    color,
                    self.store.edge_buf.width[ei],
                    self.store.edge_buf.flow[ei],
                );
            }
        } else if !edges.is_empty() {
            self.renderer.set_link_colors(&self.store.edge_buf.color);
            self.renderer.set_link_widths(&self.store.edge_buf.width);
            if self.caps.flow {
                self.renderer.set_link_flow_mask(&self.store.edge_buf.flow);
            }
        }
    }

    fn adopt_base_buffers(&mut self, fresh: BaseStyleBuffers) -> bool {
        let n = self.store.node_count();
        let e = self.store.edge_count();
        let fits = fresh.node_color.len() == n * 4
            && fresh.node_size.len() == n
            && fresh.node_visible.len() == n
            && fresh.edge_color.len() == e * 4
            && fresh.edge_width.len() == e
            && fresh.edge_flow.len() == e
            && fresh.edge_visible.len() == e;
        if !fits {
            tracing::debug!(
                nodes = n,
                edges = e,
                "delta buffers don't match the resulting active set; recomputing base"
            );
            return false;
        }

        self.store.node_buf.base_color = fresh
            .node_color
            .iter()
            .map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 })
            .collect();
        self.store.node_buf.base_size = fresh
            .node_size
            .iter()
            .map(|s| if s.is_finite() { s.max(0.0) } else { 0.0 })
            .collect();
        self.store.node_buf.visible = fresh.node_visible;
        self.store.edge_buf.base_color = fresh
            .edge_color
            .iter()
            .map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 })
            .collect();
        self.store.edge_buf.width = fresh
            .edge_width
            .iter()
            .map(|w| if w.is_finite() { w.max(0.0) } else { 1.0 })
            .collect();
        self.store.edge_buf.base_flow = fresh.edge_flow;
        self.store.edge_buf.visible = fresh.edge_visible;

        // Codes and masks not carried by delta buffers still derive from the
        // records and layer configuration.
        for i in 0..n {
            self.store.node_buf.type_code[i] =
                VisualStateStore::type_code_for(self.store.nodes[i].kind);
        }
        for ei in 0..e {
            let layer = self.config.layer_style(&self.store.rendered[ei].layer);
            self.store.edge_buf.style_code[ei] = layer.line_style.code();
            self.store.edge_buf.bidirectional[ei] = self.store.rendered[ei].bidirectional;
        }
        true
    }

    fn remap_interaction(
        &self,
        selected: &[NodeId],
        context: Option<&NodeId>,
        hover: Option<&NodeId>,
    ) -> Interaction {
        let selection: Vec<usize> = selected
            .iter()
            .filter_map(|id| self.store.node_index(id))
            .collect();
        let context = context.and_then(|id| self.store.node_index(id));
        let hover = hover.and_then(|id| self.store.node_index(id));

        if selection.is_empty() && context.is_none() {
            match hover {
                Some(node) => Interaction::Hover { node },
                None => Interaction::Idle,
            }
        } else {
            Interaction::Focused {
                selection,
                context,
                hover,
            }
        }
    }
}
