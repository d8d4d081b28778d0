use notegraph_core::Rgba;

/// Solver-accepted ranges; everything pushed to the solver is clamped here.
pub const MIN_LINK_DISTANCE: f32 = 1.0;
pub const MAX_LINK_DISTANCE: f32 = 5000.0;
pub const MIN_LINK_STRENGTH: f32 = 0.0;
pub const MAX_LINK_STRENGTH: f32 = 50.0;

/// Optional renderer abilities, probed once at engine construction.
/// A renderer without patch setters still works; the engine falls back to
/// full buffer pushes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererCaps {
    pub node_patch: bool,
    pub link_patch: bool,
    pub flow: bool,
    pub fit_view: bool,
}

/// The GPU graph renderer the engine drives. Flat buffers only: positions are
/// interleaved xy, colors interleaved rgba, everything indexed by the active
/// node/edge order.
pub trait Renderer {
    fn caps(&self) -> RendererCaps;

    fn set_node_positions(&mut self, xy: &[f32]);
    fn set_node_colors(&mut self, rgba: &[f32]);
    fn set_node_sizes(&mut self, sizes: &[f32]);
    fn set_node_type_codes(&mut self, codes: &[u8]);

    fn set_link_colors(&mut self, rgba: &[f32]);
    fn set_link_widths(&mut self, widths: &[f32]);
    fn set_link_style_codes(&mut self, codes: &[u8]);
    fn set_link_flow_mask(&mut self, flow: &[bool]);
    fn set_link_bidirectional_mask(&mut self, bidirectional: &[bool]);

    /// Per-index patch setters; only called when the matching capability is
    /// advertised.
    fn patch_node_style(&mut self, index: usize, color: Rgba, size: f32);
    fn patch_link_style(&mut self, index: usize, color: Rgba, width: f32, flow: bool);

    fn space_to_screen(&self, xy: [f32; 2]) -> [f32; 2];
    fn screen_to_space(&self, xy: [f32; 2]) -> [f32; 2];
    fn node_screen_radius(&self, index: usize) -> f32;

    fn fit_view(&mut self);
    fn render(&mut self, alpha: f32);
}

/// The force-directed physics solver. The engine never steps it; it only
/// starts, stops, reheats and feeds per-edge rest distances and strengths.
pub trait Solver {
    fn start(&mut self, alpha: f32);
    fn stop(&mut self, keep_state: bool);
    fn reheat(&mut self, alpha: f32);

    fn default_link_distance(&self) -> f32;
    fn default_link_strength(&self) -> f32;
    fn set_link_distances(&mut self, distances: &[f32]);
    fn set_link_strengths(&mut self, strengths: &[f32]);

    /// Pull a subset of nodes toward the layout with zero damping, leaving
    /// the rest of the simulation cold.
    fn pull_nodes(&mut self, indices: &[usize], alpha: f32);

    /// Interleaved xy positions for the active node set.
    fn positions(&self) -> &[f32];
}
