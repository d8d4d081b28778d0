use std::collections::BTreeSet;

use notegraph_core::{CardStatus, GraphConfig, NodeKind, NodeRecord, Rgba};

use crate::adjacency::AdjacencyTables;
use crate::focus::FocusState;
use crate::store::VisualStateStore;
use crate::visibility;

pub const FOCUS_SIZE_SCALE: f32 = 1.2;
pub const DIM_NODE_ALPHA: f32 = 0.16;
pub const DIM_EDGE_ALPHA: f32 = 0.08;
pub const FOCUS_EDGE_ALPHA_FLOOR: f32 = 0.45;
const EMPHASIS_ALPHA_FLOOR: f32 = 0.95;

// Brightness nudges, strongest first; a node's role decides which applies.
const NUDGE_SELECTED: f32 = 0.28;
const NUDGE_CONTEXT: f32 = 0.22;
const NUDGE_HOVERED: f32 = 0.16;
const NUDGE_FOCUS: f32 = 0.08;

const BASE_NODE_SIZE: f32 = 4.0;
const REVIEW_SIZE_BONUS: f32 = 1.5;
const SUSPENDED_ALPHA_SCALE: f32 = 0.55;

fn kind_color(kind: NodeKind) -> Rgba {
    match kind {
        NodeKind::Note => [0.36, 0.55, 0.85, 0.9],
        NodeKind::Family => [0.9, 0.62, 0.25, 0.9],
        NodeKind::NoteTypeHub => [0.62, 0.45, 0.85, 0.9],
        NodeKind::Kanji => [0.3, 0.72, 0.65, 0.9],
        NodeKind::KanjiHub => [0.24, 0.55, 0.5, 0.9],
    }
}

fn kind_size(kind: NodeKind) -> f32 {
    match kind {
        NodeKind::Note | NodeKind::Kanji => BASE_NODE_SIZE,
        NodeKind::Family => 5.0,
        NodeKind::NoteTypeHub => 7.0,
        NodeKind::KanjiHub => 6.0,
    }
}

fn node_base_color(record: &NodeRecord) -> Rgba {
    let mut color = kind_color(record.kind);
    let suspended = !record.card_status.is_empty()
        && record
            .card_status
            .iter()
            .all(|s| *s == CardStatus::Suspended);
    if suspended {
        color[3] *= SUSPENDED_ALPHA_SCALE;
    }
    sanitize_color(color)
}

fn node_base_size(record: &NodeRecord) -> f32 {
    let mut size = kind_size(record.kind);
    if record.card_status.contains(&CardStatus::Review) {
        size += REVIEW_SIZE_BONUS;
    }
    sanitize_size(size)
}

fn sanitize_color(color: Rgba) -> Rgba {
    let mut out = color;
    for c in &mut out {
        *c = if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 };
    }
    out
}

fn sanitize_size(size: f32) -> f32 {
    if size.is_finite() {
        size.max(0.0)
    } else {
        BASE_NODE_SIZE
    }
}

fn brighten(color: Rgba, amount: f32) -> Rgba {
    let mut out = color;
    for c in out.iter_mut().take(3) {
        *c += (1.0 - *c) * amount;
    }
    out
}

fn dim(color: Rgba, alpha: f32) -> Rgba {
    let grey = 0.299 * color[0] + 0.587 * color[1] + 0.114 * color[2];
    let mut out = color;
    for c in out.iter_mut().take(3) {
        *c += (grey - *c) * 0.8;
    }
    out[3] = alpha;
    out
}

/// Recompute the base tier (post-filter, pre-interaction) for every node and
/// edge from records, layer configuration and visibility masks.
pub fn refresh_base(store: &mut VisualStateStore, config: &GraphConfig) {
    let vis = visibility::resolve(store, config);

    for i in 0..store.node_count() {
        let record = &store.nodes[i];
        let color = node_base_color(record);
        let size = node_base_size(record);
        let code = VisualStateStore::type_code_for(record.kind);

        store.node_buf.base_color[i * 4..i * 4 + 4].copy_from_slice(&color);
        store.node_buf.base_size[i] = size;
        store.node_buf.type_code[i] = code;
        store.node_buf.visible[i] = vis.node[i];
    }

    for ei in 0..store.edge_count() {
        let layer = config.layer_style(&store.rendered[ei].layer);
        let color = sanitize_color(layer.color);

        store.edge_buf.base_color[ei * 4..ei * 4 + 4].copy_from_slice(&color);
        store.edge_buf.width[ei] = 1.0;
        store.edge_buf.style_code[ei] = layer.line_style.code();
        store.edge_buf.base_flow[ei] = layer.flow;
        store.edge_buf.bidirectional[ei] = store.rendered[ei].bidirectional;
        store.edge_buf.visible[ei] = vis.edge[ei];
    }

    tracing::debug!(
        nodes = store.node_count(),
        edges = store.edge_count(),
        "base buffers refreshed"
    );
}

/// Everything a per-index style decision depends on. Pure: the same inputs
/// and index always produce the same style, which is what makes the patch
/// paths interchangeable with a full rebuild.
pub struct StyleInputs<'a> {
    pub store: &'a VisualStateStore,
    pub focus: &'a FocusState,
    pub selected: &'a [usize],
    pub context: Option<usize>,
    pub hovered: Option<usize>,
    pub skip_dim: bool,
}

pub fn node_style(inputs: &StyleInputs<'_>, index: usize) -> (Rgba, f32) {
    let buf = &inputs.store.node_buf;
    if !buf.visible[index] {
        return ([0.0; 4], 0.0);
    }

    let base: Rgba = buf.base_color[index * 4..index * 4 + 4].try_into().unwrap();
    let size = buf.base_size[index];

    let focus_active = inputs.focus.active;
    let in_focus = focus_active && inputs.focus.node_mask[index];
    let hovered = inputs.hovered == Some(index);

    if in_focus || (!focus_active && hovered) {
        let nudge = if inputs.selected.contains(&index) {
            NUDGE_SELECTED
        } else if inputs.context == Some(index) {
            NUDGE_CONTEXT
        } else if hovered {
            NUDGE_HOVERED
        } else {
            NUDGE_FOCUS
        };
        let mut color = brighten(base, nudge);
        color[3] = color[3].max(EMPHASIS_ALPHA_FLOOR);
        (color, size * FOCUS_SIZE_SCALE)
    } else if focus_active && !inputs.skip_dim {
        (dim(base, DIM_NODE_ALPHA), size)
    } else {
        (base, size)
    }
}

pub fn edge_style(inputs: &StyleInputs<'_>, index: usize) -> (Rgba, f32, bool) {
    let buf = &inputs.store.edge_buf;
    if !buf.visible[index] {
        return ([0.0; 4], 0.0, false);
    }

    let mut color: Rgba = buf.base_color[index * 4..index * 4 + 4].try_into().unwrap();
    let width = buf.width[index];
    let base_flow = buf.base_flow[index];

    if inputs.focus.active {
        if inputs.focus.edge_mask[index] {
            color[3] = color[3].max(FOCUS_EDGE_ALPHA_FLOOR);
            (color, width, base_flow)
        } else {
            (dim(color, DIM_EDGE_ALPHA), width, false)
        }
    } else {
        let edge = &inputs.store.rendered[index];
        let touches_hover = inputs
            .hovered
            .is_some_and(|h| edge.source == h || edge.target == h);
        (color, width, base_flow || touches_hover)
    }
}

/// Recompute applied styles for the given indices (or everything when absent)
/// and write them into the applied tier. Returns the indices actually
/// rewritten so the caller can forward patches to the renderer.
pub fn restyle(
    store: &mut VisualStateStore,
    focus: &FocusState,
    selected: &[usize],
    context: Option<usize>,
    hovered: Option<usize>,
    skip_dim: bool,
    node_indices: Option<&[usize]>,
    edge_indices: Option<&[usize]>,
) -> (Vec<usize>, Vec<usize>) {
    let node_targets: Vec<usize> = match node_indices {
        Some(list) => list.iter().copied().filter(|&i| i < store.node_count()).collect(),
        None => (0..store.node_count()).collect(),
    };
    let edge_targets: Vec<usize> = match edge_indices {
        Some(list) => list.iter().copied().filter(|&i| i < store.edge_count()).collect(),
        None => (0..store.edge_count()).collect(),
    };

    let mut node_styles = Vec::with_capacity(node_targets.len());
    let mut edge_styles = Vec::with_capacity(edge_targets.len());
    {
        let inputs = StyleInputs {
            store,
            focus,
            selected,
            context,
            hovered,
            skip_dim,
        };
        for &i in &node_targets {
            node_styles.push(node_style(&inputs, i));
        }
        for &ei in &edge_targets {
            edge_styles.push(edge_style(&inputs, ei));
        }
    }

    for (&i, (color, size)) in node_targets.iter().zip(node_styles) {
        store.node_buf.color[i * 4..i * 4 + 4].copy_from_slice(&color);
        store.node_buf.size[i] = size;
    }
    for (&ei, (color, width, flow)) in edge_targets.iter().zip(edge_styles) {
        store.edge_buf.color[ei * 4..ei * 4 + 4].copy_from_slice(&color);
        store.edge_buf.width[ei] = width;
        store.edge_buf.flow[ei] = flow;
    }

    (node_targets, edge_targets)
}

/// Interaction state as last pushed to the renderer; kept to diff against the
/// next state.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedSnapshot {
    pub focus: FocusState,
    pub selected: Vec<usize>,
    pub context: Option<usize>,
    pub hovered: Option<usize>,
}

#[derive(Debug, PartialEq)]
pub enum UpdatePlan {
    /// Nothing changed; skip all writes.
    Noop,
    /// Only the hovered node moved, with no selection/context/focus involved
    /// on either side.
    HoverPatch {
        leave: Option<usize>,
        enter: Option<usize>,
    },
    /// Both states are focus-expressible; restyle exactly the changed subset.
    FocusPatch {
        nodes: Vec<usize>,
        edges: Vec<usize>,
    },
    Full,
}

pub fn plan_update(
    previous: Option<&AppliedSnapshot>,
    current: &AppliedSnapshot,
    base_dirty: bool,
    tables: &AdjacencyTables,
) -> UpdatePlan {
    if base_dirty {
        return UpdatePlan::Full;
    }
    let Some(prev) = previous else {
        return UpdatePlan::Full;
    };
    if prev == current {
        return UpdatePlan::Noop;
    }
    if prev.focus.node_mask.len() != current.focus.node_mask.len()
        || prev.focus.edge_mask.len() != current.focus.edge_mask.len()
    {
        // Structural change slipped past the dirty flag; patching index lists
        // of different extents would be meaningless.
        return UpdatePlan::Full;
    }

    let plain = |s: &AppliedSnapshot| s.selected.is_empty() && s.context.is_none() && !s.focus.active;
    if plain(prev) && plain(current) {
        return UpdatePlan::HoverPatch {
            leave: prev.hovered,
            enter: current.hovered,
        };
    }

    if prev.focus.active != current.focus.active {
        // Focus turning on or off flips the dim state of every index outside
        // the focus set; no list difference covers that.
        return UpdatePlan::Full;
    }

    let mut nodes: BTreeSet<usize> = BTreeSet::new();
    for &i in &prev.focus.node_list {
        if !current.focus.node_mask[i] {
            nodes.insert(i);
        }
    }
    for &i in &current.focus.node_list {
        if !prev.focus.node_mask[i] {
            nodes.insert(i);
        }
    }
    // Roles can flip (primary vs secondary emphasis) without membership
    // changing, so these are always rechecked.
    nodes.extend(prev.selected.iter().copied());
    nodes.extend(current.selected.iter().copied());
    nodes.extend(prev.context);
    nodes.extend(current.context);
    nodes.extend(prev.hovered);
    nodes.extend(current.hovered);

    let mut edges: BTreeSet<usize> = BTreeSet::new();
    for &ei in &prev.focus.edge_list {
        if !current.focus.edge_mask[ei] {
            edges.insert(ei);
        }
    }
    for &ei in &current.focus.edge_list {
        if !prev.focus.edge_mask[ei] {
            edges.insert(ei);
        }
    }
    for hover in [prev.hovered, current.hovered].into_iter().flatten() {
        if let Some(touching) = tables.touching.get(hover) {
            edges.extend(touching.iter().map(|&ei| ei as usize));
        }
    }

    UpdatePlan::FocusPatch {
        nodes: nodes.into_iter().collect(),
        edges: edges.into_iter().collect(),
    }
}
