use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Note,
    Family,
    NoteTypeHub,
    Kanji,
    KanjiHub,
}

impl NodeKind {
    /// Hubs exist to join notes; they carry no content of their own and are
    /// hidden when nothing visible touches them.
    pub fn is_connector(self) -> bool {
        matches!(self, Self::Family | Self::NoteTypeHub | Self::KanjiHub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    New,
    Learning,
    Review,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub note_type: String,
    #[serde(default)]
    pub layers: BTreeSet<String>,
    /// family id -> priority number within that family
    #[serde(default)]
    pub families: BTreeMap<String, i64>,
    #[serde(default)]
    pub card_status: Vec<CardStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub layer: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

pub const LAYER_PRIORITY: &str = "priority";
pub const LAYER_FAMILY: &str = "family";

pub fn is_family_layer(layer: &str) -> bool {
    layer == LAYER_PRIORITY || layer == LAYER_FAMILY
}

impl EdgeRecord {
    fn meta_flag(&self, key: &str) -> bool {
        matches!(self.meta.get(key), Some(Value::Bool(true)))
    }

    pub fn bidirectional(&self) -> bool {
        self.meta_flag("bidirectional")
    }

    /// Animation-only edges: never rendered, only seed reverse particle flow.
    pub fn flow_only(&self) -> bool {
        self.meta_flag("flow_only")
    }

    pub fn manual(&self) -> bool {
        self.meta_flag("manual")
    }

    pub fn same_prio(&self) -> bool {
        self.meta_flag("same_prio")
    }

    pub fn fid(&self) -> Option<&str> {
        self.meta.get("fid").and_then(Value::as_str)
    }

    pub fn kind(&self) -> Option<&str> {
        self.meta.get("kind").and_then(Value::as_str)
    }

    pub fn is_family(&self) -> bool {
        is_family_layer(&self.layer)
    }

    /// Content-addressed identity: endpoints, layer and the canonicalized
    /// metadata. Two records with the same key are the same edge.
    pub fn stable_key(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(&self.source.0);
        out.push('|');
        out.push_str(&self.target.0);
        out.push('|');
        out.push_str(&self.layer);
        out.push('|');
        canonical_value(&Value::Object(self.meta.clone()), &mut out);
        out
    }
}

/// Recursive key-sorted JSON encoding, independent of map iteration order.
fn canonical_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                canonical_value(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                canonical_value(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum DeltaOp {
    NodeDrop { id: NodeId },
    EdgeDrop { key: String },
    NodeAdd { node: NodeRecord },
    NodeUpdate { node: NodeRecord },
    EdgeUpsert {
        edge: EdgeRecord,
        /// Precomputed stable key; derived from the edge when absent.
        #[serde(default)]
        key: Option<String>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

pub type Rgba = [f32; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self::Solid
    }
}

impl LineStyle {
    pub fn code(self) -> u8 {
        match self {
            Self::Solid => 0,
            Self::Dashed => 1,
            Self::Dotted => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub enabled: bool,
    pub color: Rgba,
    pub line_style: LineStyle,
    pub flow: bool,
    /// Solver rest distance override; falls back to the solver default.
    pub distance: Option<f32>,
    /// Solver spring strength override; falls back to the solver default.
    pub strength: Option<f32>,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            color: [0.62, 0.62, 0.66, 0.6],
            line_style: LineStyle::Solid,
            flow: false,
            distance: None,
            strength: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricMode {
    None,
    Jaccard,
    Overlap,
    CommonNeighbors,
    ClusteringMean,
    TwoHopMean,
}

impl Default for MetricMode {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    Undirected,
    Out,
    In,
}

impl Default for MetricDirection {
    fn default() -> Self {
        Self::Undirected
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborScaling {
    pub mode: MetricMode,
    pub direction: MetricDirection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub layers: BTreeMap<String, LayerStyle>,
    #[serde(default)]
    pub hidden_note_types: BTreeSet<String>,
    #[serde(default)]
    pub neighbor_scaling: NeighborScaling,
    /// Renderer-level switch to keep out-of-focus nodes at full brightness.
    #[serde(default)]
    pub skip_focus_dim: bool,
}

impl GraphConfig {
    pub fn layer_style(&self, layer: &str) -> LayerStyle {
        self.layers.get(layer).copied().unwrap_or_default()
    }

    pub fn layer_enabled(&self, layer: &str) -> bool {
        self.layers.get(layer).map(|l| l.enabled).unwrap_or(true)
    }

    pub fn note_type_visible(&self, note_type: &str) -> bool {
        !self.hidden_note_types.contains(note_type)
    }
}
