use std::collections::HashSet;

use notegraph_core::{GraphConfig, MetricDirection, MetricMode, NeighborScaling};

use crate::renderer::{
    Solver, MAX_LINK_DISTANCE, MAX_LINK_STRENGTH, MIN_LINK_DISTANCE, MIN_LINK_STRENGTH,
};
use crate::store::VisualStateStore;

/// Above this many neighbor pairs, triangle counting switches to sampling.
const EXHAUSTIVE_PAIR_LIMIT: usize = 2048;
const SAMPLE_COUNT: usize = 1024;

const METRIC_WEIGHT: f32 = 0.7;

pub fn distance_scale(metric: f32) -> f32 {
    (1.0 - METRIC_WEIGHT * sanitize_metric(metric)).clamp(0.45, 1.0)
}

pub fn strength_scale(metric: f32) -> f32 {
    (1.0 + METRIC_WEIGHT * sanitize_metric(metric)).clamp(1.0, 1.7)
}

fn sanitize_metric(metric: f32) -> f32 {
    if metric.is_finite() {
        metric.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

struct NeighborSets {
    out: Vec<HashSet<u32>>,
    inc: Vec<HashSet<u32>>,
    und: Vec<HashSet<u32>>,
}

fn build_neighbor_sets(store: &VisualStateStore) -> NeighborSets {
    let n = store.node_count();
    let mut sets = NeighborSets {
        out: vec![HashSet::new(); n],
        inc: vec![HashSet::new(); n],
        und: vec![HashSet::new(); n],
    };
    for edge in &store.rendered {
        let (s, t) = (edge.source as u32, edge.target as u32);
        if s == t {
            continue;
        }
        sets.out[s as usize].insert(t);
        sets.inc[t as usize].insert(s);
        sets.und[s as usize].insert(t);
        sets.und[t as usize].insert(s);
        if edge.bidirectional {
            sets.out[t as usize].insert(s);
            sets.inc[s as usize].insert(t);
        }
    }
    sets
}

/// Per-edge relatedness in [0,1] for the active rendered edge set.
pub fn edge_metrics(store: &VisualStateStore, scaling: &NeighborScaling) -> Vec<f32> {
    let e = store.edge_count();
    if scaling.mode == MetricMode::None || e == 0 {
        return vec![0.0; e];
    }

    let sets = build_neighbor_sets(store);
    let directed = match scaling.direction {
        MetricDirection::Undirected => &sets.und,
        MetricDirection::Out => &sets.out,
        MetricDirection::In => &sets.inc,
    };

    let mut metrics = vec![0.0f32; e];
    match scaling.mode {
        MetricMode::None => {}
        MetricMode::Jaccard | MetricMode::Overlap => {
            for (ei, edge) in store.rendered.iter().enumerate() {
                let a = &directed[edge.source];
                let b = &directed[edge.target];
                let common = a.intersection(b).count();
                let denom = match scaling.mode {
                    MetricMode::Jaccard => a.len() + b.len() - common,
                    _ => a.len().min(b.len()),
                };
                if denom > 0 {
                    metrics[ei] = common as f32 / denom as f32;
                }
            }
        }
        MetricMode::CommonNeighbors => {
            let counts: Vec<usize> = store
                .rendered
                .iter()
                .map(|edge| {
                    directed[edge.source]
                        .intersection(&directed[edge.target])
                        .count()
                })
                .collect();
            let max = counts.iter().copied().max().unwrap_or(0);
            if max > 0 {
                for (ei, count) in counts.iter().enumerate() {
                    metrics[ei] = *count as f32 / max as f32;
                }
            }
        }
        MetricMode::ClusteringMean => {
            let mut memo = vec![None; store.node_count()];
            for (ei, edge) in store.rendered.iter().enumerate() {
                let ca = clustering(edge.source, &sets.und, &mut memo);
                let cb = clustering(edge.target, &sets.und, &mut memo);
                metrics[ei] = (ca + cb) / 2.0;
            }
        }
        MetricMode::TwoHopMean => {
            let mut memo = vec![None; store.node_count()];
            for (ei, edge) in store.rendered.iter().enumerate() {
                let a = neighbor_clustering_mean(edge.source, &sets.und, &mut memo);
                let b = neighbor_clustering_mean(edge.target, &sets.und, &mut memo);
                metrics[ei] = (a + b) / 2.0;
            }
        }
    }

    for m in &mut metrics {
        *m = sanitize_metric(*m);
    }
    metrics
}

/// Local clustering coefficient: triangle density among a node's undirected
/// neighbors. Large neighborhoods use a fixed deterministic pseudo-random
/// pairing instead of exhaustive counting; reproducibility matters more than
/// true randomness here.
fn clustering(node: usize, und: &[HashSet<u32>], memo: &mut [Option<f32>]) -> f32 {
    if let Some(value) = memo[node] {
        return value;
    }

    let mut neighbors: Vec<u32> = und[node].iter().copied().collect();
    neighbors.sort_unstable();
    let k = neighbors.len();
    let value = if k < 2 {
        0.0
    } else {
        let pairs = k * (k - 1) / 2;
        if pairs > EXHAUSTIVE_PAIR_LIMIT {
            sampled_density(node, &neighbors, und)
        } else {
            let mut links = 0usize;
            for i in 0..k {
                for j in (i + 1)..k {
                    if und[neighbors[i] as usize].contains(&neighbors[j]) {
                        links += 1;
                    }
                }
            }
            links as f32 / pairs as f32
        }
    };

    memo[node] = Some(value);
    value
}

fn sampled_density(node: usize, neighbors: &[u32], und: &[HashSet<u32>]) -> f32 {
    let k = neighbors.len() as u64;
    let mut state = (node as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(1);
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state >> 33
    };

    let mut links = 0usize;
    let mut samples = 0usize;
    while samples < SAMPLE_COUNT {
        let i = (next() % k) as usize;
        let j = (next() % k) as usize;
        if i == j {
            continue;
        }
        samples += 1;
        if und[neighbors[i] as usize].contains(&neighbors[j]) {
            links += 1;
        }
    }
    links as f32 / samples as f32
}

fn neighbor_clustering_mean(node: usize, und: &[HashSet<u32>], memo: &mut [Option<f32>]) -> f32 {
    let mut neighbors: Vec<u32> = und[node].iter().copied().collect();
    neighbors.sort_unstable();
    if neighbors.is_empty() {
        return 0.0;
    }
    let sum: f32 = neighbors
        .iter()
        .map(|&n| clustering(n as usize, und, memo))
        .sum();
    sum / neighbors.len() as f32
}

/// Push per-edge rest distances and spring strengths into the solver: base
/// per-layer values (solver defaults when unset) scaled by the relatedness
/// metric, clamped to solver-accepted ranges.
pub fn apply_to_solver<S: Solver>(
    store: &mut VisualStateStore,
    config: &GraphConfig,
    solver: &mut S,
) {
    let metrics = edge_metrics(store, &config.neighbor_scaling);
    let default_distance = solver.default_link_distance();
    let default_strength = solver.default_link_strength();

    for (ei, edge) in store.rendered.iter().enumerate() {
        let layer = config.layer_style(&edge.layer);
        let base_distance = finite_or(layer.distance.unwrap_or(default_distance), default_distance);
        let base_strength = finite_or(layer.strength.unwrap_or(default_strength), default_strength);

        store.edge_buf.distance[ei] = (base_distance * distance_scale(metrics[ei]))
            .clamp(MIN_LINK_DISTANCE, MAX_LINK_DISTANCE);
        store.edge_buf.strength[ei] = (base_strength * strength_scale(metrics[ei]))
            .clamp(MIN_LINK_STRENGTH, MAX_LINK_STRENGTH);
    }

    solver.set_link_distances(&store.edge_buf.distance);
    solver.set_link_strengths(&store.edge_buf.strength);
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{edge, note, snapshot, StubSolver};
    use notegraph_core::LayerStyle;
    use serde_json::json;

    fn triangle_plus_tail() -> VisualStateStore {
        let mut store = VisualStateStore::default();
        store.load_snapshot(snapshot(
            vec![note("a"), note("b"), note("c"), note("d")],
            vec![
                edge("a", "b", "examples", json!({"bidirectional": true})),
                edge("b", "c", "examples", json!({"bidirectional": true})),
                edge("c", "a", "examples", json!({"bidirectional": true})),
                edge("c", "d", "examples", json!({"bidirectional": true})),
            ],
        ));
        store
    }

    fn all_modes() -> [MetricMode; 6] {
        [
            MetricMode::None,
            MetricMode::Jaccard,
            MetricMode::Overlap,
            MetricMode::CommonNeighbors,
            MetricMode::ClusteringMean,
            MetricMode::TwoHopMean,
        ]
    }

    #[test]
    fn metrics_stay_in_unit_interval_for_every_mode_and_direction() {
        let store = triangle_plus_tail();
        for mode in all_modes() {
            for direction in [
                MetricDirection::Undirected,
                MetricDirection::Out,
                MetricDirection::In,
            ] {
                let metrics = edge_metrics(&store, &NeighborScaling { mode, direction });
                assert_eq!(metrics.len(), store.edge_count());
                for m in metrics {
                    assert!((0.0..=1.0).contains(&m), "{mode:?}/{direction:?}: {m}");
                }
            }
        }
    }

    #[test]
    fn mode_none_yields_zero_for_all_edges() {
        let store = triangle_plus_tail();
        let metrics = edge_metrics(&store, &NeighborScaling::default());
        assert!(metrics.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn jaccard_of_triangle_edge() {
        let store = triangle_plus_tail();
        let metrics = edge_metrics(
            &store,
            &NeighborScaling {
                mode: MetricMode::Jaccard,
                direction: MetricDirection::Undirected,
            },
        );
        // a-b: neighbors(a) = {b, c}, neighbors(b) = {a, c}; common = {c},
        // union = {a, b, c}.
        assert!((metrics[0] - 1.0 / 3.0).abs() < 1e-6);
        // c-d: d's only neighbor is c itself; nothing in common.
        assert_eq!(metrics[3], 0.0);
    }

    #[test]
    fn common_neighbors_normalizes_by_observed_maximum() {
        let store = triangle_plus_tail();
        let metrics = edge_metrics(
            &store,
            &NeighborScaling {
                mode: MetricMode::CommonNeighbors,
                direction: MetricDirection::Undirected,
            },
        );
        let max = metrics.iter().cloned().fold(0.0f32, f32::max);
        assert_eq!(max, 1.0);
        assert_eq!(metrics[3], 0.0);
    }

    #[test]
    fn clustering_mean_is_deterministic() {
        let store = triangle_plus_tail();
        let scaling = NeighborScaling {
            mode: MetricMode::ClusteringMean,
            direction: MetricDirection::Undirected,
        };
        assert_eq!(edge_metrics(&store, &scaling), edge_metrics(&store, &scaling));
    }

    #[test]
    fn scale_functions_respect_documented_bounds() {
        for m in [-1.0, 0.0, 0.25, 0.5, 1.0, 2.0, f32::NAN, f32::INFINITY] {
            let d = distance_scale(m);
            let s = strength_scale(m);
            assert!((0.45..=1.0).contains(&d));
            assert!((1.0..=1.7).contains(&s));
        }
        assert_eq!(distance_scale(0.0), 1.0);
        assert_eq!(strength_scale(0.0), 1.0);
        assert!((distance_scale(1.0) - 0.45).abs() < 1e-3);
        assert!((strength_scale(1.0) - 1.7).abs() < 1e-6);
    }

    #[test]
    fn solver_values_are_clamped_to_accepted_ranges() {
        let mut store = triangle_plus_tail();
        let mut config = GraphConfig::default();
        config.layers.insert(
            "examples".into(),
            LayerStyle {
                distance: Some(1.0e9),
                strength: Some(-5.0),
                ..Default::default()
            },
        );
        config.neighbor_scaling.mode = MetricMode::Jaccard;
        let mut solver = StubSolver::default();

        apply_to_solver(&mut store, &config, &mut solver);
        for &d in &solver.distances {
            assert!((MIN_LINK_DISTANCE..=MAX_LINK_DISTANCE).contains(&d));
        }
        for &s in &solver.strengths {
            assert!((MIN_LINK_STRENGTH..=MAX_LINK_STRENGTH).contains(&s));
        }
    }

    #[test]
    fn non_finite_layer_overrides_fall_back_to_solver_defaults() {
        let mut store = triangle_plus_tail();
        let mut config = GraphConfig::default();
        config.layers.insert(
            "examples".into(),
            LayerStyle {
                distance: Some(f32::NAN),
                ..Default::default()
            },
        );
        let mut solver = StubSolver::default();

        apply_to_solver(&mut store, &config, &mut solver);
        assert!(solver.distances.iter().all(|d| d.is_finite()));
        assert_eq!(solver.distances[0], solver.default_link_distance());
    }
}
