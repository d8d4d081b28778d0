use std::collections::HashMap;

/// One in-flight node size interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct SizePulse {
    pub from: f32,
    pub to: f32,
    pub elapsed: f32,
    pub duration: f32,
}

/// Styling work produced by one animation tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnimFrame {
    pub node_sizes: Vec<(usize, f32)>,
    pub edge_flow: Vec<(usize, bool)>,
}

impl AnimFrame {
    pub fn is_empty(&self) -> bool {
        self.node_sizes.is_empty() && self.edge_flow.is_empty()
    }
}

/// Frame-driven interpolations, keyed by target index. A newer request for
/// the same target supersedes the pending one; nothing is ever queued.
#[derive(Debug, Default)]
pub struct Animations {
    pulses: HashMap<usize, SizePulse>,
    pending_flow: HashMap<usize, bool>,
}

impl Animations {
    pub fn pulse_node(&mut self, node: usize, from: f32, to: f32, duration: f32) {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.15
        };
        self.pulses.insert(
            node,
            SizePulse {
                from,
                to,
                elapsed: 0.0,
                duration,
            },
        );
    }

    pub fn request_flow(&mut self, edge: usize, flow: bool) {
        self.pending_flow.insert(edge, flow);
    }

    pub fn cancel_node(&mut self, node: usize) {
        self.pulses.remove(&node);
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
        self.pending_flow.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.pulses.is_empty() && self.pending_flow.is_empty()
    }

    /// Advance all pulses by `dt` seconds and drain pending flow updates.
    pub fn advance(&mut self, dt: f32) -> AnimFrame {
        let mut frame = AnimFrame::default();
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let mut finished = Vec::new();
        let mut sizes: Vec<(usize, f32)> = Vec::with_capacity(self.pulses.len());
        for (&node, pulse) in &mut self.pulses {
            pulse.elapsed += dt;
            let t = (pulse.elapsed / pulse.duration).clamp(0.0, 1.0);
            let eased = t * t * (3.0 - 2.0 * t);
            sizes.push((node, pulse.from + (pulse.to - pulse.from) * eased));
            if t >= 1.0 {
                finished.push(node);
            }
        }
        for node in finished {
            self.pulses.remove(&node);
        }
        sizes.sort_unstable_by_key(|&(node, _)| node);
        frame.node_sizes = sizes;

        let mut flow: Vec<(usize, bool)> = self.pending_flow.drain().collect();
        flow.sort_unstable_by_key(|&(edge, _)| edge);
        frame.edge_flow = flow;

        frame
    }
}
