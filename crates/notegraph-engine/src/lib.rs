pub mod adjacency;
pub mod anim;
pub mod collapse;
pub mod delta;
pub mod engine;
pub mod focus;
pub mod interaction;
pub mod metric;
pub mod renderer;
pub mod store;
pub mod style;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{BaseStyleBuffers, DeltaOptions, GraphSync};
pub use interaction::{Interaction, InteractionEvent};
pub use renderer::{Renderer, RendererCaps, Solver};
pub use store::VisualStateStore;
