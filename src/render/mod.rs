//! Rendering system and GPU interfaces

pub mod context;
pub mod buffer;
pub mod pipeline;
pub mod texture;
pub mod state;
pub mod renderer;

pub use context::GpuContext;
pub use renderer::{build_instances, FrameSettings, Renderer};
pub use state::RendererState;
