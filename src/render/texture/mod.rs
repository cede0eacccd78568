//! Textures owned by the renderer

pub mod skybox;
pub mod target;

pub use skybox::{CubeFaces, Skybox, FACE_NAMES};
pub use target::{TraceTarget, TRACE_OUTPUT_FORMAT};
