//! Error types for the benchmark

use thiserror::Error;

/// Main error type for the benchmark
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shader compilation failed for '{label}': {message}")]
    ShaderCompile { label: String, message: String },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Skybox error: {0}")]
    Skybox(String),

    #[error("Invalid renderer state transition: {from:?} -> {to:?}")]
    InvalidState {
        from: crate::render::state::RendererState,
        to: crate::render::state::RendererState,
    },

    #[error("Benchmark aborted before completion")]
    Aborted,

    #[error("Not enough samples to score: got {got}, need at least {need}")]
    InsufficientSamples { got: usize, need: usize },
}
