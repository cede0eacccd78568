//! Shared math aliases and the crate-wide `Result`

pub use glam::{Mat4, Vec3};

/// Result alias used across the benchmark
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
