//! Raybench - real-time BVH ray tracing GPU benchmark

pub mod core;
pub mod math;
pub mod geometry;
pub mod bvh;
pub mod render;
pub mod scene;
pub mod bench;
