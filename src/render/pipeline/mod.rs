//! Render pipelines

pub mod builder;
pub mod display;
pub mod trace;

pub use builder::{
    compile_compute_pipeline, compile_render_pipeline, compile_shader, BindGroupBuilder,
    BindingLayoutBuilder,
};
pub use display::DisplayPipeline;
pub use trace::{workgroup_count, TracePipeline, WORKGROUP_SIZE};
