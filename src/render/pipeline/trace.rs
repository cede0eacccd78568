//! BVH ray tracing compute pipeline

use super::builder::{compile_compute_pipeline, BindGroupBuilder, BindingLayoutBuilder};
use crate::core::types::Result;
use crate::render::buffer::{SceneBuffer, SCENE_STORAGE_BINDINGS};
use crate::render::texture::{Skybox, TraceTarget, TRACE_OUTPUT_FORMAT};

/// Edge length of the square compute workgroup (matches `@workgroup_size` in trace.wgsl)
pub const WORKGROUP_SIZE: u32 = 8;

/// Workgroups covering a `width x height` image
pub fn workgroup_count(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE))
}

/// Two-level BVH trace into a storage image
pub struct TracePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl TracePipeline {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let mut layout = BindingLayoutBuilder::new(wgpu::ShaderStages::COMPUTE)
            .output_image(TRACE_OUTPUT_FORMAT)
            .uniform_buffer();
        for _ in 0..SCENE_STORAGE_BINDINGS {
            layout = layout.storage_buffer(true);
        }
        let bind_group_layout = layout.cube_map().build(device, "trace_bind_group_layout");

        let pipeline = compile_compute_pipeline(
            device,
            "trace",
            include_str!("../../../shaders/trace.wgsl"),
            "main",
            &[&bind_group_layout],
        )?;

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    /// Bind the output image, the scene partitions and the skybox
    ///
    /// Must be rebuilt whenever the output image is recreated.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        target: &TraceTarget,
        scene: &SceneBuffer,
        skybox: &Skybox,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new()
            .texture_view(target.view())
            .buffer(scene.uniform_binding())
            .buffers(scene.storage_bindings())
            .texture_view(skybox.view())
            .sampler(skybox.sampler())
            .build(device, "trace_bind_group", &self.bind_group_layout)
    }

    /// Record `repeats` trace passes over a `width x height` image
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        width: u32,
        height: u32,
        repeats: u32,
    ) {
        let (workgroups_x, workgroups_y) = workgroup_count(width, height);
        for _ in 0..repeats {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("trace_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(workgroups_x, workgroups_y, 1);
        }
    }
}
