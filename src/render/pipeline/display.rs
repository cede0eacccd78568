//! Blit of the trace image onto the presented surface

use super::builder::{compile_render_pipeline, BindGroupBuilder, BindingLayoutBuilder};
use crate::core::types::Result;
use crate::render::texture::TraceTarget;

/// Fullscreen-triangle pass sampling the current [`TraceTarget`]
pub struct DisplayPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    source: wgpu::BindGroup,
}

impl DisplayPipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, source: &TraceTarget) -> Result<Self> {
        let layout = BindingLayoutBuilder::new(wgpu::ShaderStages::FRAGMENT)
            .texture(wgpu::TextureViewDimension::D2)
            .sampler()
            .build(device, "display_layout");

        // Linear so half-resolution traces stretch smoothly
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("display_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline = compile_render_pipeline(
            device,
            "display",
            include_str!("../../../shaders/display.wgsl"),
            "vs_main",
            "fs_main",
            &[&layout],
            surface_format,
        )?;

        let source = Self::bind(device, &layout, &sampler, source);
        Ok(Self {
            pipeline,
            layout,
            sampler,
            source,
        })
    }

    fn bind(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        source: &TraceTarget,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new()
            .texture_view(source.view())
            .sampler(sampler)
            .build(device, "display_source", layout)
    }

    /// Point the pass at a recreated trace target
    pub fn rebind(&mut self, device: &wgpu::Device, source: &TraceTarget) {
        self.source = Self::bind(device, &self.layout, &self.sampler, source);
    }

    /// Record the blit into `encoder`, overwriting `output`
    pub fn blit(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("display_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.source, &[]);
        pass.draw(0..3, 0..1);
    }
}
