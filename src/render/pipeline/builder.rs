//! Bind group layouts, bind groups and pipeline compilation
//!
//! Layout entries are appended in a fixed order: the output image, then
//! buffers in call order, then textures and samplers. Binding indices are
//! handed out by a counter, so a layout and the bind groups built against it
//! stay in step as long as both are built in the same order.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::render::context::capture_validation;

/// Ordering phase of a layout under construction
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Image,
    Buffers,
    Textures,
}

/// Builds a bind group layout with auto-incrementing binding indices
pub struct BindingLayoutBuilder {
    visibility: wgpu::ShaderStages,
    entries: Vec<wgpu::BindGroupLayoutEntry>,
    phase: Phase,
}

impl BindingLayoutBuilder {
    pub fn new(visibility: wgpu::ShaderStages) -> Self {
        Self {
            visibility,
            entries: Vec::new(),
            phase: Phase::Image,
        }
    }

    fn push(mut self, phase: Phase, ty: wgpu::BindingType) -> Self {
        assert!(
            phase >= self.phase,
            "binding {:?} added after {:?} entries",
            phase, self.phase
        );
        self.phase = phase;
        let binding = self.next_binding();
        self.entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: self.visibility,
            ty,
            count: None,
        });
        self
    }

    /// Write-only storage image the compute pass renders into
    pub fn output_image(self, format: wgpu::TextureFormat) -> Self {
        assert!(self.entries.is_empty(), "the output image must be the first binding");
        self.push(Phase::Image, wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format,
            view_dimension: wgpu::TextureViewDimension::D2,
        })
    }

    pub fn uniform_buffer(self) -> Self {
        self.push(Phase::Buffers, wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        })
    }

    pub fn storage_buffer(self, read_only: bool) -> Self {
        self.push(Phase::Buffers, wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        })
    }

    /// Filterable float texture
    pub fn texture(self, view_dimension: wgpu::TextureViewDimension) -> Self {
        self.push(Phase::Textures, wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        })
    }

    pub fn sampler(self) -> Self {
        self.push(Phase::Textures, wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering))
    }

    /// Cube-map texture followed by its sampler
    pub fn cube_map(self) -> Self {
        self.texture(wgpu::TextureViewDimension::Cube).sampler()
    }

    /// Index the next entry will receive
    pub fn next_binding(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn entries(&self) -> &[wgpu::BindGroupLayoutEntry] {
        &self.entries
    }

    pub fn build(&self, device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &self.entries,
        })
    }
}

/// Bind group entries numbered the same way as [`BindingLayoutBuilder`]
#[derive(Default)]
pub struct BindGroupBuilder<'a> {
    entries: Vec<wgpu::BindGroupEntry<'a>>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, resource: wgpu::BindingResource<'a>) -> Self {
        let binding = self.entries.len() as u32;
        self.entries.push(wgpu::BindGroupEntry { binding, resource });
        self
    }

    pub fn texture_view(self, view: &'a wgpu::TextureView) -> Self {
        self.push(wgpu::BindingResource::TextureView(view))
    }

    pub fn buffer(self, binding: wgpu::BufferBinding<'a>) -> Self {
        self.push(wgpu::BindingResource::Buffer(binding))
    }

    pub fn buffers(self, bindings: impl IntoIterator<Item = wgpu::BufferBinding<'a>>) -> Self {
        bindings.into_iter().fold(self, Self::buffer)
    }

    pub fn sampler(self, sampler: &'a wgpu::Sampler) -> Self {
        self.push(wgpu::BindingResource::Sampler(sampler))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn build(&self, device: &wgpu::Device, label: &str, layout: &wgpu::BindGroupLayout) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &self.entries,
        })
    }
}

/// Join the error messages of a compilation, `None` if there are none
pub fn compilation_errors(messages: &[wgpu::CompilationMessage]) -> Option<String> {
    let errors: Vec<String> = messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
            None => m.message.clone(),
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

/// Create a shader module and fail on WGSL errors
pub fn compile_shader(device: &wgpu::Device, label: &str, source: &str) -> Result<wgpu::ShaderModule> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let scope_error = pollster::block_on(scope.pop());

    let info = pollster::block_on(module.get_compilation_info());
    for message in &info.messages {
        if message.message_type == wgpu::CompilationMessageType::Warning {
            log::warn!("Shader '{}': {}", label, message.message);
        }
    }
    // Compilation messages carry line positions, so they win over the scope error
    if let Some(message) = compilation_errors(&info.messages) {
        return Err(Error::ShaderCompile { label: label.to_string(), message });
    }
    if let Some(error) = scope_error {
        return Err(pipeline_error(label, error));
    }
    Ok(module)
}

/// Validation failure while building `label`
fn pipeline_error(label: &str, error: wgpu::Error) -> Error {
    Error::ShaderCompile {
        label: label.to_string(),
        message: error.to_string(),
    }
}

fn pipeline_layout(device: &wgpu::Device, label: &str, bind_group_layouts: &[&wgpu::BindGroupLayout]) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{}_layout", label)),
        bind_group_layouts,
        immediate_size: 0,
    })
}

/// Compute pipeline; binding mismatches and bad entry points are errors
pub fn compile_compute_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    entry_point: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> Result<wgpu::ComputePipeline> {
    let module = compile_shader(device, label, source)?;

    capture_validation(device, || {
        let layout = pipeline_layout(device, label, bind_group_layouts);
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        })
    })
    .map_err(|e| pipeline_error(label, e))
}

/// Fullscreen-style render pipeline: no vertex buffers, one color target
pub fn compile_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    vs_entry: &str,
    fs_entry: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline> {
    let module = compile_shader(device, label, source)?;

    let targets = [Some(wgpu::ColorTargetState {
        format,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })];
    capture_validation(device, || {
        let layout = pipeline_layout(device, label, bind_group_layouts);
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(vs_entry),
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(fs_entry),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        })
    })
    .map_err(|e| pipeline_error(label, e))
}
