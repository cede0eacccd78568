//! End-to-end frames on an offscreen target
//!
//! Each test skips when the machine has no usable adapter.

use raybench::core::{logging, BenchConfig, Error};
use raybench::render::context::HEADLESS_FORMAT;
use raybench::render::pipeline::{compile_compute_pipeline, compile_shader};
use raybench::render::{GpuContext, Renderer, RendererState};
use raybench::scene::Scene;

const SIZE: u32 = 64;

fn gpu() -> Option<GpuContext> {
    logging::init_for_tests();
    match pollster::block_on(GpuContext::headless(SIZE, SIZE)) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

fn config(object_count: u32) -> BenchConfig {
    BenchConfig {
        width: SIZE,
        height: SIZE,
        object_count,
        max_instances: 64,
        dispatches_per_frame: 1,
        max_bounces: 1,
        ..BenchConfig::default()
    }
}

fn offscreen_target(gpu: &GpuContext) -> wgpu::Texture {
    texture_with_usage(gpu, wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC)
}

fn texture_with_usage(gpu: &GpuContext, usage: wgpu::TextureUsages) -> wgpu::Texture {
    gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HEADLESS_FORMAT,
        usage,
        view_formats: &[],
    })
}

/// Copy the target back to the CPU as tightly packed RGBA8
fn read_pixels(gpu: &GpuContext, texture: &wgpu::Texture) -> Vec<u8> {
    // 64 * 4 bytes already meets the 256 byte row alignment
    let bytes_per_row = SIZE * 4;
    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size: (bytes_per_row * SIZE) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(SIZE),
            },
        },
        wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).unwrap();
    });
    gpu.device
        .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
        .unwrap();
    rx.recv().unwrap().unwrap();

    let pixels = slice.get_mapped_range().to_vec();
    staging.unmap();
    pixels
}

#[test]
fn test_empty_scene_renders() {
    let Some(gpu) = gpu() else { return };
    let config = config(0);
    let mut scene = Scene::benchmark(&config);
    let mut renderer = Renderer::new(&gpu, &scene, &config).unwrap();
    assert_eq!(renderer.state(), RendererState::Ready);

    let target = offscreen_target(&gpu);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    for _ in 0..3 {
        renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view).unwrap();
        assert_eq!(renderer.state(), RendererState::Ready);
    }
    assert_eq!(renderer.tlas_node_count(), 0);
    assert_eq!(renderer.frame_index(), 3);

    // Sky and ground still cover the frame
    let pixels = read_pixels(&gpu, &target);
    assert!(pixels.chunks_exact(4).any(|p| p[0] > 0 || p[1] > 0 || p[2] > 0));
}

#[test]
fn test_tlas_tracks_object_count() {
    let Some(gpu) = gpu() else { return };
    let config = config(9);
    let mut scene = Scene::benchmark(&config);
    let mut renderer = Renderer::new(&gpu, &scene, &config).unwrap();

    let target = offscreen_target(&gpu);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view).unwrap();
    assert_eq!(renderer.tlas_node_count(), 2 * 9 - 1);
    assert_eq!(renderer.state(), RendererState::Ready);

    // Objects move; the node count stays put
    renderer.render_frame(&gpu, &mut scene, 0.5, &view).unwrap();
    assert_eq!(renderer.tlas_node_count(), 2 * 9 - 1);
}

#[test]
fn test_instance_overflow_keeps_renderer_usable() {
    let Some(gpu) = gpu() else { return };
    let config = config(4);
    let mut scene = Scene::benchmark(&config);
    let mut renderer = Renderer::new(&gpu, &scene, &config).unwrap();
    let target = offscreen_target(&gpu);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    scene.spawn_objects(config.max_instances + 1, 7);
    assert!(renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view).is_err());
    assert_eq!(renderer.state(), RendererState::Ready);

    scene.objects.truncate(4);
    renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view).unwrap();
    assert_eq!(renderer.tlas_node_count(), 7);
}

#[test]
fn test_lightweight_halves_trace_resolution() {
    let Some(gpu) = gpu() else { return };
    let config = BenchConfig {
        lightweight: true,
        ..config(2)
    };
    let mut scene = Scene::benchmark(&config);
    let mut renderer = Renderer::new(&gpu, &scene, &config).unwrap();
    assert_eq!(renderer.settings().dispatches_per_frame, 1);
    assert_eq!(renderer.trace_size(), Some((SIZE / 2, SIZE / 2)));

    let target = offscreen_target(&gpu);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view).unwrap();
    assert_eq!(renderer.state(), RendererState::Ready);
}

#[test]
fn test_rejected_frame_is_an_error() {
    let Some(gpu) = gpu() else { return };
    let config = config(3);
    let mut scene = Scene::benchmark(&config);
    let mut renderer = Renderer::new(&gpu, &scene, &config).unwrap();

    // Sampling-only texture cannot be a color attachment
    let unusable = texture_with_usage(&gpu, wgpu::TextureUsages::TEXTURE_BINDING);
    let view = unusable.create_view(&wgpu::TextureViewDescriptor::default());
    let result = renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view);
    assert!(matches!(result, Err(Error::Gpu(_))), "{:?}", result);
    assert_eq!(renderer.state(), RendererState::Ready);
    assert_eq!(renderer.frame_index(), 0);

    let target = offscreen_target(&gpu);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view).unwrap();
    assert_eq!(renderer.frame_index(), 1);
}

#[test]
fn test_pipeline_failure_leaves_renderer_failed() {
    let Some(mut gpu) = gpu() else { return };
    // Depth formats cannot be a color target for the display pass
    gpu.config.format = wgpu::TextureFormat::Depth32Float;
    let config = config(2);
    let mut scene = Scene::benchmark(&config);

    let mut renderer = Renderer::uninitialized(&config);
    let result = renderer.initialize(&gpu, &scene, &config);
    assert!(matches!(result, Err(Error::ShaderCompile { .. })), "{:?}", result);
    assert_eq!(renderer.state(), RendererState::Failed);
    assert_eq!(renderer.trace_size(), None);

    let target = offscreen_target(&gpu);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    assert!(matches!(
        renderer.render_frame(&gpu, &mut scene, 1.0 / 60.0, &view),
        Err(Error::InvalidState { .. })
    ));
    assert_eq!(renderer.state(), RendererState::Failed);
    assert!(Renderer::new(&gpu, &scene, &config).is_err());
}

#[test]
fn test_shader_and_pipeline_errors_reported() {
    let Some(gpu) = gpu() else { return };

    let broken = compile_shader(&gpu.device, "broken", "fn main( {");
    assert!(matches!(broken, Err(Error::ShaderCompile { ref label, .. }) if label == "broken"));

    let source = "
        @group(0) @binding(0) var<storage, read_write> data: array<u32>;
        @compute @workgroup_size(1)
        fn main() { data[0] = 1u; }
    ";
    assert!(compile_shader(&gpu.device, "valid", source).is_ok());

    // Binding declared by the shader but missing from the layout
    let mismatched = compile_compute_pipeline(&gpu.device, "mismatched", source, "main", &[]);
    assert!(matches!(mismatched, Err(Error::ShaderCompile { .. })));

    let layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("data_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });
    let missing_entry = compile_compute_pipeline(&gpu.device, "entry", source, "not_main", &[&layout]);
    assert!(matches!(missing_entry, Err(Error::ShaderCompile { .. })));
    assert!(compile_compute_pipeline(&gpu.device, "ok", source, "main", &[&layout]).is_ok());
}
