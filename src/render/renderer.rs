//! Frame orchestration: simulation step, TLAS rebuild, upload, trace, present

use std::time::Instant;

use super::buffer::{SceneBuffer, SceneUniform};
use super::context::{capture_validation, GpuContext};
use super::pipeline::{DisplayPipeline, TracePipeline};
use super::state::RendererState;
use super::texture::{CubeFaces, Skybox, TraceTarget};
use crate::bvh::{BlasHandle, InstanceDescriptor};
use crate::core::config::BenchConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::scene::Scene;

/// Per-frame settings derived from the configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSettings {
    pub dispatches_per_frame: u32,
    pub lightweight: bool,
    pub max_bounces: u32,
    pub max_instances: u32,
}

impl FrameSettings {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            dispatches_per_frame: config.effective_dispatches(),
            lightweight: config.lightweight,
            max_bounces: config.max_bounces,
            max_instances: config.max_instances.max(config.object_count).max(1),
        }
    }

    /// Trace image size for an output of `width x height`
    pub fn trace_resolution(&self, width: u32, height: u32) -> (u32, u32) {
        if self.lightweight {
            ((width / 2).max(1), (height / 2).max(1))
        } else {
            (width.max(1), height.max(1))
        }
    }
}

/// GPU resources that exist once initialization succeeded
struct FrameResources {
    scene_buffer: SceneBuffer,
    blas: Vec<BlasHandle>,
    skybox: Skybox,
    trace: TracePipeline,
    display: DisplayPipeline,
    target: TraceTarget,
    trace_bind_group: wgpu::BindGroup,
}

impl FrameResources {
    fn create(gpu: &GpuContext, scene: &Scene, config: &BenchConfig, settings: &FrameSettings) -> Result<Self> {
        let scene_buffer = SceneBuffer::new(&gpu.device, &gpu.queue, &scene.meshes, settings.max_instances)?;

        let faces = CubeFaces::load_or_default(config.skybox_dir.as_deref());
        let skybox = Skybox::new(&gpu.device, &gpu.queue, &faces);

        let trace = TracePipeline::new(&gpu.device)?;

        let (width, height) = gpu.size();
        let (tw, th) = settings.trace_resolution(width, height);
        let target = TraceTarget::new(&gpu.device, tw, th);
        let trace_bind_group = trace.create_bind_group(&gpu.device, &target, &scene_buffer, &skybox);
        let display = DisplayPipeline::new(&gpu.device, gpu.format(), &target)?;

        Ok(Self {
            blas: scene_buffer.blas_handles(),
            scene_buffer,
            skybox,
            trace,
            display,
            target,
            trace_bind_group,
        })
    }

    fn recreate_target(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.target = TraceTarget::new(device, width, height);
        self.trace_bind_group = self.trace.create_bind_group(device, &self.target, &self.scene_buffer, &self.skybox);
        self.display.rebind(device, &self.target);
    }
}

/// Drives one frame at a time through the state machine in [`RendererState`]
pub struct Renderer {
    state: RendererState,
    settings: FrameSettings,
    resources: Option<FrameResources>,
    frame_index: u32,
}

impl Renderer {
    /// Uninitialized renderer; call [`initialize`](Self::initialize) before rendering
    pub fn uninitialized(config: &BenchConfig) -> Self {
        Self {
            state: RendererState::Uninitialized,
            settings: FrameSettings::from_config(config),
            resources: None,
            frame_index: 0,
        }
    }

    /// Create and initialize in one step
    pub fn new(gpu: &GpuContext, scene: &Scene, config: &BenchConfig) -> Result<Self> {
        let mut renderer = Self::uninitialized(config);
        renderer.initialize(gpu, scene, config)?;
        Ok(renderer)
    }

    /// Build BLAS data, lay out the scene buffer and compile pipelines
    ///
    /// On failure the renderer is left `Failed`.
    pub fn initialize(&mut self, gpu: &GpuContext, scene: &Scene, config: &BenchConfig) -> Result<()> {
        self.state.transition(RendererState::Initializing)?;
        let start = Instant::now();

        let created = capture_validation(&gpu.device, || FrameResources::create(gpu, scene, config, &self.settings))
            .map_err(|e| Error::Gpu(e.to_string()))
            .and_then(|resources| resources);
        match created {
            Ok(resources) => {
                self.resources = Some(resources);
                self.state.transition(RendererState::Ready)?;
                log::info!(
                    "Renderer ready in {:.1} ms ({} dispatches/frame, lightweight: {})",
                    start.elapsed().as_secs_f64() * 1000.0,
                    self.settings.dispatches_per_frame,
                    self.settings.lightweight
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Renderer initialization failed: {}", e);
                self.state.transition(RendererState::Failed)?;
                Err(e)
            }
        }
    }

    /// Render one frame into `target` and return its CPU-side time in ms
    ///
    /// Steps the simulation by `dt`, rebuilds the TLAS, uploads the per-frame
    /// partitions, traces and draws the fullscreen pass, then submits.
    /// Validation errors raised while recording or submitting fail the frame
    /// and leave the renderer `Ready`.
    pub fn render_frame(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        dt: f32,
        target: &wgpu::TextureView,
    ) -> Result<f32> {
        self.state.transition(RendererState::Updating)?;
        let start = Instant::now();

        let Some(resources) = self.resources.as_mut() else {
            self.state.transition(RendererState::Failed)?;
            return Err(Error::Gpu("renderer has no frame resources".to_string()));
        };

        scene.step(dt);

        let instances = match build_instances(scene, &resources.blas, self.settings.max_instances) {
            Ok(instances) => instances,
            Err(e) => {
                // Nothing was recorded; the next frame may succeed
                self.state.transition(RendererState::Ready)?;
                return Err(e);
            }
        };

        let (tw, th) = resources.target.size();
        let uniform = SceneUniform::new(&scene.camera, (tw, th), self.settings.max_bounces, self.frame_index, scene.time());
        let settings = self.settings;

        let recorded = capture_validation(&gpu.device, || {
            resources.scene_buffer.update_instances(&gpu.queue, &instances);
            resources.scene_buffer.update_uniform(&gpu.queue, uniform);

            let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
            resources.trace.dispatch(
                &mut encoder,
                &resources.trace_bind_group,
                tw,
                th,
                settings.dispatches_per_frame,
            );
            resources.display.blit(&mut encoder, target);
            gpu.queue.submit(std::iter::once(encoder.finish()));
        });
        if let Err(e) = recorded {
            // The device rejected the frame; the next one starts clean
            self.state.transition(RendererState::Ready)?;
            return Err(Error::Gpu(format!("frame {} rejected: {}", self.frame_index, e)));
        }
        self.state.transition(RendererState::Submitted)?;

        self.frame_index = self.frame_index.wrapping_add(1);
        let frame_ms = start.elapsed().as_secs_f32() * 1000.0;
        log::trace!(
            "Frame {}: {} instances, {} TLAS nodes, {:.3} ms",
            self.frame_index,
            resources.scene_buffer.instance_count(),
            resources.scene_buffer.tlas_node_count(),
            frame_ms
        );

        self.state.transition(RendererState::Ready)?;
        Ok(frame_ms)
    }

    /// Render one frame to the window surface and present it
    pub fn render_to_surface(&mut self, gpu: &GpuContext, scene: &mut Scene, dt: f32) -> Result<f32> {
        let start = Instant::now();
        let output = gpu.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.render_frame(gpu, scene, dt, &view)?;
        output.present();
        Ok(start.elapsed().as_secs_f32() * 1000.0)
    }

    /// Recreate the trace image for a new output size
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (tw, th) = self.settings.trace_resolution(width, height);
        if let Some(resources) = self.resources.as_mut() {
            if resources.target.size() != (tw, th) {
                log::debug!("Trace target resized to {}x{}", tw, th);
                resources.recreate_target(&gpu.device, tw, th);
            }
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn settings(&self) -> FrameSettings {
        self.settings
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Live TLAS node count from the last frame (0 when the scene is empty)
    pub fn tlas_node_count(&self) -> u32 {
        self.resources.as_ref().map_or(0, |r| r.scene_buffer.tlas_node_count())
    }

    /// Trace image size, if initialized
    pub fn trace_size(&self) -> Option<(u32, u32)> {
        self.resources.as_ref().map(|r| r.target.size())
    }
}

/// One descriptor per live object, bound to its mesh's BLAS
pub fn build_instances(scene: &Scene, blas: &[BlasHandle], max_instances: u32) -> Result<Vec<InstanceDescriptor>> {
    if scene.objects.len() > max_instances as usize {
        return Err(Error::Geometry(format!(
            "{} objects exceed the instance capacity of {}",
            scene.objects.len(),
            max_instances
        )));
    }

    scene
        .objects
        .iter()
        .map(|object| {
            let handle = blas
                .get(object.mesh)
                .ok_or_else(|| Error::Geometry(format!("object references missing mesh {}", object.mesh)))?;
            let color = scene.meshes.get(object.mesh).map_or(glam::Vec3::ONE, |m| m.color);
            Ok(InstanceDescriptor::for_blas(object.transform(), handle, color))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BvhBuilder;
    use crate::render::buffer::mesh_offsets;

    /// Handles as the scene buffer would lay them out, without a device
    fn slots_for(scene: &Scene) -> Vec<BlasHandle> {
        let blases: Vec<_> = scene.meshes.iter().map(BvhBuilder::build_mesh).collect();
        blases
            .iter()
            .zip(mesh_offsets(&blases))
            .map(|(bvh, offsets)| BlasHandle {
                root: offsets.node,
                bounds: bvh.root_bounds(),
            })
            .collect()
    }

    #[test]
    fn test_lightweight_settings() {
        let full = FrameSettings::from_config(&BenchConfig::default());
        assert_eq!(full.dispatches_per_frame, 2);
        assert_eq!(full.trace_resolution(1280, 720), (1280, 720));

        let light = FrameSettings::from_config(&BenchConfig { lightweight: true, ..Default::default() });
        assert_eq!(light.dispatches_per_frame, 1);
        assert_eq!(light.trace_resolution(1280, 720), (640, 360));
        assert_eq!(light.trace_resolution(1, 1), (1, 1));
    }

    #[test]
    fn test_capacity_covers_object_count() {
        let settings = FrameSettings::from_config(&BenchConfig {
            object_count: 1000,
            max_instances: 10,
            ..Default::default()
        });
        assert_eq!(settings.max_instances, 1000);
    }

    #[test]
    fn test_build_instances_uses_mesh_slots() {
        let scene = Scene::benchmark(&BenchConfig { object_count: 12, ..Default::default() });
        let slots = slots_for(&scene);
        let instances = build_instances(&scene, &slots, 12).unwrap();
        assert_eq!(instances.len(), 12);
        for (instance, object) in instances.iter().zip(&scene.objects) {
            assert_eq!(instance.blas_root, slots[object.mesh].root);
            assert_eq!(instance.color, scene.meshes[object.mesh].color);
            assert!(!instance.world_bounds().is_empty());
        }
    }

    #[test]
    fn test_build_instances_rejects_overflow() {
        let scene = Scene::benchmark(&BenchConfig { object_count: 5, ..Default::default() });
        let slots = slots_for(&scene);
        assert!(matches!(build_instances(&scene, &slots, 4), Err(Error::Geometry(_))));
    }

    #[test]
    fn test_empty_scene_has_no_instances() {
        let scene = Scene::benchmark(&BenchConfig { object_count: 0, ..Default::default() });
        let instances = build_instances(&scene, &slots_for(&scene), 1).unwrap();
        assert!(instances.is_empty());
        assert!(BvhBuilder::build(&[]).is_empty());
    }

    #[test]
    fn test_uninitialized_renderer_rejects_frames() {
        let renderer = Renderer::uninitialized(&BenchConfig::default());
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert_eq!(renderer.tlas_node_count(), 0);
        assert_eq!(renderer.trace_size(), None);
    }
}
