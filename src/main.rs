//! Raybench - real-time BVH ray tracing GPU benchmark

use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use raybench::bench::{BenchmarkSession, FrameSample, SessionPhase, Submission};
use raybench::core::{logging, time::FrameTimer, BenchConfig, Error};
use raybench::render::{GpuContext, Renderer, RendererState};
use raybench::scene::Scene;

/// Frames between progress log lines
const PROGRESS_INTERVAL: u64 = 240;

struct App {
    config: BenchConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    renderer: Option<Renderer>,
    scene: Option<Scene>,
    session: BenchmarkSession,
    timer: FrameTimer,
    gpu_name: String,
    error: Option<Error>,
}

impl App {
    fn new(config: BenchConfig) -> Self {
        Self {
            session: BenchmarkSession::new(&config),
            config,
            window: None,
            gpu: None,
            renderer: None,
            scene: None,
            timer: FrameTimer::new(),
            gpu_name: String::new(),
            error: None,
        }
    }

    /// Window, device, scene and renderer
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let window_attrs = Window::default_attributes()
            .with_title("Raybench")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| Error::Window(e.to_string()))?,
        );

        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;
        let (width, height) = gpu.size();
        log::info!("Window created: {}x{}", width, height);
        log::info!("GPU: {}", gpu.gpu_name());

        let mut scene = Scene::benchmark(&self.config);
        scene.camera.set_aspect(width as f32, height as f32);
        let renderer = Renderer::new(&gpu, &scene, &self.config)?;

        self.gpu_name = gpu.gpu_name();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.scene = Some(scene);
        self.renderer = Some(renderer);
        self.timer = FrameTimer::new();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(gpu), Some(renderer), Some(scene)) = (&mut self.gpu, &mut self.renderer, &mut self.scene) else {
            return;
        };

        self.timer.tick();
        let dt = self.timer.delta_secs();

        let outcome = renderer.render_to_surface(gpu, scene, dt);
        if let Err(e) = &outcome {
            log::warn!("Frame {} failed: {}", self.timer.frame_count(), e);
            // Lost or outdated surfaces recover after a reconfigure
            let (w, h) = gpu.size();
            gpu.resize(w, h);
        }
        let sample = FrameSample::from_outcome(&outcome, self.timer.delta());

        if renderer.state() == RendererState::Failed {
            log::error!("Renderer failed, aborting benchmark");
            self.session.abort();
        } else {
            self.session.record(sample);
        }

        if self.timer.frame_count() % PROGRESS_INTERVAL == 0 {
            let fps = self.timer.fps_window(Duration::from_secs(2));
            log::info!(
                "Progress {:.0}%: {:.1} fps (min {:.1}, max {:.1})",
                self.session.progress() * 100.0,
                fps.avg,
                fps.min,
                fps.max
            );
        }

        if self.session.is_done() {
            event_loop.exit();
        }
    }

    /// Score the run and build the submission
    fn finish(self) -> Result<Submission, Error> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.session.phase() == SessionPhase::Aborted {
            return Err(Error::Aborted);
        }
        let score = self.session.score()?;
        log::info!(
            "Score {} ({:.1} fps, {:.2} ms/frame over {} measurements, {} failed frames)",
            score.score,
            score.fps,
            score.avg_frame_ms,
            score.samples,
            self.session.failed_frames()
        );
        Ok(Submission::new(&self.config.username, self.gpu_name, &score))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }

        if let Err(e) = self.init(event_loop) {
            log::error!("Initialization failed: {}", e);
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.session.abort();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(gpu) = &mut self.gpu {
                        gpu.resize(size.width, size.height);
                        if let Some(scene) = &mut self.scene {
                            scene.camera.set_aspect(size.width as f32, size.height as f32);
                        }
                        if let Some(renderer) = &mut self.renderer {
                            renderer.resize(gpu, size.width, size.height);
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    logging::init();
    log::info!("Raybench starting...");

    let args: Vec<String> = std::env::args().collect();
    let config = match BenchConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    log::info!(
        "Config: {}x{}, {} objects, {:.0}s, lightweight: {}",
        config.width, config.height, config.object_count, config.duration_secs, config.lightweight
    );

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }

    match app.finish().and_then(|submission| submission.to_json()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Benchmark did not produce a score: {}", e);
            std::process::exit(1);
        }
    }
}
