//! Benchmark scene: mesh library, moving objects and an orbiting camera

pub mod object;

use glam::Vec3;

use crate::core::camera::Camera;
use crate::core::config::BenchConfig;
use crate::geometry::{load_mesh_or_placeholder, procedural, Mesh};
use crate::math::Aabb;

pub use object::{SceneObject, SceneRng};

/// Longest simulation step; larger frame times are split into several steps
const MAX_STEP_SECS: f32 = 1.0 / 30.0;

/// Camera orbit speed in rad/s
const ORBIT_SPEED: f32 = 0.15;

/// Colors handed out to meshes in library order
const PALETTE: [Vec3; 6] = [
    Vec3::new(0.90, 0.30, 0.25),
    Vec3::new(0.25, 0.60, 0.90),
    Vec3::new(0.95, 0.80, 0.30),
    Vec3::new(0.40, 0.85, 0.45),
    Vec3::new(0.80, 0.45, 0.90),
    Vec3::new(0.90, 0.90, 0.90),
];

/// The simulated world traced every frame
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub objects: Vec<SceneObject>,
    pub camera: Camera,
    arena: Aabb,
    time: f32,
}

impl Scene {
    pub fn new(meshes: Vec<Mesh>, camera: Camera, arena: Aabb) -> Self {
        Self {
            meshes,
            objects: Vec::new(),
            camera,
            arena,
            time: 0.0,
        }
    }

    /// Scene described by `config`: meshes from disk or the built-in set,
    /// `object_count` seeded objects and a camera framing the arena
    pub fn benchmark(config: &BenchConfig) -> Self {
        let meshes = if config.mesh_paths.is_empty() {
            vec![
                procedural::icosphere(3, PALETTE[0]),
                procedural::cube(PALETTE[1]).normalized(2.0),
                procedural::icosphere(1, PALETTE[2]),
            ]
        } else {
            config
                .mesh_paths
                .iter()
                .enumerate()
                .map(|(i, path)| load_mesh_or_placeholder(path, PALETTE[i % PALETTE.len()]))
                .collect()
        };

        let half = (config.object_count as f32).sqrt().mul_add(2.0, 6.0);
        let arena = Aabb::new(Vec3::new(-half, 0.0, -half), Vec3::new(half, 6.0, half));

        let mut camera = Camera::new(Vec3::ZERO, 60.0, config.width as f32 / config.height.max(1) as f32);
        camera.far = 10.0 * half;

        let mut scene = Self::new(meshes, camera, arena);
        scene.spawn_objects(config.object_count, config.seed);
        scene.update_camera();

        log::info!(
            "Scene: {} meshes ({} triangles), {} objects, arena half-size {:.1}",
            scene.meshes.len(),
            scene.triangle_count(),
            scene.objects.len(),
            half
        );
        scene
    }

    /// Add `count` objects placed from `seed`; the same seed gives the same objects
    pub fn spawn_objects(&mut self, count: u32, seed: u64) {
        if self.meshes.is_empty() {
            log::warn!("Scene has no meshes; not spawning {} objects", count);
            return;
        }

        let mut rng = SceneRng::new(seed);
        let bounds: Vec<Aabb> = self.meshes.iter().map(Mesh::bounds).collect();
        for _ in 0..count {
            let mesh = rng.below(self.meshes.len());
            self.objects.push(SceneObject::random(&mut rng, mesh, &bounds[mesh], &self.arena));
        }
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        let mut remaining = dt.max(0.0);
        while remaining > 0.0 {
            let h = remaining.min(MAX_STEP_SECS);
            for object in &mut self.objects {
                object.step(h, &self.arena);
            }
            self.time += h;
            remaining -= h;
        }
        self.update_camera();
    }

    fn update_camera(&mut self) {
        let half = self.arena.extent().x * 0.5;
        let angle = self.time * ORBIT_SPEED;
        let center = self.arena.centroid();
        let radius = half * 1.6;
        self.camera.position = Vec3::new(
            center.x + radius * angle.cos(),
            self.arena.max.y + half * 0.5,
            center.z + radius * angle.sin(),
        );
        self.camera.point_at(Vec3::new(center.x, 0.0, center.z), Vec3::Y);
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn arena(&self) -> Aabb {
        self.arena
    }

    /// Triangles in the mesh library (each BLAS is built once)
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(objects: u32) -> BenchConfig {
        BenchConfig {
            object_count: objects,
            ..Default::default()
        }
    }

    #[test]
    fn test_benchmark_scene_is_deterministic() {
        let a = Scene::benchmark(&config(16));
        let b = Scene::benchmark(&config(16));
        assert_eq!(a.objects.len(), 16);
        assert_eq!(a.objects, b.objects);

        let c = Scene::benchmark(&BenchConfig { seed: 99, ..config(16) });
        assert_ne!(a.objects, c.objects);
    }

    #[test]
    fn test_zero_objects() {
        let mut scene = Scene::benchmark(&config(0));
        assert!(scene.objects.is_empty());
        assert_eq!(scene.meshes.len(), 3);
        scene.step(0.5);
        assert!((scene.time() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_step_keeps_objects_in_arena() {
        let mut scene = Scene::benchmark(&config(32));
        let arena = scene.arena();
        for _ in 0..120 {
            scene.step(0.05);
        }
        // A long frame is split into bounded steps
        scene.step(2.0);
        for obj in &scene.objects {
            let inner = Aabb::new(arena.min + obj.radius - 1e-3, arena.max - obj.radius + 1e-3);
            assert!(inner.contains_point(obj.position), "{:?} left the arena", obj.position);
        }
    }

    #[test]
    fn test_camera_orbits_and_looks_at_center() {
        let mut scene = Scene::benchmark(&config(4));
        let before = scene.camera.position;
        scene.step(3.0);
        assert_ne!(scene.camera.position, before);

        let to_center = (Vec3::new(0.0, 0.0, 0.0) - scene.camera.position).normalize();
        assert!(scene.camera.forward().dot(to_center) > 0.999);
    }

    #[test]
    fn test_missing_mesh_path_uses_placeholder() {
        let scene = Scene::benchmark(&BenchConfig {
            mesh_paths: vec!["/nonexistent/model.obj".into()],
            ..config(2)
        });
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].name, "placeholder");
        assert!(scene.objects.iter().all(|o| o.mesh == 0));
    }
}
