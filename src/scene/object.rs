//! Moving objects and their deterministic placement

use glam::{Mat4, Quat, Vec3};

use crate::math::Aabb;

/// SplitMix64; small, seedable and stable across platforms
#[derive(Clone, Debug)]
pub struct SceneRng(u64);

impl SceneRng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Uniform in `0..n`; `n` must be non-zero
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    pub fn unit_vector(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(self.range(-1.0, 1.0), self.range(-1.0, 1.0), self.range(-1.0, 1.0));
            let len_sq = v.length_squared();
            if len_sq > 1e-4 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
    }
}

/// One live object: a mesh instance bouncing around the arena
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    /// Index into the scene's mesh library
    pub mesh: usize,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    /// Rotation axis scaled by angular speed (rad/s)
    pub spin: Vec3,
    pub scale: f32,
    /// Bounding sphere radius in world units, used for wall collisions
    pub radius: f32,
}

impl SceneObject {
    /// Random object of `mesh` (with object-space `mesh_bounds`) placed inside `arena`
    pub fn random(rng: &mut SceneRng, mesh: usize, mesh_bounds: &Aabb, arena: &Aabb) -> Self {
        let scale = rng.range(0.4, 1.2);
        let mesh_radius = if mesh_bounds.is_empty() {
            0.0
        } else {
            (mesh_bounds.extent() * 0.5).length()
        };
        let radius = mesh_radius * scale;

        let lo = arena.min + Vec3::splat(radius);
        let hi = (arena.max - Vec3::splat(radius)).max(lo);
        let position = Vec3::new(rng.range(lo.x, hi.x), rng.range(lo.y, hi.y), rng.range(lo.z, hi.z));

        Self {
            mesh,
            position,
            velocity: rng.unit_vector() * rng.range(1.0, 3.0),
            rotation: Quat::from_axis_angle(rng.unit_vector(), rng.range(0.0, std::f32::consts::TAU)),
            spin: rng.unit_vector() * rng.range(0.3, 2.0),
            scale,
            radius,
        }
    }

    /// Object to world transform
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position)
    }

    /// Integrate over `dt` seconds, bouncing off the arena walls
    pub fn step(&mut self, dt: f32, arena: &Aabb) {
        self.position += self.velocity * dt;

        let lo = arena.min + Vec3::splat(self.radius);
        let hi = (arena.max - Vec3::splat(self.radius)).max(lo);
        for axis in 0..3 {
            if self.position[axis] < lo[axis] {
                self.position[axis] = lo[axis];
                self.velocity[axis] = self.velocity[axis].abs();
            } else if self.position[axis] > hi[axis] {
                self.position[axis] = hi[axis];
                self.velocity[axis] = -self.velocity[axis].abs();
            }
        }

        self.rotation = (Quat::from_scaled_axis(self.spin * dt) * self.rotation).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Aabb {
        Aabb::new(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(10.0, 6.0, 10.0))
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = SceneRng::new(42);
        let mut b = SceneRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let mut c = SceneRng::new(43);
        assert_ne!(SceneRng::new(42).next_u64(), c.next_u64());
    }

    #[test]
    fn test_rng_ranges() {
        let mut rng = SceneRng::new(7);
        for _ in 0..1000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f));
            assert!(rng.below(3) < 3);
            assert!((rng.unit_vector().length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_random_object_starts_inside_arena() {
        let mut rng = SceneRng::new(1);
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        for _ in 0..50 {
            let obj = SceneObject::random(&mut rng, 0, &bounds, &arena());
            let inner = Aabb::new(arena().min + obj.radius - 1e-4, arena().max - obj.radius + 1e-4);
            assert!(inner.contains_point(obj.position));
        }
    }

    #[test]
    fn test_step_bounces_off_walls() {
        let mut obj = SceneObject {
            mesh: 0,
            position: Vec3::new(9.0, 3.0, 0.0),
            velocity: Vec3::new(5.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            spin: Vec3::ZERO,
            scale: 1.0,
            radius: 0.5,
        };
        obj.step(1.0, &arena());
        assert_eq!(obj.position.x, 9.5);
        assert!(obj.velocity.x < 0.0);

        for _ in 0..200 {
            obj.step(0.1, &arena());
            assert!(obj.position.x >= -9.5 && obj.position.x <= 9.5);
        }
    }

    #[test]
    fn test_transform_places_mesh() {
        let obj = SceneObject {
            mesh: 0,
            position: Vec3::new(1.0, 2.0, 3.0),
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            spin: Vec3::ZERO,
            scale: 2.0,
            radius: 1.0,
        };
        let p = obj.transform().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 4.0, 5.0));
    }
}
