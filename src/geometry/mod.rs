//! Triangle meshes consumed by the BVH builder

pub mod obj;
pub mod procedural;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::math::Aabb;

pub use obj::{load_obj, load_mesh_or_placeholder, parse_obj};

/// A triangle with per-corner positions and normals
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub positions: [Vec3; 3],
    pub normals: [Vec3; 3],
}

impl Triangle {
    /// Triangle with the geometric normal on all three corners
    pub fn flat(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n = (b - a).cross(c - a).normalize_or_zero();
        Self {
            positions: [a, b, c],
            normals: [n; 3],
        }
    }

    /// Bounding box of the three corners
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions)
    }

    /// GPU layout of this triangle
    pub fn to_gpu(&self) -> GpuTriangle {
        GpuTriangle {
            positions: self.positions.map(|p| p.extend(1.0).to_array()),
            normals: self.normals.map(|n| n.extend(0.0).to_array()),
        }
    }
}

/// Triangle record read by the trace shader (96 bytes, matches WGSL `Triangle`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuTriangle {
    pub positions: [[f32; 4]; 3],
    pub normals: [[f32; 4]; 3],
}

/// Number of f32 values in one `GpuTriangle`
pub const TRIANGLE_FLOATS: usize = std::mem::size_of::<GpuTriangle>() / 4;

/// Named triangle list with a uniform color
#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub triangles: Vec<Triangle>,
    pub color: Vec3,
}

impl Mesh {
    pub fn new(name: impl Into<String>, triangles: Vec<Triangle>, color: Vec3) -> Self {
        Self {
            name: name.into(),
            triangles,
            color,
        }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Per-triangle bounds, in triangle order (BVH leaves)
    pub fn triangle_bounds(&self) -> Vec<Aabb> {
        self.triangles.iter().map(Triangle::bounds).collect()
    }

    /// Bound of the whole mesh, aggregated from its triangles
    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for tri in &self.triangles {
            aabb.expand(&tri.bounds());
        }
        aabb
    }

    /// GPU triangle records, in triangle order
    pub fn gpu_triangles(&self) -> Vec<GpuTriangle> {
        self.triangles.iter().map(Triangle::to_gpu).collect()
    }

    /// Recenter on the origin and scale the largest dimension to `size`
    pub fn normalized(mut self, size: f32) -> Self {
        let bounds = self.bounds();
        if bounds.is_empty() {
            return self;
        }
        let center = bounds.centroid();
        let max_dim = bounds.extent().max_element();
        let scale = if max_dim > 0.0 { size / max_dim } else { 1.0 };

        for tri in &mut self.triangles {
            for p in &mut tri.positions {
                *p = (*p - center) * scale;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_triangle_size() {
        assert_eq!(std::mem::size_of::<GpuTriangle>(), 96);
        assert_eq!(TRIANGLE_FLOATS, 24);
    }

    #[test]
    fn test_flat_triangle_normal() {
        let tri = Triangle::flat(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert_eq!(tri.normals[0], Vec3::Z);
        assert_eq!(tri.bounds(), Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_mesh_bounds_and_normalize() {
        let mesh = Mesh::new(
            "pair",
            vec![
                Triangle::flat(Vec3::ZERO, Vec3::X, Vec3::Y),
                Triangle::flat(Vec3::new(4.0, 0.0, 0.0), Vec3::new(4.0, 2.0, 0.0), Vec3::new(3.0, 0.0, 1.0)),
            ],
            Vec3::ONE,
        );
        assert_eq!(mesh.bounds(), Aabb::new(Vec3::ZERO, Vec3::new(4.0, 2.0, 1.0)));

        let normalized = mesh.normalized(2.0);
        let b = normalized.bounds();
        assert!((b.extent().max_element() - 2.0).abs() < 1e-5);
        assert!(b.centroid().abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_empty_mesh_bounds() {
        let mesh = Mesh::new("empty", Vec::new(), Vec3::ONE);
        assert!(mesh.bounds().is_empty());
        assert!(mesh.normalized(1.0).triangles.is_empty());
    }
}
