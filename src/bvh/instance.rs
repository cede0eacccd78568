//! Two-level binding: mesh BLAS + per-instance transform → TLAS leaf

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::math::Aabb;

/// Number of f32 values in one `GpuInstance`
pub const INSTANCE_FLOATS: usize = std::mem::size_of::<GpuInstance>() / 4;

/// Per-instance record read by the trace shader (96 bytes, matches WGSL `Instance`)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuInstance {
    /// World to object space, used to move rays into the BLAS frame
    pub world_to_object: [[f32; 4]; 4],
    /// Mesh color (rgb), w unused
    pub color: [f32; 4],
    /// Global index of the mesh's BLAS root node
    pub blas_root: i32,
    pub _pad: [i32; 3],
}

/// A mesh BLAS as seen by instances: its global root node and object-space bound
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlasHandle {
    pub root: u32,
    pub bounds: Aabb,
}

/// One live object for the current frame
///
/// Built fresh every frame from the scene and dropped once the TLAS and the
/// instance buffer have been written.
#[derive(Clone, Copy, Debug)]
pub struct InstanceDescriptor {
    /// Object to world transform
    pub transform: Mat4,
    /// Bound of the mesh in object space (its BLAS root bound)
    pub mesh_bounds: Aabb,
    /// Global node index of the mesh's BLAS root
    pub blas_root: u32,
    pub color: Vec3,
}

impl InstanceDescriptor {
    pub fn new(transform: Mat4, mesh_bounds: Aabb, blas_root: u32, color: Vec3) -> Self {
        Self {
            transform,
            mesh_bounds,
            blas_root,
            color,
        }
    }

    /// Instance of the mesh behind `blas`
    pub fn for_blas(transform: Mat4, blas: &BlasHandle, color: Vec3) -> Self {
        Self::new(transform, blas.bounds, blas.root, color)
    }

    /// World-space bound; this is the instance's TLAS leaf
    pub fn world_bounds(&self) -> Aabb {
        self.mesh_bounds.transformed(&self.transform)
    }

    /// GPU record for the instance buffer
    pub fn to_gpu(&self) -> GpuInstance {
        GpuInstance {
            world_to_object: self.transform.inverse().to_cols_array_2d(),
            color: self.color.extend(1.0).to_array(),
            blas_root: self.blas_root as i32,
            _pad: [0; 3],
        }
    }
}
