//! Scene resources packed into one partitioned device buffer
//!
//! Partition order (and shader binding order after the output image):
//! scene uniform, BLAS nodes, BLAS indices, triangles, TLAS nodes,
//! TLAS indices, instances.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use wgpu::BufferUsages;

use super::partition::{CoarseId, FineId};
use super::partitioned::PartitionedBuffer;
use crate::bvh::{
    BlasHandle, Bvh, BvhBuilder, BvhOffsets, GpuBvhNode, GpuInstance, InstanceDescriptor, INSTANCE_FLOATS,
    NODE_FLOATS,
};
use crate::core::camera::Camera;
use crate::core::types::Result;
use crate::geometry::{procedural, GpuTriangle, Mesh, TRIANGLE_FLOATS};
use crate::math::Aabb;

/// Number of storage bindings exposed by [`SceneBuffer::storage_bindings`]
pub const SCENE_STORAGE_BINDINGS: usize = 6;

/// Per-frame parameters for the trace shader (must match WGSL `SceneUniform`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SceneUniform {
    /// Inverse view-projection matrix (64 bytes, offset 0)
    pub view_proj_inv: [[f32; 4]; 4],
    /// Camera position, w unused (16 bytes, offset 64)
    pub camera_position: [f32; 4],
    /// Trace image size in pixels (8 bytes, offset 80)
    pub resolution: [u32; 2],
    /// Live TLAS nodes; 0 means nothing to traverse (offset 88)
    pub tlas_node_count: u32,
    /// Live instance records (offset 92)
    pub instance_count: u32,
    pub max_bounces: u32,
    pub frame_index: u32,
    /// Simulation time in seconds
    pub time: f32,
    pub _pad: u32,
}

impl SceneUniform {
    pub fn new(camera: &Camera, resolution: (u32, u32), max_bounces: u32, frame_index: u32, time: f32) -> Self {
        Self {
            view_proj_inv: camera.view_projection_inverse().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            resolution: [resolution.0, resolution.1],
            tlas_node_count: 0,
            instance_count: 0,
            max_bounces,
            frame_index,
            time,
            _pad: 0,
        }
    }
}

/// Element counts the scene buffer reserves room for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCapacity {
    pub blas_nodes: usize,
    pub blas_indices: usize,
    pub triangles: usize,
    pub max_instances: usize,
}

impl SceneCapacity {
    /// Room for every mesh BLAS plus a TLAS over `max_instances` leaves
    pub fn new(blases: &[Bvh], max_instances: u32) -> Self {
        Self {
            blas_nodes: blases.iter().map(Bvh::node_count).sum(),
            blas_indices: blases.iter().map(Bvh::index_count).sum(),
            // One BLAS leaf per triangle
            triangles: blases.iter().map(Bvh::index_count).sum(),
            max_instances: max_instances as usize,
        }
    }

    pub fn tlas_nodes(&self) -> usize {
        (2 * self.max_instances).saturating_sub(1)
    }

    /// Byte sizes of the storage partitions, in binding order
    ///
    /// Every partition holds at least one record so no binding is zero-sized.
    pub fn storage_sizes(&self) -> [u64; SCENE_STORAGE_BINDINGS] {
        let bytes = |count: usize, floats: usize| (count.max(1) * floats * 4) as u64;
        [
            bytes(self.blas_nodes, NODE_FLOATS),
            bytes(self.blas_indices, 1),
            bytes(self.triangles, TRIANGLE_FLOATS),
            bytes(self.tlas_nodes(), NODE_FLOATS),
            bytes(self.max_instances, 1),
            bytes(self.max_instances, INSTANCE_FLOATS),
        ]
    }
}

/// Global offsets of each mesh BLAS when packed back to back
pub fn mesh_offsets(blases: &[Bvh]) -> Vec<BvhOffsets> {
    let mut next = BvhOffsets::default();
    blases
        .iter()
        .map(|bvh| {
            let offsets = next;
            next.node += bvh.node_count() as u32;
            next.index += bvh.index_count() as u32;
            next.primitive += bvh.index_count() as u32;
            offsets
        })
        .collect()
}

/// Where one mesh lives inside the shared buffer
#[derive(Clone, Copy, Debug)]
pub struct MeshSlot {
    pub blas: BlasHandle,
    pub offsets: BvhOffsets,
    pub nodes: FineId,
    pub indices: FineId,
    pub triangles: FineId,
}

/// Meshes as they will be uploaded; a mesh without triangles is swapped
/// for the placeholder so every object still has a BLAS to point at
pub fn drawable_meshes(meshes: &[Mesh]) -> Vec<Cow<'_, Mesh>> {
    meshes
        .iter()
        .map(|mesh| {
            if mesh.triangle_count() == 0 {
                log::warn!("Mesh '{}' has no triangles, using placeholder", mesh.name);
                Cow::Owned(procedural::placeholder())
            } else {
                Cow::Borrowed(mesh)
            }
        })
        .collect()
}

/// Owns the shared scene buffer: static BLAS data plus per-frame TLAS,
/// instances and uniform
pub struct SceneBuffer {
    buffer: PartitionedBuffer,
    uniform: CoarseId,
    blas_nodes: CoarseId,
    blas_indices: CoarseId,
    triangles: CoarseId,
    tlas_nodes: CoarseId,
    tlas_indices: CoarseId,
    instances: CoarseId,
    capacity: SceneCapacity,
    meshes: Vec<MeshSlot>,
    tlas_node_count: u32,
    instance_count: u32,
}

impl SceneBuffer {
    /// Build every mesh BLAS, lay out the buffer and upload the static data
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, meshes: &[Mesh], max_instances: u32) -> Result<Self> {
        let meshes = drawable_meshes(meshes);
        let blases: Vec<Bvh> = meshes.iter().map(|mesh| BvhBuilder::build_mesh(mesh)).collect();

        let capacity = SceneCapacity::new(&blases, max_instances.max(1));
        let [blas_node_bytes, blas_index_bytes, triangle_bytes, tlas_node_bytes, tlas_index_bytes, instance_bytes] =
            capacity.storage_sizes();

        let mut buffer = PartitionedBuffer::for_device("Scene Buffer", device);
        let uniform = buffer.add_coarse_partition(std::mem::size_of::<SceneUniform>() as u64, BufferUsages::UNIFORM);
        let blas_nodes = buffer.add_coarse_partition(blas_node_bytes, BufferUsages::STORAGE);
        let blas_indices = buffer.add_coarse_partition(blas_index_bytes, BufferUsages::STORAGE);
        let triangles = buffer.add_coarse_partition(triangle_bytes, BufferUsages::STORAGE);
        let tlas_nodes = buffer.add_coarse_partition(tlas_node_bytes, BufferUsages::STORAGE);
        let tlas_indices = buffer.add_coarse_partition(tlas_index_bytes, BufferUsages::STORAGE);
        let instances = buffer.add_coarse_partition(instance_bytes, BufferUsages::STORAGE);
        buffer.initialize(device);

        let mut scene = Self {
            buffer,
            uniform,
            blas_nodes,
            blas_indices,
            triangles,
            tlas_nodes,
            tlas_indices,
            instances,
            capacity,
            meshes: Vec::with_capacity(meshes.len()),
            tlas_node_count: 0,
            instance_count: 0,
        };

        for ((mesh, bvh), offsets) in meshes.iter().zip(&blases).zip(mesh_offsets(&blases)) {
            let slot = scene.add_mesh(mesh, bvh, offsets);
            scene.buffer.upload_fine_partition(queue, slot.nodes);
            scene.buffer.upload_fine_partition(queue, slot.indices);
            scene.buffer.upload_fine_partition(queue, slot.triangles);
            scene.meshes.push(slot);
        }

        log::info!(
            "Scene buffer: {} meshes, {} BLAS nodes, {} triangles, {} max instances",
            scene.meshes.len(),
            capacity.blas_nodes,
            capacity.triangles,
            capacity.max_instances
        );
        Ok(scene)
    }

    /// Reserve the mesh's fine partitions and blit its re-based BLAS
    fn add_mesh(&mut self, mesh: &Mesh, bvh: &Bvh, offsets: BvhOffsets) -> MeshSlot {
        let payload = offsets.to_payload();
        let nodes = self.buffer.add_fine_partition(self.blas_nodes, bvh.node_count() * NODE_FLOATS, payload.clone());
        let indices = self.buffer.add_fine_partition(self.blas_indices, bvh.index_count(), payload.clone());
        let triangles = self.buffer.add_fine_partition(self.triangles, mesh.triangle_count() * TRIANGLE_FLOATS, payload);

        let layout = self.buffer.layout();
        debug_assert_eq!(layout.fine(nodes).offset, offsets.node as usize * NODE_FLOATS);
        debug_assert_eq!(layout.fine(indices).offset, offsets.index as usize);
        debug_assert_eq!(layout.fine(triangles).offset, offsets.primitive as usize * TRIANGLE_FLOATS);

        let flat_nodes: Vec<GpuBvhNode> = bvh.flattened_nodes(offsets);
        let flat_indices = bvh.flattened_indices(offsets);
        let gpu_triangles: Vec<GpuTriangle> = mesh.gpu_triangles();
        self.buffer.blit_to_fine_partition(nodes, 0, bytemuck::cast_slice(&flat_nodes));
        self.buffer.blit_to_fine_partition(indices, 0, bytemuck::cast_slice(&flat_indices));
        self.buffer.blit_to_fine_partition(triangles, 0, bytemuck::cast_slice(&gpu_triangles));

        log::debug!(
            "Mesh '{}': {} triangles, BLAS root {} ({:?})",
            mesh.name, mesh.triangle_count(), offsets.node, offsets
        );

        MeshSlot {
            blas: BlasHandle {
                root: offsets.node,
                bounds: bvh.root_bounds(),
            },
            offsets,
            nodes,
            indices,
            triangles,
        }
    }

    /// Rebuild the TLAS over `instances` and upload it with the instance records
    ///
    /// Only the live prefix of each per-frame partition is uploaded.
    pub fn update_instances(&mut self, queue: &wgpu::Queue, instances: &[InstanceDescriptor]) -> Bvh {
        assert!(
            instances.len() <= self.capacity.max_instances,
            "{} instances exceed the reserved capacity of {}",
            instances.len(), self.capacity.max_instances
        );

        let leaves: Vec<Aabb> = instances.iter().map(InstanceDescriptor::world_bounds).collect();
        let tlas = BvhBuilder::build(&leaves);
        let records: Vec<GpuInstance> = instances.iter().map(InstanceDescriptor::to_gpu).collect();

        let offsets = BvhOffsets::default();
        let nodes = tlas.flattened_nodes(offsets);
        let indices = tlas.flattened_indices(offsets);
        self.buffer.blit_to_coarse_partition(self.tlas_nodes, 0, bytemuck::cast_slice(&nodes));
        self.buffer.blit_to_coarse_partition(self.tlas_indices, 0, bytemuck::cast_slice(&indices));
        self.buffer.blit_to_coarse_partition(self.instances, 0, bytemuck::cast_slice(&records));

        if !tlas.is_empty() {
            self.buffer.upload_coarse_partition_prefix(queue, self.tlas_nodes, nodes.len() * NODE_FLOATS);
            self.buffer.upload_coarse_partition_prefix(queue, self.tlas_indices, indices.len());
            self.buffer.upload_coarse_partition_prefix(queue, self.instances, records.len() * INSTANCE_FLOATS);
        }

        self.tlas_node_count = tlas.node_count() as u32;
        self.instance_count = records.len() as u32;
        log::trace!("TLAS rebuilt: {} instances, {} nodes", self.instance_count, self.tlas_node_count);
        tlas
    }

    /// Upload the scene uniform, stamped with the live TLAS and instance counts
    pub fn update_uniform(&mut self, queue: &wgpu::Queue, mut uniform: SceneUniform) {
        uniform.tlas_node_count = self.tlas_node_count;
        uniform.instance_count = self.instance_count;
        self.buffer.blit_to_coarse_partition(self.uniform, 0, bytemuck::cast_slice(&[uniform]));
        self.buffer.upload_coarse_partition(queue, self.uniform);
    }

    pub fn uniform_binding(&self) -> wgpu::BufferBinding<'_> {
        self.buffer.binding(self.uniform)
    }

    /// Storage bindings in shader order
    pub fn storage_bindings(&self) -> [wgpu::BufferBinding<'_>; SCENE_STORAGE_BINDINGS] {
        [
            self.buffer.binding(self.blas_nodes),
            self.buffer.binding(self.blas_indices),
            self.buffer.binding(self.triangles),
            self.buffer.binding(self.tlas_nodes),
            self.buffer.binding(self.tlas_indices),
            self.buffer.binding(self.instances),
        ]
    }

    pub fn meshes(&self) -> &[MeshSlot] {
        &self.meshes
    }

    /// BLAS handles in mesh library order
    pub fn blas_handles(&self) -> Vec<BlasHandle> {
        self.meshes.iter().map(|slot| slot.blas).collect()
    }

    pub fn capacity(&self) -> SceneCapacity {
        self.capacity
    }

    pub fn tlas_node_count(&self) -> u32 {
        self.tlas_node_count
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn buffer(&self) -> &PartitionedBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_scene_uniform_size() {
        assert_eq!(std::mem::size_of::<SceneUniform>(), 112);
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
    }

    #[test]
    fn test_uniform_from_camera() {
        let camera = Camera::default();
        let uniform = SceneUniform::new(&camera, (640, 360), 3, 7, 1.5);
        assert_eq!(uniform.resolution, [640, 360]);
        assert_eq!(uniform.camera_position, [0.0, 0.0, 5.0, 1.0]);
        assert_eq!(uniform.tlas_node_count, 0);
        assert_eq!(uniform.frame_index, 7);
    }

    #[test]
    fn test_mesh_offsets_are_running_sums() {
        let meshes = [
            procedural::cube(Vec3::ONE),
            procedural::icosphere(0, Vec3::ONE),
            procedural::placeholder(),
        ];
        let blases: Vec<Bvh> = meshes.iter().map(BvhBuilder::build_mesh).collect();
        let offsets = mesh_offsets(&blases);

        assert_eq!(offsets[0], BvhOffsets::default());
        // cube: 12 triangles -> 23 nodes; icosphere(0): 20 triangles -> 39 nodes
        assert_eq!(offsets[1], BvhOffsets::new(23, 12, 12));
        assert_eq!(offsets[2], BvhOffsets::new(23 + 39, 32, 32));
    }

    #[test]
    fn test_capacity_sizes() {
        let blases = vec![BvhBuilder::build_mesh(&procedural::cube(Vec3::ONE))];
        let capacity = SceneCapacity::new(&blases, 4);
        assert_eq!(capacity.tlas_nodes(), 7);
        assert_eq!(
            capacity.storage_sizes(),
            [23 * 32, 12 * 4, 12 * 96, 7 * 32, 4 * 4, 4 * 96]
        );
    }

    #[test]
    fn test_empty_capacity_never_zero_sized() {
        let capacity = SceneCapacity::new(&[], 0);
        assert_eq!(capacity.tlas_nodes(), 0);
        assert!(capacity.storage_sizes().iter().all(|&s| s > 0));
    }

    #[test]
    fn test_empty_mesh_swapped_for_placeholder() {
        let meshes = [
            procedural::cube(Vec3::ONE),
            Mesh::new("empty", Vec::new(), Vec3::ONE),
        ];
        let drawable = drawable_meshes(&meshes);
        assert!(matches!(drawable[0], Cow::Borrowed(_)));
        assert_eq!(drawable[0].triangle_count(), 12);
        assert_eq!(drawable[1].name, "placeholder");
        assert_eq!(drawable[1].triangle_count(), 1);
    }
}
