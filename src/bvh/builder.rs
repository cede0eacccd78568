//! Object-median BVH construction

use glam::Vec3;

use super::{Bvh, GpuBvhNode};
use crate::geometry::Mesh;
use crate::math::Aabb;

/// Maximum primitives per leaf
const LEAF_SIZE: usize = 1;

/// Builds a [`Bvh`] from leaf bounds
///
/// Nodes live in an arena addressed by index. Children are always pushed as
/// an adjacent pair, so the arena order is already the flattened order.
pub struct BvhBuilder {
    leaf_bounds: Vec<Aabb>,
    centroids: Vec<Vec3>,
    /// Primitive handles, permuted in place; becomes the index sequence
    handles: Vec<u32>,
    nodes: Vec<GpuBvhNode>,
}

impl BvhBuilder {
    fn new(leaves: &[Aabb]) -> Self {
        Self {
            leaf_bounds: leaves.to_vec(),
            centroids: leaves.iter().map(Aabb::centroid).collect(),
            handles: (0..leaves.len() as u32).collect(),
            nodes: Vec::with_capacity(leaves.len() * 2),
        }
    }

    /// Build a hierarchy over `leaves`
    ///
    /// For `N > 0` leaves the result has exactly `2N - 1` nodes and `N`
    /// indices. An empty input yields the empty hierarchy.
    pub fn build(leaves: &[Aabb]) -> Bvh {
        if leaves.is_empty() {
            return Bvh::empty();
        }

        let mut builder = Self::new(leaves);
        builder.nodes.push(GpuBvhNode::default());
        builder.subdivide(0, 0, leaves.len());

        Bvh {
            nodes: builder.nodes,
            indices: builder.handles,
        }
    }

    /// Build a bottom-level hierarchy over a mesh's triangles
    pub fn build_mesh(mesh: &Mesh) -> Bvh {
        Self::build(&mesh.triangle_bounds())
    }

    fn subdivide(&mut self, node_idx: usize, first: usize, count: usize) {
        let bounds = self.group_bounds(first, count);

        if count <= LEAF_SIZE {
            self.nodes[node_idx] = GpuBvhNode::leaf(&bounds, first as u32, count as u32);
            return;
        }

        let axis = self.split_axis(first, count);
        let centroids = &self.centroids;
        self.handles[first..first + count].sort_by(|&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });

        // Median split keeps both halves non-empty even for coincident centroids
        let mid = count / 2;

        let left = self.nodes.len();
        self.nodes.push(GpuBvhNode::default());
        self.nodes.push(GpuBvhNode::default());
        self.nodes[node_idx] = GpuBvhNode::internal(&bounds, left as u32, left as u32 + 1);

        self.subdivide(left, first, mid);
        self.subdivide(left + 1, first + mid, count - mid);
    }

    fn group_bounds(&self, first: usize, count: usize) -> Aabb {
        let mut bounds = Aabb::empty();
        for &h in &self.handles[first..first + count] {
            bounds.expand(&self.leaf_bounds[h as usize]);
        }
        bounds
    }

    /// Longest axis of the centroid bound (not the primitive bound)
    fn split_axis(&self, first: usize, count: usize) -> usize {
        let mut centroid_bounds = Aabb::empty();
        for &h in &self.handles[first..first + count] {
            centroid_bounds.expand_point(self.centroids[h as usize]);
        }
        centroid_bounds.largest_axis()
    }
}
