//! Bounding volume hierarchies in the layout read by the trace shader
//!
//! Both levels (per-mesh BLAS over triangles, per-frame TLAS over instances)
//! share one node format. A node is 32 bytes:
//!
//! | field       | internal node        | leaf node                         |
//! |-------------|----------------------|-----------------------------------|
//! | `min`       | bound min            | bound min                         |
//! | `control_a` | left child index     | first offset into `indices`       |
//! | `max`       | bound max            | bound max                         |
//! | `control_b` | right child index    | `-(primitive count)`              |
//!
//! `control_b < 0` marks a leaf. Child indices are always positive because
//! the root (index 0) is never a child.

pub mod builder;
pub mod instance;

use bytemuck::{Pod, Zeroable};

use crate::math::Aabb;

pub use builder::BvhBuilder;
pub use instance::{BlasHandle, GpuInstance, InstanceDescriptor, INSTANCE_FLOATS};

/// Number of f32 values in one `GpuBvhNode`
pub const NODE_FLOATS: usize = std::mem::size_of::<GpuBvhNode>() / 4;

/// Flattened BVH node (32 bytes, matches WGSL `BvhNode`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub min: [f32; 3],
    pub control_a: i32,
    pub max: [f32; 3],
    pub control_b: i32,
}

impl GpuBvhNode {
    /// Internal node referencing two children
    pub fn internal(bounds: &Aabb, left: u32, right: u32) -> Self {
        Self {
            min: bounds.min.to_array(),
            control_a: left as i32,
            max: bounds.max.to_array(),
            control_b: right as i32,
        }
    }

    /// Leaf node covering `count` entries of the index sequence starting at `first`
    pub fn leaf(bounds: &Aabb, first: u32, count: u32) -> Self {
        Self {
            min: bounds.min.to_array(),
            control_a: first as i32,
            max: bounds.max.to_array(),
            control_b: -(count as i32),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.control_b < 0
    }

    /// Primitive count of a leaf, 0 for internal nodes
    pub fn primitive_count(&self) -> u32 {
        if self.is_leaf() {
            self.control_b.unsigned_abs()
        } else {
            0
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.min.into(), self.max.into())
    }
}

/// Global offsets used to embed a locally built BVH in shared buffers
///
/// `node` is added to internal child references, `index` to leaf first-index
/// offsets and `primitive` to the values of the index sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhOffsets {
    pub node: u32,
    pub index: u32,
    pub primitive: u32,
}

impl BvhOffsets {
    pub fn new(node: u32, index: u32, primitive: u32) -> Self {
        Self { node, index, primitive }
    }

    /// Encode as a fine partition payload
    pub fn to_payload(self) -> Vec<u32> {
        vec![self.node, self.index, self.primitive]
    }

    /// Decode from a fine partition payload; missing entries read as 0
    pub fn from_payload(payload: &[u32]) -> Self {
        let get = |i: usize| payload.get(i).copied().unwrap_or(0);
        Self {
            node: get(0),
            index: get(1),
            primitive: get(2),
        }
    }
}

/// A built hierarchy with local (0-based) references
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bvh {
    /// Nodes in flattened order, root first
    pub nodes: Vec<GpuBvhNode>,
    /// Primitive remap referenced by leaves
    pub indices: Vec<u32>,
}

impl Bvh {
    /// The valid empty hierarchy: nothing to traverse
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Bound of the whole hierarchy (empty box for an empty BVH)
    pub fn root_bounds(&self) -> Aabb {
        self.nodes.first().map(GpuBvhNode::bounds).unwrap_or_else(Aabb::empty)
    }

    /// Nodes re-based for placement at `offsets` inside shared buffers
    pub fn flattened_nodes(&self, offsets: BvhOffsets) -> Vec<GpuBvhNode> {
        self.nodes
            .iter()
            .map(|node| {
                let mut out = *node;
                if node.is_leaf() {
                    out.control_a += offsets.index as i32;
                } else {
                    out.control_a += offsets.node as i32;
                    out.control_b += offsets.node as i32;
                }
                out
            })
            .collect()
    }

    /// Index sequence re-based for placement at `offsets`
    pub fn flattened_indices(&self, offsets: BvhOffsets) -> Vec<u32> {
        self.indices.iter().map(|&i| i + offsets.primitive).collect()
    }
}
