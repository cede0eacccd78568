//! GPU buffer management

pub mod partition;
pub mod partitioned;
pub mod scene_buffer;

pub use partition::{
    AlignmentLimits, CoarseId, CoarsePartition, FineId, FinePartition, PartitionLayout,
    MAX_UPLOAD_CHUNK_BYTES,
};
pub use partitioned::PartitionedBuffer;
pub use scene_buffer::{mesh_offsets, MeshSlot, SceneBuffer, SceneCapacity, SceneUniform, SCENE_STORAGE_BINDINGS};
