//! Host-side layout of a partitioned device buffer
//!
//! A shared device buffer is split into *coarse* partitions, each an
//! independently aligned resource (uniforms, BVH nodes, ...). A coarse
//! partition can be further split into *fine* partitions, bump-allocated in
//! f32 elements, e.g. one mesh's nodes inside the shared node partition.
//!
//! Every coarse partition has a host shadow (`Vec<f32>`) that `blit_*` calls
//! write into. Integer data is stored bit-reinterpreted. Offset and bounds
//! violations are caller bugs and panic.

/// Largest single write issued to the device queue
pub const MAX_UPLOAD_CHUNK_BYTES: usize = 15 * 1024 * 1024;

/// Minimum offset alignments reported by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignmentLimits {
    pub storage: u64,
    pub uniform: u64,
}

impl AlignmentLimits {
    pub fn from_limits(limits: &wgpu::Limits) -> Self {
        Self {
            storage: limits.min_storage_buffer_offset_alignment as u64,
            uniform: limits.min_uniform_buffer_offset_alignment as u64,
        }
    }
}

impl Default for AlignmentLimits {
    fn default() -> Self {
        Self::from_limits(&wgpu::Limits::default())
    }
}

/// Bytes needed to move `offset` up to the next multiple of `alignment`
pub fn padding_for(offset: u64, alignment: u64) -> u64 {
    assert!(alignment > 0, "alignment must be non-zero");
    (alignment - offset % alignment) % alignment
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CoarseId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FineId(usize);

/// An aligned resource region inside the shared buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoarsePartition {
    /// Byte offset inside the device buffer
    pub offset: u64,
    /// Size in bytes
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

impl CoarsePartition {
    /// Length of the host shadow in f32 elements
    pub fn elements(&self) -> usize {
        (self.size / 4) as usize
    }
}

/// A bump-allocated sub-region of a coarse partition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinePartition {
    pub parent: CoarseId,
    /// Offset in f32 elements, relative to the parent
    pub offset: usize,
    /// Size in f32 elements
    pub size: usize,
    /// Caller-defined offsets, e.g. BVH re-basing offsets
    pub payload: Vec<u32>,
}

/// One queue write produced by [`upload_chunks`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadChunk {
    /// Byte offset into the source data
    pub src_offset: usize,
    /// Byte offset into the device buffer
    pub dst_offset: u64,
    /// Bytes in this chunk
    pub len: usize,
}

/// Split a write of `len` bytes at `dst_offset` into chunks of at most `max_chunk`
pub fn upload_chunks(dst_offset: u64, len: usize, max_chunk: usize) -> Vec<UploadChunk> {
    assert!(max_chunk > 0 && max_chunk % 4 == 0, "chunk size must be a positive multiple of 4");
    let mut chunks = Vec::with_capacity(len.div_ceil(max_chunk));
    let mut src_offset = 0;
    while src_offset < len {
        let chunk_len = (len - src_offset).min(max_chunk);
        chunks.push(UploadChunk {
            src_offset,
            dst_offset: dst_offset + src_offset as u64,
            len: chunk_len,
        });
        src_offset += chunk_len;
    }
    chunks
}

/// Partition bookkeeping and host shadows for one shared buffer
pub struct PartitionLayout {
    limits: AlignmentLimits,
    /// Running end of the last coarse partition, in bytes
    extent: u64,
    usage: wgpu::BufferUsages,
    coarse: Vec<CoarsePartition>,
    fine: Vec<FinePartition>,
    /// Next free element per coarse partition
    fine_cursor: Vec<usize>,
    /// One shadow per coarse partition, allocated by `initialize_host`
    shadows: Option<Vec<Vec<f32>>>,
}

impl PartitionLayout {
    pub fn new(limits: AlignmentLimits) -> Self {
        Self {
            limits,
            extent: 0,
            usage: wgpu::BufferUsages::empty(),
            coarse: Vec::new(),
            fine: Vec::new(),
            fine_cursor: Vec::new(),
            shadows: None,
        }
    }

    pub fn limits(&self) -> AlignmentLimits {
        self.limits
    }

    /// Total bytes covered by all coarse partitions
    pub fn extent(&self) -> u64 {
        self.extent
    }

    /// Union of all requested usages
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.usage
    }

    pub fn is_initialized(&self) -> bool {
        self.shadows.is_some()
    }

    /// Reserve an aligned region at the end of the buffer
    ///
    /// Must be called before [`initialize_host`](Self::initialize_host).
    pub fn add_coarse_partition(&mut self, size_bytes: u64, usage: wgpu::BufferUsages) -> CoarseId {
        assert!(!self.is_initialized(), "coarse partitions must be added before initialization");
        assert!(size_bytes % 4 == 0, "partition size {} is not a multiple of 4", size_bytes);

        let mut offset = self.extent;
        if usage.contains(wgpu::BufferUsages::STORAGE) {
            offset += padding_for(offset, self.limits.storage);
        }
        if usage.contains(wgpu::BufferUsages::UNIFORM) {
            offset += padding_for(offset, self.limits.uniform);
        }

        let id = CoarseId(self.coarse.len());
        self.coarse.push(CoarsePartition { offset, size: size_bytes, usage });
        self.fine_cursor.push(0);
        self.extent = offset + size_bytes;
        self.usage |= usage;

        log::debug!("Coarse partition {:?}: offset={} size={} usage={:?}", id, offset, size_bytes, usage);
        id
    }

    /// Allocate one zeroed host shadow per coarse partition
    pub fn initialize_host(&mut self) {
        assert!(!self.is_initialized(), "partition layout initialized twice");
        self.shadows = Some(self.coarse.iter().map(|c| vec![0.0; c.elements()]).collect());
    }

    pub fn coarse(&self, id: CoarseId) -> &CoarsePartition {
        &self.coarse[id.0]
    }

    pub fn coarse_partitions(&self) -> &[CoarsePartition] {
        &self.coarse
    }

    pub fn fine(&self, id: FineId) -> &FinePartition {
        &self.fine[id.0]
    }

    /// Fine partitions of `parent`, in allocation order
    pub fn fine_partitions_of(&self, parent: CoarseId) -> impl Iterator<Item = (FineId, &FinePartition)> {
        self.fine
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.parent == parent)
            .map(|(i, f)| (FineId(i), f))
    }

    /// Elements of `parent` already handed out to fine partitions
    pub fn fine_used(&self, parent: CoarseId) -> usize {
        self.fine_cursor[parent.0]
    }

    /// Bump-allocate `size_elements` inside `parent`
    pub fn add_fine_partition(&mut self, parent: CoarseId, size_elements: usize, payload: Vec<u32>) -> FineId {
        let capacity = self.shadow(parent).len();
        let offset = self.fine_cursor[parent.0];
        assert!(
            offset + size_elements <= capacity,
            "fine partition of {} elements overflows coarse partition {:?} ({} of {} used)",
            size_elements, parent, offset, capacity
        );

        let id = FineId(self.fine.len());
        self.fine.push(FinePartition { parent, offset, size: size_elements, payload });
        self.fine_cursor[parent.0] = offset + size_elements;
        id
    }

    /// Host shadow of a coarse partition
    pub fn shadow(&self, id: CoarseId) -> &[f32] {
        let shadows = self.shadows.as_ref().expect("partition layout is not initialized");
        &shadows[id.0]
    }

    fn shadow_mut(&mut self, id: CoarseId) -> &mut [f32] {
        let shadows = self.shadows.as_mut().expect("partition layout is not initialized");
        &mut shadows[id.0]
    }

    /// Copy `data` into the coarse partition's shadow at element `offset`
    pub fn blit_to_coarse_partition(&mut self, id: CoarseId, offset: usize, data: &[f32]) {
        let shadow = self.shadow_mut(id);
        assert!(
            offset + data.len() <= shadow.len(),
            "blit of {} elements at {} overflows coarse partition {:?} ({} elements)",
            data.len(), offset, id, shadow.len()
        );
        shadow[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Copy `data` into a fine partition at element `offset` (relative to the fine partition)
    pub fn blit_to_fine_partition(&mut self, id: FineId, offset: usize, data: &[f32]) {
        let fine = &self.fine[id.0];
        assert!(
            offset + data.len() <= fine.size,
            "blit of {} elements at {} overflows fine partition {:?} ({} elements)",
            data.len(), offset, id, fine.size
        );
        let (parent, base) = (fine.parent, fine.offset);
        self.blit_to_coarse_partition(parent, base + offset, data);
    }

    /// Device byte offset and host element range of a whole coarse partition
    pub fn coarse_range(&self, id: CoarseId) -> (u64, std::ops::Range<usize>) {
        let coarse = self.coarse(id);
        (coarse.offset, 0..coarse.elements())
    }

    /// Device byte offset and host element range of a fine partition
    pub fn fine_range(&self, id: FineId) -> (u64, std::ops::Range<usize>) {
        let fine = self.fine(id);
        let coarse = self.coarse(fine.parent);
        (
            coarse.offset + 4 * fine.offset as u64,
            fine.offset..fine.offset + fine.size,
        )
    }
}
