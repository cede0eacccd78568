//! A single device buffer shared by several partitioned resources

use super::partition::{
    upload_chunks, AlignmentLimits, CoarseId, FineId, PartitionLayout, MAX_UPLOAD_CHUNK_BYTES,
};

/// Device buffer plus the host layout and shadows that feed it
///
/// Lifecycle: add coarse partitions, `initialize`, then any number of fine
/// partitions, blits and uploads. Blits only touch host memory; uploads copy
/// host ranges to the device in chunks of at most 15 MiB.
pub struct PartitionedBuffer {
    label: String,
    layout: PartitionLayout,
    buffer: Option<wgpu::Buffer>,
}

impl PartitionedBuffer {
    pub fn new(label: impl Into<String>, limits: AlignmentLimits) -> Self {
        Self {
            label: label.into(),
            layout: PartitionLayout::new(limits),
            buffer: None,
        }
    }

    /// Create with the alignment limits of `device`
    pub fn for_device(label: impl Into<String>, device: &wgpu::Device) -> Self {
        Self::new(label, AlignmentLimits::from_limits(&device.limits()))
    }

    pub fn add_coarse_partition(&mut self, size_bytes: u64, usage: wgpu::BufferUsages) -> CoarseId {
        self.layout.add_coarse_partition(size_bytes, usage)
    }

    /// Create the device buffer and host shadows; capacity is fixed afterwards
    pub fn initialize(&mut self, device: &wgpu::Device) {
        assert!(self.buffer.is_none(), "buffer '{}' initialized twice", self.label);
        self.layout.initialize_host();

        // Zero-sized buffers cannot be bound; keep at least one element
        let size = self.layout.extent().max(4);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size,
            usage: self.layout.usage() | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "Buffer '{}': {} coarse partitions, {} KB, usage {:?}",
            self.label,
            self.layout.coarse_partitions().len(),
            size / 1024,
            self.layout.usage()
        );
        self.buffer = Some(buffer);
    }

    pub fn add_fine_partition(&mut self, parent: CoarseId, size_elements: usize, payload: Vec<u32>) -> FineId {
        self.layout.add_fine_partition(parent, size_elements, payload)
    }

    pub fn blit_to_coarse_partition(&mut self, id: CoarseId, offset: usize, data: &[f32]) {
        self.layout.blit_to_coarse_partition(id, offset, data);
    }

    pub fn blit_to_fine_partition(&mut self, id: FineId, offset: usize, data: &[f32]) {
        self.layout.blit_to_fine_partition(id, offset, data);
    }

    /// Upload a whole coarse partition
    pub fn upload_coarse_partition(&self, queue: &wgpu::Queue, id: CoarseId) {
        let (dst, range) = self.layout.coarse_range(id);
        self.write_range(queue, id, dst, range);
    }

    /// Upload the first `elements` of a coarse partition
    ///
    /// Used for partitions whose live length changes from frame to frame.
    pub fn upload_coarse_partition_prefix(&self, queue: &wgpu::Queue, id: CoarseId, elements: usize) {
        let (dst, range) = self.layout.coarse_range(id);
        assert!(elements <= range.end, "prefix of {} elements exceeds partition {:?}", elements, id);
        self.write_range(queue, id, dst, 0..elements);
    }

    /// Upload one fine partition
    pub fn upload_fine_partition(&self, queue: &wgpu::Queue, id: FineId) {
        let parent = self.layout.fine(id).parent;
        let (dst, range) = self.layout.fine_range(id);
        self.write_range(queue, parent, dst, range);
    }

    fn write_range(&self, queue: &wgpu::Queue, id: CoarseId, dst_offset: u64, range: std::ops::Range<usize>) {
        let buffer = self.buffer();
        let bytes: &[u8] = bytemuck::cast_slice(&self.layout.shadow(id)[range]);
        assert!(
            dst_offset + bytes.len() as u64 <= self.layout.extent(),
            "upload past end of buffer '{}'", self.label
        );

        let chunks = upload_chunks(dst_offset, bytes.len(), MAX_UPLOAD_CHUNK_BYTES);
        if chunks.len() > 1 {
            log::debug!("Buffer '{}': uploading {} bytes in {} chunks", self.label, bytes.len(), chunks.len());
        }
        for chunk in chunks {
            queue.write_buffer(
                buffer,
                chunk.dst_offset,
                &bytes[chunk.src_offset..chunk.src_offset + chunk.len],
            );
        }
    }

    /// Binding over a whole coarse partition
    pub fn binding(&self, id: CoarseId) -> wgpu::BufferBinding<'_> {
        let coarse = self.layout.coarse(id);
        wgpu::BufferBinding {
            buffer: self.buffer(),
            offset: coarse.offset,
            size: wgpu::BufferSize::new(coarse.size),
        }
    }

    pub fn layout(&self) -> &PartitionLayout {
        &self.layout
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The realized device buffer
    pub fn buffer(&self) -> &wgpu::Buffer {
        match &self.buffer {
            Some(buffer) => buffer,
            None => panic!("buffer '{}' used before initialize()", self.label),
        }
    }
}
