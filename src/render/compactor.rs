//! Packs visible instances into a dense buffer indexed by draw instance id.

use std::sync::Arc;

use crate::core::{CompactedInstance, InstanceRecord, InstanceStore};
use crate::error::{CullError, Result};
use crate::render::context::GpuContext;
use crate::render::error_scope::{SetupErrorScope, storage_buffer_size};

/// Visible instances in slot order plus the store ids they came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompactedInstances {
    instances: Vec<CompactedInstance>,
    source_ids: Vec<u32>,
}

impl CompactedInstances {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            source_ids: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, id: u32, record: &InstanceRecord) {
        self.instances.push(CompactedInstance::from(record));
        self.source_ids.push(id);
    }

    pub fn instances(&self) -> &[CompactedInstance] {
        &self.instances
    }

    pub fn source_ids(&self) -> &[u32] {
        &self.source_ids
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Resolve visible ids against the store, keeping slot order.
///
/// Every id must address a live record. A bad id means the id buffer is not
/// trustworthy for this frame.
pub fn gather(ids: &[u32], store: &InstanceStore) -> Result<CompactedInstances> {
    let mut compacted = CompactedInstances::with_capacity(ids.len());
    for &id in ids {
        let record = store.get(id).ok_or(CullError::InvalidVisibleId {
            id,
            len: store.len(),
        })?;
        compacted.push(id, record);
    }
    Ok(compacted)
}

/// Destination of the packed instances read by the vertex stage.
pub trait InstanceSink {
    fn capacity(&self) -> usize;

    /// Write `instances` starting at slot 0. Slots past `instances.len()` are
    /// left as they were and must not be read by the draw.
    fn write(&mut self, instances: &[CompactedInstance]) -> Result<()>;
}

/// Storage buffer bound to the instanced draw shader.
pub struct GpuInstanceBuffer {
    gpu: Arc<GpuContext>,
    buffer: wgpu::Buffer,
    capacity: usize,
}

impl GpuInstanceBuffer {
    pub fn new(gpu: Arc<GpuContext>, capacity: usize) -> Result<Self> {
        let size = storage_buffer_size(
            capacity.max(1),
            std::mem::size_of::<CompactedInstance>(),
            &gpu.device.limits(),
        )?;
        let scope = SetupErrorScope::new(&gpu.device, "compacted instance buffer");
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Compacted Instance Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        scope.end()?;
        Ok(Self {
            gpu,
            buffer,
            capacity,
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl InstanceSink for GpuInstanceBuffer {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn write(&mut self, instances: &[CompactedInstance]) -> Result<()> {
        if instances.is_empty() {
            return Ok(());
        }
        self.gpu
            .queue
            .write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        Ok(())
    }
}

impl InstanceSink for Vec<CompactedInstance> {
    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn write(&mut self, instances: &[CompactedInstance]) -> Result<()> {
        self.clear();
        self.extend_from_slice(instances);
        Ok(())
    }
}

pub struct InstanceCompactor {
    sink: Box<dyn InstanceSink>,
    uploaded: usize,
}

impl InstanceCompactor {
    pub fn new(sink: Box<dyn InstanceSink>) -> Self {
        Self { sink, uploaded: 0 }
    }

    /// Upload only the visible prefix. Returns the number of slots written.
    pub fn upload(&mut self, compacted: &CompactedInstances) -> Result<usize> {
        let count = compacted.len();
        if count > self.sink.capacity() {
            return Err(CullError::CapacityExceeded {
                count,
                capacity: self.sink.capacity(),
            });
        }
        self.sink.write(compacted.instances())?;
        self.uploaded = count;
        Ok(count)
    }

    /// Slots valid for the current frame.
    pub fn uploaded(&self) -> usize {
        self.uploaded
    }
}
