//! Host culling loop, used when compute is unavailable or not wanted, and as
//! the reference result when cross-checking the kernel.

use crate::core::InstanceStore;
use crate::error::Result;
use crate::render::compactor::CompactedInstances;
use crate::render::culling::{CullOutput, CullingMode, CullingStrategy};
use crate::render::frustum::Frustum;

pub struct CpuCulling {
    bounding_radius: f32,
}

impl CpuCulling {
    pub fn new(bounding_radius: f32) -> Self {
        Self { bounding_radius }
    }

    /// Ids of the visible instances in ascending order.
    pub fn visible_ids(&self, store: &InstanceStore, frustum: &Frustum) -> Vec<u32> {
        store
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| frustum.contains_box(record.center(), self.bounding_radius))
            .map(|(id, _)| id as u32)
            .collect()
    }
}

impl CullingStrategy for CpuCulling {
    fn mode(&self) -> CullingMode {
        CullingMode::Cpu
    }

    fn cull(&mut self, store: &InstanceStore, frustum: &Frustum) -> Result<CullOutput> {
        let mut compacted = CompactedInstances::with_capacity(store.len());
        for (id, record) in store.records().iter().enumerate() {
            if frustum.contains_box(record.center(), self.bounding_radius) {
                compacted.push(id as u32, record);
            }
        }
        tracing::trace!("CPU cull: {}/{} visible", compacted.len(), store.len());
        Ok(CullOutput::Cpu(compacted))
    }
}
