//! Culling strategies.
//!
//! The mode is resolved once at startup; every frame goes through the same
//! [`CullingStrategy`] afterwards.

pub mod cpu;
pub mod gpu;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::InstanceStore;
use crate::error::{CullError, Result};
use crate::render::compactor::CompactedInstances;
use crate::render::context::GpuContext;
use crate::render::frustum::Frustum;

pub use cpu::CpuCulling;
pub use gpu::GpuCulling;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CullingMode {
    /// GPU when the adapter supports compute, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl fmt::Display for CullingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CullingMode::Auto => write!(f, "auto"),
            CullingMode::Cpu => write!(f, "cpu"),
            CullingMode::Gpu => write!(f, "gpu"),
        }
    }
}

impl CullingMode {
    /// Pick a concrete mode for this adapter. Never returns `Auto`.
    pub fn resolve(self, gpu: &GpuContext) -> Result<CullingMode> {
        match self {
            CullingMode::Cpu => Ok(CullingMode::Cpu),
            CullingMode::Gpu if gpu.supports_compute => Ok(CullingMode::Gpu),
            CullingMode::Gpu => Err(CullError::ComputeUnsupported(
                gpu.adapter_info.name.clone(),
            )),
            CullingMode::Auto if gpu.supports_compute => Ok(CullingMode::Gpu),
            CullingMode::Auto => {
                tracing::warn!(
                    "Adapter {} lacks compute support, falling back to CPU culling",
                    gpu.adapter_info.name
                );
                Ok(CullingMode::Cpu)
            }
        }
    }
}

/// Result of one culling pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CullOutput {
    /// Host loop: visible instances are already packed.
    Cpu(CompactedInstances),
    /// Kernel: the id prefix read back from the visible-id buffer. The draw
    /// count stays in the argument buffer.
    Gpu { visible_ids: Vec<u32> },
}

impl CullOutput {
    pub fn mode(&self) -> CullingMode {
        match self {
            CullOutput::Cpu(_) => CullingMode::Cpu,
            CullOutput::Gpu { .. } => CullingMode::Gpu,
        }
    }

    pub fn visible_count(&self) -> u32 {
        self.visible_ids().len() as u32
    }

    /// Store ids of the visible instances in slot order.
    pub fn visible_ids(&self) -> &[u32] {
        match self {
            CullOutput::Cpu(compacted) => compacted.source_ids(),
            CullOutput::Gpu { visible_ids } => visible_ids,
        }
    }
}

pub trait CullingStrategy {
    fn mode(&self) -> CullingMode;

    /// Classify every instance in `store` against `frustum`.
    fn cull(&mut self, store: &InstanceStore, frustum: &Frustum) -> Result<CullOutput>;

    /// Buffer the draw takes its instance count from, when the count never
    /// leaves the GPU.
    fn indirect_args(&self) -> Option<&wgpu::Buffer> {
        None
    }
}

/// Build the strategy for an already resolved mode.
pub fn create_strategy(
    mode: CullingMode,
    gpu: &Arc<GpuContext>,
    capacity: usize,
    bounding_radius: f32,
    index_count: u32,
) -> Result<Box<dyn CullingStrategy>> {
    let strategy: Box<dyn CullingStrategy> = match mode.resolve(gpu)? {
        CullingMode::Gpu => Box::new(GpuCulling::new(
            Arc::clone(gpu),
            capacity,
            bounding_radius,
            index_count,
        )?),
        _ => Box::new(CpuCulling::new(bounding_radius)),
    };
    tracing::info!(
        "Culling mode: {} (capacity {}, bounding radius {:.3})",
        strategy.mode(),
        capacity,
        bounding_radius
    );
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RingLayout;

    #[test]
    fn mode_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: CullingMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"gpu\"").unwrap();
        assert_eq!(parsed.mode, CullingMode::Gpu);
        assert_eq!(CullingMode::Cpu.to_string(), "cpu");
        assert_eq!(CullingMode::default(), CullingMode::Auto);
    }

    #[test]
    fn output_counts_match_ids() {
        let store = InstanceStore::from_layout(&RingLayout::default(), 0.5, 23).unwrap();
        let cpu = CullOutput::Cpu(crate::render::compactor::gather(&[3, 4], &store).unwrap());
        let gpu = CullOutput::Gpu {
            visible_ids: vec![4, 3, 9],
        };

        assert_eq!(cpu.visible_count(), 2);
        assert_eq!(cpu.mode(), CullingMode::Cpu);
        assert_eq!(gpu.visible_count(), 3);
        assert_eq!(gpu.visible_ids(), &[4, 3, 9]);
        assert_eq!(gpu.mode(), CullingMode::Gpu);
    }
}
