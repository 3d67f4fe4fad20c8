//! Adapter and device acquisition without a window surface.

use crate::error::Result;

/// Device and queue shared by the culling strategies, the compactor and the
/// draw. Built once per session and handed out behind an `Arc`.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    /// Compute shaders, indirect draws and enough storage bindings for the
    /// culling kernel.
    pub supports_compute: bool,
}

impl GpuContext {
    pub fn new_headless() -> Result<Self> {
        pollster::block_on(Self::request())
    }

    async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        tracing::info!("WGPU Instance created successfully");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            "Selected adapter: {} on {:?} backend",
            adapter_info.name,
            adapter_info.backend
        );
        if adapter_info.device_type == wgpu::DeviceType::Cpu {
            tracing::warn!("Running on a software adapter; expect low throughput");
        }

        let limits = adapter.limits();
        let downlevel = adapter.get_downlevel_capabilities();
        let supports_compute = supports_gpu_culling(downlevel.flags, &limits);
        if !supports_compute {
            tracing::warn!("Adapter {} has no usable compute support", adapter_info.name);
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Cull Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
            supports_compute,
        })
    }
}

/// The GPU path dispatches a compute kernel with three storage bindings and
/// then draws from the buffer it wrote.
pub fn supports_gpu_culling(flags: wgpu::DownlevelFlags, limits: &wgpu::Limits) -> bool {
    flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS | wgpu::DownlevelFlags::INDIRECT_EXECUTION)
        && limits.max_storage_buffers_per_shader_stage >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_downlevel_support_allows_gpu_culling() {
        assert!(supports_gpu_culling(
            wgpu::DownlevelFlags::all(),
            &wgpu::Limits::downlevel_defaults()
        ));
    }

    #[test]
    fn compute_without_indirect_execution_is_not_enough() {
        let flags = wgpu::DownlevelFlags::all() - wgpu::DownlevelFlags::INDIRECT_EXECUTION;
        assert!(!supports_gpu_culling(flags, &wgpu::Limits::downlevel_defaults()));
    }

    #[test]
    fn webgl_style_adapter_falls_back_to_cpu() {
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        assert!(!supports_gpu_culling(wgpu::DownlevelFlags::all(), &limits));
        assert!(!supports_gpu_culling(wgpu::DownlevelFlags::empty(), &wgpu::Limits::defaults()));
    }
}
