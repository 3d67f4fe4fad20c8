//! Compute-shader culling.
//!
//! One thread per instance tests its box against the frustum and appends the
//! instance id through an atomic counter that lives inside the indirect draw
//! arguments, so the instanced draw picks up the visible count directly.

use std::sync::Arc;

use crate::constants::CULL_WORKGROUP_SIZE;
use crate::core::{CullUniforms, GpuInstanceRecord, InstanceStore};
use crate::error::{CullError, Result};
use crate::render::context::GpuContext;
use crate::render::culling::{CullOutput, CullingMode, CullingStrategy};
use crate::render::error_scope::{SetupErrorScope, storage_buffer_size};
use crate::render::frustum::Frustum;
use crate::render::indirect::{DRAW_ARGS_SIZE, DrawIndexedIndirect};
use crate::render::readback::ReadbackBuffer;

pub struct GpuCulling {
    gpu: Arc<GpuContext>,
    capacity: u32,
    bounding_radius: f32,
    index_count: u32,

    // Per-frame copy of the store for the kernel
    instance_buffer: wgpu::Buffer,
    staged_records: Vec<GpuInstanceRecord>,

    // Indirect args; instance_count doubles as the append counter
    draw_args_buffer: wgpu::Buffer,
    // Compacted visible ids, valid up to instance_count
    visible_ids_buffer: wgpu::Buffer,

    cull_uniforms_buffer: wgpu::Buffer,
    cull_pipeline: wgpu::ComputePipeline,
    cull_bind_group: wgpu::BindGroup,

    args_readback: ReadbackBuffer,
    ids_readback: ReadbackBuffer,
}

impl GpuCulling {
    pub fn new(
        gpu: Arc<GpuContext>,
        capacity: usize,
        bounding_radius: f32,
        index_count: u32,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(CullError::ZeroCapacity);
        }
        let device = &gpu.device;
        let limits = device.limits();
        let instance_size =
            storage_buffer_size(capacity, std::mem::size_of::<GpuInstanceRecord>(), &limits)?;
        let visible_ids_size = storage_buffer_size(capacity, std::mem::size_of::<u32>(), &limits)?;

        let scope = SetupErrorScope::new(device, "GPU culling");

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cull Instance Buffer"),
            size: instance_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let draw_args_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Args Buffer"),
            size: DRAW_ARGS_SIZE,
            usage: wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let visible_ids_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Visible Ids Buffer"),
            size: visible_ids_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let cull_uniforms_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cull Uniforms Buffer"),
            size: std::mem::size_of::<CullUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let cull_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cull Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../shaders/cull.wgsl").into()),
        });

        let cull_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Cull Bind Group Layout"),
                entries: &[
                    // Culling uniforms (frustum planes + counts + radius)
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Instance records (read)
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Draw args (atomic instance count)
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Visible ids (write)
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let cull_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cull Bind Group"),
            layout: &cull_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: cull_uniforms_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: draw_args_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: visible_ids_buffer.as_entire_binding(),
                },
            ],
        });

        let cull_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cull Pipeline Layout"),
            bind_group_layouts: &[&cull_bind_group_layout],
            immediate_size: 0,
        });

        let cull_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Cull Pipeline"),
            layout: Some(&cull_pipeline_layout),
            module: &cull_shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let args_readback = ReadbackBuffer::new(device, "Draw Args Staging", DRAW_ARGS_SIZE);
        let ids_readback = ReadbackBuffer::new(device, "Visible Ids Staging", visible_ids_size);

        scope.end()?;

        Ok(Self {
            gpu,
            capacity: capacity as u32,
            bounding_radius,
            index_count,
            instance_buffer,
            staged_records: Vec::with_capacity(capacity),
            draw_args_buffer,
            visible_ids_buffer,
            cull_uniforms_buffer,
            cull_pipeline,
            cull_bind_group,
            args_readback,
            ids_readback,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Read back the argument buffer as the draw would see it.
    pub fn read_draw_args(&self) -> Result<DrawIndexedIndirect> {
        let words = self.args_readback.read_u32s(
            &self.gpu.device,
            &self.gpu.queue,
            &self.draw_args_buffer,
            5,
        )?;
        let words: [u32; 5] = words
            .as_slice()
            .try_into()
            .map_err(|_| CullError::readback("short draw args read"))?;
        Ok(DrawIndexedIndirect::from_words(&words))
    }

    /// Upload uniforms and records, and reset the draw args. `kernel_capacity`
    /// is the append limit the kernel enforces.
    fn stage_frame(&mut self, store: &InstanceStore, frustum: &Frustum, kernel_capacity: u32) {
        let queue = &self.gpu.queue;

        let uniforms = CullUniforms::new(
            frustum,
            store.len() as u32,
            kernel_capacity,
            self.bounding_radius,
        );
        queue.write_buffer(&self.cull_uniforms_buffer, 0, bytemuck::bytes_of(&uniforms));

        self.staged_records.clear();
        self.staged_records
            .extend(store.records().iter().map(GpuInstanceRecord::from));
        if !self.staged_records.is_empty() {
            queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.staged_records),
            );
        }

        // Reset every frame; the kernel only ever increments.
        let reset = DrawIndexedIndirect::reset(self.index_count);
        queue.write_buffer(&self.draw_args_buffer, 0, bytemuck::bytes_of(&reset));
    }

    fn dispatch(&self, instance_count: u32) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Cull Encoder"),
            });

        if instance_count > 0 {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Culling Pass"),
                timestamp_writes: None,
            });
            cpass.set_pipeline(&self.cull_pipeline);
            cpass.set_bind_group(0, &self.cull_bind_group, &[]);
            cpass.dispatch_workgroups(instance_count.div_ceil(CULL_WORKGROUP_SIZE), 1, 1);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl CullingStrategy for GpuCulling {
    fn mode(&self) -> CullingMode {
        CullingMode::Gpu
    }

    fn cull(&mut self, store: &InstanceStore, frustum: &Frustum) -> Result<CullOutput> {
        if store.len() > self.capacity as usize {
            return Err(CullError::CapacityExceeded {
                count: store.len(),
                capacity: self.capacity as usize,
            });
        }
        let instance_count = store.len() as u32;
        self.stage_frame(store, frustum, self.capacity);
        self.dispatch(instance_count);

        let args = self.read_draw_args()?;
        if args.instance_count > self.capacity {
            tracing::warn!(
                "Visible count {} above capacity {}, clamping",
                args.instance_count,
                self.capacity
            );
        }
        let visible = args.instance_count.min(self.capacity) as usize;

        let visible_ids = self.ids_readback.read_u32s(
            &self.gpu.device,
            &self.gpu.queue,
            &self.visible_ids_buffer,
            visible,
        )?;

        tracing::trace!("GPU cull: {}/{} visible", visible, instance_count);
        Ok(CullOutput::Gpu { visible_ids })
    }

    fn indirect_args(&self) -> Option<&wgpu::Buffer> {
        Some(&self.draw_args_buffer)
    }
}
