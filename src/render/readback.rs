//! Blocking GPU -> CPU buffer readback.
//!
//! Every call submits a copy into a persistent staging buffer, then suspends
//! the submitting thread in `device.poll(Wait)` until the map completes. This
//! is the only suspension point of a frame and its main throughput cost; the
//! obvious follow-up is a double-buffered staging ring read one frame late.

use crate::error::{CullError, Result};

pub struct ReadbackBuffer {
    staging: wgpu::Buffer,
    size: wgpu::BufferAddress,
}

impl ReadbackBuffer {
    pub fn new(device: &wgpu::Device, label: &str, size: wgpu::BufferAddress) -> Self {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { staging, size }
    }

    /// Copy the first `count` words of `source` to the host.
    ///
    /// `source` needs `COPY_SRC` usage. Errors if the map fails; the caller
    /// must not fall back to a previously read value.
    pub fn read_u32s(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::Buffer,
        count: usize,
    ) -> Result<Vec<u32>> {
        let byte_len = (count * std::mem::size_of::<u32>()) as wgpu::BufferAddress;
        if byte_len == 0 {
            return Ok(Vec::new());
        }
        if byte_len > self.size || byte_len > source.size() {
            return Err(CullError::readback(format!(
                "requested {byte_len} bytes, staging holds {} and source {}",
                self.size,
                source.size()
            )));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(source, 0, &self.staging, 0, byte_len);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = self.staging.slice(..byte_len);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(CullError::readback)?;

        rx.recv()
            .map_err(|_| CullError::readback("map_async callback dropped"))?
            .map_err(CullError::readback)?;

        let words = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, u32>(&data).to_vec()
        };
        self.staging.unmap();

        Ok(words)
    }
}
