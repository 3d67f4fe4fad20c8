//! Captures wgpu validation and allocation errors raised while building GPU
//! resources, so setup reports them instead of hitting the uncaptured-error
//! handler.

use crate::error::{CullError, Result};

#[must_use = "All error scopes must end in a call to `end`"]
pub struct SetupErrorScope {
    label: &'static str,
    // Popped in reverse push order
    validation: Option<wgpu::ErrorScopeGuard>,
    out_of_memory: Option<wgpu::ErrorScopeGuard>,
}

impl SetupErrorScope {
    pub fn new(device: &wgpu::Device, label: &'static str) -> Self {
        let out_of_memory = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);
        Self {
            label,
            validation: Some(validation),
            out_of_memory: Some(out_of_memory),
        }
    }

    pub fn end(mut self) -> Result<()> {
        let validation = self
            .validation
            .take()
            .and_then(|scope| pollster::block_on(scope.pop()));
        let out_of_memory = self
            .out_of_memory
            .take()
            .and_then(|scope| pollster::block_on(scope.pop()));

        match validation.or(out_of_memory) {
            Some(err) => Err(CullError::Setup(format!("{}: {}", self.label, err))),
            None => Ok(()),
        }
    }
}

impl Drop for SetupErrorScope {
    fn drop(&mut self) {
        if self.validation.is_some() {
            tracing::error!("{} error scope dropped without calling `end`", self.label);
        }
        // Inner scope first
        drop(self.validation.take());
        drop(self.out_of_memory.take());
    }
}

/// Byte size of `capacity` elements of `stride` bytes, refused when it
/// overflows or exceeds what a single storage binding may hold.
pub fn storage_buffer_size(capacity: usize, stride: usize, limits: &wgpu::Limits) -> Result<u64> {
    let max = limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size));
    let size = capacity
        .checked_mul(stride)
        .and_then(|bytes| u64::try_from(bytes).ok())
        .filter(|&bytes| bytes <= max);
    size.ok_or(CullError::BufferTooLarge {
        capacity,
        stride,
        max,
    })
}
