//! Error type shared by setup, per-frame culling and settings handling.

use crate::render::pipeline::FrameStage;

/// Everything that can go wrong while building or driving the culling pipeline.
///
/// Setup variants are fatal for the session. [`CullError::Readback`] is a
/// per-frame failure: the frame skips the instanced draw and the next frame
/// tries again.
#[derive(thiserror::Error, Debug)]
pub enum CullError {
    #[error("no suitable adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("adapter {0} does not support compute shaders")]
    ComputeUnsupported(String),

    #[error("instance count {count} exceeds capacity {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },

    #[error("capacity must be non-zero")]
    ZeroCapacity,

    #[error("capacity {capacity} x {stride} bytes exceeds the device buffer limit of {max} bytes")]
    BufferTooLarge { capacity: usize, stride: usize, max: u64 },

    #[error("GPU setup failed: {0}")]
    Setup(String),

    #[error("buffer readback failed: {0}")]
    Readback(String),

    #[error("visible id {id} out of range for {len} instances")]
    InvalidVisibleId { id: u32, len: usize },

    #[error("frame stage {current:?} cannot advance to {next:?}")]
    StageOrder { current: FrameStage, next: FrameStage },

    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("settings serialize error: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("invalid setting {0}")]
    InvalidSettings(String),
}

impl CullError {
    pub fn readback<T: ToString>(msg: T) -> Self {
        CullError::Readback(msg.to_string())
    }

    /// Whether the error only invalidates the current frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, CullError::Readback(_) | CullError::InvalidVisibleId { .. })
    }
}

pub type Result<T, E = CullError> = std::result::Result<T, E>;
