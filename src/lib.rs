// Core module with instance data and GPU layouts
pub mod core;

// Player module with the camera
pub mod player;

// Render module with culling, compaction and drawing
pub mod render;

// Settings
pub mod utils;

// Other modules
pub mod constants;
pub mod error;

// Re-exports
pub use constants::*;
pub use crate::core::{FrameContext, InstanceRecord, InstanceStore, RingLayout, Vertex};
pub use error::{CullError, Result};
pub use player::Camera;
pub use render::{
    CpuCulling, CullPipeline, CullStats, CullingMode, CullingStrategy, FrameRenderer, Frustum,
    GpuContext, GpuCulling, IndirectDrawIssuer, InstanceCompactor, extract_frustum_planes,
    is_box_visible,
};
pub use utils::{CullSettings, load_settings, save_settings};
