//! Rendering-related modules
//! Contains frustum extraction, the culling strategies, compaction, indirect drawing and the frame driver.

pub mod compactor;
pub mod context;
pub mod culling;
pub mod draw;
pub mod error_scope;
pub mod frame;
pub mod frustum;
pub mod indirect;
pub mod mesh;
pub mod pipeline;
pub mod readback;

// Re-export commonly used types
pub use compactor::{CompactedInstances, GpuInstanceBuffer, InstanceCompactor, InstanceSink};
pub use context::GpuContext;
pub use culling::{CpuCulling, CullOutput, CullingMode, CullingStrategy, GpuCulling, create_strategy};
pub use draw::{CubeRenderer, OffscreenTarget};
pub use error_scope::{SetupErrorScope, storage_buffer_size};
pub use frame::FrameRenderer;
pub use frustum::{CullingPlane, Frustum, extract_frustum_planes, is_box_visible};
pub use indirect::{DrawIndexedIndirect, DrawSource, IndirectDrawIssuer};
pub use mesh::{add_quad, build_cube};
pub use pipeline::{CullPipeline, CullStats, FrameOutcome, FrameStage};
