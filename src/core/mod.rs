//! Core data structures for the culling pipeline
//! Contains instance records, per-frame animation state, GPU layouts and vertices.

pub mod instance;
pub mod uniforms;
pub mod vertex;

// Re-export commonly used types
pub use instance::{FrameContext, InstanceRecord, InstanceStore, RingLayout};
pub use uniforms::{CameraUniforms, CompactedInstance, CullUniforms, GpuInstanceRecord};
pub use vertex::Vertex;
