use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::core::instance::InstanceRecord;
use crate::render::frustum::Frustum;

/// Culling uniforms - frustum planes + counts + bounding radius
/// Note: Must match cull.wgsl CullUniforms struct layout exactly
/// Total size: 96 (planes) + 16 (count, capacity, radius, pad) = 112
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CullUniforms {
    /// 6 frustum planes (each is vec4: xyz=normal, w=offset)
    pub frustum_planes: [[f32; 4]; 6],
    /// Number of live instance records
    pub instance_count: u32,
    /// Length of the visible id buffer
    pub capacity: u32,
    pub bounding_radius: f32,
    pub _padding: u32,
}

impl CullUniforms {
    pub fn new(frustum: &Frustum, instance_count: u32, capacity: u32, bounding_radius: f32) -> Self {
        Self {
            frustum_planes: frustum.to_gpu(),
            instance_count,
            capacity,
            bounding_radius,
            _padding: 0,
        }
    }
}

/// Instance record as read by the culling kernel.
/// `model` is column-major, matching WGSL `mat4x4<f32>`; centre is `model[3].xyz`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GpuInstanceRecord {
    pub model: [[f32; 4]; 4],
    pub material_index: u32,
    pub _padding: [u32; 3],
}

impl From<&InstanceRecord> for GpuInstanceRecord {
    fn from(record: &InstanceRecord) -> Self {
        Self {
            model: record.transform.to_cols_array_2d(),
            material_index: record.material_index,
            _padding: [0; 3],
        }
    }
}

/// Entry of the packed per-draw instance buffer.
/// `model_rows` holds the transform transposed (one row per vec4), which is what
/// the instanced vertex shader dots against.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CompactedInstance {
    pub model_rows: [[f32; 4]; 4],
    pub material_index: u32,
    pub _padding: [u32; 3],
}

impl From<&InstanceRecord> for CompactedInstance {
    fn from(record: &InstanceRecord) -> Self {
        Self {
            model_rows: record.transform.transpose().to_cols_array_2d(),
            material_index: record.material_index,
            _padding: [0; 3],
        }
    }
}

impl CompactedInstance {
    /// The original (untransposed) transform.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model_rows).transpose()
    }
}

/// Camera block for the instanced draw shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl CameraUniforms {
    pub fn new(view_proj: Mat4, camera_pos: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            _padding: 0.0,
        }
    }
}

const _: () = assert!(std::mem::size_of::<CullUniforms>() == 112);
const _: () = assert!(std::mem::size_of::<GpuInstanceRecord>() == 80);
const _: () = assert!(std::mem::size_of::<CompactedInstance>() == 80);
const _: () = assert!(std::mem::size_of::<CameraUniforms>() == 80);
