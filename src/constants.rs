// Culling constants
pub const CULL_WORKGROUP_SIZE: u32 = 64;
pub const FRUSTUM_PLANE_COUNT: usize = 6;
/// Default bounding-radius shrink applied to the object scale.
pub const DEFAULT_SHRINK_FACTOR: f32 = 0.95;
pub const DEFAULT_OBJECT_SCALE: f32 = 0.5;

// Cube mesh
pub const CUBE_INDEX_COUNT: u32 = 36;
pub const CUBE_VERTEX_COUNT: u32 = 24;

// Ring scene layout
pub const INNER_RING_COUNT: u32 = 10;
pub const INNER_RING_RADIUS: f32 = 4.0;
pub const OUTER_RING_COUNT: u32 = 12;
pub const OUTER_RING_RADIUS: f32 = 9.5;
/// Centre instance plus both rings.
pub const DEFAULT_MAX_INSTANCES: u32 = 1 + INNER_RING_COUNT + OUTER_RING_COUNT;

// Animation
pub const ROTATION_STEP: f32 = 0.01;
pub const ORBIT_STEP: f32 = 0.005;

// Camera
pub const CAMERA_FOV_Y_DEGREES: f32 = 60.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;
pub const CAMERA_SPEED: f32 = 0.1;
pub const CAMERA_ORBIT_RADIUS: f32 = 16.0;
pub const CAMERA_ORBIT_HEIGHT: f32 = 4.0;

// Offscreen target
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const DEFAULT_TARGET_WIDTH: u32 = 1280;
pub const DEFAULT_TARGET_HEIGHT: u32 = 720;
