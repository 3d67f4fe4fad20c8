//! Viewer-side modules
//! Contains the yaw/pitch camera that feeds the frustum extraction.

pub mod camera;

pub use camera::Camera;
