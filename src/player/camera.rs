use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec3};

use crate::constants::*;

/// Keep pitch just inside the poles so `look_at_rh` never sees a forward
/// parallel to the up axis.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 1e-3;

pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect: f32) -> Self {
        Camera {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: CAMERA_FOV_Y_DEGREES.to_radians(),
            aspect,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            speed: CAMERA_SPEED,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos()).normalize()
    }

    pub fn look_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.look_direction(), Vec3::Y)
    }

    /// Perspective with wgpu's [0, 1] depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view_matrix()
    }

    /// Turn by `yaw_delta` (left/right) and `pitch_delta` (up/down).
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw = wrap_angle(self.yaw + yaw_delta);
        self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move along the horizontal forward/right axes and world up, scaled by `speed`.
    pub fn translate(&mut self, forward: f32, right: f32, up: f32) {
        self.position += (self.forward() * forward + self.right() * right + Vec3::Y * up) * self.speed;
    }

    /// Place the camera on a circle around the origin and aim at it.
    pub fn orbit(&mut self, angle: f32, radius: f32, height: f32) {
        self.position = Vec3::new(radius * angle.cos(), height, radius * angle.sin());
        let to_center = -self.position;
        self.yaw = wrap_angle(to_center.z.atan2(to_center.x));
        let horizontal = Vec3::new(to_center.x, 0.0, to_center.z).length();
        self.pitch = to_center.y.atan2(horizontal).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}
