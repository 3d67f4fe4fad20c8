//! Frustum plane extraction and the shared visibility predicate.
//!
//! `is_box_visible` is the single definition of "inside the frustum" used by
//! the host culling loop. `shaders/cull.wgsl` mirrors it operation for
//! operation so both paths classify every instance the same way.

use glam::{Mat4, Vec3, Vec4};

use crate::constants::FRUSTUM_PLANE_COUNT;

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;
pub const BOTTOM: usize = 2;
pub const TOP: usize = 3;
pub const NEAR: usize = 4;
pub const FAR: usize = 5;

/// A plane `dot(normal, p) + offset = 0`; positive side faces into the frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullingPlane {
    pub normal: Vec3,
    pub offset: f32,
}

impl CullingPlane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    fn from_coefficients(coefficients: Vec4) -> Self {
        Self {
            normal: coefficients.truncate(),
            offset: coefficients.w,
        }
    }

    /// Scale all four coefficients so the normal has unit length.
    pub fn normalized(self) -> Self {
        let length = self.normal.length();
        if length > 0.0 {
            Self {
                normal: self.normal / length,
                offset: self.offset / length,
            }
        } else {
            self
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.offset
    }

    /// Projection of a box with half-size `radius` onto the plane normal.
    pub fn projected_extent(&self, radius: f32) -> f32 {
        radius * (self.normal.x.abs() + self.normal.y.abs() + self.normal.z.abs())
    }

    pub fn to_gpu(&self) -> [f32; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.offset]
    }
}

/// The six planes of a camera frustum in {left, right, bottom, top, near, far} order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [CullingPlane; FRUSTUM_PLANE_COUNT],
}

impl Frustum {
    pub fn from_view_proj(view_proj: &Mat4) -> Self {
        Self {
            planes: extract_frustum_planes(view_proj),
        }
    }

    pub fn contains_box(&self, center: Vec3, radius: f32) -> bool {
        is_box_visible(&self.planes, center, radius)
    }

    pub fn to_gpu(&self) -> [[f32; 4]; FRUSTUM_PLANE_COUNT] {
        self.planes.map(|plane| plane.to_gpu())
    }
}

/// Gribb-Hartmann extraction for a matrix applied as `view_proj * p`.
/// The near plane assumes wgpu's [0, 1] clip depth.
pub fn extract_frustum_planes(view_proj: &Mat4) -> [CullingPlane; FRUSTUM_PLANE_COUNT] {
    let m = view_proj;
    let (row0, row1, row2, row3) = (m.row(0), m.row(1), m.row(2), m.row(3));

    [
        // Left
        row3 + row0,
        // Right
        row3 - row0,
        // Bottom
        row3 + row1,
        // Top
        row3 - row1,
        // Near (WGPU depth is [0, 1])
        row2,
        // Far
        row3 - row2,
    ]
    .map(|coefficients| CullingPlane::from_coefficients(coefficients).normalized())
}

/// Conservative box-vs-frustum test.
///
/// Rejects only when the box lies entirely on the negative side of some plane.
/// A box exactly touching a plane (`distance + extent == 0`) counts as visible.
pub fn is_box_visible(planes: &[CullingPlane; FRUSTUM_PLANE_COUNT], center: Vec3, radius: f32) -> bool {
    for plane in planes {
        let distance = plane.signed_distance(center);
        let extent = plane.projected_extent(radius);
        if distance + extent < 0.0 {
            return false;
        }
    }
    true
}

/// Box half-size used by both culling paths.
pub fn bounding_radius(object_scale: f32, shrink_factor: f32) -> f32 {
    object_scale * shrink_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_normals(planes: &[CullingPlane; FRUSTUM_PLANE_COUNT]) -> bool {
        planes
            .iter()
            .all(|plane| (plane.normal.length() - 1.0).abs() < 1e-5)
    }

    #[test]
    fn orthographic_round_trip() {
        let proj = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let planes = extract_frustum_planes(&(proj * view));

        assert!(unit_normals(&planes));
        for plane in &planes {
            assert!(plane.signed_distance(Vec3::ZERO) > 0.0, "{plane:?}");
        }

        // Camera sits at z = 5 looking at -Z: near is 4.9 away, far 5.0 beyond origin.
        assert!((planes[NEAR].signed_distance(Vec3::ZERO) - 4.9).abs() < 1e-4);
        assert!((planes[FAR].signed_distance(Vec3::ZERO) - 5.0).abs() < 1e-4);
        assert!((planes[LEFT].signed_distance(Vec3::ZERO) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn perspective_plane_orientation() {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        let planes = extract_frustum_planes(&proj);

        assert!(unit_normals(&planes));
        assert!(planes[LEFT].normal.x > 0.0);
        assert!(planes[RIGHT].normal.x < 0.0);
        assert!(planes[BOTTOM].normal.y > 0.0);
        assert!(planes[TOP].normal.y < 0.0);
        assert!(planes[NEAR].normal.z < 0.0);
        assert!(planes[FAR].normal.z > 0.0);
        assert!((planes[NEAR].signed_distance(Vec3::ZERO) + 0.1).abs() < 1e-4);
    }

    #[test]
    fn box_ahead_is_visible_box_behind_is_not() {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_proj(&proj);

        assert!(frustum.contains_box(Vec3::new(0.0, 0.0, -5.0), 0.5));
        assert!(!frustum.contains_box(Vec3::new(0.0, 0.0, 5.0), 0.5));
        assert!(!frustum.contains_box(Vec3::new(0.0, 0.0, -150.0), 0.5));
        assert!(!frustum.contains_box(Vec3::new(50.0, 0.0, -5.0), 0.5));
    }

    #[test]
    fn tangent_box_is_inside() {
        let open = CullingPlane::new(Vec3::X, 1000.0);
        let planes = [
            CullingPlane::new(Vec3::X, 0.0),
            open,
            open,
            open,
            open,
            open,
        ];

        // distance -0.5, extent 0.5: exactly touching.
        assert!(is_box_visible(&planes, Vec3::new(-0.5, 0.0, 0.0), 0.5));
        assert!(!is_box_visible(&planes, Vec3::new(-0.75, 0.0, 0.0), 0.5));
    }

    #[test]
    fn box_behind_any_single_plane_is_rejected() {
        let proj = Mat4::perspective_rh(70f32.to_radians(), 1.5, 0.5, 40.0);
        let view = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 8.0), Vec3::ZERO, Vec3::Y);
        let frustum = Frustum::from_view_proj(&(proj * view));
        let radius = bounding_radius(0.5, 0.95);

        for plane in &frustum.planes {
            // Push a point well past the plane along its inward normal's opposite.
            let on_plane = -plane.normal * plane.offset;
            let behind = on_plane - plane.normal * (plane.projected_extent(radius) + 0.01);
            assert!(plane.signed_distance(behind) + plane.projected_extent(radius) < 0.0);
            assert!(!frustum.contains_box(behind, radius));
        }
    }

    #[test]
    fn gpu_layout_is_normal_then_offset() {
        let plane = CullingPlane::new(Vec3::new(0.0, 1.0, 0.0), -2.0);
        assert_eq!(plane.to_gpu(), [0.0, 1.0, 0.0, -2.0]);
    }
}
