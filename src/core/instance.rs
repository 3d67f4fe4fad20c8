//! Per-instance state owned by the renderer.
//!
//! The store is the only owner of instance transforms. It is animated once per
//! frame on the submitting thread, strictly before any culling stage reads it.

use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{CullError, Result};

/// One logical object: its world transform and the material it samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceRecord {
    pub transform: Mat4,
    pub material_index: u32,
}

impl InstanceRecord {
    pub fn new(transform: Mat4, material_index: u32) -> Self {
        Self {
            transform,
            material_index,
        }
    }

    /// World-space origin of the instance (translation part of the transform).
    pub fn center(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}

/// Animation counters for a single frame.
///
/// Passed by value into the animation step instead of living as mutable
/// renderer fields. `next` produces the context for the following tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameContext {
    pub frame_index: u64,
    /// Spin of every instance around its local Y axis, radians in `[0, 2π)`.
    pub rotation_angle: f32,
    /// Camera orbit position, radians in `[0, 2π)`.
    pub orbit_angle: f32,
}

impl FrameContext {
    pub fn next(&self, rotation_step: f32, orbit_step: f32) -> Self {
        Self {
            frame_index: self.frame_index + 1,
            rotation_angle: (self.rotation_angle + rotation_step).rem_euclid(TAU),
            orbit_angle: (self.orbit_angle + orbit_step).rem_euclid(TAU),
        }
    }
}

/// Centre cube plus two concentric rings on the y = 0 plane.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RingLayout {
    pub include_center: bool,
    pub inner_count: u32,
    pub inner_radius: f32,
    pub outer_count: u32,
    pub outer_radius: f32,
}

impl Default for RingLayout {
    fn default() -> Self {
        Self {
            include_center: true,
            inner_count: INNER_RING_COUNT,
            inner_radius: INNER_RING_RADIUS,
            outer_count: OUTER_RING_COUNT,
            outer_radius: OUTER_RING_RADIUS,
        }
    }
}

impl RingLayout {
    pub fn instance_count(&self) -> usize {
        self.include_center as usize + self.inner_count as usize + self.outer_count as usize
    }

    /// Base positions and material indices, centre first, then inner, then outer ring.
    pub fn placements(&self) -> Vec<(Vec3, u32)> {
        let mut placements = Vec::with_capacity(self.instance_count());
        if self.include_center {
            placements.push((Vec3::ZERO, 0));
        }
        for (count, radius) in [
            (self.inner_count, self.inner_radius),
            (self.outer_count, self.outer_radius),
        ] {
            for i in 0..count {
                let angle = TAU * i as f32 / count as f32;
                let position = Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin());
                placements.push((position, i % 2));
            }
        }
        placements
    }
}

/// Owns the authoritative transforms. Instance count is fixed at construction.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    records: Vec<InstanceRecord>,
    base_positions: Vec<Vec3>,
    object_scale: f32,
    capacity: usize,
}

impl InstanceStore {
    pub fn from_layout(layout: &RingLayout, object_scale: f32, capacity: usize) -> Result<Self> {
        Self::from_placements(layout.placements(), object_scale, capacity)
    }

    /// Build a store from explicit `(position, material)` placements.
    ///
    /// Fails when there are more placements than `capacity`; the GPU buffers
    /// are sized from `capacity` and never grow.
    pub fn from_placements(
        placements: impl IntoIterator<Item = (Vec3, u32)>,
        object_scale: f32,
        capacity: usize,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(CullError::ZeroCapacity);
        }

        let (base_positions, materials): (Vec<Vec3>, Vec<u32>) = placements.into_iter().unzip();
        if base_positions.len() > capacity {
            return Err(CullError::CapacityExceeded {
                count: base_positions.len(),
                capacity,
            });
        }

        let records = base_positions
            .iter()
            .zip(materials)
            .map(|(&position, material)| {
                InstanceRecord::new(placement_transform(position, 0.0, object_scale), material)
            })
            .collect();

        Ok(Self {
            records,
            base_positions,
            object_scale,
            capacity,
        })
    }

    /// Rebuild every transform for the given frame: scale, spin around Y, then translate.
    pub fn animate(&mut self, frame: &FrameContext) {
        for (record, &position) in self.records.iter_mut().zip(&self.base_positions) {
            record.transform = placement_transform(position, frame.rotation_angle, self.object_scale);
        }
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn get(&self, id: u32) -> Option<&InstanceRecord> {
        self.records.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn placement_transform(position: Vec3, angle: f32, scale: f32) -> Mat4 {
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), Quat::from_rotation_y(angle), position)
}
