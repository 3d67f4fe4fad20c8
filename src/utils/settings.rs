use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::*;
use crate::core::RingLayout;
use crate::error::{CullError, Result};
use crate::render::culling::CullingMode;
use crate::render::frustum::bounding_radius;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CullSettings {
    #[serde(default)]
    pub culling: CullingSettings,
    #[serde(default)]
    pub scene: RingLayout,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub debug: DebugSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CullingSettings {
    pub mode: CullingMode,
    pub object_scale: f32,
    pub shrink_factor: f32,
    /// Upper bound on instances; sizes every GPU buffer.
    pub capacity: u32,
}

impl Default for CullingSettings {
    fn default() -> Self {
        Self {
            mode: CullingMode::Auto,
            object_scale: DEFAULT_OBJECT_SCALE,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
            capacity: DEFAULT_MAX_INSTANCES,
        }
    }
}

impl CullingSettings {
    pub fn bounding_radius(&self) -> f32 {
        bounding_radius(self.object_scale, self.shrink_factor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub fov: f32, // degrees, vertical
    pub near: f32,
    pub far: f32,
    pub orbit_radius: f32,
    pub orbit_height: f32,
    pub rotation_step: f32,
    pub orbit_step: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: CAMERA_FOV_Y_DEGREES,
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            orbit_radius: CAMERA_ORBIT_RADIUS,
            orbit_height: CAMERA_ORBIT_HEIGHT,
            rotation_step: ROTATION_STEP,
            orbit_step: ORBIT_STEP,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DebugSettings {
    /// Re-cull every GPU frame on the host and compare.
    pub validate: bool,
    /// Log stats every N frames; 0 disables.
    pub stats_interval: u64,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            validate: false,
            stats_interval: 60,
        }
    }
}

impl CullSettings {
    /// Reject values that would make buffers, the bounding box or the
    /// frustum planes meaningless.
    pub fn check(&self) -> Result<()> {
        if self.culling.capacity == 0 {
            return Err(CullError::ZeroCapacity);
        }
        let count = self.scene.instance_count();
        if count > self.culling.capacity as usize {
            return Err(CullError::CapacityExceeded {
                count,
                capacity: self.culling.capacity as usize,
            });
        }

        let culling = &self.culling;
        if !(culling.object_scale.is_finite() && culling.object_scale > 0.0) {
            return Err(invalid("culling.object_scale", culling.object_scale, "must be positive"));
        }
        if !(culling.shrink_factor > 0.0 && culling.shrink_factor < 1.0) {
            return Err(invalid("culling.shrink_factor", culling.shrink_factor, "must be in (0, 1)"));
        }

        let camera = &self.camera;
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(invalid("camera.fov", camera.fov, "must be in (0, 180) degrees"));
        }
        if !(camera.near.is_finite() && camera.near > 0.0) {
            return Err(invalid("camera.near", camera.near, "must be positive"));
        }
        if !(camera.far.is_finite() && camera.far > camera.near) {
            return Err(invalid("camera.far", camera.far, "must be greater than camera.near"));
        }
        Ok(())
    }
}

fn invalid(key: &str, value: f32, reason: &str) -> CullError {
    CullError::InvalidSettings(format!("{key} = {value}: {reason}"))
}

pub fn save_settings(path: &Path, settings: &CullSettings) -> Result<()> {
    let encoded = toml::to_string_pretty(settings)?;
    fs::write(path, encoded)?;
    Ok(())
}

pub fn load_settings(path: &Path) -> Result<CullSettings> {
    let contents = fs::read_to_string(path)?;
    let settings: CullSettings = toml::from_str(&contents)?;
    settings.check()?;
    tracing::info!("Loaded settings from {}", path.display());
    Ok(settings)
}
