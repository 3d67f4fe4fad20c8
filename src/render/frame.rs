//! Full frame assembly: animation tick, camera orbit, culling and the draw.

use std::sync::Arc;

use glam::Vec3;

use crate::constants::CUBE_INDEX_COUNT;
use crate::core::{CameraUniforms, FrameContext, InstanceStore};
use crate::error::Result;
use crate::player::Camera;
use crate::render::compactor::{GpuInstanceBuffer, InstanceCompactor};
use crate::render::context::GpuContext;
use crate::render::culling::create_strategy;
use crate::render::draw::CubeRenderer;
use crate::render::indirect::IndirectDrawIssuer;
use crate::render::pipeline::{CullPipeline, FrameOutcome};
use crate::utils::settings::{CameraSettings, CullSettings};

/// Owns everything needed to produce one culled, instanced frame.
pub struct FrameRenderer {
    gpu: Arc<GpuContext>,
    pipeline: CullPipeline,
    cubes: CubeRenderer,
    camera: Camera,
    camera_settings: CameraSettings,
    frame: FrameContext,
}

impl FrameRenderer {
    pub fn new(gpu: Arc<GpuContext>, settings: &CullSettings, width: u32, height: u32) -> Result<Self> {
        settings.check()?;
        let capacity = settings.culling.capacity as usize;
        let radius = settings.culling.bounding_radius();

        let store = InstanceStore::from_layout(&settings.scene, settings.culling.object_scale, capacity)?;
        let strategy = create_strategy(settings.culling.mode, &gpu, capacity, radius, CUBE_INDEX_COUNT)?;

        let instances = GpuInstanceBuffer::new(Arc::clone(&gpu), capacity)?;
        let cubes = CubeRenderer::new(&gpu, instances.buffer(), width, height)?;
        let compactor = InstanceCompactor::new(Box::new(instances));

        let mut pipeline = CullPipeline::new(store, strategy, compactor, IndirectDrawIssuer::new(CUBE_INDEX_COUNT));
        if settings.debug.validate {
            pipeline = pipeline.with_validation(radius);
        }

        let camera_settings = settings.camera.clone();
        let mut camera = Camera::new(Vec3::ZERO, cubes.target().aspect());
        camera.fov_y = camera_settings.fov.to_radians();
        camera.near = camera_settings.near;
        camera.far = camera_settings.far;

        tracing::info!(
            "Frame renderer ready: {} instances, {}x{} target",
            pipeline.store().len(),
            width,
            height
        );

        Ok(Self {
            gpu,
            pipeline,
            cubes,
            camera,
            camera_settings,
            frame: FrameContext::default(),
        })
    }

    pub fn pipeline(&self) -> &CullPipeline {
        &self.pipeline
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn frame(&self) -> FrameContext {
        self.frame
    }

    /// Advance the animation and orbit the camera around the scene.
    pub fn tick(&mut self) {
        self.frame = self
            .frame
            .next(self.camera_settings.rotation_step, self.camera_settings.orbit_step);
        self.camera.orbit(
            self.frame.orbit_angle,
            self.camera_settings.orbit_radius,
            self.camera_settings.orbit_height,
        );
    }

    /// Cull, compact and draw with the current camera.
    pub fn render(&mut self) -> Result<FrameOutcome> {
        let view_proj = self.camera.view_proj();
        let outcome = self.pipeline.prepare_frame(&self.frame, &view_proj)?;

        self.cubes.update_camera(
            &self.gpu.queue,
            &CameraUniforms::new(view_proj, self.camera.position),
        );
        let draw_calls = self.cubes.render(&self.gpu, &mut self.pipeline)?;
        tracing::trace!("Frame {}: {:?}, {} draw calls", self.frame.frame_index, outcome, draw_calls);
        Ok(outcome)
    }
}
