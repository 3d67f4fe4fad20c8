//! Per-frame driver: transforms -> planes -> cull -> compact -> draw.
//!
//! Stages run strictly in that order. A frame whose readback failed still walks
//! every stage but records no draw, and the next frame starts clean.

use std::sync::Arc;

use glam::Mat4;
use parking_lot::RwLock;

use crate::core::{FrameContext, InstanceStore};
use crate::error::{CullError, Result};
use crate::render::compactor::{self, CompactedInstances, InstanceCompactor};
use crate::render::culling::{CpuCulling, CullOutput, CullingMode, CullingStrategy};
use crate::render::frustum::Frustum;
use crate::render::indirect::{DrawSource, IndirectDrawIssuer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    TransformsUpdated,
    PlanesExtracted,
    Culled,
    Compacted,
    Drawn,
}

impl FrameStage {
    pub fn successor(self) -> FrameStage {
        match self {
            FrameStage::TransformsUpdated => FrameStage::PlanesExtracted,
            FrameStage::PlanesExtracted => FrameStage::Culled,
            FrameStage::Culled => FrameStage::Compacted,
            FrameStage::Compacted => FrameStage::Drawn,
            FrameStage::Drawn => FrameStage::TransformsUpdated,
        }
    }
}

/// Snapshot of the most recent frame, readable from other threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullStats {
    pub frame: u64,
    pub mode: Option<CullingMode>,
    pub total: u32,
    /// `None` when the frame's readback failed.
    pub visible: Option<u32>,
    pub draw_calls: u32,
    pub skipped_frames: u64,
    pub validation_mismatches: u64,
}

impl CullStats {
    pub fn culled(&self) -> Option<u32> {
        self.visible.map(|visible| self.total.saturating_sub(visible))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Ready { visible: u32 },
    Skipped,
}

pub struct CullPipeline {
    store: InstanceStore,
    strategy: Box<dyn CullingStrategy>,
    compactor: InstanceCompactor,
    issuer: IndirectDrawIssuer,
    validator: Option<CpuCulling>,

    stage: FrameStage,
    frame_index: u64,
    frustum: Option<Frustum>,
    output: Option<CullOutput>,
    compacted: Option<CompactedInstances>,
    stats: Arc<RwLock<CullStats>>,
}

impl CullPipeline {
    pub fn new(
        store: InstanceStore,
        strategy: Box<dyn CullingStrategy>,
        compactor: InstanceCompactor,
        issuer: IndirectDrawIssuer,
    ) -> Self {
        let stats = CullStats {
            mode: Some(strategy.mode()),
            total: store.len() as u32,
            ..Default::default()
        };
        Self {
            store,
            strategy,
            compactor,
            issuer,
            validator: None,
            stage: FrameStage::Drawn,
            frame_index: 0,
            frustum: None,
            output: None,
            compacted: None,
            stats: Arc::new(RwLock::new(stats)),
        }
    }

    /// Cross-check every kernel result against the host loop.
    pub fn with_validation(mut self, bounding_radius: f32) -> Self {
        if self.strategy.mode() == CullingMode::Gpu {
            self.validator = Some(CpuCulling::new(bounding_radius));
        }
        self
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn mode(&self) -> CullingMode {
        self.strategy.mode()
    }

    pub fn frustum(&self) -> Option<&Frustum> {
        self.frustum.as_ref()
    }

    pub fn compacted(&self) -> Option<&CompactedInstances> {
        self.compacted.as_ref()
    }

    pub fn stats_handle(&self) -> Arc<RwLock<CullStats>> {
        Arc::clone(&self.stats)
    }

    fn advance(&mut self, next: FrameStage) -> Result<()> {
        if self.stage.successor() != next {
            return Err(CullError::StageOrder {
                current: self.stage,
                next,
            });
        }
        self.stage = next;
        Ok(())
    }

    pub fn update_transforms(&mut self, frame: &FrameContext) -> Result<()> {
        self.advance(FrameStage::TransformsUpdated)?;
        self.frame_index = frame.frame_index;
        self.frustum = None;
        self.output = None;
        self.compacted = None;
        self.store.animate(frame);
        Ok(())
    }

    pub fn extract_planes(&mut self, view_proj: &Mat4) -> Result<()> {
        self.advance(FrameStage::PlanesExtracted)?;
        self.frustum = Some(Frustum::from_view_proj(view_proj));
        Ok(())
    }

    /// Run the strategy. On a per-frame failure the frame is marked skipped
    /// and the error is still returned.
    pub fn cull(&mut self) -> Result<u32> {
        self.advance(FrameStage::Culled)?;
        let frustum = self.frustum.ok_or(CullError::StageOrder {
            current: FrameStage::TransformsUpdated,
            next: FrameStage::Culled,
        })?;

        match self.strategy.cull(&self.store, &frustum) {
            Ok(output) => {
                let visible = output.visible_count();
                if let Some(validator) = &self.validator {
                    self.validate(validator.visible_ids(&self.store, &frustum), &output);
                }
                self.output = Some(output);
                Ok(visible)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn validate(&self, mut expected: Vec<u32>, output: &CullOutput) {
        let mut actual = output.visible_ids().to_vec();
        actual.sort_unstable();
        expected.sort_unstable();
        if actual != expected {
            tracing::warn!(
                "Frame {}: GPU visible set ({}) differs from CPU ({})",
                self.frame_index,
                actual.len(),
                expected.len()
            );
            self.stats.write().validation_mismatches += 1;
        }
    }

    /// Record a failed stage. Per-frame errors skip the draw; anything else
    /// drops the frame in progress so the next one can start.
    fn fail(&mut self, err: CullError) -> CullError {
        if err.is_per_frame() {
            self.mark_skipped(&err);
        } else {
            tracing::error!(
                "Frame {}: abandoned at {:?}: {}",
                self.frame_index,
                self.stage,
                err
            );
            self.stage = FrameStage::Drawn;
            self.output = None;
            self.compacted = None;
        }
        err
    }

    fn mark_skipped(&mut self, err: &CullError) {
        tracing::warn!("Frame {}: skipping draw: {}", self.frame_index, err);
        self.output = None;
        let mut stats = self.stats.write();
        stats.frame = self.frame_index;
        stats.visible = None;
        stats.draw_calls = 0;
        stats.skipped_frames += 1;
    }

    /// Pack the visible instances and upload them. No-op for a skipped frame.
    pub fn compact(&mut self) -> Result<usize> {
        self.advance(FrameStage::Compacted)?;
        let Some(output) = self.output.take() else {
            return Ok(0);
        };

        let compacted = match output {
            CullOutput::Cpu(compacted) => compacted,
            CullOutput::Gpu { ref visible_ids } => match compactor::gather(visible_ids, &self.store) {
                Ok(compacted) => compacted,
                Err(err) => return Err(self.fail(err)),
            },
        };

        let uploaded = match self.compactor.upload(&compacted) {
            Ok(uploaded) => uploaded,
            Err(err) => return Err(self.fail(err)),
        };
        self.compacted = Some(compacted);
        Ok(uploaded)
    }

    /// Where the draw takes its instance count from this frame, if anything
    /// should be drawn at all.
    pub fn draw_source(&self) -> Option<DrawSource<'_>> {
        let compacted = self.compacted.as_ref()?;
        match self.strategy.indirect_args() {
            Some(args) => Some(DrawSource::Indirect(args)),
            None => Some(DrawSource::Direct(compacted.len() as u32)),
        }
    }

    /// Record the instanced draw. Pipeline state must already be bound.
    pub fn draw(&mut self, pass: &mut wgpu::RenderPass<'_>) -> Result<u32> {
        self.advance(FrameStage::Drawn)?;
        let draw_calls = match self.draw_source() {
            Some(source) => self.issuer.issue(pass, source),
            None => 0,
        };
        self.publish_stats(draw_calls);
        Ok(draw_calls)
    }

    /// Finish a frame that has no render pass (no draw recorded).
    pub fn finish_without_draw(&mut self) -> Result<()> {
        self.advance(FrameStage::Drawn)?;
        self.publish_stats(0);
        Ok(())
    }

    fn publish_stats(&self, draw_calls: u32) {
        let Some(compacted) = &self.compacted else {
            return;
        };
        let mut stats = self.stats.write();
        stats.frame = self.frame_index;
        stats.total = self.store.len() as u32;
        stats.visible = Some(compacted.len() as u32);
        stats.draw_calls = draw_calls;
    }

    /// Run every stage up to compaction, turning per-frame failures into
    /// [`FrameOutcome::Skipped`].
    pub fn prepare_frame(&mut self, frame: &FrameContext, view_proj: &Mat4) -> Result<FrameOutcome> {
        self.update_transforms(frame)?;
        self.extract_planes(view_proj)?;

        match self.cull() {
            Ok(_) => {}
            Err(err) if err.is_per_frame() => {}
            Err(err) => return Err(err),
        }
        match self.compact() {
            Ok(_) => {}
            Err(err) if err.is_per_frame() => {}
            Err(err) => return Err(err),
        }

        Ok(match &self.compacted {
            Some(compacted) => FrameOutcome::Ready {
                visible: compacted.len() as u32,
            },
            None => FrameOutcome::Skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompactedInstance, RingLayout};
    use crate::render::compactor::InstanceSink;
    use crate::render::frustum::bounding_radius;
    use glam::Vec3;

    struct FailingReadback;

    impl CullingStrategy for FailingReadback {
        fn mode(&self) -> CullingMode {
            CullingMode::Gpu
        }

        fn cull(&mut self, _: &InstanceStore, _: &Frustum) -> Result<CullOutput> {
            Err(CullError::readback("map failed"))
        }
    }

    struct BadIds;

    impl CullingStrategy for BadIds {
        fn mode(&self) -> CullingMode {
            CullingMode::Gpu
        }

        fn cull(&mut self, store: &InstanceStore, _: &Frustum) -> Result<CullOutput> {
            Ok(CullOutput::Gpu {
                visible_ids: vec![0, store.len() as u32 + 5],
            })
        }
    }

    struct Oversized;

    impl CullingStrategy for Oversized {
        fn mode(&self) -> CullingMode {
            CullingMode::Gpu
        }

        fn cull(&mut self, store: &InstanceStore, _: &Frustum) -> Result<CullOutput> {
            Err(CullError::CapacityExceeded {
                count: store.len(),
                capacity: 1,
            })
        }
    }

    struct OneSlot;

    impl InstanceSink for OneSlot {
        fn capacity(&self) -> usize {
            1
        }

        fn write(&mut self, _: &[CompactedInstance]) -> Result<()> {
            Ok(())
        }
    }

    fn pipeline(strategy: Box<dyn CullingStrategy>) -> CullPipeline {
        let store = InstanceStore::from_layout(&RingLayout::default(), 0.5, 23).unwrap();
        let compactor = InstanceCompactor::new(Box::new(Vec::<CompactedInstance>::new()));
        CullPipeline::new(store, strategy, compactor, IndirectDrawIssuer::new(36))
    }

    fn view_proj() -> Mat4 {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        proj * Mat4::look_at_rh(Vec3::new(0.0, 4.0, 16.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn stages_advance_in_order() {
        assert_eq!(FrameStage::Drawn.successor(), FrameStage::TransformsUpdated);
        let mut pipeline = pipeline(Box::new(CpuCulling::new(bounding_radius(0.5, 0.95))));

        pipeline.update_transforms(&FrameContext::default()).unwrap();
        let err = pipeline.cull().unwrap_err();
        assert!(matches!(
            err,
            CullError::StageOrder {
                current: FrameStage::TransformsUpdated,
                next: FrameStage::Culled
            }
        ));

        pipeline.extract_planes(&view_proj()).unwrap();
        pipeline.cull().unwrap();
        assert!(pipeline.update_transforms(&FrameContext::default()).is_err());
        pipeline.compact().unwrap();
        pipeline.finish_without_draw().unwrap();
        assert_eq!(pipeline.stage(), FrameStage::Drawn);
    }

    #[test]
    fn cpu_frame_publishes_stats() {
        let mut pipeline = pipeline(Box::new(CpuCulling::new(bounding_radius(0.5, 0.95))));
        let stats = pipeline.stats_handle();
        let frame = FrameContext::default().next(0.01, 0.0);

        let outcome = pipeline.prepare_frame(&frame, &view_proj()).unwrap();
        let FrameOutcome::Ready { visible } = outcome else {
            panic!("frame should not be skipped");
        };
        assert_eq!(pipeline.draw_source().map(|s| s.is_indirect()), Some(false));
        pipeline.finish_without_draw().unwrap();

        let snapshot = stats.read().clone();
        assert_eq!(snapshot.frame, 1);
        assert_eq!(snapshot.total, 23);
        assert_eq!(snapshot.visible, Some(visible));
        assert_eq!(snapshot.culled(), Some(23 - visible));
        assert_eq!(snapshot.mode, Some(CullingMode::Cpu));
    }

    #[test]
    fn readback_failure_skips_the_frame() {
        let mut pipeline = pipeline(Box::new(FailingReadback));
        let stats = pipeline.stats_handle();

        let outcome = pipeline
            .prepare_frame(&FrameContext::default(), &view_proj())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(pipeline.draw_source().is_none());
        pipeline.finish_without_draw().unwrap();

        let snapshot = stats.read().clone();
        assert_eq!(snapshot.visible, None);
        assert_eq!(snapshot.culled(), None);
        assert_eq!(snapshot.skipped_frames, 1);

        // Next frame starts clean.
        let next = FrameContext::default().next(0.01, 0.0);
        assert_eq!(
            pipeline.prepare_frame(&next, &view_proj()).unwrap(),
            FrameOutcome::Skipped
        );
        assert_eq!(stats.read().skipped_frames, 2);
    }

    #[test]
    fn out_of_range_id_skips_the_frame() {
        let mut pipeline = pipeline(Box::new(BadIds));
        let outcome = pipeline
            .prepare_frame(&FrameContext::default(), &view_proj())
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(pipeline.compacted().is_none());
    }

    #[test]
    fn fatal_cull_error_leaves_pipeline_ready_for_next_frame() {
        let mut pipeline = pipeline(Box::new(Oversized));
        let err = pipeline
            .prepare_frame(&FrameContext::default(), &view_proj())
            .unwrap_err();
        assert!(matches!(err, CullError::CapacityExceeded { count: 23, capacity: 1 }));
        assert_eq!(pipeline.stage(), FrameStage::Drawn);

        let next = FrameContext::default().next(0.01, 0.0);
        pipeline.update_transforms(&next).unwrap();
        pipeline.extract_planes(&view_proj()).unwrap();
        assert!(pipeline.cull().is_err());
        assert_eq!(pipeline.stage(), FrameStage::Drawn);
        assert_eq!(pipeline.stats_handle().read().skipped_frames, 0);
    }

    #[test]
    fn failed_upload_drops_the_frame() {
        let store = InstanceStore::from_layout(&RingLayout::default(), 0.5, 23).unwrap();
        let strategy = Box::new(CpuCulling::new(bounding_radius(0.5, 0.95)));
        let compactor = InstanceCompactor::new(Box::new(OneSlot));
        let mut pipeline = CullPipeline::new(store, strategy, compactor, IndirectDrawIssuer::new(36));

        assert!(pipeline.prepare_frame(&FrameContext::default(), &view_proj()).is_err());
        assert_eq!(pipeline.stage(), FrameStage::Drawn);
        assert!(pipeline.compacted().is_none());
        assert!(pipeline.draw_source().is_none());
        pipeline.update_transforms(&FrameContext::default()).unwrap();
    }
}
