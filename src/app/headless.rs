use std::sync::Arc;
use std::time::Instant;

use cullrender::render::pipeline::FrameOutcome;
use cullrender::render::{FrameRenderer, GpuContext};
use cullrender::utils::CullSettings;
use cullrender::Result;

pub struct HeadlessApp {
    renderer: FrameRenderer,
    stats_interval: u64,
}

impl HeadlessApp {
    pub fn new(settings: CullSettings, width: u32, height: u32) -> Result<Self> {
        let gpu = Arc::new(GpuContext::new_headless()?);
        let renderer = FrameRenderer::new(gpu, &settings, width, height)?;
        Ok(Self {
            renderer,
            stats_interval: settings.debug.stats_interval,
        })
    }

    pub fn run(&mut self, frames: u64) -> Result<()> {
        let stats = self.renderer.pipeline().stats_handle();
        let start = Instant::now();
        let mut window_start = Instant::now();
        let mut skipped = 0u64;

        for _ in 0..frames {
            self.renderer.tick();
            if self.renderer.render()? == FrameOutcome::Skipped {
                skipped += 1;
            }

            let frame_index = self.renderer.frame().frame_index;
            if self.stats_interval > 0 && frame_index % self.stats_interval == 0 {
                let snapshot = stats.read().clone();
                let elapsed = window_start.elapsed().as_secs_f64();
                let fps = self.stats_interval as f64 / elapsed.max(f64::EPSILON);
                match snapshot.visible {
                    Some(visible) => tracing::info!(
                        "Frame {}: visible {} / total {} / culled {} ({:.1} fps)",
                        snapshot.frame,
                        visible,
                        snapshot.total,
                        snapshot.total.saturating_sub(visible),
                        fps
                    ),
                    None => tracing::info!(
                        "Frame {}: visible count unavailable ({:.1} fps)",
                        snapshot.frame,
                        fps
                    ),
                }
                window_start = Instant::now();
            }
        }

        let snapshot = stats.read().clone();
        tracing::info!(
            "Rendered {} frames in {:.2}s ({} skipped, {} validation mismatches)",
            frames,
            start.elapsed().as_secs_f64(),
            skipped,
            snapshot.validation_mismatches
        );
        Ok(())
    }
}
