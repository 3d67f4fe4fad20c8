//! GPU integration tests.
//!
//! These need a real adapter with compute support, so they are `#[ignore]`d
//! and `cargo test` passes without one. Run with:
//!   cargo test --test gpu_culling -- --include-ignored

use std::sync::Arc;

use cullrender::render::compactor;
use cullrender::render::pipeline::FrameOutcome;
use cullrender::{
    CUBE_INDEX_COUNT, Camera, CpuCulling, CullError, CullSettings, CullingMode, CullingStrategy,
    FrameContext, FrameRenderer, Frustum, GpuContext, GpuCulling, InstanceStore, RingLayout,
};
use glam::Vec3;

const RADIUS: f32 = 0.5 * 0.95;

fn gpu() -> Arc<GpuContext> {
    let gpu = GpuContext::new_headless().expect("should acquire a headless device");
    assert!(gpu.supports_compute, "adapter {} has no compute support", gpu.adapter_info.name);
    Arc::new(gpu)
}

fn ring_store(capacity: usize) -> InstanceStore {
    InstanceStore::from_layout(&RingLayout::default(), 0.5, capacity).unwrap()
}

fn orbit_frustum(angle: f32, radius: f32, height: f32) -> Frustum {
    let mut camera = Camera::new(Vec3::ZERO, 16.0 / 9.0);
    camera.orbit(angle, radius, height);
    Frustum::from_view_proj(&camera.view_proj())
}

fn sorted(ids: &[u32]) -> Vec<u32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn gpu_and_cpu_agree_along_orbit() {
    let gpu = gpu();
    let mut store = ring_store(23);
    let mut gpu_culling = GpuCulling::new(Arc::clone(&gpu), 23, RADIUS, CUBE_INDEX_COUNT).unwrap();
    let mut cpu_culling = CpuCulling::new(RADIUS);
    let mut frame = FrameContext::default();

    for step in 0..64 {
        frame = frame.next(0.01, 0.0);
        store.animate(&frame);
        let angle = step as f32 * std::f32::consts::TAU / 64.0;
        for (radius, height) in [(16.0, 4.0), (6.0, 1.0), (2.0, 0.5)] {
            let frustum = orbit_frustum(angle, radius, height);
            let on_gpu = gpu_culling.cull(&store, &frustum).unwrap();
            let on_cpu = cpu_culling.cull(&store, &frustum).unwrap();

            assert_eq!(on_gpu.mode(), CullingMode::Gpu);
            assert_eq!(on_gpu.visible_count(), on_cpu.visible_count(), "angle {angle} radius {radius}");
            assert_eq!(sorted(on_gpu.visible_ids()), sorted(on_cpu.visible_ids()));

            let args = gpu_culling.read_draw_args().unwrap();
            assert_eq!(args.instance_count, on_gpu.visible_count());
            assert_eq!(args.index_count, CUBE_INDEX_COUNT);
        }
    }
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn culling_twice_is_idempotent() {
    let gpu = gpu();
    let store = ring_store(23);
    let mut culling = GpuCulling::new(gpu, 23, RADIUS, CUBE_INDEX_COUNT).unwrap();
    let frustum = orbit_frustum(0.7, 6.0, 1.0);

    let first = culling.cull(&store, &frustum).unwrap();
    let second = culling.cull(&store, &frustum).unwrap();
    assert_eq!(first.visible_count(), second.visible_count());
    assert_eq!(sorted(first.visible_ids()), sorted(second.visible_ids()));
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn facing_away_writes_zero_instance_args() {
    let gpu = gpu();
    let store = ring_store(23);
    let mut culling = GpuCulling::new(gpu, 23, RADIUS, CUBE_INDEX_COUNT).unwrap();

    let mut camera = Camera::new(Vec3::new(0.0, 0.0, 40.0), 16.0 / 9.0);
    camera.yaw = std::f32::consts::FRAC_PI_2; // +Z, away from the scene
    let output = culling
        .cull(&store, &Frustum::from_view_proj(&camera.view_proj()))
        .unwrap();

    assert_eq!(output.visible_count(), 0);
    let args = culling.read_draw_args().unwrap();
    assert_eq!(args.instance_count, 0);
    assert_eq!(args.index_count, CUBE_INDEX_COUNT);
    assert_eq!(args.first_index, 0);
    assert_eq!(args.base_vertex, 0);
    assert_eq!(args.first_instance, 0);
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn full_capacity_all_visible_does_not_overflow() {
    let gpu = gpu();
    let store = ring_store(23);
    let mut culling = GpuCulling::new(gpu, store.capacity(), RADIUS, CUBE_INDEX_COUNT).unwrap();

    let mut camera = Camera::new(Vec3::new(0.0, 40.0, 0.0), 16.0 / 9.0);
    camera.rotate(0.0, -std::f32::consts::FRAC_PI_2);
    let output = culling
        .cull(&store, &Frustum::from_view_proj(&camera.view_proj()))
        .unwrap();

    assert_eq!(output.visible_count() as usize, store.capacity());
    let compacted = compactor::gather(output.visible_ids(), &store).unwrap();
    assert_eq!(compacted.len(), store.capacity());
    assert_eq!(sorted(compacted.source_ids()), (0..23).collect::<Vec<u32>>());
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn store_larger_than_buffers_is_refused() {
    let gpu = gpu();
    let store = ring_store(23);
    let mut culling = GpuCulling::new(gpu, 8, RADIUS, CUBE_INDEX_COUNT).unwrap();
    let err = culling
        .cull(&store, &orbit_frustum(0.0, 16.0, 4.0))
        .unwrap_err();
    assert!(matches!(err, CullError::CapacityExceeded { count: 23, capacity: 8 }));
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn validated_frames_render_without_mismatch() {
    for mode in [CullingMode::Gpu, CullingMode::Cpu] {
        let mut settings = CullSettings::default();
        settings.culling.mode = mode;
        settings.debug.validate = true;

        let mut renderer = FrameRenderer::new(gpu(), &settings, 320, 180).unwrap();
        let stats = renderer.pipeline().stats_handle();
        for _ in 0..90 {
            renderer.tick();
            assert!(matches!(renderer.render().unwrap(), FrameOutcome::Ready { .. }));
        }

        let snapshot = stats.read().clone();
        assert_eq!(snapshot.mode, Some(mode));
        assert_eq!(snapshot.frame, 90);
        assert_eq!(snapshot.total, 23);
        assert!(snapshot.visible.is_some());
        assert_eq!(snapshot.skipped_frames, 0);
        assert_eq!(snapshot.validation_mismatches, 0);
    }
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn oversized_capacity_is_an_error_not_a_panic() {
    for mode in [CullingMode::Gpu, CullingMode::Cpu] {
        let mut settings = CullSettings::default();
        settings.culling.mode = mode;
        settings.culling.capacity = u32::MAX;

        let err = FrameRenderer::new(gpu(), &settings, 320, 180).err().unwrap();
        assert!(matches!(err, CullError::BufferTooLarge { .. }), "{mode}: {err}");
    }
}

#[test]
#[ignore = "GPU integration: requires an adapter"]
fn invalid_render_target_is_a_setup_error() {
    let err = FrameRenderer::new(gpu(), &CullSettings::default(), 0, 0)
        .err()
        .unwrap();
    assert!(matches!(err, CullError::Setup(_)), "{err}");
}
