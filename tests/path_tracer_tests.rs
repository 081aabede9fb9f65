mod common;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use glam::Vec3;
use progressive_tracer::config::{AnimationConfig, DynamicSphereConfig, MeshConfig, MeshSource};
use progressive_tracer::core::{BufferId, KernelSlot, RenderSequencer, SequencerState};
use progressive_tracer::scene::MeshEntity;
use progressive_tracer::traits::FrameHost;
use progressive_tracer::types::SphereData;
use progressive_tracer::{PathTracer, TracerError};

use common::{run_sequence, test_config, RecordingDevice};

fn tracer(frames: u32) -> PathTracer<RecordingDevice> {
    let config = test_config(frames);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    tracer.populate_scene(&config).unwrap();
    tracer
}

fn mesh_with_vertices(count: usize) -> MeshEntity {
    let vertices = (0..count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let indices = (0..count as u32 - 2).flat_map(|i| [0, i + 1, i + 2]).collect();
    MeshEntity::new(format!("Fan{}", count), vertices, indices)
}

// ============================================================================
// Sequenced runs
// ============================================================================

#[test]
fn three_frames_publish_in_order_and_accumulate() {
    let config = test_config(3);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    tracer.populate_scene(&config).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    tracer.subscribe(move |frame, _| sink.borrow_mut().push(frame));

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    run_sequence(&mut sequencer, &mut tracer);

    assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    assert_eq!(tracer.device().dispatch_count(), 3);
    assert_eq!(tracer.device().blends.borrow().len(), 3);
    assert!(tracer.device().captures.borrow().is_empty());
}

#[test]
fn recording_captures_each_frame() {
    let mut config = test_config(2);
    config.sequence.record = true;
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    run_sequence(&mut sequencer, &mut tracer);

    assert_eq!(
        *tracer.device().captures.borrow(),
        vec![
            PathBuf::from("Render/Frame_00000.png"),
            PathBuf::from("Render/Frame_00001.png"),
        ]
    );
}

#[test]
fn every_sequenced_frame_restarts_accumulation() {
    let config = test_config(4);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    tracer.populate_scene(&config).unwrap();

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    run_sequence(&mut sequencer, &mut tracer);

    // The sequencer dirties the registry before each dispatch
    assert!(tracer.device().blends.borrow().iter().all(|&w| w == 1.0));
    assert_eq!(tracer.sample_count(), 1);
}

#[test]
fn cancellation_stops_events_and_releases_resources() {
    let config = test_config(10);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    tracer.populate_scene(&config).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    tracer.subscribe(move |frame, _| sink.borrow_mut().push(frame));

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    sequencer.start();
    while seen.borrow().len() < 2 {
        sequencer.tick(0.0, &mut tracer).unwrap();
    }

    sequencer.cancel(&mut tracer);
    sequencer.tick(1.0, &mut tracer).unwrap();

    assert_eq!(sequencer.state(), SequencerState::Cancelled);
    assert_eq!(*seen.borrow(), vec![0, 1]);
    assert_eq!(tracer.device().dispatch_count(), 2);
    assert_eq!(tracer.device().live_buffers(), 0);
    assert_eq!(tracer.device().live_targets(), 0);
    assert!(tracer.buffers().is_empty());
}

#[test]
fn rendering_after_cancel_uploads_meshes_again() {
    let config = test_config(10);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    tracer.populate_scene(&config).unwrap();
    tracer.scene_mut().registry.register_mesh(MeshEntity::cube(2.0));

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    sequencer.start();
    sequencer.tick(0.0, &mut tracer).unwrap();
    sequencer.cancel(&mut tracer);
    assert!(tracer.buffers().is_empty());

    tracer.render_frame().unwrap();

    let bound: Vec<KernelSlot> = tracer
        .device()
        .last_dispatch()
        .unwrap()
        .bound
        .iter()
        .map(|(slot, _)| *slot)
        .collect();
    assert_eq!(
        bound,
        vec![
            KernelSlot::Spheres,
            KernelSlot::MeshObjects,
            KernelSlot::Vertices,
            KernelSlot::Indices,
        ]
    );
    assert_eq!(tracer.buffers().count(BufferId::Vertices), Some(8));
    assert_eq!(tracer.device().last_dispatch().unwrap().params.mesh_object_count, 1);
}

#[test]
fn dispatch_failure_aborts_the_run() {
    let config = test_config(5);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    tracer.populate_scene(&config).unwrap();
    tracer.device().fail_dispatch_at.set(Some(1));

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    sequencer.start();
    sequencer.tick(0.0, &mut tracer).unwrap();
    let err = sequencer.tick(0.0, &mut tracer).unwrap_err();

    assert!(matches!(err, TracerError::Gpu(_)));
    assert_eq!(sequencer.state(), SequencerState::Cancelled);
    assert_eq!(sequencer.frames_completed(), 1);
    assert_eq!(tracer.device().live_targets(), 0);
}

// ============================================================================
// Scene upload
// ============================================================================

#[test]
fn mesh_pools_are_concatenated_in_registration_order() {
    let mut tracer = tracer(1);
    let first = mesh_with_vertices(4);
    let first_index_count = first.index_count() as u32;
    tracer.scene_mut().registry.register_mesh(first);
    tracer.scene_mut().registry.register_mesh(mesh_with_vertices(6));

    tracer.render_frame().unwrap();

    let flat = tracer.scene().registry.flattened();
    assert_eq!(flat.vertices.len(), 10);
    let offsets: Vec<u32> = flat.mesh_objects.iter().map(|m| m.indices_offset).collect();
    assert_eq!(offsets, vec![0, first_index_count]);

    assert_eq!(tracer.buffers().count(BufferId::Vertices), Some(10));
    assert_eq!(tracer.buffers().stride(BufferId::Vertices), Some(12));
    assert_eq!(tracer.buffers().stride(BufferId::MeshObjects), Some(72));
    assert_eq!(tracer.buffers().stride(BufferId::Indices), Some(4));

    let dispatch = tracer.device().last_dispatch().unwrap();
    assert_eq!(dispatch.params.mesh_object_count, 2);
    assert_eq!(dispatch.bound.len(), 4);
}

#[test]
fn empty_scene_dispatches_with_nothing_bound() {
    let config = test_config(1);
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);

    tracer.render_frame().unwrap();

    let dispatch = tracer.device().last_dispatch().unwrap();
    assert!(dispatch.bound.is_empty());
    assert_eq!(dispatch.params.sphere_count, 0);
    assert_eq!(tracer.device().buffers_created.borrow().len(), 0);
}

#[test]
fn unchanged_scene_reuses_buffers() {
    let mut tracer = tracer(1);
    tracer.scene_mut().registry.register_mesh(MeshEntity::cube(1.0));

    tracer.render_frame().unwrap();
    let allocations = tracer.buffers().allocations();
    tracer.mark_scene_dirty();
    tracer.render_frame().unwrap();
    tracer.render_frame().unwrap();

    assert_eq!(tracer.buffers().allocations(), allocations);
    assert_eq!(tracer.device().live_buffers(), 4);
}

#[test]
fn removing_all_meshes_releases_mesh_buffers() {
    let mut tracer = tracer(1);
    let id = tracer.scene_mut().registry.register_mesh(MeshEntity::cube(1.0));
    tracer.render_frame().unwrap();
    assert!(tracer.buffers().contains(BufferId::Vertices));

    tracer.scene_mut().registry.unregister_mesh(id);
    tracer.render_frame().unwrap();

    assert!(!tracer.buffers().contains(BufferId::Vertices));
    assert!(!tracer.buffers().contains(BufferId::Indices));
    assert!(!tracer.buffers().contains(BufferId::MeshObjects));
    let bound: Vec<KernelSlot> = tracer
        .device()
        .last_dispatch()
        .unwrap()
        .bound
        .iter()
        .map(|(slot, _)| *slot)
        .collect();
    assert_eq!(bound, vec![KernelSlot::Spheres]);
}

#[test]
fn adding_a_dynamic_sphere_grows_the_sphere_buffer() {
    let mut tracer = tracer(1);
    tracer.render_frame().unwrap();
    assert_eq!(tracer.buffers().count(BufferId::Spheres), Some(8));

    tracer
        .scene_mut()
        .registry
        .register_dynamic_sphere(SphereData::new(Vec3::new(0.0, 200.0, 0.0), 4.0));
    tracer.render_frame().unwrap();

    assert_eq!(tracer.buffers().count(BufferId::Spheres), Some(9));
    assert_eq!(tracer.device().last_dispatch().unwrap().params.sphere_count, 9);
}

// ============================================================================
// Sample count
// ============================================================================

#[test]
fn sample_count_grows_while_nothing_changes() {
    let mut tracer = tracer(1);
    for _ in 0..3 {
        tracer.render_frame().unwrap();
    }
    assert_eq!(tracer.sample_count(), 3);
    assert_eq!(tracer.device().blends.borrow().as_slice(), &[1.0, 0.5, 1.0 / 3.0]);
}

#[test]
fn resize_resets_samples_and_recreates_targets() {
    let mut tracer = tracer(1);
    tracer.render_frame().unwrap();
    tracer.render_frame().unwrap();

    tracer.resize(128, 96);
    tracer.render_frame().unwrap();

    assert_eq!(tracer.sample_count(), 1);
    assert_eq!(
        *tracer.device().targets_created.borrow(),
        vec![(64, 48), (64, 48), (128, 96), (128, 96)]
    );
    assert_eq!(tracer.device().targets_released.get(), 2);
}

#[test]
fn zero_sized_resize_is_ignored() {
    let mut tracer = tracer(1);
    tracer.render_frame().unwrap();
    tracer.resize(0, 96);
    tracer.render_frame().unwrap();

    assert_eq!(tracer.viewport(), (64, 48));
    assert_eq!(tracer.sample_count(), 2);
}

#[test]
fn camera_change_resets_samples_when_accumulating() {
    let mut tracer = tracer(1);
    tracer.render_frame().unwrap();
    tracer.render_frame().unwrap();

    tracer.scene_mut().camera.set_position(Vec3::new(0.0, 50.0, -100.0));
    tracer.render_frame().unwrap();

    assert_eq!(tracer.sample_count(), 1);
}

#[test]
fn registry_rebuild_resets_samples() {
    let mut tracer = tracer(1);
    tracer.render_frame().unwrap();
    tracer.render_frame().unwrap();

    tracer.mark_scene_dirty();
    tracer.render_frame().unwrap();

    assert_eq!(tracer.sample_count(), 1);
}

#[test]
fn disabled_accumulation_never_blends_and_samples_pixel_centres() {
    let mut config = test_config(1);
    config.accumulation = false;
    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);

    tracer.render_frame().unwrap();
    tracer.scene_mut().camera.set_position(Vec3::new(5.0, 40.0, -120.0));
    tracer.render_frame().unwrap();

    assert!(tracer.device().blends.borrow().is_empty());
    assert_eq!(tracer.sample_count(), 0);
    let dispatch = tracer.device().last_dispatch().unwrap();
    assert_eq!(dispatch.params.pixel_offset, [0.5, 0.5]);
    assert!(!tracer.scene().camera.has_changed());
}

#[test]
fn accumulating_jitter_stays_within_half_pixel() {
    let mut tracer = tracer(1);
    for _ in 0..16 {
        tracer.render_frame().unwrap();
    }
    for dispatch in tracer.device().dispatches.borrow().iter() {
        let [x, y] = dispatch.params.pixel_offset;
        assert!((0.0..0.5).contains(&x) && (0.0..0.5).contains(&y));
    }
}

#[test]
fn capture_before_first_frame_is_an_error() {
    let tracer = tracer(1);
    let err = tracer.capture(std::path::Path::new("Render/Frame_00000.png")).unwrap_err();
    assert!(matches!(err, TracerError::Capture(_)));
}

// ============================================================================
// Animation through the event bus
// ============================================================================

#[test]
fn configured_animators_move_content_each_frame() {
    let mut config = test_config(3);
    config.meshes = vec![MeshConfig {
        source: MeshSource::Cube { size: 10.0 },
        translation: [0.0, 5.0, 0.0],
        rotation_degrees: [0.0; 3],
        scale: 1.0,
        spin_degrees: 1.5,
    }];
    config.dynamic_spheres = vec![DynamicSphereConfig {
        position: [30.0, 6.0, 0.0],
        orbit_degrees: -2.0,
        ..Default::default()
    }];
    config.animation = AnimationConfig {
        camera_orbit_degrees: -1.0,
        ..Default::default()
    };

    let mut tracer = PathTracer::new(RecordingDevice::default(), &config);
    let summary = tracer.populate_scene(&config).unwrap();
    assert_eq!(summary.animators, 3);
    let camera_start = tracer.scene().camera.position();

    let mut sequencer = RenderSequencer::new(config.sequence.clone());
    run_sequence(&mut sequencer, &mut tracer);

    let spheres = tracer.scene().registry.spheres();
    let orbiting = spheres.last().unwrap();
    assert!((orbiting.center() - Vec3::new(30.0, 6.0, 0.0)).length() > 1.0);
    assert!((orbiting.center().length() - Vec3::new(30.0, 6.0, 0.0).length()).abs() < 1e-3);
    assert_ne!(tracer.scene().camera.position(), camera_start);

    // Frame 0 is dispatched before any animator has run
    let dispatches = tracer.device().dispatches.borrow();
    assert_ne!(dispatches[0].params.camera_to_world, dispatches[1].params.camera_to_world);
}
