//! Per-frame animators driven by the frame event bus.

use glam::{Mat4, Quat, Vec3};

use super::entity::{DynamicSphereId, MeshId};
use super::SceneState;
use crate::config::AnimationConfig;
use crate::core::events::{FrameEventBus, SubscriptionId};

/// Rotate a mesh about its local up axis by `degrees` after every frame
pub fn spin_mesh(bus: &mut FrameEventBus<SceneState>, id: MeshId, degrees: f32) -> SubscriptionId {
    let step = Mat4::from_rotation_y(degrees.to_radians());
    bus.subscribe(move |_, scene: &mut SceneState| {
        if let Some(transform) = scene.registry.mesh(id).map(|mesh| mesh.transform) {
            scene.registry.set_mesh_transform(id, transform * step);
        }
    })
}

/// Carry a dynamic sphere around the world up axis by `degrees` after every frame
pub fn orbit_dynamic_sphere(
    bus: &mut FrameEventBus<SceneState>,
    id: DynamicSphereId,
    degrees: f32,
) -> SubscriptionId {
    let step = Quat::from_rotation_y(degrees.to_radians());
    bus.subscribe(move |_, scene: &mut SceneState| {
        if let Some(center) = scene.registry.dynamic_sphere(id).map(|s| s.center()) {
            scene.registry.set_dynamic_sphere_position(id, step * center);
        }
    })
}

/// Orbit the camera around the origin with an optional vertical swing
///
/// The swing is `sin(pi * frame / period) * wave_distance` above the height
/// the camera had when the animator was installed.
pub fn orbit_camera(
    bus: &mut FrameEventBus<SceneState>,
    config: &AnimationConfig,
    base_height: f32,
) -> SubscriptionId {
    let orbit = config.camera_orbit_degrees;
    let wave = config.camera_wave_distance;
    let period = config.camera_wave_period;

    bus.subscribe(move |frame, scene: &mut SceneState| {
        scene.camera.orbit(Vec3::ZERO, orbit);
        if wave != 0.0 && period != 0.0 {
            let swing = (std::f32::consts::PI * frame as f32 / period).sin() * wave;
            let mut position = scene.camera.position();
            position.y = base_height + swing;
            scene.camera.set_position(position);
        }
    })
}
