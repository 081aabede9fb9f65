use glam::{EulerRot, Mat4, Quat, Vec3};

use super::animation;
use super::entity::MeshEntity;
use super::generator::generate_spheres;
use super::SceneState;
use crate::config::{DynamicSphereConfig, MeshConfig, MeshSource, TracerConfig};
use crate::core::events::FrameEventBus;
use crate::error::{Result, TracerError};
use crate::loaders::load_gltf_mesh;
use crate::types::SphereData;

/// Counts of what `populate` put into the scene
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneSummary {
    pub static_spheres: usize,
    pub dynamic_spheres: usize,
    pub meshes: usize,
    pub animators: usize,
}

/// Register the configured content and subscribe its animators
pub fn populate(
    scene: &mut SceneState,
    events: &mut FrameEventBus<SceneState>,
    config: &TracerConfig,
) -> Result<SceneSummary> {
    config.spheres.validate()?;
    let mut summary = SceneSummary::default();

    let spheres = generate_spheres(&config.spheres);
    summary.static_spheres = spheres.len();
    scene.registry.register_static_spheres(spheres);

    for mesh in &config.meshes {
        let entity = load_mesh(mesh)?;
        log::info!(
            "Mesh '{}': {} vertices, {} triangles",
            entity.name,
            entity.vertex_count(),
            entity.triangle_count()
        );
        let id = scene.registry.register_mesh(entity);
        summary.meshes += 1;

        if mesh.spin_degrees != 0.0 {
            animation::spin_mesh(events, id, mesh.spin_degrees);
            summary.animators += 1;
        }
    }

    for sphere in &config.dynamic_spheres {
        let id = scene.registry.register_dynamic_sphere(dynamic_sphere(sphere));
        summary.dynamic_spheres += 1;

        if sphere.orbit_degrees != 0.0 {
            animation::orbit_dynamic_sphere(events, id, sphere.orbit_degrees);
            summary.animators += 1;
        }
    }

    let motion = &config.animation;
    if motion.camera_orbit_degrees != 0.0 || motion.camera_wave_distance != 0.0 {
        animation::orbit_camera(events, motion, scene.camera.position().y);
        summary.animators += 1;
    }

    log::info!(
        "Scene ready: {} static spheres, {} dynamic spheres, {} meshes, {} animators",
        summary.static_spheres,
        summary.dynamic_spheres,
        summary.meshes,
        summary.animators
    );
    Ok(summary)
}

fn load_mesh(config: &MeshConfig) -> Result<MeshEntity> {
    let entity = match &config.source {
        MeshSource::Gltf { path } => {
            if !path.exists() {
                return Err(TracerError::missing("mesh file", path));
            }
            load_gltf_mesh(path)?
        }
        MeshSource::Cube { size } => MeshEntity::cube(*size),
    };
    Ok(entity.with_transform(mesh_transform(config)))
}

/// Scale, then rotate Z, X, Y, then translate
pub fn mesh_transform(config: &MeshConfig) -> Mat4 {
    let [rx, ry, rz] = config.rotation_degrees.map(f32::to_radians);
    Mat4::from_scale_rotation_translation(
        Vec3::splat(config.scale),
        Quat::from_euler(EulerRot::YXZ, ry, rx, rz),
        Vec3::from_array(config.translation),
    )
}

fn dynamic_sphere(config: &DynamicSphereConfig) -> SphereData {
    SphereData::new(Vec3::from_array(config.position), config.radius)
        .with_albedo(config.albedo)
        .with_specular(config.specular)
        .with_smoothness(config.smoothness)
        .with_emission(config.emission)
}
