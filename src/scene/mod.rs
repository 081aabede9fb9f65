pub mod animation;
pub mod entity;
pub mod generator;
pub mod registry;
pub mod setup;

pub use entity::{DynamicSphereId, MeshEntity, MeshId};
pub use generator::generate_spheres;
pub use registry::{FlattenedScene, SceneRegistry};
pub use setup::{populate, SceneSummary};

use crate::camera::Camera;
use crate::config::TracerConfig;

/// Mutable scene content handed to frame subscribers
#[derive(Debug, Default)]
pub struct SceneState {
    pub registry: SceneRegistry,
    pub camera: Camera,
}

impl SceneState {
    pub fn new(config: &TracerConfig) -> Self {
        Self {
            registry: SceneRegistry::new(),
            camera: Camera::from_config(&config.camera),
        }
    }
}
