//! Tracer configuration, loaded from JSON and overridden from the command line.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TracerError};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub width: u32,
    pub height: u32,
    pub accumulation: bool,
    pub kernel_path: PathBuf,
    pub skybox_path: Option<PathBuf>,
    pub sequence: SequenceConfig,
    pub light: LightConfig,
    pub camera: CameraConfig,
    pub spheres: SphereGenConfig,
    pub meshes: Vec<MeshConfig>,
    pub dynamic_spheres: Vec<DynamicSphereConfig>,
    pub animation: AnimationConfig,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            accumulation: true,
            kernel_path: PathBuf::from("shaders/path_trace.wgsl"),
            skybox_path: None,
            sequence: SequenceConfig::default(),
            light: LightConfig::default(),
            camera: CameraConfig::default(),
            spheres: SphereGenConfig::default(),
            meshes: Vec::new(),
            dynamic_spheres: Vec::new(),
            animation: AnimationConfig::default(),
        }
    }
}

impl TracerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TracerError::missing("config file", path));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the tracer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TracerError::Config(format!(
                "viewport must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        self.sequence.validate()?;
        self.spheres.validate()?;
        self.camera.validate()?;
        for sphere in &self.dynamic_spheres {
            if sphere.radius <= 0.0 {
                return Err(TracerError::Config(format!(
                    "dynamic sphere radius must be positive, got {}",
                    sphere.radius
                )));
            }
        }
        Ok(())
    }
}

/// Frame sequencing options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Frames to produce per run
    pub max_render_count: u32,
    /// Seconds to wait between frames
    pub frame_render_delay: f32,
    /// Seconds to wait before the first frame
    pub warm_up_delay: f32,
    /// Seconds to wait after each capture
    pub post_capture_delay: f32,
    /// Capture every frame to disk
    pub record: bool,
    pub capture_dir: PathBuf,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_render_count: 360,
            frame_render_delay: 0.0,
            warm_up_delay: 1.0,
            post_capture_delay: 0.0,
            record: false,
            capture_dir: PathBuf::from("Render"),
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<()> {
        let delays = [
            ("frame_render_delay", self.frame_render_delay),
            ("warm_up_delay", self.warm_up_delay),
            ("post_capture_delay", self.post_capture_delay),
        ];
        for (name, value) in delays {
            if !value.is_finite() || value < 0.0 {
                return Err(TracerError::Config(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Directional light packed into the kernel parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub direction: [f32; 3],
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: [-0.3, -1.0, 0.4],
            intensity: 1.0,
        }
    }
}

/// Initial camera placement and projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 40.0, -120.0],
            look_at: [0.0, 0.0, 0.0],
            fov_degrees: 60.0,
            near: 0.3,
            far: 1000.0,
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(TracerError::Config(format!(
                "camera fov must be in (0, 180) degrees, got {}",
                self.fov_degrees
            )));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(TracerError::Config(format!(
                "camera clip planes must satisfy 0 < near < far, got {} / {}",
                self.near, self.far
            )));
        }
        if Vec3::from_array(self.position).distance_squared(Vec3::from_array(self.look_at)) == 0.0 {
            return Err(TracerError::Config(
                "camera position and look_at must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random static sphere generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereGenConfig {
    pub radius_range: [f32; 2],
    pub max_count: u32,
    pub placement_radius: f32,
    pub seed: u64,
    /// Probability of an emissive sphere
    pub emission_chance: f32,
    /// Probability of a metallic sphere
    pub metal_chance: f32,
    pub smoothness_range: [f32; 2],
    /// Placement draws allowed before accepting a shortfall
    pub max_attempts: Option<u32>,
}

impl Default for SphereGenConfig {
    fn default() -> Self {
        Self {
            radius_range: [3.0, 8.0],
            max_count: 100,
            placement_radius: 100.0,
            seed: 0,
            emission_chance: 0.3,
            metal_chance: 0.6,
            smoothness_range: [0.0, 1.0],
            max_attempts: None,
        }
    }
}

impl SphereGenConfig {
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts
            .unwrap_or_else(|| self.max_count.saturating_mul(100))
    }

    pub fn validate(&self) -> Result<()> {
        let [rmin, rmax] = self.radius_range;
        if !(rmin > 0.0 && rmax >= rmin) {
            return Err(TracerError::Config(format!(
                "sphere radius range must satisfy 0 < min <= max, got [{}, {}]",
                rmin, rmax
            )));
        }
        if self.placement_radius < 0.0 {
            return Err(TracerError::Config(format!(
                "placement radius must be non-negative, got {}",
                self.placement_radius
            )));
        }
        let chances_ok = (0.0..=1.0).contains(&self.emission_chance)
            && (0.0..=1.0).contains(&self.metal_chance)
            && self.emission_chance + self.metal_chance <= 1.0;
        if !chances_ok {
            return Err(TracerError::Config(format!(
                "material chances must be probabilities summing to at most 1, got emission {} metal {}",
                self.emission_chance, self.metal_chance
            )));
        }
        let [smin, smax] = self.smoothness_range;
        if !(0.0 <= smin && smin <= smax && smax <= 1.0) {
            return Err(TracerError::Config(format!(
                "smoothness range must lie within [0, 1], got [{}, {}]",
                smin, smax
            )));
        }
        Ok(())
    }
}

/// Where a mesh entity's geometry comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshSource {
    Gltf { path: PathBuf },
    Cube { size: f32 },
}

/// Mesh entity placed in the scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub source: MeshSource,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// Rotation about the local up axis applied after every frame
    #[serde(default)]
    pub spin_degrees: f32,
}

fn unit_scale() -> f32 {
    1.0
}

/// Individually registered sphere that may orbit the origin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicSphereConfig {
    pub position: [f32; 3],
    pub radius: f32,
    pub albedo: [f32; 3],
    pub specular: [f32; 3],
    pub smoothness: f32,
    pub emission: [f32; 3],
    /// Rotation about the world up axis applied after every frame
    pub orbit_degrees: f32,
}

impl Default for DynamicSphereConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 5.0, 0.0],
            radius: 5.0,
            albedo: [0.8, 0.8, 0.8],
            specular: [0.04, 0.04, 0.04],
            smoothness: 0.5,
            emission: [0.0; 3],
            orbit_degrees: 0.0,
        }
    }
}

/// Per-frame camera motion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Orbit of the camera about the world up axis, per frame
    pub camera_orbit_degrees: f32,
    /// Amplitude of the vertical camera swing
    pub camera_wave_distance: f32,
    /// Frames per half period of the swing
    pub camera_wave_period: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            camera_orbit_degrees: 0.0,
            camera_wave_distance: 0.0,
            camera_wave_period: 90.0,
        }
    }
}
