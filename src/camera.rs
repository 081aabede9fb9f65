use glam::{Mat4, Quat, Vec3};

use crate::config::CameraConfig;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Pinhole camera described by position, yaw and pitch
///
/// Any transform change raises a flag the tracer consumes to restart
/// accumulation.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    fov: f32,
    near: f32,
    far: f32,
    changed: bool,
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            fov: 60f32.to_radians(),
            near: 0.3,
            far: 1000.0,
            changed: false,
        }
    }

    /// Camera at `position` facing `target`
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let dir = (target - position).normalize_or(Vec3::NEG_Z);
        let yaw = dir.x.atan2(dir.z);
        let pitch = dir.y.clamp(-1.0, 1.0).asin();
        Self::new(position, yaw, pitch)
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::looking_at(
            Vec3::from_array(config.position),
            Vec3::from_array(config.look_at),
        );
        camera.fov = config.fov_degrees.to_radians();
        camera.near = config.near;
        camera.far = config.far;
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    pub fn set_position(&mut self, position: Vec3) {
        if position != self.position {
            self.position = position;
            self.changed = true;
        }
    }

    /// Rotate about the vertical axis through `center`, keeping the relative view
    pub fn orbit(&mut self, center: Vec3, degrees: f32) {
        if degrees == 0.0 {
            return;
        }
        let angle = degrees.to_radians();
        let offset = Quat::from_rotation_y(angle) * (self.position - center);
        self.position = center + offset;
        self.yaw += angle;
        self.changed = true;
    }

    /// Local-to-world matrix; the camera looks down its local -Z
    pub fn camera_to_world(&self) -> Mat4 {
        let forward = self.forward();
        let right = self.right();
        let up = right.cross(forward);
        Mat4::from_cols(
            right.extend(0.0),
            up.extend(0.0),
            (-forward).extend(0.0),
            self.position.extend(1.0),
        )
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    pub fn inverse_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect).inverse()
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Return and clear the transform-changed flag
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}
