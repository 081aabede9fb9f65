use glam::{Mat4, Vec3};

/// Sphere primitive for the path tracer (56 bytes, tightly packed)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereData {
    pub position: [f32; 3],
    pub radius: f32,
    pub albedo: [f32; 3],
    pub specular: [f32; 3],
    pub smoothness: f32,
    pub emission: [f32; 3],
}

impl SphereData {
    /// Plain sphere with no material yet
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position: position.to_array(),
            radius,
            albedo: [0.0; 3],
            specular: [0.0; 3],
            smoothness: 0.0,
            emission: [0.0; 3],
        }
    }

    pub fn with_albedo(mut self, albedo: [f32; 3]) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn with_specular(mut self, specular: [f32; 3]) -> Self {
        self.specular = specular;
        self
    }

    pub fn with_smoothness(mut self, smoothness: f32) -> Self {
        self.smoothness = smoothness.clamp(0.0, 1.0);
        self
    }

    pub fn with_emission(mut self, emission: [f32; 3]) -> Self {
        self.emission = emission;
        self
    }

    pub fn center(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn set_center(&mut self, position: Vec3) {
        self.position = position.to_array();
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.iter().any(|&c| c > 0.0)
    }

    /// True when the two spheres interpenetrate
    pub fn overlaps(&self, other: &SphereData) -> bool {
        let min_dist = self.radius + other.radius;
        self.center().distance_squared(other.center()) < min_dist * min_dist
    }
}

/// Mesh instance record: world transform plus a range into the index pool (72 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshObjectData {
    pub local_to_world: [[f32; 4]; 4],
    pub indices_offset: u32,
    pub indices_count: u32,
}

impl MeshObjectData {
    pub fn new(local_to_world: Mat4, indices_offset: u32, indices_count: u32) -> Self {
        Self {
            local_to_world: local_to_world.to_cols_array_2d(),
            indices_offset,
            indices_count,
        }
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.local_to_world)
    }
}

/// Vertex position as stored in the vertex pool (12 bytes)
pub type VertexData = [f32; 3];
