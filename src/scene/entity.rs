use glam::{Mat4, Vec3};

/// Handle to a registered mesh entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) u64);

/// Slot of a dynamic sphere in the registry arena
///
/// Ids carry the registry generation they were issued in, so ids from before
/// a `clear` no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DynamicSphereId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl DynamicSphereId {
    pub fn index(self) -> usize {
        self.index
    }
}

/// Mesh-bearing scene object
///
/// Vertices are in local space; `transform` maps them to world space and is
/// handed to the kernel unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshEntity {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub transform: Mat4,
}

impl MeshEntity {
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Axis-aligned cube of edge `size` centred on the origin
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let vertices = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 6, 2, 3, 7, 6, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        Self::new("Cube", vertices, indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
