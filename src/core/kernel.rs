//! Parameter contract of the external tracing kernel.
//!
//! The kernel is an opaque WGSL compute program with entry point `main` and an
//! 8x8 workgroup. It sees one bind group:
//!
//! | binding | resource                                          |
//! |---------|---------------------------------------------------|
//! | 0       | [`KernelParams`] uniform                          |
//! | 1       | working target, `texture_storage_2d<rgba16float, write>` |
//! | 2       | skybox `texture_2d<f32>`                          |
//! | 3       | skybox sampler                                    |
//! | 4..=7   | scene buffers, see [`KernelSlot`]                 |
//!
//! Scene buffers are tightly packed, so the kernel reads them as `array<f32>` /
//! `array<u32>` with the strides documented on each slot.

use glam::{Mat4, Vec2, Vec4};

pub const WORKGROUP_SIZE: u32 = 8;
pub const KERNEL_ENTRY_POINT: &str = "main";

pub const PARAMS_BINDING: u32 = 0;
pub const RESULT_BINDING: u32 = 1;
pub const SKYBOX_BINDING: u32 = 2;
pub const SKYBOX_SAMPLER_BINDING: u32 = 3;

/// Per-frame uniform block
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub camera_to_world: [[f32; 4]; 4],
    pub camera_inverse_projection: [[f32; 4]; 4],
    /// xyz = light direction, w = intensity
    pub directional_light: [f32; 4],
    pub pixel_offset: [f32; 2],
    pub time: f32,
    pub seed: f32,
    pub sphere_count: u32,
    pub mesh_object_count: u32,
    pub _pad: [u32; 2],
}

impl KernelParams {
    pub fn new(camera_to_world: Mat4, inverse_projection: Mat4, directional_light: Vec4) -> Self {
        Self {
            camera_to_world: camera_to_world.to_cols_array_2d(),
            camera_inverse_projection: inverse_projection.to_cols_array_2d(),
            directional_light: directional_light.to_array(),
            pixel_offset: [0.5, 0.5],
            time: 0.0,
            seed: 0.0,
            sphere_count: 0,
            mesh_object_count: 0,
            _pad: [0; 2],
        }
    }

    pub fn with_pixel_offset(mut self, offset: Vec2) -> Self {
        self.pixel_offset = offset.to_array();
        self
    }

    pub fn with_time(mut self, time: f32, seed: f32) -> Self {
        self.time = time;
        self.seed = seed;
        self
    }

    pub fn with_counts(mut self, sphere_count: usize, mesh_object_count: usize) -> Self {
        self.sphere_count = sphere_count as u32;
        self.mesh_object_count = mesh_object_count as u32;
        self
    }
}

/// Named scene-buffer inputs of the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelSlot {
    /// `SphereData`, stride 56
    Spheres,
    /// `MeshObjectData`, stride 72
    MeshObjects,
    /// `[f32; 3]`, stride 12
    Vertices,
    /// `u32`, stride 4
    Indices,
}

impl KernelSlot {
    pub const ALL: [KernelSlot; 4] = [
        KernelSlot::Spheres,
        KernelSlot::MeshObjects,
        KernelSlot::Vertices,
        KernelSlot::Indices,
    ];

    pub fn binding(self) -> u32 {
        match self {
            KernelSlot::Spheres => 4,
            KernelSlot::MeshObjects => 5,
            KernelSlot::Vertices => 6,
            KernelSlot::Indices => 7,
        }
    }
}

/// Buffers attached to kernel slots for one dispatch
///
/// Slots with no buffer are simply absent.
pub struct KernelBindings<'a, B> {
    entries: Vec<(KernelSlot, &'a B)>,
}

impl<'a, B> KernelBindings<'a, B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(KernelSlot::ALL.len()),
        }
    }

    /// Attach `buffer` to `slot`, replacing any previous attachment
    pub fn insert(&mut self, slot: KernelSlot, buffer: &'a B) {
        match self.entries.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = buffer,
            None => self.entries.push((slot, buffer)),
        }
    }

    pub fn get(&self, slot: KernelSlot) -> Option<&'a B> {
        self.entries
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, buffer)| *buffer)
    }

    pub fn contains(&self, slot: KernelSlot) -> bool {
        self.get(slot).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KernelSlot, &'a B)> + '_ {
        self.entries.iter().map(|(slot, buffer)| (*slot, *buffer))
    }
}

impl<B> Default for KernelBindings<'_, B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Workgroup count covering a `width` x `height` viewport
pub fn workgroup_count(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE))
}
