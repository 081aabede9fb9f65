use std::collections::HashMap;

use super::kernel::{KernelBindings, KernelSlot};
use crate::traits::BufferDevice;

/// Scene buffers owned by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferId {
    Spheres,
    MeshObjects,
    Vertices,
    Indices,
}

impl BufferId {
    pub fn label(self) -> &'static str {
        match self {
            BufferId::Spheres => "Sphere Buffer",
            BufferId::MeshObjects => "Mesh Object Buffer",
            BufferId::Vertices => "Vertex Buffer",
            BufferId::Indices => "Index Buffer",
        }
    }
}

/// Live device buffer plus the shape it was allocated for
struct SceneBuffer<B> {
    handle: B,
    count: usize,
    stride: usize,
}

/// Owns the storage buffers backing flattened scene data
///
/// This is the only place scene buffers are allocated or released. A buffer is
/// reallocated only when the element count or stride of an upload differs from
/// the live allocation; otherwise the data is copied into the existing buffer.
pub struct SceneBufferManager<B> {
    buffers: HashMap<BufferId, SceneBuffer<B>>,
    allocations: u64,
}

impl<B> SceneBufferManager<B> {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            allocations: 0,
        }
    }

    /// Upload `elements` into the buffer for `id`
    ///
    /// Empty input releases the buffer and leaves the slot unbound.
    pub fn upload<D, T>(&mut self, device: &D, id: BufferId, elements: &[T])
    where
        D: BufferDevice<Buffer = B>,
        T: bytemuck::Pod,
    {
        let count = elements.len();
        let stride = std::mem::size_of::<T>();

        let stale = self
            .buffers
            .get(&id)
            .is_some_and(|buffer| count == 0 || buffer.count != count || buffer.stride != stride);
        if stale {
            self.release(device, id);
        }

        if count == 0 {
            return;
        }

        if !self.buffers.contains_key(&id) {
            let size = (count * stride) as u64;
            log::debug!("Allocating {} ({} x {} bytes)", id.label(), count, stride);
            let handle = device.create_buffer(id.label(), size);
            self.allocations += 1;
            self.buffers.insert(id, SceneBuffer { handle, count, stride });
        }

        if let Some(buffer) = self.buffers.get(&id) {
            device.write_buffer(&buffer.handle, bytemuck::cast_slice(elements));
        }
    }

    /// Attach the buffer for `id` to a kernel slot, if one exists
    pub fn bind<'a>(&'a self, bindings: &mut KernelBindings<'a, B>, slot: KernelSlot, id: BufferId) {
        if let Some(buffer) = self.buffers.get(&id) {
            bindings.insert(slot, &buffer.handle);
        }
    }

    /// Release the buffer for `id`
    pub fn release<D>(&mut self, device: &D, id: BufferId)
    where
        D: BufferDevice<Buffer = B>,
    {
        if let Some(buffer) = self.buffers.remove(&id) {
            log::debug!("Releasing {}", id.label());
            device.release_buffer(buffer.handle);
        }
    }

    /// Release every owned buffer
    pub fn release_all<D>(&mut self, device: &D)
    where
        D: BufferDevice<Buffer = B>,
    {
        for (id, buffer) in self.buffers.drain() {
            log::debug!("Releasing {}", id.label());
            device.release_buffer(buffer.handle);
        }
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    pub fn count(&self, id: BufferId) -> Option<usize> {
        self.buffers.get(&id).map(|buffer| buffer.count)
    }

    pub fn stride(&self, id: BufferId) -> Option<usize> {
        self.buffers.get(&id).map(|buffer| buffer.stride)
    }

    /// Number of live buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total allocations performed over the manager's lifetime
    pub fn allocations(&self) -> u64 {
        self.allocations
    }
}

impl<B> Default for SceneBufferManager<B> {
    fn default() -> Self {
        Self::new()
    }
}
