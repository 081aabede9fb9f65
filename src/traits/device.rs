use std::path::Path;

use crate::core::kernel::{KernelBindings, KernelParams};
use crate::error::Result;

/// Allocation and upload of storage buffers
pub trait BufferDevice {
    /// Device-side buffer handle
    type Buffer;

    /// Allocate a storage buffer of `size` bytes
    fn create_buffer(&self, label: &str, size: u64) -> Self::Buffer;

    /// Copy bytes into an existing buffer
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);

    /// Free a buffer handle
    fn release_buffer(&self, buffer: Self::Buffer);
}

/// Allocation of viewport-sized render targets and the accumulation blend
pub trait TargetDevice {
    /// Device-side render target handle
    type Target;

    /// Allocate a render target of the given size
    fn create_target(&self, label: &str, width: u32, height: u32) -> Self::Target;

    /// Free a render target
    fn release_target(&self, target: Self::Target);

    /// `destination = mix(destination, source, weight)` per pixel
    fn blend(&self, source: &Self::Target, destination: &Self::Target, weight: f32);
}

/// Full device surface used by the path tracer
pub trait RenderDevice: BufferDevice + TargetDevice {
    /// Run the tracing kernel once over `output`
    fn dispatch(
        &self,
        params: &KernelParams,
        bindings: &KernelBindings<'_, Self::Buffer>,
        output: &Self::Target,
    ) -> Result<()>;

    /// Persist the contents of `target` to `path`
    fn capture(&self, target: &Self::Target, path: &Path) -> Result<()>;
}
