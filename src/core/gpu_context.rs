use std::sync::Arc;
use wgpu::{Adapter, Buffer, Device, DeviceDescriptor, Features, Instance, Limits, Queue, Surface};
use winit::window::Window;

use crate::error::{Result, TracerError};

/// Shared GPU device and queue
///
/// Cheap to clone (Arc); the tracer device and the surface renderer share
/// one instance so textures can cross between them.
#[derive(Clone)]
pub struct GpuContext {
    adapter: Arc<Adapter>,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Create a GPU context without a surface (for offscreen rendering)
    pub async fn new() -> Result<Self> {
        let instance = Self::create_instance();
        let adapter = Self::request_adapter(&instance, None).await?;
        Self::from_adapter(adapter).await
    }

    /// Create a GPU context together with a surface for `window`
    ///
    /// The adapter is chosen to be compatible with the returned surface.
    pub async fn with_window(window: Arc<Window>) -> Result<(Self, Surface<'static>)> {
        let instance = Self::create_instance();
        let surface = instance
            .create_surface(window)
            .map_err(|e| TracerError::Gpu(format!("Failed to create surface: {}", e)))?;
        let adapter = Self::request_adapter(&instance, Some(&surface)).await?;
        let context = Self::from_adapter(adapter).await?;
        Ok((context, surface))
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Map a MAP_READ buffer and copy its contents out
    ///
    /// Blocks until all submitted work has finished.
    pub fn read_buffer_sync(&self, buffer: &Buffer) -> Result<Vec<u8>> {
        let buffer_slice = buffer.slice(..);

        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| TracerError::Gpu(format!("Device poll failed: {:?}", e)))?;

        match receiver.recv() {
            Ok(Ok(())) => {
                let data = buffer_slice.get_mapped_range();
                let result = data.to_vec();
                drop(data);
                buffer.unmap();
                Ok(result)
            }
            Ok(Err(e)) => Err(TracerError::Gpu(format!("Buffer mapping failed: {:?}", e))),
            Err(_) => Err(TracerError::Gpu(
                "Channel closed before receiving result".to_string(),
            )),
        }
    }

    fn create_instance() -> Instance {
        Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        })
    }

    async fn from_adapter(adapter: Adapter) -> Result<Self> {
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = Self::request_device(&adapter).await?;
        Ok(Self {
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    async fn request_adapter(instance: &Instance, surface: Option<&Surface<'_>>) -> Result<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| TracerError::Gpu(format!("Failed to find appropriate adapter: {:?}", e)))
    }

    async fn request_device(adapter: &Adapter) -> Result<(Device, Queue)> {
        let limits = Limits {
            max_storage_buffer_binding_size: adapter.limits().max_storage_buffer_binding_size,
            max_buffer_size: adapter.limits().max_buffer_size,
            ..Default::default()
        };

        adapter
            .request_device(&DeviceDescriptor {
                label: Some("Tracer Device"),
                required_features: Features::empty(),
                required_limits: limits,
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| TracerError::Gpu(format!("Failed to create device: {:?}", e)))
    }
}
