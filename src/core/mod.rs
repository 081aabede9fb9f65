pub mod accumulation;
pub mod buffers;
pub mod capture;
pub mod events;
pub mod gpu_context;
pub mod kernel;
pub mod sequencer;
pub mod surface_renderer;
pub mod timer;
pub mod wgpu_device;

pub use accumulation::AccumulationController;
pub use buffers::{BufferId, SceneBufferManager};
pub use events::{FrameEventBus, SubscriptionId};
pub use gpu_context::GpuContext;
pub use kernel::{KernelBindings, KernelParams, KernelSlot};
pub use sequencer::{RenderSequencer, SequencerState};
pub use surface_renderer::SurfaceRenderer;
pub use timer::{Clock, Delay};
pub use wgpu_device::{RenderTarget, WgpuDevice};
