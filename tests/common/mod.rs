#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use progressive_tracer::config::{SequenceConfig, SphereGenConfig, TracerConfig};
use progressive_tracer::core::{KernelBindings, KernelParams, KernelSlot, RenderSequencer};
use progressive_tracer::traits::{BufferDevice, FrameHost, RenderDevice, TargetDevice};
use progressive_tracer::{Result, TracerError};

/// Buffer handle handed out by the recording device
#[derive(Debug, PartialEq)]
pub struct MockBuffer {
    pub id: u32,
    pub size: u64,
}

/// Target handle handed out by the recording device
#[derive(Debug, PartialEq)]
pub struct MockTarget {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// What the kernel saw for one dispatch
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub params: KernelParams,
    pub bound: Vec<(KernelSlot, u32)>,
    pub target: u32,
}

/// Device that records every call instead of touching a GPU
#[derive(Default)]
pub struct RecordingDevice {
    next_id: Cell<u32>,
    pub buffers_created: RefCell<Vec<(String, u64)>>,
    pub buffers_released: Cell<usize>,
    pub writes: RefCell<Vec<(u32, Vec<u8>)>>,
    pub targets_created: RefCell<Vec<(u32, u32)>>,
    pub targets_released: Cell<usize>,
    pub blends: RefCell<Vec<f32>>,
    pub dispatches: RefCell<Vec<DispatchRecord>>,
    pub captures: RefCell<Vec<PathBuf>>,
    pub fail_dispatch_at: Cell<Option<usize>>,
}

impl RecordingDevice {
    fn next_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers_created.borrow().len() - self.buffers_released.get()
    }

    pub fn live_targets(&self) -> usize {
        self.targets_created.borrow().len() - self.targets_released.get()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.borrow().len()
    }

    pub fn last_dispatch(&self) -> Option<DispatchRecord> {
        self.dispatches.borrow().last().cloned()
    }
}

impl BufferDevice for RecordingDevice {
    type Buffer = MockBuffer;

    fn create_buffer(&self, label: &str, size: u64) -> MockBuffer {
        self.buffers_created.borrow_mut().push((label.to_string(), size));
        MockBuffer {
            id: self.next_id(),
            size,
        }
    }

    fn write_buffer(&self, buffer: &MockBuffer, data: &[u8]) {
        assert!(data.len() as u64 <= buffer.size, "write overflows buffer");
        self.writes.borrow_mut().push((buffer.id, data.to_vec()));
    }

    fn release_buffer(&self, _buffer: MockBuffer) {
        self.buffers_released.set(self.buffers_released.get() + 1);
    }
}

impl TargetDevice for RecordingDevice {
    type Target = MockTarget;

    fn create_target(&self, _label: &str, width: u32, height: u32) -> MockTarget {
        self.targets_created.borrow_mut().push((width, height));
        MockTarget {
            id: self.next_id(),
            width,
            height,
        }
    }

    fn release_target(&self, _target: MockTarget) {
        self.targets_released.set(self.targets_released.get() + 1);
    }

    fn blend(&self, _source: &MockTarget, _destination: &MockTarget, weight: f32) {
        self.blends.borrow_mut().push(weight);
    }
}

impl RenderDevice for RecordingDevice {
    fn dispatch(
        &self,
        params: &KernelParams,
        bindings: &KernelBindings<'_, MockBuffer>,
        output: &MockTarget,
    ) -> Result<()> {
        if Some(self.dispatch_count()) == self.fail_dispatch_at.get() {
            return Err(TracerError::Gpu("device lost".to_string()));
        }
        self.dispatches.borrow_mut().push(DispatchRecord {
            params: *params,
            bound: bindings.iter().map(|(slot, buffer)| (slot, buffer.id)).collect(),
            target: output.id,
        });
        Ok(())
    }

    fn capture(&self, _target: &MockTarget, path: &Path) -> Result<()> {
        self.captures.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

/// Small, fast configuration with no start-up delays
pub fn test_config(frames: u32) -> TracerConfig {
    TracerConfig {
        width: 64,
        height: 48,
        sequence: SequenceConfig {
            max_render_count: frames,
            frame_render_delay: 0.0,
            warm_up_delay: 0.0,
            post_capture_delay: 0.0,
            record: false,
            capture_dir: PathBuf::from("Render"),
        },
        spheres: SphereGenConfig {
            max_count: 8,
            placement_radius: 50.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Tick the sequencer with zero deltas until it stops
pub fn run_sequence<H: FrameHost>(sequencer: &mut RenderSequencer, host: &mut H) {
    sequencer.start();
    for _ in 0..10_000 {
        if !sequencer.is_running() {
            return;
        }
        sequencer.tick(0.0, host).expect("sequence tick failed");
    }
    panic!("sequencer did not finish");
}
