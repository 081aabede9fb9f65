use super::capture::frame_capture_path;
use super::timer::Delay;
use crate::config::SequenceConfig;
use crate::error::Result;
use crate::traits::FrameHost;

/// Stages of a sequenced render run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Not started
    Idle,
    /// Initial delay before the first frame
    WarmUp,
    /// Next tick dispatches a frame
    Dispatching,
    /// Next tick captures the displayed frame
    Capturing,
    /// Delay after a capture
    PostCapture,
    /// Next tick publishes the frame
    Advancing,
    /// Delay between frames
    Waiting,
    /// All frames produced
    Done,
    /// Stopped before completion
    Cancelled,
}

impl SequencerState {
    fn is_suspended(self) -> bool {
        matches!(
            self,
            SequencerState::WarmUp | SequencerState::PostCapture | SequencerState::Waiting
        )
    }
}

/// Produces exactly `max_render_count` frames, driven by host ticks
///
/// Each call to [`tick`](Self::tick) runs stages until it reaches a pending
/// suspension or has dispatched one frame, so the host presents every frame
/// before the next one is produced.
pub struct RenderSequencer {
    config: SequenceConfig,
    state: SequencerState,
    suspension: Delay,
    frame: u32,
}

impl RenderSequencer {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            state: SequencerState::Idle,
            suspension: Delay::new(),
            frame: 0,
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Frames dispatched and published so far in this run
    pub fn frames_completed(&self) -> u32 {
        self.frame
    }

    pub fn is_running(&self) -> bool {
        !matches!(
            self.state,
            SequencerState::Idle | SequencerState::Done | SequencerState::Cancelled
        )
    }

    /// Seconds until the pending suspension elapses
    pub fn time_until_resume(&self) -> f32 {
        if self.state.is_suspended() {
            self.suspension.remaining()
        } else {
            0.0
        }
    }

    /// Begin a new run; ignored while a run is in progress
    pub fn start(&mut self) {
        if self.is_running() {
            log::warn!("Render sequence already running, start ignored");
            return;
        }

        log::info!(
            "Starting render sequence: {} frames, {:.2}s warm-up, record={}",
            self.config.max_render_count,
            self.config.warm_up_delay,
            self.config.record
        );
        self.frame = 0;
        if self.config.max_render_count == 0 {
            self.state = SequencerState::Done;
            return;
        }
        self.suspension.arm(self.config.warm_up_delay);
        self.state = SequencerState::WarmUp;
    }

    /// Stop immediately and release the host's resources
    pub fn cancel<H: FrameHost>(&mut self, host: &mut H) {
        if self.state == SequencerState::Cancelled {
            return;
        }
        log::info!("Render sequence cancelled after {} frames", self.frame);
        self.abort(host);
    }

    fn abort<H: FrameHost>(&mut self, host: &mut H) {
        self.suspension.disarm();
        self.state = SequencerState::Cancelled;
        host.release_resources();
    }

    /// Advance by `delta` seconds
    pub fn tick<H: FrameHost>(&mut self, delta: f32, host: &mut H) -> Result<SequencerState> {
        match self.run_stages(delta, host) {
            Ok(()) => Ok(self.state),
            Err(e) => {
                log::error!("Render sequence failed at frame {}: {}", self.frame, e);
                self.abort(host);
                Err(e)
            }
        }
    }

    fn run_stages<H: FrameHost>(&mut self, mut delta: f32, host: &mut H) -> Result<()> {
        let mut dispatched = false;

        loop {
            match self.state {
                SequencerState::Idle | SequencerState::Done | SequencerState::Cancelled => {
                    return Ok(());
                }
                SequencerState::WarmUp | SequencerState::PostCapture | SequencerState::Waiting => {
                    if !self.suspension.advance(delta) {
                        return Ok(());
                    }
                    delta = 0.0;
                    self.state = match self.state {
                        SequencerState::PostCapture => SequencerState::Advancing,
                        _ => SequencerState::Dispatching,
                    };
                }
                SequencerState::Dispatching => {
                    if dispatched {
                        return Ok(());
                    }
                    host.mark_scene_dirty();
                    host.render_frame()?;
                    dispatched = true;
                    self.state = if self.config.record {
                        SequencerState::Capturing
                    } else {
                        SequencerState::Advancing
                    };
                }
                SequencerState::Capturing => {
                    let path = frame_capture_path(&self.config.capture_dir, self.frame);
                    host.capture_frame(&path)?;
                    if self.config.post_capture_delay > 0.0 {
                        self.suspension.arm(self.config.post_capture_delay);
                        self.state = SequencerState::PostCapture;
                    } else {
                        self.state = SequencerState::Advancing;
                    }
                }
                SequencerState::Advancing => {
                    host.publish_frame(self.frame);
                    self.frame += 1;
                    log::debug!("Frame {} of {} complete", self.frame, self.config.max_render_count);

                    if self.frame >= self.config.max_render_count {
                        log::info!("Render sequence done: {} frames", self.frame);
                        self.state = SequencerState::Done;
                    } else {
                        self.suspension.arm(self.config.frame_render_delay);
                        self.state = SequencerState::Waiting;
                    }
                }
            }
        }
    }
}
