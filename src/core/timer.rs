use std::time::Instant;

/// Wall clock that reports the delta between ticks
#[derive(Debug)]
pub struct Clock {
    last_tick: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
        }
    }

    /// Seconds since the previous tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta
    }

    pub fn reset(&mut self) {
        self.last_tick = Instant::now();
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot delay driven by host deltas rather than wall time
///
/// An armed delay of zero seconds elapses on the next `advance`, even with a
/// zero delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct Delay {
    remaining: Option<f32>,
}

impl Delay {
    /// Disarmed delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `seconds`, replacing any pending wait
    pub fn arm(&mut self, seconds: f32) {
        self.remaining = Some(seconds.max(0.0));
    }

    pub fn disarm(&mut self) {
        self.remaining = None;
    }

    pub fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    /// Consume `delta` seconds; true exactly once, when the wait elapses
    pub fn advance(&mut self, delta: f32) -> bool {
        let Some(left) = self.remaining else {
            return false;
        };

        let left = left - delta;
        if left <= 0.0 {
            self.remaining = None;
            true
        } else {
            self.remaining = Some(left);
            false
        }
    }

    /// Seconds left before the delay elapses (zero when disarmed)
    pub fn remaining(&self) -> f32 {
        self.remaining.unwrap_or(0.0)
    }
}
