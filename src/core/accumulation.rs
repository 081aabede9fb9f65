use crate::traits::TargetDevice;

/// Working and converged targets sized to the viewport
struct TargetPair<T> {
    working: T,
    converged: T,
    width: u32,
    height: u32,
}

/// Progressive accumulation of successive kernel dispatches
///
/// The kernel writes into the working target; `advance` folds it into the
/// converged target as a running average weighted `1 / (samples + 1)`.
pub struct AccumulationController<T> {
    targets: Option<TargetPair<T>>,
    sample_count: u32,
    enabled: bool,
}

impl<T> AccumulationController<T> {
    pub fn new(enabled: bool) -> Self {
        Self {
            targets: None,
            sample_count: 0,
            enabled,
        }
    }

    /// Make sure both targets exist at `width` x `height`
    ///
    /// Returns true when the targets were (re)created, which also resets the
    /// sample count.
    pub fn ensure_targets<D>(&mut self, device: &D, width: u32, height: u32) -> bool
    where
        D: TargetDevice<Target = T>,
    {
        if self
            .targets
            .as_ref()
            .is_some_and(|t| t.width == width && t.height == height)
        {
            return false;
        }

        self.release(device);

        log::info!("Render targets re-initialised at {}x{}", width, height);
        self.targets = Some(TargetPair {
            working: device.create_target("Working Target", width, height),
            converged: device.create_target("Converged Target", width, height),
            width,
            height,
        });
        self.sample_count = 0;
        true
    }

    /// Restart convergence without resizing
    pub fn invalidate(&mut self) {
        self.sample_count = 0;
    }

    /// Blend the latest dispatch into the converged target
    pub fn advance<D>(&mut self, device: &D)
    where
        D: TargetDevice<Target = T>,
    {
        let Some(targets) = &self.targets else {
            return;
        };

        let weight = 1.0 / (self.sample_count as f32 + 1.0);
        device.blend(&targets.working, &targets.converged, weight);
        self.sample_count += 1;
    }

    /// Target to hand to the display pipeline
    pub fn current_target(&self) -> Option<&T> {
        self.targets.as_ref().map(|t| {
            if self.enabled {
                &t.converged
            } else {
                &t.working
            }
        })
    }

    /// Target the kernel writes into
    pub fn working_target(&self) -> Option<&T> {
        self.targets.as_ref().map(|t| &t.working)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.targets.as_ref().map(|t| (t.width, t.height))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.invalidate();
        }
    }

    /// Release both targets
    pub fn release<D>(&mut self, device: &D)
    where
        D: TargetDevice<Target = T>,
    {
        if let Some(targets) = self.targets.take() {
            device.release_target(targets.working);
            device.release_target(targets.converged);
        }
    }
}
