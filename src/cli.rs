// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::config::TracerConfig;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "progressive-tracer")]
#[command(about = "GPU progressive path tracer", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of frames in the render sequence
    #[arg(long)]
    pub max_render_count: Option<u32>,

    /// Seconds to wait between frames
    #[arg(long = "frame-delay")]
    pub frame_delay: Option<f32>,

    /// Capture every frame to disk
    #[arg(long)]
    pub record: bool,

    /// Disable progressive accumulation
    #[arg(long)]
    pub no_accumulation: bool,

    /// Seed for sphere placement and sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Render without a window
    #[arg(long)]
    pub headless: bool,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// WGSL tracing kernel
    #[arg(long)]
    pub kernel: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut TracerConfig) {
        if let Some(count) = self.max_render_count {
            config.sequence.max_render_count = count;
        }
        if let Some(delay) = self.frame_delay {
            config.sequence.frame_render_delay = delay;
        }
        if self.record {
            config.sequence.record = true;
        }
        if self.no_accumulation {
            config.accumulation = false;
        }
        if let Some(seed) = self.seed {
            config.spheres.seed = seed;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(kernel) = &self.kernel {
            config.kernel_path = kernel.clone();
        }
    }
}
