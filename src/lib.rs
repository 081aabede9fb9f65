pub mod camera;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod loaders;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod traits;
pub mod types;

pub use config::TracerConfig;
pub use error::{Result, TracerError};
pub use renderer::PathTracer;
