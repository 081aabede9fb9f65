use std::path::PathBuf;

/// Errors raised while setting up or driving the tracer
#[derive(thiserror::Error, Debug)]
pub enum TracerError {
    /// Inconsistent or out-of-range configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required external resource (kernel, mesh, skybox) is missing
    #[error("Missing {kind} at {path:?}")]
    MissingResource { kind: &'static str, path: PathBuf },

    /// Mesh import failed
    #[error("Mesh load error: {0}")]
    MeshLoad(String),

    /// Adapter, device or mapping failure
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Frame capture failed
    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TracerError>;

impl TracerError {
    pub fn missing(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::MissingResource {
            kind,
            path: path.into(),
        }
    }
}
