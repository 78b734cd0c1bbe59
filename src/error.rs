//! Error types for the stereogram engine

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The adapter cannot render into and then sample a depth texture.
    /// There is no fallback path without one.
    #[error("FATAL: depth texture capture is not supported by adapter '{adapter}'")]
    DepthCaptureUnsupported { adapter: String },

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("surface offers no usable texture format")]
    IncompatibleSurface,

    #[error("tile pool is empty")]
    EmptyTilePool,

    #[error("palette is empty")]
    EmptyPalette,

    #[error("readback failed: {0}")]
    Readback(String),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
