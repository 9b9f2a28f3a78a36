//! Engine construction errors.

use thiserror::Error;

/// Errors that can occur while configuring an engine.
///
/// Rendering itself never fails; every variant here is a precondition
/// violation caught before any band is dispatched.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Samples per pixel must be positive, got {0}")]
    InvalidSamples(u32),

    #[error("Band chunk height must be positive")]
    InvalidChunkHeight,

    #[error("Progressive frame limit must be positive")]
    InvalidFrameLimit,

    #[error("Invalid camera: {0}")]
    InvalidCamera(String),

    #[error("Pulse refers to primitive {index}, but the scene has {len}")]
    InvalidPulse { index: usize, len: usize },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
