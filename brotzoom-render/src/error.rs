use thiserror::Error;

/// Errors originating from the rendering pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid tile size: {width}×{height} (must be > 0)")]
    InvalidTileSize { width: u32, height: u32 },

    #[error("invalid tile job: {reason}")]
    InvalidJob { reason: String },

    #[error("render batch {epoch} was superseded before it completed")]
    Superseded { epoch: u64 },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("png encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Core(#[from] brotzoom_core::CoreError),
}
