//! Error taxonomy for the analysis path.
//!
//! Everything between "the user picked a file" and "a detection result came
//! back" reports through `AnalysisError`. Configuration, preference files and
//! the CLI use `anyhow` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The selected media is neither `image/*` nor `video/*`, or no media is selected.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A still frame could not be produced from a video source.
    #[error("frame capture failed: {0}")]
    FrameCaptureFailed(String),

    /// The detection service could not be reached or returned garbage.
    #[error("analysis service unavailable: {0}")]
    AnalysisServiceUnavailable(String),

    #[error("failed to read media: {0}")]
    Io(#[from] std::io::Error),
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
