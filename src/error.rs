//! Error taxonomy for buffers, sampling and inference.
//!
//! Every rejected operation leaves the target unchanged: validation runs
//! before mutation, and no component retries on the caller's behalf.

use thiserror::Error;

/// Errors produced by sources and model callbacks running outside the crate.
///
/// Sources and preprocess/predict functions are externally supplied, so their
/// failures are carried through unchanged rather than mapped to a fixed enum.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from model callbacks (preprocess/predict) supplied to the pipeline.
pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur on buffer construction and mutation.
#[derive(Debug, Error)]
pub enum BufferError {
    /// A bounded buffer was created with a capacity below 1.
    #[error("buffer capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    /// A resampling buffer was created with a stride below 1.
    #[error("resampling stride must be at least 1, got {0}")]
    InvalidStride(usize),

    /// Incoming rows do not match the established element shape, or the
    /// columns of a single batch disagree on row count.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Incoming batch carries a different column set than the buffer.
    #[error("column set mismatch: expected {expected:?}, got {got:?}")]
    ColumnSetMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// `popleft` was called on a buffer holding zero rows.
    #[error("pop from empty buffer")]
    EmptyBuffer,
}

/// Errors from the fixed-rate sampler.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("sampler is already running")]
    AlreadyRunning,

    #[error("sampler is not running")]
    NotRunning,

    /// Sample rate must be a finite, positive number of Hz.
    #[error("sample rate must be positive, got {0}")]
    InvalidRate(f64),

    /// A source failed on the timer thread. The failure terminated the
    /// thread and is re-raised here from `read()` or `stop()`.
    #[error("source failed: {0}")]
    Source(SourceError),

    /// The timer thread panicked instead of exiting cleanly.
    #[error("timer thread panicked")]
    WorkerPanic,

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Errors from the windowed inference pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Window geometry is unusable (zero sizes, hop larger than window, ...).
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A preprocess or predict callback failed; passed through unchanged.
    #[error("model failure: {0}")]
    Model(ModelError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
