use std::path::PathBuf;
use thiserror::Error;

/// Everything in this crate surfaces failures through this enum; no retries
/// happen below it, the caller owns retry/backoff policy.
#[derive(Debug, Error)]
pub enum Error {
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("replay buffer holds no transitions to sample")]
    InsufficientData,

    #[error("cannot load checkpoint at {path}: {reason}")]
    CheckpointLoad { path: PathBuf, reason: String },

    #[error("invalid mode: {0}")]
    InvalidMode(&'static str),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
