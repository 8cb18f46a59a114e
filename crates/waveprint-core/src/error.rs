//! Engine error types
//!
//! Every failure surfaces as a structured value with a stable kind string
//! and a human-readable message.

use thiserror::Error;

/// Errors produced by the fingerprinting engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unreadable file, unsupported format, or zero-length audio.
    #[error("input error: {0}")]
    Input(String),

    /// A configuration value violates its documented constraints.
    #[error("config error: {0}")]
    Config(String),

    /// Failure of the fingerprint store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The transcoder subprocess could not be spawned or exited nonzero.
    #[error("transcode error: {0}")]
    Transcode(String),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Input(_) => "input",
            EngineError::Config(_) => "config",
            EngineError::Store(_) => "store",
            EngineError::Transcode(_) => "transcode",
            EngineError::Cancelled => "cancelled",
        }
    }
}

/// Errors produced by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A work with the same dedup key is already registered.
    #[error("duplicate work: {0}")]
    Duplicate(String),

    /// Any I/O or backend failure.
    #[error("store i/o failure: {0}")]
    Io(String),
}
