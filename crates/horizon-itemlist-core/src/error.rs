//! Error types for the core primitives.

use thiserror::Error;

/// Errors raised by signals, properties and deferred values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The connection ID is invalid or has already been disconnected.
    #[error("invalid or disconnected connection ID")]
    InvalidConnection,

    /// The receiving side of a deferred value was dropped before resolution.
    #[error("deferred value was dropped before it could be resolved")]
    DeferredDropped,
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
