//! Core error types.

use thiserror::Error;

/// Errors from parsing core model values.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// An identity kind string did not match any known kind.
    #[error("unknown identity kind: {value}")]
    UnknownKind { value: String },

    /// A cipher algorithm identifier is unknown or a retired legacy name.
    #[error("unknown cipher algorithm: {value}")]
    UnknownAlgorithm { value: String },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
