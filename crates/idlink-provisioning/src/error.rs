//! Mapping and reconciliation error types.

use idlink_connector::{ConnectorError, CryptoError};
use idlink_core::ResourceId;
use thiserror::Error;

use crate::password::PolicyConflict;

/// Error that can occur while resolving a resource mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The mapping definition itself is invalid.
    #[error("inconsistent mapping: {message}")]
    Inconsistent { message: String },

    /// The same virtual attribute was both replaced and cleared.
    #[error("conflicting deltas for virtual attribute: {attribute}")]
    ConflictingDelta { attribute: String },

    /// No account identifier value could be resolved for the resource.
    #[error("no account identifier value for resource {resource_id}")]
    MissingAccountId { resource_id: ResourceId },

    /// Password policy conflict.
    #[error(transparent)]
    Policy(#[from] PolicyConflict),

    /// Connector failure.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Crypto failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl MappingError {
    /// Create an inconsistent-mapping error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        MappingError::Inconsistent {
            message: message.into(),
        }
    }
}

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
