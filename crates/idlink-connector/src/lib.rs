//! Connector-side building blocks for idlink.
//!
//! Wire-level attribute types, the gateway trait the mapping engine uses
//! to reach external resources, and password encryption.

pub mod crypto;
pub mod error;
pub mod gateway;
pub mod types;

pub use crypto::{CryptoError, CryptoResult, Encryptor};
pub use error::{ConnectorError, ConnectorResult};
pub use gateway::ConnectorGateway;
pub use types::{
    ConnectorAttribute, ConnectorObject, PreparedAttributes, ENABLE_NAME, NAME_NAME,
    PASSWORD_NAME, UID_NAME,
};
