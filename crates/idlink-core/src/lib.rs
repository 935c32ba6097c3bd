//! Core domain types for idlink.
//!
//! This crate defines the shared building blocks the mapping and
//! provisioning crates operate on: typed identifiers, identity kinds and
//! mapping sources, attribute values, the identity model and its transfer
//! form, and password cipher identifiers.

pub mod cipher;
pub mod error;
pub mod identity;
pub mod ids;
pub mod kind;
pub mod value;

pub use cipher::{CipherAlgorithm, DEFAULT_SALTED_ITERATIONS};
pub use error::{CoreError, CoreResult};
pub use identity::{
    DerivedAttr, Identity, IdentityTransferObject, MembershipTransfer, PlainAttr, StoredPassword,
    VirtualAttr,
};
pub use ids::{IdentityId, ResourceId};
pub use kind::{IdentityKind, MappingSource};
pub use value::AttrValue;
