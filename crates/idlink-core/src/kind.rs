//! Identity kinds and mapping sources.
//!
//! An [`IdentityKind`] selects the schema/attribute variant an identity uses.
//! A [`MappingSource`] says where a mapping item reads its internal value
//! from: a plain, derived or virtual attribute scoped to a kind, or one of
//! the pseudo-attributes (username, identity id, password). The per-kind
//! constructors on `IdentityKind` replace the kind-switches the rest of the
//! code would otherwise repeat.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The logical kind of an internal identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// A user account.
    User,
    /// A role (group of entitlements).
    Role,
    /// A user's membership in a role.
    Membership,
}

impl IdentityKind {
    /// String representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::User => "user",
            IdentityKind::Role => "role",
            IdentityKind::Membership => "membership",
        }
    }

    /// Mapping source reading a plain attribute of this kind.
    #[must_use]
    pub fn plain(self) -> MappingSource {
        MappingSource::Plain(self)
    }

    /// Mapping source reading a derived attribute of this kind.
    #[must_use]
    pub fn derived(self) -> MappingSource {
        MappingSource::Derived(self)
    }

    /// Mapping source reading a virtual attribute of this kind.
    #[must_use]
    pub fn virtual_attr(self) -> MappingSource {
        MappingSource::Virtual(self)
    }

    /// Mapping source reading the identity id of this kind.
    #[must_use]
    pub fn identity_id(self) -> MappingSource {
        MappingSource::IdentityId(self)
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IdentityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(IdentityKind::User),
            "role" => Ok(IdentityKind::Role),
            "membership" => Ok(IdentityKind::Membership),
            other => Err(CoreError::UnknownKind {
                value: other.to_string(),
            }),
        }
    }
}

/// Where a mapping item reads its internal value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "scope", rename_all = "snake_case")]
pub enum MappingSource {
    /// A stored (plain) attribute of the given kind.
    Plain(IdentityKind),
    /// An attribute computed from other local attributes via an expression.
    Derived(IdentityKind),
    /// An attribute whose values live on an external resource.
    Virtual(IdentityKind),
    /// The identity's username (users only).
    Username,
    /// The identity's internal id.
    IdentityId(IdentityKind),
    /// The identity's password (users only).
    Password,
}

impl MappingSource {
    /// The identity kind this source is scoped to.
    ///
    /// Username and Password are user-only pseudo-attributes.
    #[must_use]
    pub fn scope(&self) -> IdentityKind {
        match self {
            MappingSource::Plain(kind)
            | MappingSource::Derived(kind)
            | MappingSource::Virtual(kind)
            | MappingSource::IdentityId(kind) => *kind,
            MappingSource::Username | MappingSource::Password => IdentityKind::User,
        }
    }

    /// Whether this source names a virtual attribute.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self, MappingSource::Virtual(_))
    }

    /// String representation (without the scope).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingSource::Plain(_) => "plain",
            MappingSource::Derived(_) => "derived",
            MappingSource::Virtual(_) => "virtual",
            MappingSource::Username => "username",
            MappingSource::IdentityId(_) => "identity_id",
            MappingSource::Password => "password",
        }
    }
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.as_str(), self.scope())
    }
}
