//! Internal identities and their transfer representation.
//!
//! An [`Identity`] is the stored form: typed attribute values, a hashed or
//! encrypted password, and the role/membership graph hanging off a user.
//! An [`IdentityTransferObject`] is the flat, string-valued form built
//! during reconciliation and handed to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cipher::CipherAlgorithm;
use crate::ids::IdentityId;
use crate::kind::IdentityKind;
use crate::value::AttrValue;

/// A stored attribute with zero or more typed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainAttr {
    /// Schema (attribute) name, unique per identity.
    pub schema: String,
    pub values: Vec<AttrValue>,
    /// Set when the schema enforces uniqueness; wins over `values`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_value: Option<AttrValue>,
}

impl PlainAttr {
    #[must_use]
    pub fn new(schema: impl Into<String>, values: Vec<AttrValue>) -> Self {
        Self {
            schema: schema.into(),
            values,
            unique_value: None,
        }
    }

    /// Builder-style setter for the unique value.
    #[must_use]
    pub fn with_unique(mut self, value: AttrValue) -> Self {
        self.unique_value = Some(value);
        self
    }

    /// Values rendered as strings, in stored order.
    #[must_use]
    pub fn string_values(&self) -> Vec<String> {
        self.values.iter().map(AttrValue::to_string_value).collect()
    }

    /// The values a mapping sees: the unique value when present, the
    /// multi-value list otherwise.
    #[must_use]
    pub fn effective_values(&self) -> Vec<String> {
        match &self.unique_value {
            Some(value) => vec![value.to_string_value()],
            None => self.string_values(),
        }
    }
}

/// An attribute computed from other local attributes via an expression.
///
/// The expression is evaluated lazily against [`Identity::expression_context`];
/// no value is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedAttr {
    pub schema: String,
    pub expression: String,
}

/// An attribute whose values live on external resources.
///
/// Only the declaration is stored locally; values are fetched through the
/// connector layer and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualAttr {
    pub schema: String,
}

/// A password as persisted: the encoded value plus the algorithm that
/// produced it. The clear text is never stored.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassword {
    pub value: String,
    pub algorithm: CipherAlgorithm,
}

impl std::fmt::Debug for StoredPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredPassword")
            .field("value", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// An internal identity: a user, a role, or a user's membership in a role.
///
/// Roles and memberships reuse the same shape with the fields that do not
/// apply (username, password, enabled, nested collections) left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<StoredPassword>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub plain_attrs: Vec<PlainAttr>,
    #[serde(default)]
    pub derived_attrs: Vec<DerivedAttr>,
    #[serde(default)]
    pub virtual_attrs: Vec<VirtualAttr>,
    /// Roles the user belongs to (users only).
    #[serde(default)]
    pub roles: Vec<Identity>,
    /// The user's memberships (users only). A membership's `role_id` links
    /// it back to the role it is for.
    #[serde(default)]
    pub memberships: Vec<Identity>,
    /// For memberships, the role this membership is in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<IdentityId>,
}

impl Identity {
    /// A bare identity of the given kind with a fresh id.
    #[must_use]
    pub fn new(kind: IdentityKind) -> Self {
        Self {
            id: IdentityId::new(),
            kind,
            username: None,
            password: None,
            enabled: None,
            plain_attrs: Vec::new(),
            derived_attrs: Vec::new(),
            virtual_attrs: Vec::new(),
            roles: Vec::new(),
            memberships: Vec::new(),
            role_id: None,
        }
    }

    /// Look up a stored attribute by schema name.
    #[must_use]
    pub fn plain_attr(&self, schema: &str) -> Option<&PlainAttr> {
        self.plain_attrs.iter().find(|a| a.schema == schema)
    }

    /// Look up a derived attribute declaration by schema name.
    #[must_use]
    pub fn derived_attr(&self, schema: &str) -> Option<&DerivedAttr> {
        self.derived_attrs.iter().find(|a| a.schema == schema)
    }

    /// Look up a virtual attribute declaration by schema name.
    #[must_use]
    pub fn virtual_attr(&self, schema: &str) -> Option<&VirtualAttr> {
        self.virtual_attrs.iter().find(|a| a.schema == schema)
    }

    /// Context for evaluating derived-attribute expressions against this
    /// identity: every stored attribute's first value plus `username` and
    /// `id`. Multi-valued attributes contribute their first value only.
    #[must_use]
    pub fn expression_context(&self) -> BTreeMap<String, String> {
        let mut ctx = BTreeMap::new();
        for attr in &self.plain_attrs {
            let value = attr
                .values
                .first()
                .map(AttrValue::to_string_value)
                .unwrap_or_default();
            ctx.insert(attr.schema.clone(), value);
        }
        if let Some(username) = &self.username {
            ctx.insert("username".to_string(), username.clone());
        }
        ctx.insert("id".to_string(), self.id.to_string());
        ctx
    }
}

/// A membership as carried inside a transfer object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipTransfer {
    /// Existing membership id, when this transfer updates a known identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_id: Option<IdentityId>,
    pub role_id: IdentityId,
    #[serde(default)]
    pub plain_attrs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub virtual_attrs: BTreeMap<String, Vec<String>>,
}

/// Flat, string-valued identity representation built from a connector
/// object during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityTransferObject {
    pub kind: IdentityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Clear-text password taken from the connector object, if any. Present
    /// only in transit; storage encodes it first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub plain_attrs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub derived_attrs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub virtual_attrs: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub memberships: Vec<MembershipTransfer>,
}

impl IdentityTransferObject {
    /// An empty transfer object of the given kind.
    #[must_use]
    pub fn new(kind: IdentityKind) -> Self {
        Self {
            kind,
            username: None,
            password: None,
            enabled: None,
            plain_attrs: BTreeMap::new(),
            derived_attrs: BTreeMap::new(),
            virtual_attrs: BTreeMap::new(),
            memberships: Vec::new(),
        }
    }

    /// Whether a plain attribute with this name is present and non-empty.
    #[must_use]
    pub fn has_plain_attr(&self, schema: &str) -> bool {
        self.plain_attrs
            .get(schema)
            .is_some_and(|values| values.iter().any(|v| !v.is_empty()))
    }

    /// Context for evaluating template expressions against this object:
    /// every plain attribute's first value plus `username`.
    #[must_use]
    pub fn to_expression_context(&self) -> BTreeMap<String, String> {
        let mut ctx = BTreeMap::new();
        for (schema, values) in &self.plain_attrs {
            ctx.insert(schema.clone(), values.first().cloned().unwrap_or_default());
        }
        if let Some(username) = &self.username {
            ctx.insert("username".to_string(), username.clone());
        }
        ctx
    }
}
