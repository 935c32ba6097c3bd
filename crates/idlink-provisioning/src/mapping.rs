//! Resource mapping definitions.
//!
//! A [`ResourceMapping`] declares how internal attributes translate to a
//! resource's external attributes, which item carries the account
//! identifier, and how the `__NAME__` value is derived.

use serde::{Deserialize, Serialize};
use tracing::warn;

use idlink_core::{MappingSource, ResourceId};

use crate::error::{MappingError, MappingResult};

/// Direction(s) a mapping item participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPurpose {
    /// Outbound only: internal values pushed to the resource.
    Propagation,
    /// Inbound only: external values pulled into transfer objects.
    Pull,
    /// Both directions.
    Both,
}

impl MappingPurpose {
    #[must_use]
    pub fn includes_propagation(&self) -> bool {
        matches!(self, MappingPurpose::Propagation | MappingPurpose::Both)
    }

    #[must_use]
    pub fn includes_pull(&self) -> bool {
        matches!(self, MappingPurpose::Pull | MappingPurpose::Both)
    }
}

/// One internal-to-external attribute correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingItem {
    /// Internal attribute name. Empty for pseudo-attribute sources
    /// (username, identity id, password), which carry no schema name.
    #[serde(default)]
    pub internal_attr: String,
    pub source: MappingSource,
    pub external_attr: String,
    /// Whether this item provides the account identifier.
    #[serde(default)]
    pub account_identifier: bool,
    /// Whether this item carries the password.
    #[serde(default)]
    pub password: bool,
    pub purpose: MappingPurpose,
}

impl MappingItem {
    /// A plain attribute correspondence active in both directions.
    #[must_use]
    pub fn new(
        source: MappingSource,
        internal_attr: impl Into<String>,
        external_attr: impl Into<String>,
    ) -> Self {
        Self {
            internal_attr: internal_attr.into(),
            source,
            external_attr: external_attr.into(),
            account_identifier: false,
            password: false,
            purpose: MappingPurpose::Both,
        }
    }

    /// Builder-style purpose override.
    #[must_use]
    pub fn with_purpose(mut self, purpose: MappingPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Mark this item as the account identifier.
    #[must_use]
    pub fn as_account_identifier(mut self) -> Self {
        self.account_identifier = true;
        self
    }

    /// A password item targeting `__PASSWORD__`.
    #[must_use]
    pub fn password_item() -> Self {
        Self {
            internal_attr: String::new(),
            source: MappingSource::Password,
            external_attr: idlink_connector::PASSWORD_NAME.to_string(),
            account_identifier: false,
            password: true,
            purpose: MappingPurpose::Propagation,
        }
    }
}

/// The full mapping for one external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMapping {
    pub resource_id: ResourceId,
    /// Resource name, used in logs.
    pub name: String,
    /// Expression producing the `__NAME__` value; falls back to the
    /// account identifier when absent or when it evaluates blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_link: Option<String>,
    /// Generate a random password when no password value is available.
    #[serde(default)]
    pub random_password_if_missing: bool,
    pub items: Vec<MappingItem>,
}

impl ResourceMapping {
    #[must_use]
    pub fn new(resource_id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            resource_id,
            name: name.into(),
            account_link: None,
            random_password_if_missing: false,
            items: Vec::new(),
        }
    }

    /// Add an item, builder-style.
    #[must_use]
    pub fn with_item(mut self, item: MappingItem) -> Self {
        self.items.push(item);
        self
    }

    /// Builder-style account link expression.
    #[must_use]
    pub fn with_account_link(mut self, expression: impl Into<String>) -> Self {
        self.account_link = Some(expression.into());
        self
    }

    /// The item providing the account identifier.
    ///
    /// When the definition carries more than one flagged item, the first
    /// wins and the extras are logged.
    #[must_use]
    pub fn account_identifier_item(&self) -> Option<&MappingItem> {
        let mut flagged = self.items.iter().filter(|i| i.account_identifier);
        let first = flagged.next();
        for extra in flagged {
            warn!(
                resource = %self.name,
                external_attr = %extra.external_attr,
                "ignoring extra account identifier item"
            );
        }
        first
    }

    /// Items participating in outbound propagation, in declared order.
    pub fn propagation_items(&self) -> impl Iterator<Item = &MappingItem> {
        self.items
            .iter()
            .filter(|i| i.purpose.includes_propagation())
    }

    /// Items participating in inbound pull, in declared order.
    pub fn pull_items(&self) -> impl Iterator<Item = &MappingItem> {
        self.items.iter().filter(|i| i.purpose.includes_pull())
    }

    /// Reject structurally invalid definitions eagerly, before any
    /// identity is mapped through them.
    pub fn validate(&self) -> MappingResult<()> {
        let identifier_count = self.items.iter().filter(|i| i.account_identifier).count();
        if identifier_count == 0 {
            return Err(MappingError::inconsistent(format!(
                "mapping for resource '{}' has no account identifier item",
                self.name
            )));
        }
        if identifier_count > 1 {
            return Err(MappingError::inconsistent(format!(
                "mapping for resource '{}' has {identifier_count} account identifier items",
                self.name
            )));
        }
        if self
            .items
            .iter()
            .any(|i| i.account_identifier && (i.password || i.source == MappingSource::Password))
        {
            return Err(MappingError::inconsistent(format!(
                "mapping for resource '{}' uses the password as account identifier",
                self.name
            )));
        }
        if self
            .items
            .iter()
            .any(|i| i.account_identifier && i.source.is_virtual())
        {
            return Err(MappingError::inconsistent(format!(
                "mapping for resource '{}' uses a virtual attribute as account identifier",
                self.name
            )));
        }
        Ok(())
    }
}
