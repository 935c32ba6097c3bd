//! Wire-level attribute types exchanged with external resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name attribute: the human-readable identifier on the resource.
pub const NAME_NAME: &str = "__NAME__";

/// Uid attribute: the resource-assigned unique identifier.
pub const UID_NAME: &str = "__UID__";

/// Password attribute.
pub const PASSWORD_NAME: &str = "__PASSWORD__";

/// Enable attribute: account activation status.
pub const ENABLE_NAME: &str = "__ENABLE__";

/// A named, multi-valued attribute as seen by a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorAttribute {
    pub name: String,
    pub values: Vec<String>,
}

impl ConnectorAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Single-valued convenience constructor.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }

    /// First value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

/// An object read from an external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorObject {
    /// Object class on the resource (e.g. `__ACCOUNT__`).
    pub object_class: String,
    pub attributes: Vec<ConnectorAttribute>,
}

impl ConnectorObject {
    #[must_use]
    pub fn new(object_class: impl Into<String>) -> Self {
        Self {
            object_class: object_class.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute, builder-style.
    #[must_use]
    pub fn with_attribute(mut self, attr: ConnectorAttribute) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Look up an attribute by name. Resources differ in case conventions,
    /// so the lookup is case-insensitive.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ConnectorAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Values of an attribute, or empty when absent.
    #[must_use]
    pub fn attribute_values(&self, name: &str) -> Vec<String> {
        self.attribute(name)
            .map(|a| a.values.clone())
            .unwrap_or_default()
    }

    /// The resource-assigned unique identifier.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.attribute(UID_NAME).and_then(ConnectorAttribute::first)
    }

    /// The human-readable name on the resource.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attribute(NAME_NAME)
            .and_then(ConnectorAttribute::first)
    }
}

/// The outcome of resolving a resource mapping against an identity:
/// everything a connector needs to create or update the external object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedAttributes {
    /// Value of the account-identifier item, before any name expression.
    pub account_id: Option<String>,
    /// Final `__NAME__` value sent to the resource.
    pub name: Option<String>,
    /// Clear-text password to set, when the mapping carries one.
    pub password: Option<String>,
    /// Account activation status, when pushed.
    pub enable: Option<bool>,
    /// Regular external attributes, keyed by external name.
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl PreparedAttributes {
    /// Stage values under an external name. Two mapping items may target
    /// the same external attribute; their values merge as an
    /// order-preserving union.
    pub fn stage(&mut self, ext_name: impl Into<String>, values: Vec<String>) {
        let existing = self.attributes.entry(ext_name.into()).or_default();
        for value in values {
            if !existing.contains(&value) {
                existing.push(value);
            }
        }
    }

    /// Staged values for an external name, or empty when absent.
    #[must_use]
    pub fn values(&self, ext_name: &str) -> &[String] {
        self.attributes
            .get(ext_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_case_insensitive() {
        let obj = ConnectorObject::new("__ACCOUNT__")
            .with_attribute(ConnectorAttribute::single("mail", "a@x.com"));

        assert!(obj.attribute("MAIL").is_some());
        assert!(obj.attribute("Mail").is_some());
        assert!(obj.attribute("phone").is_none());
        assert_eq!(obj.attribute_values("mail"), vec!["a@x.com".to_string()]);
        assert!(obj.attribute_values("phone").is_empty());
    }

    #[test]
    fn test_special_attribute_accessors() {
        let obj = ConnectorObject::new("__ACCOUNT__")
            .with_attribute(ConnectorAttribute::single(UID_NAME, "u-123"))
            .with_attribute(ConnectorAttribute::single(NAME_NAME, "jdoe"));

        assert_eq!(obj.uid(), Some("u-123"));
        assert_eq!(obj.name(), Some("jdoe"));
    }

    #[test]
    fn test_stage_merges_as_union() {
        let mut prepared = PreparedAttributes::default();
        prepared.stage("mail", vec!["a@x.com".to_string(), "b@x.com".to_string()]);
        prepared.stage("mail", vec!["b@x.com".to_string(), "c@x.com".to_string()]);

        assert_eq!(
            prepared.values("mail"),
            ["a@x.com", "b@x.com", "c@x.com"]
                .map(String::from)
                .as_slice()
        );
        assert!(prepared.values("phone").is_empty());
    }
}
