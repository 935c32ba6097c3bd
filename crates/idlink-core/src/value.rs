//! Typed attribute values.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single typed value belonging to one attribute instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    /// A string value.
    Text(String),
    /// A 64-bit integer value.
    Number(i64),
    /// A boolean value.
    Flag(bool),
    /// A date/time value.
    Date(DateTime<Utc>),
    /// Binary data.
    Binary(Vec<u8>),
}

impl AttrValue {
    /// Get as a string slice if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is a number value.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as a boolean if this is a flag value.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Lossless string rendering used when a value crosses the connector
    /// boundary. Binary renders as base64, dates as RFC 3339.
    #[must_use]
    pub fn to_string_value(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Number(n) => n.to_string(),
            AttrValue::Flag(b) => b.to_string(),
            AttrValue::Date(d) => d.to_rfc3339(),
            AttrValue::Binary(bytes) => STANDARD.encode(bytes),
        }
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Flag(b)
    }
}

impl From<DateTime<Utc>> for AttrValue {
    fn from(d: DateTime<Utc>) -> Self {
        AttrValue::Date(d)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttrValue::Binary(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(AttrValue::from("mail").as_text(), Some("mail"));
        assert_eq!(AttrValue::from(42i64).as_number(), Some(42));
        assert_eq!(AttrValue::from(true).as_flag(), Some(true));
        assert_eq!(AttrValue::from(42i64).as_text(), None);
    }

    #[test]
    fn test_string_rendering() {
        assert_eq!(AttrValue::from("a@x.com").to_string_value(), "a@x.com");
        assert_eq!(AttrValue::from(7i64).to_string_value(), "7");
        assert_eq!(AttrValue::from(false).to_string_value(), "false");
        assert_eq!(
            AttrValue::Binary(vec![1, 2, 3]).to_string_value(),
            STANDARD.encode([1, 2, 3])
        );
    }

    #[test]
    fn test_serialization() {
        let value = AttrValue::from("hello");
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"type\":\"text\""));

        let parsed: AttrValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, value);
    }
}
