// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema-less session metadata.
//!
//! Metadata is an ordered map of string keys to a small closed set of
//! JSON-like values. The engine never interprets user metadata beyond
//! inferring field types for reporting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Session metadata, ordered by key.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single metadata value.
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so whole numbers keep their integer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<MetadataValue>),
    Map(BTreeMap<String, MetadataValue>),
}

impl MetadataValue {
    /// Returns the string slice if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `f64` for either numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }

    /// Encode as a JSON string suitable for binding into a `json(?)` argument.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<i32> for MetadataValue {
    fn from(value: i32) -> Self {
        MetadataValue::Integer(i64::from(value))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl<T: Into<MetadataValue>> From<Vec<T>> for MetadataValue {
    fn from(values: Vec<T>) -> Self {
        MetadataValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Build a [`Metadata`] map from key/value pairs.
///
/// ```
/// use sessiondb_core::metadata::{metadata, MetadataValue};
///
/// let m = metadata([("user", MetadataValue::from("alice")), ("turns", 3.into())]);
/// assert_eq!(m["turns"], MetadataValue::Integer(3));
/// ```
pub fn metadata<K, I>(pairs: I) -> Metadata
where
    K: Into<String>,
    I: IntoIterator<Item = (K, MetadataValue)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_deserialization_picks_narrowest_variant() {
        let m: Metadata = serde_json::from_str(
            r#"{"a":null,"b":true,"c":3,"d":2.5,"e":"x","f":[1,"y"],"g":{"h":false}}"#,
        )
        .unwrap();
        assert_eq!(m["a"], MetadataValue::Null);
        assert_eq!(m["b"], MetadataValue::Bool(true));
        assert_eq!(m["c"], MetadataValue::Integer(3));
        assert_eq!(m["d"], MetadataValue::Float(2.5));
        assert_eq!(m["e"], MetadataValue::Text("x".into()));
        assert_eq!(
            m["f"],
            MetadataValue::List(vec![MetadataValue::Integer(1), MetadataValue::Text("y".into())])
        );
        assert!(matches!(&m["g"], MetadataValue::Map(inner) if inner["h"] == MetadataValue::Bool(false)));
    }

    #[test]
    fn numeric_accessor_covers_both_number_variants() {
        assert_eq!(MetadataValue::from(4).as_f64(), Some(4.0));
        assert_eq!(MetadataValue::from(0.25).as_f64(), Some(0.25));
        assert_eq!(MetadataValue::from("4").as_f64(), None);
    }

    #[test]
    fn keys_iterate_in_sorted_order() {
        let m = metadata([("zeta", 1.into()), ("alpha", 2.into())]);
        let keys: Vec<_> = m.keys().cloned().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }
}
