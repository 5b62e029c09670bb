// SPDX-FileCopyrightText: 2026 SessionDB Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metadata field discovery.

use std::collections::BTreeSet;

use serde::Serialize;
use sessiondb_core::MetadataValue;
use strum::{Display, EnumString};

/// Inferred type of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Date,
    Number,
    Boolean,
    Enum,
}

/// One metadata field as seen across sampled sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: FieldType,
    /// Whether the field has an expression index.
    pub indexed: bool,
    /// Distinct values, sorted. Only populated for enum fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Infer a field's type from sampled values.
///
/// All booleans make a boolean, all numbers a number, all RFC 3339 strings
/// a date. Other all-string fields with at most `enum_cap` distinct values
/// are enums; anything else, including mixed or nested values and fields
/// with no samples, is a string.
pub fn infer(values: &[MetadataValue], enum_cap: usize) -> (FieldType, Vec<String>) {
    if values.is_empty() {
        return (FieldType::String, Vec::new());
    }
    if values.iter().all(|v| matches!(v, MetadataValue::Bool(_))) {
        return (FieldType::Boolean, Vec::new());
    }
    if values
        .iter()
        .all(|v| matches!(v, MetadataValue::Integer(_) | MetadataValue::Float(_)))
    {
        return (FieldType::Number, Vec::new());
    }
    let Some(strings) = values.iter().map(MetadataValue::as_str).collect::<Option<Vec<_>>>() else {
        return (FieldType::String, Vec::new());
    };
    if strings
        .iter()
        .all(|s| sessiondb_core::timestamp::parse(s).is_ok())
    {
        return (FieldType::Date, Vec::new());
    }
    let distinct: BTreeSet<&str> = strings.into_iter().collect();
    if distinct.len() <= enum_cap {
        (
            FieldType::Enum,
            distinct.into_iter().map(str::to_string).collect(),
        )
    } else {
        (FieldType::String, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> Vec<MetadataValue> {
        values.iter().map(|v| MetadataValue::from(*v)).collect()
    }

    #[test]
    fn scalar_types() {
        assert_eq!(
            infer(&[true.into(), false.into()], 5).0,
            FieldType::Boolean
        );
        assert_eq!(infer(&[1.into(), 2.5.into()], 5).0, FieldType::Number);
        assert_eq!(
            infer(&text(&["2026-01-01T00:00:00Z", "2026-02-03T04:05:06.000001Z"]), 5).0,
            FieldType::Date
        );
    }

    #[test]
    fn few_distinct_strings_are_an_enum() {
        let (kind, values) = infer(&text(&["gold", "silver", "gold", "bronze"]), 3);
        assert_eq!(kind, FieldType::Enum);
        assert_eq!(values, vec!["bronze", "gold", "silver"]);
    }

    #[test]
    fn too_many_distinct_strings_are_plain_strings() {
        let (kind, values) = infer(&text(&["a", "b", "c", "d"]), 3);
        assert_eq!(kind, FieldType::String);
        assert!(values.is_empty());
    }

    #[test]
    fn mixed_or_missing_samples_fall_back_to_string() {
        assert_eq!(infer(&[1.into(), "x".into()], 5).0, FieldType::String);
        assert_eq!(infer(&[], 5).0, FieldType::String);
        assert_eq!(
            infer(&[MetadataValue::List(vec![1.into()])], 5).0,
            FieldType::String
        );
    }

    #[test]
    fn type_names_are_lowercase() {
        assert_eq!(FieldType::Enum.to_string(), "enum");
        assert_eq!(
            serde_json::to_value(FieldType::Boolean).unwrap(),
            serde_json::json!("boolean")
        );
    }
}
