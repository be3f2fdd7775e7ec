//! Generic row model.
//!
//! # Responsibility
//! - Represent one table row as a column → value mapping.
//! - Convert between driver values, JSON-like input and typed keys.
//!
//! # Invariants
//! - A `Record` is flat: values are scalars, never nested collections.
//! - Column iteration order is deterministic (sorted by column name).

use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One scalar column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for FieldValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(value) => Self::Integer(value),
            ValueRef::Real(value) => Self::Real(value),
            ValueRef::Text(bytes) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Self::Blob(bytes.to_vec()),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Integer(value) => Value::Integer(value),
            FieldValue::Real(value) => Value::Real(value),
            FieldValue::Text(value) => Value::Text(value),
            FieldValue::Blob(value) => Value::Blob(value),
        }
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        value.clone().into()
    }
}

/// Error raised when structured input cannot become a flat record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    NotAnObject,
    NestedValue { column: String },
    Serialize(String),
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "record input must serialize to an object"),
            Self::NestedValue { column } => {
                write!(f, "column `{column}` holds a nested value; records must be flat")
            }
            Self::Serialize(message) => write!(f, "record input failed to serialize: {message}"),
        }
    }
}

impl Error for RecordError {}

/// One row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerces any serializable value with an object shape into a record.
    ///
    /// Booleans become `0`/`1`; arrays and nested objects are rejected.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, RecordError> {
        let json =
            serde_json::to_value(value).map_err(|err| RecordError::Serialize(err.to_string()))?;
        let serde_json::Value::Object(map) = json else {
            return Err(RecordError::NotAnObject);
        };

        let mut record = Self::new();
        for (column, value) in map {
            let field = match value {
                serde_json::Value::Null => FieldValue::Null,
                serde_json::Value::Bool(flag) => FieldValue::from(flag),
                serde_json::Value::Number(number) => match number.as_i64() {
                    Some(integer) => FieldValue::Integer(integer),
                    None => FieldValue::Real(number.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::String(text) => FieldValue::Text(text),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(RecordError::NestedValue { column });
                }
            };
            record.fields.insert(column, field);
        }
        Ok(record)
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(
        &mut self,
        column: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(column.into(), value.into())
    }

    /// Inserts only when `column` is not present yet.
    pub fn insert_if_absent(&mut self, column: &str, value: impl Into<FieldValue>) {
        if !self.fields.contains_key(column) {
            self.fields.insert(column.to_string(), value.into());
        }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.fields.remove(column)
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Primary-key value as supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Integer(i64),
    Text(String),
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for RecordKey {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldValue, Record, RecordError, RecordKey};
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct NewUser<'a> {
        name: &'a str,
        age: u8,
        admin: bool,
        nickname: Option<&'a str>,
    }

    #[test]
    fn from_serialize_flattens_struct_fields() {
        let record = Record::from_serialize(&NewUser {
            name: "Ana",
            age: 31,
            admin: true,
            nickname: None,
        })
        .unwrap();

        assert_eq!(record.get("name"), Some(&FieldValue::Text("Ana".into())));
        assert_eq!(record.get("age"), Some(&FieldValue::Integer(31)));
        assert_eq!(record.get("admin"), Some(&FieldValue::Integer(1)));
        assert_eq!(record.get("nickname"), Some(&FieldValue::Null));
    }

    #[test]
    fn from_serialize_accepts_maps() {
        let mut input = HashMap::new();
        input.insert("score", 1.5);
        let record = Record::from_serialize(&input).unwrap();
        assert_eq!(record.get("score"), Some(&FieldValue::Real(1.5)));
    }

    #[test]
    fn from_serialize_rejects_non_objects_and_nesting() {
        assert_eq!(
            Record::from_serialize(&vec![1, 2]).unwrap_err(),
            RecordError::NotAnObject
        );

        let nested = serde_json::json!({ "tags": ["a", "b"] });
        assert_eq!(
            Record::from_serialize(&nested).unwrap_err(),
            RecordError::NestedValue {
                column: "tags".to_string()
            }
        );
    }

    #[test]
    fn insert_if_absent_keeps_caller_value() {
        let mut record = Record::new().with("created_at", "2020-01-01 00:00:00");
        record.insert_if_absent("created_at", "2030-01-01 00:00:00");
        record.insert_if_absent("updated_at", "2030-01-01 00:00:00");

        assert_eq!(
            record.get("created_at").and_then(FieldValue::as_str),
            Some("2020-01-01 00:00:00")
        );
        assert!(record.contains_key("updated_at"));
    }

    #[test]
    fn record_serializes_as_plain_object() {
        let record = Record::new().with("id", 7).with("name", "Ana").with("bio", None::<String>);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({ "bio": null, "id": 7, "name": "Ana" }));
    }

    #[test]
    fn record_key_display_matches_raw_value() {
        assert_eq!(RecordKey::from(42).to_string(), "42");
        assert_eq!(RecordKey::from("abc").to_string(), "abc");
    }
}
