//! Parsed document values.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use tempfile::{PathPersistError, TempPath};

/// Object entries in document order.
pub type Map = IndexMap<String, Value>;

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A value produced by the [`Parser`](crate::Parser).
///
/// Numbers are always `f64`; there is no integer/float distinction on input.
/// [`Value::Binary`] is only produced by binary extraction and never by
/// ordinary string decoding.
#[derive(Debug, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Any JSON number.
    Number(f64),
    /// A decoded string.
    String(String),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A string-keyed mapping.
    Object(Map),
    /// Bytes streamed to a temporary file instead of being held in memory.
    Binary(BinaryRef),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Binary(_) => "binary",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&BinaryRef> {
        match self {
            Self::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    /// Look up a key if this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }
}

impl From<Value> for serde_json::Value {
    /// Integral numbers within the exactly-representable range become JSON
    /// integers; non-finite numbers become `null`; binary references become
    /// their path.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => number_to_json(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
            Value::Binary(binary) => Self::String(binary.path().display().to_string()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

/// Convert a number to JSON, preferring the integer form when it is exact.
pub fn number_to_json(n: f64) -> serde_json::Value {
    if let Some(i) = exact_integer(n) {
        serde_json::Value::from(i)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

fn exact_integer(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER).then_some(n as i64)
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match exact_integer(*n) {
                // Keep the sign of negative zero, which the integer form loses.
                Some(i) if !(i == 0 && n.is_sign_negative()) => serializer.serialize_i64(i),
                _ => serializer.serialize_f64(*n),
            },
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Binary(binary) => serializer.collect_str(&binary.path().display()),
        }
    }
}

/// Handle to bytes extracted into a temporary file.
///
/// The file is deleted when the handle is dropped, unless ownership of the
/// path is taken with [`into_temp_path`](Self::into_temp_path) or
/// [`keep`](Self::keep).
#[derive(Debug)]
pub struct BinaryRef {
    path: TempPath,
}

impl BinaryRef {
    pub(crate) fn new(path: TempPath) -> Self {
        Self { path }
    }

    /// Location of the extracted bytes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the extracted payload in bytes.
    pub fn len(&self) -> io::Result<u64> {
        std::fs::metadata(&self.path).map(|meta| meta.len())
    }

    /// Whether the extracted payload is empty.
    pub fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Transfer ownership of the delete-on-drop path.
    pub fn into_temp_path(self) -> TempPath {
        self.path
    }

    /// Persist the file and return its path; it will no longer be deleted.
    pub fn keep(self) -> Result<PathBuf, PathPersistError> {
        self.path.keep()
    }
}

impl PartialEq for BinaryRef {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

impl fmt::Display for BinaryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binary:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1.0, serde_json::json!(1))]
    #[case(-3.0, serde_json::json!(-3))]
    #[case(1.5, serde_json::json!(1.5))]
    #[case(1e300, serde_json::json!(1e300))]
    #[case(f64::INFINITY, serde_json::Value::Null)]
    fn numbers_convert_to_json(#[case] n: f64, #[case] expected: serde_json::Value) {
        assert_eq!(serde_json::Value::from(Value::Number(n)), expected);
    }

    #[test]
    fn object_converts_recursively() {
        let mut map = Map::new();
        map.insert("a".into(), Value::Number(1.0));
        map.insert(
            "b".into(),
            Value::Array(vec![Value::Null, Value::Bool(true), Value::String("x".into())]),
        );
        let json: serde_json::Value = Value::Object(map).into();
        assert_eq!(json, serde_json::json!({"a": 1, "b": [null, true, "x"]}));
    }

    #[test]
    fn serialize_keeps_key_order() {
        let mut map = Map::new();
        map.insert("z".into(), Value::Number(2.0));
        map.insert("a".into(), Value::Number(0.25));
        let text = serde_json::to_string(&Value::Object(map)).unwrap();
        assert_eq!(text, r#"{"z":2,"a":0.25}"#);
    }

    #[test]
    fn serialize_negative_zero_as_float() {
        let text = serde_json::to_string(&Value::Number(-0.0)).unwrap();
        assert_eq!(text, "-0.0");
    }

    #[test]
    fn accessors() {
        let value = Value::from(serde_json::json!({"k": "v", "n": 2}));
        assert_eq!(value.get("k").and_then(Value::as_str), Some("v"));
        assert_eq!(value.get("n").and_then(Value::as_f64), Some(2.0));
        assert!(value.get("missing").is_none());
        assert_eq!(value.kind(), "object");
    }
}
