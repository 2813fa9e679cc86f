//! Dynamic values
//!
//! [`Value`] is what the codec encodes from and decodes into. It converts to
//! and from `serde_json::Value` so application payloads that travel as JSON
//! can be pushed through a schema.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value as Json};

/// Key carrying the branch name in the JSON form of a [`UnionSelector`].
pub const SELECTOR_TYPE_KEY: &str = "-type";
/// Key carrying the wrapped value in the JSON form of a [`UnionSelector`].
pub const SELECTOR_VALUE_KEY: &str = "-value";

/// Out-of-band hint that forces a union branch by name.
///
/// Encoding a `UnionSelector` against a union schema writes the index of the
/// branch named `type_name` instead of the first structurally matching one.
/// The selector never appears on the wire and is never produced by decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSelector {
    pub type_name: String,
    pub value: Value,
}

impl UnionSelector {
    pub fn new(type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

/// A value shaped by an Avro schema
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Fixed(Vec<u8>),
    Enum(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Record fields in schema order
    Record(Vec<(String, Value)>),
    Selected(Box<UnionSelector>),
}

impl Value {
    /// Wrap `value` so it is encoded through the union branch named `type_name`.
    pub fn selected(type_name: impl Into<String>, value: Value) -> Self {
        Value::Selected(Box::new(UnionSelector::new(type_name, value)))
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Fixed(_) => "fixed",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Selected(_) => "union selector",
        }
    }

    /// Look up a named member of a record or map value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            Value::Map(entries) => entries.get(name),
            _ => None,
        }
    }

    /// Convert from JSON. Objects holding exactly the `-type`/`-value` pair
    /// become a [`UnionSelector`].
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Boolean(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Long(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            Json::Object(mut object) => {
                let is_selector = object.len() == 2
                    && object.get(SELECTOR_TYPE_KEY).is_some_and(Json::is_string)
                    && object.contains_key(SELECTOR_VALUE_KEY);
                if is_selector
                    && let (Some(Json::String(type_name)), Some(value)) =
                        (object.remove(SELECTOR_TYPE_KEY), object.remove(SELECTOR_VALUE_KEY))
                {
                    return Value::selected(type_name, Value::from_json(value));
                }
                Value::Map(
                    object
                        .into_iter()
                        .map(|(k, v)| (k, Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Convert to JSON. Byte sequences map each byte to the code point of
    /// the same value, the Avro JSON convention.
    pub fn into_json(self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(b),
            Value::Int(i) => Json::from(i),
            Value::Long(l) => Json::from(l),
            Value::Float(f) => float_json(f as f64),
            Value::Double(d) => float_json(d),
            Value::Bytes(bytes) | Value::Fixed(bytes) => {
                Json::String(bytes.into_iter().map(char::from).collect())
            }
            Value::String(s) | Value::Enum(s) => Json::String(s),
            Value::Array(items) => Json::Array(items.into_iter().map(Value::into_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
            Value::Record(fields) => Json::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect::<Map<_, _>>(),
            ),
            Value::Selected(selector) => {
                let mut object = Map::new();
                object.insert(
                    SELECTOR_TYPE_KEY.to_string(),
                    Json::String(selector.type_name),
                );
                object.insert(SELECTOR_VALUE_KEY.to_string(), selector.value.into_json());
                Json::Object(object)
            }
        }
    }
}

/// Bytes of a string under the Avro JSON convention (one byte per code
/// point, code points above 0xFF are not representable).
pub(crate) fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(c).ok()).collect()
}

fn float_json(value: f64) -> Json {
    Number::from_f64(value).map(Json::Number).unwrap_or(Json::Null)
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from_json(json)
    }
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        value.into_json()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
