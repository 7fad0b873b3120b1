//! # Runtime Values
//!
//! The dynamic value model every engine operation runs against. JSON alone
//! cannot express the primitive families a schema may describe (absence,
//! arbitrary-precision integers, opaque tokens, byte buffers), so the core
//! carries its own tree and converts to and from `serde_json::Value` at the
//! boundary.
//!
//! ## Conversions
//!
//! - `From<serde_json::Value>` is lossless in structure; every JSON number
//!   becomes an `f64`.
//! - [`Value::to_json`] is lossy: `Undefined` properties are dropped,
//!   `Undefined` array items become `null`, `BigInt` becomes an integer when
//!   it fits `i64` and a decimal string otherwise, `Bytes` become an array of
//!   integers, `Symbol` becomes its description (or `null`), and non-finite
//!   numbers become `null`.

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Insertion-ordered object representation.
///
/// Equality ignores key order (the `IndexMap` contract), which is what
/// structural deep-equality requires.
pub type Map = IndexMap<String, Value>;

/// A runtime value checked, coerced and transformed by the engines.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value (a missing property reads as `Undefined`).
    #[default]
    Undefined,
    /// The `null` literal.
    Null,
    /// A boolean.
    Bool(bool),
    /// A double-precision number.
    Number(f64),
    /// An integer beyond the exact range of `f64`.
    BigInt(i128),
    /// A UTF-8 string.
    String(String),
    /// An opaque unique token.
    Symbol(Symbol),
    /// A binary byte buffer.
    Bytes(Vec<u8>),
    /// An ordered sequence.
    Array(Vec<Value>),
    /// A string-keyed mapping.
    Object(Map),
}

/// An opaque, unique token. Two symbols are equal iff they share an id.
#[derive(Debug, Clone)]
pub struct Symbol {
    id: Uuid,
    description: Option<String>,
}

impl Symbol {
    /// Mint a fresh symbol with an optional description.
    pub fn new(description: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.map(str::to_string),
        }
    }

    /// The unique id of this symbol.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The human-readable description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

/// The structural family of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Undefined,
    Null,
    Boolean,
    Number,
    BigInt,
    String,
    Symbol,
    Bytes,
    Array,
    Object,
}

impl ValueType {
    /// Returns the lowercase name used in violation messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::BigInt => "bigint",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Bytes => "bytes",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Returns the structural family of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Undefined => ValueType::Undefined,
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::BigInt(_) => ValueType::BigInt,
            Self::String(_) => ValueType::String,
            Self::Symbol(_) => ValueType::Symbol,
            Self::Bytes(_) => ValueType::Bytes,
            Self::Array(_) => ValueType::Array,
            Self::Object(_) => ValueType::Object,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Convenience constructor for an object from key/value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Lossy conversion to JSON; see the module documentation for the rules.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Undefined | Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::BigInt(i) => match i64::try_from(*i) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(i.to_string()),
            },
            Self::String(s) => Json::String(s.clone()),
            Self::Symbol(sym) => sym
                .description()
                .map(|d| Json::String(d.to_string()))
                .unwrap_or(Json::Null),
            Self::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Self::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(map) => Json::Object(
                map.iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Integral values inside the `i64` range serialize as JSON integers so that
/// `{"x": 1}` survives a round trip textually.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::BigInt(i) => write!(f, "{i}n"),
            Self::Symbol(sym) => write!(f, "Symbol({})", sym.description().unwrap_or("")),
            other => write!(f, "{}", other.to_json()),
        }
    }
}
