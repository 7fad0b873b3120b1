//! Kind-specific schema payloads.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::codec::Codec;
use super::Schema;
use crate::config::DefaultedPropertyPolicy;
use crate::value::Value;

/// Pattern matched by integer-keyed records.
pub const INTEGER_KEY_PATTERN: &str = "^(0|[1-9][0-9]*)$";

/// A finite definition table: name → schema.
pub type Definitions = IndexMap<String, Schema>;

/// The discriminant of a schema node together with its keyword payload.
#[derive(Debug, Clone)]
pub enum Kind {
    /// Accepts every value.
    Any,
    /// Accepts every value; kept distinct from `Any` for callers that care.
    Unknown,
    /// Accepts nothing.
    Never,
    String(StringSchema),
    Number(NumberSchema),
    /// A finite number with no fractional part.
    Integer(NumberSchema),
    Boolean,
    Null,
    /// Absence of a value.
    Undefined,
    BigInt(BigIntSchema),
    Symbol,
    Bytes(BytesSchema),
    Literal(Literal),
    /// A closed enumeration of literal values.
    Enum(Vec<Literal>),
    Object(ObjectSchema),
    Array(ArraySchema),
    /// Fixed heterogeneous sequence with exact arity.
    Tuple(Vec<Schema>),
    Record(RecordSchema),
    Union(Vec<Schema>),
    Intersect(IntersectSchema),
    Not(Schema),
    /// Named pointer into an enclosing definition table or the external
    /// reference set.
    Ref(String),
    /// Pointer at the definition currently being evaluated.
    This,
    Cyclic(CyclicSchema),
    Codec(CodecSchema),
    Custom(CustomSchema),
}

impl Kind {
    /// Returns the kind name. Custom kinds report their registered name.
    pub fn name(&self) -> &str {
        match self {
            Self::Any => "Any",
            Self::Unknown => "Unknown",
            Self::Never => "Never",
            Self::String(_) => "String",
            Self::Number(_) => "Number",
            Self::Integer(_) => "Integer",
            Self::Boolean => "Boolean",
            Self::Null => "Null",
            Self::Undefined => "Undefined",
            Self::BigInt(_) => "BigInt",
            Self::Symbol => "Symbol",
            Self::Bytes(_) => "Bytes",
            Self::Literal(_) => "Literal",
            Self::Enum(_) => "Enum",
            Self::Object(_) => "Object",
            Self::Array(_) => "Array",
            Self::Tuple(_) => "Tuple",
            Self::Record(_) => "Record",
            Self::Union(_) => "Union",
            Self::Intersect(_) => "Intersect",
            Self::Not(_) => "Not",
            Self::Ref(_) => "Ref",
            Self::This => "This",
            Self::Cyclic(_) => "Cyclic",
            Self::Codec(_) => "Codec",
            Self::Custom(custom) => &custom.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Unanchored regular expression.
    pub pattern: Option<String>,
    /// Name resolved through the format registry.
    pub format: Option<String>,
}

/// Keywords shared by `Number` and `Integer`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BigIntSchema {
    pub minimum: Option<i128>,
    pub maximum: Option<i128>,
    pub exclusive_minimum: Option<i128>,
    pub exclusive_maximum: Option<i128>,
    pub multiple_of: Option<i128>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytesSchema {
    pub min_byte_length: Option<usize>,
    pub max_byte_length: Option<usize>,
}

/// A literal value a schema can pin.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(*n),
            Self::Boolean(b) => Value::Bool(*b),
        }
    }

    /// Returns true if `value` is exactly this literal.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String(a), Value::String(b)) => a == b,
            (Self::Number(a), Value::Number(b)) => a == b,
            (Self::Boolean(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Policy for keys not described by a schema.
#[derive(Debug, Clone, Default)]
pub enum Additional {
    /// Keyword absent: extra keys validate, but Clean removes them.
    #[default]
    Unspecified,
    /// Explicitly `true`: extra keys validate and survive Clean.
    Allow,
    /// Explicitly `false`: extra keys are a violation.
    Deny,
    /// Extra keys must satisfy this schema.
    Schema(Schema),
}

impl Additional {
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Self::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    /// Whether the keyword constrains extra keys at all.
    pub fn is_constraining(&self) -> bool {
        matches!(self, Self::Deny | Self::Schema(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, Schema>,
    pub additional: Additional,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
}

impl ObjectSchema {
    pub fn new<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Schema)>,
    {
        Self {
            properties: properties.into_iter().map(|(k, s)| (k.into(), s)).collect(),
            ..Self::default()
        }
    }

    pub fn with_additional(mut self, additional: Additional) -> Self {
        self.additional = additional;
        self
    }

    /// Derived `required` list: every property not marked optional.
    ///
    /// Under [`DefaultedPropertyPolicy::Optional`] properties carrying a
    /// default are excluded as well.
    pub fn required_keys(&self, policy: DefaultedPropertyPolicy) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|(_, schema)| is_required(schema, policy))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Keys whose schema carries the read-only modifier.
    pub fn readonly_keys(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|(_, schema)| schema.is_readonly())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

/// Whether a property schema makes its key required.
pub fn is_required(schema: &Schema, policy: DefaultedPropertyPolicy) -> bool {
    if schema.is_optional() {
        return false;
    }
    match policy {
        DefaultedPropertyPolicy::Required => true,
        DefaultedPropertyPolicy::Optional => schema.default_value().is_none(),
    }
}

#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub items: Schema,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    pub contains: Option<Schema>,
    pub min_contains: Option<usize>,
    pub max_contains: Option<usize>,
}

impl ArraySchema {
    pub fn new(items: Schema) -> Self {
        Self {
            items,
            min_items: None,
            max_items: None,
            unique_items: false,
            contains: None,
            min_contains: None,
            max_contains: None,
        }
    }
}

/// How a record selects the keys its value schema applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    /// Every key.
    String,
    /// Canonical non-negative integer strings.
    Integer,
    /// Keys matching an unanchored regular expression.
    Pattern(String),
}

impl RecordKey {
    /// The regular expression equivalent of this key policy.
    pub fn pattern(&self) -> &str {
        match self {
            Self::String => "^.*$",
            Self::Integer => INTEGER_KEY_PATTERN,
            Self::Pattern(pattern) => pattern,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub key: RecordKey,
    pub value: Schema,
    pub additional: Additional,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
}

impl RecordSchema {
    pub fn new(key: RecordKey, value: Schema) -> Self {
        Self {
            key,
            value,
            additional: Additional::Unspecified,
            min_properties: None,
            max_properties: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntersectSchema {
    pub members: Vec<Schema>,
    /// Applies to keys no member evaluates.
    pub unevaluated: Additional,
}

/// A locally embedded definition table plus its entry point.
#[derive(Debug, Clone)]
pub struct CyclicSchema {
    pub defs: Definitions,
    pub entry: String,
}

/// A decode/encode pair around an inner (encoded) schema.
#[derive(Clone)]
pub struct CodecSchema {
    pub inner: Schema,
    pub codec: Arc<dyn Codec>,
    /// Declared decoded shape, re-validated after decode and before encode.
    pub output: Option<Schema>,
}

impl fmt::Debug for CodecSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSchema")
            .field("inner", &self.inner)
            .field("codec", &self.codec.name())
            .field("output", &self.output)
            .finish()
    }
}

/// An opaque extension kind resolved through the kind registry.
#[derive(Debug, Clone)]
pub struct CustomSchema {
    pub name: String,
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Declared default: a literal or a zero-argument factory.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Descriptive keywords that never affect validation.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<DefaultValue>,
}

/// Bookkeeping flags that never appear in plain-data serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub optional: bool,
    pub readonly: bool,
}
