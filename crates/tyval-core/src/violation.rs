//! # Violations
//!
//! Structured validation failure records and the lazy sequence that yields
//! them.
//!
//! ## Laziness
//!
//! Evaluators implement [`ViolationWalk`]: a push-style walk that hands each
//! violation to a sink and stops as soon as the sink returns
//! [`ControlFlow::Break`]. [`Violations`] wraps a walker together with the
//! value under test, so `first()` evaluates only up to the first failure and
//! the sequence can be restarted any number of times.
//!
//! ## Messages
//!
//! Both evaluators report failures as a [`Fault`] (a kind plus a borrowed
//! detail) and only render the message text when a record is materialized.
//! Keeping the text here guarantees the interpreter and the compiled
//! program produce identical records.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::schema::Literal;
use crate::value::Value;

/// The kind of local failure a violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    Array,
    ArrayContains,
    ArrayMinContains,
    ArrayMaxContains,
    ArrayMinItems,
    ArrayMaxItems,
    ArrayUniqueItems,
    BigInt,
    BigIntExclusiveMaximum,
    BigIntExclusiveMinimum,
    BigIntMaximum,
    BigIntMinimum,
    BigIntMultipleOf,
    Boolean,
    Bytes,
    BytesMaxByteLength,
    BytesMinByteLength,
    Enum,
    Integer,
    IntegerExclusiveMaximum,
    IntegerExclusiveMinimum,
    IntegerMaximum,
    IntegerMinimum,
    IntegerMultipleOf,
    Intersect,
    IntersectUnevaluatedProperties,
    /// A custom kind rejected the value.
    Kind,
    Literal,
    Never,
    Not,
    Null,
    Number,
    NumberExclusiveMaximum,
    NumberExclusiveMinimum,
    NumberMaximum,
    NumberMinimum,
    NumberMultipleOf,
    Object,
    ObjectAdditionalProperties,
    ObjectMaxProperties,
    ObjectMinProperties,
    ObjectRequiredProperty,
    String,
    StringFormat,
    StringFormatUnknown,
    StringMaxLength,
    StringMinLength,
    StringPattern,
    Symbol,
    Tuple,
    TupleLength,
    Undefined,
    Union,
    /// A reference that could not be followed.
    Unresolved,
}

/// Parameter of a fault, borrowed from the schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detail<'a> {
    None,
    Size(usize),
    Number(f64),
    BigInt(i128),
    Text(&'a str),
    Literal(&'a Literal),
}

/// A local failure before its location and message are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fault<'a> {
    pub kind: ViolationKind,
    pub detail: Detail<'a>,
}

impl<'a> Fault<'a> {
    pub fn new(kind: ViolationKind) -> Self {
        Self {
            kind,
            detail: Detail::None,
        }
    }

    pub fn with(kind: ViolationKind, detail: Detail<'a>) -> Self {
        Self { kind, detail }
    }

    /// Render the human-readable message.
    pub fn message(&self) -> String {
        use ViolationKind as K;
        let d = DetailText(self.detail);
        match self.kind {
            K::Array => "Expected array".into(),
            K::ArrayContains => "Expected array to contain at least one matching value".into(),
            K::ArrayMinContains => format!("Expected array to contain at least {d} matching values"),
            K::ArrayMaxContains => format!("Expected array to contain no more than {d} matching values"),
            K::ArrayMinItems => format!("Expected array length to be greater or equal to {d}"),
            K::ArrayMaxItems => format!("Expected array length to be less or equal to {d}"),
            K::ArrayUniqueItems => "Expected array elements to be unique".into(),
            K::BigInt => "Expected bigint".into(),
            K::BigIntExclusiveMaximum => format!("Expected bigint to be less than {d}"),
            K::BigIntExclusiveMinimum => format!("Expected bigint to be greater than {d}"),
            K::BigIntMaximum => format!("Expected bigint to be less or equal to {d}"),
            K::BigIntMinimum => format!("Expected bigint to be greater or equal to {d}"),
            K::BigIntMultipleOf => format!("Expected bigint to be a multiple of {d}"),
            K::Boolean => "Expected boolean".into(),
            K::Bytes => "Expected bytes".into(),
            K::BytesMaxByteLength => format!("Expected byte length less or equal to {d}"),
            K::BytesMinByteLength => format!("Expected byte length greater or equal to {d}"),
            K::Enum => "Expected one of the enumerated values".into(),
            K::Integer => "Expected integer".into(),
            K::IntegerExclusiveMaximum => format!("Expected integer to be less than {d}"),
            K::IntegerExclusiveMinimum => format!("Expected integer to be greater than {d}"),
            K::IntegerMaximum => format!("Expected integer to be less or equal to {d}"),
            K::IntegerMinimum => format!("Expected integer to be greater or equal to {d}"),
            K::IntegerMultipleOf => format!("Expected integer to be a multiple of {d}"),
            K::Intersect => "Expected all values to match".into(),
            K::IntersectUnevaluatedProperties => format!("Unexpected property {d}"),
            K::Kind => format!("Expected kind '{d}'"),
            K::Literal => format!("Expected {d}"),
            K::Never => "Never".into(),
            K::Not => "Value should not match".into(),
            K::Null => "Expected null".into(),
            K::Number => "Expected number".into(),
            K::NumberExclusiveMaximum => format!("Expected number to be less than {d}"),
            K::NumberExclusiveMinimum => format!("Expected number to be greater than {d}"),
            K::NumberMaximum => format!("Expected number to be less or equal to {d}"),
            K::NumberMinimum => format!("Expected number to be greater or equal to {d}"),
            K::NumberMultipleOf => format!("Expected number to be a multiple of {d}"),
            K::Object => "Expected object".into(),
            K::ObjectAdditionalProperties => "Unexpected property".into(),
            K::ObjectMaxProperties => format!("Expected object to have no more than {d} properties"),
            K::ObjectMinProperties => format!("Expected object to have at least {d} properties"),
            K::ObjectRequiredProperty => "Expected required property".into(),
            K::String => "Expected string".into(),
            K::StringFormat => format!("Expected string to match '{d}' format"),
            K::StringFormatUnknown => format!("Unknown format '{d}'"),
            K::StringMaxLength => format!("Expected string length less or equal to {d}"),
            K::StringMinLength => format!("Expected string length greater or equal to {d}"),
            K::StringPattern => format!("Expected string to match '{d}'"),
            K::Symbol => "Expected symbol".into(),
            K::Tuple => "Expected tuple".into(),
            K::TupleLength => format!("Expected tuple to have {d} elements"),
            K::Undefined => "Expected undefined".into(),
            K::Union => "Expected union value".into(),
            K::Unresolved => format!("Unresolved reference '{d}'"),
        }
    }
}

struct DetailText<'a>(Detail<'a>);

impl fmt::Display for DetailText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Detail::None => Ok(()),
            Detail::Size(n) => write!(f, "{n}"),
            Detail::Number(n) => write!(f, "{n}"),
            Detail::BigInt(n) => write!(f, "{n}n"),
            Detail::Text(s) => f.write_str(s),
            Detail::Literal(l) => write!(f, "{l}"),
        }
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// JSON pointer to the failing location in the value.
    pub path: String,
    /// The value found at `path`.
    pub value: Value,
    pub message: String,
}

impl Violation {
    pub fn new(fault: Fault<'_>, path: String, value: &Value) -> Self {
        Self {
            kind: fault.kind,
            message: fault.message(),
            path,
            value: value.clone(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A sink receiving violations; `Break` stops the walk.
pub type Sink<'s> = dyn FnMut(Violation) -> ControlFlow<()> + 's;

/// An evaluator able to enumerate violations lazily.
pub trait ViolationWalk: Send + Sync {
    /// Push violations of `value` into `sink` in evaluation order, stopping
    /// as soon as the sink breaks.
    fn walk(&self, value: &Value, sink: &mut Sink<'_>) -> ControlFlow<()>;
}

/// A lazy, restartable sequence of violations.
#[derive(Clone)]
pub struct Violations {
    walker: Arc<dyn ViolationWalk>,
    value: Arc<Value>,
}

impl Violations {
    pub fn new(walker: Arc<dyn ViolationWalk>, value: Value) -> Self {
        Self {
            walker,
            value: Arc::new(value),
        }
    }

    /// The value being validated.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Visit violations in order until `visit` breaks.
    pub fn for_each(&self, mut visit: impl FnMut(Violation) -> ControlFlow<()>) {
        let _ = self.walker.walk(&self.value, &mut visit);
    }

    /// Evaluate only up to the first violation.
    pub fn first(&self) -> Option<Violation> {
        let mut found = None;
        self.for_each(|v| {
            found = Some(v);
            ControlFlow::Break(())
        });
        found
    }

    /// Evaluate up to `n` violations.
    pub fn take(&self, n: usize) -> Vec<Violation> {
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }
        self.for_each(|v| {
            out.push(v);
            if out.len() >= n {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        out
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    /// Enumerate the full sequence and count it.
    pub fn count(&self) -> usize {
        let mut n = 0;
        self.for_each(|_| {
            n += 1;
            ControlFlow::Continue(())
        });
        n
    }

    /// Enumerate the full sequence.
    pub fn to_vec(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        self.for_each(|v| {
            out.push(v);
            ControlFlow::Continue(())
        });
        out
    }
}

impl IntoIterator for &Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_vec().into_iter()
    }
}

impl fmt::Debug for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Violations")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// Raised by `assert`: carries the first violation and the lazy sequence.
#[derive(Error, Debug, Clone)]
#[error("assertion failed at {first}")]
pub struct AssertError {
    first: Box<Violation>,
    violations: Violations,
}

impl AssertError {
    pub fn new(first: Violation, violations: Violations) -> Self {
        Self {
            first: Box::new(first),
            violations,
        }
    }

    pub fn first(&self) -> &Violation {
        &self.first
    }

    /// The full lazy sequence, including the first violation.
    pub fn violations(&self) -> &Violations {
        &self.violations
    }
}

/// Check a value through a walker, returning the lazy sequence on failure.
pub fn assert_with(walker: Arc<dyn ViolationWalk>, value: &Value) -> Result<(), AssertError> {
    let violations = Violations::new(walker, value.clone());
    match violations.first() {
        None => Ok(()),
        Some(first) => Err(AssertError::new(first, violations)),
    }
}
