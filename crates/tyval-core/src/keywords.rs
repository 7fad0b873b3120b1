//! Leaf keyword constraints shared by the interpreter and the compiled
//! program.
//!
//! Each function assumes the value already has the right primitive type
//! (except where it says otherwise) and reports every failing keyword in a
//! fixed order through `emit`, stopping when `emit` breaks.

use std::ops::ControlFlow;

use regex::Regex;

use crate::registry::FormatPredicate;
use crate::schema::{BigIntSchema, BytesSchema, NumberSchema, StringSchema};
use crate::value::Value;
use crate::violation::{Detail, Fault, ViolationKind as K};

/// `minLength`, `maxLength` (in chars), `pattern`, `format`.
///
/// `pattern` is the compiled form of `schema.pattern`; `format` is the
/// registered predicate for `schema.format`, `None` when unregistered.
pub fn string_faults<'a>(
    schema: &'a StringSchema,
    s: &str,
    pattern: Option<&Regex>,
    format: Option<&FormatPredicate>,
    emit: &mut impl FnMut(Fault<'a>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if schema.min_length.is_some() || schema.max_length.is_some() {
        let len = s.chars().count();
        if let Some(min) = schema.min_length {
            if len < min {
                emit(Fault::with(K::StringMinLength, Detail::Size(min)))?;
            }
        }
        if let Some(max) = schema.max_length {
            if len > max {
                emit(Fault::with(K::StringMaxLength, Detail::Size(max)))?;
            }
        }
    }
    if let Some(source) = &schema.pattern {
        if !pattern.is_some_and(|re| re.is_match(s)) {
            emit(Fault::with(K::StringPattern, Detail::Text(source)))?;
        }
    }
    if let Some(name) = &schema.format {
        match format {
            Some(predicate) if predicate(s) => {}
            Some(_) => emit(Fault::with(K::StringFormat, Detail::Text(name)))?,
            None => emit(Fault::with(K::StringFormatUnknown, Detail::Text(name)))?,
        }
    }
    ControlFlow::Continue(())
}

/// Type test plus bounds for `Number` and `Integer`.
///
/// Accepts any value; a non-number (or a non-integral number when
/// `integer` is set) reports the type fault and nothing else.
pub fn number_faults<'a>(
    schema: &'a NumberSchema,
    value: &Value,
    integer: bool,
    allow_nan: bool,
    emit: &mut impl FnMut(Fault<'a>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    let kinds = if integer {
        [
            K::Integer,
            K::IntegerExclusiveMaximum,
            K::IntegerExclusiveMinimum,
            K::IntegerMaximum,
            K::IntegerMinimum,
            K::IntegerMultipleOf,
        ]
    } else {
        [
            K::Number,
            K::NumberExclusiveMaximum,
            K::NumberExclusiveMinimum,
            K::NumberMaximum,
            K::NumberMinimum,
            K::NumberMultipleOf,
        ]
    };
    let n = match value {
        Value::Number(n) if integer && n.is_finite() && n.fract() == 0.0 => *n,
        Value::Number(n) if !integer && (allow_nan || n.is_finite()) => *n,
        _ => return emit(Fault::new(kinds[0])),
    };
    if let Some(x) = schema.exclusive_maximum {
        if !(n < x) {
            emit(Fault::with(kinds[1], Detail::Number(x)))?;
        }
    }
    if let Some(x) = schema.exclusive_minimum {
        if !(n > x) {
            emit(Fault::with(kinds[2], Detail::Number(x)))?;
        }
    }
    if let Some(x) = schema.maximum {
        if !(n <= x) {
            emit(Fault::with(kinds[3], Detail::Number(x)))?;
        }
    }
    if let Some(x) = schema.minimum {
        if !(n >= x) {
            emit(Fault::with(kinds[4], Detail::Number(x)))?;
        }
    }
    if let Some(m) = schema.multiple_of {
        if n % m != 0.0 {
            emit(Fault::with(kinds[5], Detail::Number(m)))?;
        }
    }
    ControlFlow::Continue(())
}

/// Bounds for `BigInt`. A zero `multipleOf` never matches.
pub fn bigint_faults<'a>(
    schema: &'a BigIntSchema,
    n: i128,
    emit: &mut impl FnMut(Fault<'a>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if let Some(x) = schema.exclusive_maximum {
        if n >= x {
            emit(Fault::with(K::BigIntExclusiveMaximum, Detail::BigInt(x)))?;
        }
    }
    if let Some(x) = schema.exclusive_minimum {
        if n <= x {
            emit(Fault::with(K::BigIntExclusiveMinimum, Detail::BigInt(x)))?;
        }
    }
    if let Some(x) = schema.maximum {
        if n > x {
            emit(Fault::with(K::BigIntMaximum, Detail::BigInt(x)))?;
        }
    }
    if let Some(x) = schema.minimum {
        if n < x {
            emit(Fault::with(K::BigIntMinimum, Detail::BigInt(x)))?;
        }
    }
    if let Some(m) = schema.multiple_of {
        if n.checked_rem(m) != Some(0) {
            emit(Fault::with(K::BigIntMultipleOf, Detail::BigInt(m)))?;
        }
    }
    ControlFlow::Continue(())
}

/// `minByteLength`, `maxByteLength`.
pub fn bytes_faults<'a>(
    schema: &'a BytesSchema,
    len: usize,
    emit: &mut impl FnMut(Fault<'a>) -> ControlFlow<()>,
) -> ControlFlow<()> {
    if let Some(min) = schema.min_byte_length {
        if len < min {
            emit(Fault::with(K::BytesMinByteLength, Detail::Size(min)))?;
        }
    }
    if let Some(max) = schema.max_byte_length {
        if len > max {
            emit(Fault::with(K::BytesMaxByteLength, Detail::Size(max)))?;
        }
    }
    ControlFlow::Continue(())
}

/// Whether any two items are deep-equal.
pub fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].iter().any(|b| a == b))
}

/// Whether `Undefined` satisfies `Undefined` only, or `null` too.
pub fn is_void(value: &Value, allow_null_void: bool) -> bool {
    match value {
        Value::Undefined => true,
        Value::Null => allow_null_void,
        _ => false,
    }
}
