//! Best-effort primitive coercion.
//!
//! Strings, numbers, booleans, bigints and the `null`/`undefined` keywords
//! are converted toward the kind the schema expects. Anything that cannot be
//! converted is returned unchanged; validation decides what to make of it.

use tyval_core::graph::{record_key_matches, Env};
use tyval_core::schema::{Additional, Kind, Literal, Schema};
use tyval_core::Value;

use crate::scope::Engine;

impl Engine {
    pub(crate) fn convert(&self, value: &Value) -> Value {
        self.convert_at(&Env::root(), &self.root, value)
    }

    pub(crate) fn convert_at(&self, env: &Env, schema: &Schema, value: &Value) -> Value {
        match schema.kind() {
            Kind::String(_) => to_string(value).map(Value::String).unwrap_or_else(|| value.clone()),
            Kind::Number(_) => to_number(value).map(Value::Number).unwrap_or_else(|| value.clone()),
            Kind::Integer(_) => to_number(value)
                .map(|n| Value::Number(n.trunc()))
                .unwrap_or_else(|| value.clone()),
            Kind::Boolean => to_bool(value).map(Value::Bool).unwrap_or_else(|| value.clone()),
            Kind::BigInt(_) => to_bigint(value).map(Value::BigInt).unwrap_or_else(|| value.clone()),
            Kind::Null => match value {
                Value::String(s) if s.eq_ignore_ascii_case("null") => Value::Null,
                _ => value.clone(),
            },
            Kind::Undefined => match value {
                Value::String(s) if s == "undefined" => Value::Undefined,
                _ => value.clone(),
            },
            Kind::Literal(literal) => coerce_literal(literal, value).unwrap_or_else(|| value.clone()),
            Kind::Enum(literals) => literals
                .iter()
                .find_map(|literal| coerce_literal(literal, value))
                .unwrap_or_else(|| value.clone()),
            Kind::Object(obj) => match value {
                Value::Object(map) => Value::Object(
                    map.iter()
                        .map(|(key, v)| {
                            let converted = match (obj.properties.get(key), &obj.additional) {
                                (Some(property), _) => self.convert_at(env, property, v),
                                (None, Additional::Schema(extra)) => self.convert_at(env, extra, v),
                                (None, _) => v.clone(),
                            };
                            (key.clone(), converted)
                        })
                        .collect(),
                ),
                _ => value.clone(),
            },
            Kind::Record(record) => match value {
                Value::Object(map) => Value::Object(
                    map.iter()
                        .map(|(key, v)| {
                            let converted = if record_key_matches(&record.key, key, &self.patterns) {
                                self.convert_at(env, &record.value, v)
                            } else if let Additional::Schema(extra) = &record.additional {
                                self.convert_at(env, extra, v)
                            } else {
                                v.clone()
                            };
                            (key.clone(), converted)
                        })
                        .collect(),
                ),
                _ => value.clone(),
            },
            Kind::Array(arr) => match value {
                Value::Array(items) => {
                    Value::Array(items.iter().map(|item| self.convert_at(env, &arr.items, item)).collect())
                }
                _ => value.clone(),
            },
            Kind::Tuple(elements) => match value {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| match elements.get(i) {
                            Some(element) => self.convert_at(env, element, item),
                            None => item.clone(),
                        })
                        .collect(),
                ),
                _ => value.clone(),
            },
            Kind::Union(variants) => variants
                .iter()
                .find_map(|variant| {
                    let converted = self.convert_at(env, variant, value);
                    self.matches(env, variant, &converted).then_some(converted)
                })
                .unwrap_or_else(|| value.clone()),
            Kind::Intersect(intersect) => intersect
                .members
                .iter()
                .fold(value.clone(), |acc, member| self.convert_at(env, member, &acc)),
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => match env.follow(schema, &self.references) {
                Some(def) => self.convert_at(&Env::inside(&def), &def.schema, value),
                None => value.clone(),
            },
            Kind::Codec(codec) => self.convert_at(env, &codec.inner, value),
            Kind::Any
            | Kind::Unknown
            | Kind::Never
            | Kind::Symbol
            | Kind::Bytes(_)
            | Kind::Not(_)
            | Kind::Custom(_) => value.clone(),
        }
    }
}

/// A decimal string parsed as a finite number. Surrounding whitespace is
/// ignored; the words `inf` and `NaN` are not numeric.
fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.into()
    } else {
        n.to_string()
    }
}

fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(format_number(*n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::BigInt(i) => Some(i.to_string()),
        Value::Symbol(sym) => sym.description().map(str::to_string),
        _ => None,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => parse_numeric(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::BigInt(i) => Some(*i as f64),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Number(n) if *n == 1.0 => Some(true),
        Value::Number(n) if *n == 0.0 => Some(false),
        Value::BigInt(1) => Some(true),
        Value::BigInt(0) => Some(false),
        Value::String(s) if s == "1" || s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s == "0" || s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn to_bigint(value: &Value) -> Option<i128> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .ok()
            .or_else(|| parse_numeric(s).map(|n| n.trunc() as i128)),
        Value::Number(n) if n.is_finite() => Some(n.trunc() as i128),
        Value::Bool(b) => Some(i128::from(*b)),
        _ => None,
    }
}

/// The literal itself when `value` converts to it.
fn coerce_literal(literal: &Literal, value: &Value) -> Option<Value> {
    let candidate = match literal {
        Literal::String(_) => match value {
            Value::String(_) => value.clone(),
            other => Value::String(to_string(other)?),
        },
        Literal::Number(_) => match value {
            Value::Number(_) => value.clone(),
            other => Value::Number(to_number(other)?),
        },
        Literal::Boolean(_) => match value {
            Value::Bool(_) => value.clone(),
            other => Value::Bool(to_bool(other)?),
        },
    };
    literal.matches(&candidate).then(|| literal.to_value())
}

#[cfg(test)]
mod tests {
    use crate::Scope;
    use serde_json::json;
    use tyval_core::{Schema, Value};

    fn convert(schema: &Schema, value: Value) -> Value {
        Scope::new(schema).unwrap().convert(&value)
    }

    #[test]
    fn test_array_of_numbers_passes_unconvertible_through() {
        let out = convert(&Schema::array(Schema::number()), Value::from(json!(["1", "2", "abc"])));
        assert_eq!(out, Value::from(json!([1, 2, "abc"])));
    }

    #[test]
    fn test_string_from_primitives() {
        let s = Schema::string();
        assert_eq!(convert(&s, Value::from(1.5)), Value::from("1.5"));
        assert_eq!(convert(&s, Value::from(3.0)), Value::from("3"));
        assert_eq!(convert(&s, Value::Bool(true)), Value::from("true"));
        assert_eq!(convert(&s, Value::BigInt(12)), Value::from("12"));
        assert_eq!(convert(&s, Value::Null), Value::Null);
    }

    #[test]
    fn test_number_rejects_non_numeric_words() {
        let n = Schema::number();
        assert_eq!(convert(&n, Value::from(" 42 ")), Value::from(42.0));
        assert_eq!(convert(&n, Value::from("inf")), Value::from("inf"));
        assert_eq!(convert(&n, Value::from("")), Value::from(""));
        assert_eq!(convert(&n, Value::Bool(false)), Value::from(0.0));
    }

    #[test]
    fn test_integer_truncates() {
        assert_eq!(convert(&Schema::integer(), Value::from("7.9")), Value::from(7.0));
        assert_eq!(convert(&Schema::integer(), Value::from(-2.5)), Value::from(-2.0));
    }

    #[test]
    fn test_boolean_keywords() {
        let b = Schema::boolean();
        assert_eq!(convert(&b, Value::from("TRUE")), Value::Bool(true));
        assert_eq!(convert(&b, Value::from("0")), Value::Bool(false));
        assert_eq!(convert(&b, Value::from(1.0)), Value::Bool(true));
        assert_eq!(convert(&b, Value::from("yes")), Value::from("yes"));
    }

    #[test]
    fn test_null_and_undefined_keywords() {
        assert_eq!(convert(&Schema::null(), Value::from("NULL")), Value::Null);
        assert_eq!(convert(&Schema::undefined(), Value::from("undefined")), Value::Undefined);
    }

    #[test]
    fn test_bigint_from_string_and_number() {
        let b = Schema::bigint();
        assert_eq!(convert(&b, Value::from("170141183460469231731687303715884105727")), Value::BigInt(i128::MAX));
        assert_eq!(convert(&b, Value::from(9.7)), Value::BigInt(9));
    }

    #[test]
    fn test_literal_and_enum() {
        assert_eq!(convert(&Schema::literal(1i64), Value::from("1")), Value::from(1.0));
        assert_eq!(convert(&Schema::literal("1"), Value::from(1.0)), Value::from("1"));
        assert_eq!(convert(&Schema::literal(2i64), Value::from("1")), Value::from("1"));
        let e = Schema::enumeration([true]);
        assert_eq!(convert(&e, Value::from("true")), Value::Bool(true));
    }

    #[test]
    fn test_union_takes_first_convertible_variant() {
        let u = Schema::union([Schema::number(), Schema::boolean()]);
        assert_eq!(convert(&u, Value::from("5")), Value::from(5.0));
        assert_eq!(convert(&u, Value::from("false")), Value::Bool(false));
        assert_eq!(convert(&u, Value::from("x")), Value::from("x"));
    }

    #[test]
    fn test_object_converts_known_properties_only() {
        let s = Schema::object([("n", Schema::number())]);
        let out = convert(&s, Value::from(json!({"n": "3", "other": "4"})));
        assert_eq!(out, Value::from(json!({"n": 3, "other": "4"})));
    }

    #[test]
    fn test_tuple_converts_by_position() {
        let t = Schema::tuple([Schema::number(), Schema::string()]);
        let out = convert(&t, Value::from(json!(["1", 2, true])));
        assert_eq!(out, Value::from(json!([1, "2", true])));
    }

    #[test]
    fn test_recursive_schema_converts_nested_values() {
        let node = Schema::recursive(Schema::object([
            ("id", Schema::number()),
            ("children", Schema::array(Schema::this())),
        ]));
        let out = convert(&node, Value::from(json!({"id": "1", "children": [{"id": "2", "children": []}]})));
        assert_eq!(out, Value::from(json!({"id": 1, "children": [{"id": 2, "children": []}]})));
    }
}
