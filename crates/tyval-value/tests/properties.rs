//! # Value Engine Properties
//!
//! Property tests over generated schemas and values. Object keys are drawn
//! from a small alphabet so generated values regularly line up with
//! generated properties.

use std::collections::BTreeMap;

use proptest::prelude::*;
use tyval_core::schema::{Additional, Kind, ObjectSchema};
use tyval_core::{CodecError, FnCodec, Map};
use tyval_value::{diff, equal, hash, patch, Schema, Scope, Value};

fn any_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::Number(f64::from(n))),
        (-100i32..100).prop_map(|n| Value::Number(f64::from(n) / 4.0)),
        "[a-c0-9]{0,4}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-d]", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map>())),
        ]
    })
}

fn leaf_schema() -> impl Strategy<Value = Schema> {
    prop_oneof![
        Just(Schema::string()),
        Just(Schema::number()),
        Just(Schema::integer()),
        Just(Schema::boolean()),
        Just(Schema::null()),
        Just(Schema::any()),
        "[a-c]{1,2}".prop_map(|s| Schema::literal(s.as_str())),
        (0i64..3).prop_map(Schema::literal),
    ]
}

/// Schemas without tuples or denied extras.
fn open_schema() -> impl Strategy<Value = Schema> {
    leaf_schema().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Schema::array),
            prop::collection::btree_map("[a-d]", (inner.clone(), any::<bool>()), 0..4).prop_map(|props| {
                Schema::object(props.into_iter().map(|(k, (s, optional))| {
                    (k, if optional { s.optional() } else { s })
                }))
            }),
            prop::collection::vec(inner, 1..4).prop_map(Schema::union),
        ]
    })
}

/// Denied or schema-governed extras and property-count bounds: cleaning
/// can flip which union variant a value satisfies.
fn closed_schema() -> impl Strategy<Value = Schema> {
    leaf_schema().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Schema::array),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Schema::tuple),
            (
                prop::collection::btree_map("[a-d]", (inner.clone(), any::<bool>()), 0..3),
                prop_oneof![
                    Just(Additional::Unspecified),
                    Just(Additional::Deny),
                    Just(Additional::Allow),
                    inner.clone().prop_map(Additional::Schema),
                ],
                prop::option::of(0usize..3),
                prop::option::of(1usize..4),
            )
                .prop_map(|(props, additional, min, max)| {
                    let properties = props
                        .into_iter()
                        .map(|(k, (s, optional))| (k, if optional { s.optional() } else { s }));
                    let mut object = ObjectSchema::new(properties).with_additional(additional);
                    object.min_properties = min;
                    object.max_properties = max;
                    Schema::new(Kind::Object(object))
                }),
            prop::collection::vec(inner, 1..4).prop_map(Schema::union),
        ]
    })
}

fn any_schema() -> impl Strategy<Value = Schema> {
    prop_oneof![
        open_schema(),
        prop::collection::vec(open_schema(), 0..3).prop_map(Schema::tuple),
        (open_schema(), open_schema()).prop_map(|(a, b)| Schema::intersect([a, b])),
        open_schema().prop_map(Schema::not),
    ]
}

fn numeric_string() -> Schema {
    Schema::codec(
        Schema::string(),
        FnCodec::new(
            "numeric-string",
            |v: Value| match v {
                Value::String(s) => s
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|e| CodecError::new(e.to_string())),
                other => Err(CodecError::new(format!("expected string, got {other}"))),
            },
            |v: Value| match v {
                Value::Number(n) => Ok(Value::String(n.to_string())),
                other => Err(CodecError::new(format!("expected number, got {other}"))),
            },
        ),
    )
}

/// Lower case on the wire, upper case in memory.
fn upper() -> Schema {
    Schema::codec(
        Schema::string(),
        FnCodec::new(
            "upper",
            |v: Value| match v {
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                other => Err(CodecError::new(format!("expected string, got {other}"))),
            },
            |v: Value| match v {
                Value::String(s) => Ok(Value::String(s.to_lowercase())),
                other => Err(CodecError::new(format!("expected string, got {other}"))),
            },
        ),
    )
}

/// Sign flips between wire and memory.
fn negated() -> Schema {
    Schema::codec(
        Schema::number(),
        FnCodec::new(
            "negate",
            |v: Value| match v {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(CodecError::new(format!("expected number, got {other}"))),
            },
            |v: Value| match v {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(CodecError::new(format!("expected number, got {other}"))),
            },
        ),
    )
}

/// A leaf schema paired with a wire value it accepts.
fn wire_leaf() -> impl Strategy<Value = (Schema, Value)> {
    prop_oneof![
        "[a-c]{0,3}".prop_map(|s| (upper(), Value::String(s))),
        (-50i32..50).prop_map(|n| (negated(), Value::Number(f64::from(n) / 2.0))),
        any::<bool>().prop_map(|b| (Schema::boolean(), Value::Bool(b))),
    ]
}

fn wire_object(fields: BTreeMap<String, (Schema, Value)>) -> (Schema, Map) {
    let schema = Schema::object(fields.iter().map(|(k, (s, _))| (k.clone(), s.clone())));
    let wire = fields.into_iter().map(|(k, (_, w))| (k, w)).collect();
    (schema, wire)
}

/// Self-referencing tree whose every node carries the same leaf.
fn wire_tree() -> impl Strategy<Value = (Schema, Value)> {
    (wire_leaf(), 0usize..4).prop_map(|((leaf, wire), width)| {
        let node = |children: Vec<Value>| {
            Value::Object(
                [("value".to_string(), wire.clone()), ("children".to_string(), Value::Array(children))]
                    .into_iter()
                    .collect::<Map>(),
            )
        };
        let schema = Schema::recursive(Schema::object([
            ("value", leaf),
            ("children", Schema::array(Schema::this())),
        ]));
        (schema, node(vec![node(Vec::new()); width]))
    })
}

/// Codec-bearing schemas nested in unions, objects, arrays, intersections
/// and recursive definitions, with wire values they accept.
fn wire_case() -> impl Strategy<Value = (Schema, Value)> {
    let nested = wire_leaf().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            (inner.clone(), any::<bool>()).prop_map(|((schema, wire), null)| {
                (Schema::union([schema, Schema::null()]), if null { Value::Null } else { wire })
            }),
            inner
                .clone()
                .prop_map(|(schema, wire)| (Schema::array(schema), Value::Array(vec![wire.clone(), wire]))),
            prop::collection::btree_map("[a-d]", inner.clone(), 0..4).prop_map(|fields| {
                let (schema, wire) = wire_object(fields);
                (schema, Value::Object(wire))
            }),
            (
                prop::collection::btree_map("[ab]", inner.clone(), 0..3),
                prop::collection::btree_map("[cd]", inner, 0..3),
            )
                .prop_map(|(left, right)| {
                    let (left, mut wire) = wire_object(left);
                    let (right, more) = wire_object(right);
                    wire.extend(more);
                    (Schema::intersect([left, right]), Value::Object(wire))
                }),
        ]
    });
    prop_oneof![
        nested,
        wire_tree(),
        wire_tree().prop_map(|(schema, wire)| (Schema::union([schema, Schema::null()]), wire)),
    ]
}

/// Rebuild every object with its keys in reverse insertion order.
fn reversed(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(reversed).collect()),
        Value::Object(map) => Value::Object(map.iter().rev().map(|(k, v)| (k.clone(), reversed(v))).collect()),
        other => other.clone(),
    }
}

proptest! {
    /// `check` is true exactly when `errors` is empty.
    #[test]
    fn check_agrees_with_errors(schema in any_schema(), value in any_value()) {
        let scope = Scope::new(&schema).unwrap();
        prop_assert_eq!(scope.check(&value), scope.errors(&value).is_empty());
    }

    /// The first enumerated error is the one `assert` reports.
    #[test]
    fn assert_reports_first_error(schema in any_schema(), value in any_value()) {
        let scope = Scope::new(&schema).unwrap();
        match scope.assert(&value) {
            Ok(()) => prop_assert!(scope.check(&value)),
            Err(err) => prop_assert_eq!(Some(err.first().clone()), scope.errors(&value).first()),
        }
    }

    /// Cleaning twice is cleaning once.
    #[test]
    fn clean_is_idempotent(schema in closed_schema(), value in any_value()) {
        let scope = Scope::new(&schema).unwrap();
        let once = scope.clean(&value);
        prop_assert_eq!(scope.clean(&once), once);
    }

    /// Whatever `create` produces passes `check`.
    #[test]
    fn create_satisfies_check(schema in any_schema()) {
        let scope = Scope::new(&schema).unwrap();
        if let Ok(created) = scope.create() {
            prop_assert!(scope.check(&created), "created {} fails {:?}", created, schema);
        }
    }

    /// `cast` and `repair` keep values that already pass.
    #[test]
    fn repair_keeps_valid_values(schema in open_schema(), value in any_value()) {
        let scope = Scope::new(&schema).unwrap();
        if scope.check(&value) {
            prop_assert_eq!(scope.repair(&value).unwrap(), value.clone());
        }
        if let Ok(repaired) = scope.repair(&value) {
            prop_assert!(scope.check(&repaired));
        }
    }

    /// Inverse codecs round trip through decode and encode.
    #[test]
    fn decode_encode_round_trip(numbers in prop::collection::vec(any::<i32>(), 0..6)) {
        let scope = Scope::new(&Schema::array(numeric_string())).unwrap();
        let wire = Value::Array(numbers.iter().map(|n| Value::String(n.to_string())).collect());
        let decoded = scope.decode(&wire).unwrap();
        prop_assert_eq!(scope.encode(&decoded).unwrap(), wire);
    }

    /// The round trip holds wherever the codec sits in the schema.
    #[test]
    fn nested_codecs_round_trip((schema, wire) in wire_case()) {
        let scope = Scope::new(&schema).unwrap();
        let decoded = scope.decode(&wire).unwrap();
        prop_assert_eq!(scope.encode(&decoded).unwrap(), wire);
    }

    /// Replaying a diff reproduces the target.
    #[test]
    fn patch_of_diff_is_target(a in any_value(), b in any_value()) {
        prop_assert_eq!(patch(&a, &diff(&a, &b)).unwrap(), b);
    }

    /// Hashes ignore key order and follow structural equality.
    #[test]
    fn hash_follows_equality(a in any_value(), b in any_value()) {
        prop_assert_eq!(hash(&a), hash(&reversed(&a)));
        prop_assert_eq!(equal(&a, &b), hash(&a) == hash(&b));
    }
}
