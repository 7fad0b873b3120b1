//! Codec application: decode and encode.
//!
//! Decode validates the encoded input against the whole schema before any
//! codec runs, then rebuilds the value bottom-up so that nested codecs are
//! applied before the codecs wrapping them. Encode runs the other way: each
//! codec's encode function is applied before descending into its inner
//! schema, and the fully encoded result is validated at the end.
//!
//! A codec's declared `output` shape is checked against the decoded value
//! after decoding and before encoding.

use tyval_core::graph::{record_key_matches, Env};
use tyval_core::pointer;
use tyval_core::schema::{CodecSchema, Kind, Schema};
use tyval_core::{Direction, Map, TransformError, Value};

use crate::scope::Engine;

impl Engine {
    pub(crate) fn decode(&self, value: &Value) -> Result<Value, TransformError> {
        let env = Env::root();
        if let Some(violation) = self.first_violation(&env, &self.root, value) {
            return Err(TransformError::DecodeCheck {
                violation: Box::new(violation),
            });
        }
        self.transform_at(&env, &self.root, value, "", Direction::Decode)
    }

    pub(crate) fn encode(&self, value: &Value) -> Result<Value, TransformError> {
        let env = Env::root();
        let encoded = self.transform_at(&env, &self.root, value, "", Direction::Encode)?;
        if let Some(violation) = self.first_violation(&env, &self.root, &encoded) {
            return Err(TransformError::EncodeCheck {
                violation: Box::new(violation),
            });
        }
        Ok(encoded)
    }

    /// Rebuild `value` with every reachable codec applied in `direction`.
    /// `path` is the value location, used in error reports.
    fn transform_at(
        &self,
        env: &Env,
        schema: &Schema,
        value: &Value,
        path: &str,
        direction: Direction,
    ) -> Result<Value, TransformError> {
        match schema.kind() {
            Kind::Codec(codec) => match direction {
                Direction::Decode => {
                    let inner = self.transform_at(env, &codec.inner, value, path, direction)?;
                    let decoded = self.run_codec(codec, inner, path, direction)?;
                    self.check_output(env, codec, &decoded, path, direction)?;
                    Ok(decoded)
                }
                Direction::Encode => {
                    self.check_output(env, codec, value, path, direction)?;
                    let encoded = self.run_codec(codec, value.clone(), path, direction)?;
                    self.transform_at(env, &codec.inner, &encoded, path, direction)
                }
            },
            Kind::Object(obj) => match value {
                Value::Object(map) => {
                    let mut out = Map::with_capacity(map.len());
                    for (key, v) in map {
                        let target = obj.properties.get(key).or_else(|| obj.additional.schema());
                        let next = match target {
                            Some(target) => self.transform_at(env, target, v, &pointer::push(path, key), direction)?,
                            None => v.clone(),
                        };
                        out.insert(key.clone(), next);
                    }
                    Ok(Value::Object(out))
                }
                _ => Ok(value.clone()),
            },
            Kind::Record(record) => match value {
                Value::Object(map) => {
                    let mut out = Map::with_capacity(map.len());
                    for (key, v) in map {
                        let target = if record_key_matches(&record.key, key, &self.patterns) {
                            Some(&record.value)
                        } else {
                            record.additional.schema()
                        };
                        let next = match target {
                            Some(target) => self.transform_at(env, target, v, &pointer::push(path, key), direction)?,
                            None => v.clone(),
                        };
                        out.insert(key.clone(), next);
                    }
                    Ok(Value::Object(out))
                }
                _ => Ok(value.clone()),
            },
            Kind::Array(arr) => match value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.transform_at(env, &arr.items, item, &pointer::push(path, &i.to_string()), direction))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Ok(value.clone()),
            },
            Kind::Tuple(elements) => match value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match elements.get(i) {
                        Some(element) => {
                            self.transform_at(env, element, item, &pointer::push(path, &i.to_string()), direction)
                        }
                        None => Ok(item.clone()),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Ok(value.clone()),
            },
            Kind::Union(variants) => match direction {
                Direction::Decode => match variants.iter().find(|variant| self.matches(env, variant, value)) {
                    Some(variant) => self.transform_at(env, variant, value, path, direction),
                    None => Ok(value.clone()),
                },
                Direction::Encode => {
                    // First variant whose encoding lands in its own shape.
                    for variant in variants {
                        if let Ok(encoded) = self.transform_at(env, variant, value, path, direction) {
                            if self.matches(env, variant, &encoded) {
                                return Ok(encoded);
                            }
                        }
                    }
                    Ok(value.clone())
                }
            },
            Kind::Intersect(intersect) => intersect.members.iter().try_fold(value.clone(), |acc, member| {
                self.transform_at(env, member, &acc, path, direction)
            }),
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => match env.follow(schema, &self.references) {
                Some(def) => self.transform_at(&Env::inside(&def), &def.schema, value, path, direction),
                None => Ok(value.clone()),
            },
            Kind::Any
            | Kind::Unknown
            | Kind::Never
            | Kind::String(_)
            | Kind::Number(_)
            | Kind::Integer(_)
            | Kind::Boolean
            | Kind::Null
            | Kind::Undefined
            | Kind::BigInt(_)
            | Kind::Symbol
            | Kind::Bytes(_)
            | Kind::Literal(_)
            | Kind::Enum(_)
            | Kind::Not(_)
            | Kind::Custom(_) => Ok(value.clone()),
        }
    }

    fn run_codec(
        &self,
        codec: &CodecSchema,
        value: Value,
        path: &str,
        direction: Direction,
    ) -> Result<Value, TransformError> {
        let result = match direction {
            Direction::Decode => codec.codec.decode(value),
            Direction::Encode => codec.codec.encode(value),
        };
        result.map_err(|source| TransformError::Codec {
            direction,
            codec: codec.codec.name().to_string(),
            path: path.to_string(),
            source,
        })
    }

    fn check_output(
        &self,
        env: &Env,
        codec: &CodecSchema,
        value: &Value,
        path: &str,
        direction: Direction,
    ) -> Result<(), TransformError> {
        let Some(output) = &codec.output else {
            return Ok(());
        };
        match self.first_violation(env, output, value) {
            Some(violation) => Err(TransformError::Output {
                direction,
                path: path.to_string(),
                violation: Box::new(violation),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Scope;
    use serde_json::json;
    use tyval_core::{CodecError, Direction, FnCodec, Schema, TransformError, Value, ViolationKind};

    /// Numeric strings on the wire, numbers in memory.
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

    fn doubled(inner: Schema) -> Schema {
        Schema::codec(
            inner,
            FnCodec::new(
                "double",
                |v: Value| match v {
                    Value::Number(n) => Ok(Value::Number(n * 2.0)),
                    other => Err(CodecError::new(format!("expected number, got {other}"))),
                },
                |v: Value| match v {
                    Value::Number(n) => Ok(Value::Number(n / 2.0)),
                    other => Err(CodecError::new(format!("expected number, got {other}"))),
                },
            ),
        )
    }

    #[test]
    fn test_decode_then_encode_round_trips() {
        let scope = Scope::new(&Schema::object([("n", numeric_string())])).unwrap();
        let wire = Value::from(json!({"n": "2.5"}));
        let decoded = scope.decode(&wire).unwrap();
        assert_eq!(decoded, Value::from(json!({"n": 2.5})));
        assert_eq!(scope.encode(&decoded).unwrap(), wire);
    }

    #[test]
    fn test_decode_checks_before_any_codec_runs() {
        let scope = Scope::new(&Schema::object([("n", numeric_string())])).unwrap();
        let err = scope.decode(&Value::from(json!({"n": 1}))).unwrap_err();
        match err {
            TransformError::DecodeCheck { violation } => {
                assert_eq!(violation.path, "/n");
                assert_eq!(violation.kind, ViolationKind::String);
            }
            other => panic!("expected DecodeCheck, got {other:?}"),
        }
    }

    #[test]
    fn test_codec_failure_is_distinct() {
        let scope = Scope::new(&Schema::array(numeric_string())).unwrap();
        let err = scope.decode(&Value::from(json!(["1", "x"]))).unwrap_err();
        assert!(matches!(
            err,
            TransformError::Codec { direction: Direction::Decode, ref codec, ref path, .. }
                if codec == "numeric-string" && path == "/1"
        ));
    }

    #[test]
    fn test_nested_codecs_apply_innermost_first() {
        let scope = Scope::new(&doubled(numeric_string())).unwrap();
        assert_eq!(scope.decode(&Value::from("3")).unwrap(), Value::from(6.0));
        assert_eq!(scope.encode(&Value::from(6.0)).unwrap(), Value::from("3"));
    }

    #[test]
    fn test_encode_validates_result() {
        let scope = Scope::new(&Schema::object([("n", Schema::number())])).unwrap();
        let err = scope.encode(&Value::from(json!({"n": "x"}))).unwrap_err();
        assert!(matches!(err, TransformError::EncodeCheck { .. }));
    }

    #[test]
    fn test_declared_output_is_enforced() {
        let positive = Schema::new(tyval_core::Kind::Number(tyval_core::schema::NumberSchema {
            exclusive_minimum: Some(0.0),
            ..Default::default()
        }));
        let inner = Schema::string();
        let schema = Schema::codec_with_output(
            inner,
            FnCodec::new(
                "len",
                |v: Value| Ok(Value::Number(v.as_str().map_or(0, str::len) as f64)),
                |v: Value| Ok(Value::String("x".repeat(v.as_f64().unwrap_or(0.0) as usize))),
            ),
            positive,
        );
        let scope = Scope::new(&schema).unwrap();
        assert_eq!(scope.decode(&Value::from("abc")).unwrap(), Value::from(3.0));
        let err = scope.decode(&Value::from("")).unwrap_err();
        assert!(matches!(err, TransformError::Output { direction: Direction::Decode, .. }));
        let err = scope.encode(&Value::from(-1.0)).unwrap_err();
        assert!(matches!(err, TransformError::Output { direction: Direction::Encode, .. }));
    }

    #[test]
    fn test_union_decodes_through_matching_variant() {
        let scope = Scope::new(&Schema::union([Schema::null(), numeric_string()])).unwrap();
        assert_eq!(scope.decode(&Value::Null).unwrap(), Value::Null);
        assert_eq!(scope.decode(&Value::from("4")).unwrap(), Value::from(4.0));
        assert_eq!(scope.encode(&Value::from(4.0)).unwrap(), Value::from("4"));
    }

    #[test]
    fn test_union_runs_codec_when_decoded_form_fits_inner_shape() {
        let upper = Schema::codec(
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
        );
        let alone = Scope::new(&upper).unwrap();
        assert_eq!(alone.encode(&alone.decode(&Value::from("abc")).unwrap()).unwrap(), Value::from("abc"));

        let scope = Scope::new(&Schema::union([upper, Schema::null()])).unwrap();
        let decoded = scope.decode(&Value::from("abc")).unwrap();
        assert_eq!(decoded, Value::from("ABC"));
        assert_eq!(scope.encode(&decoded).unwrap(), Value::from("abc"));
        assert_eq!(scope.encode(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_recursive_codecs() {
        let tree = Schema::recursive(Schema::object([
            ("value", numeric_string()),
            ("children", Schema::array(Schema::this())),
        ]));
        let scope = Scope::new(&tree).unwrap();
        let wire = Value::from(json!({"value": "1", "children": [{"value": "2", "children": []}]}));
        let decoded = scope.decode(&wire).unwrap();
        assert_eq!(
            decoded,
            Value::from(json!({"value": 1, "children": [{"value": 2, "children": []}]}))
        );
        assert_eq!(scope.encode(&decoded).unwrap(), wire);
    }
}
