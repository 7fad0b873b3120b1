//! Cast and Repair: forcing a value toward a schema.
//!
//! `cast` only looks at the top-level shape. A value of the right family is
//! kept as-is; anything else is replaced by a created value.
//!
//! `repair` works field by field: valid parts are kept, primitives are
//! converted, missing required properties are created, and only what cannot
//! be salvaged falls back to a created value. Unions repair through the
//! variant that best fits the input.

use tyval_core::graph::{record_key_matches, Env};
use tyval_core::pointer;
use tyval_core::schema::{is_required, Additional, Kind, Schema};
use tyval_core::{keywords, Map, RepairError, Value};

use crate::scope::Engine;

impl Engine {
    pub(crate) fn cast(&self, value: &Value) -> Value {
        if self.fits(&Env::root(), &self.root, value) {
            return value.clone();
        }
        match self.create() {
            Ok(created) => created,
            Err(err) => {
                tracing::debug!(%err, "cast found nothing to substitute; value kept");
                value.clone()
            }
        }
    }

    /// Whether `value` belongs to the structural family `schema` describes.
    fn fits(&self, env: &Env, schema: &Schema, value: &Value) -> bool {
        match schema.kind() {
            Kind::Any | Kind::Unknown => true,
            Kind::Never => false,
            Kind::String(_) => matches!(value, Value::String(_)),
            Kind::Number(_) | Kind::Integer(_) => matches!(value, Value::Number(_)),
            Kind::Boolean => matches!(value, Value::Bool(_)),
            Kind::Null => matches!(value, Value::Null),
            Kind::Undefined => keywords::is_void(value, self.config.allow_null_void),
            Kind::BigInt(_) => matches!(value, Value::BigInt(_)),
            Kind::Symbol => matches!(value, Value::Symbol(_)),
            Kind::Bytes(_) => matches!(value, Value::Bytes(_)),
            Kind::Object(_) | Kind::Record(_) => matches!(value, Value::Object(_)),
            Kind::Array(_) | Kind::Tuple(_) => matches!(value, Value::Array(_)),
            Kind::Literal(_) | Kind::Enum(_) | Kind::Not(_) | Kind::Custom(_) => self.matches(env, schema, value),
            Kind::Union(variants) => variants.iter().any(|variant| self.fits(env, variant, value)),
            Kind::Intersect(intersect) => intersect.members.iter().all(|member| self.fits(env, member, value)),
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => env
                .follow(schema, &self.references)
                .is_some_and(|def| self.fits(&Env::inside(&def), &def.schema, value)),
            Kind::Codec(codec) => self.fits(env, &codec.inner, value),
        }
    }

    pub(crate) fn repair(&self, value: &Value) -> Result<Value, RepairError> {
        self.repair_at(&Env::root(), &self.root, value, "")
    }

    fn repair_at(&self, env: &Env, schema: &Schema, value: &Value, path: &str) -> Result<Value, RepairError> {
        if self.matches(env, schema, value) {
            return Ok(value.clone());
        }
        let create = || -> Result<Value, RepairError> { Ok(self.create_at(env, schema, path, &mut Vec::new())?) };
        match schema.kind() {
            Kind::Never | Kind::Not(_) => Err(RepairError::Unsupported {
                kind: schema.kind().name().to_string(),
                path: path.to_string(),
            }),
            Kind::Any
            | Kind::Unknown
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
            | Kind::Custom(_) => {
                let converted = self.convert_at(env, schema, value);
                if self.matches(env, schema, &converted) {
                    Ok(converted)
                } else {
                    create()
                }
            }
            Kind::Object(obj) => {
                let Value::Object(map) = value else {
                    return create();
                };
                let base = pointer::push(path, "properties");
                let missing = Value::Undefined;
                let mut out = Map::with_capacity(map.len());
                for (key, property) in &obj.properties {
                    let current = match map.get(key.as_str()) {
                        Some(v) => v,
                        None if is_required(property, self.config.defaulted_properties) => &missing,
                        None => continue,
                    };
                    let repaired = self.repair_at(env, property, current, &pointer::push(&base, key))?;
                    out.insert(key.clone(), repaired);
                }
                let extra_path = pointer::push(path, "additionalProperties");
                for (key, v) in map.iter().filter(|(k, _)| !obj.properties.contains_key(k.as_str())) {
                    match &obj.additional {
                        Additional::Unspecified | Additional::Allow => {
                            out.insert(key.clone(), v.clone());
                        }
                        Additional::Schema(extra) => {
                            out.insert(key.clone(), self.repair_at(env, extra, v, &extra_path)?);
                        }
                        Additional::Deny => {}
                    }
                }
                Ok(Value::Object(out))
            }
            Kind::Record(record) => {
                let Value::Object(map) = value else {
                    return create();
                };
                let value_path = pointer::push(&pointer::push(path, "patternProperties"), record.key.pattern());
                let extra_path = pointer::push(path, "additionalProperties");
                let mut out = Map::with_capacity(map.len());
                for (key, v) in map {
                    if record_key_matches(&record.key, key, &self.patterns) {
                        out.insert(key.clone(), self.repair_at(env, &record.value, v, &value_path)?);
                        continue;
                    }
                    match &record.additional {
                        Additional::Unspecified | Additional::Allow => {
                            out.insert(key.clone(), v.clone());
                        }
                        Additional::Schema(extra) => {
                            out.insert(key.clone(), self.repair_at(env, extra, v, &extra_path)?);
                        }
                        Additional::Deny => {}
                    }
                }
                Ok(Value::Object(out))
            }
            Kind::Array(arr) => {
                let Value::Array(items) = value else {
                    return create();
                };
                let item_path = pointer::push(path, "items");
                let mut out = items
                    .iter()
                    .map(|item| self.repair_at(env, &arr.items, item, &item_path))
                    .collect::<Result<Vec<_>, _>>()?;
                if arr.unique_items {
                    let mut unique: Vec<Value> = Vec::with_capacity(out.len());
                    for item in out {
                        if !unique.contains(&item) {
                            unique.push(item);
                        }
                    }
                    out = unique;
                }
                if let Some(max) = arr.max_items {
                    out.truncate(max);
                }
                while out.len() < arr.min_items.unwrap_or(0) {
                    out.push(self.create_at(env, &arr.items, &item_path, &mut Vec::new())?);
                }
                let repaired = Value::Array(out);
                if self.matches(env, schema, &repaired) {
                    Ok(repaired)
                } else {
                    create()
                }
            }
            Kind::Tuple(elements) => {
                let Value::Array(items) = value else {
                    return create();
                };
                let base = pointer::push(path, "prefixItems");
                let missing = Value::Undefined;
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| {
                        let item = items.get(i).unwrap_or(&missing);
                        self.repair_at(env, element, item, &pointer::push(&base, &i.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Kind::Union(variants) => {
                let mut best: Option<(usize, usize)> = None;
                for (i, variant) in variants.iter().enumerate() {
                    let score = self.score(env, variant, value);
                    if best.map_or(true, |(_, top)| score > top) {
                        best = Some((i, score));
                    }
                }
                match best {
                    Some((index, _)) => {
                        let variant_path = pointer::push(&pointer::push(path, "anyOf"), &index.to_string());
                        self.repair_at(env, &variants[index], value, &variant_path)
                    }
                    None => create(),
                }
            }
            Kind::Intersect(_) => {
                let created = create()?;
                let merged = match (&created, value) {
                    (Value::Object(base), Value::Object(overlay)) => {
                        let mut map = base.clone();
                        map.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
                        Value::Object(map)
                    }
                    _ => value.clone(),
                };
                if self.matches(env, schema, &merged) {
                    Ok(merged)
                } else {
                    Ok(created)
                }
            }
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => match env.follow(schema, &self.references) {
                Some(def) => {
                    let body = match schema.kind() {
                        Kind::Cyclic(_) => pointer::push(&pointer::push(path, "$defs"), def.name()),
                        _ => path.to_string(),
                    };
                    self.repair_at(&Env::inside(&def), &def.schema, value, &body)
                }
                None => create(),
            },
            Kind::Codec(codec) => self.repair_at(env, &codec.inner, value, path),
        }
    }

    /// How well `value` fits a union variant. Object variants score the
    /// properties the value already has, weighting matching literal
    /// discriminators heavily; other variants score their family fit.
    fn score(&self, env: &Env, schema: &Schema, value: &Value) -> usize {
        match (schema.kind(), value) {
            (Kind::Object(obj), Value::Object(map)) => {
                let mut score = 1;
                for (key, property) in &obj.properties {
                    let Some(v) = map.get(key.as_str()) else {
                        continue;
                    };
                    score += 1;
                    if self.matches(env, property, v) {
                        score += if matches!(property.kind(), Kind::Literal(_)) { 100 } else { 1 };
                    }
                }
                score
            }
            (Kind::Ref(_) | Kind::This | Kind::Cyclic(_), _) => env
                .follow(schema, &self.references)
                .map_or(0, |def| self.score(&Env::inside(&def), &def.schema, value)),
            (Kind::Codec(codec), _) => self.score(env, &codec.inner, value),
            _ => usize::from(self.fits(env, schema, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Scope;
    use serde_json::json;
    use tyval_core::schema::{ArraySchema, Kind, StringSchema};
    use tyval_core::{CreateError, RepairError, Schema, Value};

    fn scope(schema: &Schema) -> Scope {
        Scope::new(schema).unwrap()
    }

    #[test]
    fn test_cast_keeps_compatible_shape() {
        let s = scope(&Schema::object([("x", Schema::number())]));
        let v = Value::from(json!({"x": "not a number"}));
        assert_eq!(s.cast(&v), v);
    }

    #[test]
    fn test_cast_replaces_incompatible_shape() {
        let s = scope(&Schema::object([("x", Schema::number())]));
        assert_eq!(s.cast(&Value::from("text")), Value::from(json!({"x": 0})));
    }

    #[test]
    fn test_cast_never_fails() {
        let s = scope(&Schema::never());
        assert_eq!(s.cast(&Value::Null), Value::Null);
    }

    #[test]
    fn test_cast_literal_requires_match() {
        let s = scope(&Schema::union([Schema::literal("A"), Schema::literal("B")]));
        assert_eq!(s.cast(&Value::from("B")), Value::from("B"));
        assert_eq!(s.cast(&Value::from("C")), Value::from("A"));
    }

    #[test]
    fn test_repair_converts_and_fills() {
        let s = scope(&Schema::object([
            ("x", Schema::number()),
            ("y", Schema::string().with_default("hi")),
            ("z", Schema::boolean().optional()),
        ]));
        let repaired = s.repair(&Value::from(json!({"x": "12", "extra": 1}))).unwrap();
        assert_eq!(repaired, Value::from(json!({"x": 12, "y": "hi", "extra": 1})));
        assert!(s.check(&repaired));
    }

    #[test]
    fn test_repair_falls_back_per_field() {
        let s = scope(&Schema::object([("n", Schema::number()), ("tags", Schema::array(Schema::string()))]));
        let repaired = s.repair(&Value::from(json!({"n": "abc", "tags": ["a", 1]}))).unwrap();
        assert_eq!(repaired, Value::from(json!({"n": 0, "tags": ["a", "1"]})));
    }

    #[test]
    fn test_repair_array_bounds() {
        let mut arr = ArraySchema::new(Schema::number());
        arr.min_items = Some(2);
        arr.max_items = Some(3);
        arr.unique_items = true;
        let s = scope(&Schema::new(Kind::Array(arr)));
        assert_eq!(s.repair(&Value::from(json!([5, 5, 5, 6, 7]))).unwrap(), Value::from(json!([5, 6, 7])));
        assert_eq!(s.repair(&Value::from(json!([5, 5]))).unwrap(), Value::from(json!([5, 0])));
    }

    #[test]
    fn test_repair_union_picks_discriminated_variant() {
        let s = scope(&Schema::union([
            Schema::object([("kind", Schema::literal("a")), ("a", Schema::number())]),
            Schema::object([("kind", Schema::literal("b")), ("b", Schema::string())]),
        ]));
        let repaired = s.repair(&Value::from(json!({"kind": "b", "b": 5}))).unwrap();
        assert_eq!(repaired, Value::from(json!({"kind": "b", "b": "5"})));
    }

    #[test]
    fn test_repair_rejects_negation() {
        let s = scope(&Schema::not(Schema::string()));
        let err = s.repair(&Value::from("x")).unwrap_err();
        assert!(matches!(err, RepairError::Unsupported { ref kind, .. } if kind == "Not"));
        assert_eq!(s.repair(&Value::from(1.0)).unwrap(), Value::from(1.0));
    }

    #[test]
    fn test_repair_reports_create_failure() {
        let pattern = Schema::new(Kind::String(StringSchema {
            pattern: Some("^[a-z]+$".into()),
            ..StringSchema::default()
        }));
        let s = scope(&Schema::object([("p", pattern)]));
        let err = s.repair(&Value::from(json!({}))).unwrap_err();
        assert!(matches!(
            err,
            RepairError::Create(CreateError::NoDefault { ref path, .. }) if path == "/properties/p"
        ));
    }
}
