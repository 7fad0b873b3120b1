//! Default application: fill absent values and properties from declared
//! defaults without touching anything already present.

use tyval_core::graph::{record_key_matches, Env};
use tyval_core::schema::{Additional, Kind, Schema};
use tyval_core::Value;

use crate::scope::Engine;

impl Engine {
    pub(crate) fn apply_defaults(&self, value: &Value) -> Value {
        self.default_at(&Env::root(), &self.root, value)
    }

    fn default_at(&self, env: &Env, schema: &Schema, value: &Value) -> Value {
        let value = match (value, schema.default_value()) {
            (Value::Undefined, Some(default)) => default.produce(),
            _ => value.clone(),
        };
        match (schema.kind(), value) {
            (Kind::Object(obj), Value::Object(mut map)) => {
                for (key, property) in &obj.properties {
                    let current = map.get(key.as_str()).cloned().unwrap_or_default();
                    let next = self.default_at(env, property, &current);
                    if !next.is_undefined() {
                        map.insert(key.clone(), next);
                    }
                }
                if let Additional::Schema(extra) = &obj.additional {
                    for (key, v) in map.iter_mut() {
                        if !obj.properties.contains_key(key.as_str()) {
                            *v = self.default_at(env, extra, v);
                        }
                    }
                }
                Value::Object(map)
            }
            (Kind::Record(record), Value::Object(mut map)) => {
                for (key, v) in map.iter_mut() {
                    if record_key_matches(&record.key, key, &self.patterns) {
                        *v = self.default_at(env, &record.value, v);
                    } else if let Additional::Schema(extra) = &record.additional {
                        *v = self.default_at(env, extra, v);
                    }
                }
                Value::Object(map)
            }
            (Kind::Array(arr), Value::Array(items)) => {
                Value::Array(items.iter().map(|item| self.default_at(env, &arr.items, item)).collect())
            }
            (Kind::Tuple(elements), Value::Array(mut items)) => {
                for (i, element) in elements.iter().enumerate() {
                    match items.get_mut(i) {
                        Some(item) => *item = self.default_at(env, element, item),
                        // Only extend while every earlier position is filled.
                        None => {
                            let next = self.default_at(env, element, &Value::Undefined);
                            if next.is_undefined() {
                                break;
                            }
                            items.push(next);
                        }
                    }
                }
                Value::Array(items)
            }
            (Kind::Union(variants), value) => variants
                .iter()
                .find_map(|variant| {
                    let candidate = self.default_at(env, variant, &value);
                    self.matches(env, variant, &candidate).then_some(candidate)
                })
                .unwrap_or(value),
            (Kind::Intersect(intersect), value) => {
                intersect.members.iter().fold(value, |acc, member| {
                    let next = self.default_at(env, member, &acc);
                    match (acc, next) {
                        (Value::Object(mut merged), Value::Object(more)) => {
                            merged.extend(more);
                            Value::Object(merged)
                        }
                        (_, next) => next,
                    }
                })
            }
            (Kind::Ref(_) | Kind::This | Kind::Cyclic(_), value) => match env.follow(schema, &self.references) {
                Some(def) => self.default_at(&Env::inside(&def), &def.schema, &value),
                None => value,
            },
            (Kind::Codec(codec), value) => self.default_at(env, &codec.inner, &value),
            (_, value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Scope;
    use serde_json::json;
    use tyval_core::{Schema, Value};

    fn defaults(schema: &Schema, value: Value) -> Value {
        Scope::new(schema).unwrap().apply_defaults(&value)
    }

    #[test]
    fn test_fills_missing_properties() {
        let schema = Schema::object([
            ("x", Schema::number()),
            ("y", Schema::string().with_default("hi")),
        ]);
        assert_eq!(
            defaults(&schema, Value::from(json!({"x": 1}))),
            Value::from(json!({"x": 1, "y": "hi"}))
        );
    }

    #[test]
    fn test_present_values_are_kept() {
        let schema = Schema::object([("y", Schema::string().with_default("hi"))]);
        assert_eq!(
            defaults(&schema, Value::from(json!({"y": "there"}))),
            Value::from(json!({"y": "there"}))
        );
    }

    #[test]
    fn test_root_default_replaces_undefined() {
        let schema = Schema::object([("a", Schema::number().with_default(1.0))]).with_default(Value::from(json!({})));
        assert_eq!(defaults(&schema, Value::Undefined), Value::from(json!({"a": 1})));
    }

    #[test]
    fn test_nested_arrays_of_objects() {
        let schema = Schema::array(Schema::object([("on", Schema::boolean().with_default(true))]));
        assert_eq!(
            defaults(&schema, Value::from(json!([{}, {"on": false}]))),
            Value::from(json!([{"on": true}, {"on": false}]))
        );
    }

    #[test]
    fn test_tuple_extends_with_defaults() {
        let schema = Schema::tuple([Schema::number(), Schema::string().with_default("b")]);
        assert_eq!(defaults(&schema, Value::from(json!([1]))), Value::from(json!([1, "b"])));
    }

    #[test]
    fn test_union_picks_validating_variant() {
        let schema = Schema::union([
            Schema::object([("kind", Schema::literal("n")), ("n", Schema::number().with_default(0.0))]),
            Schema::object([("kind", Schema::literal("s")), ("s", Schema::string().with_default(""))]),
        ]);
        assert_eq!(
            defaults(&schema, Value::from(json!({"kind": "s"}))),
            Value::from(json!({"kind": "s", "s": ""}))
        );
    }

    #[test]
    fn test_intersect_merges_member_defaults() {
        let schema = Schema::intersect([
            Schema::object([("a", Schema::number().with_default(1.0))]),
            Schema::object([("b", Schema::number().with_default(2.0))]),
        ]);
        assert_eq!(defaults(&schema, Value::from(json!({}))), Value::from(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_recursive_defaults_terminate() {
        let schema = Schema::recursive(Schema::object([
            ("name", Schema::string().with_default("node")),
            ("children", Schema::array(Schema::this()).with_default(Value::Array(vec![]))),
        ]));
        assert_eq!(
            defaults(&schema, Value::from(json!({"children": [{}]}))),
            Value::from(json!({"name": "node", "children": [{"name": "node", "children": []}]}))
        );
    }
}
