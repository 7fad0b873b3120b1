//! Removal of unsanctioned object keys and tuple entries.
//!
//! An extra key survives only when the governing schema explicitly allows
//! extra keys or supplies a schema the key's cleaned value satisfies.
//! Nothing is ever added or coerced.
//!
//! A union cleans through the first variant whose cleaned output still
//! satisfies that variant, and repeats until the result is stable, so a
//! second pass never selects a different variant.

use tyval_core::graph::{record_key_matches, Env, KeySet};
use tyval_core::schema::{Additional, Kind, Schema};
use tyval_core::{digest_value, Map, Value};

use crate::scope::Engine;

impl Engine {
    pub(crate) fn clean(&self, value: &Value) -> Value {
        self.clean_at(&Env::root(), &self.root, value)
    }

    fn clean_at(&self, env: &Env, schema: &Schema, value: &Value) -> Value {
        match (schema.kind(), value) {
            (Kind::Object(obj), Value::Object(map)) => {
                let mut out = Map::with_capacity(map.len());
                for (key, v) in map {
                    if let Some(property) = obj.properties.get(key) {
                        out.insert(key.clone(), self.clean_at(env, property, v));
                    } else if let Some(kept) = self.clean_extra(env, &obj.additional, v) {
                        out.insert(key.clone(), kept);
                    }
                }
                Value::Object(out)
            }
            (Kind::Record(record), Value::Object(map)) => {
                let mut out = Map::with_capacity(map.len());
                for (key, v) in map {
                    if record_key_matches(&record.key, key, &self.patterns) {
                        out.insert(key.clone(), self.clean_at(env, &record.value, v));
                    } else if let Some(kept) = self.clean_extra(env, &record.additional, v) {
                        out.insert(key.clone(), kept);
                    }
                }
                Value::Object(out)
            }
            (Kind::Array(arr), Value::Array(items)) => {
                Value::Array(items.iter().map(|item| self.clean_at(env, &arr.items, item)).collect())
            }
            (Kind::Tuple(elements), Value::Array(items)) => Value::Array(
                elements
                    .iter()
                    .zip(items)
                    .map(|(element, item)| self.clean_at(env, element, item))
                    .collect(),
            ),
            (Kind::Union(variants), _) => self.clean_union(env, variants, value),
            (Kind::Intersect(intersect), _) => {
                let cleaned: Vec<Value> = intersect
                    .members
                    .iter()
                    .map(|member| self.clean_at(env, member, value))
                    .collect();
                let Value::Object(source) = value else {
                    return cleaned.into_iter().last().unwrap_or_else(|| value.clone());
                };
                let mut out = Map::with_capacity(source.len());
                for member in cleaned {
                    match member {
                        Value::Object(map) => out.extend(map),
                        other => return other,
                    }
                }
                let known = KeySet::of_members(env, &intersect.members, &self.references);
                for (key, v) in source.iter().filter(|(k, _)| !known.contains(k, &self.patterns)) {
                    if let Some(kept) = self.clean_extra(env, &intersect.unevaluated, v) {
                        out.insert(key.clone(), kept);
                    }
                }
                // Restore the input's key order.
                let mut ordered = Map::with_capacity(out.len());
                for key in source.keys() {
                    if let Some(v) = out.swap_remove(key.as_str()) {
                        ordered.insert(key.clone(), v);
                    }
                }
                Value::Object(ordered)
            }
            (Kind::Ref(_) | Kind::This | Kind::Cyclic(_), _) => match env.follow(schema, &self.references) {
                Some(def) => self.clean_at(&Env::inside(&def), &def.schema, value),
                None => value.clone(),
            },
            (Kind::Codec(codec), _) => self.clean_at(env, &codec.inner, value),
            _ => value.clone(),
        }
    }

    /// Each round only removes entries, so the loop ends.
    fn clean_union(&self, env: &Env, variants: &[Schema], value: &Value) -> Value {
        let mut current = value.clone();
        loop {
            let next = variants.iter().find_map(|variant| {
                let cleaned = self.clean_at(env, variant, &current);
                self.matches(env, variant, &cleaned).then_some(cleaned)
            });
            match next {
                // Compared by digest: NaN leaves never equal themselves.
                Some(next) if digest_value(&next) != digest_value(&current) => current = next,
                _ => return current,
            }
        }
    }

    /// The cleaned value of an extra key, or `None` when it must go.
    fn clean_extra(&self, env: &Env, additional: &Additional, value: &Value) -> Option<Value> {
        match additional {
            Additional::Allow => Some(value.clone()),
            Additional::Schema(extra) => {
                let cleaned = self.clean_at(env, extra, value);
                self.matches(env, extra, &cleaned).then_some(cleaned)
            }
            Additional::Deny | Additional::Unspecified => None,
        }
    }
}
