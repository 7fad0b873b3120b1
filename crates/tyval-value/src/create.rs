//! Value synthesis.
//!
//! A declared default (literal or factory) always wins. Otherwise each kind
//! has a zero value, objects get their required properties, arrays their
//! minimum length, and unions their first variant that can be built.
//!
//! Definitions entered on the current path are tracked; re-entering one
//! means the schema has no base case along that branch and yields
//! [`CreateError::Cyclic`], which a union answers by trying its next
//! variant.

use tyval_core::graph::{DefKey, Env};
use tyval_core::pointer;
use tyval_core::schema::{BigIntSchema, Kind, NumberSchema, Schema};
use tyval_core::{CreateError, Map, Symbol, Value};

use crate::scope::Engine;

impl Engine {
    pub(crate) fn create(&self) -> Result<Value, CreateError> {
        let mut visited = Vec::new();
        self.create_at(&Env::root(), &self.root, "", &mut visited)
    }

    pub(crate) fn create_at(
        &self,
        env: &Env,
        schema: &Schema,
        path: &str,
        visited: &mut Vec<DefKey>,
    ) -> Result<Value, CreateError> {
        if let Some(default) = schema.default_value() {
            return Ok(default.produce());
        }
        let no_default = || CreateError::NoDefault {
            kind: schema.kind().name().to_string(),
            path: path.to_string(),
        };
        match schema.kind() {
            Kind::Any | Kind::Unknown => Ok(Value::Object(Map::new())),
            Kind::Never | Kind::Not(_) | Kind::Custom(_) => Err(no_default()),
            Kind::String(s) => {
                if s.pattern.is_some() || s.format.is_some() {
                    return Err(no_default());
                }
                self.admissible(env, schema, Value::String(" ".repeat(s.min_length.unwrap_or(0))))
                    .ok_or_else(no_default)
            }
            Kind::Number(n) => self
                .admissible(env, schema, Value::Number(create_number(n, false)))
                .ok_or_else(no_default),
            Kind::Integer(n) => self
                .admissible(env, schema, Value::Number(create_number(n, true)))
                .ok_or_else(no_default),
            Kind::BigInt(b) => self
                .admissible(env, schema, Value::BigInt(create_bigint(b)))
                .ok_or_else(no_default),
            Kind::Boolean => Ok(Value::Bool(false)),
            Kind::Null => Ok(Value::Null),
            Kind::Undefined => Ok(Value::Undefined),
            Kind::Symbol => Ok(Value::Symbol(Symbol::new(None))),
            Kind::Bytes(b) => self
                .admissible(env, schema, Value::Bytes(vec![0; b.min_byte_length.unwrap_or(0)]))
                .ok_or_else(no_default),
            Kind::Literal(literal) => Ok(literal.to_value()),
            Kind::Enum(literals) => literals.first().map(|l| l.to_value()).ok_or_else(no_default),
            Kind::Object(obj) => {
                let base = pointer::push(path, "properties");
                let mut map = Map::new();
                for (key, property) in obj.properties.iter().filter(|(_, p)| !p.is_optional()) {
                    let value = self.create_at(env, property, &pointer::push(&base, key), visited)?;
                    map.insert(key.clone(), value);
                }
                let wanted = obj.min_properties.unwrap_or(0);
                for (key, property) in obj.properties.iter().filter(|(_, p)| p.is_optional()) {
                    if map.len() >= wanted {
                        break;
                    }
                    let value = self.create_at(env, property, &pointer::push(&base, key), visited)?;
                    map.insert(key.clone(), value);
                }
                if map.len() < wanted {
                    return Err(no_default());
                }
                Ok(Value::Object(map))
            }
            Kind::Array(arr) => {
                let len = arr.min_items.unwrap_or(0);
                if arr.contains.is_some() || (arr.unique_items && len > 1) {
                    return Err(no_default());
                }
                if len == 0 {
                    return Ok(Value::Array(Vec::new()));
                }
                let item = self.create_at(env, &arr.items, &pointer::push(path, "items"), visited)?;
                Ok(Value::Array(vec![item; len]))
            }
            Kind::Tuple(elements) => {
                let base = pointer::push(path, "prefixItems");
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| self.create_at(env, element, &pointer::push(&base, &i.to_string()), visited))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Kind::Record(record) => {
                if record.min_properties.unwrap_or(0) > 0 {
                    return Err(no_default());
                }
                Ok(Value::Object(Map::new()))
            }
            Kind::Union(variants) => {
                let base = pointer::push(path, "anyOf");
                let mut last = None;
                for (i, variant) in variants.iter().enumerate() {
                    match self.create_at(env, variant, &pointer::push(&base, &i.to_string()), visited) {
                        Ok(value) => return Ok(value),
                        Err(e) => last = Some(e),
                    }
                }
                Err(last.unwrap_or_else(no_default))
            }
            Kind::Intersect(intersect) => {
                let base = pointer::push(path, "allOf");
                let mut merged: Option<Value> = None;
                for (i, member) in intersect.members.iter().enumerate() {
                    let next = self.create_at(env, member, &pointer::push(&base, &i.to_string()), visited)?;
                    merged = Some(match (merged, next) {
                        (Some(Value::Object(mut acc)), Value::Object(more)) => {
                            acc.extend(more);
                            Value::Object(acc)
                        }
                        (_, next) => next,
                    });
                }
                let value = merged.ok_or_else(no_default)?;
                if !self.matches(env, schema, &value) {
                    return Err(CreateError::Intersect { path: path.to_string() });
                }
                Ok(value)
            }
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => {
                let def = env.follow(schema, &self.references).ok_or_else(no_default)?;
                if visited.contains(&def.key) {
                    tracing::trace!(definition = def.name(), path, "create re-entered definition");
                    return Err(CreateError::Cyclic {
                        name: def.name().to_string(),
                        path: path.to_string(),
                    });
                }
                let body = match schema.kind() {
                    Kind::Cyclic(_) => pointer::push(&pointer::push(path, "$defs"), def.name()),
                    _ => path.to_string(),
                };
                visited.push(def.key.clone());
                let result = self.create_at(&Env::inside(&def), &def.schema, &body, visited);
                visited.pop();
                result
            }
            Kind::Codec(codec) => self.create_at(env, &codec.inner, path, visited),
        }
    }

    /// `candidate`, if it satisfies `schema`. Bound arithmetic can land on a
    /// value the keywords still reject, and some keyword sets admit nothing.
    fn admissible(&self, env: &Env, schema: &Schema, candidate: Value) -> Option<Value> {
        self.matches(env, schema, &candidate).then_some(candidate)
    }
}

/// A candidate near the lower bound, nudged onto `multipleOf` and clamped
/// to the upper bounds. The clamps can undo the earlier steps.
fn create_number(n: &NumberSchema, integer: bool) -> f64 {
    let mut x = match (n.minimum, n.exclusive_minimum) {
        (Some(min), _) => min,
        (None, Some(exclusive)) => exclusive + 1.0,
        (None, None) => 0.0,
    };
    if integer {
        x = x.ceil();
    }
    if let Some(m) = n.multiple_of.filter(|m| *m > 0.0) {
        if x % m != 0.0 {
            x = (x / m).ceil() * m;
        }
    }
    if let Some(max) = n.maximum {
        x = x.min(max);
    }
    if let Some(exclusive) = n.exclusive_maximum {
        if x >= exclusive {
            x = exclusive - 1.0;
        }
    }
    x
}

fn create_bigint(b: &BigIntSchema) -> i128 {
    let mut x = match (b.minimum, b.exclusive_minimum) {
        (Some(min), _) => min,
        (None, Some(exclusive)) => exclusive.saturating_add(1),
        (None, None) => 0,
    };
    if let Some(m) = b.multiple_of.filter(|m| *m > 0) {
        let rem = x.rem_euclid(m);
        if rem != 0 {
            x = x.saturating_add(m - rem);
        }
    }
    if let Some(max) = b.maximum {
        x = x.min(max);
    }
    if let Some(exclusive) = b.exclusive_maximum {
        if x >= exclusive {
            x = exclusive.saturating_sub(1);
        }
    }
    x
}
