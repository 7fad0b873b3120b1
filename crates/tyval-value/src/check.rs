//! Structural validation: `check` and the violation walk behind `errors`.
//!
//! Both run the same recursive visit. `check` hands it a report callback
//! that breaks on the first fault; `errors` renders every fault into a
//! [`Violation`] and forwards it to the consumer's sink, which decides when
//! to stop. Sharing one visit is what keeps `check(v)` and
//! `errors(v).is_empty()` in agreement.
//!
//! Locations are threaded as a borrowed [`Trail`] and only rendered to a
//! JSON pointer when a fault is reported.

use std::ops::ControlFlow;

use tyval_core::graph::{record_key_matches, Env, KeySet};
use tyval_core::keywords;
use tyval_core::pointer::{self, Trail};
use tyval_core::schema::{is_required, Additional, Kind, Schema};
use tyval_core::violation::{Detail, Fault, Sink, ViolationKind as K};
use tyval_core::{UnknownKindPolicy, Value, Violation};

use crate::scope::Engine;

/// Receives a fault, a lazily rendered location and the value found there.
pub(crate) type Report<'r> = dyn FnMut(Fault<'_>, &dyn Fn() -> String, &Value) -> ControlFlow<()> + 'r;

fn fail(report: &mut Report<'_>, fault: Fault<'_>, trail: &Trail<'_>, value: &Value) -> ControlFlow<()> {
    report(fault, &|| trail.to_pointer(), value)
}

fn expect(ok: bool, kind: K, report: &mut Report<'_>, trail: &Trail<'_>, value: &Value) -> ControlFlow<()> {
    if ok {
        ControlFlow::Continue(())
    } else {
        fail(report, Fault::new(kind), trail, value)
    }
}

impl Engine {
    pub(crate) fn check(&self, value: &Value) -> bool {
        self.matches(&Env::root(), &self.root, value)
    }

    pub(crate) fn violations(&self, value: &Value, sink: &mut Sink<'_>) -> ControlFlow<()> {
        let mut trail = Trail::new();
        self.visit(&Env::root(), &self.root, value, &mut trail, &mut |fault, path, at| {
            sink(Violation::new(fault, path(), at))
        })
    }

    /// The first violation of `value` against any node, located relative to
    /// `value`.
    pub(crate) fn first_violation(&self, env: &Env, schema: &Schema, value: &Value) -> Option<Violation> {
        let mut first = None;
        let mut trail = Trail::new();
        let _ = self.visit(env, schema, value, &mut trail, &mut |fault, path, at| {
            first = Some(Violation::new(fault, path(), at));
            ControlFlow::Break(())
        });
        first
    }

    /// Check-mode evaluation of any node.
    pub(crate) fn matches(&self, env: &Env, schema: &Schema, value: &Value) -> bool {
        let mut trail = Trail::default();
        self.visit(env, schema, value, &mut trail, &mut |_, _, _| ControlFlow::Break(()))
            .is_continue()
    }

    /// Report every local failure of `value` against `schema`, in order,
    /// until `report` breaks.
    pub(crate) fn visit<'v>(
        &self,
        env: &Env,
        schema: &Schema,
        value: &'v Value,
        trail: &mut Trail<'v>,
        report: &mut Report<'_>,
    ) -> ControlFlow<()> {
        match schema.kind() {
            Kind::Any | Kind::Unknown => ControlFlow::Continue(()),
            Kind::Never => fail(report, Fault::new(K::Never), trail, value),
            Kind::String(s) => match value {
                Value::String(text) => {
                    let pattern = s.pattern.as_deref().and_then(|p| self.patterns.get(p));
                    let format = s.format.as_deref().and_then(|f| self.registry.formats.get(f));
                    keywords::string_faults(s, text, pattern, format, &mut |fault| {
                        fail(report, fault, trail, value)
                    })
                }
                _ => fail(report, Fault::new(K::String), trail, value),
            },
            Kind::Number(n) => keywords::number_faults(n, value, false, self.config.allow_nan, &mut |fault| {
                fail(report, fault, trail, value)
            }),
            Kind::Integer(n) => keywords::number_faults(n, value, true, false, &mut |fault| {
                fail(report, fault, trail, value)
            }),
            Kind::Boolean => expect(matches!(value, Value::Bool(_)), K::Boolean, report, trail, value),
            Kind::Null => expect(matches!(value, Value::Null), K::Null, report, trail, value),
            Kind::Undefined => expect(
                keywords::is_void(value, self.config.allow_null_void),
                K::Undefined,
                report,
                trail,
                value,
            ),
            Kind::Symbol => expect(matches!(value, Value::Symbol(_)), K::Symbol, report, trail, value),
            Kind::BigInt(b) => match value {
                Value::BigInt(n) => keywords::bigint_faults(b, *n, &mut |fault| fail(report, fault, trail, value)),
                _ => fail(report, Fault::new(K::BigInt), trail, value),
            },
            Kind::Bytes(b) => match value {
                Value::Bytes(bytes) => {
                    keywords::bytes_faults(b, bytes.len(), &mut |fault| fail(report, fault, trail, value))
                }
                _ => fail(report, Fault::new(K::Bytes), trail, value),
            },
            Kind::Literal(literal) => {
                if literal.matches(value) {
                    ControlFlow::Continue(())
                } else {
                    fail(report, Fault::with(K::Literal, Detail::Literal(literal)), trail, value)
                }
            }
            Kind::Enum(literals) => expect(
                literals.iter().any(|l| l.matches(value)),
                K::Enum,
                report,
                trail,
                value,
            ),
            Kind::Object(obj) => {
                let Value::Object(map) = value else {
                    return fail(report, Fault::new(K::Object), trail, value);
                };
                self.property_bounds(obj.min_properties, obj.max_properties, map.len(), report, trail, value)?;
                let policy = self.config.defaulted_properties;
                for (key, property) in &obj.properties {
                    let required = is_required(property, policy);
                    match map.get_key_value(key.as_str()) {
                        Some((k, v)) => {
                            if !required && !self.config.exact_optional_properties && v.is_undefined() {
                                continue;
                            }
                            trail.push_key(k);
                            let flow = self.visit(env, property, v, trail, report);
                            trail.pop();
                            flow?;
                        }
                        None if required => {
                            let missing = Value::Undefined;
                            report(
                                Fault::new(K::ObjectRequiredProperty),
                                &|| pointer::push(&trail.to_pointer(), key),
                                &missing,
                            )?;
                        }
                        None => {}
                    }
                }
                match &obj.additional {
                    Additional::Deny => {
                        for (k, v) in map.iter().filter(|(k, _)| !obj.properties.contains_key(k.as_str())) {
                            trail.push_key(k);
                            let flow = fail(report, Fault::new(K::ObjectAdditionalProperties), trail, v);
                            trail.pop();
                            flow?;
                        }
                    }
                    Additional::Schema(extra) => {
                        for (k, v) in map.iter().filter(|(k, _)| !obj.properties.contains_key(k.as_str())) {
                            trail.push_key(k);
                            let flow = self.visit(env, extra, v, trail, report);
                            trail.pop();
                            flow?;
                        }
                    }
                    Additional::Unspecified | Additional::Allow => {}
                }
                ControlFlow::Continue(())
            }
            Kind::Record(record) => {
                let Value::Object(map) = value else {
                    return fail(report, Fault::new(K::Object), trail, value);
                };
                self.property_bounds(record.min_properties, record.max_properties, map.len(), report, trail, value)?;
                for (k, v) in map {
                    trail.push_key(k);
                    let flow = if record_key_matches(&record.key, k, &self.patterns) {
                        self.visit(env, &record.value, v, trail, report)
                    } else {
                        match &record.additional {
                            Additional::Deny => fail(report, Fault::new(K::ObjectAdditionalProperties), trail, v),
                            Additional::Schema(extra) => self.visit(env, extra, v, trail, report),
                            Additional::Unspecified | Additional::Allow => ControlFlow::Continue(()),
                        }
                    };
                    trail.pop();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Kind::Array(arr) => {
                let Value::Array(items) = value else {
                    return fail(report, Fault::new(K::Array), trail, value);
                };
                if let Some(min) = arr.min_items {
                    if items.len() < min {
                        fail(report, Fault::with(K::ArrayMinItems, Detail::Size(min)), trail, value)?;
                    }
                }
                if let Some(max) = arr.max_items {
                    if items.len() > max {
                        fail(report, Fault::with(K::ArrayMaxItems, Detail::Size(max)), trail, value)?;
                    }
                }
                for (i, item) in items.iter().enumerate() {
                    trail.push_index(i);
                    let flow = self.visit(env, &arr.items, item, trail, report);
                    trail.pop();
                    flow?;
                }
                if arr.unique_items && keywords::has_duplicates(items) {
                    fail(report, Fault::new(K::ArrayUniqueItems), trail, value)?;
                }
                if let Some(contains) = &arr.contains {
                    let count = items.iter().filter(|item| self.matches(env, contains, item)).count();
                    match arr.min_contains {
                        None if count == 0 => fail(report, Fault::new(K::ArrayContains), trail, value)?,
                        Some(min) if count < min => {
                            fail(report, Fault::with(K::ArrayMinContains, Detail::Size(min)), trail, value)?
                        }
                        _ => {}
                    }
                    if let Some(max) = arr.max_contains {
                        if count > max {
                            fail(report, Fault::with(K::ArrayMaxContains, Detail::Size(max)), trail, value)?;
                        }
                    }
                }
                ControlFlow::Continue(())
            }
            Kind::Tuple(elements) => {
                let Value::Array(items) = value else {
                    return fail(report, Fault::new(K::Tuple), trail, value);
                };
                if items.len() != elements.len() {
                    return fail(report, Fault::with(K::TupleLength, Detail::Size(elements.len())), trail, value);
                }
                for (i, (element, item)) in elements.iter().zip(items).enumerate() {
                    trail.push_index(i);
                    let flow = self.visit(env, element, item, trail, report);
                    trail.pop();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Kind::Union(variants) => expect(
                variants.iter().any(|variant| self.matches(env, variant, value)),
                K::Union,
                report,
                trail,
                value,
            ),
            Kind::Intersect(intersect) => {
                for member in &intersect.members {
                    if !self.matches(env, member, value) {
                        fail(report, Fault::new(K::Intersect), trail, value)?;
                        self.visit(env, member, value, trail, report)?;
                    }
                }
                let Value::Object(map) = value else {
                    return ControlFlow::Continue(());
                };
                if !intersect.unevaluated.is_constraining() {
                    return ControlFlow::Continue(());
                }
                let known = KeySet::of_members(env, &intersect.members, &self.references);
                for (k, v) in map.iter().filter(|(k, _)| !known.contains(k, &self.patterns)) {
                    trail.push_key(k);
                    let flow = match &intersect.unevaluated {
                        Additional::Schema(extra) if self.matches(env, extra, v) => ControlFlow::Continue(()),
                        _ => fail(
                            report,
                            Fault::with(K::IntersectUnevaluatedProperties, Detail::Text(k)),
                            trail,
                            v,
                        ),
                    };
                    trail.pop();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Kind::Not(inner) => expect(!self.matches(env, inner, value), K::Not, report, trail, value),
            Kind::Ref(_) | Kind::This | Kind::Cyclic(_) => match env.follow(schema, &self.references) {
                Some(def) => self.visit(&Env::inside(&def), &def.schema, value, trail, report),
                None => {
                    let name = match schema.kind() {
                        Kind::Ref(name) => name.as_str(),
                        Kind::Cyclic(cyclic) => cyclic.entry.as_str(),
                        _ => "This",
                    };
                    fail(report, Fault::with(K::Unresolved, Detail::Text(name)), trail, value)
                }
            },
            Kind::Codec(codec) => self.visit(env, &codec.inner, value, trail, report),
            Kind::Custom(custom) => {
                let ok = match self.registry.kinds.get(&custom.name) {
                    Some(predicate) => predicate(schema, value),
                    None => self.config.unknown_kinds == UnknownKindPolicy::Accept,
                };
                if ok {
                    ControlFlow::Continue(())
                } else {
                    fail(report, Fault::with(K::Kind, Detail::Text(&custom.name)), trail, value)
                }
            }
        }
    }

    fn property_bounds(
        &self,
        min: Option<usize>,
        max: Option<usize>,
        len: usize,
        report: &mut Report<'_>,
        trail: &Trail<'_>,
        value: &Value,
    ) -> ControlFlow<()> {
        if let Some(min) = min {
            if len < min {
                fail(report, Fault::with(K::ObjectMinProperties, Detail::Size(min)), trail, value)?;
            }
        }
        if let Some(max) = max {
            if len > max {
                fail(report, Fault::with(K::ObjectMaxProperties, Detail::Size(max)), trail, value)?;
            }
        }
        ControlFlow::Continue(())
    }
}
