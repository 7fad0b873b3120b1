//! Program evaluation.
//!
//! One visitor serves both entry points. `check` runs it with an
//! [`Untracked`] location and a report that stops at the first fault, so no
//! path is ever rendered and nothing is allocated. `errors` runs it with a
//! [`Trail`] and renders each fault into a [`Violation`] on demand.
//!
//! The order of keyword tests mirrors the value engine exactly, which is
//! what makes the two evaluators report identical sequences.

use std::ops::ControlFlow;

use tyval_core::graph::record_key_matches;
use tyval_core::keywords;
use tyval_core::pointer::{self, Trail};
use tyval_core::violation::{Detail, Fault, Sink, ViolationKind as K, ViolationWalk};
use tyval_core::{UnknownKindPolicy, Value, Violation};

use crate::program::{Extra, Op, Program};

type Report<'r> = dyn FnMut(Fault<'_>, &dyn Fn() -> String, &Value) -> ControlFlow<()> + 'r;

/// Where in the value the visitor currently is.
trait Track<'v> {
    fn enter_key(&mut self, key: &'v str);
    fn enter_index(&mut self, index: usize);
    fn leave(&mut self);
    fn pointer(&self) -> String;
}

impl<'v> Track<'v> for Trail<'v> {
    fn enter_key(&mut self, key: &'v str) {
        self.push_key(key);
    }

    fn enter_index(&mut self, index: usize) {
        self.push_index(index);
    }

    fn leave(&mut self) {
        self.pop();
    }

    fn pointer(&self) -> String {
        self.to_pointer()
    }
}

/// Location tracking for check mode, where paths are never rendered.
struct Untracked;

impl<'v> Track<'v> for Untracked {
    fn enter_key(&mut self, _: &'v str) {}

    fn enter_index(&mut self, _: usize) {}

    fn leave(&mut self) {}

    fn pointer(&self) -> String {
        String::new()
    }
}

fn fail<'v>(report: &mut Report<'_>, fault: Fault<'_>, at: &impl Track<'v>, value: &Value) -> ControlFlow<()> {
    report(fault, &|| at.pointer(), value)
}

fn expect<'v>(ok: bool, kind: K, report: &mut Report<'_>, at: &impl Track<'v>, value: &Value) -> ControlFlow<()> {
    if ok {
        ControlFlow::Continue(())
    } else {
        fail(report, Fault::new(kind), at, value)
    }
}

impl ViolationWalk for Program {
    fn walk(&self, value: &Value, sink: &mut Sink<'_>) -> ControlFlow<()> {
        let mut trail = Trail::new();
        self.visit(&self.root, value, &mut trail, &mut |fault, path, at| {
            sink(Violation::new(fault, path(), at))
        })
    }
}

impl Program {
    pub(crate) fn check(&self, value: &Value) -> bool {
        self.matches(&self.root, value)
    }

    fn matches(&self, op: &Op, value: &Value) -> bool {
        self.visit(op, value, &mut Untracked, &mut |_, _, _| ControlFlow::Break(()))
            .is_continue()
    }

    fn visit<'v, T: Track<'v>>(
        &self,
        op: &Op,
        value: &'v Value,
        at: &mut T,
        report: &mut Report<'_>,
    ) -> ControlFlow<()> {
        match op {
            Op::Pass => ControlFlow::Continue(()),
            Op::Never => fail(report, Fault::new(K::Never), at, value),
            Op::String { schema, pattern, format } => match value {
                Value::String(text) => {
                    keywords::string_faults(schema, text, pattern.as_ref(), format.as_ref(), &mut |fault| {
                        fail(report, fault, at, value)
                    })
                }
                _ => fail(report, Fault::new(K::String), at, value),
            },
            Op::Number { schema, integer } => {
                let allow_nan = !integer && self.config.allow_nan;
                keywords::number_faults(schema, value, *integer, allow_nan, &mut |fault| {
                    fail(report, fault, at, value)
                })
            }
            Op::Boolean => expect(matches!(value, Value::Bool(_)), K::Boolean, report, at, value),
            Op::Null => expect(matches!(value, Value::Null), K::Null, report, at, value),
            Op::Undefined => expect(
                keywords::is_void(value, self.config.allow_null_void),
                K::Undefined,
                report,
                at,
                value,
            ),
            Op::Symbol => expect(matches!(value, Value::Symbol(_)), K::Symbol, report, at, value),
            Op::BigInt(schema) => match value {
                Value::BigInt(n) => keywords::bigint_faults(schema, *n, &mut |fault| fail(report, fault, at, value)),
                _ => fail(report, Fault::new(K::BigInt), at, value),
            },
            Op::Bytes(schema) => match value {
                Value::Bytes(bytes) => {
                    keywords::bytes_faults(schema, bytes.len(), &mut |fault| fail(report, fault, at, value))
                }
                _ => fail(report, Fault::new(K::Bytes), at, value),
            },
            Op::Literal(literal) => {
                if literal.matches(value) {
                    ControlFlow::Continue(())
                } else {
                    fail(report, Fault::with(K::Literal, Detail::Literal(literal)), at, value)
                }
            }
            Op::Enum(literals) => expect(literals.iter().any(|l| l.matches(value)), K::Enum, report, at, value),
            Op::Object {
                properties,
                additional,
                min,
                max,
            } => {
                let Value::Object(map) = value else {
                    return fail(report, Fault::new(K::Object), at, value);
                };
                bounds(*min, *max, map.len(), report, at, value)?;
                for property in properties {
                    match map.get_key_value(property.key.as_str()) {
                        Some((k, v)) => {
                            if !property.required && !self.config.exact_optional_properties && v.is_undefined() {
                                continue;
                            }
                            at.enter_key(k);
                            let flow = self.visit(&property.op, v, at, report);
                            at.leave();
                            flow?;
                        }
                        None if property.required => {
                            let missing = Value::Undefined;
                            report(
                                Fault::new(K::ObjectRequiredProperty),
                                &|| pointer::push(&at.pointer(), &property.key),
                                &missing,
                            )?;
                        }
                        None => {}
                    }
                }
                if matches!(additional, Extra::Open) {
                    return ControlFlow::Continue(());
                }
                let declared = |k: &str| properties.iter().any(|p| p.key == k);
                for (k, v) in map.iter().filter(|(k, _)| !declared(k)) {
                    at.enter_key(k);
                    let flow = self.extra(additional, v, at, report);
                    at.leave();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Op::Record {
                key,
                value: schema,
                additional,
                min,
                max,
            } => {
                let Value::Object(map) = value else {
                    return fail(report, Fault::new(K::Object), at, value);
                };
                bounds(*min, *max, map.len(), report, at, value)?;
                for (k, v) in map {
                    at.enter_key(k);
                    let flow = if record_key_matches(key, k, &self.patterns) {
                        self.visit(schema, v, at, report)
                    } else {
                        self.extra(additional, v, at, report)
                    };
                    at.leave();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Op::Array {
                items: item,
                min,
                max,
                unique,
                contains,
            } => {
                let Value::Array(items) = value else {
                    return fail(report, Fault::new(K::Array), at, value);
                };
                if let Some(min) = *min {
                    if items.len() < min {
                        fail(report, Fault::with(K::ArrayMinItems, Detail::Size(min)), at, value)?;
                    }
                }
                if let Some(max) = *max {
                    if items.len() > max {
                        fail(report, Fault::with(K::ArrayMaxItems, Detail::Size(max)), at, value)?;
                    }
                }
                for (i, element) in items.iter().enumerate() {
                    at.enter_index(i);
                    let flow = self.visit(item, element, at, report);
                    at.leave();
                    flow?;
                }
                if *unique && keywords::has_duplicates(items) {
                    fail(report, Fault::new(K::ArrayUniqueItems), at, value)?;
                }
                if let Some(contains) = contains {
                    let count = items.iter().filter(|element| self.matches(&contains.op, element)).count();
                    match contains.min {
                        None if count == 0 => fail(report, Fault::new(K::ArrayContains), at, value)?,
                        Some(min) if count < min => {
                            fail(report, Fault::with(K::ArrayMinContains, Detail::Size(min)), at, value)?
                        }
                        _ => {}
                    }
                    if let Some(max) = contains.max {
                        if count > max {
                            fail(report, Fault::with(K::ArrayMaxContains, Detail::Size(max)), at, value)?;
                        }
                    }
                }
                ControlFlow::Continue(())
            }
            Op::Tuple(elements) => {
                let Value::Array(items) = value else {
                    return fail(report, Fault::new(K::Tuple), at, value);
                };
                if items.len() != elements.len() {
                    return fail(report, Fault::with(K::TupleLength, Detail::Size(elements.len())), at, value);
                }
                for (i, (element, item)) in elements.iter().zip(items).enumerate() {
                    at.enter_index(i);
                    let flow = self.visit(element, item, at, report);
                    at.leave();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Op::Union(variants) => expect(
                variants.iter().any(|variant| self.matches(variant, value)),
                K::Union,
                report,
                at,
                value,
            ),
            Op::Intersect { members, unevaluated } => {
                for member in members {
                    if !self.matches(member, value) {
                        fail(report, Fault::new(K::Intersect), at, value)?;
                        self.visit(member, value, at, report)?;
                    }
                }
                let (Some(unevaluated), Value::Object(map)) = (unevaluated, value) else {
                    return ControlFlow::Continue(());
                };
                for (k, v) in map.iter().filter(|(k, _)| !unevaluated.known.contains(k, &self.patterns)) {
                    if unevaluated.extra.as_ref().is_some_and(|extra| self.matches(extra, v)) {
                        continue;
                    }
                    at.enter_key(k);
                    let flow = fail(report, Fault::with(K::IntersectUnevaluatedProperties, Detail::Text(k)), at, v);
                    at.leave();
                    flow?;
                }
                ControlFlow::Continue(())
            }
            Op::Not(inner) => expect(!self.matches(inner, value), K::Not, report, at, value),
            Op::Call(index) => match self.subroutines.get(*index) {
                Some(sub) => self.visit(&sub.body, value, at, report),
                None => fail(report, Fault::new(K::Unresolved), at, value),
            },
            Op::Unresolved(name) => fail(report, Fault::with(K::Unresolved, Detail::Text(name)), at, value),
            Op::Custom {
                name,
                schema,
                predicate,
            } => {
                let ok = match predicate {
                    Some(predicate) => predicate(schema, value),
                    None => self.config.unknown_kinds == UnknownKindPolicy::Accept,
                };
                if ok {
                    ControlFlow::Continue(())
                } else {
                    fail(report, Fault::with(K::Kind, Detail::Text(name)), at, value)
                }
            }
        }
    }

    /// A key outside the declared ones, already entered on `at`.
    fn extra<'v, T: Track<'v>>(
        &self,
        additional: &Extra,
        value: &'v Value,
        at: &mut T,
        report: &mut Report<'_>,
    ) -> ControlFlow<()> {
        match additional {
            Extra::Open => ControlFlow::Continue(()),
            Extra::Deny => fail(report, Fault::new(K::ObjectAdditionalProperties), at, value),
            Extra::Check(op) => self.visit(op, value, at, report),
        }
    }
}

fn bounds<'v>(
    min: Option<usize>,
    max: Option<usize>,
    len: usize,
    report: &mut Report<'_>,
    at: &impl Track<'v>,
    value: &Value,
) -> ControlFlow<()> {
    if let Some(min) = min {
        if len < min {
            fail(report, Fault::with(K::ObjectMinProperties, Detail::Size(min)), at, value)?;
        }
    }
    if let Some(max) = max {
        if len > max {
            fail(report, Fault::with(K::ObjectMaxProperties, Detail::Size(max)), at, value)?;
        }
    }
    ControlFlow::Continue(())
}
