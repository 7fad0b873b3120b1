//! # tyval-value — The Value Engine
//!
//! Generic recursive algorithms that interpret a schema graph directly
//! against a concrete [`Value`]. Every per-schema operation hangs off a
//! [`Scope`], which binds the root schema to its external references, the
//! format/kind [`Registry`] and an [`EngineConfig`].
//!
//! ## Operations
//!
//! | Operation | Fails? |
//! |-----------|--------|
//! | [`Scope::check`], [`Scope::errors`] | never |
//! | [`Scope::convert`], [`Scope::clean`], [`Scope::cast`], [`Scope::apply_defaults`] | never |
//! | [`Scope::create`], [`Scope::repair`] | [`CreateError`] / [`RepairError`] |
//! | [`Scope::decode`], [`Scope::encode`] | [`TransformError`] |
//! | [`Scope::assert`], [`Scope::parse`] | [`AssertError`] / [`ParseError`] |
//!
//! The schema-free operations [`hash`], [`equal`], [`diff`] and [`patch`]
//! work on plain values.
//!
//! ## Agreement
//!
//! `check` and `errors` run the same visitor: `check(v)` is true exactly
//! when `errors(v)` is empty. The compiled validator in `tyval-compiler`
//! reports the same records in the same order.

mod cast;
mod check;
mod clean;
mod convert;
mod create;
mod default;
mod delta;
mod scope;
mod transform;

pub use delta::{diff, equal, hash, patch, Edit};
pub use scope::{Scope, ScopeBuilder};

pub use tyval_core::{
    AssertError, ConfigurationError, CreateError, EngineConfig, ParseError, PatchError, References,
    Registry, RepairError, Schema, TransformError, Value, ValueDigest, Violation, ViolationKind,
    Violations,
};
