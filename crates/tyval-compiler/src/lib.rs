//! # tyval-compiler — Compiled Validators
//!
//! Turns a schema graph into a [`TypeCheck`]: a self-contained program that
//! validates values without re-walking the schema tree or consulting any
//! registry per call.
//!
//! ## Compilation
//!
//! 1. The core reachability pass runs first. Every configuration failure
//!    (unresolved reference, unregistered custom kind, bad pattern,
//!    unguarded cycle) surfaces as a [`CompileError`] carrying the schema
//!    path, before anything is emitted.
//! 2. The root and each distinct reachable definition are lowered to an
//!    operation tree. References compile to calls into the definition
//!    table, so recursive schemas become ordinary recursive calls.
//!
//! ## Evaluation
//!
//! [`TypeCheck::check`] short-circuits and never renders a path.
//! [`TypeCheck::errors`] threads a JSON-pointer location and yields the same
//! [`Violation`](tyval_core::Violation) records, in the same order, as the
//! value engine in `tyval-value`.

mod compiler;
mod error;
mod eval;
mod program;

pub use compiler::{Compiler, TypeCheck};
pub use error::CompileError;
