//! # tyval-core — Foundational Types for tyval
//!
//! The leaf crate of the workspace. It defines everything the value engine
//! (`tyval-value`) and the compiler (`tyval-compiler`) share, so that both
//! evaluators agree on resolution rules, policies and failure records.
//!
//! ## Contents
//!
//! - [`schema`]: the immutable, structurally shared schema model.
//! - [`value`]: the dynamic runtime value the engines operate on.
//! - [`plain`]: lossy JSON-Schema-like serialization of schemas.
//! - [`registry`] / [`format`]: format and custom-kind predicates.
//! - [`config`]: engine policy switches.
//! - [`graph`]: lexical definition resolution and reachability analysis.
//! - [`keywords`]: leaf keyword constraints shared by both evaluators.
//! - [`violation`]: violation records and lazy violation sequences.
//! - [`canonical`] / [`digest`]: canonical value bytes and structural hashes.
//! - [`pointer`]: JSON pointers over values.
//! - [`error`]: the structured error hierarchy.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tyval-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod format;
pub mod graph;
pub mod keywords;
pub mod plain;
pub mod pointer;
pub mod registry;
pub mod schema;
pub mod value;
pub mod violation;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use config::{DefaultedPropertyPolicy, EngineConfig, EngineConfigError, UnknownKindPolicy};
pub use digest::{digest_value, sha256_digest, ValueDigest};
pub use error::{
    CodecError, ConfigurationError, CreateError, Direction, ParseError, PatchError, PlainError,
    PointerError, RepairError, TransformError, TyvalError,
};
pub use registry::{FormatRegistry, KindRegistry, Registry};
pub use schema::{
    Additional, Codec, FnCodec, Kind, Literal, RecordKey, References, Schema,
};
pub use value::{Map, Symbol, Value, ValueType};
pub use violation::{AssertError, Violation, ViolationKind, Violations};
