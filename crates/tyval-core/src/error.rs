//! # Error Hierarchy — Typed Failures by Operation
//!
//! Every fallible operation in tyval returns one of the error types below.
//! All errors use `thiserror` and carry structured fields rather than
//! pre-formatted strings.
//!
//! ## Taxonomy
//!
//! - Validation failure is not an error: `check` returns `false` and
//!   `errors` yields [`Violation`] records.
//! - [`ConfigurationError`]: the schema graph cannot be evaluated at all
//!   (unresolved reference, unknown custom kind, bad pattern, a reference
//!   cycle that never consumes input). Raised when a scope or compiled
//!   program is built, never while checking a value.
//! - [`CreateError`] / [`RepairError`]: no value can be synthesized.
//! - [`TransformError`]: decode/encode rejected the input before any codec
//!   ran, or a codec itself failed.
//! - [`PatchError`]: an edit script does not fit its base value.
//!
//! Schema locations (`path` fields on configuration and synthesis errors)
//! are JSON pointers into the plain-data shape of the schema, e.g.
//! `/properties/items/items`. Value locations are JSON pointers into the
//! value.

use std::fmt;

use thiserror::Error;

use crate::violation::{AssertError, Violation};

/// Top-level error type for tyval.
#[derive(Error, Debug)]
pub enum TyvalError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("create error: {0}")]
    Create(#[from] CreateError),

    #[error("repair error: {0}")]
    Repair(#[from] RepairError),

    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("patch error: {0}")]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Assert(#[from] AssertError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("plain-data error: {0}")]
    Plain(#[from] PlainError),

    #[error("engine configuration error: {0}")]
    Config(#[from] crate::config::EngineConfigError),
}

/// The schema graph cannot be evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A `Ref` names no enclosing definition and no external reference.
    #[error("unresolved reference '{name}' at {path}")]
    UnresolvedReference {
        /// The referenced definition name.
        name: String,
        /// Schema location of the reference.
        path: String,
    },

    /// A `This` node appears outside any definition.
    #[error("self-reference at {path} is not inside a definition")]
    UnboundThis {
        /// Schema location of the self-reference.
        path: String,
    },

    /// A cyclic schema's entry name is not in its own table.
    #[error("cyclic entry '{entry}' is not defined at {path}")]
    MissingEntry {
        /// The declared entry name.
        entry: String,
        /// Schema location of the cyclic node.
        path: String,
    },

    /// A custom kind has no registered predicate.
    #[error("custom kind '{kind}' at {path} is not registered")]
    UnknownKind {
        /// The custom kind name.
        kind: String,
        /// Schema location of the custom node.
        path: String,
    },

    /// A `pattern` or record key pattern does not compile.
    #[error("invalid pattern '{pattern}' at {path}: {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Schema location carrying the pattern.
        path: String,
        /// Regex compiler message.
        reason: String,
    },

    /// A chain of references returns to a definition without descending
    /// into any part of the value.
    #[error("definition '{name}' refers back to itself without consuming input (at {path})")]
    UnguardedCycle {
        /// A definition on the cycle.
        name: String,
        /// Schema location of the closing reference.
        path: String,
    },

    /// A schema in a reference list has no `$id`.
    #[error("reference schema at position {position} has no $id")]
    MissingId {
        /// Index within the supplied list.
        position: usize,
    },
}

/// No value could be synthesized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    /// The kind has no zero value and the schema declares no default.
    #[error("no default available for {kind} at {path}")]
    NoDefault {
        /// Kind name of the schema.
        kind: String,
        /// Schema location.
        path: String,
    },

    /// Every branch of a recursive definition leads back to itself.
    #[error("definition '{name}' has no base case reachable without recursion (at {path})")]
    Cyclic {
        /// The definition that recursed.
        name: String,
        /// Schema location of the recursive reference.
        path: String,
    },

    /// The merged members of an intersection do not satisfy every member.
    #[error("intersection at {path} produced a value that does not satisfy all members")]
    Intersect {
        /// Schema location of the intersection.
        path: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A value could not be repaired.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepairError {
    /// The kind has no generic repair strategy.
    #[error("no repair strategy for {kind} at {path}")]
    Unsupported {
        /// Kind name of the schema.
        kind: String,
        /// Schema location.
        path: String,
    },

    #[error(transparent)]
    Create(#[from] CreateError),
}

/// Direction of a codec application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Decode,
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decode => "decode",
            Self::Encode => "encode",
        })
    }
}

/// Failure raised by a codec function itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CodecError {
    pub message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decode or encode failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The encoded input does not satisfy the schema; no codec ran.
    #[error("decode input rejected: {violation}")]
    DecodeCheck {
        /// First violation of the input.
        violation: Box<Violation>,
    },

    /// The encoded result does not satisfy the schema.
    #[error("encode output rejected: {violation}")]
    EncodeCheck {
        /// First violation of the encoded result.
        violation: Box<Violation>,
    },

    /// A value did not satisfy a codec's declared decoded shape.
    #[error("{direction} at {path}: value rejected by declared output shape: {violation}")]
    Output {
        direction: Direction,
        /// Value location of the codec node.
        path: String,
        violation: Box<Violation>,
    },

    /// The codec function failed.
    #[error("{direction} codec '{codec}' failed at {path}: {source}")]
    Codec {
        direction: Direction,
        /// Codec name.
        codec: String,
        /// Value location of the codec node.
        path: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A JSON pointer string could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid JSON pointer '{pointer}': {reason}")]
pub struct PointerError {
    pub pointer: String,
    pub reason: String,
}

/// An edit script does not fit its base value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The edit's target path does not exist on the base value.
    #[error("path '{path}' does not exist on the base value")]
    PathNotFound { path: String },

    /// The parent of the edit's target is not an object or array.
    #[error("parent of '{path}' is not an object or array")]
    NotContainer { path: String },

    /// The root cannot be inserted into or deleted.
    #[error("edit at the root must be an update")]
    RootEdit,

    #[error(transparent)]
    Pointer(#[from] PointerError),
}

/// Failure inside the parse pipeline.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Assert(#[from] AssertError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Plain data could not be read back as a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlainError {
    /// A keyword carries a value of the wrong JSON type.
    #[error("keyword '{keyword}' at {path}: expected {expected}")]
    InvalidKeyword {
        keyword: String,
        path: String,
        expected: &'static str,
    },

    /// A `type` keyword names an unknown type.
    #[error("unknown type '{name}' at {path}")]
    UnknownType { name: String, path: String },

    /// The node is not a JSON object or boolean.
    #[error("schema at {path} must be an object or boolean")]
    NotASchema { path: String },

    #[error("serialization failed: {0}")]
    Json(String),
}
