//! Codec functions carried by `Codec` schema nodes.
//!
//! A codec pairs a decode function (encoded → decoded) with its inverse.
//! Both are fallible; a failure here is reported distinctly from a value
//! that failed validation before any codec ran.

use crate::error::CodecError;
use crate::value::Value;

/// A bidirectional value transform.
pub trait Codec: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str {
        "codec"
    }

    /// Map an encoded value to its decoded form.
    fn decode(&self, value: Value) -> Result<Value, CodecError>;

    /// Map a decoded value back to its encoded form.
    fn encode(&self, value: Value) -> Result<Value, CodecError>;
}

/// A codec assembled from two closures.
pub struct FnCodec<D, E> {
    name: String,
    decode: D,
    encode: E,
}

impl<D, E> FnCodec<D, E>
where
    D: Fn(Value) -> Result<Value, CodecError> + Send + Sync,
    E: Fn(Value) -> Result<Value, CodecError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, decode: D, encode: E) -> Self {
        Self {
            name: name.into(),
            decode,
            encode,
        }
    }
}

impl<D, E> Codec for FnCodec<D, E>
where
    D: Fn(Value) -> Result<Value, CodecError> + Send + Sync,
    E: Fn(Value) -> Result<Value, CodecError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, value: Value) -> Result<Value, CodecError> {
        (self.decode)(value)
    }

    fn encode(&self, value: Value) -> Result<Value, CodecError> {
        (self.encode)(value)
    }
}
