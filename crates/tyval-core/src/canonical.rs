//! # Canonical Bytes — Order-Independent Value Encoding
//!
//! `CanonicalBytes` is the sole input to structural hashing. Two values
//! produce the same bytes iff they are deep-equal, regardless of the order
//! object keys were inserted in.
//!
//! ## Encoding
//!
//! Every node is a one-byte type tag followed by its payload:
//!
//! | Tag | Type | Payload |
//! |---|---|---|
//! | `u` | undefined | none |
//! | `n` | null | none |
//! | `b` | boolean | `0x00` / `0x01` |
//! | `f` | number | IEEE-754 bits, big-endian; `-0.0` as `0.0`, every NaN as one NaN |
//! | `i` | bigint | 16 bytes, big-endian two's complement |
//! | `s` | string | u64 byte length, UTF-8 bytes |
//! | `y` | symbol | 16-byte id |
//! | `x` | bytes | u64 length, raw bytes |
//! | `a` | array | u64 count, items |
//! | `o` | object | u64 count, entries sorted by key: (key as `s` payload, value) |
//!
//! Length prefixes make the encoding prefix-free, so concatenations cannot
//! collide.

use crate::value::Value;

/// Bytes produced exclusively by canonical value encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Encode a value canonically. This is the only constructor.
    pub fn new(value: &Value) -> Self {
        let mut out = Vec::with_capacity(64);
        encode(value, &mut out);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn encode_len(len: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&(len as u64).to_be_bytes());
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    encode_len(s.len(), out);
    out.extend_from_slice(s.as_bytes());
}

fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Undefined => out.push(b'u'),
        Value::Null => out.push(b'n'),
        Value::Bool(b) => {
            out.push(b'b');
            out.push(u8::from(*b));
        }
        Value::Number(n) => {
            out.push(b'f');
            let normalized = if *n == 0.0 {
                0.0
            } else if n.is_nan() {
                f64::NAN
            } else {
                *n
            };
            out.extend_from_slice(&normalized.to_bits().to_be_bytes());
        }
        Value::BigInt(i) => {
            out.push(b'i');
            out.extend_from_slice(&i.to_be_bytes());
        }
        Value::String(s) => {
            out.push(b's');
            encode_str(s, out);
        }
        Value::Symbol(sym) => {
            out.push(b'y');
            out.extend_from_slice(sym.id().as_bytes());
        }
        Value::Bytes(bytes) => {
            out.push(b'x');
            encode_len(bytes.len(), out);
            out.extend_from_slice(bytes);
        }
        Value::Array(items) => {
            out.push(b'a');
            encode_len(items.len(), out);
            for item in items {
                encode(item, out);
            }
        }
        Value::Object(map) => {
            out.push(b'o');
            encode_len(map.len(), out);
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                encode_str(key, out);
                encode(item, out);
            }
        }
    }
}
