//! JSON pointers (RFC 6901) over [`Value`] trees.
//!
//! Violation paths and diff/patch edit paths are pointers. The empty string
//! addresses the root; `~` and `/` inside a token are written `~0` and `~1`.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::error::PointerError;
use crate::value::Value;

/// Escape a single reference token.
pub fn escape(token: &str) -> Cow<'_, str> {
    if token.contains(['~', '/']) {
        Cow::Owned(token.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(token)
    }
}

/// Append one token to a pointer.
pub fn push(base: &str, token: &str) -> String {
    let mut out = String::with_capacity(base.len() + token.len() + 1);
    out.push_str(base);
    out.push('/');
    out.push_str(&escape(token));
    out
}

/// Build a pointer from unescaped tokens.
pub fn join<I, T>(tokens: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    tokens.into_iter().fold(String::new(), |acc, t| push(&acc, t.as_ref()))
}

/// Split a pointer into unescaped tokens.
pub fn parse(pointer: &str) -> Result<Vec<String>, PointerError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(PointerError {
            pointer: pointer.to_string(),
            reason: "must be empty or start with '/'".into(),
        });
    };
    rest.split('/').map(|token| unescape(pointer, token)).collect()
}

fn unescape(pointer: &str, token: &str) -> Result<String, PointerError> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(PointerError {
                    pointer: pointer.to_string(),
                    reason: "'~' must be followed by '0' or '1'".into(),
                })
            }
        }
    }
    Ok(out)
}

/// Parse an array index token: `0` or a digit string without leading zeros.
pub fn parse_index(token: &str) -> Option<usize> {
    let canonical = token == "0" || (!token.starts_with('0') && !token.is_empty());
    if canonical && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

/// Look up the value a pointer addresses.
pub fn get<'v>(value: &'v Value, pointer: &str) -> Option<&'v Value> {
    let tokens = parse(pointer).ok()?;
    tokens.iter().try_fold(value, |current, token| match current {
        Value::Object(map) => map.get(token.as_str()),
        Value::Array(items) => parse_index(token).and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Mutable variant of [`get`].
pub fn get_mut<'v>(value: &'v mut Value, pointer: &str) -> Option<&'v mut Value> {
    let tokens = parse(pointer).ok()?;
    tokens.iter().try_fold(value, |current, token| match current {
        Value::Object(map) => map.get_mut(token.as_str()),
        Value::Array(items) => parse_index(token).and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

/// One step of a location inside a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// A location stack threaded through recursive walks.
///
/// Pushing and popping borrows keys and never allocates once warmed up;
/// the pointer string is only rendered when a violation is reported.
#[derive(Debug, Clone, Default)]
pub struct Trail<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Trail<'a> {
    pub fn new() -> Self {
        Self {
            segments: Vec::with_capacity(16),
        }
    }

    pub fn push_key(&mut self, key: &'a str) {
        self.segments.push(Segment::Key(key));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render as a JSON pointer.
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Key(key) => out.push_str(&escape(key)),
                Segment::Index(index) => {
                    let _ = write!(out, "{index}");
                }
            }
        }
        out
    }
}
