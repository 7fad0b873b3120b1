//! External reference set: named definitions supplied alongside a root
//! schema rather than embedded in it.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::Schema;
use crate::error::ConfigurationError;

static EMPTY: Lazy<References> = Lazy::new(References::new);

/// Named schemas resolvable by `Ref` nodes after every enclosing
/// definition table has been searched.
#[derive(Debug, Clone, Default)]
pub struct References {
    schemas: IndexMap<String, Schema>,
}

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared empty set for call sites without external references.
    pub fn empty() -> &'static References {
        &EMPTY
    }

    /// Build a set from a list of schemas, keying each by its `$id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingId`] for the first schema
    /// without an `$id`.
    pub fn from_list<I>(schemas: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = Schema>,
    {
        let mut out = Self::new();
        for (position, schema) in schemas.into_iter().enumerate() {
            let id = schema
                .meta()
                .id
                .clone()
                .ok_or(ConfigurationError::MissingId { position })?;
            out.schemas.insert(id, schema);
        }
        Ok(out)
    }

    /// Insert or replace a named definition.
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) -> Option<Schema> {
        self.schemas.insert(name.into(), schema)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.insert(name, schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Access the underlying map; definition lookups borrow from it.
    pub fn as_map(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
