//! # Registries
//!
//! Explicitly scoped lookup tables for the two extension points:
//!
//! - [`FormatRegistry`]: string `format` name → predicate over the string.
//! - [`KindRegistry`]: custom kind name → predicate over (schema, value).
//!
//! A [`Registry`] bundles both and is passed to every scope and compiler
//! that needs it, so test or plugin code can install entries without
//! affecting unrelated call sites. Mutation takes `&mut self`; sharing a
//! registry across threads therefore needs external synchronization, while
//! lookups through a shared reference are free.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::format;
use crate::schema::Schema;
use crate::value::Value;

/// A string format predicate.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A custom kind predicate, handed the custom schema node and the value.
pub type KindPredicate = Arc<dyn Fn(&Schema, &Value) -> bool + Send + Sync>;

static SHARED_DEFAULT: Lazy<Registry> = Lazy::new(Registry::new);

/// Format name → predicate. A fresh registry holds the built-in formats.
#[derive(Clone)]
pub struct FormatRegistry {
    entries: BTreeMap<String, FormatPredicate>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.install_builtins();
        registry
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with no formats at all.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    fn install_builtins(&mut self) {
        for name in format::BUILTIN_FORMATS {
            if let Some(f) = format::builtin(name) {
                self.entries.insert((*name).to_string(), Arc::new(f));
            }
        }
    }

    /// Install or replace a format.
    pub fn set<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(format = %name, "registering string format");
        self.entries.insert(name, Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<&FormatPredicate> {
        self.entries.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove a format. Returns whether it was present.
    pub fn delete(&mut self, name: &str) -> bool {
        tracing::debug!(format = %name, "removing string format");
        self.entries.remove(name).is_some()
    }

    /// Remove every format, built-ins included.
    pub fn clear(&mut self) {
        tracing::debug!("clearing format registry");
        self.entries.clear();
    }

    /// Restore exactly the built-in formats.
    pub fn reset(&mut self) {
        tracing::debug!("resetting format registry to built-ins");
        self.entries.clear();
        self.install_builtins();
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Custom kind name → predicate. A fresh registry is empty.
#[derive(Clone, Default)]
pub struct KindRegistry {
    entries: BTreeMap<String, KindPredicate>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Schema, &Value) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(kind = %name, "registering custom kind");
        self.entries.insert(name, Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<&KindPredicate> {
        self.entries.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn delete(&mut self, name: &str) -> bool {
        tracing::debug!(kind = %name, "removing custom kind");
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        tracing::debug!("clearing kind registry");
        self.entries.clear();
    }

    /// Kinds have no built-ins, so reset is clear.
    pub fn reset(&mut self) {
        self.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Both registries, threaded explicitly through engine and compiler.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub formats: FormatRegistry,
    pub kinds: KindRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A process-wide immutable registry holding only the built-ins.
    pub fn shared_default() -> &'static Registry {
        &SHARED_DEFAULT
    }

    /// Builder-style format installation.
    pub fn with_format<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.set(name, predicate);
        self
    }

    /// Builder-style kind installation.
    pub fn with_kind<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Schema, &Value) -> bool + Send + Sync + 'static,
    {
        self.kinds.set(name, predicate);
        self
    }
}
