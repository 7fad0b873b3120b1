//! # Scope — A Schema Bound For Evaluation
//!
//! A [`Scope`] pairs a root schema with its external references, a registry
//! and an [`EngineConfig`]. Construction runs the reachability analysis, so
//! every configuration failure (unresolved reference, unregistered custom
//! kind, bad pattern, unguarded cycle) surfaces once, up front, and every
//! later operation can follow references without failing.
//!
//! A scope is cheap to clone and `'static`: the lazy [`Violations`] returned
//! by [`Scope::errors`] keep the scope alive on their own.

use std::fmt;
use std::sync::Arc;

use tyval_core::graph::{self, Patterns};
use tyval_core::violation::{assert_with, Sink, ViolationWalk};
use tyval_core::{
    AssertError, ConfigurationError, CreateError, EngineConfig, ParseError, References, Registry,
    RepairError, Schema, TransformError, Value, Violations,
};

/// Everything an operation needs, shared by every clone of a [`Scope`].
pub(crate) struct Engine {
    pub(crate) root: Schema,
    pub(crate) references: References,
    pub(crate) registry: Registry,
    pub(crate) config: EngineConfig,
    pub(crate) patterns: Patterns,
    definitions: usize,
}

impl ViolationWalk for Engine {
    fn walk(&self, value: &Value, sink: &mut Sink<'_>) -> std::ops::ControlFlow<()> {
        self.violations(value, sink)
    }
}

/// A schema bound to its references, registry and configuration.
#[derive(Clone)]
pub struct Scope {
    engine: Arc<Engine>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("root", &self.engine.root.kind().name())
            .field("references", &self.engine.references.len())
            .field("definitions", &self.engine.definitions)
            .field("config", &self.engine.config)
            .finish()
    }
}

/// Builder for a [`Scope`] with non-default collaborators.
pub struct ScopeBuilder {
    schema: Schema,
    references: References,
    registry: Option<Registry>,
    config: EngineConfig,
}

impl ScopeBuilder {
    pub fn references(mut self, references: References) -> Self {
        self.references = references;
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze the schema graph and bind the scope.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found by the analysis.
    pub fn build(self) -> Result<Scope, ConfigurationError> {
        let registry = self
            .registry
            .unwrap_or_else(|| Registry::shared_default().clone());
        let analysis = graph::analyze(&self.schema, &self.references, &registry, &self.config)?;
        tracing::debug!(
            root = self.schema.kind().name(),
            definitions = analysis.definitions.len(),
            references = self.references.len(),
            "scope bound"
        );
        Ok(Scope {
            engine: Arc::new(Engine {
                root: self.schema,
                references: self.references,
                registry,
                config: self.config,
                patterns: analysis.patterns,
                definitions: analysis.definitions.len(),
            }),
        })
    }
}

impl Scope {
    /// Bind `schema` with no external references, the built-in registry and
    /// the default configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the schema graph cannot be
    /// evaluated.
    pub fn new(schema: &Schema) -> Result<Self, ConfigurationError> {
        Self::builder(schema).build()
    }

    pub fn builder(schema: &Schema) -> ScopeBuilder {
        ScopeBuilder {
            schema: schema.clone(),
            references: References::new(),
            registry: None,
            config: EngineConfig::default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.engine.root
    }

    pub fn references(&self) -> &References {
        &self.engine.references
    }

    pub fn registry(&self) -> &Registry {
        &self.engine.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.engine.config
    }

    /// Number of distinct definitions reachable from the root.
    pub fn definitions(&self) -> usize {
        self.engine.definitions
    }

    // ─── Validation ──────────────────────────────────────────────────

    /// Whether `value` satisfies the schema. Stops at the first failure.
    pub fn check(&self, value: &Value) -> bool {
        self.engine.check(value)
    }

    /// The lazy sequence of violations of `value`.
    ///
    /// Nothing is evaluated until the sequence is consumed, and
    /// [`Violations::first`] evaluates only up to the first failure.
    pub fn errors(&self, value: &Value) -> Violations {
        Violations::new(self.engine.clone(), value.clone())
    }

    /// Fail with the first violation of `value`, if any.
    pub fn assert(&self, value: &Value) -> Result<(), AssertError> {
        assert_with(self.engine.clone(), value)
    }

    // ─── Coercion and synthesis ──────────────────────────────────────

    /// Best-effort coercion toward the schema; unconvertible parts pass
    /// through unchanged.
    pub fn convert(&self, value: &Value) -> Value {
        self.engine.convert(value)
    }

    /// Synthesize a minimal value satisfying the schema.
    pub fn create(&self) -> Result<Value, CreateError> {
        self.engine.create()
    }

    /// Like [`create`](Self::create), with `default` taking precedence over
    /// the root schema's declared default.
    pub fn create_with(&self, default: Option<Value>) -> Result<Value, CreateError> {
        match default {
            Some(value) => Ok(value),
            None => self.engine.create(),
        }
    }

    /// Fill absent values and properties from declared defaults.
    pub fn apply_defaults(&self, value: &Value) -> Value {
        self.engine.apply_defaults(value)
    }

    /// Remove object keys and tuple entries the schema does not sanction.
    pub fn clean(&self, value: &Value) -> Value {
        self.engine.clean(value)
    }

    /// Keep `value` when its shape fits the schema at the top level,
    /// otherwise substitute a created value. Never fails; when nothing can
    /// be created the value is returned unchanged.
    #[doc(alias = "upcast")]
    pub fn cast(&self, value: &Value) -> Value {
        self.engine.cast(value)
    }

    /// Coerce `value` field by field, falling back to created values.
    pub fn repair(&self, value: &Value) -> Result<Value, RepairError> {
        self.engine.repair(value)
    }

    // ─── Codecs ──────────────────────────────────────────────────────

    /// Validate the encoded form, then apply every codec's decode function
    /// from the innermost outward.
    pub fn decode(&self, value: &Value) -> Result<Value, TransformError> {
        self.engine.decode(value)
    }

    /// Apply every codec's encode function from the outermost inward, then
    /// validate the encoded result.
    pub fn encode(&self, value: &Value) -> Result<Value, TransformError> {
        self.engine.encode(value)
    }

    /// Clean, apply defaults, convert, assert and decode, in that order.
    pub fn parse(&self, value: &Value) -> Result<Value, ParseError> {
        let cleaned = self.engine.clean(value);
        let defaulted = self.engine.apply_defaults(&cleaned);
        let converted = self.engine.convert(&defaulted);
        self.assert(&converted)?;
        Ok(self.engine.decode(&converted)?)
    }
}
