//! # Compiler and Compiled Validators
//!
//! [`Compiler`] collects the collaborators a schema needs (external
//! references, registry, engine configuration) and turns a root schema into
//! a [`TypeCheck`]. The registry is only borrowed while compiling: format
//! and kind predicates are captured into the program, so later registry
//! changes never affect an existing validator.

use std::fmt;
use std::sync::Arc;

use tyval_core::graph;
use tyval_core::violation::assert_with;
use tyval_core::{AssertError, EngineConfig, References, Registry, Schema, Value, Violations};

use crate::error::CompileError;
use crate::program::Program;

/// Builder for [`TypeCheck`] validators.
#[derive(Default)]
pub struct Compiler {
    references: References,
    registry: Option<Registry>,
    config: EngineConfig,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Named schemas that `Ref` nodes may resolve to when no enclosing
    /// cyclic table defines the name.
    pub fn references(mut self, references: References) -> Self {
        self.references = references;
        self
    }

    /// Formats and custom kinds. Defaults to the built-in formats.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze the graph rooted at `schema` and emit its program.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] for unresolved references, unbound
    /// self-references, missing cyclic entries, unregistered custom kinds
    /// (under [`tyval_core::UnknownKindPolicy::Error`]), invalid patterns and
    /// reference cycles that never consume input.
    pub fn compile(&self, schema: &Schema) -> Result<TypeCheck, CompileError> {
        let registry = self.registry.as_ref().unwrap_or_else(|| Registry::shared_default());
        let analysis = graph::analyze(schema, &self.references, registry, &self.config)?;
        let program = Program::emit(schema, analysis, &self.references, registry, &self.config);
        tracing::debug!(
            root = schema.kind().name(),
            subroutines = program.subroutines.len(),
            ops = program.root.size() + program.subroutines.iter().map(|s| s.body.size()).sum::<usize>(),
            "compiled schema"
        );
        Ok(TypeCheck {
            schema: schema.clone(),
            program: Arc::new(program),
        })
    }
}

/// A compiled validator.
///
/// Cheap to clone, `Send`, `Sync` and `'static`. Reports exactly the
/// violations the value engine reports for the same schema, references,
/// registry and configuration.
#[derive(Clone)]
pub struct TypeCheck {
    schema: Schema,
    program: Arc<Program>,
}

impl fmt::Debug for TypeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCheck")
            .field("root", &self.schema.kind().name())
            .field("subroutines", &self.program.subroutines.len())
            .finish()
    }
}

impl TypeCheck {
    /// The schema this validator was compiled from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of emitted definition sub-routines.
    pub fn definitions(&self) -> usize {
        self.program.subroutines.len()
    }

    /// Names of the emitted sub-routines, in emission order.
    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.program.subroutines.iter().map(|s| s.name.as_str())
    }

    pub fn check(&self, value: &Value) -> bool {
        self.program.check(value)
    }

    /// Lazily enumerated violations of `value`.
    pub fn errors(&self, value: &Value) -> Violations {
        Violations::new(self.program.clone(), value.clone())
    }

    /// Fail with the first violation, if any.
    pub fn assert(&self, value: &Value) -> Result<(), AssertError> {
        assert_with(self.program.clone(), value)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.program.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tyval_core::schema::{Additional, ArraySchema, Kind, ObjectSchema, RecordKey, StringSchema};
    use tyval_core::{ConfigurationError, DefaultedPropertyPolicy, UnknownKindPolicy, ViolationKind};

    fn compile(schema: &Schema) -> TypeCheck {
        Compiler::new().compile(schema).unwrap()
    }

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn kinds_and_paths(check: &TypeCheck, value: &Value) -> Vec<(ViolationKind, String)> {
        check.errors(value).to_vec().into_iter().map(|v| (v.kind, v.path)).collect()
    }

    #[test]
    fn test_check_object() {
        let check = compile(&Schema::object([("x", Schema::number()), ("y", Schema::string())]));
        assert!(check.check(&v(json!({"x": 1, "y": "a"}))));
        assert!(!check.check(&v(json!({"x": 1}))));
        assert!(!check.check(&v(json!([]))));
    }

    #[test]
    fn test_errors_report_paths() {
        let check = compile(&Schema::object([
            ("x", Schema::number()),
            ("tags", Schema::array(Schema::string())),
        ]));
        assert_eq!(
            kinds_and_paths(&check, &v(json!({"tags": ["a", 1, "c", false]}))),
            vec![
                (ViolationKind::ObjectRequiredProperty, "/x".to_string()),
                (ViolationKind::String, "/tags/1".to_string()),
                (ViolationKind::String, "/tags/3".to_string()),
            ]
        );
    }

    #[test]
    fn test_union_failure_at_root() {
        let check = compile(&Schema::union([Schema::literal("A"), Schema::literal("B")]));
        let first = check.errors(&Value::from("C")).first().unwrap();
        assert_eq!(first.kind, ViolationKind::Union);
        assert_eq!(first.path, "");
    }

    #[test]
    fn test_recursive_schema_compiles_to_one_subroutine() {
        let tree = Schema::recursive(Schema::object([
            ("id", Schema::number()),
            ("children", Schema::array(Schema::this())),
        ]));
        let check = compile(&tree);
        assert_eq!(check.definitions(), 1);
        assert!(check.check(&v(json!({"id": 1, "children": [{"id": 2, "children": []}]}))));
        assert_eq!(
            kinds_and_paths(&check, &v(json!({"id": 1, "children": [{"id": "x", "children": []}]}))),
            vec![(ViolationKind::Number, "/children/0/id".to_string())]
        );
    }

    #[test]
    fn test_external_references() {
        let mut references = References::new();
        references.insert("Port", Schema::integer());
        let check = Compiler::new()
            .references(references)
            .compile(&Schema::array(Schema::reference("Port")))
            .unwrap();
        assert!(check.check(&v(json!([80, 443]))));
        assert!(!check.check(&v(json!([80.5]))));
        assert_eq!(check.definition_names().collect::<Vec<_>>(), vec!["Port"]);
    }

    #[test]
    fn test_unresolved_reference_fails_compilation() {
        let err = Compiler::new()
            .compile(&Schema::object([("a", Schema::reference("Missing"))]))
            .unwrap_err();
        assert!(matches!(err.source, ConfigurationError::UnresolvedReference { ref name, .. } if name == "Missing"));
        assert_eq!(err.path, "/properties/a");
    }

    #[test]
    fn test_unregistered_custom_kind_fails_compilation() {
        let err = Compiler::new().compile(&Schema::custom("Even", Default::default())).unwrap_err();
        assert!(matches!(err.source, ConfigurationError::UnknownKind { .. }));
    }

    #[test]
    fn test_registry_predicates_are_captured() {
        let registry = Registry::new().with_kind("Even", |_, value| {
            value.as_f64().is_some_and(|n| n % 2.0 == 0.0)
        });
        let check = Compiler::new().registry(registry).compile(&Schema::custom("Even", Default::default())).unwrap();
        assert!(check.check(&Value::from(4.0)));
        let first = check.errors(&Value::from(3.0)).first().unwrap();
        assert_eq!(first.kind, ViolationKind::Kind);
    }

    #[test]
    fn test_reject_policy_for_unknown_kinds() {
        let config = EngineConfig {
            unknown_kinds: UnknownKindPolicy::Reject,
            ..EngineConfig::default()
        };
        let check = Compiler::new().config(config).compile(&Schema::custom("Opaque", Default::default())).unwrap();
        assert!(!check.check(&Value::Null));
    }

    #[test]
    fn test_defaulted_property_policy() {
        let schema = Schema::object([("y", Schema::string().with_default("hi"))]);
        assert!(!compile(&schema).check(&v(json!({}))));
        let config = EngineConfig {
            defaulted_properties: DefaultedPropertyPolicy::Optional,
            ..EngineConfig::default()
        };
        assert!(Compiler::new().config(config).compile(&schema).unwrap().check(&v(json!({}))));
    }

    #[test]
    fn test_patterns_and_formats() {
        let schema = Schema::new(Kind::String(StringSchema {
            pattern: Some("^[a-z]+$".into()),
            format: Some("email".into()),
            ..Default::default()
        }));
        let check = compile(&schema);
        assert_eq!(
            check.errors(&Value::from("Bad")).to_vec().iter().map(|v| v.kind).collect::<Vec<_>>(),
            vec![ViolationKind::StringPattern, ViolationKind::StringFormat]
        );
    }

    #[test]
    fn test_record_and_additional_properties() {
        let record = Schema::new(Kind::Record(tyval_core::schema::RecordSchema {
            additional: Additional::Deny,
            ..tyval_core::schema::RecordSchema::new(RecordKey::Integer, Schema::boolean())
        }));
        let check = compile(&record);
        assert!(check.check(&v(json!({"0": true, "12": false}))));
        assert_eq!(
            kinds_and_paths(&check, &v(json!({"1": true, "x": false}))),
            vec![(ViolationKind::ObjectAdditionalProperties, "/x".to_string())]
        );

        let closed = Schema::new(Kind::Object(
            ObjectSchema::new([("a", Schema::null())]).with_additional(Additional::Deny),
        ));
        assert_eq!(
            kinds_and_paths(&compile(&closed), &v(json!({"a": null, "b/c": 1}))),
            vec![(ViolationKind::ObjectAdditionalProperties, "/b~1c".to_string())]
        );
    }

    #[test]
    fn test_intersection_unevaluated_keys() {
        let schema = Schema::intersect_with(
            [Schema::object([("a", Schema::number())]), Schema::object([("b", Schema::number())])],
            Additional::Deny,
        );
        let check = compile(&schema);
        assert!(check.check(&v(json!({"a": 1, "b": 2}))));
        assert_eq!(
            kinds_and_paths(&check, &v(json!({"a": 1, "b": 2, "c": 3}))),
            vec![(ViolationKind::IntersectUnevaluatedProperties, "/c".to_string())]
        );
    }

    #[test]
    fn test_array_contains_bounds() {
        let schema = Schema::new(Kind::Array(ArraySchema {
            contains: Some(Schema::literal(1i64)),
            min_contains: Some(2),
            unique_items: true,
            ..ArraySchema::new(Schema::number())
        }));
        let check = compile(&schema);
        assert!(!check.check(&v(json!([1, 2]))));
        assert_eq!(
            check.errors(&v(json!([1, 1]))).to_vec().iter().map(|v| v.kind).collect::<Vec<_>>(),
            vec![ViolationKind::ArrayUniqueItems]
        );
    }

    #[test]
    fn test_assert_reports_first_violation() {
        let check = compile(&Schema::tuple([Schema::string(), Schema::number()]));
        let err = check.assert(&v(json!(["a", "b"]))).unwrap_err();
        assert_eq!(err.first().path, "/1");
        assert_eq!(err.violations().count(), 1);
    }

    #[test]
    fn test_errors_outlive_validator() {
        let errors = {
            let check = compile(&Schema::string());
            check.errors(&Value::Null)
        };
        assert_eq!(errors.count(), 1);
    }

    #[test]
    fn test_type_check_is_send_sync_static() {
        fn assert_bounds<T: Send + Sync + 'static>() {}
        assert_bounds::<TypeCheck>();
    }
}
