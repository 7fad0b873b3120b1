//! # End-to-End Value Engine Scenarios
//!
//! Worked examples exercising several operations against one bound scope,
//! the way a caller would use the engine.

use serde_json::json;
use tyval_core::{DefaultedPropertyPolicy, EngineConfig};
use tyval_value::{diff, patch, CreateError, Schema, Scope, Value, ViolationKind};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// Route engine traces to the test harness output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("tyval_value=trace"))
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Scenario 1: defaulted property
// ---------------------------------------------------------------------------

fn point() -> Schema {
    Schema::object([
        ("x", Schema::number()),
        ("y", Schema::string().with_default("hi")),
    ])
}

#[test]
fn test_create_uses_declared_default() {
    let scope = Scope::new(&point()).unwrap();
    assert_eq!(scope.create().unwrap(), v(json!({"x": 0, "y": "hi"})));
}

#[test]
fn test_defaulted_property_is_required_by_default() {
    let scope = Scope::new(&point()).unwrap();
    assert!(!scope.check(&v(json!({"x": 1}))));
    let first = scope.errors(&v(json!({"x": 1}))).first().unwrap();
    assert_eq!(first.kind, ViolationKind::ObjectRequiredProperty);
    assert_eq!(first.path, "/y");
}

#[test]
fn test_defaulted_property_optional_policy() {
    let config = EngineConfig {
        defaulted_properties: DefaultedPropertyPolicy::Optional,
        ..EngineConfig::default()
    };
    let scope = Scope::builder(&point()).config(config).build().unwrap();
    assert!(scope.check(&v(json!({"x": 1}))));
}

#[test]
fn test_apply_defaults_then_check() {
    let scope = Scope::new(&point()).unwrap();
    let filled = scope.apply_defaults(&v(json!({"x": 1})));
    assert!(scope.check(&filled));
}

// ---------------------------------------------------------------------------
// Scenario 2: element-wise conversion
// ---------------------------------------------------------------------------

#[test]
fn test_convert_array_of_numbers() {
    let scope = Scope::new(&Schema::array(Schema::number())).unwrap();
    assert_eq!(scope.convert(&v(json!(["1", "2", "abc"]))), v(json!([1, 2, "abc"])));
}

// ---------------------------------------------------------------------------
// Scenario 3: union failure reported at the root
// ---------------------------------------------------------------------------

#[test]
fn test_union_of_literals_fails_at_root() {
    let scope = Scope::new(&Schema::union([Schema::literal("A"), Schema::literal("B")])).unwrap();
    assert!(!scope.check(&Value::from("C")));
    let first = scope.errors(&Value::from("C")).first().unwrap();
    assert_eq!(first.path, "");
    assert_eq!(first.kind, ViolationKind::Union);
}

// ---------------------------------------------------------------------------
// Scenario 4: cleaning through a reference chain
// ---------------------------------------------------------------------------

#[test]
fn test_clean_through_cyclic_reference() {
    let schema = Schema::cyclic(
        [
            ("A", Schema::object([("x", Schema::number()), ("y", Schema::number())])),
            ("B", Schema::reference("A")),
        ],
        "B",
    );
    let scope = Scope::new(&schema).unwrap();
    assert_eq!(scope.clean(&v(json!({"x": 1, "y": 2, "z": 3}))), v(json!({"x": 1, "y": 2})));
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

#[test]
fn test_union_create_takes_first_variant() {
    let scope = Scope::new(&Schema::union([Schema::string(), Schema::number()])).unwrap();
    assert_eq!(scope.create().unwrap(), Value::from(""));
}

#[test]
fn test_create_on_unguarded_cycle_fails() {
    init_tracing();
    let node = Schema::recursive(Schema::object([("next", Schema::this())]));
    let scope = Scope::new(&node).unwrap();
    assert!(matches!(scope.create(), Err(CreateError::Cyclic { .. })));
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

#[test]
fn test_repair_then_diff_reports_the_fixes() {
    let schema = Schema::object([
        ("name", Schema::string()),
        ("port", Schema::integer()),
        ("tags", Schema::array(Schema::string())),
    ]);
    let scope = Scope::new(&schema).unwrap();
    let input = v(json!({"name": "api", "port": "8080"}));
    let repaired = scope.repair(&input).unwrap();
    assert_eq!(repaired, v(json!({"name": "api", "port": 8080, "tags": []})));
    assert!(scope.check(&repaired));
    let edits = diff(&input, &repaired);
    assert_eq!(edits.len(), 2);
    assert_eq!(patch(&input, &edits).unwrap(), repaired);
}

#[test]
fn test_parse_rejects_after_best_effort_fixes() {
    let scope = Scope::new(&Schema::object([("n", Schema::number())])).unwrap();
    let err = scope.parse(&v(json!({"n": "not a number"}))).unwrap_err();
    assert!(err.to_string().contains("/n"), "unexpected message: {err}");
}
