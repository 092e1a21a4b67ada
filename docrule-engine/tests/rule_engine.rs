use docrule_engine::{
    ActionError, RuleEngine, RuleEngineError, SetAction, YamlConverterProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use valu3::prelude::*;

const COUNTER: &str = r#"{
    "document": {"count": 0},
    "rules": [
        {"condition": "input.add === true", "body": "document.count = document.count + 1"}
    ]
}"#;

fn input(key: &str, value: Value) -> HashMap<String, Value> {
    let mut input = HashMap::new();
    input.insert(key.to_string(), value);
    input
}

fn field(engine: &RuleEngine, key: &str) -> Option<i64> {
    engine.document_value().get(key).and_then(|v| v.to_i64())
}

fn increment(document: &mut Value, _input: &Value) -> Result<(), ActionError> {
    let count = document
        .get("count")
        .and_then(|v| v.to_i64())
        .ok_or_else(|| ActionError::new("count is missing"))?;
    document.insert("count", Value::from(count + 1));
    Ok(())
}

#[test]
fn add_true_increments_count() {
    let mut engine = RuleEngine::from_json(COUNTER).unwrap();

    let output = engine.execute_rules(input("add", Value::from(true))).unwrap();

    let document = Value::json_to_value(&output).unwrap();
    assert_eq!(document.get("count").and_then(|v| v.to_i64()), Some(1));
    assert_eq!(engine.json_document(), output);
}

#[test]
fn add_false_leaves_count() {
    let mut engine = RuleEngine::from_json(COUNTER).unwrap();

    engine.execute_rules(input("add", Value::from(false))).unwrap();

    assert_eq!(field(&engine, "count"), Some(0));
}

#[test]
fn registered_action_runs_once_per_call() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"count": 0},
            "rules": [{"condition": "true", "executionActions": ["Inc"]}]
        }"#,
    )
    .unwrap();
    engine.register_action("Inc", Arc::new(increment));

    engine.execute_rules(HashMap::new()).unwrap();
    assert_eq!(field(&engine, "count"), Some(1));

    engine.execute_rules(HashMap::new()).unwrap();
    assert_eq!(field(&engine, "count"), Some(2));
}

#[test]
fn side_effects_follow_declaration_order() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"trail": []},
            "preExecution": ["document.trail.push('pre-1')", "document.trail.push('pre-2')"],
            "rules": [
                {"condition": "true", "body": "document.trail.push('rule-1')"},
                {"condition": "input.skip !== true", "body": ["document.trail.push('rule-2')"]},
                {"condition": "true", "body": "document.trail.push('rule-3')"}
            ],
            "postExecution": ["document.trail.push('post-1')"]
        }"#,
    )
    .unwrap();

    engine.execute_rules(HashMap::new()).unwrap();

    let trail: Vec<String> = match engine.document_value().get("trail") {
        Some(Value::Array(items)) => items.into_iter().map(|item| item.as_string()).collect(),
        other => panic!("unexpected trail: {:?}", other),
    };

    assert_eq!(trail, vec!["pre-1", "pre-2", "rule-1", "rule-2", "rule-3", "post-1"]);
}

#[test]
fn no_matching_rule_only_applies_pre_and_post() {
    let with_rules = r#"{
        "document": {"count": 0},
        "preExecution": ["document.pre = 1"],
        "rules": [
            {"condition": "input.add === true", "body": "document.count = 99"},
            {"condition": "input.missing", "body": "document.count = 98"}
        ],
        "postExecution": ["document.post = 2"]
    }"#;
    let without_rules = r#"{
        "document": {"count": 0},
        "preExecution": ["document.pre = 1"],
        "postExecution": ["document.post = 2"]
    }"#;

    let mut engine = RuleEngine::from_json(with_rules).unwrap();
    let mut baseline = RuleEngine::from_json(without_rules).unwrap();

    let output = engine.execute_rules(input("add", Value::from(false))).unwrap();
    let expected = baseline.execute_rules(input("add", Value::from(false))).unwrap();

    assert_eq!(output, expected);
}

#[test]
fn validation_failure_leaves_document_unchanged() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"count": 0},
            "rules": [{"condition": "true", "body": "document.count = input.age"}],
            "inputValidation": [
                {"name": "age", "type": "integer", "required": true, "min": 0},
                {"name": "name", "type": "string", "minLength": 2}
            ]
        }"#,
    )
    .unwrap();
    let before = engine.json_document().to_string();

    let mut parameters = HashMap::new();
    parameters.insert("name".to_string(), Value::from("A"));

    match engine.execute_rules(parameters) {
        Err(RuleEngineError::Validation(err)) => {
            assert_eq!(err.parameters(), vec!["age", "name"]);
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert_eq!(engine.json_document(), before);

    engine.execute_rules(input("age", Value::from(-1i64))).unwrap_err();
    assert_eq!(engine.json_document(), before);

    engine.execute_rules(input("age", Value::from(30i64))).unwrap();
    assert_eq!(field(&engine, "count"), Some(30));
}

#[test]
fn malformed_json_input_is_returned_unchanged() {
    let mut engine = RuleEngine::from_json(COUNTER).unwrap();
    let before = engine.json_document().to_string();

    let output = engine.execute_json_input("{ this is not json").unwrap();

    assert_eq!(output, "{ this is not json");
    assert_eq!(engine.json_document(), before);
}

#[test]
fn json_input_is_validated_and_executed() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"count": 0},
            "rules": [{"condition": "input.add === true", "body": "document.count += 1"}],
            "inputValidation": [{"name": "add", "type": "boolean", "required": true}]
        }"#,
    )
    .unwrap();

    assert!(matches!(
        engine.execute_json_input(r#"{"add": "yes"}"#),
        Err(RuleEngineError::Validation(_))
    ));

    engine.execute_json_input(r#"{"add": true}"#).unwrap();
    assert_eq!(field(&engine, "count"), Some(1));
}

#[test]
fn non_object_json_input_is_validated() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"count": 0},
            "rules": [{"condition": "true", "body": "document.count += 1"}],
            "inputValidation": [{"name": "add", "type": "boolean", "required": true}]
        }"#,
    )
    .unwrap();
    let before = engine.json_document().to_string();

    for payload in ["[]", "5", r#""x""#, "null"] {
        match engine.execute_json_input(payload) {
            Err(RuleEngineError::Validation(err)) => assert_eq!(err.parameters(), vec!["add"]),
            other => panic!("{} was not rejected: {:?}", payload, other),
        }
    }
    assert_eq!(engine.json_document(), before);

    let mut open = RuleEngine::from_json(
        r#"{"document": {"count": 0}, "rules": [{"condition": "true", "body": "document.count += 1"}]}"#,
    )
    .unwrap();
    open.execute_json_input("[1, 2]").unwrap();
    assert_eq!(field(&open, "count"), Some(1));
}

#[test]
fn host_functions_require_open_mode() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {},
            "rules": [{"condition": "true", "body": "document.home = env('HOME')"}]
        }"#,
    )
    .unwrap();

    assert!(engine.is_secure());
    assert!(matches!(
        engine.execute_rules(HashMap::new()),
        Err(RuleEngineError::Script(_))
    ));

    engine.disable_security();
    assert!(engine.execute_rules(HashMap::new()).is_ok());

    engine.enable_security();
    assert!(engine.execute_rules(HashMap::new()).is_err());
}

#[test]
fn compiled_script_is_deterministic() {
    let mut first = RuleEngine::from_json(COUNTER).unwrap();
    let mut second = RuleEngine::from_json(COUNTER).unwrap();

    first.register_action("Inc", Arc::new(increment));
    second.register_action("Inc", Arc::new(increment));

    assert_eq!(
        first.compiled_script().unwrap(),
        second.compiled_script().unwrap()
    );
}

#[test]
fn compiled_script_is_identical_across_engines() {
    const NESTED: &str = r#"{
        "document": {"zeta": 1, "alpha": 2, "mid": {"y": 1, "b": 2, "k": 3}, "q": 4, "c": 3, "e": 5},
        "rules": [{"condition": "input.add === true", "body": "document.q = document.q + 1"}]
    }"#;

    let scripts: Vec<String> = (0..8)
        .map(|_| {
            let mut engine = RuleEngine::from_json(NESTED).unwrap();
            engine.compiled_script().unwrap().to_string()
        })
        .collect();

    assert!(scripts.iter().all(|script| script == &scripts[0]));

    let outputs: Vec<String> = (0..8)
        .map(|_| {
            let mut engine = RuleEngine::from_json(NESTED).unwrap();
            engine.execute_rules(input("add", Value::from(true))).unwrap();
            engine.compiled_script().unwrap().to_string()
        })
        .collect();

    assert!(outputs.iter().all(|script| script == &outputs[0]));
}

#[test]
fn document_literal_keeps_large_integers() {
    let mut engine = RuleEngine::from_json(
        r#"{"document": {"id": 12345678901234567890, "exact": 9007199254740993}}"#,
    )
    .unwrap();

    assert!(engine
        .compiled_script()
        .unwrap()
        .contains("12345678901234567890"));

    let output = engine.execute_rules(HashMap::new()).unwrap();
    assert!(output.contains(r#""exact":9007199254740993"#));
}

#[test]
fn unregistered_action_fails_before_execution() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"count": 0},
            "rules": [{"name": "bump", "condition": "true", "executionActions": ["Missing"]}]
        }"#,
    )
    .unwrap();
    engine.enable_performance_monitoring();

    let err = engine.execute_rules(HashMap::new()).unwrap_err();

    assert!(matches!(err, RuleEngineError::Compile(_)));
    assert!(err.to_string().contains("rule[0] bump"));
    assert!(engine
        .performance_monitoring()
        .iter()
        .all(|marker| marker.label != "execution"));
}

#[test]
fn failing_action_surfaces_as_script_error() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {"total": 1},
            "rules": [{"condition": "true", "executionActions": ["Inc"]}]
        }"#,
    )
    .unwrap();
    engine.register_action("Inc", Arc::new(increment));
    let before = engine.json_document().to_string();

    let err = engine.execute_rules(HashMap::new()).unwrap_err();

    assert!(matches!(err, RuleEngineError::Script(_)));
    assert!(err.to_string().contains("count is missing"));
    assert_eq!(engine.json_document(), before);
}

#[test]
fn set_action_writes_nested_path() {
    let mut engine = RuleEngine::from_json(
        r#"{
            "document": {},
            "rules": [{"condition": "input.vip", "executionActions": ["Promote"]}]
        }"#,
    )
    .unwrap();
    engine.register_action(
        "Promote",
        Arc::new(SetAction::new("customer.tier", Value::from("gold"))),
    );

    engine.execute_rules(input("vip", Value::from(true))).unwrap();

    let tier = engine
        .document_value()
        .get("customer")
        .and_then(|customer| customer.get("tier"))
        .map(|tier| tier.as_string());
    assert_eq!(tier, Some("gold".to_string()));
}

#[test]
fn yaml_configuration() {
    let mut engine = RuleEngine::new();
    engine.set_converter_provider(Box::new(YamlConverterProvider));
    engine
        .set_json_configuration(
            r#"
document:
  count: 0
rules:
  - condition: input.add === true
    body: document.count = document.count + 1
"#,
        )
        .unwrap();

    engine.execute_rules(input("add", Value::from(true))).unwrap();

    assert_eq!(field(&engine, "count"), Some(1));
}

#[test]
fn performance_markers_accumulate_while_enabled() {
    let mut engine = RuleEngine::from_json(COUNTER).unwrap();

    engine.execute_rules(input("add", Value::from(true))).unwrap();
    assert!(engine.performance_monitoring().is_empty());

    engine.enable_performance_monitoring();
    engine.execute_rules(input("add", Value::from(true))).unwrap();

    let labels: Vec<&str> = engine
        .performance_monitoring()
        .iter()
        .map(|marker| marker.label.as_str())
        .collect();
    assert_eq!(labels.first(), Some(&"validation"));
    assert_eq!(labels.last(), Some(&"execution"));
    assert!(labels.contains(&"compilation"));

    let first_call = labels.len();
    engine.execute_rules(input("add", Value::from(true))).unwrap();
    assert!(engine.performance_monitoring().len() > first_call);

    engine.reset_performance_monitoring();
    assert!(engine.performance_monitoring().is_empty());

    engine.disable_performance_monitoring();
    engine.execute_rules(input("add", Value::from(true))).unwrap();
    assert!(engine.performance_monitoring().is_empty());
}

#[test]
fn membership_demo_decides_status() {
    let mut engine = RuleEngine::new();
    engine.set_converter_provider(Box::new(YamlConverterProvider));
    engine
        .set_json_configuration(include_str!("../../demos/membership.yaml"))
        .unwrap();

    let mut parameters = HashMap::new();
    parameters.insert("age".to_string(), "20".to_string());
    parameters.insert("income".to_string(), "6000".to_string());
    engine.execute_rules_with_string_input(parameters).unwrap();

    let status = engine.document_value().get("status").map(|v| v.as_string());
    assert_eq!(status, Some("approved".to_string()));

    let mut engine = RuleEngine::new();
    engine.set_converter_provider(Box::new(YamlConverterProvider));
    engine
        .set_json_configuration(include_str!("../../demos/membership.yaml"))
        .unwrap();

    let mut parameters = HashMap::new();
    parameters.insert("age".to_string(), "16".to_string());
    parameters.insert("income".to_string(), "0".to_string());
    engine.execute_rules_with_string_input(parameters).unwrap();

    let status = engine.document_value().get("status").map(|v| v.as_string());
    assert_eq!(status, Some("rejected".to_string()));

    let mut parameters = HashMap::new();
    parameters.insert("age".to_string(), "200".to_string());
    parameters.insert("income".to_string(), "0".to_string());
    assert!(matches!(
        engine.execute_rules_with_string_input(parameters),
        Err(RuleEngineError::Validation(_))
    ));
}
