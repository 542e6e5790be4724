use pretty_assertions::assert_eq;

use crate::{
    ast::InputValue,
    executor::execute,
    schema::{
        meta::{Field, ObjectMeta},
        model::Schema,
    },
    value::{Value, Variables},
};

use super::{directive, field, fragment, fragment_spread_with, named, returns, NULL_ROOT};

fn schema() -> Schema {
    Schema::builder()
        .query(ObjectMeta::new(
            "Query",
            vec![
                Field::new("a", named("Int")).resolve_with(returns(Value::scalar(1))),
                Field::new("b", named("Int")).resolve_with(returns(Value::scalar(2))),
            ],
        ))
        .build()
        .unwrap()
}

fn run(document: &crate::ast::Document, variables: &Variables) -> String {
    let schema = schema();
    let result = execute(&schema, document, None, variables, &NULL_ROOT).unwrap();
    assert!(result.errors().is_empty());
    serde_json::to_string(&result).unwrap()
}

#[test]
fn skip_true_omits_the_field() {
    let document = super::query(vec![
        field("a").build(),
        field("b")
            .directive(directive("skip", InputValue::scalar(true)))
            .build(),
    ]);
    assert_eq!(run(&document, &Variables::new()), r#"{"data":{"a":1}}"#);
}

#[test]
fn skip_false_keeps_the_field() {
    let document = super::query(vec![
        field("a").build(),
        field("b")
            .directive(directive("skip", InputValue::scalar(false)))
            .build(),
    ]);
    assert_eq!(run(&document, &Variables::new()), r#"{"data":{"a":1,"b":2}}"#);
}

#[test]
fn include_false_omits_the_field() {
    let document = super::query(vec![
        field("a").build(),
        field("b")
            .directive(directive("include", InputValue::scalar(false)))
            .build(),
    ]);
    assert_eq!(run(&document, &Variables::new()), r#"{"data":{"a":1}}"#);
}

#[test]
fn with_both_directives_skip_wins() {
    // Included iff skip = false and include = true.
    let cases = [
        (false, true, r#"{"data":{"a":1,"b":2}}"#),
        (false, false, r#"{"data":{"a":1}}"#),
        (true, true, r#"{"data":{"a":1}}"#),
        (true, false, r#"{"data":{"a":1}}"#),
    ];

    for (skip, include, expected) in cases {
        let document = super::query(vec![
            field("a").build(),
            field("b")
                .directive(directive("skip", InputValue::scalar(skip)))
                .directive(directive("include", InputValue::scalar(include)))
                .build(),
        ]);
        assert_eq!(run(&document, &Variables::new()), expected);
    }
}

#[test]
fn directive_arguments_come_from_variables() {
    let document = super::query(vec![
        field("a").build(),
        field("b")
            .directive(directive("skip", InputValue::variable("no")))
            .build(),
    ]);

    let mut variables = Variables::new();
    variables.insert("no".into(), Value::scalar(true));
    assert_eq!(run(&document, &variables), r#"{"data":{"a":1}}"#);

    let mut variables = Variables::new();
    variables.insert("no".into(), Value::scalar(false));
    assert_eq!(run(&document, &variables), r#"{"data":{"a":1,"b":2}}"#);
}

#[test]
fn directives_apply_to_fragment_spreads() {
    let mut document = super::query(vec![
        field("a").build(),
        fragment_spread_with("rest", vec![directive("skip", InputValue::scalar(true))]),
    ]);
    document.push(fragment("rest", "Query", vec![field("b").build()]));

    assert_eq!(run(&document, &Variables::new()), r#"{"data":{"a":1}}"#);
}

#[test]
fn missing_directive_condition_fails_collection() {
    let document = super::query(vec![
        field("a")
            .directive(directive("skip", InputValue::variable("missing")))
            .build(),
    ]);

    let err = execute(
        &schema(),
        &document,
        None,
        &Variables::new(),
        &NULL_ROOT,
    )
    .unwrap_err();
    assert!(err
        .message()
        .contains("Argument \"if\" of required type \"Boolean!\" was not provided"));
}
