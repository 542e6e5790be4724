use pretty_assertions::assert_eq;

use crate::{
    ast::{InputValue, OperationType},
    error::ErrorKind,
    executor::{execute, FieldResult, ResolveInfo},
    schema::{
        meta::{Argument, Field, InputObjectMeta, ObjectMeta},
        model::Schema,
    },
    value::{ScalarValue, Value, Variables},
};

use super::{field, named, non_null, operation_with_variables, query, NULL_ROOT};

fn pic_schema() -> Schema {
    Schema::builder()
        .query(ObjectMeta::new(
            "Query",
            vec![Field::new("pic", named("String"))
                .argument(Argument::new("size", named("Int")))
                .resolve_with(|_: &Value, info: &ResolveInfo<'_, '_>| -> FieldResult {
                    let size = info
                        .argument("size")
                        .and_then(Value::as_scalar)
                        .and_then(ScalarValue::as_int)
                        .unwrap_or(50);
                    Ok(Value::scalar(format!("Pic of size: {size}")))
                })],
        ))
        .build()
        .unwrap()
}

fn user_schema() -> Schema {
    Schema::builder()
        .register(
            InputObjectMeta::new(
                "User",
                vec![
                    Argument::new("name", non_null("String")),
                    Argument::new("age", named("Int")).default_value(Value::scalar(18)),
                ],
            )
            .into_meta(),
        )
        .query(ObjectMeta::new(
            "Query",
            vec![Field::new("greet", named("String"))
                .argument(Argument::new("user", non_null("User")))
                .resolve_with(|_: &Value, info: &ResolveInfo<'_, '_>| -> FieldResult {
                    let user = info.argument("user").and_then(Value::as_object_value);
                    let name = user
                        .and_then(|u| u.get_field_value("name"))
                        .and_then(Value::as_string_value)
                        .unwrap_or("?");
                    let age = user
                        .and_then(|u| u.get_field_value("age"))
                        .and_then(Value::as_scalar)
                        .and_then(ScalarValue::as_int)
                        .unwrap_or(-1);
                    Ok(Value::scalar(format!("{name}:{age}")))
                })],
        ))
        .build()
        .unwrap()
}

#[test]
fn variable_default_applies_when_not_provided() {
    let schema = pic_schema();
    let document = vec![operation_with_variables(
        OperationType::Query,
        vec![("size", named("Int"), Some(InputValue::scalar(100)))],
        vec![field("pic")
            .argument("size", InputValue::variable("size"))
            .build()],
    )];

    let result = execute(&schema, &document, None, &Variables::new(), &NULL_ROOT).unwrap();
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"pic":"Pic of size: 100"}}"#,
    );

    let mut variables = Variables::new();
    variables.insert("size".into(), Value::scalar(200));
    let result = execute(&schema, &document, None, &variables, &NULL_ROOT).unwrap();
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"pic":"Pic of size: 200"}}"#,
    );
}

#[test]
fn absent_nullable_argument_is_not_passed_to_the_resolver() {
    let schema = pic_schema();
    let document = query(vec![field("pic").build()]);

    let result = execute(&schema, &document, None, &Variables::new(), &NULL_ROOT).unwrap();
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"pic":"Pic of size: 50"}}"#,
    );
}

#[test]
fn input_object_literal_is_coerced_with_defaults() {
    let schema = user_schema();
    let document = query(vec![field("greet")
        .argument(
            "user",
            InputValue::object(vec![("name", InputValue::scalar("Al"))]),
        )
        .build()]);

    let result = execute(&schema, &document, None, &Variables::new(), &NULL_ROOT).unwrap();
    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"greet":"Al:18"}}"#,
    );
}

#[test]
fn input_object_from_variables_is_coerced() {
    let schema = user_schema();
    let document = query(vec![field("greet")
        .argument("user", InputValue::variable("u"))
        .build()]);

    let mut variables = Variables::new();
    variables.insert(
        "u".into(),
        Value::object(vec![
            ("name", Value::scalar("Bo")),
            ("age", Value::scalar(30)),
        ]),
    );

    let result = execute(&schema, &document, None, &variables, &NULL_ROOT).unwrap();
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"greet":"Bo:30"}}"#,
    );
}

#[test]
fn unknown_input_field_fails_the_request_with_a_suggestion() {
    let schema = user_schema();
    let document = query(vec![field("greet")
        .argument(
            "user",
            InputValue::object(vec![
                ("name", InputValue::scalar("Al")),
                ("agee", InputValue::scalar(30)),
            ]),
        )
        .build()]);

    let err = execute(&schema, &document, None, &Variables::new(), &NULL_ROOT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Coercion);
    assert_eq!(err.message(), "Invalid value for argument \"user\"");
    assert_eq!(
        err.cause().unwrap().message(),
        "Field \"agee\" is not defined by type User; did you mean \"age\"?"
    );
}

#[test]
fn missing_required_argument_fails_the_request() {
    let schema = user_schema();
    let document = query(vec![field("greet").build()]);

    let err = execute(&schema, &document, None, &Variables::new(), &NULL_ROOT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Coercion);
    assert_eq!(
        err.message(),
        "Argument \"user\" of required type \"User!\" was not provided"
    );
}
