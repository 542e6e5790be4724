use pretty_assertions::assert_eq;

use std::sync::{Arc, Mutex};

use crate::{
    ast::OperationType,
    error::ErrorKind,
    executor::{execute, execute_with, CancellationToken, ExecutionStrategy, FieldResult, ResolveInfo},
    schema::{
        meta::{Field, ObjectMeta},
        model::Schema,
    },
    value::{Value, Variables},
};

use super::{
    failing_scenario_schema, field, fragment, fragment_spread, inline_fragment, named, non_null,
    non_null_list_of, operation, query, returns, NULL_ROOT,
};

/// The schema from the end-to-end scenarios:
/// `type Query { a: Int!, b: String, list: [Int!]!, obj: Obj }` and
/// `type Obj { x: Int, y: Int! }`. Resolvers for `a`, `b`, `list` and `obj`
/// return the given values; `Obj` fields read properties of the object value.
fn scenario_schema(a: Value, b: Value, list: Value, obj: Value) -> Schema {
    Schema::builder()
        .register(
            ObjectMeta::new(
                "Obj",
                vec![
                    Field::new("x", named("Int")),
                    Field::new("y", non_null("Int")),
                ],
            )
            .into_meta(),
        )
        .query(ObjectMeta::new(
            "Query",
            vec![
                Field::new("a", non_null("Int")).resolve_with(returns(a)),
                Field::new("b", named("String")).resolve_with(returns(b)),
                Field::new("list", non_null_list_of(non_null("Int"))).resolve_with(returns(list)),
                Field::new("obj", named("Obj")).resolve_with(returns(obj)),
            ],
        ))
        .build()
        .unwrap()
}

fn no_vars() -> Variables {
    Variables::new()
}

#[test]
fn resolves_scalar_fields() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::scalar("hi"),
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![field("a").build(), field("b").build()]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"a":1,"b":"hi"}}"#,
    );
}

#[test]
fn non_null_field_returning_null_nulls_data() {
    let schema = scenario_schema(
        Value::Null,
        Value::scalar("hi"),
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![field("a").at(1, 2).build(), field("b").build()]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert_eq!(result.data_to_value(), Value::Null);
    assert_eq!(result.errors().len(), 1);

    let error = &result.errors()[0];
    assert_eq!(
        error.message(),
        "Cannot return null for non-nullable field Query.a."
    );
    assert_eq!(error.kind(), ErrorKind::Execution);
    assert_eq!(error.path().unwrap().to_string(), "a");
    assert_eq!(error.locations().len(), 1);
    assert_eq!(error.locations()[0].line, 2);
    assert_eq!(error.locations()[0].column, 3);
}

#[test]
fn null_list_element_bubbles_to_root() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::Null,
        Value::list(vec![Value::scalar(1), Value::Null, Value::scalar(3)]),
        Value::Null,
    );
    let document = query(vec![field("list").build()]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    // The non-null element violation bubbles to the list; the list is itself
    // non-null, so it bubbles on to the root.
    assert_eq!(result.data_to_value(), Value::Null);
    assert_eq!(result.errors().len(), 1);

    let error = &result.errors()[0];
    assert_eq!(
        error.message(),
        "Cannot return null for non-nullable field Query.list."
    );
    assert_eq!(error.path().unwrap().to_string(), "list[1]");
}

#[test]
fn null_object_field_bubbles_to_nullable_parent() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::Null,
        Value::list(vec![]),
        Value::object(vec![("x", Value::scalar(1)), ("y", Value::Null)]),
    );
    let document = query(vec![
        field("obj")
            .select(vec![field("x").build(), field("y").build()])
            .build(),
    ]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert_eq!(
        result.data_to_value(),
        Value::object(vec![("obj", Value::Null)]),
    );
    assert_eq!(result.errors().len(), 1);

    let error = &result.errors()[0];
    assert_eq!(
        error.message(),
        "Cannot return null for non-nullable field Obj.y."
    );
    assert_eq!(error.path().unwrap().to_string(), "obj.y");
}

#[test]
fn duplicate_selections_merge_into_one_entry() {
    let schema = scenario_schema(
        Value::scalar(7),
        Value::Null,
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![field("a").build(), field("a").build()]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"a":7}}"#,
    );
}

#[test]
fn sub_selections_of_merged_fields_coalesce() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::Null,
        Value::list(vec![]),
        Value::object(vec![("x", Value::scalar(1)), ("y", Value::scalar(2))]),
    );
    let document = query(vec![
        field("obj").select(vec![field("x").build()]).build(),
        field("obj").select(vec![field("y").build()]).build(),
    ]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"obj":{"x":1,"y":2}}}"#,
    );
}

#[test]
fn aliases_rename_response_entries() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::scalar("hi"),
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![
        field("a").alias("first").build(),
        field("a").alias("second").build(),
    ]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"first":1,"second":1}}"#,
    );
}

#[test]
fn typename_resolves_to_runtime_type_name() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::Null,
        Value::list(vec![]),
        Value::object(vec![("x", Value::scalar(1))]),
    );
    let document = query(vec![
        field("__typename").build(),
        field("obj")
            .select(vec![field("__typename").build(), field("x").build()])
            .build(),
    ]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"__typename":"Query","obj":{"__typename":"Obj","x":1}}}"#,
    );
}

#[test]
fn unknown_fields_are_dropped_silently() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::Null,
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![field("a").build(), field("nope").build()]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"a":1}}"#,
    );
}

#[test]
fn fragments_expand_in_depth_first_textual_order() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::scalar("hi"),
        Value::list(vec![Value::scalar(9)]),
        Value::object(vec![("x", Value::scalar(1)), ("y", Value::scalar(2))]),
    );

    // { a ...rest ...on Query { list } obj { x } } with
    // fragment rest on Query { b }
    let mut document = query(vec![
        field("a").build(),
        fragment_spread("rest"),
        inline_fragment(Some("Query"), vec![field("list").build()]),
        field("obj").select(vec![field("x").build()]).build(),
    ]);
    document.push(fragment("rest", "Query", vec![field("b").build()]));

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    // Fragment fields land between their siblings, in textual order.
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"a":1,"b":"hi","list":[9],"obj":{"x":1}}}"#,
    );
}

#[test]
fn named_fragment_applies_at_most_once() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::scalar("hi"),
        Value::list(vec![]),
        Value::Null,
    );
    let mut document = query(vec![
        fragment_spread("rest"),
        fragment_spread("rest"),
        field("a").build(),
    ]);
    document.push(fragment("rest", "Query", vec![field("b").build()]));

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"b":"hi","a":1}}"#,
    );
}

#[test]
fn inline_fragment_with_unsatisfied_condition_is_skipped() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::scalar("hi"),
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![
        field("a").build(),
        inline_fragment(Some("Obj"), vec![field("b").build()]),
    ]);

    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"a":1}}"#,
    );
}

#[test]
fn resolver_failure_nulls_field_and_records_error() {
    let result_schema = failing_scenario_schema("boom");
    let document = query(vec![field("b").at(0, 4).build()]);

    let result = execute(&result_schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    assert_eq!(
        result.data_to_value(),
        Value::object(vec![("b", Value::Null)]),
    );
    assert_eq!(result.errors().len(), 1);

    let error = &result.errors()[0];
    assert_eq!(error.message(), "boom");
    assert_eq!(error.kind(), ErrorKind::Execution);
    assert_eq!(error.path().unwrap().to_string(), "b");
    assert_eq!(error.locations()[0].line, 1);
    assert_eq!(error.locations()[0].column, 5);
}

#[test]
fn parallel_execution_matches_serial() {
    let make_schema = || {
        scenario_schema(
            Value::scalar(1),
            Value::scalar("hi"),
            Value::list(vec![Value::scalar(1), Value::Null, Value::scalar(3)]),
            Value::object(vec![("x", Value::scalar(5)), ("y", Value::scalar(6))]),
        )
    };
    let document = query(vec![
        field("b").build(),
        field("list").build(),
        field("obj")
            .select(vec![field("x").build(), field("y").build()])
            .build(),
    ]);

    let serial_schema = make_schema();
    let serial = execute(&serial_schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();

    let parallel_schema = make_schema();
    let parallel = execute_with(
        &parallel_schema,
        &document,
        None,
        &no_vars(),
        &NULL_ROOT,
        ExecutionStrategy::Parallel { workers: 4 },
        CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(serial.data_to_value(), parallel.data_to_value());
    assert_eq!(serial.errors().len(), parallel.errors().len());
    assert_eq!(
        serial.errors()[0].path().map(ToString::to_string),
        parallel.errors()[0].path().map(ToString::to_string),
    );
}

#[test]
fn canceled_operation_reports_single_error() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::scalar("hi"),
        Value::list(vec![]),
        Value::Null,
    );
    let document = query(vec![field("a").build(), field("b").build()]);

    let token = CancellationToken::new();
    token.cancel();

    let result = execute_with(
        &schema,
        &document,
        None,
        &no_vars(),
        &NULL_ROOT,
        ExecutionStrategy::Serial,
        token,
    )
    .unwrap();

    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].message(), "operation canceled");
    assert_eq!(result.errors()[0].kind(), ErrorKind::Execution);
}

#[test]
fn mutation_fields_run_in_order_even_under_parallel_strategy() {
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let first_log = Arc::clone(&log);
    let second_log = Arc::clone(&log);
    let schema = Schema::builder()
        .query(ObjectMeta::new(
            "Query",
            vec![Field::new("a", named("Int"))],
        ))
        .mutation(ObjectMeta::new(
            "Mutation",
            vec![
                Field::new("first", named("Int")).resolve_with(
                    move |_: &Value, _: &ResolveInfo<'_, '_>| -> FieldResult {
                        first_log.lock().unwrap().push("first");
                        Ok(Value::scalar(1))
                    },
                ),
                Field::new("second", named("Int")).resolve_with(
                    move |_: &Value, _: &ResolveInfo<'_, '_>| -> FieldResult {
                        second_log.lock().unwrap().push("second");
                        Ok(Value::scalar(2))
                    },
                ),
            ],
        ))
        .build()
        .unwrap();

    let document = vec![operation(
        OperationType::Mutation,
        vec![field("first").build(), field("second").build()],
    )];

    let result = execute_with(
        &schema,
        &document,
        None,
        &no_vars(),
        &NULL_ROOT,
        ExecutionStrategy::Parallel { workers: 4 },
        CancellationToken::new(),
    )
    .unwrap();

    assert!(result.errors().is_empty());
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"first":1,"second":2}}"#,
    );
}

#[test]
fn multiple_operations_require_a_name() {
    let schema = scenario_schema(
        Value::scalar(1),
        Value::Null,
        Value::list(vec![]),
        Value::Null,
    );
    let mut document = query(vec![field("a").build()]);
    document.push(operation(OperationType::Query, vec![field("b").build()]));

    let err = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn subscription_must_select_a_single_root_field() {
    let schema = Schema::builder()
        .query(ObjectMeta::new(
            "Query",
            vec![Field::new("a", named("Int"))],
        ))
        .subscription(ObjectMeta::new(
            "Subscription",
            vec![
                Field::new("ticks", named("Int")).resolve_with(returns(Value::scalar(1))),
                Field::new("tocks", named("Int")),
            ],
        ))
        .build()
        .unwrap();

    let document = vec![operation(
        OperationType::Subscription,
        vec![field("ticks").build(), field("tocks").build()],
    )];
    let err = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap_err();
    assert_eq!(
        err.message(),
        "Anonymous Subscription must select only one top level field."
    );

    let document = vec![operation(
        OperationType::Subscription,
        vec![field("ticks").build()],
    )];
    let result = execute(&schema, &document, None, &no_vars(), &NULL_ROOT).unwrap();
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"data":{"ticks":1}}"#,
    );
}
