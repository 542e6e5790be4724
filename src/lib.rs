/*!

# GraphQL operation execution

This crate implements the server-side execution half of a GraphQL service:
given a parsed, validated operation, a schema, a set of variable values and a
root source value, it produces the response tree and the ordered list of
execution errors mandated by the [June 2018 specification][graphql_spec].

The engine is deliberately narrow. Parsing and validating documents, defining
a schema language, and serving HTTP are jobs for other layers; what lives
here is the machinery those layers are built around:

* **Field collection**: walking selection sets (including inline and named
  fragments, `@skip` and `@include`) under a runtime type to determine the
  ordered fields to resolve, coalescing selections that share a response key.
* **Value completion**: the type-directed post-processing of resolver
  return values against non-`null`, list, leaf, object and abstract types,
  including the null-bubbling discipline that propagates a `null` at a
  non-`null` position up to the nearest nullable ancestor.
* **Input coercion**: reconciling variable and literal input values with the
  input type system, with precise, suggestion-bearing error messages.
* **Structured errors**: messages with source locations, response paths,
  extensions and a cause chain, serialized the way the specification's
  `errors` entry expects.

Resolvers are plain functions registered on schema fields:

```rust
use graphql_executor::{
    ast::Type,
    execute,
    meta::{Field, ObjectMeta},
    position::Positioned,
    FieldResult, ResolveInfo, Schema, Value, Variables,
};

let schema = Schema::builder()
    .query(ObjectMeta::new(
        "Query",
        vec![
            Field::new("answer", Type::NonNullNamed(arcstr::literal!("Int")))
                .resolve_with(|_: &Value, _: &ResolveInfo<'_, '_>| -> FieldResult {
                    Ok(Value::scalar(42))
                }),
        ],
    ))
    .build()
    .unwrap();

# use graphql_executor::ast::{Definition, Field as AstField, Operation, OperationType, Selection};
# let document = vec![Definition::Operation(Positioned::unlocated(Operation {
#     operation_type: OperationType::Query,
#     name: None,
#     variable_definitions: None,
#     directives: None,
#     selection_set: vec![Selection::Field(Positioned::unlocated(AstField {
#         alias: None,
#         name: Positioned::unlocated(arcstr::literal!("answer")),
#         arguments: None,
#         directives: None,
#         selection_set: None,
#     }))],
# }))];
let root_value = Value::Null;
let result = execute(&schema, &document, None, &Variables::new(), &root_value).unwrap();
assert_eq!(
    result.data_to_value(),
    Value::object(vec![("answer", Value::scalar(42))]),
);
```

[graphql_spec]: https://spec.graphql.org/June2018/

*/
#![warn(missing_docs)]

pub mod ast;
mod error;
mod executor;
pub mod position;
pub(crate) mod schema;
mod util;
mod value;

#[cfg(test)]
mod executor_tests;

pub use crate::{
    error::{Error, ErrorKind, ErrorLocation, Extensions, PathSegment, ResponsePath},
    executor::{
        execute, execute_with, get_operation, CancellationToken, Dispatcher, ExecuteNodeTask,
        ExecutionContext, ExecutionNode, ExecutionResult, ExecutionStrategy, FieldResult,
        ResolveInfo, Resolver, ResultKind, ResultNode,
    },
    schema::{
        meta,
        model::{DirectiveLocation, DirectiveType, Schema, SchemaBuilder, TypeType},
    },
    value::{coercion, Object, ScalarValue, Value, Variables},
};
