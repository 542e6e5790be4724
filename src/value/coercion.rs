//! Input value coercion.
//!
//! Reconciles variable and literal input values with the input type system:
//! given a dynamically typed [`Value`] and a declared input type, produces a
//! value conforming to the type or a list of coercion errors.

use indexmap::IndexMap;

use crate::{
    ast,
    error::{Error, ErrorKind},
    position::{Positioned, SourcePosition},
    schema::{
        meta::{Argument, MetaType},
        model::{Schema, TypeType},
    },
    util,
    value::{Object, ScalarValue, Value, Variables},
};

/// One link of the path from the value being coerced down to the nested value
/// currently being looked at. Stack-allocated along the recursion.
#[derive(Clone, Copy)]
struct ValuePath<'p> {
    prev: Option<&'p ValuePath<'p>>,
    key: PathKey<'p>,
}

#[derive(Clone, Copy)]
enum PathKey<'p> {
    Field(&'p str),
    Index(usize),
}

fn render_path(path: Option<&ValuePath<'_>>) -> String {
    fn walk(path: &ValuePath<'_>, out: &mut String) {
        if let Some(prev) = path.prev {
            walk(prev, out);
        }
        match path.key {
            PathKey::Field(name) => {
                out.push('.');
                out.push_str(name);
            }
            PathKey::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }

    match path {
        None => String::new(),
        Some(path) => {
            let mut out = String::from("value");
            walk(path, &mut out);
            out
        }
    }
}

/// Coerces a [`Value`] given a declared input type.
///
/// Returns either a value which is valid for the provided type, or the list
/// of encountered coercion errors. The `blame` position, if provided, is
/// attached to every emitted error.
pub fn coerce_value(
    schema: &Schema,
    value: &Value,
    ty: &TypeType<'_>,
    blame: Option<&SourcePosition>,
) -> Result<Value, Vec<Error>> {
    coerce_value_impl(schema, value, ty, blame, None)
}

fn coerce_value_impl(
    schema: &Schema,
    value: &Value,
    ty: &TypeType<'_>,
    blame: Option<&SourcePosition>,
    path: Option<&ValuePath<'_>>,
) -> Result<Value, Vec<Error>> {
    // A value must be provided if the type is non-null.
    if let TypeType::NonNull(inner) = ty {
        if value.is_null() {
            return Err(vec![coercion_error(
                format!("Expected non-nullable type {ty} not to be null"),
                blame,
                path,
                "",
                None,
            )]);
        }
        return coerce_value_impl(schema, value, inner, blame, path);
    }

    if value.is_null() {
        // Explicitly return the value null.
        return Ok(Value::Null);
    }

    match ty {
        TypeType::NonNull(_) => unreachable!("handled above"),

        TypeType::List(element_type) => {
            if let Value::List(items) = value {
                if items.is_empty() {
                    return Ok(Value::List(Vec::new()));
                }

                let mut errors = Vec::new();
                let mut coerced_values = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_path = ValuePath {
                        prev: path,
                        key: PathKey::Index(index),
                    };
                    match coerce_value_impl(schema, item, element_type, blame, Some(&item_path)) {
                        Ok(coerced) => {
                            if errors.is_empty() {
                                coerced_values.push(coerced);
                            }
                        }
                        Err(item_errors) => errors.extend(item_errors),
                    }
                }
                if !errors.is_empty() {
                    return Err(errors);
                }
                Ok(Value::List(coerced_values))
            } else {
                // Lists accept a non-list value as a list of one.
                let coerced = coerce_value_impl(schema, value, element_type, blame, path)?;
                Ok(Value::List(vec![coerced]))
            }
        }

        TypeType::Concrete(meta) => match meta {
            MetaType::Scalar(scalar) => scalar.coerce_input(value).map_err(|err| {
                // Maintain a reference to the original error, and surface its
                // message when it is a structured coercion failure.
                let sub_message = if err.kind() == ErrorKind::Coercion {
                    err.message().to_owned()
                } else {
                    String::new()
                };
                vec![coercion_error(
                    format!("Expected type {}", scalar.name),
                    blame,
                    path,
                    &sub_message,
                    Some(err),
                )]
            }),

            MetaType::Enum(enum_meta) => enum_meta.coerce_input(value).map_err(|err| {
                let input = value
                    .as_string_value()
                    .map(str::to_owned)
                    .unwrap_or_else(|| value.to_string());
                let suggestions = util::suggestion_list(&input, &enum_meta.value_names());
                let did_you_mean = if suggestions.is_empty() {
                    String::new()
                } else {
                    format!("did you mean {}?", util::or_list(&suggestions, 5, false))
                };
                vec![coercion_error(
                    format!("Expected type {}", enum_meta.name),
                    blame,
                    path,
                    &did_you_mean,
                    Some(err),
                )]
            }),

            MetaType::InputObject(input_object) => {
                let Some(object_value) = value.as_object_value() else {
                    return Err(vec![coercion_error(
                        format!("Expected type {} to be an object", input_object.name),
                        blame,
                        path,
                        "",
                        Some(Error::new(format!(
                            "value for an input object should be given as a map of field \
                             values, but got: {value}"
                        ))),
                    )]);
                };

                let mut errors = Vec::new();
                let mut coerced_value = Object::with_capacity(input_object.input_fields.len());

                // Ensure every defined field is valid.
                for field in &input_object.input_fields {
                    let field_path = ValuePath {
                        prev: path,
                        key: PathKey::Field(field.name.as_str()),
                    };
                    match object_value.get_field_value(field.name.as_str()) {
                        None => {
                            if let Some(default) = &field.default_value {
                                coerced_value.add_field(field.name.as_str(), default.clone());
                            } else if field.arg_type.is_non_null() {
                                errors.push(coercion_error(
                                    format!(
                                        "Field {} of required type {} was not provided",
                                        render_path(Some(&field_path)),
                                        field.arg_type,
                                    ),
                                    blame,
                                    None,
                                    "",
                                    None,
                                ));
                            }
                        }
                        Some(field_value) => {
                            match schema.make_type(&field.arg_type) {
                                Ok(field_type) => match coerce_value_impl(
                                    schema,
                                    field_value,
                                    &field_type,
                                    blame,
                                    Some(&field_path),
                                ) {
                                    Ok(coerced) => {
                                        if errors.is_empty() {
                                            coerced_value.add_field(field.name.as_str(), coerced);
                                        }
                                    }
                                    Err(field_errors) => errors.extend(field_errors),
                                },
                                Err(err) => errors.push(err),
                            }
                        }
                    }
                }

                // Ensure every provided field is defined.
                for (name, _) in object_value.iter() {
                    if input_object.input_field_by_name(name).is_none() {
                        let field_names: Vec<String> = input_object
                            .input_fields
                            .iter()
                            .map(|f| f.name.to_string())
                            .collect();
                        let suggestions = util::suggestion_list(name, &field_names);
                        let did_you_mean = if suggestions.is_empty() {
                            String::new()
                        } else {
                            format!("did you mean {}?", util::or_list(&suggestions, 5, true))
                        };
                        errors.push(coercion_error(
                            format!(
                                "Field \"{name}\" is not defined by type {}",
                                input_object.name,
                            ),
                            blame,
                            path,
                            &did_you_mean,
                            None,
                        ));
                    }
                }

                if !errors.is_empty() {
                    return Err(errors);
                }
                Ok(Value::Object(coerced_value))
            }

            MetaType::Object(_) | MetaType::Interface(_) | MetaType::Union(_) => {
                Err(vec![coercion_error(
                    format!("{} is not a valid input type", meta.name()),
                    blame,
                    path,
                    "",
                    None,
                )])
            }
        },
    }
}

fn coercion_error(
    message: String,
    blame: Option<&SourcePosition>,
    path: Option<&ValuePath<'_>>,
    sub_message: &str,
    original_error: Option<Error>,
) -> Error {
    let mut full_message = message;

    let rendered_path = render_path(path);
    if !rendered_path.is_empty() {
        full_message.push_str(" at ");
        full_message.push_str(&rendered_path);
    }

    if sub_message.is_empty() {
        full_message.push('.');
    } else {
        full_message.push_str("; ");
        full_message.push_str(sub_message);
    }

    let mut error = Error::new(full_message).with_kind(ErrorKind::Coercion);
    if let Some(position) = blame {
        error = error.at(position);
    }
    if let Some(original) = original_error {
        error = error.caused_by(original);
    }
    error
}

/// Prepares the argument values of a field or directive for execution.
///
/// Every declared argument is resolved from the provided AST arguments and
/// the variable values, coerced against its declared type, or filled in from
/// its default value. Arguments are coerced eagerly, so a resolver never sees
/// an uncoerced input.
pub fn argument_values(
    schema: &Schema,
    argument_definitions: &[Argument],
    ast_arguments: Option<&Positioned<ast::Arguments>>,
    variables: &Variables,
    blame: &SourcePosition,
) -> Result<IndexMap<String, Value>, Error> {
    let mut coerced = IndexMap::with_capacity(argument_definitions.len());

    for definition in argument_definitions {
        let provided = ast_arguments.and_then(|args| args.item.get(definition.name.as_str()));
        // An argument bound to a missing variable counts as not provided.
        let value = provided.and_then(|sp| sp.item.resolve(variables));

        match value {
            Some(value) => {
                let arg_type = schema.make_type(&definition.arg_type)?;
                let position = provided.map(|sp| sp.position).unwrap_or(*blame);
                match coerce_value(schema, &value, &arg_type, Some(&position)) {
                    Ok(coerced_value) => {
                        coerced.insert(definition.name.to_string(), coerced_value);
                    }
                    Err(errors) => {
                        let first = errors
                            .into_iter()
                            .next()
                            .expect("coercion failure carries at least one error");
                        return Err(Error::new(format!(
                            "Invalid value for argument \"{}\"",
                            definition.name,
                        ))
                        .caused_by(first));
                    }
                }
            }
            None => {
                if let Some(default) = &definition.default_value {
                    coerced.insert(definition.name.to_string(), default.clone());
                } else if definition.arg_type.is_non_null() {
                    return Err(Error::new(format!(
                        "Argument \"{}\" of required type \"{}\" was not provided",
                        definition.name, definition.arg_type,
                    ))
                    .at(blame)
                    .with_kind(ErrorKind::Coercion));
                }
            }
        }
    }

    Ok(coerced)
}

/// Determines if a selection should be included, based on the `@skip` and
/// `@include` directives, where `@skip` has higher precedence.
///
/// A selection carrying both directives is included iff the `@skip` condition
/// is false and the `@include` condition is true.
pub fn should_include(
    schema: &Schema,
    directives: Option<&Vec<Positioned<ast::Directive>>>,
    variables: &Variables,
) -> Result<bool, Error> {
    let Some(directives) = directives else {
        return Ok(true);
    };

    if directive_condition(schema, directives, "skip", variables)? == Some(true) {
        return Ok(false);
    }

    if directive_condition(schema, directives, "include", variables)? == Some(false) {
        return Ok(false);
    }

    Ok(true)
}

fn directive_condition(
    schema: &Schema,
    directives: &[Positioned<ast::Directive>],
    name: &str,
    variables: &Variables,
) -> Result<Option<bool>, Error> {
    let Some(directive) = directives.iter().find(|d| d.item.name.item.as_str() == name) else {
        return Ok(None);
    };

    let Some(definition) = schema.directive_by_name(name) else {
        return Ok(None);
    };

    let arguments = argument_values(
        schema,
        &definition.arguments,
        directive.item.arguments.as_ref(),
        variables,
        &directive.position,
    )?;

    Ok(arguments
        .get("if")
        .and_then(Value::as_scalar)
        .and_then(ScalarValue::as_bool))
}
