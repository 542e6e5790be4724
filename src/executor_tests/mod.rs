mod directives;
mod executor;
mod variables;

use arcstr::ArcStr;

use crate::{
    ast::{self, Definition, Document, InputValue, Operation, OperationType, Selection},
    executor::{FieldResult, ResolveInfo},
    position::{Positioned, SourcePosition},
    schema::{
        meta::{Field, ObjectMeta},
        model::Schema,
    },
    value::Value,
};

/// A root source value for operations whose resolvers ignore it.
pub(crate) static NULL_ROOT: Value = Value::Null;

/// A `Query` root whose `b: String` field fails with the given message.
pub(crate) fn failing_scenario_schema(message: &str) -> Schema {
    Schema::builder()
        .query(ObjectMeta::new(
            "Query",
            vec![
                Field::new("a", non_null("Int")).resolve_with(returns(Value::scalar(1))),
                Field::new("b", named("String")).resolve_with(fails(message)),
            ],
        ))
        .build()
        .unwrap()
}

pub(crate) fn named(name: &str) -> ast::Type {
    ast::Type::Named(ArcStr::from(name))
}

pub(crate) fn non_null(name: &str) -> ast::Type {
    ast::Type::NonNullNamed(ArcStr::from(name))
}

pub(crate) fn list_of(inner: ast::Type) -> ast::Type {
    ast::Type::List(Box::new(inner))
}

pub(crate) fn non_null_list_of(inner: ast::Type) -> ast::Type {
    ast::Type::NonNullList(Box::new(inner))
}

/// A resolver that returns a clone of the given value.
pub(crate) fn returns(
    value: Value,
) -> impl Fn(&Value, &ResolveInfo<'_, '_>) -> FieldResult + Send + Sync {
    move |_, _| Ok(value.clone())
}

/// A resolver that fails with the given message.
pub(crate) fn fails(
    message: &str,
) -> impl Fn(&Value, &ResolveInfo<'_, '_>) -> FieldResult + Send + Sync {
    let message = message.to_owned();
    move |_, _| Err(crate::error::Error::new(message.clone()))
}

pub(crate) struct FieldBuilder {
    alias: Option<ArcStr>,
    name: ArcStr,
    arguments: Vec<(ArcStr, InputValue)>,
    directives: Vec<Positioned<ast::Directive>>,
    selection_set: Option<Vec<Selection>>,
    position: SourcePosition,
}

pub(crate) fn field(name: &str) -> FieldBuilder {
    FieldBuilder {
        alias: None,
        name: ArcStr::from(name),
        arguments: Vec::new(),
        directives: Vec::new(),
        selection_set: None,
        position: SourcePosition::origin(),
    }
}

impl FieldBuilder {
    pub(crate) fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(ArcStr::from(alias));
        self
    }

    pub(crate) fn argument(mut self, name: &str, value: InputValue) -> Self {
        self.arguments.push((ArcStr::from(name), value));
        self
    }

    pub(crate) fn directive(mut self, directive: Positioned<ast::Directive>) -> Self {
        self.directives.push(directive);
        self
    }

    pub(crate) fn select(mut self, selection_set: Vec<Selection>) -> Self {
        self.selection_set = Some(selection_set);
        self
    }

    /// Places the field at the given zero-based source position.
    pub(crate) fn at(mut self, line: usize, column: usize) -> Self {
        self.position = SourcePosition::new(line, column);
        self
    }

    pub(crate) fn build(self) -> Selection {
        Selection::Field(Positioned::new(
            ast::Field {
                alias: self.alias.map(Positioned::unlocated),
                name: Positioned::unlocated(self.name),
                arguments: (!self.arguments.is_empty()).then(|| {
                    Positioned::unlocated(ast::Arguments {
                        items: self
                            .arguments
                            .into_iter()
                            .map(|(k, v)| (Positioned::unlocated(k), Positioned::unlocated(v)))
                            .collect(),
                    })
                }),
                directives: (!self.directives.is_empty()).then_some(self.directives),
                selection_set: self.selection_set,
            },
            self.position,
        ))
    }
}

pub(crate) fn directive(name: &str, condition: InputValue) -> Positioned<ast::Directive> {
    Positioned::unlocated(ast::Directive {
        name: Positioned::unlocated(ArcStr::from(name)),
        arguments: Some(Positioned::unlocated(ast::Arguments {
            items: vec![(
                Positioned::unlocated(arcstr::literal!("if")),
                Positioned::unlocated(condition),
            )],
        })),
    })
}

pub(crate) fn inline_fragment(
    type_condition: Option<&str>,
    selection_set: Vec<Selection>,
) -> Selection {
    Selection::InlineFragment(Positioned::unlocated(ast::InlineFragment {
        type_condition: type_condition.map(|c| Positioned::unlocated(ArcStr::from(c))),
        directives: None,
        selection_set,
    }))
}

pub(crate) fn fragment_spread(name: &str) -> Selection {
    Selection::FragmentSpread(Positioned::unlocated(ast::FragmentSpread {
        name: Positioned::unlocated(ArcStr::from(name)),
        directives: None,
    }))
}

pub(crate) fn fragment_spread_with(
    name: &str,
    directives: Vec<Positioned<ast::Directive>>,
) -> Selection {
    Selection::FragmentSpread(Positioned::unlocated(ast::FragmentSpread {
        name: Positioned::unlocated(ArcStr::from(name)),
        directives: Some(directives),
    }))
}

pub(crate) fn fragment(name: &str, on: &str, selection_set: Vec<Selection>) -> Definition {
    Definition::Fragment(Positioned::unlocated(ast::Fragment {
        name: Positioned::unlocated(ArcStr::from(name)),
        type_condition: Positioned::unlocated(ArcStr::from(on)),
        directives: None,
        selection_set,
    }))
}

pub(crate) fn operation(
    operation_type: OperationType,
    selection_set: Vec<Selection>,
) -> Definition {
    Definition::Operation(Positioned::unlocated(Operation {
        operation_type,
        name: None,
        variable_definitions: None,
        directives: None,
        selection_set,
    }))
}

pub(crate) fn operation_with_variables(
    operation_type: OperationType,
    variables: Vec<(&str, ast::Type, Option<InputValue>)>,
    selection_set: Vec<Selection>,
) -> Definition {
    Definition::Operation(Positioned::unlocated(Operation {
        operation_type,
        name: None,
        variable_definitions: Some(Positioned::unlocated(ast::VariableDefinitions {
            items: variables
                .into_iter()
                .map(|(name, var_type, default_value)| {
                    (
                        Positioned::unlocated(ArcStr::from(name)),
                        ast::VariableDefinition {
                            var_type: Positioned::unlocated(var_type),
                            default_value: default_value.map(Positioned::unlocated),
                        },
                    )
                })
                .collect(),
        })),
        directives: None,
        selection_set,
    }))
}

pub(crate) fn query(selection_set: Vec<Selection>) -> Document {
    vec![operation(OperationType::Query, selection_set)]
}
