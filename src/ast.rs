//! The parts of a parsed GraphQL document the executor operates on.
//!
//! The AST is owned: names are cheap-to-clone [`ArcStr`]s instead of borrows
//! of the source text, so documents can be shared freely between execution
//! tasks. Producing the AST from source text is the parser's job and out of
//! scope here.

use std::fmt;

use arcstr::ArcStr;

use crate::{
    position::Positioned,
    value::{ScalarValue, Value, Variables},
};

/// Type literal in a syntax tree.
///
/// Carries no semantic information and might refer to types that don't exist.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Type {
    /// A nullable named type, e.g. `String`.
    Named(ArcStr),
    /// A nullable list type, e.g. `[String]`.
    List(Box<Type>),
    /// A non-`null` named type, e.g. `String!`.
    NonNullNamed(ArcStr),
    /// A non-`null` list type, e.g. `[String]!`.
    NonNullList(Box<Type>),
}

impl Type {
    /// Returns the innermost name of this [`Type`] by unpacking lists.
    ///
    /// All [`Type`] literals contain exactly one named type.
    #[must_use]
    pub fn innermost_name(&self) -> &str {
        match self {
            Self::Named(name) | Self::NonNullNamed(name) => name,
            Self::List(inner) | Self::NonNullList(inner) => inner.innermost_name(),
        }
    }

    /// Indicates whether this [`Type`] can only represent non-`null` values.
    #[must_use]
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNullNamed(_) | Self::NonNullList(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::NonNullNamed(name) => write!(f, "{name}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNullList(inner) => write!(f, "[{inner}]!"),
        }
    }
}

/// A JSON-like value provided in the document, either as an argument value or
/// a default variable value. These are _not_ constant and might contain
/// variables.
///
/// List and object entries are positioned, i.e. they carry their position
/// in the source file, if available.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum InputValue {
    Null,
    Scalar(ScalarValue),
    Enum(String),
    Variable(String),
    List(Vec<Positioned<InputValue>>),
    Object(Vec<(Positioned<String>, Positioned<InputValue>)>),
}

impl InputValue {
    /// Constructs a `null` value.
    pub fn null() -> Self {
        Self::Null
    }

    /// Constructs a scalar value.
    pub fn scalar<T: Into<ScalarValue>>(v: T) -> Self {
        Self::Scalar(v.into())
    }

    /// Constructs an enum value.
    pub fn enum_value<T: AsRef<str>>(s: T) -> Self {
        Self::Enum(s.as_ref().into())
    }

    /// Constructs a variable value.
    pub fn variable<T: AsRef<str>>(v: T) -> Self {
        Self::Variable(v.as_ref().into())
    }

    /// Constructs an unlocated list.
    pub fn list(l: Vec<Self>) -> Self {
        Self::List(l.into_iter().map(Positioned::unlocated).collect())
    }

    /// Constructs an unlocated object.
    pub fn object<K: Into<String>>(o: Vec<(K, Self)>) -> Self {
        Self::Object(
            o.into_iter()
                .map(|(k, v)| (Positioned::unlocated(k.into()), Positioned::unlocated(v)))
                .collect(),
        )
    }

    /// Does the value represent a `null`?
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Resolves this [`InputValue`] against the given variable `values`,
    /// producing the runtime [`Value`] it denotes.
    ///
    /// If a variable is not present in `values`:
    /// - Returns [`None`] in case this is an [`InputValue::Variable`], so the
    ///   caller can fall back to a default value.
    /// - Skips the field in case of an [`InputValue::Object`] field.
    /// - Replaces the element with a `null` in case of an
    ///   [`InputValue::List`] element, since a single list element cannot
    ///   have a default value.
    #[must_use]
    pub fn resolve(&self, values: &Variables) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Scalar(s) => Some(Value::Scalar(s.clone())),
            // Enum values travel as their name.
            Self::Enum(name) => Some(Value::scalar(name.as_str())),
            Self::Variable(name) => values.get(name).cloned(),
            Self::List(l) => Some(Value::List(
                l.iter()
                    .map(|s| s.item.resolve(values).unwrap_or(Value::Null))
                    .collect(),
            )),
            Self::Object(o) => Some(Value::Object(
                o.iter()
                    .filter_map(|(k, v)| v.item.resolve(values).map(|v| (k.item.clone(), v)))
                    .collect(),
            )),
        }
    }
}

/// Arguments provided for a field or a directive.
#[derive(Clone, Debug, PartialEq)]
pub struct Arguments {
    /// `(name, value)` pairs in textual order.
    pub items: Vec<(Positioned<ArcStr>, Positioned<InputValue>)>,
}

impl Arguments {
    /// Gets the value provided for the argument named `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Positioned<InputValue>> {
        self.items
            .iter()
            .find(|(k, _)| k.item.as_str() == key)
            .map(|(_, v)| v)
    }
}

/// A directive applied to a selection, e.g. `@skip(if: $no)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// Name of the directive, without the `@`.
    pub name: Positioned<ArcStr>,
    /// Arguments provided to the directive.
    pub arguments: Option<Positioned<Arguments>>,
}

/// Definition of an operation variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    /// Declared type of the variable.
    pub var_type: Positioned<Type>,
    /// Default value applied when the variable is not provided.
    pub default_value: Option<Positioned<InputValue>>,
}

/// The variable definitions of an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinitions {
    /// `(name, definition)` pairs in textual order.
    pub items: Vec<(Positioned<ArcStr>, VariableDefinition)>,
}

/// A single field selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Response alias, if any.
    pub alias: Option<Positioned<ArcStr>>,
    /// Name of the selected field.
    pub name: Positioned<ArcStr>,
    /// Arguments provided for the field.
    pub arguments: Option<Positioned<Arguments>>,
    /// Directives applied to the selection.
    pub directives: Option<Vec<Positioned<Directive>>>,
    /// Sub-selection, for fields of composite types.
    pub selection_set: Option<Vec<Selection>>,
}

impl Field {
    /// The key under which this field's value appears in the response: the
    /// alias if present, the field name otherwise.
    pub fn response_key(&self) -> &ArcStr {
        self.alias.as_ref().map(|a| &a.item).unwrap_or(&self.name.item)
    }
}

/// A named fragment spread, e.g. `...friendFields`.
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentSpread {
    /// Name of the fragment being spread.
    pub name: Positioned<ArcStr>,
    /// Directives applied to the spread.
    pub directives: Option<Vec<Positioned<Directive>>>,
}

/// An inline fragment, e.g. `... on User { name }`.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineFragment {
    /// Type condition, if any.
    pub type_condition: Option<Positioned<ArcStr>>,
    /// Directives applied to the fragment.
    pub directives: Option<Vec<Positioned<Directive>>>,
    /// Selections of the fragment.
    pub selection_set: Vec<Selection>,
}

/// Entry in a GraphQL selection set.
///
/// This enum represents one of the three variants of a selection that exist
/// in GraphQL: a field, a fragment spread, or an inline fragment. Each of the
/// variants references its location in the query source.
///
/// ```text
/// {
///   field(withArg: 123) { subField }
///   ...fragmentSpread
///   ...on User {
///     inlineFragmentField
///   }
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Selection {
    Field(Positioned<Field>),
    FragmentSpread(Positioned<FragmentSpread>),
    InlineFragment(Positioned<InlineFragment>),
}

impl Selection {
    /// The directives applied to this selection, if any.
    pub fn directives(&self) -> Option<&Vec<Positioned<Directive>>> {
        match self {
            Self::Field(f) => f.item.directives.as_ref(),
            Self::FragmentSpread(s) => s.item.directives.as_ref(),
            Self::InlineFragment(i) => i.item.directives.as_ref(),
        }
    }
}

/// The kind of an operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

/// An executable operation definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// Kind of the operation.
    pub operation_type: OperationType,
    /// Name of the operation, if any.
    pub name: Option<Positioned<ArcStr>>,
    /// Variable definitions of the operation.
    pub variable_definitions: Option<Positioned<VariableDefinitions>>,
    /// Directives applied to the operation.
    pub directives: Option<Vec<Positioned<Directive>>>,
    /// Top-level selection set.
    pub selection_set: Vec<Selection>,
}

/// A named fragment definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    /// Name of the fragment.
    pub name: Positioned<ArcStr>,
    /// Type condition of the fragment.
    pub type_condition: Positioned<ArcStr>,
    /// Directives applied to the fragment.
    pub directives: Option<Vec<Positioned<Directive>>>,
    /// Selections of the fragment.
    pub selection_set: Vec<Selection>,
}

/// A definition in an executable document.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Definition {
    Operation(Positioned<Operation>),
    Fragment(Positioned<Fragment>),
}

/// An executable GraphQL document.
pub type Document = Vec<Definition>;
