use std::fmt;

use arcstr::ArcStr;
use fnv::FnvHashMap;

use crate::{
    ast::{OperationType, Type},
    error::{Error, ErrorKind},
    schema::meta::{Argument, MetaType, ObjectMeta},
};

/// Metadata for a schema: the named types, the root operation types and the
/// declared directives.
#[derive(Debug)]
pub struct Schema {
    pub(crate) types: FnvHashMap<String, MetaType>,
    pub(crate) query_type_name: String,
    pub(crate) mutation_type_name: Option<String>,
    pub(crate) subscription_type_name: Option<String>,
    directives: FnvHashMap<String, DirectiveType>,
}

/// A schema type reference resolved against the registry, unwrapping into a
/// concrete [`MetaType`] through non-`null` and list modifiers.
#[derive(Clone, Debug)]
pub enum TypeType<'a> {
    /// A named type registered in the schema.
    Concrete(&'a MetaType),
    /// A non-`null` modifier around an inner type.
    NonNull(Box<TypeType<'a>>),
    /// A list modifier around an inner type.
    List(Box<TypeType<'a>>),
}

impl<'a> TypeType<'a> {
    /// Unwraps all modifiers down to the concrete [`MetaType`].
    pub fn innermost_concrete(&self) -> &'a MetaType {
        match self {
            Self::Concrete(t) => t,
            Self::NonNull(inner) | Self::List(inner) => inner.innermost_concrete(),
        }
    }

    /// Views this reference as a concrete [`MetaType`], unless it is wrapped.
    pub fn to_concrete(&self) -> Option<&'a MetaType> {
        match self {
            Self::Concrete(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this reference is a non-`null` type.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for TypeType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(t) => write!(f, "{}", t.name()),
            Self::NonNull(inner) => write!(f, "{inner}!"),
            Self::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// Places a directive can appear in a document.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum DirectiveLocation {
    Query,
    Mutation,
    Subscription,
    Field,
    FragmentDefinition,
    FragmentSpread,
    InlineFragment,
}

/// Declaration of a directive, with its argument definitions.
#[derive(Debug)]
pub struct DirectiveType {
    /// Name of the directive, without the `@`.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// Places this directive can appear in.
    pub locations: Vec<DirectiveLocation>,
    /// Argument definitions.
    pub arguments: Vec<Argument>,
}

impl DirectiveType {
    /// Builds a new [`DirectiveType`] declaration.
    pub fn new(
        name: impl Into<ArcStr>,
        locations: Vec<DirectiveLocation>,
        arguments: Vec<Argument>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            locations,
            arguments,
        }
    }

    fn new_skip() -> Self {
        Self::new(
            arcstr::literal!("skip"),
            vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            vec![Argument::new(
                arcstr::literal!("if"),
                Type::NonNullNamed(arcstr::literal!("Boolean")),
            )],
        )
    }

    fn new_include() -> Self {
        Self::new(
            arcstr::literal!("include"),
            vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            vec![Argument::new(
                arcstr::literal!("if"),
                Type::NonNullNamed(arcstr::literal!("Boolean")),
            )],
        )
    }
}

impl Schema {
    /// Starts building a new [`Schema`].
    ///
    /// The builtin scalars and the `skip`/`include` directives are registered
    /// up front.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Gets a concrete type by name.
    pub fn concrete_type_by_name(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// Resolves a syntax-tree [`Type`] against this schema.
    pub fn make_type(&self, ast_type: &Type) -> Result<TypeType<'_>, Error> {
        match ast_type {
            Type::Named(name) => self
                .concrete_type_by_name(name)
                .map(TypeType::Concrete)
                .ok_or_else(|| unknown_type_error(name)),
            Type::NonNullNamed(name) => self
                .concrete_type_by_name(name)
                .map(|t| TypeType::NonNull(Box::new(TypeType::Concrete(t))))
                .ok_or_else(|| unknown_type_error(name)),
            Type::List(inner) => Ok(TypeType::List(Box::new(self.make_type(inner)?))),
            Type::NonNullList(inner) => Ok(TypeType::NonNull(Box::new(TypeType::List(
                Box::new(self.make_type(inner)?),
            )))),
        }
    }

    /// Gets the query root type of this schema.
    pub fn query_type(&self) -> &ObjectMeta {
        self.types
            .get(&self.query_type_name)
            .and_then(MetaType::as_object)
            .expect("Query type does not exist in schema")
    }

    /// Gets the mutation root type of this schema, if one is configured.
    pub fn mutation_type(&self) -> Option<&ObjectMeta> {
        self.mutation_type_name.as_ref().map(|name| {
            self.types
                .get(name)
                .and_then(MetaType::as_object)
                .expect("Mutation type does not exist in schema")
        })
    }

    /// Gets the subscription root type of this schema, if one is configured.
    pub fn subscription_type(&self) -> Option<&ObjectMeta> {
        self.subscription_type_name.as_ref().map(|name| {
            self.types
                .get(name)
                .and_then(MetaType::as_object)
                .expect("Subscription type does not exist in schema")
        })
    }

    /// Gets the root type executing the given kind of operation.
    pub fn root_type_for(&self, operation_type: OperationType) -> Result<&ObjectMeta, Error> {
        match operation_type {
            OperationType::Query => Ok(self.query_type()),
            OperationType::Mutation => self.mutation_type().ok_or_else(|| {
                Error::new("Schema is not configured for mutations")
                    .with_kind(ErrorKind::Validation)
            }),
            OperationType::Subscription => self.subscription_type().ok_or_else(|| {
                Error::new("Schema is not configured for subscriptions")
                    .with_kind(ErrorKind::Validation)
            }),
        }
    }

    /// Whether the given object type is the query root of this schema.
    pub fn is_query_root(&self, object_type: &ObjectMeta) -> bool {
        std::ptr::eq(self.query_type(), object_type)
    }

    /// The concrete object types a value of the given type can have at
    /// runtime: the members of a union, the implementers of an interface, or
    /// the object type itself.
    pub fn possible_types<'a>(&'a self, meta_type: &'a MetaType) -> Vec<&'a ObjectMeta> {
        match meta_type {
            MetaType::Union(u) => u
                .of_type_names
                .iter()
                .filter_map(|name| {
                    self.concrete_type_by_name(name)
                        .and_then(MetaType::as_object)
                })
                .collect(),
            MetaType::Interface(i) => {
                let mut implementers: Vec<&ObjectMeta> = self
                    .types
                    .values()
                    .filter_map(MetaType::as_object)
                    .filter(|o| o.interface_names.iter().any(|n| *n == i.name))
                    .collect();
                implementers.sort_by(|a, b| a.name.cmp(&b.name));
                implementers
            }
            MetaType::Object(o) => vec![o],
            _ => Vec::new(),
        }
    }

    /// Whether `object_type` is one of the possible runtime types of
    /// `meta_type`. Types are compared by identity, never by name.
    pub fn is_possible_type(&self, meta_type: &MetaType, object_type: &ObjectMeta) -> bool {
        self.possible_types(meta_type)
            .iter()
            .any(|possible| std::ptr::eq(*possible, object_type))
    }

    /// Gets a declared directive by name.
    pub fn directive_by_name(&self, name: &str) -> Option<&DirectiveType> {
        self.directives.get(name)
    }
}

fn unknown_type_error(name: &str) -> Error {
    Error::new(format!("Unknown type \"{name}\"")).with_kind(ErrorKind::Internal)
}

/// Assembles a [`Schema`] out of registered types and root type names.
#[derive(Debug)]
pub struct SchemaBuilder {
    types: FnvHashMap<String, MetaType>,
    query_type_name: Option<String>,
    mutation_type_name: Option<String>,
    subscription_type_name: Option<String>,
    errors: Vec<Error>,
}

impl SchemaBuilder {
    fn new() -> Self {
        let mut builder = Self {
            types: FnvHashMap::default(),
            query_type_name: None,
            mutation_type_name: None,
            subscription_type_name: None,
            errors: Vec::new(),
        };
        builder = builder
            .register(crate::schema::meta::ScalarMeta::int().into_meta())
            .register(crate::schema::meta::ScalarMeta::float().into_meta())
            .register(crate::schema::meta::ScalarMeta::string().into_meta())
            .register(crate::schema::meta::ScalarMeta::boolean().into_meta())
            .register(crate::schema::meta::ScalarMeta::id().into_meta());
        builder
    }

    /// Registers a named type.
    #[must_use]
    pub fn register(mut self, meta_type: MetaType) -> Self {
        let name = meta_type.name().to_string();
        if self.types.contains_key(&name) {
            self.errors.push(
                Error::new(format!("Type \"{name}\" is registered more than once"))
                    .with_kind(ErrorKind::Validation),
            );
        } else {
            self.types.insert(name, meta_type);
        }
        self
    }

    /// Registers `object_type` and makes it the query root.
    #[must_use]
    pub fn query(mut self, object_type: ObjectMeta) -> Self {
        self.query_type_name = Some(object_type.name.to_string());
        self.register(object_type.into_meta())
    }

    /// Registers `object_type` and makes it the mutation root.
    #[must_use]
    pub fn mutation(mut self, object_type: ObjectMeta) -> Self {
        self.mutation_type_name = Some(object_type.name.to_string());
        self.register(object_type.into_meta())
    }

    /// Registers `object_type` and makes it the subscription root.
    #[must_use]
    pub fn subscription(mut self, object_type: ObjectMeta) -> Self {
        self.subscription_type_name = Some(object_type.name.to_string());
        self.register(object_type.into_meta())
    }

    /// Finishes building the [`Schema`].
    ///
    /// Fails when a type was registered twice, the query root is missing, or
    /// a field, argument or union member references an unregistered type.
    pub fn build(mut self) -> Result<Schema, Error> {
        let query_type_name = match &self.query_type_name {
            Some(name) => name.clone(),
            None => {
                return Err(Error::new("Schema has no query root type")
                    .with_kind(ErrorKind::Validation));
            }
        };

        self.check_references();

        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        let mut directives = FnvHashMap::default();
        directives.insert("skip".to_owned(), DirectiveType::new_skip());
        directives.insert("include".to_owned(), DirectiveType::new_include());

        Ok(Schema {
            types: self.types,
            query_type_name,
            mutation_type_name: self.mutation_type_name,
            subscription_type_name: self.subscription_type_name,
            directives,
        })
    }

    fn check_references(&mut self) {
        let mut missing: Vec<String> = Vec::new();
        let check = |referenced: &str, missing: &mut Vec<String>| {
            if !self.types.contains_key(referenced) {
                missing.push(referenced.to_owned());
            }
        };

        for meta_type in self.types.values() {
            match meta_type {
                MetaType::Object(o) => {
                    for field in &o.fields {
                        check(field.field_type.innermost_name(), &mut missing);
                        for argument in &field.arguments {
                            check(argument.arg_type.innermost_name(), &mut missing);
                        }
                    }
                    for interface in &o.interface_names {
                        check(interface, &mut missing);
                    }
                }
                MetaType::Interface(i) => {
                    for field in &i.fields {
                        check(field.field_type.innermost_name(), &mut missing);
                        for argument in &field.arguments {
                            check(argument.arg_type.innermost_name(), &mut missing);
                        }
                    }
                }
                MetaType::Union(u) => {
                    for member in &u.of_type_names {
                        check(member, &mut missing);
                    }
                }
                MetaType::InputObject(io) => {
                    for field in &io.input_fields {
                        check(field.arg_type.innermost_name(), &mut missing);
                    }
                }
                MetaType::Scalar(_) | MetaType::Enum(_) => {}
            }
        }

        missing.sort();
        missing.dedup();
        for name in missing {
            self.errors.push(
                Error::new(format!("Type \"{name}\" is referenced but not registered"))
                    .with_kind(ErrorKind::Validation),
            );
        }
    }
}
