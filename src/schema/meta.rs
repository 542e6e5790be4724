//! Types used to describe a GraphQL schema.

use std::sync::Arc;

use arcstr::ArcStr;
use derive_more::with_trait::Debug;

use crate::{
    ast::Type,
    error::{Error, ErrorKind},
    executor::Resolver,
    value::{ScalarValue, Value},
};

/// Whether an item is deprecated, with context.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum DeprecationStatus {
    /// The field/variant is not deprecated.
    #[default]
    Current,

    /// The field/variant is deprecated, with an optional reason.
    Deprecated(Option<ArcStr>),
}

impl DeprecationStatus {
    /// If this deprecation status indicates the item is deprecated.
    pub fn is_deprecated(&self) -> bool {
        match self {
            Self::Current => false,
            Self::Deprecated(_) => true,
        }
    }

    /// An optional reason for the deprecation, or none if `Current`.
    pub fn reason(&self) -> Option<&ArcStr> {
        match self {
            Self::Current => None,
            Self::Deprecated(rsn) => rsn.as_ref(),
        }
    }
}

/// Shortcut for an input value coercion function of a scalar type.
pub type InputCoercionFn = fn(&Value) -> Result<Value, Error>;

/// Shortcut for a result value coercion function of a scalar type.
pub type ResultCoercionFn = fn(&Value) -> Result<Value, Error>;

/// Shortcut for a function resolving the concrete object type name of an
/// abstract-typed value.
pub type TypeResolverFn = Arc<dyn Fn(&Value) -> Option<ArcStr> + Send + Sync>;

/// Shortcut for a function probing whether a value belongs to an object type.
pub type TypeProbeFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Scalar type metadata
#[derive(Debug)]
pub struct ScalarMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[debug(ignore)]
    coerce_input_fn: InputCoercionFn,
    #[debug(ignore)]
    coerce_result_fn: ResultCoercionFn,
}

impl ScalarMeta {
    /// Builds a new [`ScalarMeta`] type with the specified `name` and
    /// coercion functions.
    pub fn new(
        name: impl Into<ArcStr>,
        coerce_input: InputCoercionFn,
        coerce_result: ResultCoercionFn,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            coerce_input_fn: coerce_input,
            coerce_result_fn: coerce_result,
        }
    }

    /// The built-in `Int` scalar.
    pub fn int() -> Self {
        Self::new(arcstr::literal!("Int"), coerce_int, coerce_int)
    }

    /// The built-in `Float` scalar.
    pub fn float() -> Self {
        Self::new(arcstr::literal!("Float"), coerce_float, coerce_float)
    }

    /// The built-in `String` scalar.
    pub fn string() -> Self {
        Self::new(arcstr::literal!("String"), coerce_string, coerce_string)
    }

    /// The built-in `Boolean` scalar.
    pub fn boolean() -> Self {
        Self::new(arcstr::literal!("Boolean"), coerce_boolean, coerce_boolean)
    }

    /// The built-in `ID` scalar.
    pub fn id() -> Self {
        Self::new(arcstr::literal!("ID"), coerce_id, coerce_id)
    }

    /// Sets the `description` of this [`ScalarMeta`] type.
    ///
    /// Overwrites any previously set description.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Coerces an input value for this scalar.
    pub fn coerce_input(&self, value: &Value) -> Result<Value, Error> {
        (self.coerce_input_fn)(value)
    }

    /// Coerces a result value for this scalar.
    pub fn coerce_result(&self, value: &Value) -> Result<Value, Error> {
        (self.coerce_result_fn)(value)
    }

    /// Wraps this [`ScalarMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Scalar(self)
    }
}

fn coercion_failure(message: String) -> Error {
    Error::new(message).with_kind(ErrorKind::Coercion)
}

fn coerce_int(value: &Value) -> Result<Value, Error> {
    match value.as_scalar() {
        Some(ScalarValue::Int(i)) => Ok(Value::scalar(*i)),
        _ => Err(coercion_failure(format!(
            "Int cannot represent non-integer value: {value}"
        ))),
    }
}

fn coerce_float(value: &Value) -> Result<Value, Error> {
    match value.as_scalar().and_then(ScalarValue::as_float) {
        Some(f) => Ok(Value::scalar(f)),
        None => Err(coercion_failure(format!(
            "Float cannot represent non-numeric value: {value}"
        ))),
    }
}

fn coerce_string(value: &Value) -> Result<Value, Error> {
    match value.as_string_value() {
        Some(s) => Ok(Value::scalar(s)),
        None => Err(coercion_failure(format!(
            "String cannot represent a non-string value: {value}"
        ))),
    }
}

fn coerce_boolean(value: &Value) -> Result<Value, Error> {
    match value.as_scalar().and_then(ScalarValue::as_bool) {
        Some(b) => Ok(Value::scalar(b)),
        None => Err(coercion_failure(format!(
            "Boolean cannot represent a non-boolean value: {value}"
        ))),
    }
}

fn coerce_id(value: &Value) -> Result<Value, Error> {
    match value.as_scalar() {
        Some(ScalarValue::String(s)) => Ok(Value::scalar(s.as_str())),
        Some(ScalarValue::Int(i)) => Ok(Value::scalar(i.to_string())),
        _ => Err(coercion_failure(format!("ID cannot represent value: {value}"))),
    }
}

/// Metadata of a single value of an enum type.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EnumValue {
    /// Name of the value, as it appears in documents and responses.
    pub name: ArcStr,
    /// Optional description.
    pub description: Option<ArcStr>,
    /// Whether the value is deprecated.
    pub deprecation_status: DeprecationStatus,
}

impl EnumValue {
    /// Builds a new [`EnumValue`] with the given `name`.
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation_status: DeprecationStatus::Current,
        }
    }

    /// Sets the `description` of this [`EnumValue`].
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks this [`EnumValue`] as deprecated.
    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation_status = DeprecationStatus::Deprecated(reason.map(Into::into));
        self
    }
}

/// Enum type metadata
#[derive(Debug)]
pub struct EnumMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub values: Vec<EnumValue>,
}

impl EnumMeta {
    /// Builds a new [`EnumMeta`] type with the specified `name` and possible
    /// `values`.
    pub fn new(name: impl Into<ArcStr>, values: Vec<EnumValue>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values,
        }
    }

    /// Sets the `description` of this [`EnumMeta`] type.
    ///
    /// Overwrites any previously set description.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The names of the declared values, in declaration order.
    pub fn value_names(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.to_string()).collect()
    }

    /// Coerces an input value for this enum: the value must be the name of
    /// one of the declared values.
    pub fn coerce_input(&self, value: &Value) -> Result<Value, Error> {
        self.coerce(value)
    }

    /// Coerces a result value for this enum.
    pub fn coerce_result(&self, value: &Value) -> Result<Value, Error> {
        self.coerce(value)
    }

    fn coerce(&self, value: &Value) -> Result<Value, Error> {
        value
            .as_string_value()
            .filter(|name| self.values.iter().any(|v| v.name.as_str() == *name))
            .map(Value::scalar)
            .ok_or_else(|| {
                coercion_failure(format!(
                    "Enum \"{}\" cannot represent value: {value}",
                    self.name
                ))
            })
    }

    /// Wraps this [`EnumMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Enum(self)
    }
}

/// An argument of a field or a directive, or a field of an input object.
#[derive(Clone, Debug)]
pub struct Argument {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub arg_type: Type,
    #[doc(hidden)]
    pub default_value: Option<Value>,
}

impl Argument {
    /// Builds a new [`Argument`] of the given `arg_type`.
    pub fn new(name: impl Into<ArcStr>, arg_type: Type) -> Self {
        Self {
            name: name.into(),
            description: None,
            arg_type,
            default_value: None,
        }
    }

    /// Sets the `description` of this [`Argument`].
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the default value applied when this [`Argument`] is not provided.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// A field of an object or interface type.
#[derive(Clone, Debug)]
pub struct Field {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub arguments: Vec<Argument>,
    #[doc(hidden)]
    pub field_type: Type,
    #[doc(hidden)]
    pub deprecation_status: DeprecationStatus,
    #[debug(ignore)]
    resolver: Option<Arc<dyn Resolver>>,
}

impl Field {
    /// Builds a new [`Field`] of the given `field_type`.
    pub fn new(name: impl Into<ArcStr>, field_type: Type) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            field_type,
            deprecation_status: DeprecationStatus::Current,
            resolver: None,
        }
    }

    /// Sets the `description` of this [`Field`].
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an [`Argument`] to this [`Field`].
    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Marks this [`Field`] as deprecated.
    #[must_use]
    pub fn deprecated(mut self, reason: Option<&str>) -> Self {
        self.deprecation_status = DeprecationStatus::Deprecated(reason.map(Into::into));
        self
    }

    /// Attaches the resolver invoked to produce this [`Field`]'s value.
    ///
    /// Fields without a resolver fall back to the default property resolver,
    /// which reads the equally-named property of the source value.
    #[must_use]
    pub fn resolve_with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// The resolver attached to this [`Field`], if any.
    pub fn resolver(&self) -> Option<&dyn Resolver> {
        self.resolver.as_deref()
    }
}

/// Object type metadata
#[derive(Debug)]
pub struct ObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub fields: Vec<Field>,
    #[doc(hidden)]
    pub interface_names: Vec<ArcStr>,
    #[debug(ignore)]
    is_type_of: Option<TypeProbeFn>,
}

impl ObjectMeta {
    /// Builds a new [`ObjectMeta`] type with the specified `name` and
    /// `fields`.
    pub fn new(name: impl Into<ArcStr>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
            interface_names: Vec::new(),
            is_type_of: None,
        }
    }

    /// Sets the `description` of this [`ObjectMeta`] type.
    ///
    /// Overwrites any previously set description.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the `interfaces` this [`ObjectMeta`] type implements.
    ///
    /// Overwrites any previously set list of interfaces.
    #[must_use]
    pub fn interfaces(mut self, interfaces: &[ArcStr]) -> Self {
        self.interface_names = interfaces.to_vec();
        self
    }

    /// Attaches a probe deciding whether an abstract-typed value belongs to
    /// this [`ObjectMeta`] type. Consulted when the abstract type carries no
    /// type resolver of its own.
    #[must_use]
    pub fn type_probe(mut self, probe: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.is_type_of = Some(Arc::new(probe));
        self
    }

    /// Looks up a field by `name`.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    /// Probes whether `value` belongs to this type, when a probe is attached.
    pub fn probe_type(&self, value: &Value) -> Option<bool> {
        self.is_type_of.as_ref().map(|f| f(value))
    }

    /// Wraps this [`ObjectMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Object(self)
    }
}

/// Interface type metadata
#[derive(Debug)]
pub struct InterfaceMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub fields: Vec<Field>,
    #[debug(ignore)]
    resolve_type: Option<TypeResolverFn>,
}

impl InterfaceMeta {
    /// Builds a new [`InterfaceMeta`] type with the specified `name` and
    /// `fields`.
    pub fn new(name: impl Into<ArcStr>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
            resolve_type: None,
        }
    }

    /// Sets the `description` of this [`InterfaceMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches the resolver producing the concrete object type name for a
    /// value of this interface.
    #[must_use]
    pub fn type_resolver(
        mut self,
        resolver: impl Fn(&Value) -> Option<ArcStr> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(resolver));
        self
    }

    /// Looks up a field by `name`.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    /// Resolves the concrete type name for `value`, when a resolver is
    /// attached.
    pub fn resolve_type(&self, value: &Value) -> Option<ArcStr> {
        self.resolve_type.as_ref().and_then(|f| f(value))
    }

    /// Wraps this [`InterfaceMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Interface(self)
    }
}

/// Union type metadata
#[derive(Debug)]
pub struct UnionMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub of_type_names: Vec<ArcStr>,
    #[debug(ignore)]
    resolve_type: Option<TypeResolverFn>,
}

impl UnionMeta {
    /// Builds a new [`UnionMeta`] type of the given member type names.
    pub fn new(name: impl Into<ArcStr>, of_type_names: Vec<ArcStr>) -> Self {
        Self {
            name: name.into(),
            description: None,
            of_type_names,
            resolve_type: None,
        }
    }

    /// Sets the `description` of this [`UnionMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches the resolver producing the concrete object type name for a
    /// value of this union.
    #[must_use]
    pub fn type_resolver(
        mut self,
        resolver: impl Fn(&Value) -> Option<ArcStr> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(resolver));
        self
    }

    /// Resolves the concrete type name for `value`, when a resolver is
    /// attached.
    pub fn resolve_type(&self, value: &Value) -> Option<ArcStr> {
        self.resolve_type.as_ref().and_then(|f| f(value))
    }

    /// Wraps this [`UnionMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::Union(self)
    }
}

/// Input object metadata
#[derive(Debug)]
pub struct InputObjectMeta {
    #[doc(hidden)]
    pub name: ArcStr,
    #[doc(hidden)]
    pub description: Option<ArcStr>,
    #[doc(hidden)]
    pub input_fields: Vec<Argument>,
}

impl InputObjectMeta {
    /// Builds a new [`InputObjectMeta`] type with the specified `name` and
    /// `input_fields`.
    pub fn new(name: impl Into<ArcStr>, input_fields: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_fields,
        }
    }

    /// Sets the `description` of this [`InputObjectMeta`] type.
    #[must_use]
    pub fn description(mut self, description: impl Into<ArcStr>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Looks up an input field by `name`.
    pub fn input_field_by_name(&self, name: &str) -> Option<&Argument> {
        self.input_fields.iter().find(|f| f.name.as_str() == name)
    }

    /// Wraps this [`InputObjectMeta`] type into a generic [`MetaType`].
    pub fn into_meta(self) -> MetaType {
        MetaType::InputObject(self)
    }
}

/// Generic type metadata
#[derive(Debug)]
#[allow(missing_docs)]
pub enum MetaType {
    Scalar(ScalarMeta),
    Enum(EnumMeta),
    Object(ObjectMeta),
    Interface(InterfaceMeta),
    Union(UnionMeta),
    InputObject(InputObjectMeta),
}

impl MetaType {
    /// The name of this type.
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Scalar(ScalarMeta { name, .. })
            | Self::Enum(EnumMeta { name, .. })
            | Self::Object(ObjectMeta { name, .. })
            | Self::Interface(InterfaceMeta { name, .. })
            | Self::Union(UnionMeta { name, .. })
            | Self::InputObject(InputObjectMeta { name, .. }) => name,
        }
    }

    /// Whether values of this type are serialized directly to scalars.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }

    /// Whether this type is a union or an interface.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// Whether this type can appear in input positions.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }

    /// Views this type as an object type, if it is one.
    pub fn as_object(&self) -> Option<&ObjectMeta> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Looks up an output field by `name` on an object or interface type.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Object(o) => o.field_by_name(name),
            Self::Interface(i) => i.field_by_name(name),
            _ => None,
        }
    }
}
