//! Structured errors produced while executing a GraphQL operation.
//!
//! An [`Error`] carries everything the response needs (message, source
//! locations, response path, extensions) plus debugging context that never
//! reaches the response (cause chain, operation tag, classification kind).

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::{position::SourcePosition, value::Value};

/// Additional entries attached to an error response under the `extensions`
/// key. Useful for vendor-specific error data such as error codes.
pub type Extensions = IndexMap<String, Value>;

/// A line number and a column number pointing at the beginning of an
/// associated syntax element. Both are positive numbers starting from 1.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ErrorLocation {
    /// 1-indexed line of the syntax element.
    pub line: u32,

    /// 1-indexed column of the syntax element.
    pub column: u32,
}

impl From<&SourcePosition> for ErrorLocation {
    fn from(position: &SourcePosition) -> Self {
        Self {
            line: position.line as u32 + 1,
            column: position.column as u32 + 1,
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Serialize for ErrorLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("line", &self.line)?;
        map.serialize_entry("column", &self.column)?;
        map.end()
    }
}

/// One key in a [`ResponsePath`]: either a field name or a list index.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum PathSegment {
    /// Index of an element in a list value.
    Index(usize),

    /// Response key of a field in an object value.
    Field(String),
}

/// An append-only trail of keys identifying a location in the response tree.
///
/// Each key is either a field name or a non-negative list index. Cloning
/// produces an independent copy.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct ResponsePath {
    keys: Vec<PathSegment>,
}

impl ResponsePath {
    /// An empty path, pointing at the response root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field name to the end of this path.
    pub fn append_field_name(&mut self, name: impl Into<String>) {
        self.keys.push(PathSegment::Field(name.into()));
    }

    /// Adds a list index to the end of this path.
    pub fn append_index(&mut self, index: usize) {
        self.keys.push(PathSegment::Index(index));
    }

    /// Whether this path points at the response root.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys of this path, in root-to-leaf order.
    pub fn keys(&self) -> &[PathSegment] {
        &self.keys
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for key in &self.keys {
            match key {
                PathSegment::Field(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

impl Serialize for ResponsePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.keys.len()))?;
        for key in &self.keys {
            match key {
                PathSegment::Field(name) => seq.serialize_element(name)?,
                PathSegment::Index(index) => seq.serialize_element(index)?,
            }
        }
        seq.end()
    }
}

/// The class of an [`Error`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorKind {
    /// Unclassified error. This value is not printed in the error message.
    #[default]
    Other,

    /// Failed to coerce input or result values for the desired GraphQL type.
    Coercion,

    /// A syntax error in the GraphQL source.
    Syntax,

    /// An error occurred while validating the document.
    Validation,

    /// An error occurred while executing an operation.
    Execution,

    /// An internal invariant was violated.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Other => "other error",
            Self::Coercion => "coercion error",
            Self::Syntax => "syntax error",
            Self::Validation => "validation error",
            Self::Execution => "execution error",
            Self::Internal => "internal error",
        };
        write!(f, "{s}")
    }
}

/// An error found during the parse, validate or execute phases of performing
/// a GraphQL operation. It can be serialized to JSON for inclusion in the
/// response.
///
/// An [`Error`] can be built by wrapping another one via [`Error::caused_by`];
/// locations, path and extensions that were not set explicitly are then
/// inherited from the cause, and an [`ErrorKind::Other`] kind adopts the
/// cause's kind. Inherited values are copies and share no mutable state with
/// the cause.
#[derive(Clone, Debug)]
pub struct Error {
    message: String,
    locations: Vec<ErrorLocation>,
    path: Option<ResponsePath>,
    extensions: Option<Extensions>,
    cause: Option<Box<Error>>,
    op: Option<String>,
    kind: ErrorKind,
}

impl Error {
    /// Constructs a new [`Error`] with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        debug_assert!(!message.is_empty(), "error message must not be empty");

        Self {
            message,
            locations: Vec::new(),
            path: None,
            extensions: None,
            cause: None,
            op: None,
            kind: ErrorKind::Other,
        }
    }

    /// Attaches the location of the given source position.
    #[must_use]
    pub fn at(mut self, position: &SourcePosition) -> Self {
        self.locations.push(position.into());
        self
    }

    /// Replaces the locations of this [`Error`].
    #[must_use]
    pub fn at_locations(mut self, locations: Vec<ErrorLocation>) -> Self {
        self.locations = locations;
        self
    }

    /// Attaches a response path.
    #[must_use]
    pub fn with_path(mut self, path: ResponsePath) -> Self {
        self.path = Some(path);
        self
    }

    /// Attaches extensions data.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Tags this [`Error`] with the operation being performed, usually the
    /// name of the method being invoked. Shows up in the printed error only.
    #[must_use]
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Classifies this [`Error`].
    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Chains `cause` as the underlying error, inheriting its locations, path
    /// and extensions where this [`Error`] has not set them, and its kind when
    /// this [`Error`] is still [`ErrorKind::Other`].
    #[must_use]
    pub fn caused_by(mut self, cause: Error) -> Self {
        if self.locations.is_empty() {
            self.locations = cause.locations.clone();
        }
        if self.path.is_none() {
            self.path = cause.path.clone();
        }
        if self.extensions.is_none() {
            self.extensions = cause.extensions.clone();
        }
        if self.kind == ErrorKind::Other {
            self.kind = cause.kind;
        }
        self.cause = Some(Box::new(cause));
        self
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source locations associated with this error.
    pub fn locations(&self) -> &[ErrorLocation] {
        &self.locations
    }

    /// The path of the response field which experienced the error, if any.
    pub fn path(&self) -> Option<&ResponsePath> {
        self.path.as_ref()
    }

    /// The extensions data, if any.
    pub fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// The underlying error that triggered this one, if any.
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// The class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn set_locations(&mut self, locations: Vec<ErrorLocation>) {
        self.locations = locations;
    }

    pub(crate) fn set_path(&mut self, path: ResponsePath) {
        self.path = Some(path);
    }

    pub(crate) fn ensure_kind(&mut self, kind: ErrorKind) {
        if self.kind == ErrorKind::Other {
            self.kind = kind;
        }
    }

    fn print_error(&self, b: &mut String, next: Option<&Error>) {
        let initial_len = b.len();

        // pad appends str to the buffer if the buffer already has some data.
        fn pad(b: &mut String, initial_len: usize, str: &str) {
            if b.len() == initial_len {
                return;
            }
            b.push_str(str);
        }

        if let Some(op) = &self.op {
            b.push_str(op);
        }

        if !self.message.is_empty() {
            pad(b, initial_len, ": ");
            b.push_str(&self.message);
        }

        if !self.locations.is_empty() {
            // Don't print locations if the enclosing error already did.
            if next.is_none_or(|n| n.locations != self.locations) {
                if b.len() == initial_len {
                    b.push_str("At ");
                } else {
                    b.push_str(" at ");
                }
                b.push('[');
                for (i, location) in self.locations.iter().enumerate() {
                    if i > 0 {
                        b.push_str(", ");
                    }
                    b.push_str(&location.to_string());
                }
                b.push(']');
            }
        }

        if let Some(path) = &self.path {
            // Don't print the path if the enclosing error already did.
            if next.is_none_or(|n| n.path.as_ref() != Some(path)) {
                if b.len() == initial_len {
                    b.push_str("For ");
                } else {
                    b.push_str(" for ");
                }
                b.push_str("response field in the path ");
                b.push_str(&path.to_string());
            }
        }

        if self.kind != ErrorKind::Other {
            // Don't print the kind if the enclosing error has the same one.
            if next.is_none_or(|n| n.kind != self.kind) {
                pad(b, initial_len, ": ");
                b.push_str(&self.kind.to_string());
            }
        }

        if let Some(extensions) = &self.extensions {
            if !extensions.is_empty()
                && next.is_none_or(|n| n.extensions.as_ref() != Some(extensions))
            {
                pad(b, initial_len, " (additional info: ");
                for (i, (k, v)) in extensions.iter().enumerate() {
                    if i > 0 {
                        b.push_str(", ");
                    }
                    b.push_str(k);
                    b.push_str(": ");
                    b.push_str(&v.to_string());
                }
                b.push(')');
            }
        }

        if let Some(cause) = &self.cause {
            // Indent on a new line when cascading a structured error.
            pad(b, initial_len, ":\n  ");
            cause.print_error(b, Some(self));
        }
    }
}

/// Equality used for error dedup: structural on locations, path, extensions
/// and kind.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.locations == other.locations
            && self.path == other.path
            && self.extensions == other.extensions
            && self.kind == other.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b = String::new();
        self.print_error(&mut b, None);
        write!(f, "{b}")
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as _)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("message", &self.message)?;

        if !self.locations.is_empty() {
            map.serialize_entry("locations", &self.locations)?;
        }

        if let Some(path) = &self.path {
            map.serialize_entry("path", path)?;
        }

        if let Some(extensions) = &self.extensions {
            if !extensions.is_empty() {
                map.serialize_entry("extensions", extensions)?;
            }
        }

        map.end()
    }
}
