//! Source positions attached to AST nodes.
//!
//! The engine does not parse documents itself, and it never slices source
//! text: the only thing it does with a position is cite it in an error, as
//! the location of the blamed syntax element. So a position is just a line
//! and a column, assigned by whatever produced the AST, and an AST node is
//! an item paired with the position of its first character.

/// A line and column in the requested document, both zero-based.
///
/// Error responses report locations 1-indexed; the shift happens when a
/// position is turned into an [`ErrorLocation`](crate::ErrorLocation).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SourcePosition {
    /// Zero-based line of the element.
    pub line: usize,

    /// Zero-based column of the element.
    pub column: usize,
}

impl SourcePosition {
    /// Builds a new [`SourcePosition`].
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The position of the first character of a document.
    ///
    /// Also used for nodes built without position information, so that every
    /// cited location stays a valid one.
    pub fn origin() -> Self {
        Self::default()
    }
}

/// An AST item together with the source position of its first character.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Positioned<T> {
    /// The wrapped item.
    pub item: T,

    /// Position of the item's first character.
    pub position: SourcePosition,
}

impl<T> Positioned<T> {
    /// Wraps `item` with the given `position`.
    pub fn new(item: T, position: SourcePosition) -> Self {
        Self { item, position }
    }

    /// Wraps `item` at the document origin, for nodes built without position
    /// information.
    pub fn unlocated(item: T) -> Self {
        Self::new(item, SourcePosition::origin())
    }
}
