//! Atom tree representation for ldf documents.
//!
//! ldf is a small S-expression data format: `(:key value ...)` objects,
//! `#(...)` arrays, `"raw strings"`, numbers, `t`, `nil`, and bare symbols.
//! This crate parses a byte buffer into a [`Document`] of owned [`Atom`] trees.
//!
//! ```
//! let doc = ldf_tree::parse("(:name \"ldf\" :tags #(fast small)) ; config").unwrap();
//! assert_eq!(doc.len(), 1);
//! assert_eq!(doc[0].get("name").and_then(|a| a.as_str()), Some("ldf"));
//! assert_eq!(doc[0].get("tags[1]").and_then(|a| a.as_symbol()), Some("small"));
//! ```

mod atom;
mod diagnostic;
mod error;
mod parser;

pub use atom::{Array, Atom, AtomKind, Object, Pair};
pub use error::{ParseError, ParseErrorKind};
pub use ldf_tokenizer::Span;
pub use parser::{DEFAULT_MAX_DEPTH, ParseOptions, Parser};

/// Parse every atom in `source`.
///
/// The result is all-or-nothing: on error no atoms are returned and none are
/// left allocated.
pub fn parse(source: &(impl AsRef<[u8]> + ?Sized)) -> Result<Document, ParseError> {
    Parser::new(source).parse_document()
}

/// Parse every atom in `source` with the given options.
pub fn parse_with(
    source: &(impl AsRef<[u8]> + ?Sized),
    options: ParseOptions,
) -> Result<Document, ParseError> {
    Parser::with_options(source, options).parse_document()
}

/// Parse a single atom from the start of `source`.
///
/// Leading whitespace and comments are skipped; anything after the atom is
/// not examined.
pub fn parse_atom(source: &(impl AsRef<[u8]> + ?Sized)) -> Result<Atom, ParseError> {
    Parser::new(source).parse_atom()
}

/// A parsed ldf document: the top-level atoms in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// The top-level atoms.
    pub atoms: Vec<Atom>,
}

impl Document {
    /// Parse an ldf document.
    pub fn parse(source: &(impl AsRef<[u8]> + ?Sized)) -> Result<Self, ParseError> {
        parse(source)
    }

    /// Number of top-level atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the document has no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Get a top-level atom by index.
    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Iterate over the top-level atoms.
    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.atoms.iter()
    }

    /// Take ownership of the top-level atoms.
    pub fn into_atoms(self) -> Vec<Atom> {
        self.atoms
    }

    /// Release every atom in the document.
    pub fn release(self) {
        drop(self)
    }
}

impl std::ops::Index<usize> for Document {
    type Output = Atom;

    fn index(&self, index: usize) -> &Atom {
        &self.atoms[index]
    }
}

impl IntoIterator for Document {
    type Item = Atom;
    type IntoIter = std::vec::IntoIter<Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}
