//! Token types for the ldf scanner.

use crate::Span;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Structural tokens
    /// `(`
    OpenObject,
    /// `)`
    CloseObject,
    /// `"` (only the quote; the body is scanned by the grammar)
    OpenString,
    /// `#`
    OpenArray,
    /// Raw bytes between a pair of quotes, produced by
    /// [`Tokenizer::scan_string_body`](crate::Tokenizer::scan_string_body)
    StringBody,

    // Symbol-class runs
    /// A run starting with `:`, e.g. `:name`
    Key,
    /// Any other run: `t`, `nil`, `42`, `hello-world`
    Primitive,

    /// End of input
    Eof,
}

/// A token with its kind, span, and source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in the source buffer.
    pub span: Span,
    /// The source bytes of this token.
    pub text: &'src [u8],
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, text: &'src [u8]) -> Self {
        Self { kind, span, text }
    }

    /// The token text as `str`.
    ///
    /// Symbol runs are always ASCII; string bodies may not be valid UTF-8, in
    /// which case this returns an empty string.
    pub fn as_str(&self) -> &'src str {
        std::str::from_utf8(self.text).unwrap_or_default()
    }
}
