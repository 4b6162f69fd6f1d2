//! Parse errors.

use ldf_tokenizer::{LexError, LexErrorKind, Span, Token};

/// The kind of a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// An allocation could not be satisfied.
    OutOfMemory,
    /// A byte outside the legal character set where a token was expected.
    UnexpectedChar,
    /// Input ended inside a token, string, or container.
    UnexpectedEof,
    /// A valid token where the grammar does not allow it.
    UnexpectedToken,
    /// Reserved; the grammar never produces it.
    Unknown,
    /// Containers nested deeper than [`ParseOptions::max_depth`](crate::ParseOptions::max_depth).
    TooDeep,
    /// The source is longer than [`ldf_tokenizer::MAX_SOURCE_LEN`].
    InputTooLarge,
}

impl ParseErrorKind {
    /// Stable numeric code for this kind. Success is `0`.
    pub fn code(&self) -> i32 {
        match self {
            ParseErrorKind::OutOfMemory => -1,
            ParseErrorKind::UnexpectedChar => -2,
            ParseErrorKind::UnexpectedEof => -3,
            ParseErrorKind::UnexpectedToken => -4,
            ParseErrorKind::Unknown => -5,
            ParseErrorKind::TooDeep => -6,
            ParseErrorKind::InputTooLarge => -7,
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            ParseErrorKind::OutOfMemory => "out of memory",
            ParseErrorKind::UnexpectedChar => "unexpected character",
            ParseErrorKind::UnexpectedEof => "unexpected end of input",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::Unknown => "unknown error",
            ParseErrorKind::TooDeep => "nesting too deep",
            ParseErrorKind::InputTooLarge => "input too large",
        };
        f.write_str(message)
    }
}

/// A parse error with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Where the error was detected.
    pub span: Span,
    /// The opening `(`, `#` or `"` of the construct left unclosed, for
    /// end-of-input errors.
    pub opened_at: Option<Span>,
    /// What the grammar wanted instead, for unexpected tokens.
    pub expected: Option<&'static str>,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            opened_at: None,
            expected: None,
        }
    }

    pub(crate) fn out_of_memory(span: Span) -> Self {
        Self::new(ParseErrorKind::OutOfMemory, span)
    }

    /// A token the grammar did not allow here. `Eof` tokens become
    /// [`ParseErrorKind::UnexpectedEof`].
    pub(crate) fn unexpected(token: &Token<'_>, expected: &'static str) -> Self {
        let kind = match token.kind {
            ldf_tokenizer::TokenKind::Eof => ParseErrorKind::UnexpectedEof,
            _ => ParseErrorKind::UnexpectedToken,
        };
        Self {
            expected: Some(expected),
            ..Self::new(kind, token.span)
        }
    }

    /// Record the construct an end-of-input error happened inside.
    ///
    /// The innermost construct wins: an already recorded opener is kept.
    pub(crate) fn inside(mut self, opener: Span) -> Self {
        if self.kind == ParseErrorKind::UnexpectedEof && self.opened_at.is_none() {
            self.opened_at = Some(opener);
        }
        self
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        match err.kind {
            LexErrorKind::UnexpectedChar(_) => {
                ParseError::new(ParseErrorKind::UnexpectedChar, err.span)
            }
            LexErrorKind::UnterminatedString => {
                ParseError::new(ParseErrorKind::UnexpectedEof, Span::empty(err.span.end))
            }
            LexErrorKind::InputTooLarge => ParseError::new(ParseErrorKind::InputTooLarge, err.span),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(expected) = self.expected {
            write!(f, " ({expected})")?;
        }
        write!(f, " at offset {}", self.span.start)
    }
}

impl std::error::Error for ParseError {}
