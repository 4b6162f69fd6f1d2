//! Tokenizer for the ldf data format.

use std::fmt;

use crate::{Span, Token, TokenKind};
use tracing::trace;

/// Largest source buffer a [`Tokenizer`] accepts. Spans are `u32` offsets.
pub const MAX_SOURCE_LEN: usize = u32::MAX as usize;

/// A tokenizer that produces tokens from an ldf source buffer.
///
/// The buffer is never mutated; only the position advances. A buffer longer
/// than [`MAX_SOURCE_LEN`] yields a single [`LexErrorKind::InputTooLarge`].
#[derive(Clone)]
pub struct Tokenizer<'src> {
    /// The source buffer being tokenized.
    source: &'src [u8],
    /// Current byte position in `source`.
    pos: u32,
    /// `source` does not fit in `u32` offsets; nothing is scanned.
    oversized: bool,

    /// Iterator state: the last yielded token opened a string.
    in_string: bool,
    /// Iterator state: `Eof` or an error has been yielded.
    finished: bool,
}

/// Why the scanner could not produce a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A byte outside the legal character set where a token was expected.
    UnexpectedChar(u8),
    /// Input ended before the closing `"` of a string.
    UnterminatedString,
    /// The buffer is longer than [`MAX_SOURCE_LEN`].
    InputTooLarge,
}

/// A scanner error with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// The offending byte, or the unterminated string body.
    pub span: Span,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LexErrorKind::UnexpectedChar(byte) if byte.is_ascii_graphic() => {
                write!(f, "unexpected character `{}`", byte as char)
            }
            LexErrorKind::UnexpectedChar(byte) => {
                write!(f, "unexpected byte 0x{byte:02x}")
            }
            LexErrorKind::UnterminatedString => write!(f, "unterminated string"),
            LexErrorKind::InputTooLarge => {
                return write!(f, "input larger than {MAX_SOURCE_LEN} bytes");
            }
        }?;
        write!(f, " at offset {}", self.span.start)
    }
}

impl std::error::Error for LexError {}

impl<'src> Tokenizer<'src> {
    /// Create a new tokenizer for the given source buffer.
    pub fn new(source: &'src (impl AsRef<[u8]> + ?Sized)) -> Self {
        let source = source.as_ref();
        Self {
            source,
            pos: 0,
            oversized: !fits_in_span(source.len()),
            in_string: false,
            finished: false,
        }
    }

    /// The whole source buffer.
    #[inline]
    pub fn source(&self) -> &'src [u8] {
        self.source
    }

    /// Get the current byte position.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Check if we're at the end of input.
    #[inline]
    pub fn is_eof(&self) -> bool {
        !self.oversized && self.pos as usize >= self.source.len()
    }

    fn too_large(&self) -> LexError {
        LexError {
            kind: LexErrorKind::InputTooLarge,
            span: Span::empty(0),
        }
    }

    #[inline]
    fn remaining(&self) -> &'src [u8] {
        &self.source[self.pos as usize..]
    }

    /// Peek at the next byte without consuming it.
    #[inline]
    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos as usize).copied()
    }

    /// Advance by n bytes.
    #[inline]
    fn advance_by(&mut self, n: usize) {
        self.pos += n as u32;
    }

    /// Create a token from the given start position to current position.
    fn token(&self, kind: TokenKind, start: u32) -> Token<'src> {
        let span = Span::new(start, self.pos);
        let text = span.slice(self.source);
        trace!(
            "Token {:?} at {:?}: {:?}",
            kind,
            span,
            String::from_utf8_lossy(text)
        );
        Token::new(kind, span, text)
    }

    /// Skip whitespace and `;` line comments.
    ///
    /// A comment runs up to, but not including, the next `\n` or `\r`.
    pub fn skip_trivia(&mut self) {
        if self.oversized {
            return;
        }
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.advance_by(1),
                b';' => {
                    let rest = self.remaining();
                    let len = memchr::memchr2(b'\n', b'\r', rest).unwrap_or(rest.len());
                    self.advance_by(len);
                }
                _ => break,
            }
        }
    }

    /// Get the next token.
    ///
    /// Leading trivia is skipped. At end of input an [`TokenKind::Eof`]
    /// token is returned (repeatedly, if asked again).
    pub fn next_token(&mut self) -> Result<Token<'src>, LexError> {
        if self.oversized {
            return Err(self.too_large());
        }
        self.skip_trivia();

        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, start));
        };

        let kind = match b {
            b'(' => TokenKind::OpenObject,
            b')' => TokenKind::CloseObject,
            b'"' => TokenKind::OpenString,
            b'#' => TokenKind::OpenArray,
            _ if is_symbol_byte(b) => return Ok(self.tokenize_symbol_run()),
            _ => {
                return Err(LexError {
                    kind: LexErrorKind::UnexpectedChar(b),
                    span: Span::new(start, start + 1),
                });
            }
        };
        self.advance_by(1);
        Ok(self.token(kind, start))
    }

    /// Tokenize a maximal run of symbol bytes.
    fn tokenize_symbol_run(&mut self) -> Token<'src> {
        let start = self.pos;
        let kind = if self.peek() == Some(b':') {
            TokenKind::Key
        } else {
            TokenKind::Primitive
        };
        let len = self
            .remaining()
            .iter()
            .position(|&b| !is_symbol_byte(b))
            .unwrap_or(self.remaining().len());
        self.advance_by(len);
        self.token(kind, start)
    }

    /// Scan the raw body of a string whose opening `"` was just consumed.
    ///
    /// Bytes are taken verbatim up to the next `"`, which is consumed but not
    /// included. There are no escape sequences.
    pub fn scan_string_body(&mut self) -> Result<Token<'src>, LexError> {
        if self.oversized {
            return Err(self.too_large());
        }
        let start = self.pos;
        let rest = self.remaining();
        match memchr::memchr(b'"', rest) {
            Some(len) => {
                self.advance_by(len);
                let token = self.token(TokenKind::StringBody, start);
                self.advance_by(1);
                Ok(token)
            }
            None => {
                self.advance_by(rest.len());
                Err(LexError {
                    kind: LexErrorKind::UnterminatedString,
                    span: Span::new(start, self.pos),
                })
            }
        }
    }
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = Result<Token<'src>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = if self.in_string {
            self.in_string = false;
            self.scan_string_body()
        } else {
            self.next_token()
        };
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => {
                self.finished = true;
                return None;
            }
            Ok(token) => self.in_string = token.kind == TokenKind::OpenString,
            Err(_) => self.finished = true,
        }
        Some(result)
    }
}

fn fits_in_span(len: usize) -> bool {
    len <= MAX_SOURCE_LEN
}

/// Check if a byte can appear in a symbol run.
///
/// ASCII letters and digits, plus `- + * / @ $ % & = < > . _ ~ ? ! [ ] { } ^ :`.
pub fn is_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'+'
                | b'*'
                | b'/'
                | b'@'
                | b'$'
                | b'%'
                | b'&'
                | b'='
                | b'<'
                | b'>'
                | b'.'
                | b'_'
                | b'~'
                | b'?'
                | b'!'
                | b'['
                | b']'
                | b'{'
                | b'}'
                | b'^'
                | b':'
        )
}
