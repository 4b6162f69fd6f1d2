//! Recursive-descent parser from tokens to atoms.
//!
//! Each production owns the container it is building as a local. An error
//! returned through `?` drops that local, and with it every child already
//! appended, so a failed parse never hands back or keeps a partial tree.

use ldf_tokenizer::{Span, Token, TokenKind, Tokenizer};
use tracing::{debug, trace};

use crate::Document;
use crate::atom::{Array, Atom, Object, Pair};
use crate::error::{ParseError, ParseErrorKind};

/// Capacity of a container's first allocation; later growth doubles it.
const INITIAL_CAPACITY: usize = 8;

/// Default nesting limit. Deeper documents fail with [`ParseErrorKind::TooDeep`]
/// instead of exhausting the stack.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest allowed container nesting. A top-level object or array is at
    /// depth 1.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Limit container nesting to `depth`.
    ///
    /// Each level of nesting costs a few stack frames; very large limits can
    /// overflow the stack of the parsing thread.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// A parser over one source buffer.
///
/// The buffer only needs to outlive the parser; parsed atoms own copies of
/// all their text.
pub struct Parser<'src> {
    tokenizer: Tokenizer<'src>,
    options: ParseOptions,
}

impl<'src> Parser<'src> {
    /// Create a parser with default options.
    pub fn new(source: &'src (impl AsRef<[u8]> + ?Sized)) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    /// Create a parser with the given options.
    pub fn with_options(source: &'src (impl AsRef<[u8]> + ?Sized), options: ParseOptions) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            options,
        }
    }

    /// Parse every remaining top-level atom.
    ///
    /// On error, all atoms parsed so far are released before returning.
    pub fn parse_document(mut self) -> Result<Document, ParseError> {
        let mut atoms = Vec::new();
        while let Some(atom) = self
            .next_atom()
            .inspect_err(|err| debug!(%err, released = atoms.len(), "parse failed"))?
        {
            try_push(&mut atoms, atom, Span::empty(self.tokenizer.position()))?;
        }
        debug!(atoms = atoms.len(), "parsed document");
        Ok(Document { atoms })
    }

    /// Parse the next top-level atom, or `None` at end of input.
    ///
    /// After an error the parser's position is unspecified; start a new
    /// parser rather than continuing.
    pub fn next_atom(&mut self) -> Result<Option<Atom>, ParseError> {
        self.tokenizer.skip_trivia();
        if self.tokenizer.is_eof() {
            return Ok(None);
        }
        self.parse_value(0).map(Some)
    }

    /// Parse exactly one atom. End of input is an error.
    pub fn parse_atom(&mut self) -> Result<Atom, ParseError> {
        self.parse_value(0)
    }

    fn parse_value(&mut self, depth: usize) -> Result<Atom, ParseError> {
        let token = self.next_token()?;
        self.atom_from(token, depth)
    }

    fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        Ok(self.tokenizer.next_token()?)
    }

    /// Build the atom that `token` starts.
    fn atom_from(&mut self, token: Token<'src>, depth: usize) -> Result<Atom, ParseError> {
        match token.kind {
            TokenKind::OpenObject => self.parse_object(token.span, depth + 1),
            TokenKind::OpenArray => self.parse_array(token.span, depth + 1),
            TokenKind::OpenString => self.parse_string(token.span),
            TokenKind::Primitive => parse_primitive(&token),
            TokenKind::Key => Ok(Atom::Symbol(copy_str(token.as_str(), token.span)?)),
            TokenKind::CloseObject | TokenKind::StringBody | TokenKind::Eof => {
                Err(ParseError::unexpected(&token, "expected a value"))
            }
        }
    }

    fn check_depth(&self, depth: usize, opener: Span) -> Result<(), ParseError> {
        if depth > self.options.max_depth {
            return Err(ParseError::new(ParseErrorKind::TooDeep, opener));
        }
        Ok(())
    }

    /// `(` was consumed: parse `:key value` pairs up to `)`.
    fn parse_object(&mut self, open: Span, depth: usize) -> Result<Atom, ParseError> {
        self.check_depth(depth, open)?;

        let mut pairs = Vec::new();
        loop {
            let token = self.next_token().map_err(|e| e.inside(open))?;
            match token.kind {
                TokenKind::CloseObject => break,
                TokenKind::Key => {}
                _ => return Err(ParseError::unexpected(&token, "expected a key").inside(open)),
            }

            let key = copy_str(&token.as_str()[1..], token.span)?;
            let value = self.parse_value(depth).map_err(|e| e.inside(open))?;
            try_push(&mut pairs, Pair { key, value }, token.span)?;
        }

        trace!(pairs = pairs.len(), depth, "object");
        Ok(Atom::Object(Object { pairs }))
    }

    /// `#` was consumed: expect `(`, then parse values up to `)`.
    fn parse_array(&mut self, hash: Span, depth: usize) -> Result<Atom, ParseError> {
        self.check_depth(depth, hash)?;

        let token = self.next_token().map_err(|e| e.inside(hash))?;
        if token.kind != TokenKind::OpenObject {
            return Err(ParseError::unexpected(&token, "expected `(` after `#`").inside(hash));
        }
        let open = hash.extend(token.span);

        let mut items = Vec::new();
        loop {
            let token = self.next_token().map_err(|e| e.inside(open))?;
            let span = token.span;
            let item = match token.kind {
                TokenKind::CloseObject => break,
                TokenKind::Eof => {
                    return Err(ParseError::unexpected(&token, "expected `)`").inside(open));
                }
                _ => self.atom_from(token, depth).map_err(|e| e.inside(open))?,
            };
            try_push(&mut items, item, span)?;
        }

        trace!(items = items.len(), depth, "array");
        Ok(Atom::Array(Array { items }))
    }

    /// `"` was consumed: copy raw bytes up to the closing quote.
    fn parse_string(&mut self, open: Span) -> Result<Atom, ParseError> {
        let body = self
            .tokenizer
            .scan_string_body()
            .map_err(|e| ParseError::from(e).inside(open))?;
        Ok(Atom::String(copy_bytes(body.text, body.span)?))
    }
}

/// Resolve a primitive token: `t`, then `nil`, then a number, else a symbol.
fn parse_primitive(token: &Token<'_>) -> Result<Atom, ParseError> {
    let text = token.as_str();
    if text == "t" {
        return Ok(Atom::Boolean(true));
    }
    if text == "nil" {
        return Ok(Atom::Null);
    }
    if let Some(number) = parse_number(text) {
        return Ok(Atom::Number(number));
    }
    Ok(Atom::Symbol(copy_str(text, token.span)?))
}

/// Parse a whole token as a number: decimal (with `inf`/`nan`) or C-style hex.
///
/// `f64::from_str` is locale independent and rejects trailing garbage.
fn parse_number(text: &str) -> Option<f64> {
    text.parse().ok().or_else(|| parse_hex(text))
}

/// Parse `[+-]0x<hex>[.<hex>][p[+-]<dec>]`, the hex form `strtod` accepts.
fn parse_hex(text: &str) -> Option<f64> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let rest = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))?;

    let (mantissa, exponent) = match rest.find(['p', 'P']) {
        Some(at) => (&rest[..at], Some(&rest[at + 1..])),
        None => (rest, None),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut value = 0.0f64;
    for digit in whole.chars().chain(fraction.chars()) {
        value = value * 16.0 + f64::from(digit.to_digit(16)?);
    }

    let mut scale = -4 * i64::try_from(fraction.len()).ok()?;
    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Saturate: anything this large is already 0 or infinity.
        let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX / 2).min(1 << 20);
        scale += if exponent.starts_with('-') { -magnitude } else { magnitude };
    }

    if value != 0.0 {
        // Two steps so a large mantissa with a small exponent does not
        // underflow to zero on the way.
        let scale = i32::try_from(scale).ok()?;
        value *= 2f64.powi(scale / 2);
        value *= 2f64.powi(scale - scale / 2);
    }
    Some(if negative { -value } else { value })
}

/// Append `item`, doubling capacity (starting at [`INITIAL_CAPACITY`]) when full.
fn try_push<T>(items: &mut Vec<T>, item: T, at: Span) -> Result<(), ParseError> {
    if items.len() == items.capacity() {
        let additional = items.capacity().max(INITIAL_CAPACITY);
        items
            .try_reserve_exact(additional)
            .map_err(|_| ParseError::out_of_memory(at))?;
    }
    items.push(item);
    Ok(())
}

fn copy_bytes(bytes: &[u8], at: Span) -> Result<Vec<u8>, ParseError> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(bytes.len())
        .map_err(|_| ParseError::out_of_memory(at))?;
    owned.extend_from_slice(bytes);
    Ok(owned)
}

fn copy_str(text: &str, at: Span) -> Result<String, ParseError> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(text.len())
        .map_err(|_| ParseError::out_of_memory(at))?;
    owned.push_str(text);
    Ok(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(source: &str) -> Result<Atom, ParseError> {
        Parser::new(source).parse_atom()
    }

    fn error_kind(source: &str) -> ParseErrorKind {
        Parser::new(source)
            .parse_document()
            .expect_err("should fail")
            .kind
    }

    #[test]
    fn test_primitives() {
        assert_eq!(atom("nil").unwrap(), Atom::Null);
        assert_eq!(atom("t").unwrap(), Atom::Boolean(true));
        assert_eq!(atom("3.14").unwrap(), Atom::Number(3.14));
        assert_eq!(atom("-2").unwrap(), Atom::Number(-2.0));
        assert_eq!(atom("1e3").unwrap(), Atom::Number(1000.0));
        assert_eq!(atom("abc").unwrap(), Atom::symbol("abc"));
    }

    #[test]
    fn test_hex_numbers() {
        assert_eq!(atom("0x10").unwrap(), Atom::Number(16.0));
        assert_eq!(atom("0X1f").unwrap(), Atom::Number(31.0));
        assert_eq!(atom("-0x10").unwrap(), Atom::Number(-16.0));
        assert_eq!(atom("0x1p3").unwrap(), Atom::Number(8.0));
        assert_eq!(atom("0x1.8p1").unwrap(), Atom::Number(3.0));
        assert_eq!(atom("0x.8").unwrap(), Atom::Number(0.5));
        assert_eq!(atom("0x10p-4").unwrap(), Atom::Number(1.0));
        assert_eq!(atom("0x0p99999999999").unwrap(), Atom::Number(0.0));
        assert_eq!(atom("0x1p99999").unwrap(), Atom::Number(f64::INFINITY));
    }

    #[test]
    fn test_incomplete_hex_is_symbol() {
        assert_eq!(atom("0x").unwrap(), Atom::symbol("0x"));
        assert_eq!(atom("0xg").unwrap(), Atom::symbol("0xg"));
        assert_eq!(atom("0x1p").unwrap(), Atom::symbol("0x1p"));
        assert_eq!(atom("0x1p+").unwrap(), Atom::symbol("0x1p+"));
        assert_eq!(atom("0x1.2.3").unwrap(), Atom::symbol("0x1.2.3"));
        assert_eq!(atom("x10").unwrap(), Atom::symbol("x10"));
    }

    #[test]
    fn test_literals_match_whole_token() {
        assert_eq!(atom("tt").unwrap(), Atom::symbol("tt"));
        assert_eq!(atom("T").unwrap(), Atom::symbol("T"));
        assert_eq!(atom("nil?").unwrap(), Atom::symbol("nil?"));
        assert_eq!(atom("NIL").unwrap(), Atom::symbol("NIL"));
        assert_eq!(atom("false").unwrap(), Atom::symbol("false"));
        assert_eq!(atom("12px").unwrap(), Atom::symbol("12px"));
        assert_eq!(atom("1.2.3").unwrap(), Atom::symbol("1.2.3"));
    }

    #[test]
    fn test_key_in_value_position_is_symbol() {
        assert_eq!(atom(":kw").unwrap(), Atom::symbol(":kw"));
        assert_eq!(
            atom("(:a :b)").unwrap(),
            Atom::object([("a", Atom::symbol(":b"))])
        );
    }

    #[test]
    fn test_string() {
        assert_eq!(atom("\"hi\"").unwrap(), Atom::string("hi"));
        assert_eq!(atom("\"\"").unwrap(), Atom::string(""));
        assert_eq!(
            atom("\"(:not an object) ; nor a comment\"").unwrap(),
            Atom::string("(:not an object) ; nor a comment")
        );
        assert_eq!(atom("\"a\nb\"").unwrap(), Atom::string("a\nb"));
    }

    #[test]
    fn test_object() {
        assert_eq!(
            atom("(:a 1 :b 2)").unwrap(),
            Atom::object([("a", Atom::Number(1.0)), ("b", Atom::Number(2.0))])
        );
        assert_eq!(atom("()").unwrap(), Atom::Object(Object::default()));
    }

    #[test]
    fn test_object_keeps_duplicates() {
        let parsed = atom("(:a 1 :a 2)").unwrap();
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj.pairs[0].value, Atom::Number(1.0));
        assert_eq!(obj.pairs[1].value, Atom::Number(2.0));
    }

    #[test]
    fn test_array() {
        assert_eq!(
            atom("#(1 2 3)").unwrap(),
            Atom::array([Atom::Number(1.0), Atom::Number(2.0), Atom::Number(3.0)])
        );
        assert_eq!(atom("#()").unwrap(), Atom::array([]));
        assert_eq!(atom("# ( 1 )").unwrap(), Atom::array([Atom::Number(1.0)]));
    }

    #[test]
    fn test_nested() {
        assert_eq!(
            atom("(:list #((:x 1) \"s\" #()) :flag t)").unwrap(),
            Atom::object([
                (
                    "list",
                    Atom::array([
                        Atom::object([("x", Atom::Number(1.0))]),
                        Atom::string("s"),
                        Atom::array([]),
                    ])
                ),
                ("flag", Atom::Boolean(true)),
            ])
        );
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        let source = format!(
            "#({})",
            (0..100).map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
        );
        let parsed = atom(&source).unwrap();
        let items = &parsed.as_array().unwrap().items;
        assert_eq!(items.len(), 100);
        assert_eq!(items[99], Atom::Number(99.0));
    }

    #[test]
    fn test_comments_inside_containers() {
        let source = "(:a 1 ; first\n :b ; before value\n 2 ; last\n)";
        assert_eq!(
            atom(source).unwrap(),
            Atom::object([("a", Atom::Number(1.0)), ("b", Atom::Number(2.0))])
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(error_kind("(:a"), ParseErrorKind::UnexpectedEof);
        assert_eq!(error_kind("(:a 1"), ParseErrorKind::UnexpectedEof);
        assert_eq!(error_kind("#1"), ParseErrorKind::UnexpectedToken);
        assert_eq!(error_kind("#"), ParseErrorKind::UnexpectedEof);
        assert_eq!(error_kind("#(1 2"), ParseErrorKind::UnexpectedEof);
        assert_eq!(error_kind("(1 2)"), ParseErrorKind::UnexpectedToken);
        assert_eq!(error_kind("\"abc"), ParseErrorKind::UnexpectedEof);
        assert_eq!(error_kind("`"), ParseErrorKind::UnexpectedChar);
        assert_eq!(error_kind(")"), ParseErrorKind::UnexpectedToken);
        assert_eq!(error_kind("(:a )"), ParseErrorKind::UnexpectedToken);
        assert_eq!(error_kind("(:a 1 ,)"), ParseErrorKind::UnexpectedChar);
    }

    #[test]
    fn test_eof_error_points_at_innermost_opener() {
        let err = Parser::new("(:a #(1 (:b 2)").parse_document().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
        assert_eq!(err.span, Span::empty(14));
        assert_eq!(err.opened_at, Some(Span::new(4, 6)));

        let err = Parser::new("(:s \"abc").parse_document().unwrap_err();
        assert_eq!(err.opened_at, Some(Span::new(4, 5)));
    }

    #[test]
    fn test_unexpected_token_reports_expectation() {
        let err = Parser::new("(1 2)").parse_document().unwrap_err();
        assert_eq!(err.span, Span::new(1, 2));
        assert_eq!(err.expected, Some("expected a key"));

        let err = Parser::new("#1").parse_document().unwrap_err();
        assert_eq!(err.expected, Some("expected `(` after `#`"));
    }

    #[test]
    fn test_max_depth() {
        let options = ParseOptions::default().max_depth(2);
        let ok = Parser::with_options("(:a #(1))", options.clone()).parse_document();
        assert!(ok.is_ok());

        let err = Parser::with_options("(:a #((:b 1)))", options)
            .parse_document()
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep);
        assert_eq!(err.span, Span::new(6, 7));

        let flat = ParseOptions::default().max_depth(0);
        assert!(Parser::with_options("1 x \"s\"", flat.clone()).parse_document().is_ok());
        assert!(Parser::with_options("()", flat).parse_document().is_err());
    }

    #[test]
    fn test_default_depth_limit() {
        let at_limit = format!(
            "{}{}",
            "#(".repeat(DEFAULT_MAX_DEPTH),
            ")".repeat(DEFAULT_MAX_DEPTH)
        );
        assert!(Parser::new(&at_limit).parse_document().is_ok());

        let past_limit = format!(
            "(:a {}1{}",
            "#(".repeat(DEFAULT_MAX_DEPTH),
            ")".repeat(DEFAULT_MAX_DEPTH + 1)
        );
        let err = Parser::new(&past_limit).parse_document().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TooDeep);
        // The object is depth 1, so the array opened at depth 129 is the last `#(`.
        let last = 4 + 2 * (DEFAULT_MAX_DEPTH as u32 - 1);
        assert_eq!(err.span, Span::new(last, last + 1));
    }

    #[test]
    fn test_next_atom_pulls_one_at_a_time() {
        let mut parser = Parser::new("1 ; c\n (:a 2)  ");
        assert_eq!(parser.next_atom().unwrap(), Some(Atom::Number(1.0)));
        assert_eq!(
            parser.next_atom().unwrap(),
            Some(Atom::object([("a", Atom::Number(2.0))]))
        );
        assert_eq!(parser.next_atom().unwrap(), None);
        assert_eq!(parser.next_atom().unwrap(), None);
    }

    #[test]
    fn test_try_push_doubles_from_initial_capacity() {
        let mut items = Vec::new();
        try_push(&mut items, 0, Span::empty(0)).unwrap();
        assert_eq!(items.capacity(), INITIAL_CAPACITY);
        for n in 1..=INITIAL_CAPACITY {
            try_push(&mut items, n, Span::empty(0)).unwrap();
        }
        assert_eq!(items.capacity(), INITIAL_CAPACITY * 2);
    }
}
