//! A tokenizer for ldf

mod span;
pub use span::Span;

mod token;
pub use token::{Token, TokenKind};

mod tokenizer;
pub use tokenizer::{LexError, LexErrorKind, MAX_SOURCE_LEN, Tokenizer, is_symbol_byte};
