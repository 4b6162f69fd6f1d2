//! Diagnostic rendering for parser errors.

use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::Span;
use crate::error::{ParseError, ParseErrorKind};

const SYMBOL_HELP: &str = concat!(
    "symbols may contain letters, digits and ",
    "- + * / @ $ % & = < > . _ ~ ? ! [ ] { } ^ :",
);

impl ParseError {
    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &[u8]) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &[u8], writer: W) {
        let text = String::from_utf8_lossy(source);
        let report = self.build_report(filename, source);
        let _ = report
            .finish()
            .write((filename, Source::from(&*text)), writer);
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
        source: &[u8],
    ) -> ariadne::ReportBuilder<'static, (&'a str, Range<usize>)> {
        let range = char_range(source, self.span);
        let build = |range: Range<usize>| Report::build(ReportKind::Error, (filename, range));

        let report = match self.kind {
            ParseErrorKind::UnexpectedChar => build(range.clone())
                .with_message("unexpected character")
                .with_label(
                    Label::new((filename, range))
                        .with_message("not allowed here")
                        .with_color(Color::Red),
                )
                .with_help(SYMBOL_HELP),

            ParseErrorKind::UnexpectedEof => {
                let report = build(range.clone())
                    .with_message("unexpected end of input")
                    .with_label(
                        Label::new((filename, range))
                            .with_message("input ends here")
                            .with_color(Color::Red),
                    );
                match self.opened_at {
                    Some(opener) => report
                        .with_label(
                            Label::new((filename, char_range(source, opener)))
                                .with_message("opened here")
                                .with_color(Color::Blue),
                        )
                        .with_help("add the missing closing `)` or `\"`"),
                    None => report,
                }
            }

            ParseErrorKind::UnexpectedToken => build(range.clone())
                .with_message("unexpected token")
                .with_label(
                    Label::new((filename, range))
                        .with_message(self.expected.unwrap_or("unexpected"))
                        .with_color(Color::Red),
                ),

            ParseErrorKind::TooDeep => build(range.clone())
                .with_message("nesting too deep")
                .with_label(
                    Label::new((filename, range))
                        .with_message("this container exceeds the depth limit")
                        .with_color(Color::Red),
                )
                .with_help("raise the maximum depth or flatten the document"),

            ParseErrorKind::OutOfMemory
            | ParseErrorKind::InputTooLarge
            | ParseErrorKind::Unknown => {
                build(range.clone())
                    .with_message(self.kind.to_string())
                    .with_label(Label::new((filename, range)).with_color(Color::Red))
            }
        };
        report.with_code(self.kind.code())
    }
}

/// Convert a byte span into the char offsets ariadne expects.
fn char_range(source: &[u8], span: Span) -> Range<usize> {
    char_offset(source, span.start as usize)..char_offset(source, span.end as usize)
}

/// Char index of `byte` in the lossy UTF-8 decoding of `source`, where each
/// invalid sequence becomes a single U+FFFD.
fn char_offset(source: &[u8], byte: usize) -> usize {
    let mut chars = 0;
    let mut pos = 0;
    for chunk in source.utf8_chunks() {
        let valid = chunk.valid();
        if byte < pos + valid.len() {
            let before = valid.char_indices().take_while(|&(i, _)| pos + i < byte);
            return chars + before.count();
        }
        chars += valid.chars().count();
        pos += valid.len();

        let invalid = chunk.invalid();
        if byte < pos + invalid.len() {
            return chars;
        }
        if !invalid.is_empty() {
            chars += 1;
        }
        pos += invalid.len();
    }
    chars
}
