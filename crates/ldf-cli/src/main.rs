//! ldf CLI tool
//!
//!   ldf dump config.ldf           - parse and print every atom
//!   ldf dump -                    - read from stdin
//!   ldf tokens config.ldf         - print the token stream
//!
//! Set `RUST_LOG=ldf_tree=debug` (or `trace`) to see what the parser does.

use std::fmt::{self, Write as _};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ldf_tokenizer::{TokenKind, Tokenizer};
use ldf_tree::{Atom, DEFAULT_MAX_DEPTH, ParseError, ParseOptions};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Exit codes
// ============================================================================

const EXIT_SUCCESS: i32 = 0;
const EXIT_SYNTAX_ERROR: i32 = 1;
const EXIT_IO_ERROR: i32 = 3;

// ============================================================================
// CLI argument structures
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "ldf", version, about = "Inspect ldf data files")]
struct Args {
    /// Deepest allowed container nesting
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a file and print every atom
    Dump {
        /// Input file path (or "-" for stdin)
        file: PathBuf,
    },
    /// Print the token stream of a file
    Tokens {
        /// Input file path (or "-" for stdin)
        file: PathBuf,
    },
}

fn main() {
    init_tracing();
    let args = Args::parse();

    let options = ParseOptions::default().max_depth(args.max_depth);
    let result = match &args.command {
        Command::Dump { file } => run_dump(file, options),
        Command::Tokens { file } => run_tokens(file),
    };

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            match &e {
                CliError::Parse {
                    error,
                    source,
                    filename,
                } => error.write_report(filename, source, io::stderr()),
                CliError::Io(_) => eprintln!("error: {e}"),
            }
            std::process::exit(e.exit_code());
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Parse {
        error: ParseError,
        source: Vec<u8>,
        filename: String,
    },
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Io(_) => EXIT_IO_ERROR,
            CliError::Parse { .. } => EXIT_SYNTAX_ERROR,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "{e}"),
            CliError::Parse { error, filename, .. } => write!(f, "{filename}: {error}"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

// ============================================================================
// Subcommand implementations
// ============================================================================

fn run_dump(file: &Path, options: ParseOptions) -> Result<(), CliError> {
    let (source, filename) = read_input(file)?;
    match ldf_tree::parse_with(&source, options) {
        Ok(doc) => {
            print!("{}", render_document(&doc.atoms));
            Ok(())
        }
        Err(error) => Err(CliError::Parse {
            error,
            source,
            filename,
        }),
    }
}

fn run_tokens(file: &Path) -> Result<(), CliError> {
    let (source, filename) = read_input(file)?;
    let mut out = String::new();
    let mut failure = None;
    for token in Tokenizer::new(&source) {
        match token {
            Ok(token) => {
                let text = String::from_utf8_lossy(token.text);
                let _ = writeln!(
                    out,
                    "{:>5}..{:<5} {:?} {:?}",
                    token.span.start, token.span.end, token.kind, text
                );
            }
            Err(lex) => {
                failure = Some(ParseError::from(lex));
                break;
            }
        }
    }

    // Tokens scanned before a failure are still printed.
    if failure.is_none() {
        let end = source.len();
        let _ = writeln!(out, "{end:>5}..{end:<5} {:?}", TokenKind::Eof);
    }
    print!("{out}");

    match failure {
        Some(error) => Err(CliError::Parse {
            error,
            source,
            filename,
        }),
        None => Ok(()),
    }
}

/// Read a file, or stdin for `-`. Returns the bytes and a display name.
fn read_input(file: &Path) -> Result<(Vec<u8>, String), io::Error> {
    if file.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok((buf, "<stdin>".to_string()))
    } else {
        let source = std::fs::read(file)?;
        Ok((source, file.display().to_string()))
    }
}

// ============================================================================
// Tree rendering
// ============================================================================

/// Render a parsed document the way `ldf dump` prints it.
fn render_document(atoms: &[Atom]) -> String {
    let mut out = format!("Successfully parsed {} atoms\n", atoms.len());
    for (i, atom) in atoms.iter().enumerate() {
        let _ = write!(out, "=== ATOM #{} ===\n{}\n\n", i + 1, Tree::new(atom));
    }
    out
}

/// Indented, human-readable view of an atom.
struct Tree<'a> {
    atom: &'a Atom,
    indent: usize,
}

impl<'a> Tree<'a> {
    fn new(atom: &'a Atom) -> Self {
        Self { atom, indent: 0 }
    }

    fn child(&self, atom: &'a Atom) -> Self {
        Self {
            atom,
            indent: self.indent + 1,
        }
    }
}

impl fmt::Display for Tree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = "  ".repeat(self.indent);
        match self.atom {
            Atom::Null => f.write_str("nil"),
            Atom::Boolean(b) => write!(f, "{b}"),
            Atom::Number(n) => write!(f, "{n}"),
            Atom::String(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Atom::Symbol(s) => f.write_str(s),
            Atom::Object(obj) if obj.is_empty() => f.write_str("{}"),
            Atom::Object(obj) => {
                writeln!(f, "{{")?;
                for (key, value) in obj.iter() {
                    writeln!(f, "{pad}  {key}: {}", self.child(value))?;
                }
                write!(f, "{pad}}}")
            }
            Atom::Array(arr) if arr.is_empty() => f.write_str("[]"),
            Atom::Array(arr) => {
                writeln!(f, "[")?;
                for item in arr {
                    writeln!(f, "{pad}  {}", self.child(item))?;
                }
                write!(f, "{pad}]")
            }
        }
    }
}
