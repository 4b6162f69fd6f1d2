//! Atom types for ldf documents.
//!
//! Every parsed value is an [`Atom`]:
//! - `nil` is `Atom::Null`
//! - `t` is `Atom::Boolean(true)` (there is no literal for false)
//! - `3.14` is `Atom::Number(3.14)`
//! - `"hi"` is `Atom::String(b"hi".to_vec())`
//! - `abc` and `:abc` (outside key position) are `Atom::Symbol(..)`
//! - `(:a 1 :b 2)` is `Atom::Object(..)`
//! - `#(1 2 3)` is `Atom::Array(..)`
//!
//! Atoms own all of their text; nothing borrows from the source buffer.

/// A single parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// `nil`
    Null,
    /// `(:key value ...)`
    Object(Object),
    /// `#(value ...)`
    Array(Array),
    /// Raw bytes between quotes, copied verbatim.
    String(Vec<u8>),
    /// Any token that parses completely as an `f64`.
    Number(f64),
    /// `t`
    Boolean(bool),
    /// Any other bare token.
    Symbol(String),
}

/// The variant of an [`Atom`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Null,
    Object,
    Array,
    String,
    Number,
    Boolean,
    Symbol,
}

impl std::fmt::Display for AtomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AtomKind::Null => "null",
            AtomKind::Object => "object",
            AtomKind::Array => "array",
            AtomKind::String => "string",
            AtomKind::Number => "number",
            AtomKind::Boolean => "boolean",
            AtomKind::Symbol => "symbol",
        };
        f.write_str(name)
    }
}

/// An object: ordered key/value pairs.
///
/// Duplicate keys are kept, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    /// Pairs in the order they were written.
    pub pairs: Vec<Pair>,
}

/// A key/value pair in an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    /// The key, without its leading `:`.
    pub key: String,
    /// The value.
    pub value: Atom,
}

/// An array: ordered items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    /// Items in the order they were written.
    pub items: Vec<Atom>,
}

impl Atom {
    /// Create a symbol atom.
    pub fn symbol(text: impl Into<String>) -> Self {
        Atom::Symbol(text.into())
    }

    /// Create a string atom.
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Atom::String(bytes.into())
    }

    /// Create an object atom from `(key, value)` pairs.
    pub fn object<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Atom)>) -> Self {
        Atom::Object(Object {
            pairs: pairs
                .into_iter()
                .map(|(key, value)| Pair {
                    key: key.into(),
                    value,
                })
                .collect(),
        })
    }

    /// Create an array atom.
    pub fn array(items: impl IntoIterator<Item = Atom>) -> Self {
        Atom::Array(Array {
            items: items.into_iter().collect(),
        })
    }

    /// The variant of this atom.
    pub fn kind(&self) -> AtomKind {
        match self {
            Atom::Null => AtomKind::Null,
            Atom::Object(_) => AtomKind::Object,
            Atom::Array(_) => AtomKind::Array,
            Atom::String(_) => AtomKind::String,
            Atom::Number(_) => AtomKind::Number,
            Atom::Boolean(_) => AtomKind::Boolean,
            Atom::Symbol(_) => AtomKind::Symbol,
        }
    }

    /// Check if this is `nil`.
    pub fn is_null(&self) -> bool {
        matches!(self, Atom::Null)
    }

    /// Get as boolean.
    ///
    /// Only `Atom::Boolean` answers; what counts as "false" is up to the caller.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Atom::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Atom::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the raw bytes of a string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Atom::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Get a string as `str`, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Get the text of a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Atom::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get as array.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Atom::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get a nested atom by path.
    ///
    /// Segments are separated by `.`; `[n]` indexes into an array. Object
    /// segments match the first pair with that key, so keys containing `.`
    /// or `[` are not reachable this way.
    pub fn get(&self, path: &str) -> Option<&Atom> {
        if path.is_empty() {
            return Some(self);
        }

        let (segment, rest) = split_path(path);

        let atom = match self {
            Atom::Object(obj) => obj.get(segment)?,
            Atom::Array(arr) => {
                let index = segment.strip_prefix('[')?.strip_suffix(']')?;
                arr.get(index.parse().ok()?)?
            }
            _ => return None,
        };
        atom.get(rest)
    }

    /// Release this atom and everything it owns.
    ///
    /// Equivalent to dropping it; children are freed before their parent.
    pub fn release(self) {
        drop(self)
    }
}

impl Object {
    /// Get the value of the first pair with this key.
    pub fn get(&self, key: &str) -> Option<&Atom> {
        self.pairs.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// All values with this key, in source order.
    pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a Atom> {
        self.pairs
            .iter()
            .filter(move |p| p.key == key)
            .map(|p| &p.value)
    }

    /// Iterate over pairs as `(key, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Atom)> {
        self.pairs.iter().map(|p| (p.key.as_str(), &p.value))
    }

    /// Check if key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|p| p.key == key)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Array {
    /// Get item by index.
    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.items.get(index)
    }

    /// Iterate over items.
    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.items.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn split_path(path: &str) -> (&str, &str) {
    if path.starts_with('[')
        && let Some(end) = path.find(']')
    {
        let segment = &path[..=end];
        let rest = &path[end + 1..];
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        return (segment, rest);
    }

    let dot_pos = path.find('.');
    let bracket_pos = path.find('[');

    match (dot_pos, bracket_pos) {
        (Some(d), Some(b)) if b < d => (&path[..b], &path[b..]),
        (Some(d), _) => (&path[..d], &path[d + 1..]),
        (None, Some(b)) => (&path[..b], &path[b..]),
        (None, None) => (path, ""),
    }
}
