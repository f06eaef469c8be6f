//! Path segments and the dotted path grammar.
//!
//! A path string is split on `.`; a token of the form `name[n]` (with `n` an
//! optionally signed decimal integer) expands to the key `name` followed by
//! the index `n`. Every other token is a plain key. There is no escaping:
//! keys containing `.` or bracket syntax can only be addressed by building
//! the segments directly.

use std::convert::Infallible;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// One step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Selects a mapping entry.
    Key(String),
    /// Selects a sequence element; negative values count from the end.
    Index(i64),
}

impl Segment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<i64> {
        match self {
            Segment::Key(_) => None,
            Segment::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_owned())
    }
}

impl From<&String> for Segment {
    fn from(key: &String) -> Self {
        Segment::Key(key.clone())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

macro_rules! impl_segment_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Segment {
            fn from(index: $t) -> Self {
                Segment::Index(index.into())
            }
        })*
    };
}

impl_segment_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        // Anything past i64::MAX is out of bounds for every sequence anyway.
        Segment::Index(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

/// An ordered list of [`Segment`]s. The empty path denotes the whole tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse dotted notation into segments. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use arbor_types::{Path, Segment};
    ///
    /// let path = Path::parse("first.second[1].x");
    /// assert_eq!(
    ///     path.segments(),
    ///     &[
    ///         Segment::Key("first".into()),
    ///         Segment::Key("second".into()),
    ///         Segment::Index(1),
    ///         Segment::Key("x".into()),
    ///     ]
    /// );
    /// assert!(Path::parse("").is_empty());
    /// ```
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::new();
        }
        let mut segments = Vec::new();
        for token in text.split('.') {
            match split_indexed(token) {
                Some((name, index)) => {
                    segments.push(Segment::Key(name.to_owned()));
                    segments.push(Segment::Index(index));
                }
                None => segments.push(Segment::Key(token.to_owned())),
            }
        }
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    /// Extend this path by one segment, builder style.
    pub fn join(mut self, segment: impl Into<Segment>) -> Self {
        self.push(segment);
        self
    }

    pub fn into_inner(self) -> Vec<Segment> {
        self.0
    }
}

/// Recognize `name[n]`. Returns `None` for anything that is not exactly that
/// shape, which makes the token a plain key.
fn split_indexed(token: &str) -> Option<(&str, i64)> {
    let body = token.strip_suffix(']')?;
    let open = body.find('[')?;
    let (name, rest) = body.split_at(open);
    if name.is_empty() || name.contains(']') {
        return None;
    }
    let digits = &rest[1..];
    let unsigned = digits
        .strip_prefix('-')
        .or_else(|| digits.strip_prefix('+'))
        .unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|index| (name, index))
}

impl Deref for Path {
    type Target = [Segment];

    fn deref(&self) -> &[Segment] {
        &self.0
    }
}

impl AsRef<[Segment]> for Path {
    fn as_ref(&self) -> &[Segment] {
        &self.0
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<&[Segment]> for Path {
    fn from(segments: &[Segment]) -> Self {
        Self(segments.to_vec())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Build a [`Path`] from a mix of key and index literals.
///
/// ```
/// use arbor_types::{path, Path};
///
/// assert_eq!(path!["a", "b", -4], Path::parse("a.b[-4]"));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::new()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::Path::from(vec![$($crate::Segment::from($segment)),+])
    };
}
