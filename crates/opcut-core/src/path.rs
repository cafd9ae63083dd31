#![forbid(unsafe_code)]

//! Paths addressing a location inside a [`Value`].
//!
//! A [`Path`] is a flat sequence of [`Segment`]s: string keys for map access
//! and integer indices for list access. Nested sub-paths are flattened at
//! construction time, so `path!["form", path!["panels", 0]]` equals
//! `path!["form", "panels", 0]`.
//!
//! ```
//! use opcut_core::path::Path;
//! use opcut_core::path;
//!
//! let p = Path::root().key("form").key("panels").index(0);
//! assert_eq!(p, path!["form", "panels", 0usize]);
//! assert_eq!(p.to_string(), "form.panels[0]");
//! ```

use std::fmt;

use smallvec::SmallVec;

use crate::error::Error;
use crate::value::Value;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Map key.
    Key(String),
    /// List index.
    Index(usize),
}

impl Segment {
    /// Whether this segment addresses a map entry.
    #[must_use]
    pub const fn is_key(&self) -> bool {
        matches!(self, Self::Key(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Ordered sequence of segments. The empty path addresses the whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: SmallVec<[Segment; 4]>,
}

impl Path {
    /// The empty path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a map key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Append a list index.
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    /// Append a single segment in place.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.segments.push(segment.into());
    }

    /// Append every segment of `other` in place.
    pub fn extend(&mut self, other: impl Into<Path>) {
        self.segments.extend(other.into().segments);
    }

    /// Concatenate two paths.
    #[must_use]
    pub fn join(&self, other: impl Into<Path>) -> Self {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path without its last segment; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.iter().cloned().collect(),
        })
    }

    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Whether `prefix` addresses this location or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Parse a JSON-shaped path description.
    ///
    /// Strings become keys, non-negative integers become indices and lists
    /// are flattened recursively. Any other shape is an invalid path.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let mut out = Self::root();
        out.push_value(value)?;
        Ok(out)
    }

    fn push_value(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::String(key) => self.push(Segment::Key(key.to_string())),
            Value::Number(n) => match value.as_i64() {
                Some(i) if i >= 0 => self.push(Segment::Index(i as usize)),
                _ => {
                    return Err(Error::invalid_path(
                        &*self,
                        self.len(),
                        format!("{n} is not a list index"),
                    ));
                }
            },
            Value::List(items) => {
                for item in items.iter() {
                    self.push_value(item)?;
                }
            }
            other => {
                return Err(Error::invalid_path(
                    &*self,
                    self.len(),
                    format!("{} is not a path segment", other.kind()),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && segment.is_key() {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl From<Segment> for Path {
    fn from(segment: Segment) -> Self {
        let mut out = Self::root();
        out.push(segment);
        out
    }
}

impl From<&str> for Path {
    fn from(key: &str) -> Self {
        Self::from(Segment::from(key))
    }
}

impl From<String> for Path {
    fn from(key: String) -> Self {
        Self::from(Segment::from(key))
    }
}

impl From<usize> for Path {
    fn from(index: usize) -> Self {
        Self::from(Segment::Index(index))
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

impl<T: Into<Path>> From<Vec<T>> for Path {
    fn from(parts: Vec<T>) -> Self {
        let mut out = Self::root();
        for part in parts {
            out.extend(part);
        }
        out
    }
}

impl<T: Into<Path>, const N: usize> From<[T; N]> for Path {
    fn from(parts: [T; N]) -> Self {
        let mut out = Self::root();
        for part in parts {
            out.extend(part);
        }
        out
    }
}

impl TryFrom<&Value> for Path {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Build a [`Path`] from heterogeneous parts (keys, indices, sub-paths).
///
/// ```
/// use opcut_core::path;
/// let p = path!["items", 2usize, "name"];
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::root()
    };
    ($($part:expr),+ $(,)?) => {{
        let mut p = $crate::path::Path::root();
        $( p.extend($part); )+
        p
    }};
}
