use std::{
    fmt::{self, Display},
    str::FromStr,
};

use nfsserve::nfs::filename3;

use crate::{defaults::PATH_SEPARATOR, NfsError, NfsResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A single name within a path, looked up with one round trip.
///
/// A segment is never empty, never contains the separator or a NUL byte, and is never `.` or `..`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment(String);

/// A normalized path relative to the export root.
///
/// Paths use `/` as their only separator. Empty segments and `.` segments are dropped while
/// parsing, so `""`, `"/"` and `"./"` all name the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ItemPath {
    segments: Vec<PathSegment>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl PathSegment {
    /// Returns the segment as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the bytes representation of the segment.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Returns the length of the segment in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the segment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the wire form of the segment.
    pub fn to_filename(&self) -> filename3 {
        filename3::from(self.as_bytes())
    }
}

impl ItemPath {
    /// Parses a `/`-separated path.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::InvalidPath`] if a segment is `..` or contains a NUL byte.
    pub fn parse(path: &str) -> NfsResult<Self> {
        let segments = path
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(|segment| {
                PathSegment::try_from(segment).map_err(|_| NfsError::InvalidPath(path.to_string()))
            })
            .collect::<NfsResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    /// Returns `true` if the path names the export root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the segments in walk order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the path with `prefix` removed if it starts with every segment of `prefix`.
    ///
    /// An empty prefix, or one the path does not start with, leaves the path unchanged.
    pub fn strip_prefix(self, prefix: &ItemPath) -> Self {
        if prefix.is_root() || !self.segments.starts_with(&prefix.segments) {
            return self;
        }

        Self {
            segments: self.segments[prefix.len()..].to_vec(),
        }
    }

    /// Splits the path into its parent directory and leaf name.
    ///
    /// ## Errors
    ///
    /// Returns [`NfsError::InvalidPath`] for the root, which has no leaf.
    pub fn split_leaf(mut self) -> NfsResult<(ItemPath, PathSegment)> {
        match self.segments.pop() {
            Some(leaf) => Ok((self, leaf)),
            None => Err(NfsError::InvalidPath(PATH_SEPARATOR.to_string())),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for PathSegment {
    type Err = NfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathSegment::try_from(s)
    }
}

impl TryFrom<&str> for PathSegment {
    type Error = NfsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty()
            || value == "."
            || value == ".."
            || value.contains(PATH_SEPARATOR)
            || value.contains('\0')
        {
            return Err(NfsError::InvalidPath(value.to_string()));
        }

        Ok(PathSegment(value.to_string()))
    }
}

impl FromStr for ItemPath {
    type Err = NfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemPath::parse(s)
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "{}", PATH_SEPARATOR);
        }

        for segment in &self.segments {
            write!(f, "{}{}", PATH_SEPARATOR, segment)?;
        }

        Ok(())
    }
}

impl AsRef<[u8]> for PathSegment {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<str> for PathSegment {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
