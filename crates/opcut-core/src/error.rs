#![forbid(unsafe_code)]

//! Error type for structural operations.

use std::fmt;

use crate::value::ValueKind;

/// Errors raised by path and collection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A path segment does not fit the value it is applied to, or a path
    /// description could not be parsed.
    InvalidPath {
        /// Rendered path (as far as it is known).
        path: String,
        /// Index of the offending segment.
        position: usize,
        /// What went wrong at that segment.
        reason: String,
    },
    /// A collection operation was handed a value of the wrong shape.
    NotAContainer {
        /// Name of the operation.
        op: &'static str,
        /// Shape that was found instead.
        kind: ValueKind,
    },
}

impl Error {
    pub(crate) fn invalid_path(
        path: impl fmt::Display,
        position: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            position,
            reason: reason.into(),
        }
    }

    pub(crate) const fn not_a_container(op: &'static str, kind: ValueKind) -> Self {
        Self::NotAContainer { op, kind }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath {
                path,
                position,
                reason,
            } => write!(f, "invalid path {path} at segment {position}: {reason}"),
            Self::NotAContainer { op, kind } => {
                write!(f, "{op}: expected list or map, found {kind}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for structural operations.
pub type Result<T> = std::result::Result<T, Error>;
