#![forbid(unsafe_code)]

//! Builder errors.

use std::fmt;

/// A description could not be turned into virtual nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The description has a shape the builder does not interpret.
    InvalidNodeStructure(String),
}

impl BuildError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidNodeStructure(what.into())
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNodeStructure(what) => write!(f, "invalid node structure: {what}"),
        }
    }
}

impl std::error::Error for BuildError {}
