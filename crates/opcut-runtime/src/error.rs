#![forbid(unsafe_code)]

//! Renderer errors.

use std::fmt;

use opcut_vdom::BuildError;

/// Why a mutation or render did not complete.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererError {
    /// A path segment did not fit the state it was applied to.
    InvalidPath(opcut_core::Error),
    /// The mutation's transform rejected the update.
    MutationFailure(String),
    /// The view produced a description the builder could not interpret.
    Build(BuildError),
    /// The renderer was re-initialized before the mutation settled.
    Reset,
}

impl fmt::Display for RendererError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath(e) => write!(f, "{e}"),
            Self::MutationFailure(msg) => write!(f, "mutation failed: {msg}"),
            Self::Build(e) => write!(f, "render failed: {e}"),
            Self::Reset => f.write_str("renderer was re-initialized"),
        }
    }
}

impl std::error::Error for RendererError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPath(e) => Some(e),
            Self::Build(e) => Some(e),
            Self::MutationFailure(_) | Self::Reset => None,
        }
    }
}

impl From<opcut_core::Error> for RendererError {
    fn from(e: opcut_core::Error) -> Self {
        match e {
            opcut_core::Error::InvalidPath { .. } => Self::InvalidPath(e),
            other @ opcut_core::Error::NotAContainer { .. } => {
                Self::MutationFailure(other.to_string())
            }
        }
    }
}

impl From<BuildError> for RendererError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}
