//! Error types for argo_core

use thiserror::Error;

/// Errors returned by [`Store::set`](crate::store::Store::set) and friends
///
/// These are contract violations by the caller, not runtime conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `set` was called with an empty path (or one with an empty segment)
    #[error("state path must not be empty (got {0:?})")]
    EmptyPath(String),

    /// An intermediate segment resolved to a scalar
    #[error("cannot descend into `{segment}` while writing `{path}`: value is not a container")]
    NotAContainer { path: String, segment: String },

    /// An array segment was not a valid index
    #[error("index `{segment}` out of range while writing `{path}` (len {len})")]
    IndexOutOfRange {
        path: String,
        segment: String,
        len: usize,
    },
}

/// Errors surfaced by the component lifecycle
#[derive(Error, Debug)]
pub enum ComponentError {
    /// The component's render function failed
    #[error("render failed: {0}")]
    Render(String),

    /// `update` was called while the same instance was already rendering
    #[error("component `{component}` is already {phase}")]
    Reentrant {
        component: &'static str,
        phase: &'static str,
    },

    /// A store write performed on behalf of a component failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ComponentError {
    /// Build a render error from anything displayable
    pub fn render(msg: impl std::fmt::Display) -> Self {
        ComponentError::Render(msg.to_string())
    }
}

/// Result type for component operations
pub type Result<T> = std::result::Result<T, ComponentError>;
