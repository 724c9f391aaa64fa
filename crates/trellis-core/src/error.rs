//! Error types for Trellis core plumbing.

use std::fmt;

/// Errors raised while constructing or initializing executors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The shared executor has already been initialized.
    AlreadyInitialized,
    /// The underlying thread pool could not be created.
    CreationFailed(String),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => {
                write!(f, "Shared executor has already been initialized")
            }
            Self::CreationFailed(msg) => {
                write!(f, "Failed to create thread pool: {msg}")
            }
        }
    }
}

impl std::error::Error for ExecutorError {}

/// A specialized Result type for Trellis core operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;
