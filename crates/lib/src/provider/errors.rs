//! Error types for providers.
//!
//! Every backend raises the most specific of these kinds it can determine;
//! proxies and decorators pass them through unchanged.

use thiserror::Error;

use crate::ErrorKind;

/// Errors that can occur while serving one of the provider operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Nothing exists at the path, or the parent container is missing.
    #[error("Element not found: '{path}'")]
    NotFound {
        /// The path that was addressed
        path: String,
    },

    /// A structure entry already exists where one was to be created.
    #[error("Element already exists: '{path}'")]
    AlreadyExists {
        /// The path that was addressed
        path: String,
    },

    /// The request does not fit the addressed element.
    #[error("Malformed request for '{path}': {reason}")]
    Malformed {
        /// The path that was addressed
        path: String,
        /// What was wrong with the request
        reason: String,
    },

    /// The element is latched read-only.
    #[error("Element is read-only: '{path}'")]
    ReadOnly {
        /// The path that was addressed
        path: String,
    },

    /// The provider does not support this operation here.
    #[error("Operation '{operation}' is not supported on '{path}'")]
    Unsupported {
        /// The operation that was requested
        operation: String,
        /// The path that was addressed
        path: String,
    },
}

impl ProviderError {
    pub fn not_found(path: impl Into<String>) -> Self {
        ProviderError::NotFound { path: path.into() }
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        ProviderError::AlreadyExists { path: path.into() }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ProviderError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn read_only(path: impl Into<String>) -> Self {
        ProviderError::ReadOnly { path: path.into() }
    }

    pub fn unsupported(operation: impl Into<String>, path: impl Into<String>) -> Self {
        ProviderError::Unsupported {
            operation: operation.into(),
            path: path.into(),
        }
    }

    /// The protocol-level kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::NotFound { .. } => ErrorKind::NotFound,
            ProviderError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            ProviderError::Malformed { .. } => ErrorKind::Malformed,
            ProviderError::ReadOnly { .. } => ErrorKind::ReadOnly,
            ProviderError::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// The path the failing request addressed.
    pub fn path(&self) -> &str {
        match self {
            ProviderError::NotFound { path }
            | ProviderError::AlreadyExists { path }
            | ProviderError::Malformed { path, .. }
            | ProviderError::ReadOnly { path }
            | ProviderError::Unsupported { path, .. } => path,
        }
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    /// Check if this is a read-only error.
    pub fn is_read_only(&self) -> bool {
        matches!(self, ProviderError::ReadOnly { .. })
    }
}
