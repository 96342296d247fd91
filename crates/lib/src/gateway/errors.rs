//! Error types for address routing.

use thiserror::Error;

/// Errors raised while turning an address into a connector.
///
/// These are configuration problems of the caller, not failures of the
/// addressed provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoutingError {
    /// No connector factory is registered for the address scheme.
    #[error("No connector factory registered for scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    /// The address text could not be parsed.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A factory rejected the endpoint it was asked to connect to.
    #[error("Cannot create connector for '{address}': {reason}")]
    InvalidEndpoint { address: String, reason: String },
}

impl RoutingError {
    /// Check if this error is an unregistered scheme.
    pub fn is_unknown_scheme(&self) -> bool {
        matches!(self, RoutingError::UnknownScheme { .. })
    }
}
