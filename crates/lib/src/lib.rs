//!
//! VAB: a generic, transport-agnostic model access protocol.
//!
//! Every piece of data, wherever it lives, is reached through one path-addressed
//! contract with six operations. Backends implement it, callers depend on it, and
//! transports carry it across process boundaries.
//!
//! ## Core Concepts
//!
//! * **Paths (`path`)**: `/`-joined, percent-encoded element names addressing a node in a provider's tree.
//! * **Addresses (`address`)**: `scheme://location[/path]` endpoints, optionally chained with `//`.
//! * **Values (`value::Value`)**: primitives, collections, structures and invocable operations.
//! * **Providers (`provider::ModelProvider`)**: the uniform read/write/create/delete/delete_member/invoke contract.
//!     * **MapProvider**: an in-memory value tree.
//!     * **LambdaProvider**: live properties backed by accessor closures.
//!     * **FileSystemProvider**: structures as directories, leaves as JSON files.
//! * **Proxies (`proxy::ElementProxy`)**: a path prefix bound to a provider, composable with other proxies.
//! * **Gateway (`gateway`)**: scheme-to-connector-factory routing, connector caching and multi-hop resolution.
//! * **Transports (`transport`)**: the native binary TCP protocol and HTTP, both carrying JSON payloads.
//! * **Consistency (`consistency::ConsistencyProvider`)**: a change clock and a read-only latch around any provider.
//! * **Directory (`directory`) and ConnectionManager (`manager`)**: logical names mapped to addresses.

pub mod address;
pub mod consistency;
pub mod directory;
pub mod gateway;
pub mod hooks;
pub mod manager;
pub mod path;
pub mod provider;
pub mod proxy;
pub mod transport;
pub mod value;

pub use provider::ModelProvider;
pub use proxy::ElementProxy;
pub use value::Value;

use serde::{Deserialize, Serialize};

/// Result type used throughout the VAB library.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every error the library raises.
///
/// This is the taxonomy that crosses process boundaries: transports encode the
/// kind of a failure and the receiving side rebuilds an error of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Path or key absent.
    NotFound,
    /// Create on an occupied structure key.
    AlreadyExists,
    /// Request shape invalid for the addressed element.
    Malformed,
    /// Mutation attempted while the target is latched read-only.
    ReadOnly,
    /// Operation not meaningful for this backend.
    Unsupported,
    /// Connector-level I/O, encoding or framing failure.
    TransportFailure,
    /// Misconfiguration, such as an unregistered address scheme.
    Configuration,
}

/// Common error type for the VAB library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors raised by providers
    #[error(transparent)]
    Provider(#[from] provider::ProviderError),

    /// Structured errors raised by connectors and servers
    #[error(transparent)]
    Transport(#[from] transport::TransportError),

    /// Structured errors raised while routing addresses
    #[error(transparent)]
    Routing(#[from] gateway::RoutingError),

    /// Invalid path text
    #[error(transparent)]
    Path(#[from] path::PathError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Provider(_) => "provider",
            Error::Transport(_) => "transport",
            Error::Routing(_) => "gateway",
            Error::Path(_) => "path",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Classify this error into the protocol-level taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Provider(err) => err.kind(),
            Error::Transport(_) => ErrorKind::TransportFailure,
            Error::Routing(_) => ErrorKind::Configuration,
            Error::Path(_) => ErrorKind::Malformed,
            Error::Io(_) | Error::Serialize(_) => ErrorKind::TransportFailure,
        }
    }

    /// The path the failing request addressed, when the error records one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Provider(err) => Some(err.path()),
            _ => None,
        }
    }

    /// Check if this error indicates a path or key was not found.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error indicates an element already exists.
    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Check if this error indicates a request did not fit the addressed element.
    pub fn is_malformed(&self) -> bool {
        self.kind() == ErrorKind::Malformed
    }

    /// Check if this error indicates the target was latched read-only.
    pub fn is_read_only(&self) -> bool {
        self.kind() == ErrorKind::ReadOnly
    }

    /// Check if this error indicates the operation is not supported.
    pub fn is_unsupported(&self) -> bool {
        self.kind() == ErrorKind::Unsupported
    }

    /// Check if this error is a transport-level failure.
    pub fn is_transport_failure(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }

    /// Check if this error is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this error is a timeout on a connector.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }
}
