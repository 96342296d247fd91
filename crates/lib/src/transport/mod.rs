//! Transports carrying the provider contract across process boundaries.
//!
//! Both transports are split at the same seam. On the wire, requests and
//! results are JSON text described by [`Request`]; the [`RawProvider`] trait is
//! the string-based contract every transport speaks.
//!
//! - [`json::JsonProvider`] adapts any [`crate::ModelProvider`] to a
//!   [`RawProvider`] on the server side.
//! - [`json::JsonConnector`] adapts any [`RawProvider`] (a transport client)
//!   back into a [`crate::ModelProvider`] on the client side.
//!
//! Errors cross the wire as [`RemoteError`] and are rebuilt into the same
//! [`ErrorKind`] on the receiving side.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Error, ErrorKind, Result, provider::ProviderError};

pub mod http;
pub mod json;
pub mod native;
pub mod shared;

/// Errors raised by connectors and servers.
///
/// Every variant carries the cause of the failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Could not reach the peer.
    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    /// Socket I/O failed mid-exchange.
    #[error("I/O error talking to {address}: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer did not answer in time.
    #[error("Request to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// A frame violated the wire protocol.
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    /// A value could not be encoded for the wire.
    #[error("Failed to encode payload: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    /// A payload from the wire could not be decoded.
    #[error("Failed to decode payload: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP client failed.
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP peer answered with an unexpected status and no error body.
    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The remote side reported a transport or configuration failure of its own.
    #[error("Remote failure: {message}")]
    Remote { message: String },

    /// Attempted to start a server when one is already running.
    #[error("Server already running on {address}")]
    ServerAlreadyRunning { address: String },

    /// Attempted to stop a server when none is running.
    #[error("Server not running")]
    ServerNotRunning,

    /// Server bind error.
    #[error("Failed to bind server to {address}: {source}")]
    ServerBind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Check if this error is a request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// Check if the connection this error happened on should be discarded.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. }
                | TransportError::Io { .. }
                | TransportError::Timeout { .. }
                | TransportError::Protocol { .. }
        )
    }
}

/// One provider operation in its wire form.
///
/// Values and arguments are JSON text as produced by [`crate::Value::to_json_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Read { path: String },
    Write { path: String, value: String },
    Create { path: String, value: String },
    Delete { path: String },
    DeleteMember { path: String, value: String },
    Invoke { path: String, args: Vec<String> },
}

impl Request {
    /// The path the request addresses.
    pub fn path(&self) -> &str {
        match self {
            Request::Read { path }
            | Request::Write { path, .. }
            | Request::Create { path, .. }
            | Request::Delete { path }
            | Request::DeleteMember { path, .. }
            | Request::Invoke { path, .. } => path,
        }
    }

    /// The operation name, as used in logs and `Unsupported` errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Read { .. } => "read",
            Request::Write { .. } => "write",
            Request::Create { .. } => "create",
            Request::Delete { .. } => "delete",
            Request::DeleteMember { .. } => "delete_member",
            Request::Invoke { .. } => "invoke",
        }
    }
}

/// The string-based provider contract spoken by transports.
///
/// Implementors only provide [`RawProvider::handle`]; the per-operation methods
/// build the matching [`Request`]. Unit results are the text `null`.
#[async_trait]
pub trait RawProvider: Send + Sync {
    /// Serves one request, returning the JSON text of its result.
    async fn handle(&self, request: Request) -> Result<String>;

    async fn read(&self, path: &str) -> Result<String> {
        self.handle(Request::Read { path: path.to_string() }).await
    }

    async fn write(&self, path: &str, value: String) -> Result<String> {
        self.handle(Request::Write { path: path.to_string(), value }).await
    }

    async fn create(&self, path: &str, value: String) -> Result<String> {
        self.handle(Request::Create { path: path.to_string(), value }).await
    }

    async fn delete(&self, path: &str) -> Result<String> {
        self.handle(Request::Delete { path: path.to_string() }).await
    }

    async fn delete_member(&self, path: &str, value: String) -> Result<String> {
        self.handle(Request::DeleteMember { path: path.to_string(), value }).await
    }

    async fn invoke(&self, path: &str, args: Vec<String>) -> Result<String> {
        self.handle(Request::Invoke { path: path.to_string(), args }).await
    }
}

/// An error in its wire form.
///
/// For `Malformed` the message is the reason, for `Unsupported` it is the
/// operation name; for other kinds it is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: ErrorKind,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub message: String,
}

impl RemoteError {
    /// Captures `error` for sending to a peer.
    pub fn from_error(error: &Error, path: &str) -> Self {
        let message = match error {
            Error::Provider(ProviderError::Malformed { reason, .. }) => reason.clone(),
            Error::Provider(ProviderError::Unsupported { operation, .. }) => operation.clone(),
            other => other.to_string(),
        };
        Self {
            kind: error.kind(),
            path: error.path().unwrap_or(path).to_string(),
            message,
        }
    }

    /// Rebuilds a local error of the same kind.
    pub fn into_error(self) -> Error {
        let RemoteError { kind, path, message } = self;
        match kind {
            ErrorKind::NotFound => ProviderError::not_found(path).into(),
            ErrorKind::AlreadyExists => ProviderError::already_exists(path).into(),
            ErrorKind::Malformed => ProviderError::malformed(path, message).into(),
            ErrorKind::ReadOnly => ProviderError::read_only(path).into(),
            ErrorKind::Unsupported => ProviderError::unsupported(message, path).into(),
            ErrorKind::TransportFailure | ErrorKind::Configuration => {
                TransportError::Remote { message }.into()
            }
        }
    }
}
