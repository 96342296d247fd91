//! Shared utilities for transport implementations.
//!
//! This module provides the server bookkeeping and payload helpers used by
//! both the native and the HTTP transport.

use tokio::sync::oneshot;

use crate::{
    Error, Result,
    transport::{RawProvider, RemoteError, Request, TransportError},
};

/// Manages server state common to all transport implementations.
///
/// Servers are owned by whoever started them and all state changes require
/// `&mut self`, so no internal locking is needed.
#[derive(Debug, Default)]
pub struct ServerState {
    /// Shutdown signal for the server loop.
    shutdown: Option<oneshot::Sender<()>>,
    /// The server's bound address.
    address: Option<String>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the server is currently running.
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Get the server address if available.
    pub fn get_address(&self) -> Result<String> {
        self.address
            .clone()
            .ok_or_else(|| TransportError::ServerNotRunning.into())
    }

    /// Fails if a server is already running.
    pub fn ensure_stopped(&self, requested: &str) -> Result<()> {
        match &self.address {
            Some(address) if self.is_running() => Err(TransportError::ServerAlreadyRunning {
                address: format!("{address} (requested {requested})"),
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Records a started server with its bound address and shutdown sender.
    pub fn server_started(&mut self, address: String, shutdown: oneshot::Sender<()>) {
        self.address = Some(address);
        self.shutdown = Some(shutdown);
    }

    /// Triggers shutdown and clears state.
    pub fn stop_server(&mut self) -> Result<()> {
        let tx = self.shutdown.take().ok_or(TransportError::ServerNotRunning)?;
        let _ = tx.send(());
        self.address = None;
        Ok(())
    }
}

impl Drop for ServerState {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// The outcome of serving one request, ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// JSON text of the result.
    Ok(String),
    /// The error the provider raised.
    Err(RemoteError),
}

/// Serves `request` with `handler`, capturing any error in its wire form.
pub async fn serve_request(handler: &dyn RawProvider, request: Request) -> Reply {
    let path = request.path().to_string();
    let operation = request.operation();
    match handler.handle(request).await {
        Ok(result) => Reply::Ok(result),
        Err(e) => {
            tracing::debug!(op = operation, path = %path, kind = ?e.kind(), "Request failed: {e}");
            Reply::Err(RemoteError::from_error(&e, &path))
        }
    }
}

/// Decodes an error payload received from a peer into a local error.
pub fn decode_remote_error(payload: &str) -> Error {
    match serde_json::from_str::<RemoteError>(payload) {
        Ok(remote) => remote.into_error(),
        Err(source) => TransportError::Decode { source }.into(),
    }
}

/// Encodes an error for sending to a peer.
pub fn encode_remote_error(error: &RemoteError) -> String {
    // A struct of strings and a unit enum always serializes.
    serde_json::to_string(error).unwrap_or_else(|_| String::from("{}"))
}
