//! The native binary TCP transport.
//!
//! Requests and responses are length-prefixed frames (see [`frame`]) carrying
//! JSON text payloads. A [`NativeServer`] serves one task per connection; a
//! [`NativeConnector`] keeps one persistent connection per endpoint.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    address::Endpoint,
    gateway::ConnectorFactory,
    provider::ModelProvider,
    transport::json::JsonConnector,
};

mod client;
pub mod codec;
pub mod frame;
mod server;

pub use client::NativeConnector;
pub use server::NativeServer;

/// Scheme served by [`NativeConnectorFactory`].
pub const NATIVE_SCHEME: &str = "vab";

/// Default upper bound on a frame body: 16 MiB.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Settings shared by native servers and connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeTransportConfig {
    /// Per-request timeout applied by connectors.
    pub timeout_ms: u64,
    /// Largest frame body accepted, in bytes.
    pub max_frame_len: u32,
}

impl Default for NativeTransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl NativeTransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns a copy with the given timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Factory for `vab://host:port` connectors.
#[derive(Debug, Clone, Default)]
pub struct NativeConnectorFactory {
    config: NativeTransportConfig,
}

impl NativeConnectorFactory {
    pub fn new(config: NativeTransportConfig) -> Self {
        Self { config }
    }
}

impl ConnectorFactory for NativeConnectorFactory {
    fn scheme(&self) -> &str {
        NATIVE_SCHEME
    }

    fn create_connector(&self, endpoint: &Endpoint) -> Result<Arc<dyn ModelProvider>> {
        let client = NativeConnector::new(endpoint.location(), self.config);
        Ok(Arc::new(JsonConnector::new(client)))
    }
}
