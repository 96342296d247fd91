//! Connection manager: logical keys to ready-to-use proxies.

use std::sync::Arc;

use crate::{
    Result,
    directory::DirectoryService,
    gateway::ProxyResolver,
    path,
    proxy::ElementProxy,
};

/// Combines a directory with a resolver.
///
/// `connect("plant")` looks the key up in the directory and resolves the
/// resulting address, so callers never handle addresses themselves.
#[derive(Clone)]
pub struct ConnectionManager {
    directory: Arc<dyn DirectoryService>,
    resolver: Arc<ProxyResolver>,
}

impl ConnectionManager {
    pub fn new(directory: Arc<dyn DirectoryService>, resolver: Arc<ProxyResolver>) -> Self {
        Self {
            directory,
            resolver,
        }
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryService> {
        &self.directory
    }

    pub fn resolver(&self) -> &Arc<ProxyResolver> {
        &self.resolver
    }

    /// Returns a proxy on the provider registered under `key`.
    pub async fn connect(&self, key: &str) -> Result<ElementProxy> {
        let address = self.directory.lookup(key).await?;
        tracing::debug!(key, address = %address, "Connecting");
        self.resolver.resolve(&address)
    }

    /// Returns a proxy on `path` inside the provider registered under `key`.
    pub async fn connect_element(&self, key: &str, path: &str) -> Result<ElementProxy> {
        let address = self.directory.lookup(key).await?;
        self.resolver.resolve(&path::concat(&address, path))
    }

    /// Resolves a raw, possibly chained, address.
    pub fn connect_address(&self, address: &str) -> Result<ElementProxy> {
        self.resolver.resolve(address)
    }
}
