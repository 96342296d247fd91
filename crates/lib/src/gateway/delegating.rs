//! The provider a gateway exposes to its peers.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    Result,
    address::is_address,
    gateway::ProxyResolver,
    provider::{ModelProvider, ProviderError},
    proxy::ElementProxy,
    value::Value,
};

/// Forwards address paths to their next hop and serves everything else locally.
///
/// When a request arrives whose path is itself an address (the remainder of a
/// chained address), it is resolved with the [`ProxyResolver`] and the
/// operation is applied to the resulting proxy's root. Ordinary paths go to the
/// optional local provider.
#[derive(Clone)]
pub struct DelegatingProvider {
    resolver: ProxyResolver,
    local: Option<Arc<dyn ModelProvider>>,
}

impl DelegatingProvider {
    /// A pure gateway with no local data.
    pub fn new(resolver: ProxyResolver) -> Self {
        Self {
            resolver,
            local: None,
        }
    }

    /// A gateway that also serves `local` for ordinary paths.
    pub fn with_local(resolver: ProxyResolver, local: Arc<dyn ModelProvider>) -> Self {
        Self {
            resolver,
            local: Some(local),
        }
    }

    fn route(&self, path: &str) -> Result<ElementProxy> {
        if is_address(path) {
            tracing::debug!(address = path, "Forwarding to next hop");
            return self.resolver.resolve(path);
        }
        match &self.local {
            Some(local) => Ok(ElementProxy::new(path, local.clone())),
            None => Err(ProviderError::not_found(path).into()),
        }
    }
}

impl fmt::Debug for DelegatingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingProvider")
            .field("resolver", &self.resolver)
            .field("local", &self.local.is_some())
            .finish()
    }
}

#[async_trait]
impl ModelProvider for DelegatingProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        self.route(path)?.read("").await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.route(path)?.write("", value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.route(path)?.create("", value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.route(path)?.delete("").await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.route(path)?.delete_member("", value).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        self.route(path)?.invoke("", args).await
    }
}
