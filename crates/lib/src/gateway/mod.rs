//! Scheme-based routing from addresses to connectors.
//!
//! A [`GatewayRouter`] maps each address scheme to a [`ConnectorFactory`] and
//! keeps one cached connector per endpoint. The [`ProxyResolver`] turns a full
//! (possibly chained) address into an [`crate::ElementProxy`], and the
//! [`DelegatingProvider`] is what a server exposes so that chained addresses
//! are forwarded hop by hop.
//!
//! The router is an explicit value: build it, register factories, and share it
//! through an `Arc`.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use vab::{ModelProvider, Value, provider::MapProvider};
//! # use vab::gateway::{GatewayRouter, LocalBus, LocalConnectorFactory, ProxyResolver};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vab::Result<()> {
//! let bus = LocalBus::new();
//! bus.register("plant", Arc::new(MapProvider::new(Value::structure().with("speed", 3))));
//!
//! let router = GatewayRouter::new().with_factory(Arc::new(LocalConnectorFactory::new(bus)));
//! let resolver = ProxyResolver::new(Arc::new(router));
//! let proxy = resolver.resolve("local://plant/speed")?;
//! assert_eq!(proxy.read("").await?, Value::Int(3));
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use crate::{Result, address::Endpoint, provider::ModelProvider};

mod delegating;
mod errors;
mod local;
mod resolver;

pub use delegating::DelegatingProvider;
pub use errors::RoutingError;
pub use local::{LocalBus, LocalConnector, LocalConnectorFactory};
pub use resolver::ProxyResolver;

/// Creates connectors for one address scheme.
///
/// Creation must be cheap and must not perform I/O: connectors connect lazily
/// on their first request.
pub trait ConnectorFactory: Send + Sync {
    /// The scheme this factory serves, e.g. `"http"`.
    fn scheme(&self) -> &str;

    /// Creates a connector for `endpoint`.
    fn create_connector(&self, endpoint: &Endpoint) -> Result<Arc<dyn ModelProvider>>;
}

/// One factory plus the connectors it has created, keyed by endpoint text.
pub struct ConnectorCache {
    factory: Arc<dyn ConnectorFactory>,
    connectors: Mutex<HashMap<String, Arc<dyn ModelProvider>>>,
}

impl ConnectorCache {
    pub fn new(factory: Arc<dyn ConnectorFactory>) -> Self {
        Self {
            factory,
            connectors: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached connector for `endpoint`, creating it on first use.
    ///
    /// Creation happens under the cache lock, so concurrent callers for the same
    /// endpoint always share one connector.
    pub fn get_or_create(&self, endpoint: &Endpoint) -> Result<Arc<dyn ModelProvider>> {
        let key = endpoint.to_string();
        let mut connectors = self.connectors.lock().unwrap();
        if let Some(connector) = connectors.get(&key) {
            return Ok(connector.clone());
        }
        tracing::debug!(endpoint = %key, "Creating connector");
        let connector = self.factory.create_connector(endpoint)?;
        connectors.insert(key, connector.clone());
        Ok(connector)
    }

    /// Drops the cached connector for `endpoint`, returning whether one existed.
    pub fn evict(&self, endpoint: &Endpoint) -> bool {
        self.connectors
            .lock()
            .unwrap()
            .remove(&endpoint.to_string())
            .is_some()
    }

    /// Get the number of cached connectors.
    pub fn len(&self) -> usize {
        self.connectors.lock().unwrap().len()
    }

    /// Check if no connector has been created yet.
    pub fn is_empty(&self) -> bool {
        self.connectors.lock().unwrap().is_empty()
    }
}

/// Routes endpoints to connectors by scheme.
///
/// Each scheme has exactly one factory; registering another factory for the
/// same scheme replaces the previous one along with its cached connectors.
#[derive(Default)]
pub struct GatewayRouter {
    caches: HashMap<String, ConnectorCache>,
}

impl GatewayRouter {
    /// Create a router with no factories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for its scheme.
    pub fn register(&mut self, factory: Arc<dyn ConnectorFactory>) {
        let scheme = factory.scheme().to_string();
        tracing::debug!(scheme = %scheme, "Registering connector factory");
        if self
            .caches
            .insert(scheme.clone(), ConnectorCache::new(factory))
            .is_some()
        {
            tracing::warn!(scheme = %scheme, "Replaced existing connector factory");
        }
    }

    /// Builder-style [`GatewayRouter::register`].
    pub fn with_factory(mut self, factory: Arc<dyn ConnectorFactory>) -> Self {
        self.register(factory);
        self
    }

    /// Check if a factory is registered for `scheme`.
    pub fn is_registered(&self, scheme: &str) -> bool {
        self.caches.contains_key(scheme)
    }

    /// Get all registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.caches.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Returns the cached connector for `endpoint`.
    ///
    /// Fails with [`RoutingError::UnknownScheme`] if no factory serves its scheme.
    pub fn connector(&self, endpoint: &Endpoint) -> Result<Arc<dyn ModelProvider>> {
        self.cache(endpoint.scheme())?.get_or_create(endpoint)
    }

    /// Drops the cached connector for `endpoint` so the next request builds a fresh one.
    pub fn evict(&self, endpoint: &Endpoint) -> Result<bool> {
        Ok(self.cache(endpoint.scheme())?.evict(endpoint))
    }

    fn cache(&self, scheme: &str) -> Result<&ConnectorCache> {
        self.caches.get(scheme).ok_or_else(|| {
            RoutingError::UnknownScheme {
                scheme: scheme.to_string(),
            }
            .into()
        })
    }
}

impl fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("schemes", &self.schemes())
            .finish()
    }
}
