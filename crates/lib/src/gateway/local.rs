//! In-process connectors for the `local` scheme.
//!
//! A [`LocalBus`] is a named registry of providers living in the same process.
//! `local://<name>` addresses reach them without any serialization.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{
    Result,
    address::Endpoint,
    gateway::ConnectorFactory,
    provider::ModelProvider,
    transport::TransportError,
    value::Value,
};

/// Scheme served by [`LocalConnectorFactory`].
pub const LOCAL_SCHEME: &str = "local";

/// A shared registry of in-process providers.
///
/// Cloning the bus yields another handle on the same registry.
#[derive(Clone, Default)]
pub struct LocalBus {
    providers: Arc<RwLock<HashMap<String, Arc<dyn ModelProvider>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `provider` under `name`, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn ModelProvider>) {
        let name = name.into();
        tracing::debug!(name = %name, "Registering provider on local bus");
        self.providers.write().unwrap().insert(name, provider);
    }

    /// Removes the provider published under `name`.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.write().unwrap().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.read().unwrap().get(name).cloned()
    }

    /// Names of all published providers.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Factory for `local://<name>` connectors over a [`LocalBus`].
pub struct LocalConnectorFactory {
    bus: LocalBus,
}

impl LocalConnectorFactory {
    pub fn new(bus: LocalBus) -> Self {
        Self { bus }
    }
}

impl ConnectorFactory for LocalConnectorFactory {
    fn scheme(&self) -> &str {
        LOCAL_SCHEME
    }

    fn create_connector(&self, endpoint: &Endpoint) -> Result<Arc<dyn ModelProvider>> {
        Ok(Arc::new(LocalConnector {
            bus: self.bus.clone(),
            name: endpoint.location().to_string(),
        }))
    }
}

/// Connector to one named provider on a [`LocalBus`].
///
/// The name is looked up on every request, so a provider may be published
/// after the connector was created.
pub struct LocalConnector {
    bus: LocalBus,
    name: String,
}

impl LocalConnector {
    fn target(&self) -> Result<Arc<dyn ModelProvider>> {
        self.bus.get(&self.name).ok_or_else(|| {
            TransportError::ConnectionFailed {
                address: format!("{LOCAL_SCHEME}://{}", self.name),
                reason: "no provider published under this name".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ModelProvider for LocalConnector {
    async fn read(&self, path: &str) -> Result<Value> {
        self.target()?.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.target()?.write(path, value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.target()?.create(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.target()?.delete(path).await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.target()?.delete_member(path, value).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        self.target()?.invoke(path, args).await
    }
}
