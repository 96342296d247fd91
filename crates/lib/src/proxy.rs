//! Element proxies: a path prefix bound to a provider.
//!
//! A proxy forwards every operation to its provider with its prefix prepended.
//! Because [`ElementProxy`] is itself a [`ModelProvider`], proxies compose: a
//! proxy over a proxy behaves like a single proxy on the concatenated prefix.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use vab::{ElementProxy, ModelProvider, Value, provider::MapProvider};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vab::Result<()> {
//! let provider = Arc::new(MapProvider::new(
//!     Value::structure().with("a", Value::structure().with("b", 1)),
//! ));
//! let a = ElementProxy::new("a", provider);
//! assert_eq!(a.read("b").await?, Value::Int(1));
//!
//! let b = a.deep_proxy("b");
//! assert_eq!(b.read("").await?, Value::Int(1));
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{Result, path, provider::ModelProvider, value::Value};

/// A provider view rooted at `prefix` inside another provider.
#[derive(Clone)]
pub struct ElementProxy {
    prefix: String,
    provider: Arc<dyn ModelProvider>,
}

impl ElementProxy {
    /// Creates a proxy forwarding to `provider` under `prefix`.
    ///
    /// The prefix is kept verbatim; it may be an address remainder containing a
    /// chain marker.
    pub fn new(prefix: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            prefix: prefix.into(),
            provider,
        }
    }

    /// A proxy on the root of `provider`.
    pub fn root(provider: Arc<dyn ModelProvider>) -> Self {
        Self::new("", provider)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    /// A proxy on `path` below this one, over the same provider.
    pub fn deep_proxy(&self, path: &str) -> ElementProxy {
        ElementProxy {
            prefix: path::concat(&self.prefix, path),
            provider: self.provider.clone(),
        }
    }

    fn target(&self, path: &str) -> String {
        path::concat(&self.prefix, path)
    }
}

impl fmt::Debug for ElementProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementProxy")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModelProvider for ElementProxy {
    async fn read(&self, path: &str) -> Result<Value> {
        self.provider.read(&self.target(path)).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.provider.write(&self.target(path), value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.provider.create(&self.target(path), value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.provider.delete(&self.target(path)).await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.provider.delete_member(&self.target(path), value).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        self.provider.invoke(&self.target(path), args).await
    }
}
