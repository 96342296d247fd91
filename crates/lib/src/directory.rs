//! Directory service mapping logical keys to addresses.
//!
//! A directory lets clients name a provider by a stable key instead of its
//! current network address. It is itself reachable through the provider
//! contract ([`DirectoryProvider`] on the serving side, [`RemoteDirectory`] on
//! the client side), so a directory can sit behind any transport.
//!
//! Over the provider contract, entries live under the `directory` prefix:
//!
//! - `read("directory/<key>")` looks a key up.
//! - `read("directory")` returns a structure of all entries.
//! - `create("directory/<key>", Text(address))` adds or replaces a mapping.
//! - `delete("directory/<key>")` removes a mapping.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{
    Result,
    path::{self, Path},
    provider::{ModelProvider, ProviderError},
    value::Value,
};

/// Path prefix a directory is served under.
pub const DIRECTORY_PREFIX: &str = "directory";

/// Maps keys to addresses.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Adds a mapping, replacing any previous address for `key`.
    async fn add_mapping(&self, key: &str, address: &str) -> Result<()>;

    /// Removes the mapping for `key`. Fails `NotFound` if there is none.
    async fn remove_mapping(&self, key: &str) -> Result<()>;

    /// Returns the address mapped to `key`. Fails `NotFound` if there is none.
    async fn lookup(&self, key: &str) -> Result<String>;
}

/// A directory held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all mappings, sorted by key.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|(key, address)| (key.clone(), address.clone()))
            .collect()
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn add_mapping(&self, key: &str, address: &str) -> Result<()> {
        tracing::debug!(key, address, "Adding directory mapping");
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), address.to_string());
        Ok(())
    }

    async fn remove_mapping(&self, key: &str) -> Result<()> {
        match self.entries.write().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(ProviderError::not_found(entry_path(key)).into()),
        }
    }

    async fn lookup(&self, key: &str) -> Result<String> {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(entry_path(key)).into())
    }
}

/// Encoded path of the entry for `key`.
fn entry_path(key: &str) -> String {
    path::concat(DIRECTORY_PREFIX, &path::encode_element(key))
}

/// Serves an [`InMemoryDirectory`] through the provider contract.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    directory: Arc<InMemoryDirectory>,
}

/// What a request path addresses inside the directory.
enum Target {
    All,
    Entry(String),
}

impl DirectoryProvider {
    pub fn new(directory: Arc<InMemoryDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<InMemoryDirectory> {
        &self.directory
    }

    fn target(&self, text: &str) -> Result<Target> {
        let parsed = Path::parse(text)?;
        match parsed.elements() {
            [prefix] if prefix == DIRECTORY_PREFIX => Ok(Target::All),
            [prefix, key] if prefix == DIRECTORY_PREFIX => Ok(Target::Entry(key.clone())),
            [prefix, ..] if prefix == DIRECTORY_PREFIX => {
                Err(ProviderError::malformed(text, "directory keys are single elements").into())
            }
            _ => Err(ProviderError::not_found(text).into()),
        }
    }

    fn entry(&self, text: &str, operation: &str) -> Result<String> {
        match self.target(text)? {
            Target::Entry(key) => Ok(key),
            Target::All => Err(ProviderError::unsupported(operation, text).into()),
        }
    }
}

#[async_trait]
impl ModelProvider for DirectoryProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        match self.target(path)? {
            Target::All => Ok(Value::Structure(
                self.directory
                    .entries()
                    .into_iter()
                    .map(|(key, address)| (key, Value::Text(address)))
                    .collect(),
            )),
            Target::Entry(key) => Ok(Value::Text(self.directory.lookup(&key).await?)),
        }
    }

    async fn write(&self, path: &str, _value: Value) -> Result<()> {
        Err(ProviderError::unsupported("write", path).into())
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        let key = self.entry(path, "create")?;
        match value {
            Value::Text(address) => self.directory.add_mapping(&key, &address).await,
            other => Err(ProviderError::malformed(
                path,
                format!("expected an address text, found a {}", other.type_name()),
            )
            .into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let key = self.entry(path, "delete")?;
        self.directory.remove_mapping(&key).await
    }

    async fn delete_member(&self, path: &str, _value: Value) -> Result<()> {
        Err(ProviderError::unsupported("delete_member", path).into())
    }

    async fn invoke(&self, path: &str, _args: Vec<Value>) -> Result<Value> {
        Err(ProviderError::unsupported("invoke", path).into())
    }
}

/// A [`DirectoryService`] reached through any provider serving the directory
/// prefix, typically a proxy on a remote directory server.
#[derive(Clone)]
pub struct RemoteDirectory {
    provider: Arc<dyn ModelProvider>,
}

impl RemoteDirectory {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl DirectoryService for RemoteDirectory {
    async fn add_mapping(&self, key: &str, address: &str) -> Result<()> {
        self.provider
            .create(&entry_path(key), Value::from(address))
            .await
    }

    async fn remove_mapping(&self, key: &str) -> Result<()> {
        self.provider.delete(&entry_path(key)).await
    }

    async fn lookup(&self, key: &str) -> Result<String> {
        match self.provider.read(&entry_path(key)).await? {
            Value::Text(address) => Ok(address),
            other => Err(ProviderError::malformed(
                entry_path(key),
                format!("expected an address text, found a {}", other.type_name()),
            )
            .into()),
        }
    }
}
