//! In-memory provider backed by a single value tree.
//!
//! This module provides a map-backed implementation of the provider contract,
//! suitable for testing, for serving small models, or wherever persistence is
//! handled externally (e.g. by saving/loading the whole tree to/from a file).

use std::{path::Path as FsPath, sync::RwLock};

use async_trait::async_trait;

use crate::{
    Result,
    path::Path,
    provider::{ModelProvider, tree},
    value::Value,
};

/// A provider serving one in-memory [`Value`] tree.
///
/// The tree sits behind a read-write lock. Operations are looked up under the
/// read lock and invoked after it is released, so an operation may call back
/// into the same provider.
///
/// It provides basic persistence via [`MapProvider::save_to_file`] and
/// [`MapProvider::load_from_file`], serializing the tree to JSON. Operations do
/// not survive a save/load cycle.
#[derive(Debug)]
pub struct MapProvider {
    root: RwLock<Value>,
}

impl Default for MapProvider {
    fn default() -> Self {
        Self::new(Value::structure())
    }
}

impl MapProvider {
    /// Creates a provider serving `root`.
    pub fn new(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// Returns a copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.root.read().unwrap().clone()
    }

    /// Saves the tree to a JSON file.
    pub async fn save_to_file(&self, file: impl AsRef<FsPath>) -> Result<()> {
        let text = self.snapshot().encode("")?;
        tokio::fs::write(file, text).await?;
        Ok(())
    }

    /// Loads a provider from a JSON file written by [`MapProvider::save_to_file`].
    pub async fn load_from_file(file: impl AsRef<FsPath>) -> Result<Self> {
        let text = tokio::fs::read_to_string(file).await?;
        Ok(Self::new(Value::from_json_str(&text)?))
    }
}

#[async_trait]
impl ModelProvider for MapProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        let path = Path::parse(path)?;
        tree::read(&self.root.read().unwrap(), &path)
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        tree::write(&mut self.root.write().unwrap(), &path, value)
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        tree::create(&mut self.root.write().unwrap(), &path, value)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = Path::parse(path)?;
        tree::delete(&mut self.root.write().unwrap(), &path)
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        tree::delete_member(&mut self.root.write().unwrap(), &path, &value)
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        let path = Path::parse(path)?;
        let operation = tree::operation(&self.root.read().unwrap(), &path)?;
        operation.call(args)
    }
}
