//! The provider a `vab serve` node exposes locally.

use std::sync::Arc;

use async_trait::async_trait;
use vab::{
    ModelProvider, Result, Value,
    directory::{DIRECTORY_PREFIX, DirectoryProvider},
    path,
};

/// Serves the node's directory under `directory/...` and its data everywhere else.
pub struct NodeProvider {
    directory: DirectoryProvider,
    data: Arc<dyn ModelProvider>,
}

impl NodeProvider {
    pub fn new(directory: DirectoryProvider, data: Arc<dyn ModelProvider>) -> Self {
        Self { directory, data }
    }

    fn route(&self, path: &str) -> &dyn ModelProvider {
        match path::split(path).next() {
            Some(first) if first == DIRECTORY_PREFIX => &self.directory,
            _ => self.data.as_ref(),
        }
    }
}

#[async_trait]
impl ModelProvider for NodeProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        self.route(path).read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.route(path).write(path, value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.route(path).create(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.route(path).delete(path).await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.route(path).delete_member(path, value).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        self.route(path).invoke(path, args).await
    }
}
