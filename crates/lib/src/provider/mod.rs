//! The provider contract and its local backends.
//!
//! [`ModelProvider`] is the single seam of the library: every backend implements
//! it (in-memory trees, accessor closures, the filesystem, remote connectors) and
//! every caller (proxies, decorators, gateways, servers) depends on nothing else.
//! Composition and routing therefore never special-case a backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Result, value::Value};

mod errors;
pub mod filesystem;
pub mod lambda;
pub mod map;
pub(crate) mod tree;

pub use errors::ProviderError;
pub use filesystem::FileSystemProvider;
pub use lambda::{LambdaProperty, LambdaProvider};
pub use map::MapProvider;

/// Uniform access to a tree of elements.
///
/// Paths are encoded path text (see [`crate::path`]); the empty path is the
/// root. Gateways may also receive chained address text as a path.
///
/// All implementations must be `Send` and `Sync` so they can be shared behind
/// an `Arc` by any number of proxies and connections.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the element at `path`.
    ///
    /// Fails `NotFound` if nothing exists there.
    async fn read(&self, path: &str) -> Result<Value>;

    /// Replaces the element at `path`, inserting it if the parent exists.
    ///
    /// Fails `NotFound` if the parent container does not exist.
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Adds a new element.
    ///
    /// Appends to the collection at `path`, or inserts a new key into the parent
    /// structure. Fails `AlreadyExists` if that key is occupied; collections never
    /// reject duplicates.
    async fn create(&self, path: &str, value: Value) -> Result<()>;

    /// Removes the element at `path` from its parent.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Removes the first member equal to `value` from the collection at `path`.
    ///
    /// Fails `NotFound` if no member matches and `Malformed` if `path` is not a collection.
    async fn delete_member(&self, path: &str, value: Value) -> Result<()>;

    /// Invokes the operation at `path`.
    ///
    /// Fails `Malformed` if `path` is not an operation.
    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value>;
}

#[async_trait]
impl<P: ModelProvider + ?Sized> ModelProvider for Arc<P> {
    async fn read(&self, path: &str) -> Result<Value> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        (**self).write(path, value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        (**self).create(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        (**self).delete(path).await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        (**self).delete_member(path, value).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        (**self).invoke(path, args).await
    }
}
