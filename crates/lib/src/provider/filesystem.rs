//! Provider persisting a value tree on the local filesystem.
//!
//! Structures map to directories and every other element maps to a file holding
//! the element's JSON form. File and directory names are the percent-encoded
//! element names, so any element name is a valid file name.

use std::{
    collections::BTreeMap,
    future::Future,
    path::{Path as FsPath, PathBuf},
    pin::Pin,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    Result,
    path::{Path, decode_element, encode_element},
    provider::{ModelProvider, ProviderError, tree},
    value::Value,
};

/// What a request path currently maps to on disk.
enum Node {
    Directory(PathBuf),
    File(PathBuf),
    Missing,
}

/// A provider rooted at a directory.
///
/// All operations are serialized through an async mutex, so concurrent
/// read-modify-write cycles on the same file cannot interleave.
#[derive(Debug)]
pub struct FileSystemProvider {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileSystemProvider {
    /// Opens a provider rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<FsPath>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "Opened filesystem provider");
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    /// The directory this provider is rooted at.
    pub fn root(&self) -> &FsPath {
        &self.root
    }

    fn location(&self, path: &Path) -> Result<PathBuf> {
        let mut location = self.root.clone();
        for element in path.elements() {
            if element == "." || element == ".." {
                return Err(ProviderError::malformed(
                    path.to_string(),
                    "'.' and '..' are not valid element names here",
                )
                .into());
            }
            location.push(encode_element(element));
        }
        Ok(location)
    }

    async fn node(&self, path: &Path) -> Result<Node> {
        let location = self.location(path)?;
        match tokio::fs::metadata(&location).await {
            Ok(meta) if meta.is_dir() => Ok(Node::Directory(location)),
            Ok(_) => Ok(Node::File(location)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Node::Missing),
            Err(e) => Err(e.into()),
        }
    }

    /// Builds the error for a path that does not exist on disk.
    ///
    /// Walking through a file that holds a collection is malformed; any other
    /// missing step is simply not found.
    async fn missing(&self, path: &Path) -> crate::Error {
        let mut ancestor = Path::root();
        for element in path.elements() {
            if let Ok(Node::File(file)) = self.node(&ancestor).await {
                if let Ok(Value::Collection(_)) = read_file(&file).await {
                    return ProviderError::malformed(
                        path.to_string(),
                        "collections are not indexable",
                    )
                    .into();
                }
                break;
            }
            ancestor = ancestor.push(element.clone());
        }
        ProviderError::not_found(path.to_string()).into()
    }

    /// Requires the parent of `path` to be a directory.
    async fn require_parent(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        match self.node(&parent).await? {
            Node::Directory(_) => Ok(()),
            Node::File(file) => {
                let found = read_file(&file).await?;
                let reason = match found {
                    Value::Collection(_) => "collections are not indexable".to_string(),
                    other => format!("parent is a {}, not a structure", other.type_name()),
                };
                Err(ProviderError::malformed(path.to_string(), reason).into())
            }
            Node::Missing => Err(self.missing(path).await),
        }
    }

    async fn remove(&self, node: Node) -> Result<()> {
        match node {
            Node::Directory(dir) => tokio::fs::remove_dir_all(dir).await?,
            Node::File(file) => tokio::fs::remove_file(file).await?,
            Node::Missing => {}
        }
        Ok(())
    }
}

async fn read_file(file: &FsPath) -> Result<Value> {
    let text = tokio::fs::read_to_string(file).await?;
    Value::from_json_str(&text)
}

/// Rejects values containing operations, which cannot be persisted.
fn check_storable(path: &Path, value: &Value) -> Result<()> {
    match value {
        Value::Operation(_) => Err(ProviderError::malformed(
            path.to_string(),
            "operations cannot be stored on the filesystem",
        )
        .into()),
        Value::Float(n) if !n.is_finite() => Err(ProviderError::malformed(
            path.to_string(),
            "non-finite floats have no JSON form",
        )
        .into()),
        Value::Collection(items) => items.iter().try_for_each(|item| check_storable(path, item)),
        Value::Structure(map) => map.values().try_for_each(|item| check_storable(path, item)),
        _ => Ok(()),
    }
}

fn load_dir(dir: PathBuf) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> {
    Box::pin(async move {
        let mut map = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::warn!(dir = %dir.display(), "Skipping entry with a non UTF-8 name");
                continue;
            };
            let element = decode_element(name)?;
            let value = if entry.file_type().await?.is_dir() {
                load_dir(entry.path()).await?
            } else {
                read_file(&entry.path()).await?
            };
            map.insert(element, value);
        }
        Ok(Value::Structure(map))
    })
}

fn store(location: PathBuf, value: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
    Box::pin(async move {
        match value {
            Value::Structure(map) => {
                tokio::fs::create_dir_all(&location).await?;
                for (key, child) in map {
                    store(location.join(encode_element(&key)), child).await?;
                }
            }
            other => tokio::fs::write(&location, other.to_json_string()).await?,
        }
        Ok(())
    })
}

#[async_trait]
impl ModelProvider for FileSystemProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        let path = Path::parse(path)?;
        let _guard = self.lock.lock().await;
        match self.node(&path).await? {
            Node::Directory(dir) => load_dir(dir).await,
            Node::File(file) => read_file(&file).await,
            Node::Missing => Err(self.missing(&path).await),
        }
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        check_storable(&path, &value)?;
        let _guard = self.lock.lock().await;
        if path.is_root() && !matches!(value, Value::Structure(_)) {
            return Err(
                ProviderError::malformed(path.to_string(), "the root must be a structure").into(),
            );
        }
        self.require_parent(&path).await?;
        let location = self.location(&path)?;
        let existing = self.node(&path).await?;
        self.remove(existing).await?;
        store(location, value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        check_storable(&path, &value)?;
        let _guard = self.lock.lock().await;
        match self.node(&path).await? {
            Node::File(file) => match read_file(&file).await? {
                Value::Collection(mut items) => {
                    items.push(value);
                    tokio::fs::write(&file, Value::Collection(items).to_json_string()).await?;
                    Ok(())
                }
                _ => Err(ProviderError::already_exists(path.to_string()).into()),
            },
            Node::Directory(_) => Err(ProviderError::already_exists(path.to_string()).into()),
            Node::Missing => {
                self.require_parent(&path).await?;
                store(self.location(&path)?, value).await
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = Path::parse(path)?;
        if path.is_root() {
            return Err(
                ProviderError::malformed(path.to_string(), "the root cannot be deleted").into(),
            );
        }
        let _guard = self.lock.lock().await;
        match self.node(&path).await? {
            Node::Missing => Err(self.missing(&path).await),
            node => self.remove(node).await,
        }
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        let _guard = self.lock.lock().await;
        match self.node(&path).await? {
            Node::File(file) => {
                let mut current = read_file(&file).await?;
                tree::delete_member(&mut current, &Path::root(), &value)
                    .map_err(|_| match &current {
                        Value::Collection(_) => ProviderError::not_found(path.to_string()),
                        other => ProviderError::malformed(
                            path.to_string(),
                            format!("expected a collection, found a {}", other.type_name()),
                        ),
                    })?;
                tokio::fs::write(&file, current.to_json_string()).await?;
                Ok(())
            }
            Node::Directory(_) => Err(ProviderError::malformed(
                path.to_string(),
                "expected a collection, found a structure",
            )
            .into()),
            Node::Missing => Err(self.missing(&path).await),
        }
    }

    async fn invoke(&self, path: &str, _args: Vec<Value>) -> Result<Value> {
        let path = Path::parse(path)?;
        let _guard = self.lock.lock().await;
        match self.node(&path).await? {
            Node::Missing => Err(self.missing(&path).await),
            _ => Err(ProviderError::malformed(
                path.to_string(),
                "the filesystem holds no operations",
            )
            .into()),
        }
    }
}
