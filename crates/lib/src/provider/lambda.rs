//! Live-object provider backed by accessor closures.
//!
//! A [`LambdaProvider`] serves a static value tree in which selected paths are
//! bound to [`LambdaProperty`] accessors. Reading a bound path calls its getter,
//! so the element always reflects the live state of whatever object the closure
//! captures. Paths below a binding navigate into the getter's result, and
//! mutations below a binding are applied read-modify-write through the getter
//! and setter.

use std::{collections::BTreeMap, fmt, sync::Arc, sync::RwLock};

use async_trait::async_trait;

use crate::{
    Result,
    path::Path,
    provider::{MapProvider, ModelProvider, ProviderError, tree},
    value::Value,
};

/// Produces the current value of a property.
pub type Getter = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// Consumes a value for a property (set, insert or remove).
pub type Consumer = Arc<dyn Fn(Value) -> Result<()> + Send + Sync>;

/// Accessors for one live element.
///
/// Every accessor is optional; a missing accessor makes the matching operation
/// unsupported on that element.
///
/// ```
/// # use vab::provider::LambdaProperty;
/// # use vab::Value;
/// # use std::sync::{Arc, atomic::{AtomicI64, Ordering}};
/// let speed = Arc::new(AtomicI64::new(0));
/// let (get, set) = (speed.clone(), speed.clone());
/// let property = LambdaProperty::new()
///     .getter(move || Ok(Value::Int(get.load(Ordering::SeqCst))))
///     .setter(move |value| {
///         set.store(value.as_int().unwrap_or_default(), Ordering::SeqCst);
///         Ok(())
///     });
/// ```
#[derive(Clone, Default)]
pub struct LambdaProperty {
    get: Option<Getter>,
    set: Option<Consumer>,
    insert: Option<Consumer>,
    remove: Option<Consumer>,
}

impl LambdaProperty {
    /// A property with no accessors.
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only property.
    pub fn read_only<F>(get: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Self::new().getter(get)
    }

    /// Sets the accessor used by `read`.
    pub fn getter<F>(mut self, get: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(get));
        self
    }

    /// Sets the accessor used by `write`.
    pub fn setter<F>(mut self, set: F) -> Self
    where
        F: Fn(Value) -> Result<()> + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(set));
        self
    }

    /// Sets the accessor used by `create` (adding a member).
    pub fn inserter<F>(mut self, insert: F) -> Self
    where
        F: Fn(Value) -> Result<()> + Send + Sync + 'static,
    {
        self.insert = Some(Arc::new(insert));
        self
    }

    /// Sets the accessor used by `delete_member`.
    pub fn remover<F>(mut self, remove: F) -> Self
    where
        F: Fn(Value) -> Result<()> + Send + Sync + 'static,
    {
        self.remove = Some(Arc::new(remove));
        self
    }

    fn get(&self, path: &Path) -> Result<Value> {
        match &self.get {
            Some(get) => get(),
            None => Err(ProviderError::unsupported("read", path.to_string()).into()),
        }
    }

    fn set(&self, path: &Path, value: Value) -> Result<()> {
        match &self.set {
            Some(set) => set(value),
            None => Err(ProviderError::unsupported("write", path.to_string()).into()),
        }
    }
}

impl fmt::Debug for LambdaProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaProperty")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .field("insert", &self.insert.is_some())
            .field("remove", &self.remove.is_some())
            .finish()
    }
}

/// A provider mixing a static tree with live, accessor-backed properties.
#[derive(Debug, Default)]
pub struct LambdaProvider {
    statics: MapProvider,
    bindings: RwLock<BTreeMap<Path, LambdaProperty>>,
}

/// Where a request path lands relative to the bindings.
enum Target {
    /// Exactly on a binding.
    Bound(LambdaProperty),
    /// Below a binding; carries the remainder inside the property's value.
    Inside(LambdaProperty, Path),
    /// In the static tree.
    Static,
}

impl LambdaProvider {
    /// Creates a provider with the given static tree and no bindings.
    pub fn new(statics: Value) -> Self {
        Self {
            statics: MapProvider::new(statics),
            bindings: RwLock::new(BTreeMap::new()),
        }
    }

    /// Binds `property` at `path`, replacing any previous binding there.
    pub fn bind(&self, path: &str, property: LambdaProperty) -> Result<()> {
        let path = Path::parse(path)?;
        tracing::debug!(path = %path, "Binding lambda property");
        self.bindings.write().unwrap().insert(path, property);
        Ok(())
    }

    /// Builder-style [`LambdaProvider::bind`].
    pub fn with_property(self, path: &str, property: LambdaProperty) -> Result<Self> {
        self.bind(path, property)?;
        Ok(self)
    }

    /// Removes the binding at `path`, returning whether one existed.
    pub fn unbind(&self, path: &str) -> Result<bool> {
        let path = Path::parse(path)?;
        Ok(self.bindings.write().unwrap().remove(&path).is_some())
    }

    fn target(&self, path: &Path) -> Target {
        let bindings = self.bindings.read().unwrap();
        // Longest bound prefix wins.
        let found = bindings
            .iter()
            .filter(|(bound, _)| path.starts_with(bound))
            .max_by_key(|(bound, _)| bound.len());
        match found {
            Some((bound, property)) if bound == path => Target::Bound(property.clone()),
            Some((bound, property)) => {
                let rest = path.strip_prefix(bound).unwrap_or_default();
                Target::Inside(property.clone(), rest)
            }
            None => Target::Static,
        }
    }

    /// Bindings strictly below `path`, with their paths relative to it.
    fn bindings_below(&self, path: &Path) -> Vec<(Path, LambdaProperty)> {
        self.bindings
            .read()
            .unwrap()
            .iter()
            .filter(|(bound, _)| bound.len() > path.len())
            .filter_map(|(bound, property)| {
                bound
                    .strip_prefix(path)
                    .map(|rest| (rest, property.clone()))
            })
            .collect()
    }

    /// Applies a tree mutation to the value behind a property.
    fn modify<F>(property: &LambdaProperty, bound: &Path, rest: &Path, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Value, &Path) -> Result<()>,
    {
        let mut value = property.get(bound)?;
        mutate(&mut value, rest)?;
        property.set(bound, value)
    }

    fn bound_prefix(path: &Path, rest: &Path) -> Path {
        Path::from_elements(path.elements()[..path.len() - rest.len()].iter().cloned())
    }
}

#[async_trait]
impl ModelProvider for LambdaProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        let path = Path::parse(path)?;
        match self.target(&path) {
            Target::Bound(property) => property.get(&path),
            Target::Inside(property, rest) => tree::read(&property.get(&path)?, &rest),
            Target::Static => {
                let below = self.bindings_below(&path);
                let mut value = match self.statics.read(&path.to_string()).await {
                    Ok(value) => value,
                    Err(e) if e.is_not_found() && !below.is_empty() => Value::structure(),
                    Err(e) => return Err(e),
                };
                for (relative, property) in below {
                    if property.get.is_some() {
                        tree::graft(&mut value, &relative, property.get(&path.join(&relative))?);
                    }
                }
                Ok(value)
            }
        }
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        match self.target(&path) {
            Target::Bound(property) => property.set(&path, value),
            Target::Inside(property, rest) => {
                let bound = Self::bound_prefix(&path, &rest);
                Self::modify(&property, &bound, &rest, |node, rest| {
                    tree::write(node, rest, value)
                })
            }
            Target::Static => self.statics.write(&path.to_string(), value).await,
        }
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        match self.target(&path) {
            Target::Bound(property) => match &property.insert {
                Some(insert) => insert(value),
                None => Err(ProviderError::unsupported("create", path.to_string()).into()),
            },
            Target::Inside(property, rest) => {
                let bound = Self::bound_prefix(&path, &rest);
                Self::modify(&property, &bound, &rest, |node, rest| {
                    tree::create(node, rest, value)
                })
            }
            Target::Static => self.statics.create(&path.to_string(), value).await,
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = Path::parse(path)?;
        match self.target(&path) {
            Target::Bound(_) => Err(ProviderError::unsupported("delete", path.to_string()).into()),
            Target::Inside(property, rest) => {
                let bound = Self::bound_prefix(&path, &rest);
                Self::modify(&property, &bound, &rest, tree::delete)
            }
            Target::Static => self.statics.delete(&path.to_string()).await,
        }
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        let path = Path::parse(path)?;
        match self.target(&path) {
            Target::Bound(property) => match &property.remove {
                Some(remove) => remove(value),
                None => Err(ProviderError::unsupported("delete_member", path.to_string()).into()),
            },
            Target::Inside(property, rest) => {
                let bound = Self::bound_prefix(&path, &rest);
                Self::modify(&property, &bound, &rest, |node, rest| {
                    tree::delete_member(node, rest, &value)
                })
            }
            Target::Static => self.statics.delete_member(&path.to_string(), value).await,
        }
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        let path = Path::parse(path)?;
        match self.target(&path) {
            Target::Bound(property) => match property.get(&path)? {
                Value::Operation(op) => op.call(args),
                other => Err(ProviderError::malformed(
                    path.to_string(),
                    format!("expected an operation, found a {}", other.type_name()),
                )
                .into()),
            },
            Target::Inside(property, rest) => {
                let value = property.get(&path)?;
                tree::operation(&value, &rest)?.call(args)
            }
            Target::Static => self.statics.invoke(&path.to_string(), args).await,
        }
    }
}
