//! Change clock and read-only latch around any provider.
//!
//! [`ConsistencyProvider`] reserves one top-level element (by default
//! `_consistency`) holding two entries:
//!
//! - `clock`: an integer incremented once per successful write, delete or
//!   delete_member on any other path. Clients poll it to detect change.
//! - `frozen`: a boolean latch. While set, mutations fail `ReadOnly`.
//!
//! ```rust
//! # use vab::{ModelProvider, Value, consistency::ConsistencyProvider, provider::MapProvider};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vab::Result<()> {
//! let provider = ConsistencyProvider::new(MapProvider::default());
//! provider.write("speed", Value::Int(3)).await?;
//! assert_eq!(provider.read("_consistency/clock").await?, Value::Int(1));
//!
//! provider.write("_consistency/frozen", Value::Bool(true)).await?;
//! assert!(provider.write("speed", Value::Int(4)).await.unwrap_err().is_read_only());
//! # Ok(())
//! # }
//! ```

use std::{
    future::Future,
    sync::atomic::{AtomicBool, AtomicI64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Result,
    path::Path,
    provider::{ModelProvider, ProviderError},
    value::Value,
};

/// Default name of the reserved state element.
pub const DEFAULT_STATE_ELEMENT: &str = "_consistency";

const CLOCK: &str = "clock";
const FROZEN: &str = "frozen";

/// Where a request path points relative to the reserved element.
enum Target {
    State,
    Clock,
    Frozen,
    UnknownState,
    Inner,
}

/// A decorator adding a modification clock and a freeze latch.
///
/// Mutations hold a shared guard on the latch from the frozen check until the
/// clock has ticked. Changing the latch takes the exclusive guard, so it waits
/// for in-flight mutations and none can land after it.
#[derive(Debug)]
pub struct ConsistencyProvider<P> {
    inner: P,
    element: String,
    latch: RwLock<()>,
    frozen: AtomicBool,
    clock: AtomicI64,
}

impl<P: ModelProvider> ConsistencyProvider<P> {
    /// Wraps `inner`, reserving [`DEFAULT_STATE_ELEMENT`].
    pub fn new(inner: P) -> Self {
        Self::with_state_element(inner, DEFAULT_STATE_ELEMENT)
    }

    /// Wraps `inner`, reserving the given top-level element name.
    pub fn with_state_element(inner: P, element: impl Into<String>) -> Self {
        Self {
            inner,
            element: element.into(),
            latch: RwLock::new(()),
            frozen: AtomicBool::new(false),
            clock: AtomicI64::new(0),
        }
    }

    /// Current clock value.
    pub fn clock(&self) -> i64 {
        self.clock.load(Ordering::SeqCst)
    }

    /// Whether mutations are currently rejected.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Sets or clears the read-only latch once in-flight mutations have finished.
    pub async fn set_frozen(&self, frozen: bool) {
        let _exclusive = self.latch.write().await;
        self.frozen.store(frozen, Ordering::SeqCst);
        tracing::info!(element = %self.element, frozen, "Consistency latch changed");
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn target(&self, path: &str) -> Result<Target> {
        let parsed = Path::parse(path)?;
        let elements = parsed.elements();
        if elements.first().map(String::as_str) != Some(self.element.as_str()) {
            return Ok(Target::Inner);
        }
        Ok(match &elements[1..] {
            [] => Target::State,
            [name] if name == CLOCK => Target::Clock,
            [name] if name == FROZEN => Target::Frozen,
            _ => Target::UnknownState,
        })
    }

    fn state_value(&self) -> Value {
        Value::structure()
            .with(CLOCK, self.clock())
            .with(FROZEN, self.is_frozen())
    }

    /// Runs a mutation on the inner provider while the latch is held shared.
    ///
    /// `ticks` controls whether a successful mutation advances the clock.
    async fn guarded<F>(&self, path: &str, ticks: bool, mutation: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send,
    {
        match self.target(path)? {
            Target::Inner => {
                let _shared = self.latch.read().await;
                if self.is_frozen() {
                    return Err(ProviderError::read_only(path).into());
                }
                mutation.await?;
                if ticks {
                    let clock = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::debug!(path, clock, "Consistency clock ticked");
                }
                Ok(())
            }
            Target::UnknownState => Err(ProviderError::not_found(path).into()),
            _ => Err(ProviderError::read_only(path).into()),
        }
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for ConsistencyProvider<P> {
    async fn read(&self, path: &str) -> Result<Value> {
        match self.target(path)? {
            Target::State => Ok(self.state_value()),
            Target::Clock => Ok(Value::Int(self.clock())),
            Target::Frozen => Ok(Value::Bool(self.is_frozen())),
            Target::UnknownState => Err(ProviderError::not_found(path).into()),
            Target::Inner => self.inner.read(path).await,
        }
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        match self.target(path)? {
            Target::Frozen => match value {
                Value::Bool(frozen) => {
                    self.set_frozen(frozen).await;
                    Ok(())
                }
                other => Err(ProviderError::malformed(
                    path,
                    format!("expected a bool, found a {}", other.type_name()),
                )
                .into()),
            },
            _ => self.guarded(path, true, self.inner.write(path, value)).await,
        }
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.guarded(path, false, self.inner.create(path, value)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.guarded(path, true, self.inner.delete(path)).await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.guarded(path, true, self.inner.delete_member(path, value)).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        match self.target(path)? {
            Target::Inner => self.inner.invoke(path, args).await,
            Target::UnknownState => Err(ProviderError::not_found(path).into()),
            _ => Err(ProviderError::malformed(path, "expected an operation").into()),
        }
    }
}
