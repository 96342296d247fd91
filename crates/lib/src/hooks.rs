//! Mutation hooks for observing changes made through a provider.
//!
//! This module provides the infrastructure for hooking into provider mutations:
//! an [`ObservableProvider`] wraps any provider and, after every successful
//! write, create, delete or delete_member, notifies the hooks registered in its
//! [`HookCollection`].

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::{Result, provider::ModelProvider, value::Value};

/// The kind of mutation that happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Write,
    Create,
    Delete,
    DeleteMember,
}

/// Information passed to hooks after a mutation succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    /// What kind of mutation happened
    pub kind: MutationKind,
    /// The path the mutation addressed, as seen by the observable provider
    pub path: String,
    /// The value written, created or removed; `None` for deletes
    pub value: Option<Value>,
}

/// Trait for implementing hooks that are called after a mutation.
pub trait MutationHook: Send + Sync {
    /// Called after a mutation has been applied by the wrapped provider.
    ///
    /// # Returns
    /// A Result indicating whether the hook processed successfully.
    /// Hook failures do not undo the mutation, but are logged.
    fn on_mutation(&self, event: &MutationEvent) -> Result<()>;
}

impl<F> MutationHook for F
where
    F: Fn(&MutationEvent) -> Result<()> + Send + Sync,
{
    fn on_mutation(&self, event: &MutationEvent) -> Result<()> {
        self(event)
    }
}

/// A collection of mutation hooks that are executed together.
#[derive(Default)]
pub struct HookCollection {
    hooks: Vec<Arc<dyn MutationHook>>,
}

impl HookCollection {
    /// Create a new empty hook collection.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook to the collection.
    pub fn add_hook(&mut self, hook: Arc<dyn MutationHook>) {
        self.hooks.push(hook);
    }

    /// Execute all hooks in the collection with the given event.
    ///
    /// Hooks are executed in the order they were added. If a hook fails,
    /// execution continues with the remaining hooks.
    ///
    /// # Returns
    /// Ok if all hooks succeeded, or the first error encountered.
    pub fn execute_hooks(&self, event: &MutationEvent) -> Result<()> {
        let mut first_error = None;

        for hook in &self.hooks {
            if let Err(e) = hook.on_mutation(event) {
                tracing::error!(
                    path = %event.path,
                    kind = ?event.kind,
                    "Mutation hook failed: {e}"
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Get the number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// A provider decorator that notifies hooks after successful mutations.
///
/// Reads and invocations pass straight through. A failing hook never turns a
/// successful mutation into an error; the failure is logged instead.
pub struct ObservableProvider<P> {
    inner: P,
    hooks: RwLock<HookCollection>,
}

impl<P: ModelProvider> ObservableProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            hooks: RwLock::new(HookCollection::new()),
        }
    }

    /// Register a hook for all subsequent mutations.
    pub fn subscribe(&self, hook: Arc<dyn MutationHook>) {
        self.hooks.write().unwrap().add_hook(hook);
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn notify(&self, kind: MutationKind, path: &str, value: Option<Value>) {
        let event = MutationEvent {
            kind,
            path: path.to_string(),
            value,
        };
        // Errors were already logged per hook.
        let _ = self.hooks.read().unwrap().execute_hooks(&event);
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for ObservableProvider<P> {
    async fn read(&self, path: &str) -> Result<Value> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.inner.write(path, value.clone()).await?;
        self.notify(MutationKind::Write, path, Some(value));
        Ok(())
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.inner.create(path, value.clone()).await?;
        self.notify(MutationKind::Create, path, Some(value));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await?;
        self.notify(MutationKind::Delete, path, None);
        Ok(())
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.inner.delete_member(path, value.clone()).await?;
        self.notify(MutationKind::DeleteMember, path, Some(value));
        Ok(())
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        self.inner.invoke(path, args).await
    }
}
