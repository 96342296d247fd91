//! Adapters between the typed provider contract and its JSON text form.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Result,
    provider::{ModelProvider, ProviderError},
    transport::{RawProvider, Request, TransportError},
    value::Value,
};

/// Text of a unit result.
pub const UNIT: &str = "null";

/// Serves a [`ModelProvider`] through the [`RawProvider`] contract.
///
/// Request payloads that are not valid JSON are rejected as `Malformed`.
#[derive(Clone)]
pub struct JsonProvider {
    provider: Arc<dyn ModelProvider>,
}

impl JsonProvider {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    fn decode(path: &str, text: &str) -> Result<Value> {
        Value::from_json_str(text).map_err(|e| {
            ProviderError::malformed(path, format!("invalid JSON payload: {e}")).into()
        })
    }
}

#[async_trait]
impl RawProvider for JsonProvider {
    async fn handle(&self, request: Request) -> Result<String> {
        tracing::debug!(op = request.operation(), path = request.path(), "Handling request");
        match request {
            Request::Read { path } => self.provider.read(&path).await?.encode(&path),
            Request::Write { path, value } => {
                let value = Self::decode(&path, &value)?;
                self.provider.write(&path, value).await?;
                Ok(UNIT.to_string())
            }
            Request::Create { path, value } => {
                let value = Self::decode(&path, &value)?;
                self.provider.create(&path, value).await?;
                Ok(UNIT.to_string())
            }
            Request::Delete { path } => {
                self.provider.delete(&path).await?;
                Ok(UNIT.to_string())
            }
            Request::DeleteMember { path, value } => {
                let value = Self::decode(&path, &value)?;
                self.provider.delete_member(&path, value).await?;
                Ok(UNIT.to_string())
            }
            Request::Invoke { path, args } => {
                let args = args
                    .iter()
                    .map(|arg| Self::decode(&path, arg))
                    .collect::<Result<Vec<_>>>()?;
                self.provider.invoke(&path, args).await?.encode(&path)
            }
        }
    }
}

/// A [`ModelProvider`] over any raw transport client.
pub struct JsonConnector<R> {
    raw: R,
}

impl<R: RawProvider> JsonConnector<R> {
    pub fn new(raw: R) -> Self {
        Self { raw }
    }

    /// The underlying transport client.
    pub fn raw(&self) -> &R {
        &self.raw
    }

    fn decode(text: &str) -> Result<Value> {
        let json = serde_json::from_str(text).map_err(|source| TransportError::Decode { source })?;
        Ok(Value::from_json(json))
    }

    fn expect_unit(text: String) -> Result<()> {
        Self::decode(&text).map(|_| ())
    }
}

#[async_trait]
impl<R: RawProvider> ModelProvider for JsonConnector<R> {
    async fn read(&self, path: &str) -> Result<Value> {
        Self::decode(&self.raw.read(path).await?)
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        Self::expect_unit(self.raw.write(path, value.encode(path)?).await?)
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        Self::expect_unit(self.raw.create(path, value.encode(path)?).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        Self::expect_unit(self.raw.delete(path).await?)
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        Self::expect_unit(self.raw.delete_member(path, value.encode(path)?).await?)
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        let args = args
            .iter()
            .map(|arg| arg.encode(path))
            .collect::<Result<Vec<_>>>()?;
        Self::decode(&self.raw.invoke(path, args).await?)
    }
}
