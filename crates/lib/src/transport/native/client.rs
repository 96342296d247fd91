//! Native transport client.

use async_trait::async_trait;
use tokio::{net::TcpStream, sync::Mutex};

use super::{NativeTransportConfig, frame};
use crate::{
    Error, Result,
    transport::{RawProvider, Request, TransportError, shared::Reply},
};

/// A raw client holding one persistent connection to a native server.
///
/// The connection is opened on the first request and reused afterwards. Only
/// one request is in flight at a time. Any failed exchange (I/O error, protocol
/// violation or timeout) drops the connection so the next request reconnects;
/// errors reported by the remote provider keep it open.
#[derive(Debug)]
pub struct NativeConnector {
    address: String,
    config: NativeTransportConfig,
    stream: Mutex<Option<TcpStream>>,
}

impl NativeConnector {
    /// Creates a connector for `host:port`. No connection is made yet.
    pub fn new(address: impl Into<String>, config: NativeTransportConfig) -> Self {
        Self {
            address: address.into(),
            config,
            stream: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Check if a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Closes the connection, if any.
    pub async fn disconnect(&self) {
        if self.stream.lock().await.take().is_some() {
            tracing::debug!(address = %self.address, "Disconnected");
        }
    }

    /// Runs one request/response exchange.
    ///
    /// The stream is taken out of `slot` for the duration and only put back
    /// after a complete response, so a failed or cancelled exchange leaves the
    /// connector disconnected.
    async fn exchange(&self, slot: &mut Option<TcpStream>, request: &[u8]) -> Result<Reply> {
        let mut stream = match slot.take() {
            Some(stream) => stream,
            None => {
                let stream = TcpStream::connect(&self.address).await.map_err(|e| {
                    TransportError::ConnectionFailed {
                        address: self.address.clone(),
                        reason: e.to_string(),
                    }
                })?;
                tracing::debug!(address = %self.address, "Connected");
                stream
            }
        };

        frame::write_frame(&mut stream, request)
            .await
            .map_err(|e| self.io_error(e))?;
        let body = frame::read_frame(&mut stream, self.config.max_frame_len)
            .await
            .map_err(|e| self.io_error(e))?
            .ok_or_else(|| TransportError::ConnectionFailed {
                address: self.address.clone(),
                reason: "server closed the connection".to_string(),
            })?;
        let reply = frame::decode_response(&body)?;
        *slot = Some(stream);
        Ok(reply)
    }

    fn io_error(&self, error: Error) -> Error {
        match error {
            Error::Io(source) => TransportError::Io {
                address: self.address.clone(),
                source,
            }
            .into(),
            other => other,
        }
    }
}

#[async_trait]
impl RawProvider for NativeConnector {
    async fn handle(&self, request: Request) -> Result<String> {
        let bytes = frame::encode_request(&request)?;
        let mut slot = self.stream.lock().await;
        let timeout = self.config.timeout();

        let outcome = match tokio::time::timeout(timeout, self.exchange(&mut slot, &bytes)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout {
                address: self.address.clone(),
                timeout,
            }
            .into()),
        };

        match outcome {
            Ok(Reply::Ok(payload)) => Ok(payload),
            Ok(Reply::Err(remote)) => Err(remote.into_error()),
            Err(e) => {
                tracing::debug!(
                    address = %self.address,
                    op = request.operation(),
                    "Request failed, connection dropped: {e}"
                );
                Err(e)
            }
        }
    }
}
