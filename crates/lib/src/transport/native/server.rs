//! Native transport server.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::{oneshot, watch},
};

use super::{NativeTransportConfig, frame};
use crate::{
    Result,
    transport::{
        RawProvider, RemoteError, TransportError,
        shared::{Reply, ServerState, serve_request},
    },
};

/// A TCP server speaking the native frame protocol.
///
/// Every accepted connection is served by its own task, one request at a time,
/// until the peer closes the socket, an I/O error occurs or the server stops.
#[derive(Debug, Default)]
pub struct NativeServer {
    server_state: ServerState,
    config: NativeTransportConfig,
    active: Arc<AtomicUsize>,
}

/// Decrements the active connection count when a worker ends.
struct ConnectionGuard(Arc<AtomicUsize>);

impl ConnectionGuard {
    fn new(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active.clone())
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NativeServer {
    pub fn new(config: NativeTransportConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Start serving `handler` on `addr`.
    ///
    /// The listener is bound before this returns; use port 0 and
    /// [`NativeServer::get_server_address`] for an ephemeral port.
    pub async fn start_server(&mut self, addr: &str, handler: Arc<dyn RawProvider>) -> Result<()> {
        self.server_state.ensure_stopped(addr)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::ServerBind {
                address: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| TransportError::ServerBind {
            address: addr.to_string(),
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(accept_loop(
            listener,
            handler,
            self.config,
            self.active.clone(),
            shutdown_rx,
        ));

        tracing::info!(address = %local_addr, "Native server started");
        self.server_state
            .server_started(local_addr.to_string(), shutdown_tx);
        Ok(())
    }

    /// Stop the server, closing the listener and every open connection.
    pub async fn stop_server(&mut self) -> Result<()> {
        let address = self.server_state.get_address()?;
        self.server_state.stop_server()?;
        tracing::info!(address = %address, "Native server stopped");
        Ok(())
    }

    pub fn is_server_running(&self) -> bool {
        self.server_state.is_running()
    }

    /// Get the address the server is bound to.
    pub fn get_server_address(&self) -> Result<String> {
        self.server_state.get_address()
    }

    /// Number of connection workers currently alive.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<dyn RawProvider>,
    config: NativeTransportConfig,
    active: Arc<AtomicUsize>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (closing_tx, closing_rx) = watch::channel(false);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(peer = %peer, "Accepted connection");
                    let guard = ConnectionGuard::new(&active);
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        handler.clone(),
                        config.max_frame_len,
                        closing_rx.clone(),
                        guard,
                    ));
                }
                Err(e) => tracing::warn!("Failed to accept connection: {e}"),
            },
        }
    }
    let _ = closing_tx.send(true);
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn RawProvider>,
    max_frame_len: u32,
    mut closing: watch::Receiver<bool>,
    _guard: ConnectionGuard,
) {
    loop {
        let body = tokio::select! {
            _ = closing.changed() => break,
            frame = frame::read_frame(&mut stream, max_frame_len) => match frame {
                Ok(Some(body)) => body,
                Ok(None) => {
                    tracing::debug!(peer = %peer, "Peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(peer = %peer, "Connection ended: {e}");
                    break;
                }
            },
        };

        let reply = match frame::decode_request(&body) {
            Ok(request) => serve_request(handler.as_ref(), request).await,
            Err(e) => {
                tracing::debug!(peer = %peer, "Rejected frame: {e}");
                Reply::Err(RemoteError::from_error(&e, ""))
            }
        };

        let written = match frame::encode_response(&reply) {
            Ok(bytes) => frame::write_frame(&mut stream, &bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::debug!(peer = %peer, "Failed to send response: {e}");
            break;
        }
    }
}
