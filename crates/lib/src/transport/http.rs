//! HTTP transport implementation.
//!
//! Every provider path is served as a URL path with axum; the reqwest based
//! [`HttpConnector`] is the matching client. Bodies are the JSON text form of
//! values.
//!
//! | Operation       | Request                                  |
//! |-----------------|------------------------------------------|
//! | `read`          | `GET /<path>`                            |
//! | `write`         | `PUT /<path>` with the value             |
//! | `create`        | `POST /<path>` with the value            |
//! | `delete`        | `DELETE /<path>`                         |
//! | `delete_member` | `PATCH /<path>` with the member          |
//! | `invoke`        | `POST /<path>?invoke` with a JSON array  |
//!
//! A path with a `.` or `..` element is sent as `/?path=<path>` instead, and
//! bodies may be as large as a native frame. Errors are answered with a
//! status code per error kind and a [`RemoteError`] body.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use url::{Url, form_urlencoded};

use crate::{
    ErrorKind, Result,
    address::Endpoint,
    gateway::{ConnectorFactory, RoutingError},
    provider::{ModelProvider, ProviderError},
    transport::{
        RawProvider, RemoteError, Request, TransportError,
        json::JsonConnector,
        native::DEFAULT_MAX_FRAME_LEN,
        shared::{Reply, ServerState, encode_remote_error, serve_request},
    },
};

/// Query string marking an invocation.
pub const INVOKE_QUERY: &str = "invoke";

/// Query parameter carrying a path that cannot travel as a URL path.
///
/// URL parsers resolve `.` and `..` segments (including `%2E` forms), so a
/// path with such an element is sent as `/?path=<path>` instead.
pub const PATH_QUERY: &str = "path";

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Settings for HTTP connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl HttpTransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// HTTP status used for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Malformed => StatusCode::BAD_REQUEST,
        ErrorKind::ReadOnly => StatusCode::LOCKED,
        ErrorKind::Unsupported => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::TransportFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Largest request body accepted, matching the native transport's frame limit.
pub const MAX_BODY_LEN: usize = DEFAULT_MAX_FRAME_LEN as usize;

/// Builds the router serving `handler` on every path.
///
/// Routes added to the returned router take precedence over provider paths.
pub fn router(handler: Arc<dyn RawProvider>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(DefaultBodyLimit::max(MAX_BODY_LEN))
        .with_state(handler)
}

/// HTTP server using axum.
#[derive(Debug, Default)]
pub struct HttpServer {
    server_state: ServerState,
}

impl HttpServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start serving `handler` on `addr`.
    pub async fn start_server(&mut self, addr: &str, handler: Arc<dyn RawProvider>) -> Result<()> {
        self.start_router(addr, router(handler)).await
    }

    /// Start serving an arbitrary router on `addr`, e.g. [`router`] merged with extra routes.
    pub async fn start_router(&mut self, addr: &str, router: Router) -> Result<()> {
        self.server_state.ensure_stopped(addr)?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::ServerBind {
                address: addr.to_string(),
                source,
            })?;
        // Get the actual bound address (important for port 0)
        let local_addr = listener.local_addr().map_err(|source| TransportError::ServerBind {
            address: addr.to_string(),
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(address = %local_addr, "HTTP server failed: {e}");
            }
        });

        tracing::info!(address = %local_addr, "HTTP server started");
        self.server_state
            .server_started(local_addr.to_string(), shutdown_tx);
        Ok(())
    }

    /// Stop the running server gracefully.
    pub async fn stop_server(&mut self) -> Result<()> {
        let address = self.server_state.get_address()?;
        self.server_state.stop_server()?;
        tracing::info!(address = %address, "HTTP server stopped");
        Ok(())
    }

    pub fn is_server_running(&self) -> bool {
        self.server_state.is_running()
    }

    /// Get the address the server is bound to.
    pub fn get_server_address(&self) -> Result<String> {
        self.server_state.get_address()
    }
}

/// Maps one HTTP request onto the raw contract.
fn parse_request(method: &Method, uri: &Uri, body: String) -> Result<Request> {
    // The raw URI path keeps percent-encoded elements and chain markers intact.
    let mut path = uri.path().trim_start_matches('/').to_string();
    let mut invoke = false;
    for (key, value) in form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            INVOKE_QUERY => invoke = true,
            PATH_QUERY => path = value.into_owned(),
            _ => {}
        }
    }
    let request = match *method {
        Method::GET => Request::Read { path },
        Method::PUT => Request::Write { path, value: body },
        Method::POST if invoke => {
            let args: Vec<serde_json::Value> = if body.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&body).map_err(|e| {
                    ProviderError::malformed(
                        &path,
                        format!("invoke body must be a JSON array: {e}"),
                    )
                })?
            };
            Request::Invoke {
                path,
                args: args.iter().map(ToString::to_string).collect(),
            }
        }
        Method::POST => Request::Create { path, value: body },
        Method::DELETE => Request::Delete { path },
        Method::PATCH => Request::DeleteMember { path, value: body },
        ref other => return Err(ProviderError::unsupported(other.as_str(), path).into()),
    };
    Ok(request)
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Fallback handler serving every provider path.
async fn handle_request(
    State(handler): State<Arc<dyn RawProvider>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let reply = match parse_request(&method, &uri, body) {
        Ok(request) => serve_request(handler.as_ref(), request).await,
        Err(e) => Reply::Err(RemoteError::from_error(&e, uri.path())),
    };
    match reply {
        Reply::Ok(payload) => json_response(StatusCode::OK, payload),
        Reply::Err(error) => json_response(status_for(error.kind), encode_remote_error(&error)),
    }
}

/// Returns true for segments a URL parser would resolve away.
fn is_dot_segment(segment: &str) -> bool {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    decoded == "." || decoded == ".."
}

/// A raw HTTP client for one server.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    base: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpConnector {
    /// Creates a connector for the server at `base`, sharing `client`'s pool.
    ///
    /// `timeout` is only reported in errors; the client enforces it.
    pub fn new(base: Url, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base,
            client,
            timeout,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        let base = self.base.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.split('/').any(is_dot_segment) {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair(PATH_QUERY, path)
                .finish();
            return format!("{base}/?{query}");
        }
        format!("{base}/{path}")
    }

    fn send_error(&self, url: &str, source: reqwest::Error) -> crate::Error {
        if source.is_timeout() {
            return TransportError::Timeout {
                address: url.to_string(),
                timeout: self.timeout,
            }
            .into();
        }
        TransportError::Http {
            url: url.to_string(),
            source,
        }
        .into()
    }
}

#[async_trait]
impl RawProvider for HttpConnector {
    async fn handle(&self, request: Request) -> Result<String> {
        let mut url = self.url(request.path());
        let (method, body) = match request {
            Request::Read { .. } => (Method::GET, None),
            Request::Write { value, .. } => (Method::PUT, Some(value)),
            Request::Create { value, .. } => (Method::POST, Some(value)),
            Request::Delete { .. } => (Method::DELETE, None),
            Request::DeleteMember { value, .. } => (Method::PATCH, Some(value)),
            Request::Invoke { args, .. } => {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(INVOKE_QUERY);
                (Method::POST, Some(format!("[{}]", args.join(","))))
            }
        };

        tracing::debug!(method = %method, url = %url, "Sending HTTP request");
        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| self.send_error(&url, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.send_error(&url, e))?;
        if status.is_success() {
            return Ok(text);
        }
        match serde_json::from_str::<RemoteError>(&text) {
            Ok(remote) => Err(remote.into_error()),
            Err(_) => Err(TransportError::HttpStatus {
                url,
                status: status.as_u16(),
            }
            .into()),
        }
    }
}

/// Factory for `http://` (or `https://`) connectors sharing one client pool.
#[derive(Debug, Clone)]
pub struct HttpConnectorFactory {
    client: reqwest::Client,
    timeout: Duration,
    scheme: &'static str,
}

impl HttpConnectorFactory {
    /// Creates a factory for the `http` scheme.
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| TransportError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            timeout: config.timeout(),
            scheme: "http",
        })
    }

    /// Serves the `https` scheme instead.
    pub fn secure(mut self) -> Self {
        self.scheme = "https";
        self
    }
}

impl ConnectorFactory for HttpConnectorFactory {
    fn scheme(&self) -> &str {
        self.scheme
    }

    fn create_connector(&self, endpoint: &Endpoint) -> Result<Arc<dyn ModelProvider>> {
        let base = Url::parse(&format!("{endpoint}/")).map_err(|e| RoutingError::InvalidEndpoint {
            address: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let raw = HttpConnector::new(base, self.client.clone(), self.timeout);
        Ok(Arc::new(JsonConnector::new(raw)))
    }
}
