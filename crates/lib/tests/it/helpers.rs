use std::{sync::Arc, time::Duration};

use vab::{
    ModelProvider, Value,
    gateway::{DelegatingProvider, GatewayRouter, ProxyResolver},
    transport::{
        RawProvider,
        http::{HttpConnectorFactory, HttpServer, HttpTransportConfig},
        json::JsonProvider,
        native::{NativeConnectorFactory, NativeServer, NativeTransportConfig},
    },
    value::Operation,
};

/// The model most tests start from.
pub fn sample_model() -> Value {
    Value::structure()
        .with(
            "motor",
            Value::structure()
                .with("speed", 1200)
                .with("name", "spindle")
                .with("alarms", vec![Value::from("overheat"), Value::from("stall")]),
        )
        .with(
            "sum",
            Operation::new(|args| {
                let total = args.iter().filter_map(Value::as_int).sum::<i64>();
                Ok(Value::Int(total))
            }),
        )
}

/// Wraps a typed provider in the JSON layer servers speak.
pub fn raw_handler(provider: Arc<dyn ModelProvider>) -> Arc<dyn RawProvider> {
    Arc::new(JsonProvider::new(provider))
}

/// Starts a native server for `provider` on an ephemeral port.
///
/// Returns the server and its `vab://` endpoint.
pub async fn serve_native(provider: Arc<dyn ModelProvider>) -> (NativeServer, String) {
    let mut server = NativeServer::new(NativeTransportConfig::default());
    server
        .start_server("127.0.0.1:0", raw_handler(provider))
        .await
        .unwrap();
    let endpoint = format!("vab://{}", server.get_server_address().unwrap());
    (server, endpoint)
}

/// Starts an HTTP server for `provider` on an ephemeral port.
///
/// Returns the server and its `http://` endpoint.
pub async fn serve_http(provider: Arc<dyn ModelProvider>) -> (HttpServer, String) {
    let mut server = HttpServer::new();
    server
        .start_server("127.0.0.1:0", raw_handler(provider))
        .await
        .unwrap();
    let endpoint = format!("http://{}", server.get_server_address().unwrap());
    (server, endpoint)
}

/// A router for the native and HTTP schemes with short timeouts.
pub fn network_router() -> GatewayRouter {
    let timeout = Duration::from_secs(5);
    GatewayRouter::new()
        .with_factory(Arc::new(NativeConnectorFactory::new(
            NativeTransportConfig::default().with_timeout(timeout),
        )))
        .with_factory(Arc::new(
            HttpConnectorFactory::new(HttpTransportConfig { timeout_ms: 5_000 }).unwrap(),
        ))
}

pub fn network_resolver() -> ProxyResolver {
    ProxyResolver::new(Arc::new(network_router()))
}

/// A pure gateway: forwards every chained address it receives.
pub fn gateway() -> Arc<dyn ModelProvider> {
    Arc::new(DelegatingProvider::new(network_resolver()))
}

/// Polls `condition` until it holds, panicking after a few seconds.
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
