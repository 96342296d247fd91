use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::net::TcpStream;
use vab::{
    ModelProvider, Result, Value,
    provider::MapProvider,
    transport::{
        Request,
        json::JsonConnector,
        native::{NativeConnector, NativeServer, NativeTransportConfig, frame},
        shared::Reply,
    },
};

use crate::helpers::{raw_handler, sample_model, wait_until};

/// Reads of `slow` take a second; everything else is served by a map.
struct SlowProvider {
    inner: MapProvider,
}

#[async_trait]
impl ModelProvider for SlowProvider {
    async fn read(&self, path: &str) -> Result<Value> {
        if path == "slow" {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        self.inner.write(path, value).await
    }

    async fn create(&self, path: &str, value: Value) -> Result<()> {
        self.inner.create(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path).await
    }

    async fn delete_member(&self, path: &str, value: Value) -> Result<()> {
        self.inner.delete_member(path, value).await
    }

    async fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value> {
        self.inner.invoke(path, args).await
    }
}

async fn start(provider: Arc<dyn ModelProvider>) -> (NativeServer, String) {
    let mut server = NativeServer::new(NativeTransportConfig::default());
    server
        .start_server("127.0.0.1:0", raw_handler(provider))
        .await
        .unwrap();
    let address = server.get_server_address().unwrap();
    (server, address)
}

fn connector(address: &str, timeout: Duration) -> JsonConnector<NativeConnector> {
    JsonConnector::new(NativeConnector::new(
        address,
        NativeTransportConfig::default().with_timeout(timeout),
    ))
}

#[tokio::test]
async fn test_native_server_lifecycle() {
    let mut server = NativeServer::new(NativeTransportConfig::default());
    assert!(!server.is_server_running());
    assert!(server.stop_server().await.is_err());

    let handler = raw_handler(Arc::new(MapProvider::default()));
    server.start_server("127.0.0.1:0", handler.clone()).await.unwrap();
    assert!(server.is_server_running());
    assert!(server.get_server_address().unwrap().starts_with("127.0.0.1:"));

    // Attempting to start again should fail
    assert!(server.start_server("127.0.0.1:0", handler).await.is_err());

    server.stop_server().await.unwrap();
    assert!(!server.is_server_running());
}

#[tokio::test]
async fn test_connection_is_reused_and_worker_ends_on_disconnect() {
    let (mut server, address) = start(Arc::new(MapProvider::new(sample_model()))).await;
    let client = connector(&address, Duration::from_secs(5));

    let root = client.read("").await.unwrap();
    assert!(root.as_structure().unwrap().contains_key("motor"));
    assert_eq!(client.read("motor/speed").await.unwrap(), Value::Int(1200));
    client.write("motor/speed", Value::Int(900)).await.unwrap();
    assert_eq!(client.read("motor/speed").await.unwrap(), Value::Int(900));
    assert!(client.raw().is_connected().await);
    assert_eq!(server.active_connections(), 1);

    client.raw().disconnect().await;
    wait_until("worker to end", || server.active_connections() == 0).await;

    // The next request reconnects transparently
    assert_eq!(client.read("motor/speed").await.unwrap(), Value::Int(900));
    assert_eq!(server.active_connections(), 1);

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_remote_errors_keep_the_connection() {
    let (mut server, address) = start(Arc::new(MapProvider::new(sample_model()))).await;
    let client = connector(&address, Duration::from_secs(5));

    assert!(client.read("motor/missing").await.unwrap_err().is_not_found());
    assert!(client.raw().is_connected().await);
    assert!(client
        .create("motor/speed", Value::Int(1))
        .await
        .unwrap_err()
        .is_already_exists());
    assert_eq!(server.active_connections(), 1);

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_invoke_with_arguments() {
    let (mut server, address) = start(Arc::new(MapProvider::new(sample_model()))).await;
    let client = connector(&address, Duration::from_secs(5));

    let result = client
        .invoke("sum", vec![Value::Int(2), Value::Int(3), Value::Int(4)])
        .await
        .unwrap();
    assert_eq!(result, Value::Int(9));
    assert_eq!(client.invoke("sum", vec![]).await.unwrap(), Value::Int(0));

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_timeout_drops_the_connection() {
    let provider = SlowProvider {
        inner: MapProvider::new(Value::structure().with("slow", 1).with("fast", 2)),
    };
    let (mut server, address) = start(Arc::new(provider)).await;
    let client = connector(&address, Duration::from_millis(100));

    let err = client.read("slow").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.is_transport_failure());
    assert!(!client.raw().is_connected().await);

    // The server notices the closed socket once the slow read finishes
    wait_until("worker to end", || server.active_connections() == 0).await;

    assert_eq!(client.read("fast").await.unwrap(), Value::Int(2));
    assert!(client.raw().is_connected().await);

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_open_connections() {
    let (mut server, address) = start(Arc::new(MapProvider::new(sample_model()))).await;
    let client = connector(&address, Duration::from_secs(2));
    client.read("motor").await.unwrap();
    assert_eq!(server.active_connections(), 1);

    server.stop_server().await.unwrap();
    wait_until("workers to end", || server.active_connections() == 0).await;

    let err = client.read("motor").await.unwrap_err();
    assert!(err.is_transport_failure());
}

#[tokio::test]
async fn test_undecodable_frame_gets_error_reply() {
    let (mut server, address) = start(Arc::new(MapProvider::new(sample_model()))).await;
    let mut stream = TcpStream::connect(&address).await.unwrap();

    // A one-byte body with an unknown opcode
    frame::write_frame(&mut stream, &[0, 0, 0, 1, 0xFF]).await.unwrap();
    let body = frame::read_frame(&mut stream, 1024).await.unwrap().unwrap();
    assert!(matches!(frame::decode_response(&body).unwrap(), Reply::Err(_)));

    // The connection is still usable
    let request = frame::encode_request(&Request::Read {
        path: "motor/speed".to_string(),
    })
    .unwrap();
    frame::write_frame(&mut stream, &request).await.unwrap();
    let body = frame::read_frame(&mut stream, 1024).await.unwrap().unwrap();
    assert_eq!(
        frame::decode_response(&body).unwrap(),
        Reply::Ok("1200".to_string())
    );

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_oversized_frame_closes_the_connection() {
    let mut server = NativeServer::new(NativeTransportConfig {
        max_frame_len: 64,
        ..NativeTransportConfig::default()
    });
    server
        .start_server("127.0.0.1:0", raw_handler(Arc::new(MapProvider::default())))
        .await
        .unwrap();
    let address = server.get_server_address().unwrap();

    let client = connector(&address, Duration::from_secs(2));
    let err = client
        .write("big", Value::from("x".repeat(1024)))
        .await
        .unwrap_err();
    assert!(err.is_transport_failure());
    wait_until("worker to end", || server.active_connections() == 0).await;

    server.stop_server().await.unwrap();
}
