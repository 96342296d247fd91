use std::sync::Arc;

use axum::{Router, routing::get};
use vab::{
    ModelProvider, Value,
    provider::MapProvider,
    transport::{
        RemoteError,
        http::{self, HttpServer},
    },
};

use crate::helpers::{network_resolver, raw_handler, sample_model, serve_http};

#[tokio::test]
async fn test_http_server_lifecycle() {
    let mut server = HttpServer::new();

    // Server should not be running initially
    assert!(!server.is_server_running());
    assert!(server.stop_server().await.is_err());

    let handler = raw_handler(Arc::new(MapProvider::default()));
    server.start_server("127.0.0.1:0", handler.clone()).await.unwrap();
    assert!(server.is_server_running());

    // Attempting to start again should fail
    assert!(server.start_server("127.0.0.1:0", handler).await.is_err());

    server.stop_server().await.unwrap();
    assert!(!server.is_server_running());
}

#[tokio::test]
async fn test_plain_http_clients_see_rest_semantics() {
    let (mut server, endpoint) = serve_http(Arc::new(MapProvider::new(sample_model()))).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{endpoint}/motor/speed"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "1200");

    let response = client
        .get(format!("{endpoint}/motor/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let error: RemoteError = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert!(error.into_error().is_not_found());

    let response = client
        .put(format!("{endpoint}/motor/speed"))
        .body("750")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{endpoint}/sum?{}", http::INVOKE_QUERY))
        .body("[1, 2, 750]")
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "753");

    let response = client
        .patch(format!("{endpoint}/motor/alarms"))
        .body("\"stall\"")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .post(format!("{endpoint}/motor/speed"))
        .body("1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_invalid_json_body_is_malformed() {
    let (mut server, endpoint) = serve_http(Arc::new(MapProvider::new(sample_model()))).await;
    let response = reqwest::Client::new()
        .put(format!("{endpoint}/motor/speed"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_connector_over_http() {
    let (mut server, endpoint) = serve_http(Arc::new(MapProvider::new(sample_model()))).await;
    let motor = network_resolver()
        .resolve(&format!("{endpoint}/motor"))
        .unwrap();

    assert_eq!(motor.read("name").await.unwrap(), Value::from("spindle"));
    motor.delete_member("alarms", Value::from("overheat")).await.unwrap();
    assert_eq!(
        motor.read("alarms").await.unwrap(),
        Value::Collection(vec![Value::from("stall")])
    );
    assert!(motor.read("missing").await.unwrap_err().is_not_found());

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_large_bodies_within_the_frame_limit() {
    let (mut server, endpoint) = serve_http(Arc::new(MapProvider::default())).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();

    // Larger than axum's 2 MiB default body limit
    let big = Value::from("x".repeat(3 * 1024 * 1024));
    remote.write("big", big.clone()).await.unwrap();
    assert_eq!(remote.read("big").await.unwrap(), big);

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_extra_routes_take_precedence() {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(http::router(raw_handler(Arc::new(MapProvider::new(
            Value::structure().with("health", "from the model"),
        )))));
    let mut server = HttpServer::new();
    server.start_router("127.0.0.1:0", app).await.unwrap();
    let address = server.get_server_address().unwrap();

    let body = reqwest::get(format!("http://{address}/health"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_http_server_is_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let proxy = network_resolver()
        .resolve(&format!("http://{address}/a"))
        .unwrap();
    assert!(proxy.read("").await.unwrap_err().is_transport_failure());
}
