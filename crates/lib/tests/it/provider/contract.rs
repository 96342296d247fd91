use std::sync::Arc;

use vab::{
    ElementProxy, ModelProvider, Value,
    path::{self, encode_element},
    provider::{FileSystemProvider, LambdaProvider, MapProvider},
};

use crate::helpers::{gateway, network_resolver, sample_model, serve_http, serve_native};

fn device() -> Value {
    Value::structure()
        .with("name", "m")
        .with("count", 1)
        .with("list", vec![Value::Int(1), Value::Int(2), Value::Int(1)])
}

/// Runs the contract against `provider`, which must start out empty.
async fn check_contract(provider: &dyn ModelProvider) {
    // write and read
    provider.write("device", device()).await.unwrap();
    assert_eq!(provider.read("device").await.unwrap(), device());
    assert_eq!(provider.read("device/count").await.unwrap(), Value::Int(1));
    provider.write("device/count", Value::Int(2)).await.unwrap();
    assert_eq!(provider.read("device/count").await.unwrap(), Value::Int(2));
    assert!(provider.write("missing/x", Value::Int(1)).await.unwrap_err().is_not_found());

    // create inserts once, appends to collections
    assert!(provider
        .create("device/count", Value::Int(3))
        .await
        .unwrap_err()
        .is_already_exists());
    provider.create("device/extra", Value::Bool(true)).await.unwrap();
    assert_eq!(provider.read("device/extra").await.unwrap(), Value::Bool(true));
    provider.create("device/list", Value::Int(3)).await.unwrap();
    assert_eq!(
        provider.read("device/list").await.unwrap(),
        Value::Collection(vec![Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(3)])
    );

    // delete_member removes the first match only
    provider.delete_member("device/list", Value::Int(1)).await.unwrap();
    assert_eq!(
        provider.read("device/list").await.unwrap(),
        Value::Collection(vec![Value::Int(2), Value::Int(1), Value::Int(3)])
    );
    assert!(provider
        .delete_member("device/list", Value::Int(9))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(provider
        .delete_member("device/count", Value::Int(2))
        .await
        .unwrap_err()
        .is_malformed());

    // traversal rules
    assert!(provider.read("device/list/0").await.unwrap_err().is_malformed());
    assert!(provider.read("device/nothing").await.unwrap_err().is_not_found());
    assert!(provider.read("device/name/deeper").await.unwrap_err().is_not_found());

    // delete
    provider.delete("device/extra").await.unwrap();
    assert!(provider.read("device/extra").await.unwrap_err().is_not_found());
    assert!(provider.delete("device/extra").await.unwrap_err().is_not_found());

    // only operations can be invoked
    assert!(provider
        .invoke("device/name", vec![])
        .await
        .unwrap_err()
        .is_malformed());

    // element names are percent-encoded in paths
    let odd = path::concat("device", &encode_element("a/b c"));
    provider.write(&odd, Value::from("odd")).await.unwrap();
    assert_eq!(provider.read(&odd).await.unwrap(), Value::from("odd"));
    let read_back = provider.read("device").await.unwrap();
    assert_eq!(
        read_back.as_structure().unwrap().get("a/b c"),
        Some(&Value::from("odd"))
    );
}

#[tokio::test]
async fn test_contract_map_provider() {
    check_contract(&MapProvider::default()).await;
}

#[tokio::test]
async fn test_contract_filesystem_provider() {
    let dir = tempfile::tempdir().unwrap();
    check_contract(&FileSystemProvider::open(dir.path()).await.unwrap()).await;
}

#[tokio::test]
async fn test_contract_lambda_provider_statics() {
    check_contract(&LambdaProvider::new(Value::structure())).await;
}

#[tokio::test]
async fn test_contract_through_root_proxy() {
    let proxy = ElementProxy::root(Arc::new(MapProvider::default()));
    check_contract(&proxy).await;
}

#[tokio::test]
async fn test_contract_through_nested_proxy() {
    let map = Arc::new(MapProvider::new(
        Value::structure().with("outer", Value::structure().with("inner", Value::structure())),
    ));
    let proxy = ElementProxy::new("outer", map.clone()).deep_proxy("inner");
    check_contract(&proxy).await;
    assert_eq!(map.read("outer/inner/device/count").await.unwrap(), Value::Int(2));
}

#[tokio::test]
async fn test_contract_over_native_transport() {
    let (mut server, endpoint) = serve_native(Arc::new(MapProvider::default())).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();
    check_contract(&remote).await;
    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_contract_over_http_transport() {
    let (mut server, endpoint) = serve_http(Arc::new(MapProvider::default())).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();
    check_contract(&remote).await;
    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_contract_over_filesystem_served_natively() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileSystemProvider::open(dir.path()).await.unwrap());
    let (mut server, endpoint) = serve_native(backend).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();
    check_contract(&remote).await;
    server.stop_server().await.unwrap();
}

/// Elements named `.` and `..` are ordinary keys, never path navigation.
async fn check_dot_elements(provider: &dyn ModelProvider) {
    provider
        .write("a", Value::structure().with("..", 1).with(".", 2))
        .await
        .unwrap();
    provider.write("b", Value::Int(3)).await.unwrap();
    assert_eq!(provider.read("a/..").await.unwrap(), Value::Int(1));
    assert_eq!(provider.read("a/.").await.unwrap(), Value::Int(2));

    provider.write("a/..", Value::Int(10)).await.unwrap();
    provider.delete("a/.").await.unwrap();
    assert_eq!(provider.read("a").await.unwrap(), Value::structure().with("..", 10));
    assert_eq!(provider.read("b").await.unwrap(), Value::Int(3));
}

#[tokio::test]
async fn test_dot_elements_are_keys_on_every_transport() {
    check_dot_elements(&MapProvider::default()).await;

    let (mut native, native_endpoint) = serve_native(Arc::new(MapProvider::default())).await;
    let (mut http, http_endpoint) = serve_http(Arc::new(MapProvider::default())).await;
    let (mut gw, gw_endpoint) = serve_http(gateway()).await;
    let resolver = network_resolver();
    check_dot_elements(&resolver.resolve(&native_endpoint).unwrap()).await;
    check_dot_elements(&resolver.resolve(&http_endpoint).unwrap()).await;

    // Through an HTTP gateway into a native backend, with a fresh model there
    let (mut backend, backend_endpoint) = serve_native(Arc::new(MapProvider::default())).await;
    let chained = resolver
        .resolve(&format!("{gw_endpoint}//{backend_endpoint}"))
        .unwrap();
    check_dot_elements(&chained).await;

    backend.stop_server().await.unwrap();
    gw.stop_server().await.unwrap();
    http.stop_server().await.unwrap();
    native.stop_server().await.unwrap();
}

fn every_data_kind() -> Vec<Value> {
    vec![
        Value::Null,
        Value::Bool(true),
        Value::Int(-42),
        Value::Float(1.5),
        Value::from("text with / and :"),
        Value::Bytes(vec![0, 1, 254, 255]),
        Value::Collection(vec![Value::Int(1), Value::from("two"), Value::Null]),
        Value::structure().with("x", 1).with("y", Value::structure().with("z", false)),
    ]
}

/// Every data kind written at `slot` reads back unchanged.
async fn check_write_read_round_trip(provider: &dyn ModelProvider) {
    for value in every_data_kind() {
        provider.write("slot", value.clone()).await.unwrap();
        assert_eq!(provider.read("slot").await.unwrap(), value);
    }
}

#[tokio::test]
async fn test_every_kind_round_trips_locally_and_remotely() {
    check_write_read_round_trip(&MapProvider::default()).await;

    let dir = tempfile::tempdir().unwrap();
    check_write_read_round_trip(&FileSystemProvider::open(dir.path()).await.unwrap()).await;

    let (mut native, native_endpoint) = serve_native(Arc::new(MapProvider::default())).await;
    let (mut http, http_endpoint) = serve_http(Arc::new(MapProvider::default())).await;
    let resolver = network_resolver();
    check_write_read_round_trip(&resolver.resolve(&native_endpoint).unwrap()).await;
    check_write_read_round_trip(&resolver.resolve(&http_endpoint).unwrap()).await;
    native.stop_server().await.unwrap();
    http.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_remote_operations_read_as_stubs() {
    let (mut server, endpoint) =
        serve_native(Arc::new(MapProvider::new(sample_model()))).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();

    let Value::Operation(stub) = remote.read("sum").await.unwrap() else {
        panic!("expected an operation");
    };
    assert!(stub.call(vec![]).unwrap_err().is_unsupported());
    assert_eq!(
        remote.invoke("sum", vec![Value::Int(1), Value::Int(1)]).await.unwrap(),
        Value::Int(2)
    );

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_filesystem_provider_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let provider = FileSystemProvider::open(dir.path()).await.unwrap();
        provider.write("device", device()).await.unwrap();
        provider.create("device/list", Value::Int(7)).await.unwrap();
    }

    let reopened = FileSystemProvider::open(dir.path()).await.unwrap();
    assert_eq!(reopened.read("device/name").await.unwrap(), Value::from("m"));
    assert_eq!(
        reopened.read("device/list").await.unwrap(),
        Value::Collection(vec![Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(7)])
    );
}
