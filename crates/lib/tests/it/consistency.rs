//! The consistency clock and freeze flag as seen by remote clients.

use std::sync::Arc;

use vab::{
    ModelProvider, Value,
    consistency::{ConsistencyProvider, DEFAULT_STATE_ELEMENT},
    path,
    provider::MapProvider,
};

use crate::helpers::{network_resolver, network_router, serve_native};

#[tokio::test]
async fn test_concurrent_writers_each_tick_once() {
    const WRITERS: i64 = 8;

    let provider = Arc::new(ConsistencyProvider::new(MapProvider::default()));
    let (mut server, endpoint) = serve_native(provider.clone()).await;

    let mut tasks = Vec::new();
    for writer in 0..WRITERS {
        // One router per task, so every writer has its own connection
        let resolver = vab::gateway::ProxyResolver::new(Arc::new(network_router()));
        let root = resolver.resolve(&endpoint).unwrap();
        tasks.push(tokio::spawn(async move {
            root.write(&format!("w{writer}"), Value::Int(writer)).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(provider.clock(), WRITERS);
    let remote = network_resolver().resolve(&endpoint).unwrap();
    let clock_path = path::concat(DEFAULT_STATE_ELEMENT, "clock");
    assert_eq!(remote.read(&clock_path).await.unwrap(), Value::Int(WRITERS));
    for writer in 0..WRITERS {
        assert_eq!(
            remote.read(&format!("w{writer}")).await.unwrap(),
            Value::Int(writer)
        );
    }

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_remote_freeze() {
    let provider = Arc::new(ConsistencyProvider::new(MapProvider::new(
        Value::structure().with("setpoint", 20),
    )));
    let (mut server, endpoint) = serve_native(provider.clone()).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();
    let state = remote.deep_proxy(DEFAULT_STATE_ELEMENT);

    remote.write("setpoint", Value::Int(21)).await.unwrap();
    state.write("frozen", Value::Bool(true)).await.unwrap();
    assert!(provider.is_frozen());
    assert_eq!(
        state.read("").await.unwrap(),
        Value::structure().with("clock", 1).with("frozen", true)
    );

    assert!(remote.write("setpoint", Value::Int(22)).await.unwrap_err().is_read_only());
    assert!(remote.delete("setpoint").await.unwrap_err().is_read_only());
    assert!(state.write("clock", Value::Int(0)).await.unwrap_err().is_read_only());
    assert!(state.write("frozen", Value::from("yes")).await.unwrap_err().is_malformed());
    assert!(state.read("other").await.unwrap_err().is_not_found());

    state.write("frozen", Value::Bool(false)).await.unwrap();
    remote.write("setpoint", Value::Int(22)).await.unwrap();
    assert_eq!(state.read("clock").await.unwrap(), Value::Int(2));

    server.stop_server().await.unwrap();
}
