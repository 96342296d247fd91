//! Directory lookups over the wire and the connection manager on top of them.

use std::sync::Arc;

use vab::{
    ModelProvider, Value,
    directory::{DirectoryProvider, DirectoryService, InMemoryDirectory, RemoteDirectory},
    manager::ConnectionManager,
    provider::MapProvider,
};

use crate::helpers::{network_resolver, sample_model, serve_http, serve_native};

#[tokio::test]
async fn test_remote_directory_and_manager() {
    let (mut backend, backend_endpoint) =
        serve_native(Arc::new(MapProvider::new(sample_model()))).await;

    let served = Arc::new(InMemoryDirectory::new());
    let (mut directory_server, directory_endpoint) =
        serve_http(Arc::new(DirectoryProvider::new(served.clone()))).await;

    let resolver = Arc::new(network_resolver());
    let directory = Arc::new(RemoteDirectory::new(Arc::new(
        resolver.resolve(&directory_endpoint).unwrap(),
    )));
    directory
        .add_mapping("spindle", &format!("{backend_endpoint}/motor"))
        .await
        .unwrap();
    assert_eq!(
        served.lookup("spindle").await.unwrap(),
        format!("{backend_endpoint}/motor")
    );

    let manager = ConnectionManager::new(directory.clone(), resolver);
    let spindle = manager.connect("spindle").await.unwrap();
    assert_eq!(spindle.read("speed").await.unwrap(), Value::Int(1200));

    let alarms = manager.connect_element("spindle", "alarms").await.unwrap();
    alarms.create("", Value::from("coolant")).await.unwrap();
    assert_eq!(
        spindle.read("alarms").await.unwrap().as_collection().unwrap().len(),
        3
    );

    directory.remove_mapping("spindle").await.unwrap();
    assert!(manager.connect("spindle").await.unwrap_err().is_not_found());

    directory_server.stop_server().await.unwrap();
    backend.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_directory_entries_are_readable_as_a_structure() {
    let served = Arc::new(InMemoryDirectory::new());
    served.add_mapping("a", "vab://a:1").await.unwrap();
    served.add_mapping("b/c", "http://b:2//vab://c:3").await.unwrap();
    let (mut server, endpoint) = serve_native(Arc::new(DirectoryProvider::new(served))).await;

    let remote = network_resolver().resolve(&endpoint).unwrap();
    assert_eq!(
        remote.read("directory").await.unwrap(),
        Value::structure()
            .with("a", "vab://a:1")
            .with("b/c", "http://b:2//vab://c:3")
    );
    assert!(remote.read("directory/zzz").await.unwrap_err().is_not_found());

    server.stop_server().await.unwrap();
}
