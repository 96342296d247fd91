//! Address resolution and forwarding across chains of gateways.

use std::sync::Arc;

use vab::{
    ModelProvider, Value,
    gateway::{DelegatingProvider, GatewayRouter, LocalBus, LocalConnectorFactory, ProxyResolver},
    provider::MapProvider,
};

use crate::helpers::{gateway, network_resolver, sample_model, serve_http, serve_native};

#[tokio::test]
async fn test_two_hop_http_then_native() {
    let (mut backend, backend_endpoint) =
        serve_native(Arc::new(MapProvider::new(sample_model()))).await;
    let (mut gw, gw_endpoint) = serve_http(gateway()).await;

    let motor = network_resolver()
        .resolve(&format!("{gw_endpoint}//{backend_endpoint}/motor"))
        .unwrap();
    assert_eq!(motor.read("speed").await.unwrap(), Value::Int(1200));

    motor.write("speed", Value::Int(1500)).await.unwrap();
    motor.create("alarms", Value::from("vibration")).await.unwrap();
    let direct = network_resolver().resolve(&backend_endpoint).unwrap();
    assert_eq!(direct.read("motor/speed").await.unwrap(), Value::Int(1500));
    assert_eq!(
        direct.read("motor/alarms").await.unwrap(),
        Value::Collection(vec![
            Value::from("overheat"),
            Value::from("stall"),
            Value::from("vibration")
        ])
    );

    gw.stop_server().await.unwrap();
    backend.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_three_hops_across_both_transports() {
    let (mut backend, backend_endpoint) =
        serve_http(Arc::new(MapProvider::new(sample_model()))).await;
    let (mut inner, inner_endpoint) = serve_native(gateway()).await;
    let (mut outer, outer_endpoint) = serve_http(gateway()).await;

    let address = format!("{outer_endpoint}//{inner_endpoint}//{backend_endpoint}");
    let root = network_resolver().resolve(&address).unwrap();

    assert_eq!(root.read("motor/name").await.unwrap(), Value::from("spindle"));
    assert_eq!(
        root.invoke("sum", vec![Value::Int(40), Value::Int(2)]).await.unwrap(),
        Value::Int(42)
    );
    assert!(root.read("motor/missing").await.unwrap_err().is_not_found());
    assert!(root.read("motor/alarms/0").await.unwrap_err().is_malformed());

    // A proxy on a sub-element of the chain behaves like one built from the longer address
    let deep = root.deep_proxy("motor");
    let resolved = network_resolver()
        .resolve(&format!("{address}/motor"))
        .unwrap();
    assert_eq!(deep.read("speed").await.unwrap(), resolved.read("speed").await.unwrap());

    outer.stop_server().await.unwrap();
    inner.stop_server().await.unwrap();
    backend.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_gateway_serves_local_data_and_forwards_addresses() {
    let (mut backend, backend_endpoint) =
        serve_native(Arc::new(MapProvider::new(sample_model()))).await;
    let local = Arc::new(MapProvider::new(Value::structure().with("site", "hall 3")));
    let (mut gw, gw_endpoint) = serve_native(Arc::new(DelegatingProvider::with_local(
        network_resolver(),
        local,
    )))
    .await;

    let resolver = network_resolver();
    let site = resolver.resolve(&format!("{gw_endpoint}/site")).unwrap();
    assert_eq!(site.read("").await.unwrap(), Value::from("hall 3"));
    let speed = resolver
        .resolve(&format!("{gw_endpoint}//{backend_endpoint}/motor/speed"))
        .unwrap();
    assert_eq!(speed.read("").await.unwrap(), Value::Int(1200));

    gw.stop_server().await.unwrap();
    backend.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_gateway_routes_to_its_local_bus() {
    let bus = LocalBus::new();
    bus.register("plc", Arc::new(MapProvider::new(sample_model())));
    let router = GatewayRouter::new().with_factory(Arc::new(LocalConnectorFactory::new(bus)));
    let gw = Arc::new(DelegatingProvider::new(ProxyResolver::new(Arc::new(router))));
    let (mut server, endpoint) = serve_native(gw).await;

    let motor = network_resolver()
        .resolve(&format!("{endpoint}//local://plc/motor"))
        .unwrap();
    assert_eq!(motor.read("speed").await.unwrap(), Value::Int(1200));

    let unknown = network_resolver()
        .resolve(&format!("{endpoint}//local://nobody/motor"))
        .unwrap();
    assert!(unknown.read("speed").await.unwrap_err().is_transport_failure());

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_unknown_schemes() {
    // Locally, an unknown scheme is a configuration error
    assert!(network_resolver()
        .resolve("ftp://host/motor")
        .unwrap_err()
        .is_configuration_error());

    // Behind a gateway it surfaces as a failure of the remote hop
    let (mut gw, gw_endpoint) = serve_native(gateway()).await;
    let proxy = network_resolver()
        .resolve(&format!("{gw_endpoint}//ftp://host/motor"))
        .unwrap();
    assert!(proxy.read("").await.unwrap_err().is_transport_failure());

    gw.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_connectors_are_shared_per_endpoint() {
    let (mut backend, backend_endpoint) =
        serve_native(Arc::new(MapProvider::new(sample_model()))).await;
    let resolver = network_resolver();

    let a = resolver.resolve(&format!("{backend_endpoint}/motor")).unwrap();
    let b = resolver.resolve(&format!("{backend_endpoint}/sum")).unwrap();
    assert!(Arc::ptr_eq(a.provider(), b.provider()));
    assert_eq!(a.read("speed").await.unwrap(), Value::Int(1200));
    assert_eq!(b.invoke("", vec![Value::Int(1)]).await.unwrap(), Value::Int(1));

    let (mut other, other_endpoint) = serve_native(Arc::new(MapProvider::default())).await;
    let c = resolver.resolve(&other_endpoint).unwrap();
    assert!(!Arc::ptr_eq(a.provider(), c.provider()));

    other.stop_server().await.unwrap();
    backend.stop_server().await.unwrap();
}
