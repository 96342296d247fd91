//! Complete setups: live devices, gateways and observers working together.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use vab::{
    ElementProxy, ModelProvider, Result, Value,
    consistency::ConsistencyProvider,
    hooks::{MutationEvent, MutationKind, ObservableProvider},
    provider::{LambdaProperty, LambdaProvider, MapProvider},
};

use crate::helpers::{gateway, network_resolver, serve_http, serve_native};

#[tokio::test]
async fn test_proxy_on_element_then_root_of_proxy() {
    let model = Value::from_json_str(r#"{"a":{"b":1}}"#).unwrap();
    let local = ElementProxy::root(Arc::new(MapProvider::new(model.clone())));
    assert_eq!(local.deep_proxy("a").deep_proxy("").read("b").await.unwrap(), Value::Int(1));

    let (mut server, endpoint) = serve_native(Arc::new(MapProvider::new(model))).await;
    let remote = network_resolver()
        .resolve(&format!("{endpoint}/a"))
        .unwrap()
        .deep_proxy("");
    assert_eq!(remote.read("b").await.unwrap(), Value::Int(1));
    assert_eq!(remote.read("").await.unwrap(), Value::structure().with("b", 1));

    server.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_live_device_behind_a_gateway() {
    let speed = Arc::new(AtomicI64::new(600));
    let (get, set) = (speed.clone(), speed.clone());
    let device = LambdaProvider::new(Value::structure().with("vendor", "acme"))
        .with_property(
            "drive/speed",
            LambdaProperty::new()
                .getter(move || Ok(Value::Int(get.load(Ordering::SeqCst))))
                .setter(move |value| {
                    set.store(value.as_int().unwrap_or_default(), Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap();

    let (mut backend, backend_endpoint) = serve_native(Arc::new(device)).await;
    let (mut gw, gw_endpoint) = serve_http(gateway()).await;
    let drive = network_resolver()
        .resolve(&format!("{gw_endpoint}//{backend_endpoint}/drive"))
        .unwrap();

    assert_eq!(drive.read("speed").await.unwrap(), Value::Int(600));
    speed.store(650, Ordering::SeqCst);
    assert_eq!(drive.read("speed").await.unwrap(), Value::Int(650));
    drive.write("speed", Value::Int(700)).await.unwrap();
    assert_eq!(speed.load(Ordering::SeqCst), 700);

    gw.stop_server().await.unwrap();
    backend.stop_server().await.unwrap();
}

#[tokio::test]
async fn test_observed_and_versioned_backend() {
    let events = Arc::new(Mutex::new(Vec::<MutationEvent>::new()));
    let recorded = events.clone();

    let provider = Arc::new(ObservableProvider::new(ConsistencyProvider::new(
        MapProvider::new(Value::structure().with("log", Value::collection())),
    )));
    provider.subscribe(Arc::new(move |event: &MutationEvent| -> Result<()> {
        recorded.lock().unwrap().push(event.clone());
        Ok(())
    }));

    let (mut server, endpoint) = serve_native(provider.clone()).await;
    let remote = network_resolver().resolve(&endpoint).unwrap();

    remote.create("log", Value::from("start")).await.unwrap();
    remote.create("mode", Value::from("auto")).await.unwrap();
    remote.delete_member("log", Value::from("start")).await.unwrap();
    assert!(remote.delete("missing").await.is_err());

    let events = events.lock().unwrap().clone();
    let kinds: Vec<MutationKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![MutationKind::Create, MutationKind::Create, MutationKind::DeleteMember]
    );
    assert_eq!(events[1].path, "mode");
    assert_eq!(events[1].value, Some(Value::from("auto")));

    // Only the delete_member ticks; creates leave the clock alone
    assert_eq!(provider.inner().clock(), 1);

    server.stop_server().await.unwrap();
}
