pub mod client;
pub mod health;
pub mod serve;

use std::{sync::Arc, time::Duration};

use vab::{
    gateway::{GatewayRouter, ProxyResolver},
    transport::{
        http::{HttpConnectorFactory, HttpTransportConfig},
        native::{NativeConnectorFactory, NativeTransportConfig},
    },
};

/// A resolver for every network scheme the binary speaks.
pub fn network_resolver(timeout: Duration) -> vab::Result<ProxyResolver> {
    let http = HttpConnectorFactory::new(HttpTransportConfig {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    })?;
    let router = GatewayRouter::new()
        .with_factory(Arc::new(NativeConnectorFactory::new(
            NativeTransportConfig::default().with_timeout(timeout),
        )))
        .with_factory(Arc::new(http.clone().secure()))
        .with_factory(Arc::new(http));
    Ok(ProxyResolver::new(Arc::new(router)))
}
