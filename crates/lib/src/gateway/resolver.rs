//! Resolution of addresses into element proxies.

use std::sync::Arc;

use crate::{Result, address, gateway::GatewayRouter, proxy::ElementProxy};

/// Turns addresses into proxies using a [`GatewayRouter`].
///
/// Only the first hop is interpreted here. The remainder, whether a plain path
/// or a further chained address, becomes the proxy prefix and is sent verbatim
/// to the first hop's connector, where the next gateway resolves it in turn.
#[derive(Debug, Clone)]
pub struct ProxyResolver {
    router: Arc<GatewayRouter>,
}

impl ProxyResolver {
    pub fn new(router: Arc<GatewayRouter>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<GatewayRouter> {
        &self.router
    }

    /// Resolves `address` into a proxy on its first hop's connector.
    pub fn resolve(&self, address: &str) -> Result<ElementProxy> {
        let (endpoint, remainder) = address::split_first_hop(address)?;
        let connector = self.router.connector(&endpoint)?;
        tracing::debug!(endpoint = %endpoint, remainder, "Resolved address");
        Ok(ElementProxy::new(remainder, connector))
    }
}
