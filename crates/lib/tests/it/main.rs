/*! Integration tests for vab.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - provider: the provider contract, checked against every backend and transport
 * - transport: native and HTTP servers and connectors
 * - gateway: address resolution and multi-hop forwarding
 * - consistency: clock and freeze behaviour seen from remote clients
 * - directory: key lookup over the wire and the connection manager
 * - end_to_end: complete client, gateway and backend setups
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vab=info".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

mod consistency;
mod directory;
mod end_to_end;
mod gateway;
mod helpers;
mod provider;
mod transport;
