//! Deterministic simulation harness for sensorlink.
//!
//! Turmoil-backed [`Listener`](sensorlink_server::Listener) and helpers for
//! running the real server inside a simulated network, so connection behavior
//! under fragmentation, latency and abrupt disconnects is reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod close_log;
pub mod sim_listener;

use std::sync::Arc;

pub use close_log::{CloseLog, ClosedConnection};
use sensorlink_server::{DecisionPolicy, FixedPolicy, Server, ServerConfig};
pub use sim_listener::SimListener;

/// Host name the simulated server runs under.
pub const SERVER_HOST: &str = "server";

/// Bind a [`SimListener`] on `config.bind_addr` and serve until the
/// simulation ends, recording every closed connection in `log`.
///
/// Meant to be the body of a `turmoil::Sim::host` closure.
pub async fn serve(
    config: ServerConfig,
    policy: Arc<dyn DecisionPolicy>,
    log: CloseLog,
) -> turmoil::Result {
    let listener = SimListener::bind(config.bind_addr).await?;
    Server::new(listener, policy, config).on_connection_closed(log.hook()).run().await?;
    Ok(())
}

/// [`serve`] with the default configuration and the fixed placeholder policy.
pub async fn serve_default(log: CloseLog) -> turmoil::Result {
    serve(ServerConfig::default(), Arc::new(FixedPolicy::default()), log).await
}
