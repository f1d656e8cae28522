//! Sensorlink server binary.
//!
//! Listens for telemetry connections and answers every request with the fixed
//! placeholder policy (`NOP` for the base, `MOVE` for each unit).

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use clap::Parser;
use sensorlink_server::{
    FixedPolicy, Server, ServerConfig,
    config::{DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_PORT},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sensorlink-server")]
#[command(about = "Sensorlink telemetry server", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest request payload accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD_SIZE)]
    max_payload_size: u32,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = ServerConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        max_payload_size: args.max_payload_size,
    };

    let server = Server::bind(config, Arc::new(FixedPolicy::default())).await?;
    server.run().await?;

    Ok(())
}
