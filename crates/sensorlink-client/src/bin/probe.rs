//! Sensorlink probe.
//!
//! Connects to a server and sends the reference telemetry message on a fixed
//! interval, logging every response. Exits when the connection fails.

use std::{net::IpAddr, time::Duration};

use clap::Parser;
use sensorlink_client::{Client, ClientConfig, DEFAULT_MAX_RESPONSE_SIZE, sample};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sensorlink-probe")]
#[command(about = "Send reference telemetry to a sensorlink server", long_about = None)]
struct Args {
    /// Server IP address
    #[arg(long, default_value = "127.0.0.1")]
    ip: IpAddr,

    /// Server port
    #[arg(short, long, default_value_t = 12345)]
    port: u16,

    /// Seconds between requests
    #[arg(short, long, default_value_t = 1)]
    refresh_rate: u64,

    /// Stop after this many requests (runs forever when unset)
    #[arg(short, long)]
    count: Option<u64>,

    /// Largest response payload accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_RESPONSE_SIZE)]
    max_response_size: u32,

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

    let config = ClientConfig {
        server_addr: (args.ip, args.port).into(),
        refresh_interval: Duration::from_secs(args.refresh_rate),
        max_response_size: args.max_response_size,
    };

    let mut client = Client::connect(config.server_addr)
        .await
        .inspect_err(|err| error!(%err, addr = %config.server_addr, "failed to connect"))?
        .with_max_response_size(config.max_response_size);
    info!(addr = %config.server_addr, "connected");

    let message = sample::reference_message();
    let mut sent = 0u64;
    while args.count.is_none_or(|count| sent < count) {
        let response = client.request(&message).await?;
        sent += 1;
        info!(base = %response.base, units = ?response.units, "received response");

        tokio::time::sleep(config.refresh_interval).await;
    }

    Ok(())
}
