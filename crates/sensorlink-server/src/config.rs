//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 12345;

/// Largest request payload accepted by default (16 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the listening socket to
    pub bind_addr: SocketAddr,
    /// Largest declared request length a connection will read.
    ///
    /// A larger length prefix closes the connection before any payload is
    /// buffered.
    pub max_payload_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}
