//! Sensorlink telemetry server.
//!
//! Accepts stream connections, answers each framed telemetry request with a
//! framed action response, and keeps going until the peer hangs up.
//!
//! # Architecture
//!
//! ```text
//! Listener ──accept──> Connection (one task per peer)
//!                        read_frame → decode → DecisionPolicy → encode → write_frame
//! ```
//!
//! Connections share nothing but a read-only [`DecisionPolicy`]. A fault on one
//! connection ends that connection only.
//!
//! # Components
//!
//! - [`config`]: Server configuration
//! - [`policy`]: Decision policy seam and the fixed placeholder policy
//! - [`connection`]: Per-connection request/response loop
//! - [`listener`]: Accept loop and the [`Listener`] abstraction
//! - [`error`]: Server error types

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod policy;

pub use config::ServerConfig;
pub use connection::{CloseReason, Connection, ConnectionState, ConnectionSummary};
pub use error::ServerError;
pub use listener::{Listener, Server};
pub use policy::{DecisionPolicy, FixedPolicy};
