//! Bootstrap for the `sds-server` and `sds-client` binaries.
//!
//! Everything [`xds_sds`] leaves to its embedder lives here: command-line
//! parsing, log setup, listener binding, TLS material loading and signal
//! handling.

pub mod cli;
pub mod client;
pub mod listener;
pub mod server;
pub mod signal;
pub mod telemetry;

/// Error type returned by the bootstrap code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
