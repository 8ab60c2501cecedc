//! A Rust implementation of an [xDS](https://www.envoyproxy.io/docs/envoy/latest/api-docs/xds_protocol)
//! Secret Discovery Service (SDS) server.
//!
//! This crate serves `envoy.service.secret.v3.SecretDiscoveryService`. It handles:
//! - The per-stream state-of-the-world protocol (version/nonce tracking, ACK/NACK)
//! - Assembly of discovery responses from a pluggable secret source
//! - Unary `FetchSecrets` calls
//! - Process-wide shutdown of every active stream
//!
//! It does NOT contain:
//! - Listener binding, TLS material loading or signal handling
//! - Certificate issuance, rotation or secret-store integrations
//!
//! Those are left to the embedding binary, which hands the service to a
//! [`tonic`] server and provides a [`SecretResolver`] for payload bytes.
//!
//! # Example
//!
//! ```ignore
//! use xds_sds::{Lifecycle, SecretDiscovery, ServiceConfig, StaticResolver};
//!
//! let resolver = StaticResolver::new().with_secret("default", "s3cr3t");
//! let lifecycle = Lifecycle::new();
//! let sds = SecretDiscovery::builder(resolver)
//!     .with_config(ServiceConfig::new())
//!     .with_lifecycle(lifecycle.clone())
//!     .build();
//!
//! tonic::transport::Server::builder()
//!     .add_service(sds.into_server())
//!     .serve_with_shutdown(addr, lifecycle.stopped())
//!     .await?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod nonce;
pub mod reconciler;
pub mod resolver;
pub mod response;
pub mod service;
pub mod transport;
pub mod version;

pub use codec::{ProstCodec, SdsCodec};
pub use config::ServiceConfig;
pub use error::{Error, Result};
pub use lifecycle::Lifecycle;
pub use message::{DiscoveryRequest, DiscoveryResponse, ErrorDetail, Node, ResourceAny, Secret};
pub use nonce::generate_nonce;
pub use reconciler::{Decision, Reconciler, StreamState};
pub use resolver::{DirectoryResolver, SecretResolver, StaticResolver};
pub use response::ResponseBuilder;
pub use service::{SecretDiscovery, SecretDiscoveryBuilder};
pub use transport::{DiscoveryStream, GrpcStream};
pub use version::{CounterVersion, VersionPolicy, WallClockVersion};

/// Type URL of the Envoy TLS `Secret` resource served by this crate.
pub const SECRET_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.Secret";
