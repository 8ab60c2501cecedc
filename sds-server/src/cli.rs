//! Command-line arguments.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// Default TCP port of the SDS server.
pub const DEFAULT_PORT: u16 = 50051;

/// Serve `envoy.service.secret.v3.SecretDiscoveryService`.
#[derive(Parser, Debug)]
#[command(name = "sds-server", version)]
pub struct ServerArgs {
    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to listen on.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Listen on a Unix domain socket at this path instead of TCP.
    #[arg(long, conflicts_with_all = ["port", "host", "tls_cert", "tls_key", "client_ca"])]
    pub uds: Option<PathBuf>,

    #[command(flatten)]
    pub tls: ServerTlsArgs,

    #[command(flatten)]
    pub secrets: SecretSource,

    /// How version stamps are assigned to responses.
    #[arg(long, value_enum, default_value_t = VersionPolicyArg::WallClock)]
    pub version_policy: VersionPolicyArg,

    /// Log output format. The level is taken from `RUST_LOG`.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerArgs {
    /// The TCP address to bind when no Unix socket was requested.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Server certificate and optional client CA.
#[derive(Args, Debug, Default)]
pub struct ServerTlsArgs {
    /// PEM certificate chain presented by the server.
    #[arg(long, requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key of the server certificate.
    #[arg(long, requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// PEM bundle used to verify client certificates. Enables mTLS.
    #[arg(long, requires = "tls_cert")]
    pub client_ca: Option<PathBuf>,
}

/// Where secret payloads come from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SecretSource {
    /// Serve each secret from the file of the same name in this directory.
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,

    /// Serve a fixed secret. May be repeated.
    #[arg(long = "secret", value_name = "NAME=VALUE", value_parser = parse_secret)]
    pub secrets: Vec<(String, String)>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPolicyArg {
    /// RFC 3339 timestamps with nanosecond precision.
    WallClock,
    /// A counter starting at 1.
    Counter,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

fn parse_secret(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, _)) if name.is_empty() => Err("secret name must not be empty".to_string()),
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!("expected NAME=VALUE, got `{s}`")),
    }
}

/// Open a `StreamSecrets` call (or a `FetchSecrets` call) and log the result.
#[derive(Parser, Debug)]
#[command(name = "sds-client", version)]
pub struct ClientArgs {
    /// Server URI.
    #[arg(long, default_value = "http://127.0.0.1:50051")]
    pub server: String,

    /// Connect to a Unix domain socket at this path instead.
    #[arg(long, conflicts_with_all = ["server", "ca_cert", "tls_cert", "tls_key"])]
    pub uds: Option<PathBuf>,

    /// PEM bundle used to verify the server certificate.
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Name expected in the server certificate.
    #[arg(long, requires = "ca_cert")]
    pub domain_name: Option<String>,

    /// PEM client certificate, for mTLS.
    #[arg(long, requires_all = ["tls_key", "ca_cert"])]
    pub tls_cert: Option<PathBuf>,

    /// PEM private key of the client certificate.
    #[arg(long, requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,

    /// Secret names to request. May be repeated.
    #[arg(long = "resource", required = true)]
    pub resources: Vec<String>,

    /// Node id sent with the request.
    #[arg(long, default_value = "sds-client")]
    pub node_id: String,

    /// Node cluster sent with the request.
    #[arg(long, default_value = "")]
    pub node_cluster: String,

    /// ACK the first response before closing the stream.
    #[arg(long)]
    pub ack: bool,

    /// Use the unary `FetchSecrets` call instead of a stream.
    #[arg(long, conflicts_with = "ack")]
    pub unary: bool,

    /// Log output format. The level is taken from `RUST_LOG`.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}
