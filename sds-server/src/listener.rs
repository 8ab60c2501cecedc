//! Listener binding and TLS material loading.

use std::io;
use std::path::{Path, PathBuf};

use tonic::transport::{Certificate, Identity, ServerTlsConfig};
use tracing::debug;

use crate::cli::{ServerArgs, ServerTlsArgs};
use crate::BoxError;

/// Where the server accepts connections.
#[derive(Debug)]
pub enum Listen {
    Tcp {
        addr: std::net::SocketAddr,
        tls: Option<ServerTlsConfig>,
    },
    #[cfg(unix)]
    Uds(PathBuf),
}

impl Listen {
    /// Resolve the listen target from the command line, loading TLS files.
    pub async fn from_args(args: &ServerArgs) -> Result<Self, BoxError> {
        if let Some(path) = &args.uds {
            return uds(path);
        }

        Ok(Listen::Tcp {
            addr: args.addr(),
            tls: load_server_tls(&args.tls).await?,
        })
    }
}

#[cfg(unix)]
fn uds(path: &Path) -> Result<Listen, BoxError> {
    Ok(Listen::Uds(path.to_path_buf()))
}

#[cfg(not(unix))]
fn uds(_path: &Path) -> Result<Listen, BoxError> {
    Err("unix domain sockets are not supported on this platform".into())
}

/// Build the server TLS config, or `None` when no certificate was given.
///
/// A client CA turns on client certificate verification.
pub async fn load_server_tls(args: &ServerTlsArgs) -> Result<Option<ServerTlsConfig>, BoxError> {
    let (Some(cert), Some(key)) = (&args.tls_cert, &args.tls_key) else {
        return Ok(None);
    };

    let identity = Identity::from_pem(read(cert).await?, read(key).await?);
    let mut tls = ServerTlsConfig::new().identity(identity);

    if let Some(ca) = &args.client_ca {
        tls = tls.client_ca_root(Certificate::from_pem(read(ca).await?));
    }

    Ok(Some(tls))
}

/// Read a PEM file, naming the path on failure.
pub async fn read(path: &Path) -> Result<Vec<u8>, BoxError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", path.display()).into())
}

/// Bind a Unix listener at `path`.
///
/// Missing parent directories are created and a leftover socket file from a
/// previous run is removed first.
#[cfg(unix)]
pub async fn bind_uds(path: &Path) -> io::Result<tokio::net::UnixListener> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed stale socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    tokio::net::UnixListener::bind(path)
}
