//! Wiring the SDS service to a tonic server.

use tonic::transport::Server;
use tracing::info;
use xds_sds::{
    CounterVersion, DirectoryResolver, Lifecycle, SecretDiscovery, SecretResolver,
    StaticResolver, VersionPolicy, WallClockVersion,
};

use crate::cli::{ServerArgs, VersionPolicyArg};
use crate::listener::Listen;
use crate::BoxError;

/// Serve until `lifecycle` is stopped.
pub async fn run(args: ServerArgs, lifecycle: Lifecycle) -> Result<(), BoxError> {
    let listen = Listen::from_args(&args).await?;

    if let Some(dir) = &args.secrets.secrets_dir {
        info!(dir = %dir.display(), "serving secrets from directory");
        let resolver = DirectoryResolver::new(dir);
        with_version_policy(listen, resolver, args.version_policy, lifecycle).await
    } else {
        info!(count = args.secrets.secrets.len(), "serving static secrets");
        let resolver: StaticResolver = args.secrets.secrets.into_iter().collect();
        with_version_policy(listen, resolver, args.version_policy, lifecycle).await
    }
}

async fn with_version_policy<R: SecretResolver>(
    listen: Listen,
    resolver: R,
    policy: VersionPolicyArg,
    lifecycle: Lifecycle,
) -> Result<(), BoxError> {
    let builder = SecretDiscovery::builder(resolver).with_lifecycle(lifecycle);
    match policy {
        VersionPolicyArg::WallClock => {
            serve(listen, builder.with_version_policy(WallClockVersion).build()).await
        }
        VersionPolicyArg::Counter => {
            serve(listen, builder.with_version_policy(CounterVersion::new()).build()).await
        }
    }
}

/// Serve `sds` on `listen` until its lifecycle is stopped.
pub async fn serve<R, V>(listen: Listen, sds: SecretDiscovery<R, V>) -> Result<(), BoxError>
where
    R: SecretResolver,
    V: VersionPolicy,
{
    let lifecycle = sds.lifecycle().clone();
    let mut server = Server::builder();

    match listen {
        Listen::Tcp { addr, tls } => {
            let tls_enabled = tls.is_some();
            if let Some(tls) = tls {
                server = server.tls_config(tls)?;
            }

            info!(%addr, tls = tls_enabled, "SDS server listening");
            server
                .add_service(sds.into_server())
                .serve_with_shutdown(addr, lifecycle.stopped())
                .await?;
        }
        #[cfg(unix)]
        Listen::Uds(path) => {
            let listener = crate::listener::bind_uds(&path).await?;

            info!(path = %path.display(), "SDS server listening");
            let result = server
                .add_service(sds.into_server())
                .serve_with_incoming_shutdown(
                    tokio_stream::wrappers::UnixListenerStream::new(listener),
                    lifecycle.stopped(),
                )
                .await;

            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::debug!(error = %e, "failed to remove socket file");
            }
            result?;
        }
    }

    info!("SDS server stopped");
    Ok(())
}
