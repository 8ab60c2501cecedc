//! A small SDS client for poking at a running server.

use std::time::Duration;

use envoy_types::pb::envoy::service::discovery::v3 as discovery;
use envoy_types::pb::envoy::service::secret::v3::secret_discovery_service_client::SecretDiscoveryServiceClient;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tracing::{info, warn};
use xds_sds::{DiscoveryRequest, DiscoveryResponse, Node, ProstCodec, SdsCodec};

use crate::cli::ClientArgs;
use crate::listener::read;
use crate::BoxError;

/// How long to wait for the server to end the stream after the ACK.
const ACK_GRACE: Duration = Duration::from_secs(1);

/// Connect to the server named on the command line.
pub async fn connect(args: &ClientArgs) -> Result<SecretDiscoveryServiceClient<Channel>, BoxError> {
    let uri = match &args.uds {
        Some(path) => format!("unix://{}", path.display()),
        None => args.server.clone(),
    };

    let mut endpoint = Endpoint::from_shared(uri)?;
    if let Some(ca) = &args.ca_cert {
        let mut tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(read(ca).await?));
        if let Some(domain) = &args.domain_name {
            tls = tls.domain_name(domain.clone());
        }
        if let (Some(cert), Some(key)) = (&args.tls_cert, &args.tls_key) {
            tls = tls.identity(Identity::from_pem(read(cert).await?, read(key).await?));
        }
        endpoint = endpoint.tls_config(tls)?;
    }

    Ok(SecretDiscoveryServiceClient::new(endpoint.connect().await?))
}

/// The request described by the command line.
pub fn request(args: &ClientArgs) -> DiscoveryRequest {
    DiscoveryRequest::new(args.resources.iter().cloned())
        .with_node(Node::new(args.node_id.as_str(), args.node_cluster.as_str()))
}

/// Run the client to completion.
pub async fn run(args: ClientArgs) -> Result<(), BoxError> {
    let mut client = connect(&args).await?;
    let request = request(&args);

    if args.unary {
        let response = client
            .fetch_secrets(discovery::DiscoveryRequest::from(request))
            .await?
            .into_inner();
        log_response(&response.into())?;
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<discovery::DiscoveryRequest>(4);
    tx.send(request.clone().into()).await?;
    let mut responses = client
        .stream_secrets(ReceiverStream::new(rx))
        .await?
        .into_inner();

    let Some(first) = responses.message().await? else {
        return Err("server closed the stream without responding".into());
    };
    let first = DiscoveryResponse::from(first);
    log_response(&first)?;

    if args.ack {
        let ack = request
            .with_version_info(first.version_info.clone())
            .with_response_nonce(first.nonce.clone());
        tx.send(ack.into()).await?;
        info!(version_info = %first.version_info, "sent ACK");
    }
    drop(tx);

    match tokio::time::timeout(ACK_GRACE, responses.message()).await {
        Ok(Ok(None)) | Err(_) => {}
        Ok(Ok(Some(unexpected))) => {
            warn!(nonce = %unexpected.nonce, "unexpected response after first")
        }
        Ok(Err(status)) => return Err(status.into()),
    }
    Ok(())
}

fn log_response(response: &DiscoveryResponse) -> Result<(), BoxError> {
    info!(
        version_info = %response.version_info,
        nonce = %response.nonce,
        resources = response.resources.len(),
        "received discovery response"
    );
    for resource in &response.resources {
        let secret = ProstCodec.decode_secret(resource)?;
        info!(name = %secret.name, bytes = secret.payload.len(), "secret");
    }
    Ok(())
}
