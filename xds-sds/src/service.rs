//! The `envoy.service.secret.v3.SecretDiscoveryService` gRPC service.

use std::pin::Pin;
use std::sync::Arc;

use envoy_types::pb::envoy::service::discovery::v3 as discovery;
use envoy_types::pb::envoy::service::secret::v3::secret_discovery_service_server::{
    SecretDiscoveryService, SecretDiscoveryServiceServer,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, field, info_span, Instrument};

use crate::codec::{ProstCodec, SdsCodec};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::lifecycle::Lifecycle;
use crate::message::{DiscoveryRequest, DiscoveryResponse};
use crate::reconciler::Reconciler;
use crate::resolver::SecretResolver;
use crate::response::ResponseBuilder;
use crate::transport::GrpcStream;
use crate::version::{VersionPolicy, WallClockVersion};

/// A Secret Discovery Service.
///
/// Every `StreamSecrets` call runs its own [`Reconciler`] on a dedicated
/// task. All streams share the resolver, version policy and [`Lifecycle`],
/// and nothing else.
///
/// # Example
///
/// ```ignore
/// let sds = SecretDiscovery::builder(resolver).build();
/// let lifecycle = sds.lifecycle().clone();
///
/// Server::builder()
///     .add_service(sds.into_server())
///     .serve_with_shutdown(addr, lifecycle.stopped())
///     .await?;
/// ```
#[derive(Debug)]
pub struct SecretDiscovery<R, V = WallClockVersion, C = ProstCodec> {
    builder: ResponseBuilder<R, C>,
    versions: Arc<V>,
    lifecycle: Lifecycle,
    config: ServiceConfig,
}

impl<R, V, C> Clone for SecretDiscovery<R, V, C> {
    fn clone(&self) -> Self {
        Self {
            builder: self.builder.clone(),
            versions: Arc::clone(&self.versions),
            lifecycle: self.lifecycle.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: SecretResolver> SecretDiscovery<R> {
    /// Start building a service that serves secrets from `resolver`.
    pub fn builder(resolver: R) -> SecretDiscoveryBuilder<R> {
        SecretDiscoveryBuilder::new(resolver)
    }
}

impl<R, V, C> SecretDiscovery<R, V, C>
where
    R: SecretResolver,
    V: VersionPolicy,
    C: SdsCodec,
{
    /// The lifecycle shared by every stream of this service.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Stop every active stream. See [`Lifecycle::stop`].
    pub fn stop(&self) {
        self.lifecycle.stop();
    }

    /// The service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create the reconciler for a newly opened stream.
    pub fn reconciler(&self) -> Reconciler<R, V, C> {
        Reconciler::new(
            self.builder.clone(),
            Arc::clone(&self.versions),
            self.lifecycle.clone(),
        )
    }

    /// Answer a one-shot request.
    ///
    /// Always assigns a fresh version and nonce; there is no stream state
    /// to validate the request against.
    pub async fn fetch(&self, request: &DiscoveryRequest) -> Result<DiscoveryResponse> {
        let version_info = self.versions.next_version();
        self.builder
            .build(&request.resource_names, &version_info)
            .await
    }

    /// Wrap the service in its tonic server.
    pub fn into_server(self) -> SecretDiscoveryServiceServer<Self> {
        SecretDiscoveryServiceServer::new(self)
    }
}

type BoxDeltaStream = Pin<
    Box<dyn Stream<Item = std::result::Result<discovery::DeltaDiscoveryResponse, Status>> + Send>,
>;

#[tonic::async_trait]
impl<R, V, C> SecretDiscoveryService for SecretDiscovery<R, V, C>
where
    R: SecretResolver,
    V: VersionPolicy,
    C: SdsCodec,
{
    type DeltaSecretsStream = BoxDeltaStream;

    async fn delta_secrets(
        &self,
        _request: Request<Streaming<discovery::DeltaDiscoveryRequest>>,
    ) -> std::result::Result<Response<Self::DeltaSecretsStream>, Status> {
        Err(Error::Unimplemented("DeltaSecrets").into())
    }

    type StreamSecretsStream =
        ReceiverStream<std::result::Result<discovery::DiscoveryResponse, Status>>;

    async fn stream_secrets(
        &self,
        request: Request<Streaming<discovery::DiscoveryRequest>>,
    ) -> std::result::Result<Response<Self::StreamSecretsStream>, Status> {
        let span = info_span!(
            "stream_secrets",
            remote_addr = ?request.remote_addr(),
            node_id = field::Empty,
            node_cluster = field::Empty
        );
        let (tx, rx) = mpsc::channel(self.config.response_buffer);
        let mut stream = GrpcStream::new(request.into_inner(), tx);
        let mut reconciler = self.reconciler();

        tokio::spawn(
            async move {
                debug!("stream opened");
                match reconciler.run(&mut stream).await {
                    Ok(()) | Err(Error::StreamClosed) => {}
                    Err(e) => stream.fail(e).await,
                }
                debug!("stream ended");
            }
            .instrument(span),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn fetch_secrets(
        &self,
        request: Request<discovery::DiscoveryRequest>,
    ) -> std::result::Result<Response<discovery::DiscoveryResponse>, Status> {
        let request = DiscoveryRequest::from(request.into_inner());
        debug!(
            node_id = %request.node.id,
            resources = ?request.resource_names,
            "fetch secrets"
        );
        let response = self.fetch(&request).await?;
        Ok(Response::new(response.into()))
    }
}

/// Builder for [`SecretDiscovery`].
#[derive(Debug)]
pub struct SecretDiscoveryBuilder<R, V = WallClockVersion, C = ProstCodec> {
    resolver: R,
    versions: V,
    codec: C,
    lifecycle: Option<Lifecycle>,
    config: ServiceConfig,
}

impl<R: SecretResolver> SecretDiscoveryBuilder<R> {
    fn new(resolver: R) -> Self {
        Self {
            resolver,
            versions: WallClockVersion,
            codec: ProstCodec,
            lifecycle: None,
            config: ServiceConfig::default(),
        }
    }
}

impl<R, V, C> SecretDiscoveryBuilder<R, V, C>
where
    R: SecretResolver,
    V: VersionPolicy,
    C: SdsCodec,
{
    /// Use a different version policy. Defaults to [`WallClockVersion`].
    pub fn with_version_policy<V2: VersionPolicy>(
        self,
        versions: V2,
    ) -> SecretDiscoveryBuilder<R, V2, C> {
        SecretDiscoveryBuilder {
            resolver: self.resolver,
            versions,
            codec: self.codec,
            lifecycle: self.lifecycle,
            config: self.config,
        }
    }

    /// Use a different codec. Defaults to [`ProstCodec`].
    pub fn with_codec<C2: SdsCodec>(self, codec: C2) -> SecretDiscoveryBuilder<R, V, C2> {
        SecretDiscoveryBuilder {
            resolver: self.resolver,
            versions: self.versions,
            codec,
            lifecycle: self.lifecycle,
            config: self.config,
        }
    }

    /// Share an existing lifecycle. A new one is created otherwise.
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Set the service configuration.
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the service.
    pub fn build(self) -> SecretDiscovery<R, V, C> {
        SecretDiscovery {
            builder: ResponseBuilder::with_codec(self.resolver, self.codec),
            versions: Arc::new(self.versions),
            lifecycle: self.lifecycle.unwrap_or_default(),
            config: self.config,
        }
    }
}
