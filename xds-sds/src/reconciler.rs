//! Per-stream reconciliation loop for `StreamSecrets`.
//!
//! The reconciler owns one discovery stream for its whole lifetime:
//! - Classifies every inbound request as a fresh request, ACK, NACK or stale nonce
//! - Tracks the version and nonce of the last response sent on the stream
//! - Builds and sends a response whenever a new version is assigned
//! - Stops cleanly when the service [`Lifecycle`] is stopped

use std::sync::Arc;

use tracing::{debug, error, warn, Span};

use crate::codec::SdsCodec;
use crate::error::{Error, Result};
use crate::lifecycle::Lifecycle;
use crate::message::{DiscoveryRequest, DiscoveryResponse};
use crate::resolver::SecretResolver;
use crate::response::ResponseBuilder;
use crate::transport::DiscoveryStream;
use crate::version::VersionPolicy;

/// What the reconciler does with one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Assign a new version and send a response.
    Respond,
    /// The client acknowledged the current version; stay silent.
    Ack,
    /// The client rejected the last response; stay silent.
    Nack,
    /// The request does not echo the last nonce sent; discard it.
    StaleNonce,
}

/// Protocol state of a single stream.
///
/// Created empty when the stream opens and dropped when it ends.
#[derive(Debug, Default)]
pub struct StreamState {
    /// The request that triggered the last response sent.
    last_request: Option<DiscoveryRequest>,
    /// Nonce of the last response sent.
    nonce: String,
    /// Version of the last response sent.
    version_info: String,
    /// Last version the client acknowledged.
    acked_version: Option<String>,
}

impl StreamState {
    /// Create the state of a newly opened stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an inbound request against the current state.
    ///
    /// Rules are applied in order: NACKs are always discarded; the first
    /// request always gets a response; later requests must echo the last
    /// nonce; an empty version asks for a fresh response; a version equal to
    /// the last sent one is an ACK; any other version asks for a response.
    pub fn decide(&self, request: &DiscoveryRequest) -> Decision {
        if request.is_nack() {
            return Decision::Nack;
        }

        if self.last_request.is_none() {
            return Decision::Respond;
        }

        if request.response_nonce != self.nonce {
            Decision::StaleNonce
        } else if request.version_info.is_empty() {
            Decision::Respond
        } else if request.version_info == self.version_info {
            Decision::Ack
        } else {
            Decision::Respond
        }
    }

    /// Record an ACK of the current version.
    pub fn record_ack(&mut self, request: &DiscoveryRequest) {
        self.acked_version = Some(request.version_info.clone());
    }

    /// Record a response that was delivered for `request`.
    pub fn record_sent(&mut self, request: DiscoveryRequest, response: &DiscoveryResponse) {
        self.last_request = Some(request);
        self.nonce = response.nonce.clone();
        self.version_info = response.version_info.clone();
    }

    /// Returns true once a response has been sent on this stream.
    pub fn is_tracking(&self) -> bool {
        self.last_request.is_some()
    }

    /// Nonce of the last response sent, empty before the first response.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Version of the last response sent, empty before the first response.
    pub fn version_info(&self) -> &str {
        &self.version_info
    }

    /// Last version the client acknowledged.
    pub fn acked_version(&self) -> Option<&str> {
        self.acked_version.as_deref()
    }

    /// Resource names of the request that triggered the last response.
    pub fn resource_names(&self) -> &[String] {
        self.last_request
            .as_ref()
            .map(|request| request.resource_names.as_slice())
            .unwrap_or_default()
    }
}

/// Drives one discovery stream until it ends.
#[derive(Debug)]
pub struct Reconciler<R, V, C> {
    builder: ResponseBuilder<R, C>,
    versions: Arc<V>,
    lifecycle: Lifecycle,
    state: StreamState,
}

impl<R, V, C> Reconciler<R, V, C>
where
    R: SecretResolver,
    V: VersionPolicy,
    C: SdsCodec,
{
    /// Create a reconciler for a newly opened stream.
    pub fn new(builder: ResponseBuilder<R, C>, versions: Arc<V>, lifecycle: Lifecycle) -> Self {
        Self {
            builder,
            versions,
            lifecycle,
            state: StreamState::new(),
        }
    }

    /// The protocol state of the stream.
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Run the reconciliation loop.
    ///
    /// Returns `Ok(())` when the lifecycle is stopped. Returns `Err` when
    /// receiving, building a response or sending fails; the stream is over
    /// in either case.
    pub async fn run<S: DiscoveryStream>(&mut self, stream: &mut S) -> Result<()> {
        loop {
            let request = tokio::select! {
                _ = self.lifecycle.stopped() => {
                    debug!("shutdown observed, closing stream");
                    return Ok(());
                }

                result = stream.recv() => {
                    match result {
                        Ok(Some(request)) => request,
                        Ok(None) => {
                            debug!("client closed stream");
                            return Err(Error::StreamClosed);
                        }
                        Err(e) => {
                            error!(error = %e, "failed to receive discovery request");
                            return Err(e);
                        }
                    }
                }
            };

            if !self.state.is_tracking() {
                let span = Span::current();
                span.record("node_id", request.node.id.as_str());
                span.record("node_cluster", request.node.cluster.as_str());
            }

            self.handle_request(stream, request).await?;
        }
    }

    /// Apply one inbound request, sending a response if it calls for one.
    async fn handle_request<S: DiscoveryStream>(
        &mut self,
        stream: &mut S,
        request: DiscoveryRequest,
    ) -> Result<()> {
        match self.state.decide(&request) {
            Decision::Nack => {
                if let Some(detail) = &request.error_detail {
                    warn!(
                        code = detail.code,
                        error_message = %detail.message,
                        version_info = %request.version_info,
                        "client rejected discovery response"
                    );
                }
                Ok(())
            }
            Decision::StaleNonce => {
                warn!(
                    response_nonce = %request.response_nonce,
                    "invalid response nonce, discarding request"
                );
                Ok(())
            }
            Decision::Ack => {
                debug!(version_info = %request.version_info, "received ACK");
                self.state.record_ack(&request);
                Ok(())
            }
            Decision::Respond => self.respond(stream, request).await,
        }
    }

    async fn respond<S: DiscoveryStream>(
        &mut self,
        stream: &mut S,
        request: DiscoveryRequest,
    ) -> Result<()> {
        for name in &request.resource_names {
            debug!(resource = %name, "request for resource received");
        }

        let version_info = self.versions.next_version();
        let response = self
            .builder
            .build(&request.resource_names, &version_info)
            .await
            .inspect_err(|e| error!(error = %e, "error while creating response"))?;

        stream
            .send(response.clone())
            .await
            .inspect_err(|e| error!(error = %e, "error sending stream response"))?;

        debug!(
            version_info = %response.version_info,
            resources = response.resources.len(),
            "sent discovery response"
        );
        self.state.record_sent(request, &response);
        Ok(())
    }
}
