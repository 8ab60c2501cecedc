//! `tonic` based stream implementation.

use crate::error::{Error, Result};
use crate::message::{DiscoveryRequest, DiscoveryResponse};
use crate::transport::DiscoveryStream;
use envoy_types::pb::envoy::service::discovery::v3 as discovery;
use tokio::sync::mpsc;
use tonic::{Status, Streaming};

/// Sending half of a `StreamSecrets` response stream.
pub type ResponseSender = mpsc::Sender<std::result::Result<discovery::DiscoveryResponse, Status>>;

/// A `StreamSecrets` call backed by tonic.
///
/// Requests are read from the inbound [`Streaming`]; responses are queued on
/// a channel whose receiving end tonic drains into the HTTP/2 stream.
#[derive(Debug)]
pub struct GrpcStream {
    inbound: Streaming<discovery::DiscoveryRequest>,
    outbound: ResponseSender,
}

impl GrpcStream {
    /// Pair an inbound request stream with an outbound response channel.
    pub fn new(inbound: Streaming<discovery::DiscoveryRequest>, outbound: ResponseSender) -> Self {
        Self { inbound, outbound }
    }

    /// Deliver a terminal error to the client as the final status of the call.
    ///
    /// Does nothing if the client is already gone.
    pub async fn fail(self, error: Error) {
        let _ = self.outbound.send(Err(error.into())).await;
    }
}

impl DiscoveryStream for GrpcStream {
    async fn recv(&mut self) -> Result<Option<DiscoveryRequest>> {
        match self.inbound.message().await {
            Ok(msg) => Ok(msg.map(DiscoveryRequest::from)),
            Err(status) => Err(Error::Stream(status)),
        }
    }

    async fn send(&mut self, response: DiscoveryResponse) -> Result<()> {
        self.outbound
            .send(Ok(response.into()))
            .await
            .map_err(|_| Error::StreamClosed)
    }
}
