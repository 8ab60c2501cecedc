//! Provides abstraction for the bidirectional discovery stream.

use crate::error::Result;
use crate::message::{DiscoveryRequest, DiscoveryResponse};
use std::future::Future;

pub mod tonic;

pub use self::tonic::GrpcStream;

/// One open bidirectional discovery stream, as seen by the server.
///
/// This abstraction allows for different transport implementations:
/// - Tonic-based gRPC streams
/// - In-memory streams for testing
pub trait DiscoveryStream: Send + 'static {
    /// Receive the next request from the client.
    ///
    /// Returns:
    /// - `Ok(Some(request))` - Received a request.
    /// - `Ok(None)` - The client ended the stream.
    /// - `Err(_)` - Stream error (cancellation, connection dropped, etc.)
    ///
    /// Must be cancel safe: it is raced against the shutdown signal.
    fn recv(&mut self) -> impl Future<Output = Result<Option<DiscoveryRequest>>> + Send;

    /// Send a response to the client.
    fn send(&mut self, response: DiscoveryResponse) -> impl Future<Output = Result<()>> + Send;
}
