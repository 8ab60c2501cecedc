//! Process-wide shutdown coordination.

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// A write-once stop signal shared by every active discovery stream.
///
/// Cloning yields another handle to the same signal. Once [`stop`](Self::stop)
/// is called, every current and future waiter observes it.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
}

impl Lifecycle {
    /// Create a running lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every stream to terminate.
    ///
    /// Streams finish the response they are currently sending, then return
    /// without error. Calling this more than once has no further effect.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("stopping secret discovery service");
        }
        self.token.cancel();
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves once the lifecycle is stopped.
    ///
    /// Suitable as the shutdown signal of a tonic server.
    pub fn stopped(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }
}
