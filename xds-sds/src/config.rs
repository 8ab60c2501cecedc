//! Configuration for the SDS service.

/// Default capacity of the per-stream outbound response channel.
pub const DEFAULT_RESPONSE_BUFFER: usize = 16;

/// Configuration for the SDS service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Capacity of the channel that carries responses from a stream's
    /// reconciler task to the gRPC transport.
    ///
    /// Default: 16.
    pub response_buffer: usize,
}

impl ServiceConfig {
    /// Create a new configuration with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use xds_sds::ServiceConfig;
    ///
    /// let config = ServiceConfig::new().with_response_buffer(32);
    /// assert_eq!(config.response_buffer, 32);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outbound response channel capacity. Values below 1 are raised to 1.
    pub fn with_response_buffer(mut self, response_buffer: usize) -> Self {
        self.response_buffer = response_buffer.max(1);
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            response_buffer: DEFAULT_RESPONSE_BUFFER,
        }
    }
}
