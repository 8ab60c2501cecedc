//! Error types for the SDS server.

use thiserror::Error;
use tonic::Status;

/// Error type for the SDS server.
#[derive(Debug, Error)]
pub enum Error {
    /// The OS entropy source could not produce a nonce.
    #[error("failed to generate nonce: {0}")]
    Nonce(#[source] rand::Error),

    /// The resolver has no secret with this name.
    #[error("secret `{0}` not found")]
    SecretNotFound(String),

    /// The resolver refused the secret name.
    #[error("invalid secret name `{0}`")]
    InvalidSecretName(String),

    /// Any other resolver failure.
    #[error("failed to resolve secret `{name}`: {reason}")]
    Resolve {
        /// The secret being resolved.
        name: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A resource could not be decoded.
    #[error("failed to decode resource: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A resource carried a type URL this crate does not serve.
    #[error("unexpected resource type `{0}`")]
    UnexpectedTypeUrl(String),

    /// Receiving from the discovery stream failed.
    #[error("stream error: {0}")]
    Stream(#[from] Status),

    /// The peer ended the stream, or the outbound side is gone.
    #[error("stream closed")]
    StreamClosed,

    /// The called method is not supported.
    #[error("method {0} not implemented")]
    Unimplemented(&'static str),
}

impl Error {
    /// Create an [`Error::Resolve`] for `name` from any displayable cause.
    pub fn resolve(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Resolve {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Stream(status) => status,
            Error::SecretNotFound(_) => Status::not_found(message),
            Error::InvalidSecretName(_) => Status::invalid_argument(message),
            Error::StreamClosed => Status::cancelled(message),
            Error::Unimplemented(_) => Status::unimplemented(message),
            Error::Nonce(_)
            | Error::Resolve { .. }
            | Error::Decode(_)
            | Error::UnexpectedTypeUrl(_) => Status::internal(message),
        }
    }
}

/// Result type alias for SDS server operations.
pub type Result<T> = std::result::Result<T, Error>;
