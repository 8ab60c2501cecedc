//! Codec for wrapping secrets into typed resource envelopes.
//!
//! The codec layer converts a resolved [`Secret`] into the [`ResourceAny`]
//! placed in a discovery response. This abstraction allows different
//! protobuf implementations to be used with the same reconciliation logic.

use crate::error::Result;
use crate::message::{ResourceAny, Secret};

pub mod prost;

pub use self::prost::ProstCodec;

/// Trait for encoding secrets into discovery resources.
pub trait SdsCodec: Send + Sync + 'static {
    /// Encode a [`Secret`] into a type-tagged [`ResourceAny`].
    fn encode_secret(&self, secret: &Secret) -> Result<ResourceAny>;

    /// Decode a [`ResourceAny`] produced by [`encode_secret`](Self::encode_secret).
    fn decode_secret(&self, resource: &ResourceAny) -> Result<Secret>;
}
