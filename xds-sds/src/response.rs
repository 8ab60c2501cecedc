//! Discovery response assembly.

use std::sync::Arc;

use crate::codec::{ProstCodec, SdsCodec};
use crate::error::Result;
use crate::message::{DiscoveryResponse, Secret};
use crate::nonce::generate_nonce;
use crate::resolver::SecretResolver;
use crate::SECRET_TYPE_URL;

/// Builds complete discovery responses for a list of secret names.
///
/// Cloning is cheap; clones share the same resolver and codec.
#[derive(Debug)]
pub struct ResponseBuilder<R, C = ProstCodec> {
    resolver: Arc<R>,
    codec: Arc<C>,
}

impl<R, C> Clone for ResponseBuilder<R, C> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<R: SecretResolver> ResponseBuilder<R> {
    /// Create a builder that encodes secrets with [`ProstCodec`].
    pub fn new(resolver: R) -> Self {
        Self::with_codec(resolver, ProstCodec)
    }
}

impl<R, C> ResponseBuilder<R, C>
where
    R: SecretResolver,
    C: SdsCodec,
{
    /// Create a builder with a custom codec.
    pub fn with_codec(resolver: R, codec: C) -> Self {
        Self {
            resolver: Arc::new(resolver),
            codec: Arc::new(codec),
        }
    }

    /// The codec used to wrap secrets.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Build a response carrying one resource per name, in the given order.
    ///
    /// Every response gets a fresh nonce. If any name fails to resolve or
    /// encode, no response is produced and the error is returned.
    pub async fn build(
        &self,
        resource_names: &[String],
        version_info: &str,
    ) -> Result<DiscoveryResponse> {
        let nonce = generate_nonce()?;

        let mut resources = Vec::with_capacity(resource_names.len());
        for name in resource_names {
            let payload = self.resolver.resolve(name).await?;
            let secret = Secret::new(name.as_str(), payload);
            resources.push(self.codec.encode_secret(&secret)?);
        }

        Ok(DiscoveryResponse {
            version_info: version_info.to_string(),
            resources,
            type_url: SECRET_TYPE_URL.to_string(),
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resolver::StaticResolver;

    fn builder() -> ResponseBuilder<StaticResolver> {
        ResponseBuilder::new(
            StaticResolver::new()
                .with_secret("one", "first")
                .with_secret("two", "second")
                .with_secret("three", "third"),
        )
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn test_build_single_resource() {
        let response = builder().build(&names(&["one"]), "v1").await.unwrap();

        assert_eq!(response.version_info, "v1");
        assert_eq!(response.type_url, SECRET_TYPE_URL);
        assert!(!response.nonce.is_empty());
        assert_eq!(response.resources.len(), 1);
        assert_eq!(response.resources[0].type_url, SECRET_TYPE_URL);
    }

    #[tokio::test]
    async fn test_build_preserves_request_order() {
        let builder = builder();
        let response = builder
            .build(&names(&["three", "one", "two"]), "v1")
            .await
            .unwrap();

        let decoded: Vec<Secret> = response
            .resources
            .iter()
            .map(|resource| builder.codec().decode_secret(resource).unwrap())
            .collect();
        assert_eq!(
            decoded,
            vec![
                Secret::new("three", "third"),
                Secret::new("one", "first"),
                Secret::new("two", "second"),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_no_names() {
        let response = builder().build(&[], "v1").await.unwrap();

        assert!(response.resources.is_empty());
        assert!(!response.nonce.is_empty());
    }

    #[tokio::test]
    async fn test_build_fails_on_any_unresolved_name() {
        let result = builder()
            .build(&names(&["one", "missing", "two"]), "v1")
            .await;

        assert!(matches!(result, Err(Error::SecretNotFound(name)) if name == "missing"));
    }

    #[tokio::test]
    async fn test_build_generates_fresh_nonce() {
        let builder = builder();
        let first = builder.build(&names(&["one"]), "v1").await.unwrap();
        let second = builder.build(&names(&["one"]), "v1").await.unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert_eq!(first.resources, second.resources);
    }
}
