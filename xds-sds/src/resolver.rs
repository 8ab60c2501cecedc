//! Pluggable secret resolution.
//!
//! The server does not know where secret bytes come from. A
//! [`SecretResolver`] turns a requested name into a payload; deployments
//! plug in their own secret store, tests use [`StaticResolver`].

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{Error, Result};

/// Resolves a secret name to its payload bytes.
pub trait SecretResolver: Send + Sync + 'static {
    /// Resolve `name`, failing if the secret cannot be produced.
    fn resolve(&self, name: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// An in-memory map of secrets.
///
/// # Example
///
/// ```
/// use xds_sds::StaticResolver;
///
/// let resolver = StaticResolver::new()
///     .with_secret("one", "first")
///     .with_secret("two", vec![0u8; 32]);
/// assert_eq!(resolver.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    secrets: HashMap<String, Bytes>,
}

impl StaticResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a secret.
    pub fn with_secret(mut self, name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        self.secrets.insert(name.into(), payload.into());
        self
    }

    /// Number of secrets held.
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Returns true if no secrets are held.
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

impl<N, P> FromIterator<(N, P)> for StaticResolver
where
    N: Into<String>,
    P: Into<Bytes>,
{
    fn from_iter<I: IntoIterator<Item = (N, P)>>(iter: I) -> Self {
        Self {
            secrets: iter
                .into_iter()
                .map(|(name, payload)| (name.into(), payload.into()))
                .collect(),
        }
    }
}

impl SecretResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Result<Bytes> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SecretNotFound(name.to_string()))
    }
}

/// Reads each secret from a file named after it inside a directory.
///
/// Files are read on every resolution, so replacing a file takes effect
/// with the next response built for that name.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    /// Create a resolver serving files from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory secrets are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(Error::InvalidSecretName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

impl SecretResolver for DirectoryResolver {
    async fn resolve(&self, name: &str) -> Result<Bytes> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(contents.into()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::SecretNotFound(name.to_string()))
            }
            Err(e) => Err(Error::resolve(name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::new().with_secret("one", "first");

        assert_eq!(resolver.resolve("one").await.unwrap(), "first");
        assert!(matches!(
            resolver.resolve("two").await,
            Err(Error::SecretNotFound(name)) if name == "two"
        ));
    }

    #[tokio::test]
    async fn test_static_resolver_from_iter() {
        let resolver: StaticResolver = [("one", "1"), ("two", "2")].into_iter().collect();

        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.resolve("two").await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_directory_resolver_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server-cert"), b"PEM DATA").unwrap();
        let resolver = DirectoryResolver::new(dir.path());

        assert_eq!(resolver.resolve("server-cert").await.unwrap(), "PEM DATA");

        std::fs::write(dir.path().join("server-cert"), b"ROTATED").unwrap();
        assert_eq!(resolver.resolve("server-cert").await.unwrap(), "ROTATED");
    }

    #[tokio::test]
    async fn test_directory_resolver_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryResolver::new(dir.path());

        assert!(matches!(
            resolver.resolve("absent").await,
            Err(Error::SecretNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_resolver_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryResolver::new(dir.path());

        for name in ["", ".", "..", "../etc/passwd", "nested/name", "back\\slash"] {
            assert!(
                matches!(
                    resolver.resolve(name).await,
                    Err(Error::InvalidSecretName(_))
                ),
                "{name:?} should be rejected"
            );
        }
    }
}
