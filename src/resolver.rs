//! Identifier resolution: mapping an opaque identifier to a source file on
//! disk, grounded in `image_loader.rs`'s `LocalLoader`.
//!
//! `Resolver` is a closed enum rather than a `dyn` trait for the same reason
//! the teacher's `ImageLoader` is: an `async fn` in a trait isn't dyn-safe,
//! and this crate only ships one concrete resolver today.

use std::path::PathBuf;

use crate::error::IiifError;
use crate::params::Format;

pub struct ResolvedSource {
    pub path: PathBuf,
    pub format: Format,
}

#[derive(Debug, Clone)]
pub enum Resolver {
    Filesystem(FilesystemResolver),
}

impl Resolver {
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedSource, IiifError> {
        match self {
            Resolver::Filesystem(r) => r.resolve(identifier).await,
        }
    }
}

/// Resolves an identifier to `<root>/<identifier>.<source_format.extension()>`.
#[derive(Debug, Clone)]
pub struct FilesystemResolver {
    pub root: PathBuf,
    pub source_format: Format,
}

impl FilesystemResolver {
    pub fn new(root: impl Into<PathBuf>, source_format: Format) -> Self {
        FilesystemResolver { root: root.into(), source_format }
    }

    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedSource, IiifError> {
        if identifier.contains("..") || identifier.starts_with('/') {
            return Err(IiifError::Resolver(format!("Could not resolve identifier: {identifier}")));
        }

        let mut path = self.root.clone();
        path.push(identifier);
        path.set_extension(self.source_format.extension());

        tracing::debug!(identifier, path = %path.display(), "resolving identifier");

        if tokio::fs::metadata(&path).await.is_err() {
            return Err(IiifError::Resolver(format!("Could not resolve identifier: {identifier}")));
        }

        Ok(ResolvedSource { path, format: self.source_format })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_an_identifier_that_exists_on_disk() {
        let dir = std::env::temp_dir().join(format!("iiirs-resolver-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("bird.jp2"), b"fake jp2 bytes").await.unwrap();

        let resolver = FilesystemResolver::new(&dir, Format::Jp2);
        let resolved = resolver.resolve("bird").await.unwrap();
        assert_eq!(resolved.path, dir.join("bird.jp2"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_identifier_is_a_resolver_error() {
        let dir = std::env::temp_dir().join(format!("iiirs-resolver-test-{}", uuid::Uuid::new_v4()));
        let resolver = FilesystemResolver::new(&dir, Format::Jp2);
        assert!(matches!(resolver.resolve("nope").await, Err(IiifError::Resolver(_))));
    }

    #[tokio::test]
    async fn rejects_path_traversal_in_identifiers() {
        let dir = std::env::temp_dir();
        let resolver = FilesystemResolver::new(&dir, Format::Jp2);
        assert!(matches!(resolver.resolve("../../etc/passwd").await, Err(IiifError::Resolver(_))));
    }
}
