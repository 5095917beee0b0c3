//! The derivative (image byte) cache: content-addressed storage keyed by a
//! fresh UUID per build, with symlinks from both the literal and canonical
//! request keys pointing at the one underlying file, per
//! `loris/webapp.py`'s `_make_image`/`Loris._get_uuid_path`.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::error::IiifError;

pub struct DerivativeCache {
    /// Where the actual derivative bytes live, sharded by a fresh UUID.
    content_root: PathBuf,
    /// Where literal/canonical request keys are symlinked to a content file.
    links_root: PathBuf,
    /// At-most-once build coordination per canonical key, in addition to the
    /// filesystem's own atomic rename.
    build_locks: Mutex<HashMap<String, Arc<Notify>>>,
}

impl DerivativeCache {
    pub fn new(content_root: impl Into<PathBuf>, links_root: impl Into<PathBuf>) -> Self {
        DerivativeCache {
            content_root: content_root.into(),
            links_root: links_root.into(),
            build_locks: Mutex::new(HashMap::new()),
        }
    }

    fn link_path(&self, key: &str) -> PathBuf {
        let mut path = self.links_root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }

    /// Returns a readable path for `literal_key` if either it or
    /// `canonical_key` is already cached. Lazily creates the literal symlink
    /// on a canonical-only hit, so the next lookup is a single stat.
    pub async fn lookup(&self, literal_key: &str, canonical_key: &str) -> Option<PathBuf> {
        let literal_link = self.link_path(literal_key);
        if tokio::fs::symlink_metadata(&literal_link).await.is_ok() {
            return Some(literal_link);
        }

        let canonical_link = self.link_path(canonical_key);
        let target = tokio::fs::read_link(&canonical_link).await.ok()?;
        if literal_key != canonical_key {
            let _ = self.symlink(&literal_link, &target).await;
        }
        Some(literal_link)
    }

    async fn symlink(&self, link: &Path, target: &Path) -> std::io::Result<()> {
        if let Some(parent) = link.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::symlink(target, link).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Returns the cached derivative for `canonical_key`, building it with
    /// `build` if nobody else is already building it. Concurrent callers for
    /// the same canonical key block on the in-flight build instead of
    /// duplicating the work.
    pub async fn get_or_build<F, Fut>(
        &self,
        literal_key: &str,
        canonical_key: &str,
        extension: &str,
        build: F,
    ) -> Result<PathBuf, IiifError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<(), IiifError>>,
    {
        if let Some(path) = self.lookup(literal_key, canonical_key).await {
            return Ok(path);
        }

        let mut locks = self.build_locks.lock().await;
        if let Some(existing) = locks.get(canonical_key).cloned() {
            // Register with the `Notify` while still holding `build_locks`, so a
            // builder's `notify_waiters()` (which only wakes already-registered
            // waiters) cannot fire in the gap between finding this entry and
            // starting to wait on it.
            let mut notified = Box::pin(existing.notified());
            notified.as_mut().enable();
            drop(locks);

            notified.await;
            return self
                .lookup(literal_key, canonical_key)
                .await
                .ok_or_else(|| IiifError::Image("derivative build by another request did not complete".to_string()));
        }
        locks.insert(canonical_key.to_string(), Arc::new(Notify::new()));
        drop(locks);

        let result = self.build_and_link(literal_key, canonical_key, extension, build).await;

        let notify = self.build_locks.lock().await.remove(canonical_key);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }

        result
    }

    async fn build_and_link<F, Fut>(
        &self,
        literal_key: &str,
        canonical_key: &str,
        extension: &str,
        build: F,
    ) -> Result<PathBuf, IiifError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<(), IiifError>>,
    {
        let shard = Uuid::new_v4().simple().to_string();
        let mut content_path = self.content_root.clone();
        content_path.push(&shard[0..2]);
        content_path.push(&shard[2..4]);
        content_path.push(format!("{shard}.{extension}"));

        if let Some(parent) = content_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp_path = content_path.with_extension(format!("{extension}.tmp"));
        build(tmp_path.clone()).await?;
        tokio::fs::rename(&tmp_path, &content_path).await.map_err(io_err)?;

        let literal_link = self.link_path(literal_key);
        self.symlink(&literal_link, &content_path).await.map_err(io_err)?;
        if canonical_key != literal_key {
            let canonical_link = self.link_path(canonical_key);
            self.symlink(&canonical_link, &content_path).await.map_err(io_err)?;
        }

        Ok(literal_link)
    }
}

fn io_err(e: std::io::Error) -> IiifError {
    IiifError::Image(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> (DerivativeCache, PathBuf) {
        let base = std::env::temp_dir().join(format!("iiirs-derivative-cache-test-{}", Uuid::new_v4()));
        let cache = DerivativeCache::new(base.join("content"), base.join("links"));
        (cache, base)
    }

    #[tokio::test]
    async fn builds_once_and_links_both_keys() {
        let (cache, base) = temp_cache();

        let path = cache
            .get_or_build("id/full/full/0/default.jpg", "id/full/1000,2000/0/default.jpg", "jpg", |tmp| async move {
                tokio::fs::write(&tmp, b"derivative bytes").await.map_err(|e| IiifError::Image(e.to_string()))
            })
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"derivative bytes");

        let canonical_hit = cache.lookup("anything-else", "id/full/1000,2000/0/default.jpg").await;
        assert!(canonical_hit.is_some());

        tokio::fs::remove_dir_all(&base).await.ok();
    }

    #[tokio::test]
    async fn second_build_is_a_cache_hit_not_a_rebuild() {
        let (cache, base) = temp_cache();
        let build_count = Arc::new(tokio::sync::Mutex::new(0u32));

        for _ in 0..2 {
            let build_count = build_count.clone();
            cache
                .get_or_build("id/full/full/0/default.jpg", "id/full/full/0/default.jpg", "jpg", move |tmp| {
                    let build_count = build_count.clone();
                    async move {
                        *build_count.lock().await += 1;
                        tokio::fs::write(&tmp, b"bytes").await.map_err(|e| IiifError::Image(e.to_string()))
                    }
                })
                .await
                .unwrap();
        }

        assert_eq!(*build_count.lock().await, 1);
        tokio::fs::remove_dir_all(&base).await.ok();
    }
}
