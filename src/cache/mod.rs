//! Content-addressed, pairtree-sharded cache storage shared by the
//! derivative and info caches, grounded in `image_loader.rs`'s
//! `ProxyLoader::cached_img_path` (SHA-256 + `base16ct` hex, split into
//! two-character shard directories).

pub mod derivative;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub use derivative::DerivativeCache;

/// Maps an arbitrary cache key to a sharded path under `root`:
/// `root/ab/cd/<64-char-hex-digest>[.ext]`.
pub fn pairtree_path(root: &Path, key: &str, extension: Option<&str>) -> PathBuf {
    let digest = Sha256::digest(key.as_bytes());
    let mut hex = [0u8; 64];
    base16ct::lower::encode(&digest, &mut hex).expect("64-byte buffer fits a sha256 digest");
    let hex = std::str::from_utf8(&hex).expect("hex encoding is ASCII");

    let mut path = root.to_path_buf();
    path.push(&hex[0..2]);
    path.push(&hex[2..4]);
    path.push(hex);
    if let Some(ext) = extension {
        path.set_extension(ext);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_maps_to_the_same_path() {
        let root = Path::new("/cache");
        assert_eq!(pairtree_path(root, "abc123", Some("json")), pairtree_path(root, "abc123", Some("json")));
    }

    #[test]
    fn different_keys_shard_differently() {
        let root = Path::new("/cache");
        assert_ne!(pairtree_path(root, "abc123", None), pairtree_path(root, "xyz789", None));
    }
}
