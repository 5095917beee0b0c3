//! `ImageInfo`: the in-memory capability record derived from a JPEG 2000
//! header, and the two-tier cache that fronts it with per-identifier JSON
//! files on disk, per `loris/webapp.py`'s `get_info`/`_get_info`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::cache::pairtree_path;
use crate::constants;
use crate::jp2::Jp2Header;
use crate::params::{Format, Quality};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub scale_factors: Vec<u32>,
    pub qualities: Vec<Quality>,
    pub formats: Vec<Format>,
}

impl ImageInfo {
    pub fn new(base_uri: &str, identifier: &str, header: &Jp2Header, target_formats: &[Format]) -> Self {
        let mut qualities = vec![Quality::Default, Quality::Bitonal];
        if header.components >= 1 {
            qualities.push(Quality::Gray);
        }
        if header.components >= 3 {
            qualities.push(Quality::Color);
        }

        ImageInfo {
            id: format!("{base_uri}/{identifier}"),
            width: header.width,
            height: header.height,
            tile_width: header.tile_width,
            tile_height: header.tile_height,
            scale_factors: header.scale_factors(),
            qualities,
            formats: target_formats.to_vec(),
        }
    }

    /// The IIIF Image API 2.0 `info.json` document for this image.
    pub fn to_document(&self) -> InfoDocument {
        InfoDocument {
            context: constants::CONTEXT,
            id: self.id.clone(),
            protocol: constants::PROTOCOL,
            width: self.width,
            height: self.height,
            tiles: vec![TileInfo {
                width: self.tile_width,
                height: self.tile_height,
                scale_factors: self.scale_factors.clone(),
            }],
            profile: (
                constants::COMPLIANCE.to_string(),
                ProfileDetail {
                    qualities: self.qualities.iter().map(Quality::to_string).collect(),
                    formats: self.formats.iter().map(Format::to_string).collect(),
                },
            ),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InfoDocument {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: String,
    pub protocol: &'static str,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<TileInfo>,
    pub profile: (String, ProfileDetail),
}

#[derive(Debug, Serialize)]
pub struct TileInfo {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct ProfileDetail {
    pub qualities: Vec<String>,
    pub formats: Vec<String>,
}

/// Fronts a per-identifier JSON file on disk with an in-memory map, so a hot
/// identifier never touches the filesystem twice in a row.
pub struct InfoCache {
    root: PathBuf,
    memory: RwLock<HashMap<String, Arc<(ImageInfo, SystemTime)>>>,
}

impl InfoCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        InfoCache { root: root.into(), memory: RwLock::new(HashMap::new()) }
    }

    pub async fn get(&self, identifier: &str) -> Option<(ImageInfo, SystemTime)> {
        if let Some(hit) = self.memory.read().await.get(identifier) {
            return Some((hit.0.clone(), hit.1));
        }

        let path = pairtree_path(&self.root, identifier, Some("json"));
        let bytes = tokio::fs::read(&path).await.ok()?;
        let info: ImageInfo = serde_json::from_slice(&bytes).ok()?;
        let mtime = tokio::fs::metadata(&path).await.ok()?.modified().ok()?;

        self.memory.write().await.insert(identifier.to_string(), Arc::new((info.clone(), mtime)));
        Some((info, mtime))
    }

    pub async fn insert(&self, identifier: &str, info: ImageInfo) -> std::io::Result<(ImageInfo, SystemTime)> {
        let path = pairtree_path(&self.root, identifier, Some("json"));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&info)?;
        tokio::fs::write(&path, &bytes).await?;
        let mtime = tokio::fs::metadata(&path).await?.modified()?;

        self.memory.write().await.insert(identifier.to_string(), Arc::new((info.clone(), mtime)));
        Ok((info, mtime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Jp2Header {
        Jp2Header { width: 4000, height: 3000, components: 3, tile_width: 256, tile_height: 256, decomposition_levels: 4 }
    }

    #[test]
    fn qualities_depend_on_component_count() {
        let mut h = header();
        h.components = 1;
        let info = ImageInfo::new("http://example.org/iiif", "id", &h, &[Format::Jpg]);
        assert_eq!(info.qualities, vec![Quality::Default, Quality::Bitonal, Quality::Gray]);

        h.components = 3;
        let info = ImageInfo::new("http://example.org/iiif", "id", &h, &[Format::Jpg]);
        assert!(info.qualities.contains(&Quality::Color));
    }

    #[test]
    fn document_carries_the_compliance_profile() {
        let info = ImageInfo::new("http://example.org/iiif", "id", &header(), &[Format::Jpg, Format::Png]);
        let doc = info.to_document();
        assert_eq!(doc.profile.0, constants::COMPLIANCE);
        assert_eq!(doc.profile.1.formats, vec!["jpg".to_string(), "png".to_string()]);
    }

    #[tokio::test]
    async fn insert_then_get_round_trips_through_disk_and_memory() {
        let dir = std::env::temp_dir().join(format!("iiirs-info-cache-test-{}", uuid::Uuid::new_v4()));
        let cache = InfoCache::new(&dir);
        let info = ImageInfo::new("http://example.org/iiif", "abc", &header(), &[Format::Jpg]);

        let (_, mtime) = cache.insert("abc", info.clone()).await.unwrap();
        let (fetched, fetched_mtime) = cache.get("abc").await.unwrap();
        assert_eq!(fetched.width, info.width);
        assert_eq!(fetched_mtime, mtime);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
