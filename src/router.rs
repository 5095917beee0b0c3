//! Framework-agnostic request dispatch: resolves an identifier, consults
//! both caches, drives the transformer, and decides on canonical redirects.
//! No HTTP types appear here; the `http` module binds this to `axum`.
//!
//! Grounded in `loris/webapp.py`'s `Loris.route`/`get_img`/`get_info`/
//! `_make_image`.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::cache::DerivativeCache;
use crate::error::IiifError;
use crate::info::{ImageInfo, InfoCache};
use crate::jp2::Jp2Header;
use crate::params::ImageRequest;
use crate::resolver::Resolver;
use crate::transform::{TransformContext, Transformer};

pub struct RouterConfig {
    /// 301-redirect non-canonical image requests to their canonical form
    /// instead of serving them directly.
    pub redirect_canonical_image_request: bool,
}

pub struct Router {
    pub resolver: Resolver,
    pub transformer: Transformer,
    pub info_cache: InfoCache,
    pub derivative_cache: Option<DerivativeCache>,
    pub config: RouterConfig,
}

pub enum ImageOutcome {
    Image { path: PathBuf, content_type: &'static str, last_modified: SystemTime, canonical_uri_tail: String },
    Redirect { location_tail: String },
}

impl Router {
    pub async fn get_info(&self, identifier: &str, base_uri: &str) -> Result<(ImageInfo, SystemTime), IiifError> {
        if let Some(hit) = self.info_cache.get(identifier).await {
            return Ok(hit);
        }

        let source = self.resolver.resolve(identifier).await?;
        let bytes = tokio::fs::read(&source.path).await.map_err(|e| IiifError::ImageInfo(e.to_string()))?;
        let header = Jp2Header::parse(&bytes)?;
        let info = ImageInfo::new(base_uri, identifier, &header, self.transformer.target_formats());

        tracing::info!(identifier, width = info.width, height = info.height, "built image info");

        self.info_cache.insert(identifier, info).await.map_err(|e| IiifError::ImageInfo(e.to_string()))
    }

    pub async fn get_image(
        &self,
        identifier: &str,
        region: &str,
        size: &str,
        rotation: &str,
        quality_dot_format: &str,
        base_uri: &str,
    ) -> Result<ImageOutcome, IiifError> {
        let request = ImageRequest::parse(identifier, region, size, rotation, quality_dot_format)?;

        let (info, _) = self.get_info(identifier, base_uri).await?;

        if !info.qualities.contains(&request.quality) {
            return Err(IiifError::Quality(format!(
                "\"{}\" quality is not available for this image",
                request.quality
            )));
        }
        if !self.transformer.target_formats().contains(&request.format) {
            return Err(IiifError::Format(format!("\"{}\" is not a supported format for this image", request.format)));
        }

        let resolved = request.resolve(&info)?;

        if self.config.redirect_canonical_image_request && !request.is_canonical(&resolved) {
            return Ok(ImageOutcome::Redirect { location_tail: request.canonical_path(&resolved) });
        }

        let literal_key = request.literal_path();
        let canonical_key = request.canonical_path(&resolved);

        let source = self.resolver.resolve(identifier).await?;
        let ctx = TransformContext { request: &request, resolved: &resolved, info: &info };

        let path = match &self.derivative_cache {
            Some(cache) => {
                let transformer = &self.transformer;
                let source_path = source.path.clone();
                cache
                    .get_or_build(&literal_key, &canonical_key, request.format.extension(), move |tmp_path| async move {
                        transformer.transform(&source_path, &tmp_path, &ctx).await
                    })
                    .await?
            }
            None => {
                let tmp = std::env::temp_dir().join(format!("iiirs-{}.{}", uuid::Uuid::new_v4(), request.format.extension()));
                self.transformer.transform(&source.path, &tmp, &ctx).await?;
                tmp
            }
        };

        let last_modified = tokio::fs::metadata(&path)
            .await
            .map_err(|e| IiifError::Image(e.to_string()))?
            .modified()
            .map_err(|e| IiifError::Image(e.to_string()))?;

        Ok(ImageOutcome::Image {
            path,
            content_type: request.format.mime_type(),
            last_modified,
            canonical_uri_tail: canonical_key,
        })
    }
}
