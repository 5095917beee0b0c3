//! The transformation pipeline: turn a source codestream plus a resolved
//! request into target-format bytes.
//!
//! Decode happens out of process (a JPEG 2000 decoder binary is invoked with
//! a structured argv, never a shell string); the final resize, rotation and
//! quality operator, and encode all happen in-process via the `image` crate,
//! generalized from `image_ops.rs`'s `crop_image`/`resize_image`/`rotate_image`.

use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use image::DynamicImage;

use crate::error::IiifError;
use crate::info::ImageInfo;
use crate::params::{Format, ImageRequest, Quality, ResolvedRequest};

/// Everything the transformer needs besides the source path and the output
/// destination.
pub struct TransformContext<'a> {
    pub request: &'a ImageRequest,
    pub resolved: &'a ResolvedRequest,
    pub info: &'a ImageInfo,
}

#[derive(Debug, Clone)]
pub enum Transformer {
    Jp2(Jp2Transformer),
}

impl Transformer {
    pub fn target_formats(&self) -> &[Format] {
        match self {
            Transformer::Jp2(t) => &t.target_formats,
        }
    }

    pub async fn transform(&self, source_path: &Path, target_path: &Path, ctx: &TransformContext<'_>) -> Result<(), IiifError> {
        match self {
            Transformer::Jp2(t) => t.transform(source_path, target_path, ctx).await,
        }
    }
}

/// Invokes an external JPEG 2000 decoder to produce a raster at a chosen
/// reduce level, then applies the final resize/rotate/quality operator and
/// encodes to the target format in-process.
#[derive(Debug, Clone)]
pub struct Jp2Transformer {
    pub decoder_path: PathBuf,
    pub target_formats: Vec<Format>,
}

impl Jp2Transformer {
    pub fn new(decoder_path: impl Into<PathBuf>) -> Self {
        Jp2Transformer {
            decoder_path: decoder_path.into(),
            target_formats: vec![Format::Jpg, Format::Png, Format::Gif, Format::Tif],
        }
    }

    /// The largest reduce level in `[0, levels - 1]` for which the decoded
    /// region still covers the requested output size without upscaling.
    fn select_reduce_level(&self, decomposition_levels: u8, region_w: u32, region_h: u32, out_w: u32, out_h: u32) -> u8 {
        for level in (0..decomposition_levels).rev() {
            let scale = 1u32 << level;
            if region_w / scale >= out_w && region_h / scale >= out_h {
                return level;
            }
        }
        0
    }

    async fn transform(&self, source_path: &Path, target_path: &Path, ctx: &TransformContext<'_>) -> Result<(), IiifError> {
        let region = &ctx.resolved.region;
        let size = &ctx.resolved.size;

        let reduce = self.select_reduce_level(ctx.info.scale_factors.len().saturating_sub(1) as u8, region.pixel_w, region.pixel_h, size.w, size.h);

        let raster_path = std::env::temp_dir().join(format!("iiirs-raster-{}.pnm", uuid::Uuid::new_v4()));

        let args: Vec<OsString> = vec![
            "-i".into(),
            source_path.as_os_str().to_os_string(),
            "-o".into(),
            raster_path.as_os_str().to_os_string(),
            "-r".into(),
            reduce.to_string().into(),
            "-d".into(),
            format!("{},{},{},{}", region.decimal_y, region.decimal_x, region.decimal_h, region.decimal_w).into(),
        ];

        tracing::debug!(decoder = %self.decoder_path.display(), reduce, "invoking JPEG 2000 decoder");

        let status = tokio::process::Command::new(&self.decoder_path)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| IiifError::Image(format!("failed to launch decoder: {e}")))?;

        if !status.success() {
            let _ = tokio::fs::remove_file(&raster_path).await;
            return Err(IiifError::Image(format!("decoder exited with status {status}")));
        }

        let result = self.finish(&raster_path, target_path, ctx);
        let _ = tokio::fs::remove_file(&raster_path).await;
        result
    }

    fn finish(&self, raster_path: &Path, target_path: &Path, ctx: &TransformContext<'_>) -> Result<(), IiifError> {
        let mut image = image::open(raster_path).map_err(|e| IiifError::Image(e.to_string()))?;

        if ctx.resolved.rotation != 0 {
            image = rotate_by(image, ctx.resolved.rotation);
        }

        image = image.resize_exact(ctx.resolved.size.w, ctx.resolved.size.h, image::imageops::FilterType::Triangle);
        image = apply_quality(image, ctx.request.quality);

        let tmp_target = target_path.with_extension(format!("{}.tmp", ctx.request.format));
        {
            let file = std::fs::File::create(&tmp_target).map_err(|e| IiifError::Image(e.to_string()))?;
            let mut writer = BufWriter::new(file);
            encode(&image, &mut writer, ctx.request.format)?;
            writer.flush().map_err(|e| IiifError::Image(e.to_string()))?;
        }
        std::fs::rename(&tmp_target, target_path).map_err(|e| IiifError::Image(e.to_string()))?;
        Ok(())
    }
}

fn rotate_by(image: DynamicImage, degrees: u16) -> DynamicImage {
    match degrees % 360 {
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        _ => image,
    }
}

fn apply_quality(image: DynamicImage, quality: Quality) -> DynamicImage {
    match quality {
        Quality::Default | Quality::Color => image,
        Quality::Gray => DynamicImage::ImageLuma8(image.to_luma8()),
        Quality::Bitonal => {
            let mut gray = image.to_luma8();
            for pixel in gray.pixels_mut() {
                pixel[0] = if pixel[0] >= 128 { 255 } else { 0 };
            }
            DynamicImage::ImageLuma8(gray)
        }
    }
}

fn encode(image: &DynamicImage, writer: &mut (impl Write + std::io::Seek), format: Format) -> Result<(), IiifError> {
    let codec = format
        .image_crate_format()
        .ok_or_else(|| IiifError::Format(format!("\"{format}\" is not a supported output format")))?;
    image.write_to(writer, codec).map_err(|e| IiifError::Image(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_level_never_exceeds_the_image_pyramid() {
        let t = Jp2Transformer::new("/usr/bin/opj_decompress");
        let level = t.select_reduce_level(5, 4000, 3000, 500, 375);
        assert!(level <= 5);
    }

    #[test]
    fn reduce_level_is_zero_when_the_requested_size_exceeds_the_region() {
        let t = Jp2Transformer::new("/usr/bin/opj_decompress");
        assert_eq!(t.select_reduce_level(5, 100, 100, 500, 500), 0);
    }

    #[test]
    fn reduce_level_picks_the_coarsest_resolution_that_still_covers_the_output() {
        let t = Jp2Transformer::new("/usr/bin/opj_decompress");
        // 4000x3000 region, requesting 500x375: level 3 gives 500x375 exactly.
        assert_eq!(t.select_reduce_level(5, 4000, 3000, 500, 375), 3);
    }

    #[test]
    fn bitonal_quality_only_produces_black_or_white_pixels() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 4, image::Rgb([100, 150, 200])));
        let out = apply_quality(img, Quality::Bitonal);
        let luma = out.to_luma8();
        assert!(luma.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn default_jp2_transformer_does_not_advertise_pdf_or_jp2_output() {
        let t = Jp2Transformer::new("/usr/bin/opj_decompress");
        assert!(!t.target_formats.contains(&Format::Pdf));
        assert!(!t.target_formats.contains(&Format::Jp2));
    }
}
