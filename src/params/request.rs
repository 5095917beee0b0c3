use crate::error::IiifError;
use crate::info::ImageInfo;
use crate::params::format::Format;
use crate::params::quality::Quality;
use crate::params::region::{NormalizedRegion, Region};
use crate::params::rotation::Rotation;
use crate::params::size::{NormalizedSize, PreferredDimension, Size};

/// An unresolved image request: everything parsed straight out of the five
/// path segments, with no knowledge yet of the source image's dimensions.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub identifier: String,
    pub region: Region,
    pub region_raw: String,
    pub size: Size,
    pub size_raw: String,
    pub rotation: Rotation,
    pub quality: Quality,
    pub format: Format,
}

/// An `ImageRequest` resolved against a source image's `ImageInfo`.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub region: NormalizedRegion,
    pub size: NormalizedSize,
    pub rotation: u16,
}

impl ImageRequest {
    pub fn parse(
        identifier: &str,
        region: &str,
        size: &str,
        rotation: &str,
        quality_dot_format: &str,
    ) -> Result<Self, IiifError> {
        let (quality_str, format_str) = quality_dot_format.rsplit_once('.').ok_or_else(|| {
            IiifError::Format(format!("\"{quality_dot_format}\" does not have the form quality.format"))
        })?;

        Ok(ImageRequest {
            identifier: identifier.to_string(),
            region: region.parse()?,
            region_raw: region.to_string(),
            size: size.parse()?,
            size_raw: size.to_string(),
            rotation: rotation.parse()?,
            quality: quality_str.parse()?,
            format: format_str.parse()?,
        })
    }

    pub fn resolve(&self, info: &ImageInfo) -> Result<ResolvedRequest, IiifError> {
        let region = self.region.normalize(info.width, info.height)?;
        let size = self.size.resolve(&region, PreferredDimension::Width)?;
        let rotation: u16 = self.rotation.canonical().parse().expect("canonical rotation is a u16");
        Ok(ResolvedRequest { region, size, rotation })
    }

    /// The as-requested path, `identifier/region/size/rotation/quality.format`.
    pub fn literal_path(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            self.identifier, self.region_raw, self.size_raw, self.rotation.0, self.quality, self.format
        )
    }

    /// The normalized path with every component in its canonical form.
    pub fn canonical_path(&self, resolved: &ResolvedRequest) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            self.identifier, resolved.region.canonical, resolved.size.canonical, resolved.rotation, self.quality, self.format
        )
    }

    pub fn is_canonical(&self, resolved: &ResolvedRequest) -> bool {
        self.region_raw == resolved.region.canonical
            && self.size_raw == resolved.size.canonical
            && self.rotation.0.to_string() == resolved.rotation.to_string()
    }
}
