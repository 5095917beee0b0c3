use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IiifError;

/// The `format` component of the `quality.format` path segment, and the
/// source codestream's own on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    Jpg,
    Png,
    Gif,
    Tif,
    Pdf,
    Jp2,
}

impl FromStr for Format {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpg" => Ok(Format::Jpg),
            "png" => Ok(Format::Png),
            "gif" => Ok(Format::Gif),
            "tif" => Ok(Format::Tif),
            "pdf" => Ok(Format::Pdf),
            "jp2" => Ok(Format::Jp2),
            _ => Err(IiifError::Format(format!("\"{s}\" is not a supported format"))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Tif => "tif",
            Format::Pdf => "pdf",
            Format::Jp2 => "jp2",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Jpg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
            Format::Tif => "image/tiff",
            Format::Pdf => "application/pdf",
            Format::Jp2 => "image/jp2",
        }
    }

    /// The `image` crate's encoder for this format, where one exists. `Pdf`
    /// and `Jp2` have no encoder in the dependency stack and are handled (or
    /// rejected) upstream in the transformer.
    pub fn image_crate_format(&self) -> Option<image::ImageFormat> {
        match self {
            Format::Jpg => Some(image::ImageFormat::Jpeg),
            Format::Png => Some(image::ImageFormat::Png),
            Format::Gif => Some(image::ImageFormat::Gif),
            Format::Tif => Some(image::ImageFormat::Tiff),
            Format::Pdf | Format::Jp2 => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_extension() {
        for f in [Format::Jpg, Format::Png, Format::Gif, Format::Tif, Format::Pdf, Format::Jp2] {
            assert_eq!(f.extension().parse::<Format>().unwrap(), f);
        }
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("bmp".parse::<Format>().is_err());
    }
}
