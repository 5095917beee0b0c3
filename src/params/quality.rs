use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IiifError;

/// The `quality` component of the `quality.format` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Default,
    Color,
    Gray,
    Bitonal,
}

impl FromStr for Quality {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Quality::Default),
            "color" => Ok(Quality::Color),
            "gray" => Ok(Quality::Gray),
            "bitonal" => Ok(Quality::Bitonal),
            _ => Err(IiifError::Quality(format!("\"{s}\" is not a supported image quality"))),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Quality::Default => "default",
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display() {
        for q in [Quality::Default, Quality::Color, Quality::Gray, Quality::Bitonal] {
            assert_eq!(q.to_string().parse::<Quality>().unwrap(), q);
        }
    }

    #[test]
    fn rejects_unknown_quality() {
        assert!("sepia".parse::<Quality>().is_err());
    }
}
