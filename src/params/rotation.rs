use std::str::FromStr;

use crate::error::IiifError;

/// The `rotation` path segment: an integer number of degrees in `[0, 360]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation(pub u16);

impl FromStr for Rotation {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IiifError::RotationSyntax(format!(
                "Rotation argument \"{s}\" is not a number"
            )));
        }
        let n: u32 = s
            .parse()
            .map_err(|_| IiifError::RotationSyntax(format!("Rotation argument \"{s}\" is not a number")))?;
        if n > 360 {
            return Err(IiifError::RotationSyntax(format!(
                "Rotation argument \"{s}\" is not between 0 and 360"
            )));
        }
        Ok(Rotation(n as u16))
    }
}

impl Rotation {
    /// Snaps to the nearest multiple of 90, rounding ties away from zero.
    pub fn snap90(&self) -> u16 {
        let n = self.0 as f64;
        (90.0 * (n / 90.0).round()) as u16
    }

    /// Canonical form: `snap90`, with `360` folded into `0`.
    pub fn canonical(&self) -> String {
        match self.snap90() {
            360 => "0".to_string(),
            n => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_range_values() {
        assert_eq!("0".parse::<Rotation>().unwrap(), Rotation(0));
        assert_eq!("360".parse::<Rotation>().unwrap(), Rotation(360));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range() {
        assert!("flip".parse::<Rotation>().is_err());
        assert!("-180".parse::<Rotation>().is_err());
        assert!("361".parse::<Rotation>().is_err());
    }

    #[test]
    fn snaps_to_nearest_90() {
        assert_eq!(Rotation(25).snap90(), 0);
        assert_eq!(Rotation(91).snap90(), 90);
        assert_eq!(Rotation(315).snap90(), 360);
    }

    #[test]
    fn canonical_folds_360_into_0() {
        assert_eq!(Rotation(360).canonical(), "0");
        assert_eq!(Rotation(315).canonical(), "0");
        assert_eq!(Rotation(180).canonical(), "180");
    }

    #[test]
    fn snap90_never_moves_more_than_45_degrees() {
        for n in 0..=360u16 {
            let snapped = Rotation(n).snap90();
            assert!(snapped.abs_diff(n) <= 45);
            assert!(matches!(snapped, 0 | 90 | 180 | 270 | 360));
        }
    }
}
