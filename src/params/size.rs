use std::str::FromStr;

use nom::{
    Finish, IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1},
    combinator::{all_consuming, map_res, recognize},
    sequence::{preceded, separated_pair},
};

use crate::error::IiifError;
use crate::params::region::NormalizedRegion;
use crate::rational::{self, Rational};

/// The `size` path segment of an image request, before it is resolved
/// against a region's pixel dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Size {
    Full,
    Percent(Rational),
    WidthOnly(u32),
    HeightOnly(u32),
    /// `!w,h` — best-fit inside a `w`x`h` box, preserving aspect ratio.
    BestFit { w: u32, h: u32 },
    /// `w,h` — stretched to exactly `w`x`h`, ignoring aspect ratio.
    Exact { w: u32, h: u32 },
}

/// Which axis to keep when a best-fit request's width and height disagree
/// about whether they're inside or outside the region's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredDimension {
    Width,
    Height,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSize {
    pub w: u32,
    pub h: u32,
    pub force_aspect: bool,
    pub canonical: String,
}

fn parse_decimal_literal(input: &str) -> IResult<&str, &str> {
    nom::branch::alt((recognize(digit1), recognize((digit0, char('.'), digit1)))).parse(input)
}

fn parse_uint_pair(input: &str) -> IResult<&str, (u32, u32)> {
    separated_pair(
        map_res(digit1, str::parse::<u32>),
        tag(","),
        map_res(digit1, str::parse::<u32>),
    )
    .parse(input)
}

impl FromStr for Size {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax_error = || IiifError::SizeSyntax(format!("Size syntax \"{s}\" is not valid"));

        if s == "full" {
            return Ok(Size::Full);
        }
        if let Some(rest) = s.strip_prefix("pct:") {
            let (_, digits) =
                all_consuming(parse_decimal_literal).parse(rest).finish().map_err(|_| syntax_error())?;
            return Ok(Size::Percent(rational::parse_decimal(digits)));
        }
        if let Some(rest) = s.strip_prefix('!') {
            let (_, (w, h)) = all_consuming(parse_uint_pair).parse(rest).finish().map_err(|_| syntax_error())?;
            return Ok(Size::BestFit { w, h });
        }
        if let Some(rest) = s.strip_suffix(',') {
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return Err(syntax_error());
            }
            return Ok(Size::WidthOnly(rest.parse().map_err(|_| syntax_error())?));
        }
        if let Some(rest) = s.strip_prefix(',') {
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return Err(syntax_error());
            }
            return Ok(Size::HeightOnly(rest.parse().map_err(|_| syntax_error())?));
        }
        let (_, (w, h)) = all_consuming(parse_uint_pair).parse(s).finish().map_err(|_| syntax_error())?;
        Ok(Size::Exact { w, h })
    }
}

impl Size {
    pub fn resolve(
        &self,
        region: &NormalizedRegion,
        preferred_dimension: PreferredDimension,
    ) -> Result<NormalizedSize, IiifError> {
        let region_w = region.pixel_w;
        let region_h = region.pixel_h;

        let (w, h, force_aspect, is_full) = match self {
            Size::Full => (region_w, region_h, false, true),
            Size::Percent(p) => {
                if p <= &rational::int(0) {
                    return Err(IiifError::SizeRequest(format!(
                        "Percentage supplied is less than 0 ({p})."
                    )));
                }
                let pct = p / rational::int(100);
                let w = rational::round_to_u32(&(&pct * rational::int(region_w)));
                let h = rational::round_to_u32(&(&pct * rational::int(region_h)));
                (w, h, false, false)
            }
            Size::WidthOnly(w) => {
                let reduce = rational::ratio(*w, region_w);
                let h = rational::round_to_u32(&(rational::int(region_h) * reduce));
                (*w, h, false, false)
            }
            Size::HeightOnly(h) => {
                let reduce = rational::ratio(*h, region_h);
                let w = rational::round_to_u32(&(rational::int(region_w) * reduce));
                (w, *h, false, false)
            }
            Size::BestFit { w: req_w, h: req_h } => {
                let w_fits = *req_w < region_w;
                let h_fits = *req_h < region_h;
                let keep_width = if w_fits == h_fits {
                    preferred_dimension == PreferredDimension::Width
                } else if *req_w > region_w {
                    false
                } else {
                    true
                };

                if keep_width {
                    let reduce = rational::ratio(*req_w, region_w);
                    let h = rational::round_to_u32(&(rational::int(region_h) * reduce));
                    (*req_w, h, false, false)
                } else {
                    let reduce = rational::ratio(*req_h, region_h);
                    let w = rational::round_to_u32(&(rational::int(region_w) * reduce));
                    (w, *req_h, false, false)
                }
            }
            Size::Exact { w, h } => (*w, *h, true, false),
        };

        if w == 0 || h == 0 {
            return Err(IiifError::SizeRequest(
                "Width and height must both be positive numbers".to_string(),
            ));
        }

        let canonical = if is_full { "full".to_string() } else { format!("{w},{h}") };

        Ok(NormalizedSize { w, h, force_aspect, canonical })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::region::Region;

    fn region(w: u32, h: u32) -> NormalizedRegion {
        Region::Full.normalize(w, h).unwrap()
    }

    #[test]
    fn parses_all_grammar_shapes() {
        assert_eq!("full".parse::<Size>().unwrap(), Size::Full);
        assert_eq!("150,".parse::<Size>().unwrap(), Size::WidthOnly(150));
        assert_eq!(",150".parse::<Size>().unwrap(), Size::HeightOnly(150));
        assert_eq!("!150,200".parse::<Size>().unwrap(), Size::BestFit { w: 150, h: 200 });
        assert_eq!("150,200".parse::<Size>().unwrap(), Size::Exact { w: 150, h: 200 });
        assert_eq!("pct:50".parse::<Size>().unwrap(), Size::Percent(rational::int(50)));
    }

    #[test]
    fn rejects_malformed_size() {
        assert!("banana".parse::<Size>().is_err());
        assert!(",".parse::<Size>().is_err());
    }

    #[test]
    fn width_only_preserves_aspect_ratio() {
        let size = Size::WidthOnly(500);
        let n = size.resolve(&region(1000, 2000), PreferredDimension::Width).unwrap();
        assert_eq!((n.w, n.h), (500, 1000));
        assert!(!n.force_aspect);
    }

    #[test]
    fn exact_size_forces_aspect() {
        let size = Size::Exact { w: 50, h: 50 };
        let n = size.resolve(&region(1000, 2000), PreferredDimension::Width).unwrap();
        assert_eq!((n.w, n.h), (50, 50));
        assert!(n.force_aspect);
    }

    #[test]
    fn best_fit_keeps_the_axis_that_is_out_of_bounds() {
        // requested width exceeds the region's width, so height should be kept.
        let size = Size::BestFit { w: 5000, h: 500 };
        let n = size.resolve(&region(1000, 1000), PreferredDimension::Width).unwrap();
        assert_eq!(n.h, 500);
        assert_eq!(n.w, 500);
    }

    #[test]
    fn zero_size_is_a_request_error() {
        let size = Size::Percent(rational::int(0));
        assert!(matches!(
            size.resolve(&region(1000, 1000), PreferredDimension::Width),
            Err(IiifError::SizeRequest(_))
        ));
    }
}
