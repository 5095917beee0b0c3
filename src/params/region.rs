use std::str::FromStr;

use nom::{
    Finish, IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1},
    combinator::{all_consuming, map_res, recognize},
    sequence::preceded,
};

use crate::error::IiifError;
use crate::rational::{self, Rational};

/// The `region` path segment of an image request, before it is resolved
/// against a source image's dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Full,
    Percent { x: Rational, y: Rational, w: Rational, h: Rational },
    Pixel { x: u32, y: u32, w: u32, h: u32 },
}

/// `Region` resolved against a source image's width/height: clamped to the
/// image bounds, with both pixel and exact-decimal coordinates available.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRegion {
    pub pixel_x: u32,
    pub pixel_y: u32,
    pub pixel_w: u32,
    pub pixel_h: u32,
    pub decimal_x: Rational,
    pub decimal_y: Rational,
    pub decimal_w: Rational,
    pub decimal_h: Rational,
    pub canonical: String,
}

fn parse_decimal_literal(input: &str) -> IResult<&str, &str> {
    alt((recognize(digit1), recognize((digit0, char('.'), digit1)))).parse(input)
}

fn parse_rational_quad(input: &str) -> IResult<&str, (Rational, Rational, Rational, Rational)> {
    let num = map_res(parse_decimal_literal, |s: &str| -> Result<Rational, ()> {
        Ok(rational::parse_decimal(s))
    });
    let mut parser = (
        num.clone(),
        preceded(tag(","), num.clone()),
        preceded(tag(","), num.clone()),
        preceded(tag(","), num),
    );
    parser.parse(input)
}

fn parse_uint_quad(input: &str) -> IResult<&str, (u32, u32, u32, u32)> {
    let num = map_res(digit1, str::parse::<u32>);
    let mut parser = (
        num,
        preceded(tag(","), num),
        preceded(tag(","), num),
        preceded(tag(","), num),
    );
    parser.parse(input)
}

impl FromStr for Region {
    type Err = IiifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax_error = || IiifError::RegionSyntax(format!("Region syntax \"{s}\" is not valid"));

        if s == "full" {
            return Ok(Region::Full);
        }
        if let Some(rest) = s.strip_prefix("pct:") {
            let (_, (x, y, w, h)) = all_consuming(parse_rational_quad)
                .parse(rest)
                .finish()
                .map_err(|_| syntax_error())?;
            return Ok(Region::Percent { x, y, w, h });
        }
        let (_, (x, y, w, h)) = all_consuming(parse_uint_quad)
            .parse(s)
            .finish()
            .map_err(|_| syntax_error())?;
        Ok(Region::Pixel { x, y, w, h })
    }
}

impl Region {
    /// Resolves this region against a source image's pixel dimensions,
    /// clamping any out-of-bounds width/height and producing the canonical
    /// `x,y,w,h` form.
    pub fn normalize(&self, width: u32, height: u32) -> Result<NormalizedRegion, IiifError> {
        let one = rational::int(1);

        let (mut pixel_x, mut pixel_y, mut pixel_w, mut pixel_h, mut decimal_x, mut decimal_y, mut decimal_w, mut decimal_h);

        match self {
            Region::Full => {
                return Ok(NormalizedRegion {
                    pixel_x: 0,
                    pixel_y: 0,
                    pixel_w: width,
                    pixel_h: height,
                    decimal_x: rational::int(0),
                    decimal_y: rational::int(0),
                    decimal_w: one.clone(),
                    decimal_h: one,
                    canonical: "full".to_string(),
                });
            }
            Region::Percent { x, y, w, h } => {
                let hundred = rational::int(100);
                if x > &hundred || y > &hundred || w > &hundred || h > &hundred {
                    return Err(IiifError::RegionRequest(
                        "Region percentages must be less than or equal to 100.".to_string(),
                    ));
                }
                if w <= &rational::int(0) || h <= &rational::int(0) {
                    return Err(IiifError::RegionRequest(
                        "Width and Height Percentages must be greater than 0.".to_string(),
                    ));
                }
                decimal_x = x / &hundred;
                decimal_y = y / &hundred;
                decimal_w = w / &hundred;
                decimal_h = h / &hundred;
                pixel_x = rational::round_to_u32(&(&decimal_x * rational::int(width)));
                pixel_y = rational::round_to_u32(&(&decimal_y * rational::int(height)));
                pixel_w = rational::round_to_u32(&(&decimal_w * rational::int(width)));
                pixel_h = rational::round_to_u32(&(&decimal_h * rational::int(height)));
            }
            Region::Pixel { x, y, w, h } => {
                if *w == 0 || *h == 0 {
                    return Err(IiifError::RegionRequest(
                        "Width and height must be greater than 0".to_string(),
                    ));
                }
                pixel_x = *x;
                pixel_y = *y;
                pixel_w = *w;
                pixel_h = *h;
                decimal_x = rational::ratio(*x, width);
                decimal_y = rational::ratio(*y, height);
                decimal_w = rational::ratio(*w, width);
                decimal_h = rational::ratio(*h, height);
            }
        }

        if &decimal_x + &decimal_w > one {
            decimal_w = &one - &decimal_x;
            pixel_w = width.saturating_sub(pixel_x);
        }
        if &decimal_y + &decimal_h > one {
            decimal_h = &one - &decimal_y;
            pixel_h = height.saturating_sub(pixel_y);
        }

        if decimal_x >= one {
            return Err(IiifError::RegionRequest(format!(
                "Region x parameter is greater than the width of the image.\nImage width is {width}"
            )));
        }
        if decimal_y >= one {
            return Err(IiifError::RegionRequest(format!(
                "Region y parameter is greater than the height of the image.\nImage height is {height}"
            )));
        }

        Ok(NormalizedRegion {
            pixel_x,
            pixel_y,
            pixel_w,
            pixel_h,
            decimal_x,
            decimal_y,
            decimal_w,
            decimal_h,
            canonical: format!("{pixel_x},{pixel_y},{pixel_w},{pixel_h}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full() {
        assert_eq!("full".parse::<Region>().unwrap(), Region::Full);
    }

    #[test]
    fn parses_pixel_quad() {
        assert_eq!(
            "10,20,300,400".parse::<Region>().unwrap(),
            Region::Pixel { x: 10, y: 20, w: 300, h: 400 }
        );
    }

    #[test]
    fn rejects_malformed_region() {
        assert!("nonsense".parse::<Region>().is_err());
        assert!("10,20,300".parse::<Region>().is_err());
    }

    #[test]
    fn full_normalizes_to_whole_image() {
        let n = Region::Full.normalize(1000, 2000).unwrap();
        assert_eq!(n.canonical, "full");
        assert_eq!((n.pixel_w, n.pixel_h), (1000, 2000));
    }

    #[test]
    fn pixel_region_clamps_to_image_bounds() {
        let region = Region::Pixel { x: 900, y: 0, w: 500, h: 100 };
        let n = region.normalize(1000, 1000).unwrap();
        assert_eq!(n.pixel_w, 100);
        assert_eq!(n.canonical, "900,0,100,100");
    }

    #[test]
    fn region_x_beyond_image_width_is_a_request_error() {
        let region = Region::Pixel { x: 1000, y: 0, w: 10, h: 10 };
        assert!(matches!(
            region.normalize(1000, 1000),
            Err(IiifError::RegionRequest(_))
        ));
    }

    #[test]
    fn percent_region_over_100_is_rejected() {
        let region = Region::Percent {
            x: rational::int(0),
            y: rational::int(0),
            w: rational::int(101),
            h: rational::int(10),
        };
        assert!(matches!(
            region.normalize(1000, 1000),
            Err(IiifError::RegionRequest(_))
        ));
    }

    #[test]
    fn percent_region_converts_exactly() {
        let region = Region::Percent {
            x: rational::int(0),
            y: rational::int(0),
            w: rational::int(50),
            h: rational::int(50),
        };
        let n = region.normalize(1000, 1000).unwrap();
        assert_eq!((n.pixel_w, n.pixel_h), (500, 500));
    }
}
