//! Arbitrary-precision rational arithmetic for region/size math.
//!
//! Region and size coordinates are stored both as pixel integers and as
//! decimal fractions of the source dimensions. Native `f32`/`f64` cannot
//! represent those fractions exactly (e.g. `1/3`), so every fraction here is
//! an exact `BigInt`-backed ratio instead.

use num_bigint::BigInt;
use num_rational::Ratio;
use num_traits::ToPrimitive;

pub type Rational = Ratio<BigInt>;

pub fn int(n: u32) -> Rational {
    Rational::from_integer(BigInt::from(n))
}

pub fn ratio(numerator: u32, denominator: u32) -> Rational {
    Rational::new(BigInt::from(numerator), BigInt::from(denominator))
}

/// Parses an unsigned decimal literal (`"12"`, `"12.5"`, `".5"`) into an exact
/// `Rational`. The caller is expected to have already validated the shape of
/// `s` (digits, at most one `.`); this never fails on that input.
pub fn parse_decimal(s: &str) -> Rational {
    match s.split_once('.') {
        None => Rational::from_integer(s.parse::<BigInt>().expect("validated digit string")),
        Some((whole, frac)) => {
            let whole = if whole.is_empty() { "0" } else { whole };
            let digits = format!("{whole}{frac}");
            let numerator: BigInt = digits.parse().expect("validated digit string");
            let denominator = BigInt::from(10u32).pow(frac.len() as u32);
            Rational::new(numerator, denominator)
        }
    }
}

/// Rounds a non-negative rational to the nearest integer (half away from zero).
pub fn round_to_u32(r: &Rational) -> u32 {
    let half = Rational::new(BigInt::from(1), BigInt::from(2));
    (r + half).to_integer().to_u32().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_literals() {
        assert_eq!(parse_decimal("20"), int(20));
        assert_eq!(parse_decimal("20.5"), ratio(41, 2));
        assert_eq!(parse_decimal(".25"), ratio(1, 4));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to_u32(&ratio(1, 2)), 1);
        assert_eq!(round_to_u32(&ratio(3, 2)), 2);
        assert_eq!(round_to_u32(&int(7)), 7);
    }

    #[test]
    fn division_stays_exact_for_repeating_fractions() {
        let third = ratio(1, 3);
        assert_eq!(&third + &third + &third, int(1));
    }
}
