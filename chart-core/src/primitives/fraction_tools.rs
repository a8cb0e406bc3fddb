//! Tools for exact work with rational positions.

use fraction::Fraction;

use super::RationalPosition;

/// Greatest common divisor, always non-negative.
///
/// Unsigned, so `gcd(i64::MIN, 0)` is representable.
pub fn gcd(a: i64, b: i64) -> u64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// [gcd] over the widened terms of rational arithmetic.
pub(crate) fn gcd_wide(a: i128, b: i128) -> u128 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Exact conversion of a rational position to [Fraction].
///
/// The "none" sentinel is converted to zero.
///
/// # Example
/// ```
/// # use chart_core::primitives::{RationalPosition, to_fraction};
/// # use fraction::Fraction;
/// assert_eq!(
///     to_fraction(&RationalPosition::new(2, 8)),
///     Fraction::new(1u64, 4u64)
/// );
/// assert_eq!(to_fraction(&RationalPosition::NONE), Fraction::new(0u64, 1u64));
/// ```
pub fn to_fraction(value: &RationalPosition) -> Fraction {
    if value.is_none() {
        return Fraction::new(0_u64, 1_u64);
    }
    let (num, den) = (value.numerator, value.denominator);
    let abs = Fraction::new(num.unsigned_abs(), den.unsigned_abs());
    match (num < 0) != (den < 0) && num != 0 {
        true => -abs,
        false => abs,
    }
}

/// Snap (floor) a value in `[0, 1)` to the grid of `1 / division`.
///
/// Values outside the range are clamped to the first or the last cell.
/// Zero division gives the "none" sentinel.
///
/// # Example
/// ```
/// # use chart_core::primitives::{RationalPosition, quantize};
/// assert_eq!(quantize(0.30, 4), RationalPosition::new(1, 4));
/// assert_eq!(quantize(0.99, 3), RationalPosition::new(2, 3));
/// assert_eq!(quantize(-0.5, 8), RationalPosition::new(0, 8));
/// ```
pub fn quantize(value: f64, division: u32) -> RationalPosition {
    if division == 0 {
        return RationalPosition::NONE;
    }
    let cell = (value * division as f64).floor();
    let cell = cell.clamp(0.0, (division - 1) as f64) as i64;
    RationalPosition::new(cell, division as i64)
}
