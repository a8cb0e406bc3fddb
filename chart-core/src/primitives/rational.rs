//! Exact sub-measure offsets.
//!
//! [RationalPosition] is never reduced on construction: a lane divided by 8
//! keeps `2/8` as `2/8`, because the denominator carries the grid the value
//! was placed on (see [LaneControlPoint](crate::geometry::LaneControlPoint)).
//! Arithmetic produces gcd-reduced results. It is computed over `i128`,
//! and a result that does not fit `i64` after reduction gives `0/1`.
//!
//! Denominator `0` is the explicit "none" sentinel. It never panics:
//! arithmetic on it short-circuits to `0/1`.
//!
//! # Example
//! ```
//! use chart_core::primitives::RationalPosition;
//!
//! let a = RationalPosition::new(2, 8);
//! let b = RationalPosition::new(1, 4);
//! assert_eq!(a, b);
//! assert_eq!(a.denominator, 8);
//! assert_eq!(a.add(&b), RationalPosition::new(1, 2));
//! assert_eq!(a.add(&RationalPosition::NONE), RationalPosition::zero());
//! assert!(!RationalPosition::equal(&RationalPosition::NONE, &RationalPosition::NONE));
//! assert_eq!(RationalPosition::NONE, RationalPosition::NONE);
//! ```

use std::{
    cmp::Ordering,
    fmt::Display,
    ops::{Add, Div, Mul},
};

use serde::{Deserialize, Serialize};

use super::{fraction_tools::gcd_wide, to_fraction};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RationalPosition {
    pub numerator: i64,
    pub denominator: i64,
}
impl RationalPosition {
    /// Position, that is not assigned yet.
    pub const NONE: RationalPosition = RationalPosition {
        numerator: 0,
        denominator: 0,
    };

    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
    pub fn zero() -> Self {
        Self::new(0, 1)
    }
    pub fn is_none(&self) -> bool {
        self.denominator == 0
    }
    /// True if denominator is positive: the only invariant persisted
    /// values have to satisfy.
    pub fn is_valid(&self) -> bool {
        self.denominator > 0
    }

    /// True for a valid value inside `[0, 1)`: an offset inside a measure.
    pub fn is_sub_position(&self) -> bool {
        self.is_valid() && self.numerator >= 0 && self.numerator < self.denominator
    }

    /// Real value of the fraction. The sentinel gives `0.0`.
    pub fn to01(&self) -> f64 {
        if self.is_none() {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    /// Cross-multiplied equality, so `1/2 == 2/4`.
    ///
    /// Always false if any of values is the sentinel.
    pub fn equal(a: &Self, b: &Self) -> bool {
        if a.is_none() || b.is_none() {
            return false;
        }
        a.numerator as i128 * b.denominator as i128
            == b.numerator as i128 * a.denominator as i128
    }

    /// Same value with gcd-reduced terms and positive denominator.
    pub fn reduced(&self) -> Self {
        if self.is_none() {
            return Self::NONE;
        }
        Self::from_wide(self.numerator as i128, self.denominator as i128)
    }

    /// Reduce widened terms and narrow them back.
    ///
    /// Terms, that are out of `i64` range after reduction, give `0/1`.
    fn from_wide(numerator: i128, denominator: i128) -> Self {
        let divisor = gcd_wide(numerator, denominator).max(1);
        let sign = denominator.signum();
        let narrowed = i128::try_from(divisor).ok().and_then(|divisor| {
            let numerator = (numerator / divisor).checked_mul(sign)?;
            let denominator = (denominator / divisor).checked_mul(sign)?;
            let numerator = i64::try_from(numerator).ok()?;
            let denominator = i64::try_from(denominator).ok()?;
            Some(Self::new(numerator, denominator))
        });
        match narrowed {
            Some(value) => value,
            None => {
                log::warn!(
                    "rational {}/{} does not fit i64, replaced by 0/1",
                    numerator,
                    denominator
                );
                Self::zero()
            }
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        if self.is_none() || other.is_none() {
            return Self::zero();
        }
        let (a, b) = (self.wide(), other.wide());
        match (a.0 * b.1).checked_add(b.0 * a.1) {
            Some(numerator) => Self::from_wide(numerator, a.1 * b.1),
            None => Self::zero(),
        }
    }
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_none() || other.is_none() {
            return Self::zero();
        }
        let (a, b) = (self.wide(), other.wide());
        Self::from_wide(a.0 * b.0, a.1 * b.1)
    }
    /// Division by zero-valued fraction gives `0/1` as well.
    pub fn div(&self, other: &Self) -> Self {
        if self.is_none() || other.is_none() || other.numerator == 0 {
            return Self::zero();
        }
        let (a, b) = (self.wide(), other.wide());
        Self::from_wide(a.0 * b.1, a.1 * b.0)
    }

    fn wide(&self) -> (i128, i128) {
        (self.numerator as i128, self.denominator as i128)
    }
}
impl Default for RationalPosition {
    fn default() -> Self {
        Self::zero()
    }
}
/// Value equality of [RationalPosition::equal], except that the sentinel
/// equals itself, so structures holding unset values stay comparable.
impl PartialEq for RationalPosition {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_none(), other.is_none()) {
            (true, true) => true,
            _ => Self::equal(self, other),
        }
    }
}
impl PartialOrd for RationalPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_none(), other.is_none()) {
            (true, true) => return Some(Ordering::Equal),
            (false, false) => (),
            _ => return None,
        }
        to_fraction(self).partial_cmp(&to_fraction(other))
    }
}
impl Add for RationalPosition {
    fn add(self, rhs: Self) -> Self::Output {
        RationalPosition::add(&self, &rhs)
    }
    type Output = Self;
}
impl Mul for RationalPosition {
    fn mul(self, rhs: Self) -> Self::Output {
        RationalPosition::mul(&self, &rhs)
    }
    type Output = Self;
}
impl Div for RationalPosition {
    fn div(self, rhs: Self) -> Self::Output {
        RationalPosition::div(&self, &rhs)
    }
    type Output = Self;
}
impl From<(i64, i64)> for RationalPosition {
    fn from((numerator, denominator): (i64, i64)) -> Self {
        Self::new(numerator, denominator)
    }
}
impl Display for RationalPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}
