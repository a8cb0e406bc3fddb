//! Musical positions: measure index plus exact offset inside the measure.
//!
//! Every positioned entity of a chart (tempo markers, lane control points,
//! notes) exposes its position through [HasPosition], so they all share one
//! ordering: `measure_index + sub_position.to01()`, ascending.
//!
//! # Example
//!
//! ```
//! use chart_core::primitives::{MusicalPosition, RationalPosition};
//!
//! let a = MusicalPosition::new(2, RationalPosition::new(1, 4));
//! let b = MusicalPosition::new(2, RationalPosition::new(2, 8));
//! let c = MusicalPosition::new(3, RationalPosition::zero());
//! assert_eq!(a.value(), 2.25);
//! assert_eq!(a, b);
//! assert!(a < c);
//! ```

use std::cmp::Ordering;

use fraction::Fraction;

use super::{to_fraction, RationalPosition};

#[derive(Debug, Clone, Copy)]
pub struct MusicalPosition {
    pub measure_index: u32,
    /// distance from the start of the measure, as fraction of the measure.
    pub sub_position: RationalPosition,
}
impl MusicalPosition {
    pub fn new(measure_index: u32, sub_position: RationalPosition) -> Self {
        Self {
            measure_index,
            sub_position,
        }
    }
    pub fn measure_start(measure_index: u32) -> Self {
        Self::new(measure_index, RationalPosition::zero())
    }

    /// Continuous position, used by time and geometry calculations.
    pub fn value(&self) -> f64 {
        self.measure_index as f64 + self.sub_position.to01()
    }

    /// The same value as [MusicalPosition::value], but exact.
    pub fn exact(&self) -> Fraction {
        Fraction::new(self.measure_index as u64, 1_u64)
            + to_fraction(&self.sub_position)
    }

    /// Total order, used for sorting of all positioned entities.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.exact()
            .partial_cmp(&other.exact())
            .unwrap_or_else(|| self.value().total_cmp(&other.value()))
    }
}
impl PartialEq for MusicalPosition {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl PartialOrd for MusicalPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

/// Unifies access to position of everything placed on the chart.
pub trait HasPosition {
    fn position(&self) -> MusicalPosition;
}
impl HasPosition for MusicalPosition {
    fn position(&self) -> MusicalPosition {
        *self
    }
}
impl<T: HasPosition> HasPosition for &T {
    fn position(&self) -> MusicalPosition {
        (*self).position()
    }
}

/// Stable sort of positioned entities, ascending.
pub fn sort_by_position<T: HasPosition>(items: &mut [T]) {
    items.sort_by(|a, b| a.position().compare(&b.position()));
}

#[cfg(test)]
mod tests {
    use super::{sort_by_position, MusicalPosition};
    use crate::primitives::RationalPosition;

    #[test]
    fn value_and_order() {
        let a = MusicalPosition::new(0, RationalPosition::new(3, 4));
        let b = MusicalPosition::measure_start(1);
        assert_eq!(a.value(), 0.75);
        assert!(a < b);
        // sub-position of a full measure reaches the next barline
        let full = MusicalPosition::new(0, RationalPosition::new(4, 4));
        assert_eq!(full, b);
    }

    #[test]
    fn sorting_is_stable() {
        let mut positions = vec![
            MusicalPosition::new(2, RationalPosition::new(1, 2)),
            MusicalPosition::new(0, RationalPosition::new(1, 3)),
            MusicalPosition::new(2, RationalPosition::new(1, 4)),
            MusicalPosition::new(0, RationalPosition::new(2, 6)),
        ];
        sort_by_position(&mut positions);
        let values: Vec<(u32, i64, i64)> = positions
            .iter()
            .map(|p| {
                (
                    p.measure_index,
                    p.sub_position.numerator,
                    p.sub_position.denominator,
                )
            })
            .collect();
        assert_eq!(
            values,
            vec![(0, 1, 3), (0, 2, 6), (2, 1, 4), (2, 1, 2)]
        );
    }
}
