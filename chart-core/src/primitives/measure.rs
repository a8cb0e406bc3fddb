//! One bar of the chart.
//!
//! Only `index` and `meter` are persisted. The screen rect is assigned by
//! the layout pass ([MeasureLayout](crate::geometry::MeasureLayout)), and
//! begin/end times are assigned by [TimeMap](super::TimeMap). Both are
//! ignored by equality.
//!
//! Measures are generated eagerly and are never removed one by one.

use derivative::Derivative;
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

use super::RationalPosition;

#[derive(Debug, Clone, Derivative, Serialize, Deserialize)]
#[derivative(PartialEq)]
pub struct Measure {
    pub index: u32,
    /// Length of the measure as a fraction of a whole note (4/4, 7/8...).
    pub meter: RationalPosition,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub rect: Option<Rect>,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub begin_time: f64,
    #[serde(skip)]
    #[derivative(PartialEq = "ignore")]
    pub end_time: f64,
}
impl Measure {
    pub fn new(index: u32, meter: RationalPosition) -> Self {
        Self {
            index,
            meter,
            rect: None,
            begin_time: 0.0,
            end_time: 0.0,
        }
    }

    /// Build measures `0..count` sharing the same meter.
    ///
    /// # Example
    /// ```
    /// # use chart_core::primitives::{Measure, RationalPosition};
    /// let measures = Measure::generate(3, RationalPosition::new(4, 4));
    /// assert_eq!(measures.len(), 3);
    /// assert_eq!(measures[2].index, 2);
    /// ```
    pub fn generate(count: u32, meter: RationalPosition) -> Vec<Measure> {
        (0..count).map(|index| Measure::new(index, meter)).collect()
    }

    /// Length in whole notes.
    pub fn length(&self) -> f64 {
        self.meter.to01()
    }

    /// Screen y of the given sub-position, if the measure is laid out.
    ///
    /// Sub-position 0 lies on the bottom edge, 1 on the top edge.
    pub fn y_of(&self, sub_position: &RationalPosition) -> Option<f64> {
        let rect = self.rect?;
        Some(rect.y + rect.height * (1.0 - sub_position.to01()))
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.begin_time
    }
}

#[cfg(test)]
mod tests {
    use super::Measure;
    use crate::{geometry::Rect, primitives::RationalPosition};

    #[test]
    fn equality_ignores_layout() {
        let a = Measure::new(3, RationalPosition::new(7, 8));
        let mut b = a.clone();
        b.rect = Some(Rect::new(0.0, 0.0, 100.0, 50.0));
        b.begin_time = 3.0;
        assert_eq!(a, b);
        assert_ne!(a, Measure::new(3, RationalPosition::new(4, 4)));
    }

    #[test]
    fn y_of_sub_position() {
        let mut m = Measure::new(0, RationalPosition::new(4, 4));
        assert_eq!(m.y_of(&RationalPosition::zero()), None);
        m.rect = Some(Rect::new(10.0, 100.0, 50.0, 200.0));
        assert_eq!(m.y_of(&RationalPosition::zero()), Some(300.0));
        assert_eq!(m.y_of(&RationalPosition::new(1, 4)), Some(250.0));
        assert_eq!(m.y_of(&RationalPosition::new(1, 1)), Some(100.0));
    }

    #[test]
    fn persisted_fields_only() {
        let mut m = Measure::new(1, RationalPosition::new(3, 4));
        m.rect = Some(Rect::new(0.0, 0.0, 1.0, 1.0));
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"index":1,"meter":{"numerator":3,"denominator":4}}"#
        );
    }
}
