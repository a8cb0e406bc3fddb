//! Lanes and their control points.
//!
//! A lane is an ordered ribbon of control points. Each point anchors the
//! lane's horizontal offset and width at one musical position. Between two
//! consecutive points the lane is interpolated linearly.

use serde::{Deserialize, Serialize};

use crate::primitives::{HasPosition, MusicalPosition, RationalPosition};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct LaneId(pub u64);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ControlPointId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneControlPoint {
    pub id: ControlPointId,
    pub lane_id: LaneId,
    pub measure_index: u32,
    /// vertical offset inside the measure.
    pub measure_position: RationalPosition,
    /// left edge, as fraction of measure width.
    pub horizontal_position: RationalPosition,
    /// width in cells of `horizontal_position.denominator`.
    pub horizontal_size: f64,
}
impl LaneControlPoint {
    /// Left edge of the lane as fraction of the measure width.
    pub fn horizontal_fraction(&self) -> f64 {
        self.horizontal_position.to01()
    }

    /// Width of the lane as fraction of the measure width.
    ///
    /// Uses the denominator as it is stored, not reduced: size 2 at 1/4
    /// and size 2 at 2/8 are lanes of different width.
    ///
    /// # Example
    /// ```
    /// # use chart_core::geometry::{ControlPointId, LaneControlPoint, LaneId};
    /// # use chart_core::primitives::RationalPosition;
    /// let point = LaneControlPoint {
    ///     id: ControlPointId(1),
    ///     lane_id: LaneId(1),
    ///     measure_index: 0,
    ///     measure_position: RationalPosition::zero(),
    ///     horizontal_position: RationalPosition::new(2, 8),
    ///     horizontal_size: 2.0,
    /// };
    /// assert_eq!(point.width_fraction(), 0.25);
    /// ```
    pub fn width_fraction(&self) -> f64 {
        match self.horizontal_position.is_none() {
            true => 0.0,
            false => {
                self.horizontal_size
                    / self.horizontal_position.denominator as f64
            }
        }
    }
}
impl HasPosition for LaneControlPoint {
    fn position(&self) -> MusicalPosition {
        MusicalPosition::new(self.measure_index, self.measure_position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub id: LaneId,
    /// Always sorted by musical position of the points.
    pub control_point_ids: Vec<ControlPointId>,
    /// Horizontal subdivision count of the lane: notes snap to it.
    pub division: u32,
}
impl Lane {
    pub fn new(id: LaneId, division: u32) -> Self {
        Self {
            id,
            control_point_ids: Vec::new(),
            division,
        }
    }

    /// Insert point id, keeping ids sorted by position.
    ///
    /// `position_of` resolves position of already inserted points. Points
    /// at equal position are kept in insertion order.
    pub fn insert_control_point(
        &mut self,
        point: &LaneControlPoint,
        position_of: impl Fn(ControlPointId) -> Option<MusicalPosition>,
    ) {
        let position = point.position();
        let idx = self.control_point_ids.partition_point(|id| {
            position_of(*id)
                .map(|other| other <= position)
                .unwrap_or(true)
        });
        self.control_point_ids.insert(idx, point.id);
    }

    pub fn remove_control_point(&mut self, id: ControlPointId) -> bool {
        let before = self.control_point_ids.len();
        self.control_point_ids.retain(|other| *other != id);
        before != self.control_point_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ControlPointId, Lane, LaneControlPoint, LaneId};
    use crate::primitives::{HasPosition, RationalPosition};

    fn point(id: u64, measure: u32, sub: (i64, i64)) -> LaneControlPoint {
        LaneControlPoint {
            id: ControlPointId(id),
            lane_id: LaneId(0),
            measure_index: measure,
            measure_position: sub.into(),
            horizontal_position: RationalPosition::new(0, 4),
            horizontal_size: 4.0,
        }
    }

    #[test]
    fn insertion_keeps_order() {
        let mut lane = Lane::new(LaneId(0), 4);
        let mut points = HashMap::new();
        for p in [
            point(1, 2, (0, 1)),
            point(2, 0, (0, 1)),
            point(3, 1, (1, 2)),
            point(4, 1, (2, 4)),
            point(5, 5, (0, 1)),
        ] {
            lane.insert_control_point(&p, |id| {
                points.get(&id).map(|p: &LaneControlPoint| p.position())
            });
            points.insert(p.id, p);
        }
        assert_eq!(
            lane.control_point_ids,
            [2, 3, 4, 1, 5].map(ControlPointId).to_vec()
        );
        assert!(lane.remove_control_point(ControlPointId(3)));
        assert!(!lane.remove_control_point(ControlPointId(3)));
        assert_eq!(lane.control_point_ids.len(), 4);
    }

    #[test]
    fn ids_are_transparent_in_json() {
        let json = serde_json::to_string(&Lane::new(LaneId(7), 3)).unwrap();
        assert_eq!(json, r#"{"id":7,"controlPointIds":[],"division":3}"#);
    }
}
