//! Lane geometry: from sparse control points to per-measure segments, and
//! back from screen points to lane positions.
//!
//! The interpolation parameter is the musical position over the whole span
//! between two control points. Measures crossed by one span may have
//! different heights (different meters), and the lane still has to look
//! linear across all of them, so the span is not re-parametrized per
//! measure.
//!
//! # Example
//! ```
//! use chart_core::geometry::{
//!     get_lines, ControlPointId, LaneControlPoint, LaneId, Rect,
//! };
//! use chart_core::primitives::{Measure, RationalPosition};
//!
//! let mut measures = Measure::generate(4, RationalPosition::new(4, 4));
//! for m in measures.iter_mut() {
//!     let y = 300.0 - 100.0 * m.index as f64;
//!     m.rect = Some(Rect::new(0.0, y, 400.0, 100.0));
//! }
//! let point = |id, measure_index, h| LaneControlPoint {
//!     id: ControlPointId(id),
//!     lane_id: LaneId(0),
//!     measure_index,
//!     measure_position: RationalPosition::zero(),
//!     horizontal_position: RationalPosition::new(h, 4),
//!     horizontal_size: 1.0,
//! };
//! let lines = get_lines(&[point(1, 0, 0), point(2, 3, 2)], &measures);
//! assert_eq!(lines.len(), 3);
//! assert_eq!(lines[1].measure, 1);
//! ```

use itertools::Itertools;

use super::{Lane, LaneControlPoint, LaneId, Rect, Vector2, EPSILON};
use crate::primitives::{
    sort_by_position, HasPosition, Measure, RationalPosition,
};

/// Left edge of the lane and its width at some height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    pub point: Vector2,
    pub width: f64,
}

/// One measure worth of lane between two control points.
///
/// `start` is the lower end (earlier in music), `end` is the upper one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub measure: u32,
    pub start: LinePoint,
    pub end: LinePoint,
}
impl Segment {
    /// True if `y` lies between the ends of the segment.
    pub fn covers(&self, y: f64) -> bool {
        let (top, bottom) = (self.end.point.y, self.start.point.y);
        top - EPSILON <= y && y <= bottom + EPSILON
    }
}

/// Exact point on the lane with the lane width at that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePointInfo {
    pub point: Vector2,
    pub width: f64,
}

/// Cell of lane grid under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub lane: LaneId,
    pub measure: u32,
    pub horizontal_index: u32,
    pub vertical_index: u32,
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Build drawing segments of one lane.
///
/// Points are sorted by musical position first. For every consecutive pair
/// one segment is emitted per measure the span touches. Measures, which
/// have no rect assigned by layout, produce no segments.
pub fn get_lines(
    control_points: &[LaneControlPoint],
    measures: &[Measure],
) -> Vec<Segment> {
    let mut sorted: Vec<&LaneControlPoint> = control_points.iter().collect();
    sort_by_position(&mut sorted);
    sorted
        .into_iter()
        .tuple_windows()
        .flat_map(|(p1, p2)| span_segments(p1, p2, measures))
        .collect()
}

fn span_segments(
    p1: &LaneControlPoint,
    p2: &LaneControlPoint,
    measures: &[Measure],
) -> Vec<Segment> {
    let (v1, v2) = (p1.position().value(), p2.position().value());
    let first = v1.floor().max(0.0) as u32;
    let last = match v2 > v1 {
        true => (v2.ceil() as u32).saturating_sub(1).max(first),
        false => first,
    };
    let (h1, h2) = (p1.horizontal_fraction(), p2.horizontal_fraction());
    let (w1, w2) = (p1.width_fraction(), p2.width_fraction());
    let at = |value: f64, measure: u32, rect: &Rect| -> LinePoint {
        let t = match v2 > v1 {
            true => (value - v1) / (v2 - v1),
            false => 0.0,
        };
        LinePoint {
            point: Vector2::new(
                rect.x + rect.width * lerp(h1, h2, t),
                rect.y + rect.height * (1.0 - (value - measure as f64)),
            ),
            width: rect.width * lerp(w1, w2, t),
        }
    };
    (first..=last)
        .filter_map(|index| {
            let measure = find_measure(measures, index)?;
            let rect = measure.rect?;
            let start = v1.max(index as f64);
            let end = v2.min(index as f64 + 1.0);
            Some(Segment {
                measure: index,
                start: at(start, index, &rect),
                end: at(end, index, &rect),
            })
        })
        .collect()
}

/// Measures are generated by index, so the index is tried first.
fn find_measure(measures: &[Measure], index: u32) -> Option<&Measure> {
    match measures.get(index as usize) {
        Some(measure) if measure.index == index => Some(measure),
        _ => measures.iter().find(|m| m.index == index),
    }
}

/// Point on the lane at `(horizontal, vertical)` inside the measure.
///
/// Returns None if lane is not rendered at this height of the measure:
/// nothing to answer yet, not an error.
pub fn get_note_point_info(
    segments: &[Segment],
    measure: &Measure,
    horizontal: &RationalPosition,
    vertical: &RationalPosition,
) -> Option<LinePointInfo> {
    let y = measure.y_of(vertical)?;
    let segment = segments
        .iter()
        .filter(|segment| segment.measure == measure.index)
        .find(|segment| segment.covers(y))?;
    let span = segment.start.point.y - segment.end.point.y;
    let ratio = match span.abs() > EPSILON {
        true => ((segment.start.point.y - y) / span).clamp(0.0, 1.0),
        false => 0.0,
    };
    let x = lerp(segment.start.point.x, segment.end.point.x, ratio);
    let width = lerp(segment.start.width, segment.end.width, ratio);
    Some(LinePointInfo {
        point: Vector2::new(x + width * horizontal.to01(), y),
        width,
    })
}

/// Screen rect of the grid cell `(horizontal_index, vertical_index)` of
/// the lane inside the measure.
///
/// Horizontal extent is taken at the vertical center of the cell.
pub fn grid_cell_rect(
    segments: &[Segment],
    measure: &Measure,
    lane_division: u32,
    measure_division: u32,
    horizontal_index: u32,
    vertical_index: u32,
) -> Option<Rect> {
    if lane_division == 0 || measure_division == 0 {
        return None;
    }
    let center = RationalPosition::new(
        2 * vertical_index as i64 + 1,
        2 * measure_division as i64,
    );
    let info = get_note_point_info(
        segments,
        measure,
        &RationalPosition::new(horizontal_index as i64, lane_division as i64),
        &center,
    )?;
    let top = measure.y_of(&RationalPosition::new(
        vertical_index as i64 + 1,
        measure_division as i64,
    ))?;
    let bottom = measure.y_of(&RationalPosition::new(
        vertical_index as i64,
        measure_division as i64,
    ))?;
    Some(Rect::new(
        info.point.x,
        top,
        info.width / lane_division as f64,
        bottom - top,
    ))
}

/// Snap pointer to the lane grid of the measure.
///
/// Brute force over `lane.division × measure_division` cells: both are
/// small, author-controlled counts.
pub fn get_note_point_info_from_mouse_position(
    lane: &Lane,
    segments: &[Segment],
    measure: &Measure,
    measure_division: u32,
    mouse: Vector2,
) -> Option<GridCell> {
    (0..measure_division)
        .cartesian_product(0..lane.division)
        .find(|(vertical_index, horizontal_index)| {
            grid_cell_rect(
                segments,
                measure,
                lane.division,
                measure_division,
                *horizontal_index,
                *vertical_index,
            )
            .map(|rect| rect.contains(mouse))
            .unwrap_or(false)
        })
        .map(|(vertical_index, horizontal_index)| GridCell {
            lane: lane.id,
            measure: measure.index,
            horizontal_index,
            vertical_index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ControlPointId;

    fn measures(count: u32, height: f64) -> Vec<Measure> {
        let mut measures = Measure::generate(count, RationalPosition::new(4, 4));
        for m in measures.iter_mut() {
            let y = height * (count - 1 - m.index) as f64;
            m.rect = Some(Rect::new(0.0, y, 400.0, height));
        }
        measures
    }

    fn point(
        id: u64,
        measure: u32,
        sub: (i64, i64),
        h: (i64, i64),
        size: f64,
    ) -> LaneControlPoint {
        LaneControlPoint {
            id: ControlPointId(id),
            lane_id: LaneId(0),
            measure_index: measure,
            measure_position: sub.into(),
            horizontal_position: h.into(),
            horizontal_size: size,
        }
    }

    #[test]
    fn same_measure_gives_one_segment() {
        let measures = measures(4, 100.0);
        let lines = get_lines(
            &[
                point(1, 1, (1, 4), (0, 4), 1.0),
                point(2, 1, (3, 4), (1, 4), 1.0),
            ],
            &measures,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].measure, 1);
        assert_eq!(lines[0].start.point, Vector2::new(0.0, 275.0));
        assert_eq!(lines[0].end.point, Vector2::new(100.0, 225.0));
    }

    #[test]
    fn points_are_sorted_before_interpolation() {
        let measures = measures(4, 100.0);
        let a = point(1, 2, (0, 1), (2, 4), 1.0);
        let b = point(2, 0, (0, 1), (0, 4), 1.0);
        let lines = get_lines(&[a.clone(), b.clone()], &measures);
        assert_eq!(lines, get_lines(&[b, a], &measures));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn span_interpolates_over_whole_span() {
        let measures = measures(4, 100.0);
        let lines = get_lines(
            &[
                point(1, 0, (1, 2), (0, 4), 1.0),
                point(2, 2, (1, 2), (2, 4), 3.0),
            ],
            &measures,
        );
        assert_eq!(lines.len(), 3);
        // at the first barline the span is 1/4 done.
        assert_eq!(lines[0].end.point.x, 400.0 * 0.5 * 0.25);
        assert_eq!(lines[1].start.point.x, lines[0].end.point.x);
        assert_eq!(lines[1].end.point.x, 400.0 * 0.5 * 0.75);
        assert_eq!(lines[2].end.point.x, 200.0);
        assert_eq!(lines[0].start.width, 100.0);
        assert_eq!(lines[2].end.width, 300.0);
    }

    #[test]
    fn measures_without_layout_are_skipped() {
        let mut measures = measures(4, 100.0);
        measures[1].rect = None;
        let lines = get_lines(
            &[
                point(1, 0, (0, 1), (0, 4), 1.0),
                point(2, 3, (0, 1), (0, 4), 1.0),
            ],
            &measures,
        );
        assert_eq!(lines.iter().map(|s| s.measure).collect_vec(), [0, 2]);
    }

    #[test]
    fn note_point_info() {
        let measures = measures(2, 100.0);
        let segments = get_lines(
            &[
                point(1, 0, (0, 1), (0, 4), 2.0),
                point(2, 1, (0, 1), (2, 4), 2.0),
            ],
            &measures,
        );
        let info = get_note_point_info(
            &segments,
            &measures[0],
            &RationalPosition::new(1, 2),
            &RationalPosition::new(1, 2),
        )
        .unwrap();
        // left edge at 1/4 of 400, the note is in the middle of the lane
        assert_eq!(info.width, 200.0);
        assert_eq!(info.point, Vector2::new(100.0 + 100.0, 150.0));
        assert_eq!(
            get_note_point_info(
                &segments,
                &measures[1],
                &RationalPosition::zero(),
                &RationalPosition::new(1, 2),
            ),
            None
        );
    }

    #[test]
    fn mouse_position_to_grid() {
        let measures = measures(2, 100.0);
        let lane = Lane::new(LaneId(0), 4);
        let segments = get_lines(
            &[
                point(1, 0, (0, 1), (0, 4), 4.0),
                point(2, 1, (0, 1), (0, 4), 4.0),
            ],
            &measures,
        );
        let cell = get_note_point_info_from_mouse_position(
            &lane,
            &segments,
            &measures[0],
            4,
            Vector2::new(250.0, 160.0),
        );
        assert_eq!(
            cell,
            Some(GridCell {
                lane: LaneId(0),
                measure: 0,
                horizontal_index: 2,
                vertical_index: 1,
            })
        );
        assert_eq!(
            get_note_point_info_from_mouse_position(
                &lane,
                &segments,
                &measures[0],
                4,
                Vector2::new(450.0, 160.0),
            ),
            None
        );
    }
}
