//! Screen geometry of measures, lanes and notes.
//!
//! The layout collaborator assigns a [Rect] to every visible measure through
//! [MeasureLayout]. Lane geometry is interpolated on top of that in
//! [interpolator]. All coordinates share one space: the space of measure
//! rects, which is also the space of pointer input.
//!
//! Inside a measure rect, sub-position 0 lies on the bottom edge, and
//! sub-position 1 on the top edge: music flows upward.

pub mod interpolator;
pub mod lane;

pub use interpolator::{
    get_lines, get_note_point_info,
    get_note_point_info_from_mouse_position, grid_cell_rect, GridCell,
    LinePoint, LinePointInfo, Segment,
};
pub use lane::{ControlPointId, Lane, LaneControlPoint, LaneId};

use crate::primitives::Measure;

/// Tolerance for comparisons of interpolated coordinates.
pub static EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}
impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
    /// Edges are inclusive.
    ///
    /// # Example
    /// ```
    /// # use chart_core::geometry::{Rect, Vector2};
    /// let r = Rect::new(0.0, 0.0, 10.0, 5.0);
    /// assert!(r.contains(Vector2::new(10.0, 5.0)));
    /// assert!(!r.contains(Vector2::new(10.5, 1.0)));
    /// ```
    pub fn contains(&self, point: Vector2) -> bool {
        let (left, right) = min_max(self.x, self.right());
        let (top, bottom) = min_max(self.y, self.bottom());
        left <= point.x && point.x <= right && top <= point.y && point.y <= bottom
    }
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    match a <= b {
        true => (a, b),
        false => (b, a),
    }
}

/// Layout collaborator: assigns screen rects to measures once per frame.
///
/// Measures, that are not visible, should get `None`.
pub trait MeasureLayout {
    fn layout(&self, measures: &mut [Measure]);
}

/// Stacks measures bottom-to-top in columns, left to right.
///
/// Height of a measure is proportional to its meter, so 7/8 measure is
/// shorter than 4/4 one.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    /// left edge of the first column.
    pub x: f64,
    /// bottom edge of every column.
    pub bottom: f64,
    pub column_width: f64,
    pub column_gap: f64,
    pub column_height: f64,
    /// height of a measure with meter 1/1.
    pub unit_height: f64,
    /// first measure to lay out: everything before is not visible.
    pub first_measure: u32,
    pub max_columns: u32,
}
impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            x: 0.0,
            bottom: 800.0,
            column_width: 300.0,
            column_gap: 20.0,
            column_height: 800.0,
            unit_height: 200.0,
            first_measure: 0,
            max_columns: 4,
        }
    }
}
impl MeasureLayout for ColumnLayout {
    fn layout(&self, measures: &mut [Measure]) {
        let mut column = 0_u32;
        let mut cursor = self.bottom;
        for measure in measures.iter_mut() {
            measure.rect = None;
            if measure.index < self.first_measure || column >= self.max_columns
            {
                continue;
            }
            let height = self.unit_height * measure.length();
            if cursor - height < self.bottom - self.column_height
                && cursor < self.bottom
            {
                column += 1;
                cursor = self.bottom;
                if column >= self.max_columns {
                    continue;
                }
            }
            let x = self.x + column as f64 * (self.column_width + self.column_gap);
            measure.rect =
                Some(Rect::new(x, cursor - height, self.column_width, height));
            cursor -= height;
        }
    }
}
