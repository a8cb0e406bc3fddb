#![allow(dead_code)]

use chart_core::{
    chart::Chart,
    config::EditorConfig,
    geometry::{ColumnLayout, LaneId},
    primitives::{MusicalPosition, RationalPosition},
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Measures of 4/4 stacked in one column, each 400 wide and 100 high.
pub fn column(count: u32) -> ColumnLayout {
    ColumnLayout {
        x: 0.0,
        bottom: 100.0 * count as f64,
        column_width: 400.0,
        column_gap: 0.0,
        column_height: 100.0 * count as f64,
        unit_height: 100.0,
        first_measure: 0,
        max_columns: 1,
    }
}

pub fn chart(measure_count: u32) -> Chart {
    init_logger();
    Chart::new(EditorConfig {
        measure_count,
        ..Default::default()
    })
}

/// Add lane with control points `(measure, horizontal, size)`.
pub fn lane(
    chart: &mut Chart,
    division: u32,
    points: &[(u32, (i64, i64), f64)],
) -> LaneId {
    let lane = chart.add_lane(division).expect("can not add lane");
    for (measure, horizontal, size) in points {
        chart
            .add_control_point(
                lane,
                MusicalPosition::measure_start(*measure),
                RationalPosition::from(*horizontal),
                *size,
            )
            .expect("can not add control point");
    }
    lane
}
