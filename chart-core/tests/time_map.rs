use chart_core::primitives::{
    Measure, MusicalPosition, RationalPosition, TempoMarker, TimeMap,
};
use itertools::Itertools;

mod common;

#[test]
fn single_marker() {
    let mut chart = common::chart(16);
    chart
        .add_tempo_marker(TempoMarker::new(0, RationalPosition::zero(), 120.0))
        .unwrap();
    assert_eq!(chart.get_time(1.0), 2.0);
}

#[test]
fn second_marker() {
    let mut chart = common::chart(16);
    chart
        .add_tempo_marker(TempoMarker::new(0, RationalPosition::zero(), 120.0))
        .unwrap();
    chart
        .add_tempo_marker(TempoMarker::new(2, RationalPosition::zero(), 240.0))
        .unwrap();
    assert_eq!(chart.get_time(2.5), chart.get_time(2.0) + 0.5);
}

fn busy_time_map() -> TimeMap {
    let mut measures = Measure::generate(24, RationalPosition::new(4, 4));
    measures[3].meter = RationalPosition::new(7, 8);
    measures[4].meter = RationalPosition::new(3, 4);
    measures[11].meter = RationalPosition::new(5, 16);
    let markers = vec![
        TempoMarker::new(9, RationalPosition::new(3, 8), 97.5),
        TempoMarker::new(0, RationalPosition::zero(), 140.0),
        TempoMarker::new(2, RationalPosition::new(1, 3), 60.0),
        TempoMarker::new(4, RationalPosition::zero(), 200.0),
        TempoMarker::new(15, RationalPosition::new(2, 4), 33.0),
        TempoMarker::new(15, RationalPosition::new(3, 4), 180.0),
    ];
    TimeMap::build(&markers, &measures)
}

#[test]
fn time_is_monotone() {
    let time_map = busy_time_map();
    let positions = (0..24 * 7)
        .map(|step| {
            MusicalPosition::new(
                step / 7,
                RationalPosition::new((step % 7) as i64, 7),
            )
        })
        .collect::<Vec<_>>();
    positions
        .iter()
        .map(|position| time_map.get_time(position.value()))
        .tuple_windows()
        .for_each(|(a, b)| assert!(a <= b, "{} > {}", a, b));
}

#[test]
fn binary_search_equals_linear_scan() {
    let time_map = busy_time_map();
    let probes = time_map
        .breakpoints()
        .iter()
        .flat_map(|bp| [bp.position - 1e-6, bp.position, bp.position + 0.01])
        .chain((0..240).map(|step| step as f64 / 10.0))
        .chain([-1.0, 30.0]);
    for position in probes {
        assert_eq!(
            time_map.get_time(position),
            time_map.get_time_linear(position),
            "at {}",
            position
        );
    }
}

#[test]
fn position_is_inverse_of_time() {
    let time_map = busy_time_map();
    for step in 0..100 {
        let position = step as f64 * 0.23;
        let back = time_map.get_position(time_map.get_time(position));
        assert!((back - position).abs() < 1e-9, "{} != {}", back, position);
    }
}
