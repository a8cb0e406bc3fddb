//! Main "ruler" for converting musical positions to seconds and back.
//!
//! [TimeMap] is built from the sparse set of user tempo markers and the
//! meters of generated measures. It is a list of breakpoints, each one
//! starting a linear piece of the position → time curve.
//!
//! The map is rebuilt completely on every marker or meter change and is
//! never patched incrementally.
//!
//! # Example
//! ```
//! use chart_core::primitives::{Measure, RationalPosition, TempoMarker, TimeMap};
//!
//! let measures = Measure::generate(8, RationalPosition::new(4, 4));
//! let markers = vec![
//!     TempoMarker::new(0, RationalPosition::zero(), 120.0),
//!     TempoMarker::new(2, RationalPosition::zero(), 240.0),
//! ];
//! let time_map = TimeMap::build(&markers, &measures);
//! assert_eq!(time_map.get_time(1.0), 2.0);
//! assert_eq!(time_map.get_time(2.5), time_map.get_time(2.0) + 0.5);
//! assert_eq!(time_map.get_position(4.5), 2.5);
//! ```

use serde::{Deserialize, Serialize};

use super::{
    sort_by_position, HasPosition, Measure, MusicalPosition,
    RationalPosition, DEFAULT_BPM,
};

/// Tempo change, anchored to exact musical position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoMarker {
    pub measure_index: u32,
    pub sub_position: RationalPosition,
    pub bpm: f64,
}
impl TempoMarker {
    pub fn new(
        measure_index: u32,
        sub_position: RationalPosition,
        bpm: f64,
    ) -> Self {
        Self {
            measure_index,
            sub_position,
            bpm,
        }
    }
    pub fn is_valid_bpm(bpm: f64) -> bool {
        bpm.is_finite() && bpm > 0.0
    }
}
impl HasPosition for TempoMarker {
    fn position(&self) -> MusicalPosition {
        MusicalPosition::new(self.measure_index, self.sub_position)
    }
}

/// Point, where tempo or meter changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    /// absolute musical position (measures from the chart start).
    pub position: f64,
    pub bpm: f64,
    pub meter: RationalPosition,
    /// seconds per one measure-unit of musical position.
    pub unit_time: f64,
    /// seconds from the chart start.
    pub time: f64,
}
impl Breakpoint {
    fn unit_time(bpm: f64, meter: &RationalPosition) -> f64 {
        (240.0 / bpm) * meter.to01()
    }
    fn time_at(&self, position: f64) -> f64 {
        self.time + (position - self.position) * self.unit_time
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeMap {
    /// Never empty: there is always a breakpoint at position 0.
    breakpoints: Vec<Breakpoint>,
}
impl TimeMap {
    pub fn build(markers: &[TempoMarker], measures: &[Measure]) -> Self {
        Self::build_with_default(markers, measures, DEFAULT_BPM)
    }

    /// Build the map, using `default_bpm` before the first marker (or
    /// everywhere, if there is no marker at all).
    ///
    /// Markers with bad bpm or sub-position outside of `[0, 1)` are
    /// skipped with a warning.
    pub fn build_with_default(
        markers: &[TempoMarker],
        measures: &[Measure],
        default_bpm: f64,
    ) -> Self {
        let mut markers: Vec<&TempoMarker> = markers
            .iter()
            .filter(|marker| {
                if !TempoMarker::is_valid_bpm(marker.bpm) {
                    log::warn!("skipping tempo marker with bad bpm: {:?}", marker);
                    return false;
                }
                if !marker.sub_position.is_sub_position() {
                    log::warn!(
                        "skipping tempo marker outside of measure: {:?}",
                        marker
                    );
                    return false;
                }
                true
            })
            .collect();
        sort_by_position(&mut markers);

        let default_meter = RationalPosition::new(4, 4);
        let mut bpm = match TempoMarker::is_valid_bpm(default_bpm) {
            true => default_bpm,
            false => DEFAULT_BPM,
        };
        let mut builder = Builder::default();
        let mut markers = markers.into_iter().peekable();

        for measure in measures.iter() {
            let start = measure.index as f64;
            let meter = measure.meter;
            while let Some(marker) = markers.peek() {
                if marker.measure_index > measure.index
                    || (marker.measure_index == measure.index
                        && marker.sub_position.to01() > 0.0)
                {
                    break;
                }
                // markers at measure start, and markers left behind
                // by a gap in measure indexes.
                bpm = marker.bpm;
                markers.next();
            }
            builder.push(start, bpm, meter);
            while let Some(marker) = markers.peek() {
                if marker.measure_index != measure.index {
                    break;
                }
                bpm = marker.bpm;
                builder.push(start + marker.sub_position.to01(), bpm, meter);
                markers.next();
            }
        }
        if markers.peek().is_some() {
            log::warn!(
                "{} tempo markers are placed after the last measure",
                markers.count()
            );
        }
        if builder.breakpoints.is_empty() {
            builder.push(0.0, bpm, default_meter);
        }
        log::debug!(
            "time map built: {} breakpoints",
            builder.breakpoints.len()
        );
        Self {
            breakpoints: builder.breakpoints,
        }
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Index of the last breakpoint with position <= given one.
    fn breakpoint_index(&self, position: f64) -> usize {
        self.breakpoints
            .partition_point(|bp| bp.position <= position)
            .saturating_sub(1)
    }

    /// Seconds from the chart start at the given musical position.
    pub fn get_time(&self, position: f64) -> f64 {
        self.breakpoints[self.breakpoint_index(position)].time_at(position)
    }

    /// Reference implementation of [TimeMap::get_time], scanning
    /// breakpoints backward.
    pub fn get_time_linear(&self, position: f64) -> f64 {
        self.breakpoints
            .iter()
            .rev()
            .find(|bp| bp.position <= position)
            .unwrap_or(&self.breakpoints[0])
            .time_at(position)
    }

    /// Musical position at the given time in seconds.
    pub fn get_position(&self, seconds: f64) -> f64 {
        let idx = self
            .breakpoints
            .partition_point(|bp| bp.time <= seconds)
            .saturating_sub(1);
        let bp = &self.breakpoints[idx];
        match bp.unit_time > 0.0 {
            true => bp.position + (seconds - bp.time) / bp.unit_time,
            false => bp.position,
        }
    }

    pub fn bpm_at(&self, position: f64) -> f64 {
        self.breakpoints[self.breakpoint_index(position)].bpm
    }

    /// Fill `begin_time` and `end_time` of every measure.
    pub fn assign_measure_times(&self, measures: &mut [Measure]) {
        for measure in measures.iter_mut() {
            let start = measure.index as f64;
            measure.begin_time = self.get_time(start);
            measure.end_time = self.get_time(start + 1.0);
        }
    }
}

#[derive(Debug, Default)]
struct Builder {
    breakpoints: Vec<Breakpoint>,
}
impl Builder {
    /// Append breakpoint if tempo or meter actually changed.
    fn push(&mut self, position: f64, bpm: f64, meter: RationalPosition) {
        let time = match self.breakpoints.last() {
            None => 0.0,
            Some(last) => {
                if last.bpm == bpm && last.meter == meter {
                    return;
                }
                last.time_at(position)
            }
        };
        // a few markers at the same position: the last one wins.
        if let Some(last) = self.breakpoints.last_mut() {
            if last.position == position {
                last.bpm = bpm;
                last.meter = meter;
                last.unit_time = Breakpoint::unit_time(bpm, &meter);
                return;
            }
        }
        self.breakpoints.push(Breakpoint {
            position,
            bpm,
            meter,
            unit_time: Breakpoint::unit_time(bpm, &meter),
            time,
        });
    }
}
