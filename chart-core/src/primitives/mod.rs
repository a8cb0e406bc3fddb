//! Elements, from which the chart is constructed.
//!
//! At first, measures are generated eagerly up to the configured ceiling.
//! Then the TimeMap is built from them and from tempo markers.
//! Every musical position on the chart is a measure index plus an exact
//! [RationalPosition] inside the measure.

pub mod fraction_tools;
pub mod measure;
pub mod position;
pub mod rational;
pub mod time_map;

pub use fraction_tools::{gcd, quantize, to_fraction};
pub use measure::Measure;
pub use position::{sort_by_position, HasPosition, MusicalPosition};
pub use rational::RationalPosition;
pub use time_map::{Breakpoint, TempoMarker, TimeMap};

/// Tempo used before the first marker, or when there are no markers.
pub static DEFAULT_BPM: f64 = 120.0;

/// Amount of measures generated for a new chart.
pub static MEASURE_CEILING: u32 = 1000;

/// Hard limit of measures a chart can have, whatever is configured or
/// persisted.
pub static MEASURE_LIMIT: u32 = 100_000;
