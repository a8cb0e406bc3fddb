//! Core of a rhythm-game chart editor.
//!
//! Converts musical positions (measure index plus exact fraction) to
//! seconds through a tempo map, interpolates lane geometry from sparse
//! control points into per-measure segments, maps pointer input back to
//! lane grid cells, and keeps undo history of notes.
//!
//! Everything is owned by one [Chart](chart::Chart) session, mutated and
//! queried from a single thread.

pub mod chart;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod primitives;

pub use chart::{Chart, ChartDocument, Note, NoteLine};
pub use config::EditorConfig;
pub use error::{ChartError, ChartResult, DocumentError, DocumentResult};
pub use primitives::{MusicalPosition, RationalPosition, TempoMarker};
