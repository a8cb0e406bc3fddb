//! Notes, note lines and typed note kinds.
//!
//! Screen bounds of notes are never stored: they are derived on demand
//! from lane geometry (see [Chart::get_bounds](super::Chart::get_bounds)).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::LaneId,
    primitives::{HasPosition, MusicalPosition, RationalPosition},
};

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
pub struct NoteId(pub u64);

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
pub struct NoteLineId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub lane_id: LaneId,
    pub measure_index: u32,
    /// vertical position inside the measure.
    pub measure_position: RationalPosition,
    /// left edge inside the lane, usually over lane division.
    pub horizontal_position: RationalPosition,
    /// width in cells of `horizontal_position.denominator`.
    pub horizontal_size: u32,
    #[serde(rename = "type")]
    pub kind: String,
}
impl Note {
    /// Note of the given kind with unassigned id.
    ///
    /// The id is given by [Chart::add_note](super::Chart::add_note).
    pub fn new(
        lane_id: LaneId,
        position: MusicalPosition,
        horizontal_position: RationalPosition,
        horizontal_size: u32,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: NoteId(0),
            lane_id,
            measure_index: position.measure_index,
            measure_position: position.sub_position,
            horizontal_position,
            horizontal_size,
            kind: kind.into(),
        }
    }
}
impl HasPosition for Note {
    fn position(&self) -> MusicalPosition {
        MusicalPosition::new(self.measure_index, self.measure_position)
    }
}

/// Connects two notes (for example, the ends of a hold).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteLine {
    pub id: NoteLineId,
    pub head: NoteId,
    pub tail: NoteId,
}

/// Typed strategy of a note kind, resolved when the chart is loaded.
pub trait NoteKind {
    fn name(&self) -> &str;
    /// Reason of rejection, if the note is not valid for this kind.
    fn validate(&self, note: &Note) -> Result<(), String> {
        if note.horizontal_size == 0 {
            return Err("horizontal size should be at least 1".to_string());
        }
        Ok(())
    }
    /// Whether note of this kind may be the head of a note line.
    fn can_start_line(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tap;
impl NoteKind for Tap {
    fn name(&self) -> &str {
        "tap"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Hold;
impl NoteKind for Hold {
    fn name(&self) -> &str {
        "hold"
    }
    fn can_start_line(&self) -> bool {
        true
    }
}

/// All note kinds known to the editor session.
pub struct NoteKindRegistry {
    kinds: HashMap<String, Box<dyn NoteKind>>,
}
impl NoteKindRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }
    pub fn register(&mut self, kind: impl NoteKind + 'static) {
        log::debug!("registering note kind `{}`", kind.name());
        self.kinds.insert(kind.name().to_string(), Box::new(kind));
    }
    pub fn resolve(&self, name: &str) -> Option<&dyn NoteKind> {
        self.kinds.get(name).map(|kind| kind.as_ref())
    }
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(|k| k.as_str()).collect();
        names.sort();
        names
    }
}
impl Default for NoteKindRegistry {
    /// Registry with built-in `tap` and `hold` kinds.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Tap);
        registry.register(Hold);
        registry
    }
}
impl std::fmt::Debug for NoteKindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteKindRegistry")
            .field("kinds", &self.names())
            .finish()
    }
}
