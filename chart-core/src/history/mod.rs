//! Linear undo/redo over notes and note lines.
//!
//! History keeps structural diffs between committed snapshots, a cursor,
//! and a base snapshot. The state at cursor `n` is reconstructed by
//! replaying `diffs[..n]` on the base. Replay cost is linear in history
//! length, which is bounded by `capacity`: when it is exceeded, the oldest
//! diff is folded into the base.
//!
//! # Example
//! ```
//! use chart_core::chart::{Note, NoteId};
//! use chart_core::geometry::LaneId;
//! use chart_core::history::{History, Snapshot};
//! use chart_core::primitives::{MusicalPosition, RationalPosition};
//!
//! let mut history = History::new(Snapshot::default(), 0);
//! let mut state = Snapshot::default();
//! let mut note = Note::new(
//!     LaneId(0),
//!     MusicalPosition::measure_start(0),
//!     RationalPosition::new(0, 4),
//!     1,
//!     "tap",
//! );
//! note.id = NoteId(1);
//! state.notes.insert(note.id, note);
//! assert!(history.save(&state).unwrap());
//!
//! let restored = history.undo().unwrap().unwrap();
//! assert!(restored.notes.is_empty());
//! let restored = history.redo().unwrap().unwrap();
//! assert_eq!(restored, state);
//! ```

use std::collections::BTreeMap;

use thiserror;

use crate::chart::{Note, NoteId, NoteLine, NoteLineId};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Undo history is disabled after inconsistent replay")]
    Disabled,
    #[error("Inconsistent history replay: {0}")]
    Inconsistent(String),
}
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Undoable part of the chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub notes: BTreeMap<NoteId, Note>,
    pub note_lines: BTreeMap<NoteLineId, NoteLine>,
}
impl Snapshot {
    /// Every note line should reference existing notes.
    pub fn check_consistency(&self) -> Result<(), String> {
        for line in self.note_lines.values() {
            for end in [line.head, line.tail] {
                if !self.notes.contains_key(&end) {
                    return Err(format!(
                        "note line {:?} references missing note {:?}",
                        line.id, end
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Changes of one keyed collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDiff<K, V> {
    /// added or changed entries, with their new values.
    pub upserted: BTreeMap<K, V>,
    pub removed: Vec<K>,
}
impl<K, V> Default for CollectionDiff<K, V> {
    fn default() -> Self {
        Self {
            upserted: BTreeMap::new(),
            removed: Vec::new(),
        }
    }
}
impl<K: Ord + Clone, V: Clone + PartialEq> CollectionDiff<K, V> {
    pub fn between(before: &BTreeMap<K, V>, after: &BTreeMap<K, V>) -> Self {
        let upserted = after
            .iter()
            .filter(|(key, value)| before.get(key) != Some(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let removed = before
            .keys()
            .filter(|key| !after.contains_key(key))
            .cloned()
            .collect();
        Self { upserted, removed }
    }
    pub fn apply(&self, target: &mut BTreeMap<K, V>) {
        for key in self.removed.iter() {
            target.remove(key);
        }
        for (key, value) in self.upserted.iter() {
            target.insert(key.clone(), value.clone());
        }
    }
    pub fn is_empty(&self) -> bool {
        self.upserted.is_empty() && self.removed.is_empty()
    }
}

/// Structural difference between two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub notes: CollectionDiff<NoteId, Note>,
    pub note_lines: CollectionDiff<NoteLineId, NoteLine>,
}
impl Diff {
    pub fn between(before: &Snapshot, after: &Snapshot) -> Self {
        Self {
            notes: CollectionDiff::between(&before.notes, &after.notes),
            note_lines: CollectionDiff::between(
                &before.note_lines,
                &after.note_lines,
            ),
        }
    }
    pub fn apply(&self, target: &mut Snapshot) {
        self.notes.apply(&mut target.notes);
        self.note_lines.apply(&mut target.note_lines);
    }
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.note_lines.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct History {
    base: Snapshot,
    diffs: Vec<Diff>,
    /// in `0..=diffs.len()`.
    cursor: usize,
    /// the state at cursor: what the next save is diffed against.
    committed: Snapshot,
    /// maximum number of diffs, 0 for unlimited.
    capacity: usize,
    disabled: bool,
}
impl History {
    pub fn new(initial: Snapshot, capacity: usize) -> Self {
        Self {
            base: initial.clone(),
            diffs: Vec::new(),
            cursor: 0,
            committed: initial,
            capacity,
            disabled: false,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
    pub fn len(&self) -> usize {
        self.diffs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
    pub fn can_undo(&self) -> bool {
        !self.disabled && self.cursor > 0
    }
    pub fn can_redo(&self) -> bool {
        !self.disabled && self.cursor < self.diffs.len()
    }

    /// Commit the current state.
    ///
    /// Discards the redo tail. Returns false if nothing changed since the
    /// last commit.
    pub fn save(&mut self, current: &Snapshot) -> HistoryResult<bool> {
        if self.disabled {
            return Err(HistoryError::Disabled);
        }
        let diff = Diff::between(&self.committed, current);
        if diff.is_empty() {
            return Ok(false);
        }
        if self.cursor < self.diffs.len() {
            log::debug!(
                "discarding {} redo steps",
                self.diffs.len() - self.cursor
            );
            self.diffs.truncate(self.cursor);
        }
        self.diffs.push(diff);
        self.cursor += 1;
        self.committed = current.clone();
        if self.capacity > 0 {
            while self.diffs.len() > self.capacity {
                let oldest = self.diffs.remove(0);
                oldest.apply(&mut self.base);
                self.cursor -= 1;
            }
        }
        Ok(true)
    }

    /// Step back. `None` if there is nothing to undo.
    pub fn undo(&mut self) -> HistoryResult<Option<Snapshot>> {
        self.undo_checked(|_| Ok(()))
    }

    /// Step forward. `None` if there is nothing to redo.
    pub fn redo(&mut self) -> HistoryResult<Option<Snapshot>> {
        self.redo_checked(|_| Ok(()))
    }

    /// [History::undo], where replayed state also has to pass `check`:
    /// references to things, that are not kept in history.
    pub fn undo_checked(
        &mut self,
        check: impl Fn(&Snapshot) -> Result<(), String>,
    ) -> HistoryResult<Option<Snapshot>> {
        if self.disabled {
            return Err(HistoryError::Disabled);
        }
        if self.cursor == 0 {
            return Ok(None);
        }
        self.move_to(self.cursor - 1, check).map(Some)
    }

    pub fn redo_checked(
        &mut self,
        check: impl Fn(&Snapshot) -> Result<(), String>,
    ) -> HistoryResult<Option<Snapshot>> {
        if self.disabled {
            return Err(HistoryError::Disabled);
        }
        if self.cursor >= self.diffs.len() {
            return Ok(None);
        }
        self.move_to(self.cursor + 1, check).map(Some)
    }

    fn move_to(
        &mut self,
        cursor: usize,
        check: impl Fn(&Snapshot) -> Result<(), String>,
    ) -> HistoryResult<Snapshot> {
        let replayed = self
            .replay(cursor)
            .and_then(|state| check(&state).map(|_| state));
        let state = replayed.map_err(|reason| {
            log::error!("{}; undo is disabled for this session", reason);
            self.disabled = true;
            HistoryError::Inconsistent(reason)
        })?;
        self.cursor = cursor;
        self.committed = state.clone();
        Ok(state)
    }

    /// Reconstruct state after `diffs[..cursor]`.
    pub fn replay(&self, cursor: usize) -> Result<Snapshot, String> {
        let mut state = self.base.clone();
        for diff in self.diffs.iter().take(cursor) {
            diff.apply(&mut state);
        }
        state.check_consistency()?;
        Ok(state)
    }

    /// Push a diff, that was not produced by [History::save].
    #[cfg(test)]
    pub(crate) fn push_raw(&mut self, diff: Diff) {
        self.diffs.truncate(self.cursor);
        self.diffs.push(diff);
        self.cursor += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{Diff, History, HistoryError, Snapshot};
    use crate::{
        chart::{Note, NoteId, NoteLine, NoteLineId},
        geometry::LaneId,
        primitives::{MusicalPosition, RationalPosition},
    };

    fn note(id: u64, measure: u32) -> Note {
        let mut note = Note::new(
            LaneId(0),
            MusicalPosition::measure_start(measure),
            RationalPosition::new(0, 4),
            1,
            "tap",
        );
        note.id = NoteId(id);
        note
    }

    fn with_notes(ids: &[u64]) -> Snapshot {
        let mut state = Snapshot::default();
        for id in ids {
            state.notes.insert(NoteId(*id), note(*id, *id as u32));
        }
        state
    }

    #[test]
    fn diff_between() {
        let before = with_notes(&[1, 2]);
        let mut after = with_notes(&[2, 3]);
        after.notes.get_mut(&NoteId(2)).unwrap().measure_index = 10;
        let diff = Diff::between(&before, &after);
        assert_eq!(diff.notes.removed, vec![NoteId(1)]);
        assert_eq!(
            diff.notes.upserted.keys().copied().collect::<Vec<_>>(),
            vec![NoteId(2), NoteId(3)]
        );
        let mut replayed = before.clone();
        diff.apply(&mut replayed);
        assert_eq!(replayed, after);
    }

    #[test]
    fn undo_redo_sequence() {
        let states = [with_notes(&[1]), with_notes(&[1, 2]), with_notes(&[2])];
        let mut history = History::new(Snapshot::default(), 0);
        for state in states.iter() {
            assert!(history.save(state).unwrap());
        }
        assert!(!history.save(&states[2]).unwrap());
        assert_eq!(history.len(), 3);

        assert_eq!(history.undo().unwrap(), Some(states[1].clone()));
        assert_eq!(history.undo().unwrap(), Some(states[0].clone()));
        assert_eq!(history.undo().unwrap(), Some(Snapshot::default()));
        assert_eq!(history.undo().unwrap(), None);
        assert_eq!(history.redo().unwrap(), Some(states[0].clone()));
        assert_eq!(history.redo().unwrap(), Some(states[1].clone()));
        assert_eq!(history.redo().unwrap(), Some(states[2].clone()));
        assert_eq!(history.redo().unwrap(), None);
    }

    #[test]
    fn new_edit_discards_redo_tail() {
        let mut history = History::new(Snapshot::default(), 0);
        history.save(&with_notes(&[1])).unwrap();
        history.save(&with_notes(&[1, 2])).unwrap();
        history.undo().unwrap();
        assert!(history.can_redo());
        history.save(&with_notes(&[1, 3])).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().unwrap(), Some(with_notes(&[1])));
    }

    #[test]
    fn capacity_folds_into_base() {
        let mut history = History::new(Snapshot::default(), 2);
        for n in 1..=4 {
            let ids: Vec<u64> = (1..=n).collect();
            history.save(&with_notes(&ids)).unwrap();
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 2);
        history.undo().unwrap();
        assert_eq!(history.undo().unwrap(), Some(with_notes(&[1, 2])));
        assert_eq!(history.undo().unwrap(), None);
    }

    #[test]
    fn inconsistent_replay_disables_history() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut history = History::new(Snapshot::default(), 0);
        history.save(&with_notes(&[1])).unwrap();
        let mut broken = Diff::default();
        broken.note_lines.upserted.insert(
            NoteLineId(5),
            NoteLine {
                id: NoteLineId(5),
                head: NoteId(1),
                tail: NoteId(42),
            },
        );
        history.push_raw(broken);
        history.push_raw(Diff::default());
        assert!(matches!(
            history.undo(),
            Err(HistoryError::Inconsistent(_))
        ));
        assert!(history.is_disabled());
        assert!(!history.can_undo());
        assert!(matches!(history.redo(), Err(HistoryError::Disabled)));
        assert!(matches!(
            history.save(&Snapshot::default()),
            Err(HistoryError::Disabled)
        ));
    }

    #[test]
    fn rejected_replay_disables_history() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut history = History::new(Snapshot::default(), 0);
        history.save(&with_notes(&[1])).unwrap();
        history.save(&with_notes(&[1, 7])).unwrap();
        let no_late_notes = |state: &Snapshot| {
            match state.notes.values().find(|note| note.measure_index > 5) {
                Some(note) => Err(format!("{:?} is too late", note.id)),
                None => Ok(()),
            }
        };
        assert_eq!(
            history.undo_checked(no_late_notes).unwrap(),
            Some(with_notes(&[1]))
        );
        assert!(matches!(
            history.redo_checked(no_late_notes),
            Err(HistoryError::Inconsistent(_))
        ));
        assert_eq!(history.cursor(), 1);
        assert!(history.is_disabled());
        assert!(matches!(history.undo(), Err(HistoryError::Disabled)));
    }
}
