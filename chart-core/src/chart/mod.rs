//! Editor session: the single owner of the whole chart.
//!
//! All entities are plain values addressed by stable ids. Derived data
//! (time map, lane geometry, notes by lane) is rebuilt eagerly by the
//! mutation that invalidates it, so every query reads a consistent state.
//!
//! # Example
//! ```
//! use chart_core::chart::{Chart, Note};
//! use chart_core::config::EditorConfig;
//! use chart_core::geometry::ColumnLayout;
//! use chart_core::primitives::{MusicalPosition, RationalPosition, TempoMarker};
//!
//! let mut chart = Chart::new(EditorConfig {
//!     measure_count: 8,
//!     ..Default::default()
//! });
//! chart
//!     .add_tempo_marker(TempoMarker::new(2, RationalPosition::zero(), 240.0))
//!     .unwrap();
//! assert_eq!(chart.get_time(1.0), 2.0);
//! assert_eq!(chart.get_time(2.5), chart.get_time(2.0) + 0.5);
//!
//! let lane = chart.add_lane(4).unwrap();
//! for measure in [0, 4] {
//!     let position = MusicalPosition::measure_start(measure);
//!     chart
//!         .add_control_point(lane, position, RationalPosition::new(0, 4), 4.0)
//!         .unwrap();
//! }
//! chart.apply_layout(&ColumnLayout::default());
//! assert_eq!(chart.get_lines(lane).len(), 4);
//!
//! let note = chart
//!     .add_note(Note::new(
//!         lane,
//!         MusicalPosition::new(1, RationalPosition::new(1, 2)),
//!         RationalPosition::new(1, 4),
//!         1,
//!         "tap",
//!     ))
//!     .unwrap();
//! assert!(chart.get_bounds(note).is_some());
//! assert!(chart.save().unwrap());
//! ```

pub mod document;
pub mod note;

pub use document::ChartDocument;
pub use note::{
    Hold, Note, NoteId, NoteKind, NoteKindRegistry, NoteLine, NoteLineId, Tap,
};

use std::collections::BTreeMap;

use crate::{
    config::EditorConfig,
    error::{ChartError, ChartResult},
    geometry::{
        get_lines, interpolator, ControlPointId, GridCell, Lane,
        LaneControlPoint, LaneId, LinePointInfo, MeasureLayout, Rect, Segment,
        Vector2,
    },
    history::{History, Snapshot},
    primitives::{
        HasPosition, Measure, MusicalPosition, RationalPosition, TempoMarker,
        TimeMap, MEASURE_LIMIT,
    },
};

#[derive(Debug)]
pub struct Chart {
    config: EditorConfig,
    measures: Vec<Measure>,
    /// Sorted by position, at most one per position.
    tempo_markers: Vec<TempoMarker>,
    time_map: TimeMap,
    lanes: BTreeMap<LaneId, Lane>,
    control_points: BTreeMap<ControlPointId, LaneControlPoint>,
    lane_geometry: BTreeMap<LaneId, Vec<Segment>>,
    notes: BTreeMap<NoteId, Note>,
    note_lines: BTreeMap<NoteLineId, NoteLine>,
    /// Note ids of every lane, sorted by position.
    notes_by_lane: BTreeMap<LaneId, Vec<NoteId>>,
    note_kinds: NoteKindRegistry,
    history: History,
    /// Shared by all entity kinds, never reused within the session.
    next_id: u64,
}
impl Chart {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_note_kinds(config, NoteKindRegistry::default())
    }

    pub fn with_note_kinds(
        config: EditorConfig,
        note_kinds: NoteKindRegistry,
    ) -> Self {
        let measures = Measure::generate(
            config.measure_count.min(MEASURE_LIMIT),
            config.default_meter,
        );
        let history = History::new(Snapshot::default(), config.history_capacity);
        let mut chart = Self {
            time_map: TimeMap::build_with_default(
                &[],
                &measures,
                config.default_bpm,
            ),
            config,
            measures,
            tempo_markers: Vec::new(),
            lanes: BTreeMap::new(),
            control_points: BTreeMap::new(),
            lane_geometry: BTreeMap::new(),
            notes: BTreeMap::new(),
            note_lines: BTreeMap::new(),
            notes_by_lane: BTreeMap::new(),
            note_kinds,
            history,
            next_id: 1,
        };
        chart.rebuild_time_map();
        chart
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }
    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }
    pub fn measure(&self, index: u32) -> Option<&Measure> {
        self.measures.get(index as usize)
    }
    pub fn tempo_markers(&self) -> &[TempoMarker] {
        &self.tempo_markers
    }
    pub fn time_map(&self) -> &TimeMap {
        &self.time_map
    }
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }
    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(&id)
    }
    pub fn control_point(&self, id: ControlPointId) -> Option<&LaneControlPoint> {
        self.control_points.get(&id)
    }
    /// Control points of the lane, sorted by position.
    pub fn lane_control_points(
        &self,
        id: LaneId,
    ) -> impl Iterator<Item = &LaneControlPoint> {
        self.lanes
            .get(&id)
            .into_iter()
            .flat_map(|lane| lane.control_point_ids.iter())
            .filter_map(|id| self.control_points.get(id))
    }
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }
    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }
    /// Notes of the lane, sorted by position.
    pub fn lane_notes(&self, id: LaneId) -> impl Iterator<Item = &Note> {
        self.notes_by_lane
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.notes.get(id))
    }
    pub fn note_lines(&self) -> impl Iterator<Item = &NoteLine> {
        self.note_lines.values()
    }
    pub fn note_line(&self, id: NoteLineId) -> Option<&NoteLine> {
        self.note_lines.get(&id)
    }
    pub fn note_kinds(&self) -> &NoteKindRegistry {
        &self.note_kinds
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_measure(&self, index: u32) -> ChartResult<()> {
        match (index as usize) < self.measures.len() {
            true => Ok(()),
            false => Err(ChartError::MeasureNotFound(index)),
        }
    }

    /// Sub-position should be valid and lie inside the measure.
    fn check_sub_position(
        field: &'static str,
        value: RationalPosition,
    ) -> ChartResult<()> {
        match value.is_sub_position() {
            true => Ok(()),
            false => Err(ChartError::InvalidRational { field, value }),
        }
    }

    // Tempo and meter.

    /// Insert marker, replacing one at the same position.
    pub fn add_tempo_marker(&mut self, marker: TempoMarker) -> ChartResult<()> {
        self.check_measure(marker.measure_index)?;
        Self::check_sub_position("subPosition", marker.sub_position)?;
        if !TempoMarker::is_valid_bpm(marker.bpm) {
            return Err(ChartError::InvalidBpm(marker.bpm));
        }
        let position = marker.position();
        self.tempo_markers.retain(|other| other.position() != position);
        let idx = self
            .tempo_markers
            .partition_point(|other| other.position() < position);
        self.tempo_markers.insert(idx, marker);
        self.rebuild_time_map();
        Ok(())
    }

    pub fn remove_tempo_marker(
        &mut self,
        position: MusicalPosition,
    ) -> ChartResult<TempoMarker> {
        let idx = self
            .tempo_markers
            .iter()
            .position(|marker| marker.position() == position)
            .ok_or(ChartError::TempoMarkerNotFound(position))?;
        let marker = self.tempo_markers.remove(idx);
        self.rebuild_time_map();
        Ok(marker)
    }

    pub fn set_meter(
        &mut self,
        measure_index: u32,
        meter: RationalPosition,
    ) -> ChartResult<()> {
        if !meter.is_valid() || meter.numerator <= 0 {
            return Err(ChartError::InvalidRational {
                field: "meter",
                value: meter,
            });
        }
        let measure = self
            .measures
            .get_mut(measure_index as usize)
            .ok_or(ChartError::MeasureNotFound(measure_index))?;
        measure.meter = meter;
        self.rebuild_time_map();
        Ok(())
    }

    /// Rebuild measures `0..count`, keeping meters of the surviving ones.
    ///
    /// Fails if any entity is placed after the new last measure. Layout
    /// is dropped, so [Chart::apply_layout] should be called again.
    pub fn regenerate_measures(&mut self, count: u32) -> ChartResult<()> {
        if count > MEASURE_LIMIT {
            return Err(ChartError::TooManyMeasures(count));
        }
        let beyond = self
            .tempo_markers
            .iter()
            .map(|marker| marker.measure_index)
            .chain(self.control_points.values().map(|p| p.measure_index))
            .chain(self.notes.values().map(|note| note.measure_index))
            .find(|index| *index >= count);
        if let Some(index) = beyond {
            return Err(ChartError::MeasureNotFound(index));
        }
        let mut measures = Measure::generate(count, self.config.default_meter);
        for (new, old) in measures.iter_mut().zip(self.measures.iter()) {
            new.meter = old.meter;
        }
        log::debug!(
            "regenerating measures: {} -> {}",
            self.measures.len(),
            count
        );
        self.measures = measures;
        self.rebuild_time_map();
        self.rebuild_geometry();
        Ok(())
    }

    fn rebuild_time_map(&mut self) {
        self.time_map = TimeMap::build_with_default(
            &self.tempo_markers,
            &self.measures,
            self.config.default_bpm,
        );
        self.time_map.assign_measure_times(&mut self.measures);
    }

    /// Seconds at absolute musical position.
    pub fn get_time(&self, position: f64) -> f64 {
        self.time_map.get_time(position)
    }

    pub fn time_of(&self, item: &impl HasPosition) -> f64 {
        self.get_time(item.position().value())
    }

    /// Absolute musical position at the given seconds.
    pub fn get_position(&self, seconds: f64) -> f64 {
        self.time_map.get_position(seconds)
    }

    // Lanes.

    pub fn add_lane(&mut self, division: u32) -> ChartResult<LaneId> {
        if division == 0 {
            return Err(ChartError::InvalidDivision);
        }
        let id = LaneId(self.next_id());
        self.lanes.insert(id, Lane::new(id, division));
        self.lane_geometry.insert(id, Vec::new());
        Ok(id)
    }

    pub fn add_default_lane(&mut self) -> ChartResult<LaneId> {
        self.add_lane(self.config.default_lane_division)
    }

    /// Remove lane with its control points, notes and their note lines.
    pub fn remove_lane(&mut self, id: LaneId) -> ChartResult<Lane> {
        let lane = self.lanes.remove(&id).ok_or(ChartError::LaneNotFound(id))?;
        for point in lane.control_point_ids.iter() {
            self.control_points.remove(point);
        }
        let note_ids = self.notes_by_lane.remove(&id).unwrap_or_default();
        for note in note_ids.iter() {
            self.notes.remove(note);
        }
        self.note_lines.retain(|_, line| {
            !note_ids.contains(&line.head) && !note_ids.contains(&line.tail)
        });
        self.lane_geometry.remove(&id);
        Ok(lane)
    }

    pub fn add_control_point(
        &mut self,
        lane_id: LaneId,
        position: MusicalPosition,
        horizontal_position: RationalPosition,
        horizontal_size: f64,
    ) -> ChartResult<ControlPointId> {
        if !self.lanes.contains_key(&lane_id) {
            return Err(ChartError::LaneNotFound(lane_id));
        }
        self.check_measure(position.measure_index)?;
        Self::check_sub_position("measurePosition", position.sub_position)?;
        if !horizontal_position.is_valid() {
            return Err(ChartError::InvalidRational {
                field: "horizontalPosition",
                value: horizontal_position,
            });
        }
        let point = LaneControlPoint {
            id: ControlPointId(self.next_id()),
            lane_id,
            measure_index: position.measure_index,
            measure_position: position.sub_position,
            horizontal_position,
            horizontal_size,
        };
        let id = point.id;
        self.insert_control_point(point);
        self.rebuild_lane_geometry(lane_id);
        Ok(id)
    }

    /// Insert already validated point.
    fn insert_control_point(&mut self, point: LaneControlPoint) {
        let points = &self.control_points;
        if let Some(lane) = self.lanes.get_mut(&point.lane_id) {
            lane.insert_control_point(&point, |id| {
                points.get(&id).map(|p| p.position())
            });
        }
        self.control_points.insert(point.id, point);
    }

    pub fn remove_control_point(
        &mut self,
        id: ControlPointId,
    ) -> ChartResult<LaneControlPoint> {
        let point = self
            .control_points
            .remove(&id)
            .ok_or(ChartError::ControlPointNotFound(id))?;
        if let Some(lane) = self.lanes.get_mut(&point.lane_id) {
            lane.remove_control_point(id);
        }
        self.rebuild_lane_geometry(point.lane_id);
        Ok(point)
    }

    // Notes.

    /// Add note, assigning it a new id. The id of the given note is ignored.
    pub fn add_note(&mut self, mut note: Note) -> ChartResult<NoteId> {
        self.validate_note(&note)?;
        note.id = NoteId(self.next_id());
        let id = note.id;
        self.insert_note(note);
        Ok(id)
    }

    fn validate_note(&self, note: &Note) -> ChartResult<()> {
        if !self.lanes.contains_key(&note.lane_id) {
            return Err(ChartError::LaneNotFound(note.lane_id));
        }
        self.check_measure(note.measure_index)?;
        Self::check_sub_position("measurePosition", note.measure_position)?;
        if !note.horizontal_position.is_valid() {
            return Err(ChartError::InvalidRational {
                field: "horizontalPosition",
                value: note.horizontal_position,
            });
        }
        let kind = self
            .note_kinds
            .resolve(&note.kind)
            .ok_or_else(|| ChartError::UnknownNoteKind(note.kind.clone()))?;
        kind.validate(note).map_err(|reason| ChartError::NoteRejected {
            kind: note.kind.clone(),
            reason,
        })
    }

    fn insert_note(&mut self, note: Note) {
        let position = note.position();
        let notes = &self.notes;
        let ids = self.notes_by_lane.entry(note.lane_id).or_default();
        let idx = ids.partition_point(|id| {
            notes
                .get(id)
                .map(|other| other.position() <= position)
                .unwrap_or(true)
        });
        ids.insert(idx, note.id);
        self.notes.insert(note.id, note);
    }

    /// Remove note, and every note line attached to it.
    pub fn remove_note(&mut self, id: NoteId) -> ChartResult<Note> {
        let note = self.notes.remove(&id).ok_or(ChartError::NoteNotFound(id))?;
        if let Some(ids) = self.notes_by_lane.get_mut(&note.lane_id) {
            ids.retain(|other| *other != id);
        }
        self.note_lines
            .retain(|_, line| line.head != id && line.tail != id);
        Ok(note)
    }

    /// Connect two notes. Head should be of kind, that can start a line,
    /// and tail should be placed later.
    pub fn add_note_line(
        &mut self,
        head: NoteId,
        tail: NoteId,
    ) -> ChartResult<NoteLineId> {
        let invalid = |reason: &str| ChartError::InvalidNoteLine {
            head,
            tail,
            reason: reason.to_string(),
        };
        let head_note =
            self.notes.get(&head).ok_or(ChartError::NoteNotFound(head))?;
        let tail_note =
            self.notes.get(&tail).ok_or(ChartError::NoteNotFound(tail))?;
        if head_note.position() >= tail_note.position() {
            return Err(invalid("tail should be placed after head"));
        }
        let can_start = self
            .note_kinds
            .resolve(&head_note.kind)
            .map(|kind| kind.can_start_line())
            .unwrap_or(false);
        if !can_start {
            return Err(invalid("head kind can not start a line"));
        }
        let id = NoteLineId(self.next_id());
        self.note_lines.insert(id, NoteLine { id, head, tail });
        Ok(id)
    }

    pub fn remove_note_line(&mut self, id: NoteLineId) -> ChartResult<NoteLine> {
        self.note_lines
            .remove(&id)
            .ok_or(ChartError::NoteLineNotFound(id))
    }

    // Geometry.

    /// Let the layout collaborator place measures, then rebuild lanes.
    pub fn apply_layout(&mut self, layout: &impl MeasureLayout) {
        layout.layout(&mut self.measures);
        self.rebuild_geometry();
    }

    fn rebuild_geometry(&mut self) {
        let ids: Vec<LaneId> = self.lanes.keys().copied().collect();
        for id in ids {
            self.rebuild_lane_geometry(id);
        }
    }

    fn rebuild_lane_geometry(&mut self, id: LaneId) {
        let points: Vec<LaneControlPoint> =
            self.lane_control_points(id).cloned().collect();
        let segments = get_lines(&points, &self.measures);
        log::debug!(
            "lane {:?}: {} control points, {} segments",
            id,
            points.len(),
            segments.len()
        );
        self.lane_geometry.insert(id, segments);
    }

    /// Cached segments of the lane. Empty for unknown lanes.
    pub fn get_lines(&self, id: LaneId) -> &[Segment] {
        self.lane_geometry
            .get(&id)
            .map(|segments| segments.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_note_point_info(
        &self,
        lane: LaneId,
        measure_index: u32,
        horizontal: &RationalPosition,
        vertical: &RationalPosition,
    ) -> Option<LinePointInfo> {
        let measure = self.measure(measure_index)?;
        interpolator::get_note_point_info(
            self.get_lines(lane),
            measure,
            horizontal,
            vertical,
        )
    }

    /// Grid cell of any lane under the pointer.
    ///
    /// Only measures, whose rect spans the pointer vertically, are queried.
    pub fn get_note_point_info_from_mouse_position(
        &self,
        mouse: Vector2,
        measure_division: u32,
    ) -> Option<GridCell> {
        self.measures
            .iter()
            .filter(|measure| match measure.rect {
                Some(rect) => rect.contains(Vector2::new(rect.x, mouse.y)),
                None => false,
            })
            .find_map(|measure| {
                self.lanes.values().find_map(|lane| {
                    interpolator::get_note_point_info_from_mouse_position(
                        lane,
                        self.get_lines(lane.id),
                        measure,
                        measure_division,
                        mouse,
                    )
                })
            })
    }

    /// One cell wide note, that would be placed at the grid cell.
    pub fn note_at_cell(
        &self,
        cell: &GridCell,
        measure_division: u32,
        kind: impl Into<String>,
    ) -> ChartResult<Note> {
        let lane = self
            .lanes
            .get(&cell.lane)
            .ok_or(ChartError::LaneNotFound(cell.lane))?;
        if measure_division == 0 {
            return Err(ChartError::InvalidDivision);
        }
        Ok(Note::new(
            lane.id,
            MusicalPosition::new(
                cell.measure,
                RationalPosition::new(
                    cell.vertical_index as i64,
                    measure_division as i64,
                ),
            ),
            RationalPosition::new(
                cell.horizontal_index as i64,
                lane.division as i64,
            ),
            1,
            kind,
        ))
    }

    /// Screen rect of the note, centered vertically on its position.
    ///
    /// None if the note is not rendered at the moment.
    pub fn get_bounds(&self, id: NoteId) -> Option<Rect> {
        let note = self.notes.get(&id)?;
        let info = self.get_note_point_info(
            note.lane_id,
            note.measure_index,
            &note.horizontal_position,
            &note.measure_position,
        )?;
        let denominator = note.horizontal_position.denominator;
        let width = match denominator > 0 {
            true => info.width * note.horizontal_size as f64 / denominator as f64,
            false => 0.0,
        };
        let height = self.config.note_height;
        Some(Rect::new(
            info.point.x,
            info.point.y - height / 2.0,
            width,
            height,
        ))
    }

    /// Points of the head and the tail of the line.
    pub fn get_note_line_bounds(
        &self,
        id: NoteLineId,
    ) -> Option<(LinePointInfo, LinePointInfo)> {
        let line = self.note_lines.get(&id)?;
        let point_of = |id: NoteId| {
            let note = self.notes.get(&id)?;
            self.get_note_point_info(
                note.lane_id,
                note.measure_index,
                &note.horizontal_position,
                &note.measure_position,
            )
        };
        Some((point_of(line.head)?, point_of(line.tail)?))
    }

    // History.

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            notes: self.notes.clone(),
            note_lines: self.note_lines.clone(),
        }
    }

    /// Commit notes and note lines to history.
    ///
    /// Returns false if nothing changed since the last commit.
    pub fn save(&mut self) -> ChartResult<bool> {
        let snapshot = self.snapshot();
        Ok(self.history.save(&snapshot)?)
    }

    /// Returns false if there is nothing to undo.
    ///
    /// If history replay is inconsistent, or it restores notes on lanes
    /// and measures that are gone, history is disabled and the chart is
    /// left as it is.
    pub fn undo(&mut self) -> ChartResult<bool> {
        let (lanes, measure_count) = (&self.lanes, self.measures.len());
        let replayed = self.history.undo_checked(|snapshot| {
            check_references(snapshot, lanes, measure_count)
        })?;
        match replayed {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> ChartResult<bool> {
        let (lanes, measure_count) = (&self.lanes, self.measures.len());
        let replayed = self.history.redo_checked(|snapshot| {
            check_references(snapshot, lanes, measure_count)
        })?;
        match replayed {
            Some(snapshot) => {
                self.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
    pub fn history(&self) -> &History {
        &self.history
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.notes = snapshot.notes;
        self.note_lines = snapshot.note_lines;
        self.rebuild_note_index();
    }

    fn rebuild_note_index(&mut self) {
        self.notes_by_lane.clear();
        let mut notes: Vec<&Note> = self.notes.values().collect();
        crate::primitives::sort_by_position(&mut notes);
        for note in notes {
            self.notes_by_lane
                .entry(note.lane_id)
                .or_default()
                .push(note.id);
        }
    }
}

/// Lanes and measures are not kept in history: notes of a replayed
/// snapshot should still reference live ones.
fn check_references(
    snapshot: &Snapshot,
    lanes: &BTreeMap<LaneId, Lane>,
    measure_count: usize,
) -> Result<(), String> {
    for note in snapshot.notes.values() {
        if !lanes.contains_key(&note.lane_id) {
            return Err(format!(
                "note {:?} references removed lane {:?}",
                note.id, note.lane_id
            ));
        }
        if note.measure_index as usize >= measure_count {
            return Err(format!(
                "note {:?} references removed measure {}",
                note.id, note.measure_index
            ));
        }
    }
    Ok(())
}
