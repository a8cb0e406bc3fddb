//! Persisted chart: JSON document with six top-level collections.
//!
//! Every rational is stored as `{"numerator": n, "denominator": d}` and is
//! read back as is, never through a float. Loading parses the whole file
//! to a [serde_json::Value] first and then deserializes every entity on
//! its own, so an error names the collection and the index of the
//! offending entity.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use itertools::Itertools;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Chart, Note, NoteKindRegistry, NoteLine};
use crate::{
    config::EditorConfig,
    error::{DocumentError, DocumentResult},
    geometry::{Lane, LaneControlPoint, LaneId},
    history::History,
    primitives::{
        sort_by_position, Measure, RationalPosition, TempoMarker, MEASURE_LIMIT,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDocument {
    pub measures: Vec<Measure>,
    pub tempo_markers: Vec<TempoMarker>,
    pub lanes: Vec<Lane>,
    pub control_points: Vec<LaneControlPoint>,
    pub notes: Vec<Note>,
    pub note_lines: Vec<NoteLine>,
}

fn entity(collection: &str, index: usize) -> String {
    format!("{}[{}]", collection, index)
}

fn collection<T: DeserializeOwned>(
    root: &Map<String, Value>,
    name: &'static str,
) -> DocumentResult<Vec<T>> {
    root.get(name)
        .ok_or(DocumentError::MissingCollection(name))?
        .as_array()
        .ok_or(DocumentError::NotAnArray(name))?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::deserialize(item).map_err(|source| DocumentError::Entity {
                collection: name,
                index,
                source,
            })
        })
        .collect()
}

fn check_denominator(
    value: &RationalPosition,
    entity: impl Fn() -> String,
    field: &'static str,
) -> DocumentResult<()> {
    match value.is_valid() {
        true => Ok(()),
        false => Err(DocumentError::InvalidDenominator {
            entity: entity(),
            field,
        }),
    }
}

/// Offsets inside a measure should be in `[0, 1)`.
fn check_sub_position(
    value: &RationalPosition,
    entity: impl Fn() -> String,
    field: &'static str,
) -> DocumentResult<()> {
    check_denominator(value, &entity, field)?;
    match value.is_sub_position() {
        true => Ok(()),
        false => Err(DocumentError::InvalidValue {
            entity: entity(),
            reason: format!("{} should be inside [0, 1), got {}", field, value),
        }),
    }
}

fn check_unique<K: Ord>(
    collection: &str,
    ids: impl Iterator<Item = K>,
) -> DocumentResult<()> {
    let mut seen = BTreeSet::new();
    for (index, id) in ids.enumerate() {
        if !seen.insert(id) {
            return Err(DocumentError::DuplicateId {
                entity: entity(collection, index),
            });
        }
    }
    Ok(())
}

impl ChartDocument {
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        let root = value.as_object().ok_or(DocumentError::NotAnObject)?;
        let document = Self {
            measures: collection(root, "measures")?,
            tempo_markers: collection(root, "tempoMarkers")?,
            lanes: collection(root, "lanes")?,
            control_points: collection(root, "controlPoints")?,
            notes: collection(root, "notes")?,
            note_lines: collection(root, "noteLines")?,
        };
        document.validate()?;
        Ok(document)
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let path = path.as_ref();
        log::debug!("loading chart from {:?}", path);
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> DocumentResult<()> {
        let path = path.as_ref();
        log::debug!("saving chart to {:?}", path);
        Ok(fs::write(path, self.to_json()?)?)
    }

    /// Check values and references of all entities.
    pub fn validate(&self) -> DocumentResult<()> {
        check_unique("measures", self.measures.iter().map(|m| m.index))?;
        for (index, measure) in self.measures.iter().enumerate() {
            let name = || entity("measures", index);
            if measure.index >= MEASURE_LIMIT {
                return Err(DocumentError::InvalidValue {
                    entity: name(),
                    reason: format!(
                        "index {} is beyond the limit of {} measures",
                        measure.index, MEASURE_LIMIT
                    ),
                });
            }
            check_denominator(&measure.meter, name, "meter")?;
            if measure.meter.numerator <= 0 {
                return Err(DocumentError::InvalidValue {
                    entity: name(),
                    reason: "meter should be positive".to_string(),
                });
            }
        }
        let measures: BTreeSet<u32> =
            self.measures.iter().map(|m| m.index).collect();
        let check_measure = |index: u32, name: String| {
            match measures.contains(&index) {
                true => Ok(()),
                false => Err(DocumentError::Dangling {
                    entity: name,
                    reference: format!("measure {}", index),
                }),
            }
        };

        for (index, marker) in self.tempo_markers.iter().enumerate() {
            let name = || entity("tempoMarkers", index);
            check_sub_position(&marker.sub_position, name, "subPosition")?;
            if !TempoMarker::is_valid_bpm(marker.bpm) {
                return Err(DocumentError::InvalidValue {
                    entity: name(),
                    reason: format!("bpm should be positive, got {}", marker.bpm),
                });
            }
            check_measure(marker.measure_index, name())?;
        }
        let mut markers: Vec<&TempoMarker> = self.tempo_markers.iter().collect();
        sort_by_position(&mut markers);
        if let Some((marker, _)) = markers
            .into_iter()
            .tuple_windows()
            .find(|(a, b)| {
                a.measure_index == b.measure_index
                    && a.sub_position == b.sub_position
            })
        {
            return Err(DocumentError::DuplicateId {
                entity: format!(
                    "tempoMarkers at measure {} {}",
                    marker.measure_index, marker.sub_position
                ),
            });
        }

        check_unique("lanes", self.lanes.iter().map(|lane| lane.id))?;
        check_unique(
            "controlPoints",
            self.control_points.iter().map(|point| point.id),
        )?;
        check_unique("notes", self.notes.iter().map(|note| note.id))?;
        check_unique("noteLines", self.note_lines.iter().map(|line| line.id))?;

        let points: BTreeMap<_, _> = self
            .control_points
            .iter()
            .map(|point| (point.id, point))
            .collect();
        for (index, lane) in self.lanes.iter().enumerate() {
            if lane.division == 0 {
                return Err(DocumentError::InvalidValue {
                    entity: entity("lanes", index),
                    reason: "division should be positive".to_string(),
                });
            }
            for id in lane.control_point_ids.iter() {
                match points.get(id) {
                    Some(point) if point.lane_id == lane.id => (),
                    _ => {
                        return Err(DocumentError::Dangling {
                            entity: entity("lanes", index),
                            reference: format!("control point {:?}", id),
                        })
                    }
                }
            }
        }

        let lanes: BTreeSet<_> = self.lanes.iter().map(|lane| lane.id).collect();
        let check_lane = |lane: LaneId, name: String| {
            match lanes.contains(&lane) {
                true => Ok(()),
                false => Err(DocumentError::Dangling {
                    entity: name,
                    reference: format!("lane {:?}", lane),
                }),
            }
        };
        for (index, point) in self.control_points.iter().enumerate() {
            let name = || entity("controlPoints", index);
            check_sub_position(&point.measure_position, name, "measurePosition")?;
            check_denominator(
                &point.horizontal_position,
                name,
                "horizontalPosition",
            )?;
            check_lane(point.lane_id, name())?;
            check_measure(point.measure_index, name())?;
        }
        for (index, note) in self.notes.iter().enumerate() {
            let name = || entity("notes", index);
            check_sub_position(&note.measure_position, name, "measurePosition")?;
            check_denominator(
                &note.horizontal_position,
                name,
                "horizontalPosition",
            )?;
            check_lane(note.lane_id, name())?;
            check_measure(note.measure_index, name())?;
        }

        let notes: BTreeSet<_> = self.notes.iter().map(|note| note.id).collect();
        for (index, line) in self.note_lines.iter().enumerate() {
            if let Some(missing) =
                [line.head, line.tail].into_iter().find(|id| !notes.contains(id))
            {
                return Err(DocumentError::Dangling {
                    entity: entity("noteLines", index),
                    reference: format!("note {:?}", missing),
                });
            }
        }
        Ok(())
    }

    /// Biggest id of any entity.
    fn max_id(&self) -> u64 {
        self.lanes
            .iter()
            .map(|lane| lane.id.0)
            .chain(self.control_points.iter().map(|point| point.id.0))
            .chain(self.notes.iter().map(|note| note.id.0))
            .chain(self.note_lines.iter().map(|line| line.id.0))
            .max()
            .unwrap_or(0)
    }
}

impl Chart {
    pub fn from_document(
        document: ChartDocument,
        config: EditorConfig,
    ) -> DocumentResult<Self> {
        Self::from_document_with_kinds(
            document,
            config,
            NoteKindRegistry::default(),
        )
    }

    /// Build the chart session from validated document.
    ///
    /// Note kinds are resolved here: notes of unknown kinds are rejected.
    /// Measures missing in the document are generated up to
    /// `config.measure_count` with the default meter. Measure count never
    /// exceeds [MEASURE_LIMIT].
    pub fn from_document_with_kinds(
        document: ChartDocument,
        config: EditorConfig,
        note_kinds: NoteKindRegistry,
    ) -> DocumentResult<Self> {
        document.validate()?;
        for (index, note) in document.notes.iter().enumerate() {
            let invalid = |reason: String| DocumentError::InvalidValue {
                entity: entity("notes", index),
                reason,
            };
            let kind = note_kinds.resolve(&note.kind).ok_or_else(|| {
                invalid(format!("unknown note kind `{}`", note.kind))
            })?;
            kind.validate(note).map_err(invalid)?;
        }

        let next_id = document.max_id() + 1;
        let count = document
            .measures
            .iter()
            .map(|measure| measure.index.saturating_add(1))
            .max()
            .unwrap_or(0)
            .max(config.measure_count)
            .min(MEASURE_LIMIT);
        let mut chart = Chart::with_note_kinds(config, note_kinds);
        chart.measures = Measure::generate(count, chart.config.default_meter);
        for measure in document.measures {
            if let Some(target) = chart.measures.get_mut(measure.index as usize) {
                target.meter = measure.meter;
            }
        }
        chart.tempo_markers = document.tempo_markers;
        sort_by_position(&mut chart.tempo_markers);

        for lane in document.lanes {
            chart.lanes.insert(lane.id, Lane::new(lane.id, lane.division));
        }
        for point in document.control_points {
            chart.insert_control_point(point);
        }
        for note in document.notes {
            chart.insert_note(note);
        }
        for line in document.note_lines {
            chart.note_lines.insert(line.id, line);
        }
        chart.next_id = next_id;

        chart.rebuild_time_map();
        chart.rebuild_geometry();
        chart.history = History::new(
            chart.snapshot(),
            chart.config.history_capacity,
        );
        log::debug!(
            "chart loaded: {} measures, {} lanes, {} notes",
            chart.measures.len(),
            chart.lanes.len(),
            chart.notes.len()
        );
        Ok(chart)
    }

    pub fn to_document(&self) -> ChartDocument {
        ChartDocument {
            measures: self.measures.clone(),
            tempo_markers: self.tempo_markers.clone(),
            lanes: self.lanes.values().cloned().collect(),
            control_points: self.control_points.values().cloned().collect(),
            notes: self.notes.values().cloned().collect(),
            note_lines: self.note_lines.values().cloned().collect(),
        }
    }

    pub fn load(
        path: impl AsRef<Path>,
        config: EditorConfig,
    ) -> DocumentResult<Self> {
        Self::from_document(ChartDocument::load(path)?, config)
    }

    /// Write the chart to disk. Undo history is not persisted.
    pub fn save_to(&self, path: impl AsRef<Path>) -> DocumentResult<()> {
        self.to_document().save(path)
    }
}
