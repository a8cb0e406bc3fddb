use thiserror;

use crate::{
    chart::{NoteId, NoteLineId},
    geometry::{ControlPointId, LaneId},
    history::HistoryError,
    primitives::{MusicalPosition, RationalPosition, MEASURE_LIMIT},
};

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Lane not found: {0:?}")]
    LaneNotFound(LaneId),
    #[error("Control point not found: {0:?}")]
    ControlPointNotFound(ControlPointId),
    #[error("Note not found: {0:?}")]
    NoteNotFound(NoteId),
    #[error("Note line not found: {0:?}")]
    NoteLineNotFound(NoteLineId),
    #[error("Measure not found: {0}")]
    MeasureNotFound(u32),
    #[error("Can not have {0} measures, the limit is {}", MEASURE_LIMIT)]
    TooManyMeasures(u32),
    #[error("No tempo marker at {0:?}")]
    TempoMarkerNotFound(MusicalPosition),
    #[error("Invalid bpm: {0}")]
    InvalidBpm(f64),
    #[error("Invalid value of `{field}`: {value}")]
    InvalidRational {
        field: &'static str,
        value: RationalPosition,
    },
    #[error("Lane division should be positive")]
    InvalidDivision,
    #[error("Unknown note kind: `{0}`")]
    UnknownNoteKind(String),
    #[error("Note of kind `{kind}` is rejected: {reason}")]
    NoteRejected { kind: String, reason: String },
    #[error("Note line can not connect {head:?} and {tail:?}: {reason}")]
    InvalidNoteLine {
        head: NoteId,
        tail: NoteId,
        reason: String,
    },
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}
pub type ChartResult<T> = Result<T, ChartError>;

/// Errors of loading and saving persisted charts and configs.
///
/// Every error about persisted data names the offending entity: the core
/// never substitutes values for persisted data silently.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Can not read or write document: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Document root should be an object")]
    NotAnObject,
    #[error("Missing collection `{0}`")]
    MissingCollection(&'static str),
    #[error("Collection `{0}` should be an array")]
    NotAnArray(&'static str),
    #[error("Malformed entity {collection}[{index}]: {source}")]
    Entity {
        collection: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Non-positive denominator in {entity}.{field}")]
    InvalidDenominator { entity: String, field: &'static str },
    #[error("Invalid {entity}: {reason}")]
    InvalidValue { entity: String, reason: String },
    #[error("Duplicate id in {entity}")]
    DuplicateId { entity: String },
    #[error("{entity} references missing {reference}")]
    Dangling { entity: String, reference: String },
}
pub type DocumentResult<T> = Result<T, DocumentError>;
