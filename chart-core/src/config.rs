//! Settings of the editor session.
//!
//! Every field has a default, so a partial JSON file is a valid config.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{DocumentError, DocumentResult},
    primitives::{RationalPosition, DEFAULT_BPM, MEASURE_CEILING, MEASURE_LIMIT},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Amount of measures generated eagerly.
    pub measure_count: u32,
    /// Tempo before the first marker.
    pub default_bpm: f64,
    pub default_meter: RationalPosition,
    /// Horizontal division of newly created lanes.
    pub default_lane_division: u32,
    /// Height of note bounds in screen units.
    pub note_height: f64,
    /// Maximum undo steps, 0 for unlimited.
    pub history_capacity: usize,
}
impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            measure_count: MEASURE_CEILING,
            default_bpm: DEFAULT_BPM,
            default_meter: RationalPosition::new(4, 4),
            default_lane_division: 4,
            note_height: 10.0,
            history_capacity: 256,
        }
    }
}
impl EditorConfig {
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> DocumentResult<Self> {
        let path = path.as_ref();
        log::debug!("loading editor config from {:?}", path);
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> DocumentResult<()> {
        let invalid = |reason: &str| DocumentError::InvalidValue {
            entity: "config".to_string(),
            reason: reason.to_string(),
        };
        if !self.default_meter.is_valid() {
            return Err(DocumentError::InvalidDenominator {
                entity: "config".to_string(),
                field: "defaultMeter",
            });
        }
        if !(self.default_bpm.is_finite() && self.default_bpm > 0.0) {
            return Err(invalid("defaultBpm should be positive"));
        }
        if self.measure_count > MEASURE_LIMIT {
            return Err(invalid("measureCount is beyond the measure limit"));
        }
        if self.default_lane_division == 0 {
            return Err(invalid("defaultLaneDivision should be positive"));
        }
        Ok(())
    }
}
