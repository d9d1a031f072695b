use chrono::{Duration, NaiveTime};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::{RaceError, Result};
use crate::types::{parse_duration, parse_time_of_day};

/// Race settings as they appear in `config.json`.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    laps: usize,
    lap_len: f64,
    penalty_len: f64,
    firing_lines: u32,
    start: String,
    start_delta: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceConfig {
    /// Laps on the main course
    pub laps: usize,
    /// Main lap length (m)
    pub lap_len: f64,
    /// Penalty loop length (m)
    pub penalty_len: f64,
    /// Firing lines over the whole race, five targets each
    pub firing_lines: u32,
    /// Planned start of the race
    pub start: NaiveTime,
    /// Allowed delay after a competitor's drawn start time
    pub start_delta: Duration,
}

impl RaceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            RaceError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(data)
            .map_err(|e| RaceError::Configuration(format!("invalid config JSON: {e}")))?;

        if raw.laps == 0 {
            return Err(RaceError::Configuration("laps must be at least 1".into()));
        }
        if !(raw.lap_len > 0.0) {
            return Err(RaceError::Configuration("lapLen must be positive".into()));
        }
        if !(raw.penalty_len > 0.0) {
            return Err(RaceError::Configuration("penaltyLen must be positive".into()));
        }
        if raw.firing_lines == 0 {
            return Err(RaceError::Configuration("firingLines must be at least 1".into()));
        }
        let start = parse_time_of_day(&raw.start).map_err(|e| {
            RaceError::Configuration(format!("invalid start `{}`: {e}", raw.start))
        })?;
        let start_delta = parse_duration(&raw.start_delta).map_err(|e| {
            RaceError::Configuration(format!("invalid startDelta `{}`: {e}", raw.start_delta))
        })?;

        Ok(Self {
            laps: raw.laps,
            lap_len: raw.lap_len,
            penalty_len: raw.penalty_len,
            firing_lines: raw.firing_lines,
            start,
            start_delta,
        })
    }
}
