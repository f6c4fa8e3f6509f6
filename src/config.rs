//! Engine configuration
//!
//! Every section falls back to its defaults, so a partial JSON file (or an
//! empty object) is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RaceError;
use crate::race_engine::race::RaceConfig;
use crate::race_engine::simulation::FixedStepFrames;

/// Frame pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Interval between deterministic frames
    pub interval_ms: f64,
    /// Target rate for wall-clock frames (ticks per second)
    pub tick_rate: f32,
}

impl FrameConfig {
    pub const MIN_TICK_RATE: f32 = 1.0;
    pub const MAX_TICK_RATE: f32 = 1000.0;
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            interval_ms: FixedStepFrames::DEFAULT_INTERVAL_MS,
            tick_rate: 60.0,
        }
    }
}

/// Schedule generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// One round per distance, in order
    pub distances: Vec<f64>,
    pub participants_per_round: usize,
    pub lap_names: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            distances: vec![1200.0, 1400.0, 1600.0, 1800.0, 2000.0, 2200.0],
            participants_per_round: 10,
            lap_names: ["1ST", "2ND", "3RD", "4TH", "5TH", "6TH"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub race: RaceConfig,
    pub frames: FrameConfig,
    pub schedule: ScheduleConfig,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, RaceError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RaceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading engine config from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Replace values the simulation cannot use with defaults
    pub fn normalized(mut self) -> Self {
        let defaults = EngineConfig::default();

        let laps: Vec<f64> = self
            .race
            .laps
            .iter()
            .copied()
            .filter(|lap| lap.is_finite() && *lap > 0.0)
            .collect();
        if laps.len() != self.race.laps.len() {
            log::warn!("Dropped {} non-positive laps", self.race.laps.len() - laps.len());
        }
        self.race.laps = if laps.is_empty() { defaults.race.laps } else { laps };

        if !(self.race.track_width.is_finite() && self.race.track_width > 0.0) {
            log::warn!("Invalid track width {}, using default", self.race.track_width);
            self.race.track_width = defaults.race.track_width;
        }
        if !(self.race.finish_epsilon.is_finite() && self.race.finish_epsilon >= 0.0) {
            self.race.finish_epsilon = defaults.race.finish_epsilon;
        }
        if !(self.frames.interval_ms.is_finite() && self.frames.interval_ms > 0.0) {
            log::warn!("Invalid frame interval {}, using default", self.frames.interval_ms);
            self.frames.interval_ms = defaults.frames.interval_ms;
        }
        if !(self.frames.tick_rate.is_finite() && self.frames.tick_rate > 0.0) {
            log::warn!("Invalid tick rate {}, using default", self.frames.tick_rate);
            self.frames.tick_rate = defaults.frames.tick_rate;
        }
        self.frames.tick_rate = self
            .frames
            .tick_rate
            .clamp(FrameConfig::MIN_TICK_RATE, FrameConfig::MAX_TICK_RATE);
        self.schedule
            .distances
            .retain(|distance| distance.is_finite() && *distance > 0.0);

        self
    }
}
