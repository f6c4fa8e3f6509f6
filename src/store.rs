//! Store - Round schedule, roster and result history
//!
//! The orchestrator talks to this state only through [`RaceStateHolder`].
//! [`RaceStore`] is the in-memory holder; it also owns roster and schedule
//! generation and the normalization of persisted participant records.

use std::fmt;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ScheduleConfig;
use crate::error::RaceError;
use crate::race_engine::race::Placement;
use crate::race_engine::runner::Competitor;

const HORSE_NAMES: [&str; 20] = [
    "Thunder Bolt",
    "Lightning Strike",
    "Storm Rider",
    "Wind Walker",
    "Fire Dancer",
    "Shadow Runner",
    "Golden Arrow",
    "Silver Bullet",
    "Midnight Express",
    "Sunrise Glory",
    "Ocean Wave",
    "Mountain Peak",
    "Desert Wind",
    "Forest Spirit",
    "Sky Dancer",
    "Star Chaser",
    "Moon Runner",
    "Sun Blazer",
    "River Flow",
    "Eagle Soar",
];

const COLORS: [&str; 20] = [
    "#FF6347", "#40E0D0", "#4682B4", "#9ACD32", "#FFD700", "#DA70D6", "#98FB98", "#FFDAB9",
    "#BA55D3", "#87CEFA", "#FFA07A", "#66CDAA", "#FA8072", "#87CEEB", "#D8BFD8", "#7FFFD4",
    "#F0E68C", "#DB7093", "#AFEEEE", "#DDA0DD",
];

/// One scheduled round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundPlan {
    pub distance: f64,
    pub participants: Vec<Competitor>,
}

/// Result committed once per completed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based round number
    pub round: u32,
    pub distance: f64,
    pub placements: Vec<Placement>,
}

/// State the orchestrator reads from and commits to
pub trait RaceStateHolder {
    fn current_round(&self) -> usize;
    fn schedule(&self) -> &[RoundPlan];
    fn is_racing(&self) -> bool;
    /// Cosmetic lap labels, passed through untouched
    fn lap_names(&self) -> &[String];

    fn set_racing(&mut self, racing: bool);
    /// Clamped to the schedule bounds
    fn set_current_round(&mut self, round: i64);
    /// Append a result; returns `true` once every round has a result
    fn add_race_result(&mut self, result: RoundResult) -> bool;

    fn current_round_plan(&self) -> Option<&RoundPlan> {
        self.schedule().get(self.current_round())
    }

    fn current_participants(&self) -> &[Competitor] {
        self.current_round_plan()
            .map(|plan| plan.participants.as_slice())
            .unwrap_or(&[])
    }
}

/// Label for the start/pause control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceButton {
    Start,
    Continue,
    Pause,
}

impl fmt::Display for RaceButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RaceButton::Start => "START",
            RaceButton::Continue => "CONTINUE",
            RaceButton::Pause => "PAUSE",
        };
        f.write_str(label)
    }
}

/// In-memory race state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceStore {
    pub horses: Vec<Competitor>,
    pub race_schedule: Vec<RoundPlan>,
    pub current_round: usize,
    pub race_results: Vec<RoundResult>,
    pub is_racing: bool,
    pub lap_names: Vec<String>,
    pub game_over: bool,
}

impl RaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a ready-made schedule, starting at round 0
    pub fn with_schedule(schedule: Vec<RoundPlan>) -> Self {
        Self {
            race_schedule: schedule,
            ..Self::default()
        }
    }

    /// Load persisted state.
    ///
    /// Participant records may be plain or wrapped as
    /// `{"_custom": {"value": {...}}}`; a results log that is not a list is
    /// dropped.
    pub fn from_json(json: &str) -> Result<Self, RaceError> {
        let persisted: PersistedStore = serde_json::from_str(json)?;
        Ok(persisted.into_store())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RaceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RaceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, RaceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the current round from loosely typed input
    pub fn set_current_round_value(&mut self, value: &Value) {
        self.set_current_round(coerce_round(value));
    }

    pub fn toggle_racing(&mut self) {
        self.set_racing(!self.is_racing);
    }

    pub fn has_program(&self) -> bool {
        !self.race_schedule.is_empty()
    }

    pub fn total_rounds(&self) -> usize {
        self.race_schedule.len()
    }

    pub fn can_start_race(&self) -> bool {
        self.has_program() && self.current_round < self.total_rounds()
    }

    pub fn race_button(&self) -> RaceButton {
        if self.is_racing {
            RaceButton::Pause
        } else if self.current_round > 0 {
            RaceButton::Continue
        } else {
            RaceButton::Start
        }
    }

    /// Draw a fresh stable of named competitors with random conditions
    pub fn generate_horses<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut names = HORSE_NAMES;
        let mut colors = COLORS;
        names.shuffle(rng);
        colors.shuffle(rng);

        self.horses = names
            .iter()
            .zip(colors.iter())
            .enumerate()
            .map(|(i, (name, color))| {
                Competitor::new(i as u32 + 1, *name, *color).with_condition(rng.gen_range(1..=100))
            })
            .collect();
        log::info!("Generated {} horses", self.horses.len());
    }

    /// Build one round per configured distance from random picks of the stable
    pub fn generate_schedule<R: Rng + ?Sized>(&mut self, config: &ScheduleConfig, rng: &mut R) {
        self.race_schedule = config
            .distances
            .iter()
            .map(|&distance| {
                let participants = self
                    .horses
                    .choose_multiple(rng, config.participants_per_round)
                    .cloned()
                    .collect();
                RoundPlan {
                    distance,
                    participants,
                }
            })
            .collect();
        self.current_round = 0;
        self.race_results.clear();
        self.game_over = false;
        self.lap_names = config.lap_names.clone();
        log::info!("Generated schedule of {} rounds", self.race_schedule.len());
    }
}

impl RaceStateHolder for RaceStore {
    fn current_round(&self) -> usize {
        self.current_round
    }

    fn schedule(&self) -> &[RoundPlan] {
        &self.race_schedule
    }

    fn is_racing(&self) -> bool {
        self.is_racing
    }

    fn lap_names(&self) -> &[String] {
        &self.lap_names
    }

    fn set_racing(&mut self, racing: bool) {
        self.is_racing = racing;
    }

    fn set_current_round(&mut self, round: i64) {
        let max_index = self.race_schedule.len().saturating_sub(1) as i64;
        let clamped = round.clamp(0, max_index);
        if clamped != round {
            log::warn!("Round {} out of range, clamped to {}", round, clamped);
        }
        self.current_round = clamped as usize;
    }

    fn add_race_result(&mut self, result: RoundResult) -> bool {
        self.race_results.push(result);
        let complete = !self.race_schedule.is_empty()
            && self.race_results.len() >= self.race_schedule.len();
        if complete {
            self.game_over = true;
        }
        complete
    }
}

/// Loose numeric conversion: numbers, numeric strings and booleans count,
/// anything else is round 0
fn coerce_round(value: &Value) -> i64 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    // Saturating cast: infinities pin to the ends, NaN is 0
    number.trunc() as i64
}

/// Participant record as persisted, possibly wrapped
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParticipantRecord {
    Wrapped {
        #[serde(rename = "_custom")]
        custom: CustomValue,
    },
    Plain(Competitor),
}

#[derive(Debug, Deserialize)]
struct CustomValue {
    value: Competitor,
}

impl From<ParticipantRecord> for Competitor {
    fn from(record: ParticipantRecord) -> Self {
        match record {
            ParticipantRecord::Wrapped { custom } => custom.value,
            ParticipantRecord::Plain(competitor) => competitor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PersistedRound {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    participants: Vec<ParticipantRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedStore {
    #[serde(default)]
    horses: Vec<Competitor>,
    #[serde(default)]
    race_schedule: Vec<PersistedRound>,
    #[serde(default)]
    current_round: Value,
    #[serde(default)]
    race_results: Value,
    #[serde(default)]
    is_racing: bool,
    #[serde(default)]
    lap_names: Vec<String>,
}

impl PersistedStore {
    fn into_store(self) -> RaceStore {
        let race_results = match self.race_results {
            Value::Null => Vec::new(),
            Value::Array(items) => match serde_json::from_value(Value::Array(items)) {
                Ok(results) => results,
                Err(err) => {
                    log::warn!("Discarding unreadable race results: {}", err);
                    Vec::new()
                }
            },
            other => {
                log::warn!("Race results log is not a list ({}), resetting", other);
                Vec::new()
            }
        };

        let mut store = RaceStore {
            horses: self.horses,
            race_schedule: self
                .race_schedule
                .into_iter()
                .map(|round| RoundPlan {
                    distance: round.distance,
                    participants: round.participants.into_iter().map(Competitor::from).collect(),
                })
                .collect(),
            current_round: 0,
            race_results,
            is_racing: self.is_racing,
            lap_names: self.lap_names,
            game_over: false,
        };
        store.set_current_round_value(&self.current_round);
        store.game_over = store.has_program() && store.race_results.len() >= store.total_rounds();
        store
    }
}
