//! Runner - Individual runner state and behavior
//!
//! Each runner has a position on the track, lap bookkeeping and a speed
//! fixed at build time. The race updates all runners each tick.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Descriptive data for one competitor, read-only to the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: u32,
    pub name: String,
    pub color: String,
    /// Condition rating in `1..=100`
    #[serde(default)]
    pub condition: Option<u32>,
}

impl Competitor {
    pub fn new(id: u32, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: u32) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Complete state for a single runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerState {
    /// Competitor ID
    pub id: u32,
    /// Competitor this runner animates
    pub competitor: Competitor,
    /// Horizontal offset in track-width units
    pub position: f64,
    /// Overall completion (0-100)
    pub progress: f64,
    /// Index into the segment list
    pub lap_index: usize,
    /// Distance covered within the current segment
    pub lap_progress: f64,
    /// Set once every segment is done
    pub finished: bool,
    /// Distance units per second
    pub speed: f64,
}

impl RunnerState {
    /// Create a fresh runner, deriving its speed once
    pub fn new<R: Rng + ?Sized>(competitor: Competitor, rng: &mut R) -> Self {
        let speed = Runner::speed_for(competitor.condition, rng);
        Self {
            id: competitor.id,
            competitor,
            position: 0.0,
            progress: 0.0,
            lap_index: 0,
            lap_progress: 0.0,
            finished: false,
            speed,
        }
    }

    /// Reset runner to the starting line, keeping identity and speed
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.progress = 0.0;
        self.lap_index = 0;
        self.lap_progress = 0.0;
        self.finished = false;
    }
}

/// Runner simulation logic
pub struct Runner;

impl Runner {
    /// Constants
    pub const BASE_SPEED: f64 = 120.0;
    pub const SPEED_RANGE: f64 = 100.0;
    pub const FINISH_EPSILON: f64 = 1e-4;

    /// Speed from a condition rating, or a random draw when there is none.
    ///
    /// A zero rating counts as missing.
    pub fn speed_for<R: Rng + ?Sized>(condition: Option<u32>, rng: &mut R) -> f64 {
        match condition.filter(|c| *c > 0) {
            Some(condition) => Self::BASE_SPEED + (condition as f64 / 100.0) * Self::SPEED_RANGE,
            None => Self::BASE_SPEED + rng.gen::<f64>() * Self::SPEED_RANGE,
        }
    }

    /// Update a single runner for one tick.
    ///
    /// Returns `true` when the runner crossed the finish line during this
    /// call. Finished runners are left untouched.
    pub fn update(
        state: &mut RunnerState,
        laps: &[f64],
        delta: f64,
        track_width: f64,
        epsilon: f64,
    ) -> bool {
        if state.finished {
            return false;
        }

        // Segment list shrank under this runner (or is empty)
        let Some(&lap_distance) = laps.get(state.lap_index) else {
            state.lap_index = laps.len();
            Self::finish(state, track_width);
            return true;
        };

        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };

        // Never overshoot the current segment
        let remaining = (lap_distance - state.lap_progress).max(0.0);
        let step = (state.speed * delta).min(remaining);
        state.lap_progress += step;

        let total_distance: f64 = laps.iter().sum();
        let completed: f64 = laps[..state.lap_index].iter().sum();
        state.progress = if total_distance > 0.0 {
            ((completed + state.lap_progress) / total_distance * 100.0).min(100.0)
        } else {
            100.0
        };
        state.position = state.progress / 100.0 * track_width;

        if state.lap_progress >= lap_distance - epsilon {
            state.lap_index += 1;
            state.lap_progress = 0.0;

            if state.lap_index >= laps.len() {
                Self::finish(state, track_width);
                return true;
            }
        }

        false
    }

    fn finish(state: &mut RunnerState, track_width: f64) {
        state.lap_progress = 0.0;
        state.finished = true;
        state.progress = 100.0;
        state.position = track_width;
    }
}

/// Compact runner state for the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerSnapshot {
    pub id: u32,
    pub name: String,
    pub color: String,
    pub position: f64,
    pub progress: f64,
    pub finished: bool,
}

impl From<&RunnerState> for RunnerSnapshot {
    fn from(state: &RunnerState) -> Self {
        Self {
            id: state.id,
            name: state.competitor.name.clone(),
            color: state.competitor.color.clone(),
            position: state.position,
            progress: state.progress,
            finished: state.finished,
        }
    }
}
