//! Race - Race configuration and state management
//!
//! Holds the runners of the current round, the segment list, the track width
//! and the finish order. [`Race::step`] is the per-tick simulation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::race_engine::runner::{Competitor, Runner, RunnerSnapshot, RunnerState};

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Segment ("lap") distances, in order
    pub laps: Vec<f64>,
    /// Rendered track width
    pub track_width: f64,
    /// Tolerance for lap completion
    pub finish_epsilon: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            laps: vec![1200.0],
            track_width: 800.0,
            finish_epsilon: Runner::FINISH_EPSILON,
        }
    }
}

/// One finish-order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: u32,
    pub name: String,
    pub color: String,
    /// 1-based rank
    pub place: u32,
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    laps: Vec<f64>,
    track_width: f64,
    finish_epsilon: f64,
    /// All runners in build order
    runners: Vec<RunnerState>,
    /// Finish order
    placements: Vec<Placement>,
    /// Speed source for competitors without a condition rating
    rng: StdRng,
}

impl Race {
    /// Create a new race with the given configuration
    pub fn new(config: RaceConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a race whose random speeds come from `rng`
    pub fn with_rng(config: RaceConfig, rng: StdRng) -> Self {
        Self {
            laps: config.laps,
            track_width: config.track_width,
            finish_epsilon: config.finish_epsilon,
            runners: Vec::new(),
            placements: Vec::new(),
            rng,
        }
    }

    /// Replace all runners with fresh ones, one per competitor, in order
    pub fn build_runners(&mut self, competitors: &[Competitor]) {
        let rng = &mut self.rng;
        self.runners = competitors
            .iter()
            .cloned()
            .map(|competitor| RunnerState::new(competitor, &mut *rng))
            .collect();
        log::debug!("Built {} runners", self.runners.len());
    }

    /// Advance every active runner by `delta` seconds.
    ///
    /// Runners are processed in build order, so two runners finishing in the
    /// same tick are ranked in that order. Returns whether any runner is
    /// still running.
    pub fn step(&mut self, delta: f64) -> bool {
        let mut active = 0usize;

        for runner in &mut self.runners {
            if runner.finished {
                continue;
            }
            active += 1;

            let crossed = Runner::update(
                runner,
                &self.laps,
                delta,
                self.track_width,
                self.finish_epsilon,
            );

            if crossed {
                active -= 1;
                let place = self.placements.len() as u32 + 1;
                log::debug!("{} finished in place {}", runner.competitor.name, place);
                self.placements.push(Placement {
                    id: runner.competitor.id,
                    name: runner.competitor.name.clone(),
                    color: runner.competitor.color.clone(),
                    place,
                });
            }
        }

        active > 0
    }

    /// Replace the segment list; runner progress is left as is
    pub fn set_laps(&mut self, laps: Vec<f64>) {
        self.laps = laps;
    }

    /// Store a new width and re-project every runner onto it
    pub fn set_track_width(&mut self, width: f64) {
        self.track_width = width;
        for runner in &mut self.runners {
            runner.position = if runner.finished {
                width
            } else {
                runner.progress / 100.0 * width
            };
        }
    }

    /// Zero every runner's progress, keeping the runners themselves
    pub fn reset_runners(&mut self) {
        for runner in &mut self.runners {
            runner.reset();
        }
    }

    pub fn clear_placements(&mut self) {
        self.placements.clear();
    }

    pub fn laps(&self) -> &[f64] {
        &self.laps
    }

    pub fn total_distance(&self) -> f64 {
        self.laps.iter().sum()
    }

    pub fn track_width(&self) -> f64 {
        self.track_width
    }

    pub fn runners(&self) -> &[RunnerState] {
        &self.runners
    }

    pub fn runners_mut(&mut self) -> &mut [RunnerState] {
        &mut self.runners
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    /// Get current leader
    pub fn get_leader(&self) -> Option<&RunnerState> {
        self.runners
            .iter()
            .reduce(|best, r| if r.progress > best.progress { r } else { best })
    }

    /// Get runner by ID
    pub fn get_runner(&self, id: u32) -> Option<&RunnerState> {
        self.runners.iter().find(|r| r.id == id)
    }

    /// Get read-only snapshot for the rendering layer
    pub fn get_snapshot(&self, running: bool) -> RaceSnapshot {
        RaceSnapshot {
            running,
            runners: self.runners.iter().map(RunnerSnapshot::from).collect(),
            placements: self.placements.clone(),
            total_distance: self.total_distance(),
            track_width: self.track_width,
        }
    }
}

impl Default for Race {
    fn default() -> Self {
        Self::new(RaceConfig::default())
    }
}

/// Race snapshot handed to the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub running: bool,
    pub runners: Vec<RunnerSnapshot>,
    pub placements: Vec<Placement>,
    pub total_distance: f64,
    pub track_width: f64,
}
