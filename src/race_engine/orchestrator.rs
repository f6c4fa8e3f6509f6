//! Orchestrator - Multi-round race progression
//!
//! Binds an [`Animation`] to a [`RaceStateHolder`]: loads the current round,
//! commits results when a round finishes, advances to the next round and
//! ends the session when the schedule runs out.

use crate::config::EngineConfig;
use crate::race_engine::race::{Placement, Race, RaceSnapshot};
use crate::race_engine::runner::{Competitor, RunnerState};
use crate::race_engine::simulation::{Animation, FrameSource, TickOutcome};
use crate::store::{RaceStateHolder, RoundResult};

/// Holder values the bindings react to
#[derive(Debug, Clone, PartialEq)]
struct Observed {
    round: usize,
    roster: Vec<Competitor>,
    racing: bool,
}

impl Observed {
    fn capture<H: RaceStateHolder>(holder: &H) -> Self {
        Self {
            round: holder.current_round(),
            roster: holder.current_participants().to_vec(),
            racing: holder.is_racing(),
        }
    }
}

pub struct RaceOrchestrator<H, S> {
    holder: H,
    animation: Animation<S>,
    observed: Observed,
}

impl<H: RaceStateHolder, S: FrameSource> RaceOrchestrator<H, S> {
    pub fn new(holder: H, animation: Animation<S>) -> Self {
        let observed = Observed::capture(&holder);
        Self {
            holder,
            animation,
            observed,
        }
    }

    pub fn with_config(holder: H, config: &EngineConfig, frames: S) -> Self {
        let race = Race::new(config.race.clone());
        Self::new(holder, Animation::new(race, frames))
    }

    /// Load the current round's distance and roster into the animation
    pub fn initialize_round(&mut self) {
        if let Some(distance) = self.round_distance() {
            self.animation.set_laps(vec![distance]);
        }

        let participants = self.holder.current_participants().to_vec();
        let race = self.animation.race_mut();
        race.build_runners(&participants);
        race.clear_placements();

        log::info!(
            "Round {} ready: {} runners over {}",
            self.holder.current_round() + 1,
            participants.len(),
            self.animation.total_distance()
        );
    }

    /// Start (or resume) the current round.
    ///
    /// A round whose runners have all finished is not restarted; the session
    /// is over and the racing flag is cleared instead.
    pub fn start(&mut self) -> bool {
        let runners = self.animation.runners();
        if !runners.is_empty() && runners.iter().all(|r| r.finished) {
            log::info!("No runners left to race, ending session");
            self.holder.set_racing(false);
            self.observed.racing = false;
            return false;
        }
        self.animation.start(None)
    }

    pub fn stop(&mut self) {
        self.animation.stop();
    }

    /// Commit the finished round and move on to the next one
    pub fn on_round_complete(&mut self) {
        let round = self.holder.current_round();
        let distance = self
            .round_distance()
            .unwrap_or_else(|| self.animation.total_distance());
        let result = RoundResult {
            round: round as u32 + 1,
            distance,
            placements: self.animation.placements().to_vec(),
        };
        log::info!(
            "Round {} complete, winner: {}",
            result.round,
            result
                .placements
                .first()
                .map(|p| p.name.as_str())
                .unwrap_or("none")
        );

        if self.holder.add_race_result(result) {
            log::info!("Every scheduled round has a result");
        }

        let next = round + 1;
        match self.holder.schedule().get(next).cloned() {
            Some(plan) => {
                self.holder.set_current_round(next as i64);
                if plan.distance > 0.0 {
                    self.animation.set_laps(vec![plan.distance]);
                }
                let race = self.animation.race_mut();
                race.build_runners(&plan.participants);
                race.clear_placements();
                self.observed = Observed::capture(&self.holder);

                log::info!("Advancing to round {}", next + 1);
                self.animation.start(None);
            }
            None => {
                self.holder.set_racing(false);
                self.observed = Observed::capture(&self.holder);
                log::info!("Session over after {} rounds", next);
            }
        }
    }

    /// Handle one frame; a completed round chains into the next one
    pub fn pump(&mut self) -> Option<TickOutcome> {
        let outcome = self.animation.pump()?;
        if outcome == TickOutcome::Completed {
            self.on_round_complete();
        }
        Some(outcome)
    }

    /// Pump frames until none are pending or `max_frames` were handled
    pub fn run(&mut self, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && self.pump().is_some() {
            frames += 1;
        }
        frames
    }

    /// Apply a mutation to the holder, then react to what changed
    pub fn commit<F: FnOnce(&mut H)>(&mut self, mutate: F) {
        mutate(&mut self.holder);
        self.sync_bindings();
    }

    /// React to holder changes since the last observation.
    ///
    /// A new round or roster reloads the round (and starts it when racing);
    /// the racing flag starts or stops the animation on its edges.
    pub fn sync_bindings(&mut self) {
        let current = Observed::capture(&self.holder);
        let previous = std::mem::replace(&mut self.observed, current.clone());

        if current.round != previous.round || current.roster != previous.roster {
            self.animation.stop();
            self.initialize_round();
            if current.racing {
                self.start();
            }
        }

        if current.racing != previous.racing {
            if current.racing {
                self.start();
            } else {
                self.animation.stop();
            }
        }
    }

    fn round_distance(&self) -> Option<f64> {
        self.holder
            .current_round_plan()
            .map(|plan| plan.distance)
            .filter(|distance| *distance > 0.0)
    }

    pub fn holder(&self) -> &H {
        &self.holder
    }

    pub fn animation(&self) -> &Animation<S> {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut Animation<S> {
        &mut self.animation
    }

    pub fn lap_names(&self) -> &[String] {
        self.holder.lap_names()
    }

    pub fn runners(&self) -> &[RunnerState] {
        self.animation.runners()
    }

    pub fn placements(&self) -> &[Placement] {
        self.animation.placements()
    }

    pub fn is_running(&self) -> bool {
        self.animation.is_running()
    }

    pub fn total_distance(&self) -> f64 {
        self.animation.total_distance()
    }

    pub fn track_width(&self) -> f64 {
        self.animation.track_width()
    }

    pub fn set_track_width(&mut self, width: f64) {
        self.animation.set_track_width(width);
    }

    pub fn get_snapshot(&self) -> RaceSnapshot {
        self.animation.get_snapshot()
    }
}
