//! Track Race Engine
//!
//! Deterministic, frame-driven simulation of a multi-round race. Runners
//! advance along a list of segments once per frame, finishers are ranked in
//! finish order and each completed round is committed to a
//! [`RaceStateHolder`] before the next round starts.
//!
//! ```no_run
//! use race_lib::{EngineConfig, FixedStepFrames, RaceOrchestrator, RaceStateHolder, RaceStore};
//!
//! let config = EngineConfig::default();
//! let mut store = RaceStore::new();
//! let mut rng = rand::thread_rng();
//! store.generate_horses(&mut rng);
//! store.generate_schedule(&config.schedule, &mut rng);
//!
//! let frames = FixedStepFrames::new(config.frames.interval_ms);
//! let mut race = RaceOrchestrator::with_config(store, &config, frames);
//! race.initialize_round();
//! race.commit(|store| store.set_racing(true));
//! while race.pump().is_some() {}
//! ```

pub mod config;
pub mod error;
pub mod race_engine;
pub mod store;

pub use config::{EngineConfig, FrameConfig, ScheduleConfig};
pub use error::RaceError;
pub use race_engine::{
    Animation, AnimationState, Competitor, CompletionCallback, FixedStepFrames, Frame, FrameHandle,
    FrameSource, Placement, Race, RaceConfig, RaceOrchestrator, RaceSnapshot, RunnerSnapshot,
    RunnerState, TickOutcome, TickStats, WallClockFrames,
};
pub use store::{RaceButton, RaceStateHolder, RaceStore, RoundPlan, RoundResult};
