//! Race Engine Module
//!
//! Runner state, the per-tick race simulation, the frame-driven animation
//! loop and the multi-round orchestrator.

pub mod orchestrator;
pub mod race;
pub mod runner;
pub mod simulation;

pub use orchestrator::RaceOrchestrator;
pub use race::{Placement, Race, RaceConfig, RaceSnapshot};
pub use runner::{Competitor, Runner, RunnerSnapshot, RunnerState};
pub use simulation::{
    Animation, AnimationState, CompletionCallback, FixedStepFrames, Frame, FrameHandle,
    FrameSource, TickOutcome, TickStats, WallClockFrames,
};
