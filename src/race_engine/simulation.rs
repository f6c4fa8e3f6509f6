//! Simulation - Frame-driven animation loop
//!
//! [`Animation`] drives [`Race::step`] once per frame delivered by a
//! [`FrameSource`], tracks the wall-clock delta between frames and stops
//! once no runner is left on the track.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::race_engine::race::{Placement, Race, RaceSnapshot};
use crate::race_engine::runner::RunnerState;

/// Ticks kept for the rolling average
const TICK_WINDOW: usize = 60;

/// Identifies one requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameHandle(pub u64);

/// A fired frame: the handle it was requested under and its timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub handle: FrameHandle,
    pub timestamp_ms: f64,
}

/// Per-frame refresh capability.
///
/// The animation requests one frame at a time and the host delivers it back
/// through [`FrameSource::next_frame`]. A cancelled frame must never be
/// delivered.
pub trait FrameSource {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
    /// Wait for and return the next pending frame, if any is pending
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Deterministic frames at a fixed interval
#[derive(Debug, Clone)]
pub struct FixedStepFrames {
    interval_ms: f64,
    now_ms: f64,
    next_id: u64,
    pending: VecDeque<FrameHandle>,
}

impl FixedStepFrames {
    pub const DEFAULT_INTERVAL_MS: f64 = 16.0;

    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            now_ms: 0.0,
            next_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Default for FixedStepFrames {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL_MS)
    }
}

impl FrameSource for FixedStepFrames {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let handle = self.pending.pop_front()?;
        self.now_ms += self.interval_ms;
        Some(Frame {
            handle,
            timestamp_ms: self.now_ms,
        })
    }
}

/// Frames paced against the monotonic clock at a target tick rate
#[derive(Debug)]
pub struct WallClockFrames {
    origin: Instant,
    frame_time: Duration,
    last_frame: Option<Instant>,
    next_id: u64,
    pending: VecDeque<FrameHandle>,
}

impl WallClockFrames {
    pub const DEFAULT_TICK_RATE: f32 = 60.0;

    pub fn new(tick_rate: f32) -> Self {
        let frame_time = Duration::try_from_secs_f32(1.0 / tick_rate)
            .ok()
            .filter(|frame_time| tick_rate > 0.0 && !frame_time.is_zero())
            .unwrap_or_else(|| {
                log::warn!(
                    "Unusable tick rate {}, using {}",
                    tick_rate,
                    Self::DEFAULT_TICK_RATE
                );
                Duration::from_secs_f32(1.0 / Self::DEFAULT_TICK_RATE)
            });
        Self {
            origin: Instant::now(),
            frame_time,
            last_frame: None,
            next_id: 1,
            pending: VecDeque::new(),
        }
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }
}

impl FrameSource for WallClockFrames {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.pending.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let handle = self.pending.pop_front()?;
        if let Some(last) = self.last_frame {
            let due = last + self.frame_time;
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        let now = Instant::now();
        self.last_frame = Some(now);
        Some(Frame {
            handle,
            timestamp_ms: now.duration_since(self.origin).as_secs_f64() * 1000.0,
        })
    }
}

/// Animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationState {
    Idle,
    Running,
    Stopped,
}

/// What a delivered frame did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not the pending frame; nothing changed
    Ignored,
    /// Runners still on the track, next frame requested
    Continue,
    /// Every runner finished; completion callback has run
    Completed,
}

/// Invoked once with the final placements when a run completes naturally
pub type CompletionCallback = Box<dyn FnOnce(&[Placement])>;

/// Animation statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickStats {
    pub ticks: u64,
    pub avg_tick_time_ms: f32,
    pub runner_count: u32,
    pub state: AnimationState,
}

/// Main animation loop
pub struct Animation<S> {
    race: Race,
    frames: S,
    state: AnimationState,
    /// Frame we are waiting on, if running
    pending: Option<FrameHandle>,
    /// Timestamp of the previous tick in this run
    last_timestamp: Option<f64>,
    on_complete: Option<CompletionCallback>,
    ticks: u64,
    tick_times: VecDeque<f32>,
}

impl<S: FrameSource> Animation<S> {
    pub fn new(race: Race, frames: S) -> Self {
        Self {
            race,
            frames,
            state: AnimationState::Idle,
            pending: None,
            last_timestamp: None,
            on_complete: None,
            ticks: 0,
            tick_times: VecDeque::with_capacity(TICK_WINDOW),
        }
    }

    /// Start a run. Returns `false` and does nothing if already running.
    pub fn start(&mut self, on_complete: Option<CompletionCallback>) -> bool {
        if self.is_running() {
            return false;
        }

        self.state = AnimationState::Running;
        self.last_timestamp = None;
        self.race.clear_placements();
        self.on_complete = on_complete;

        let handle = self.frames.request_frame();
        self.pending = Some(handle);
        log::debug!("Animation started, first frame {:?}", handle);
        true
    }

    /// Handle one fired frame
    pub fn on_frame(&mut self, frame: Frame) -> TickOutcome {
        if !self.is_running() || self.pending != Some(frame.handle) {
            return TickOutcome::Ignored;
        }
        self.pending = None;

        let delta = match self.last_timestamp {
            Some(last) => (frame.timestamp_ms - last) / 1000.0,
            None => 0.0,
        };
        self.last_timestamp = Some(frame.timestamp_ms);

        let tick_start = Instant::now();
        let active = self.race.step(delta);
        self.record_tick(tick_start.elapsed().as_secs_f32() * 1000.0);

        if active {
            self.pending = Some(self.frames.request_frame());
            return TickOutcome::Continue;
        }

        self.state = AnimationState::Idle;
        log::debug!(
            "Animation complete after {} ticks, {} placements",
            self.ticks,
            self.race.placements().len()
        );
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(self.race.placements());
        }
        TickOutcome::Completed
    }

    /// Pull the next frame from the source and handle it
    pub fn pump(&mut self) -> Option<TickOutcome> {
        let frame = self.frames.next_frame()?;
        Some(self.on_frame(frame))
    }

    /// Stop the run; no pending frame will tick after this returns
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.frames.cancel_frame(handle);
        }
        self.on_complete = None;
        if self.state == AnimationState::Running {
            self.state = AnimationState::Stopped;
            log::debug!("Animation stopped");
        }
    }

    /// Stop, clear placements and put every runner back on the start line
    pub fn reset(&mut self) {
        self.stop();
        self.race.clear_placements();
        self.race.reset_runners();
    }

    pub fn set_laps(&mut self, laps: Vec<f64>) {
        self.race.set_laps(laps);
    }

    pub fn set_track_width(&mut self, width: f64) {
        self.race.set_track_width(width);
    }

    pub fn is_running(&self) -> bool {
        self.state == AnimationState::Running
    }

    pub fn get_state(&self) -> AnimationState {
        self.state
    }

    pub fn race(&self) -> &Race {
        &self.race
    }

    pub fn race_mut(&mut self) -> &mut Race {
        &mut self.race
    }

    pub fn frames(&self) -> &S {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut S {
        &mut self.frames
    }

    pub fn runners(&self) -> &[RunnerState] {
        self.race.runners()
    }

    pub fn placements(&self) -> &[Placement] {
        self.race.placements()
    }

    pub fn total_distance(&self) -> f64 {
        self.race.total_distance()
    }

    pub fn track_width(&self) -> f64 {
        self.race.track_width()
    }

    pub fn get_snapshot(&self) -> RaceSnapshot {
        self.race.get_snapshot(self.is_running())
    }

    /// Get animation statistics
    pub fn get_stats(&self) -> TickStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        TickStats {
            ticks: self.ticks,
            avg_tick_time_ms: avg_tick_time,
            runner_count: self.race.runners().len() as u32,
            state: self.state,
        }
    }

    fn record_tick(&mut self, tick_time_ms: f32) {
        self.ticks += 1;
        self.tick_times.push_back(tick_time_ms);
        if self.tick_times.len() > TICK_WINDOW {
            self.tick_times.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::race::RaceConfig;
    use crate::race_engine::runner::Competitor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::rc::Rc;

    fn animation(laps: Vec<f64>, conditions: &[(&str, u32)]) -> Animation<FixedStepFrames> {
        let config = RaceConfig {
            laps,
            track_width: 100.0,
            ..Default::default()
        };
        let mut race = Race::with_rng(config, StdRng::seed_from_u64(3));
        let competitors: Vec<Competitor> = conditions
            .iter()
            .enumerate()
            .map(|(i, (name, c))| Competitor::new(i as u32 + 1, *name, "#000").with_condition(*c))
            .collect();
        race.build_runners(&competitors);
        Animation::new(race, FixedStepFrames::default())
    }

    fn drive(animation: &mut Animation<FixedStepFrames>, max_frames: usize) -> usize {
        let mut frames = 0;
        while frames < max_frames && animation.pump().is_some() {
            frames += 1;
        }
        frames
    }

    fn counter() -> (Rc<Cell<u32>>, CompletionCallback) {
        let calls = Rc::new(Cell::new(0));
        let hook = Rc::clone(&calls);
        let on_complete: CompletionCallback =
            Box::new(move |_: &[Placement]| hook.set(hook.get() + 1));
        (calls, on_complete)
    }

    #[test]
    fn runs_to_completion_and_calls_back_once() {
        let mut animation = animation(vec![5.0], &[("Fast", 100), ("Mid", 70), ("Slow", 30)]);
        let (calls, on_complete) = counter();

        assert!(animation.start(Some(on_complete)));
        assert!(animation.is_running());

        drive(&mut animation, 200);

        let names: Vec<&str> = animation.placements().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Fast", "Mid", "Slow"]);
        assert_eq!(calls.get(), 1);
        assert!(!animation.is_running());
        assert_eq!(animation.get_state(), AnimationState::Idle);
        assert_eq!(animation.frames().pending(), 0);
    }

    #[test]
    fn first_tick_has_zero_delta() {
        let mut animation = animation(vec![1000.0], &[("A", 100)]);
        animation.start(None);
        assert_eq!(animation.pump(), Some(TickOutcome::Continue));
        assert_eq!(animation.runners()[0].lap_progress, 0.0);
        animation.pump();
        assert!(animation.runners()[0].lap_progress > 0.0);
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut animation = animation(vec![50.0], &[("A", 100)]);
        let (calls, first) = counter();
        let (second_calls, second) = counter();
        assert!(animation.start(Some(first)));
        assert!(!animation.start(Some(second)));
        assert_eq!(animation.frames().pending(), 1);

        drive(&mut animation, 200);
        assert_eq!(calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
    }

    #[test]
    fn stop_prevents_further_ticks() {
        let mut animation = animation(vec![50.0], &[("A", 100), ("B", 100)]);
        let (calls, on_complete) = counter();
        animation.start(Some(on_complete));
        animation.stop();

        assert_eq!(drive(&mut animation, 50), 0);
        assert!(!animation.is_running());
        assert_eq!(animation.get_state(), AnimationState::Stopped);
        assert!(animation.placements().is_empty());
        assert_eq!(calls.get(), 0);
        assert!(animation.runners().iter().all(|r| r.lap_progress == 0.0));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut animation = animation(vec![50.0], &[("A", 100)]);
        animation.stop();
        assert_eq!(animation.get_state(), AnimationState::Idle);
        animation.start(None);
        animation.stop();
        animation.stop();
        assert_eq!(animation.get_state(), AnimationState::Stopped);
    }

    #[test]
    fn stale_frame_is_ignored() {
        let mut animation = animation(vec![50.0], &[("A", 100)]);
        animation.start(None);
        let stale = Frame {
            handle: FrameHandle(999),
            timestamp_ms: 5000.0,
        };
        assert_eq!(animation.on_frame(stale), TickOutcome::Ignored);
        assert_eq!(animation.runners()[0].lap_progress, 0.0);

        // A frame requested before stop() cannot tick afterwards
        animation.pump();
        let handle = animation.pending.expect("pending frame");
        animation.stop();
        let late = Frame {
            handle,
            timestamp_ms: 10_000.0,
        };
        assert_eq!(animation.on_frame(late), TickOutcome::Ignored);
        assert!(!animation.runners()[0].finished);
    }

    #[test]
    fn restart_clears_placements() {
        let mut animation = animation(vec![5.0], &[("A", 100)]);
        animation.start(None);
        drive(&mut animation, 50);
        assert_eq!(animation.placements().len(), 1);

        animation.race_mut().reset_runners();
        animation.start(None);
        assert!(animation.placements().is_empty());
    }

    #[test]
    fn empty_roster_completes_immediately() {
        let mut animation = animation(vec![5.0], &[]);
        let (calls, on_complete) = counter();
        animation.start(Some(on_complete));
        assert_eq!(animation.pump(), Some(TickOutcome::Completed));
        assert!(animation.placements().is_empty());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reset_zeroes_runners_and_keeps_them() {
        let mut animation = animation(vec![5.0], &[("Solo", 100)]);
        animation.start(None);
        drive(&mut animation, 50);
        animation.reset();

        assert!(animation.placements().is_empty());
        assert_eq!(animation.runners().len(), 1);
        assert!(animation.runners().iter().all(|r| r.position == 0.0
            && r.progress == 0.0
            && r.lap_index == 0
            && r.lap_progress == 0.0
            && !r.finished));
    }

    #[test]
    fn set_track_width_moves_runners() {
        let mut animation = animation(vec![100.0], &[("One", 100), ("Two", 100)]);
        animation.race_mut().runners_mut()[0].progress = 50.0;
        animation.race_mut().runners_mut()[1].finished = true;
        animation.set_track_width(200.0);
        assert_eq!(animation.runners()[0].position, 100.0);
        assert_eq!(animation.runners()[1].position, 200.0);
        assert_eq!(animation.track_width(), 200.0);
    }

    #[test]
    fn stats_track_ticks() {
        let mut animation = animation(vec![5.0], &[("A", 100), ("B", 50)]);
        animation.start(None);
        let frames = drive(&mut animation, 50);
        let stats = animation.get_stats();
        assert_eq!(stats.ticks, frames as u64);
        assert_eq!(stats.runner_count, 2);
        assert_eq!(stats.state, AnimationState::Idle);
    }

    #[test]
    fn wall_clock_frames_reject_unusable_rates() {
        let default = Duration::from_secs_f32(1.0 / WallClockFrames::DEFAULT_TICK_RATE);
        for rate in [1e-20, 0.0, -5.0, f32::NAN, f32::INFINITY] {
            assert_eq!(WallClockFrames::new(rate).frame_time(), default, "rate {rate}");
        }
        assert_eq!(
            WallClockFrames::new(50.0).frame_time(),
            Duration::from_secs_f32(1.0 / 50.0)
        );
    }

    #[test]
    fn wall_clock_frames_advance() {
        let mut frames = WallClockFrames::new(1000.0);
        let first = frames.request_frame();
        let second = frames.request_frame();
        frames.cancel_frame(second);
        let fired = frames.next_frame().expect("frame");
        assert_eq!(fired.handle, first);
        assert!(frames.next_frame().is_none());

        let third = frames.request_frame();
        let later = frames.next_frame().expect("frame");
        assert_eq!(later.handle, third);
        assert!(later.timestamp_ms >= fired.timestamp_ms);
    }
}
