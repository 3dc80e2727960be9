//! # Drift
//! Autonomous horizontal scroll ("drift") for feed containers.
//!
//! One [`DriftController`] owns the global active/paused state and a table of
//! containers, each with its own flow-enabled flag, offset and sub-pixel
//! accumulator. Pauses are debounced: every `pause` pushes the resume deadline
//! out, and the deadline is checked at the start of each frame, so a resume can
//! never fire after an intervening `stop` or `resume`.
//!
//! Time is passed in explicitly (`now`) so frames and interaction events share
//! one clock and tests stay deterministic.

use std::time::{Duration, Instant};

use metrics::counter;
use tokio::time::MissedTickBehavior;

use crate::config::river::DriftConfig;

/// Narrow pause/resume surface used by input handling.
pub trait DriftControl {
    /// Pause now; resume once `duration` passes without another pause.
    fn pause(&mut self, duration: Duration, now: Instant);
    /// Force active immediately, dropping any pending resume.
    fn resume(&mut self);
    /// Hard stop: paused with no pending resume.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

/// Global drift flag plus the pending resume, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftState {
    pub active: bool,
    pub resume_deadline: Option<Instant>,
}

impl Default for DriftState {
    fn default() -> Self {
        Self {
            active: true,
            resume_deadline: None,
        }
    }
}

/// Scroll state of one rendered container.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    /// Current horizontal scroll offset in whole pixels.
    pub offset: i64,
    /// Largest reachable offset (content width minus viewport width).
    pub max_offset: i64,
    pub flow_enabled: bool,
    /// Fractional pixels not yet applied, always in `[0, 1)`.
    accumulator: f64,
}

impl Container {
    fn new(max_offset: i64) -> Self {
        Self {
            offset: 0,
            max_offset: max_offset.max(0),
            flow_enabled: false,
            accumulator: 0.0,
        }
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    fn scroll_to(&mut self, offset: i64) {
        self.offset = offset.clamp(0, self.max_offset);
    }

    /// Add one frame of drift; returns whole pixels applied.
    fn advance(&mut self, speed: f64) -> i64 {
        let total = self.accumulator + speed;
        let px = total.floor();
        self.accumulator = total - px;
        let px = px as i64;
        if px > 0 {
            self.scroll_to(self.offset + px);
        }
        px
    }
}

#[derive(Debug, Clone)]
pub struct DriftController {
    state: DriftState,
    speed: f64,
    default_pause: Duration,
    containers: Vec<Container>,
}

impl DriftController {
    pub fn new(speed_px_per_frame: f64, default_pause: Duration) -> Self {
        Self {
            state: DriftState::default(),
            speed: speed_px_per_frame,
            default_pause,
            containers: Vec::new(),
        }
    }

    pub fn from_config(cfg: &DriftConfig) -> Self {
        Self::new(cfg.speed_px_per_frame, cfg.pause())
    }

    pub fn state(&self) -> DriftState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Pause for the configured default quiet period.
    pub fn pause_default(&mut self, now: Instant) {
        self.pause(self.default_pause, now);
    }

    /// Register a container; it starts at offset 0 with flow disabled.
    pub fn add_container(&mut self, max_offset: i64) -> ContainerId {
        self.containers.push(Container::new(max_offset));
        ContainerId(self.containers.len() - 1)
    }

    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id.0)
    }

    pub fn container_ids(&self) -> impl Iterator<Item = ContainerId> {
        (0..self.containers.len()).map(ContainerId)
    }

    /// Update the scrollable extent after layout changes; the offset is re-clamped.
    pub fn set_max_offset(&mut self, id: ContainerId, max_offset: i64) {
        if let Some(c) = self.containers.get_mut(id.0) {
            c.max_offset = max_offset.max(0);
            c.scroll_to(c.offset);
        }
    }

    pub fn set_flow(&mut self, id: ContainerId, enabled: bool) {
        if let Some(c) = self.containers.get_mut(id.0) {
            c.flow_enabled = enabled;
        }
    }

    pub fn set_flow_all(&mut self, enabled: bool) {
        for c in &mut self.containers {
            c.flow_enabled = enabled;
        }
    }

    pub fn scroll_to(&mut self, id: ContainerId, offset: i64) {
        if let Some(c) = self.containers.get_mut(id.0) {
            c.scroll_to(offset);
        }
    }

    pub fn scroll_by(&mut self, id: ContainerId, delta: i64) {
        if let Some(c) = self.containers.get_mut(id.0) {
            c.scroll_to(c.offset.saturating_add(delta));
        }
    }

    pub fn scroll_to_end(&mut self, id: ContainerId) {
        if let Some(c) = self.containers.get_mut(id.0) {
            c.scroll_to(c.max_offset);
        }
    }

    /// Fire the pending resume if its deadline has passed. Returns true exactly
    /// once per scheduled resume.
    pub fn poll_resume(&mut self, now: Instant) -> bool {
        match self.state.resume_deadline {
            Some(deadline) if now >= deadline => {
                self.state.active = true;
                self.state.resume_deadline = None;
                counter!("drift_resumes_total").increment(1);
                tracing::debug!(target: "drift", "drift resumed after quiet period");
                true
            }
            _ => false,
        }
    }

    /// One animation frame. Call every frame regardless of state; returns the
    /// number of containers that moved.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.poll_resume(now);
        if !self.state.active {
            return 0;
        }
        let speed = self.speed;
        self.containers
            .iter_mut()
            .filter(|c| c.flow_enabled)
            .map(|c| c.advance(speed))
            .filter(|px| *px > 0)
            .count()
    }
}

impl DriftControl for DriftController {
    fn pause(&mut self, duration: Duration, now: Instant) {
        self.state.active = false;
        // Replaces (cancels) any earlier deadline.
        self.state.resume_deadline = Some(now + duration);
    }

    fn resume(&mut self) {
        self.state.active = true;
        self.state.resume_deadline = None;
    }

    fn stop(&mut self) {
        self.state.active = false;
        self.state.resume_deadline = None;
        tracing::debug!(target: "drift", "drift stopped");
    }
}

/// Drive `drift` for `frames` frames at a fixed frame interval. Late frames are
/// skipped rather than bunched up, which only delays motion.
pub async fn run_frames(drift: &mut DriftController, frame: Duration, frames: u64) {
    let mut ticker = tokio::time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    for _ in 0..frames {
        let at = ticker.tick().await;
        drift.tick(at.into_std());
    }
}
