//! Maps raw input signals onto the drift controller and container offsets.
//!
//! The controller never learns why it was paused; this is the only place that
//! knows which signals pause, which resume and which hard-stop.

use std::time::{Duration, Instant};

use crate::config::river::DriftConfig;
use crate::drift::{ContainerId, DriftControl, DriftController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Left,
    Right,
}

/// Input signals, already resolved to the container they target (if any).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    /// Wheel over the page; `container` is the one under the pointer.
    Wheel {
        container: Option<ContainerId>,
        delta_x: f64,
        delta_y: f64,
        shift: bool,
    },
    /// Pointer pressed. Presses on a flow-toggle control are not interactions with the river.
    PointerDown { on_flow_toggle: bool },
    TouchStart,
    KeyDown,
    /// Per-container flow button.
    ToggleFlow(ContainerId),
    /// Global "let the rivers flow" / "stop the rivers" switch.
    SetFlowAll(bool),
    /// `None` is the page-wide jump and holds drift for the longer jump grace;
    /// `Some` is a single container's button and only gets the default pause.
    JumpToStart(Option<ContainerId>),
    JumpToEnd(Option<ContainerId>),
    Nudge {
        container: ContainerId,
        direction: NudgeDirection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionRouter {
    jump_grace: Duration,
    nav_step_px: i64,
}

impl Default for InteractionRouter {
    fn default() -> Self {
        Self::from_config(&DriftConfig::default())
    }
}

impl InteractionRouter {
    pub fn from_config(cfg: &DriftConfig) -> Self {
        Self {
            jump_grace: cfg.jump_grace(),
            nav_step_px: cfg.nav_step_px,
        }
    }

    /// Pause for a jump and return the containers it moves.
    fn begin_jump(
        &self,
        drift: &mut DriftController,
        target: Option<ContainerId>,
        now: Instant,
    ) -> Vec<ContainerId> {
        match target {
            Some(id) => {
                drift.pause_default(now);
                vec![id]
            }
            None => {
                drift.pause(self.jump_grace, now);
                drift.container_ids().collect()
            }
        }
    }

    pub fn route(&self, event: Interaction, drift: &mut DriftController, now: Instant) {
        match event {
            Interaction::Wheel {
                container,
                delta_x,
                delta_y,
                shift,
            } => {
                drift.pause_default(now);
                // Shift + vertical wheel scrolls sideways.
                if let Some(id) = container {
                    if shift && delta_y.abs() > delta_x.abs() {
                        drift.scroll_by(id, delta_y.round() as i64);
                    }
                }
            }
            Interaction::PointerDown { on_flow_toggle } => {
                if !on_flow_toggle {
                    drift.pause_default(now);
                }
            }
            Interaction::TouchStart | Interaction::KeyDown => drift.pause_default(now),
            Interaction::ToggleFlow(id) => {
                let enabled = !drift.container(id).is_some_and(|c| c.flow_enabled);
                drift.set_flow(id, enabled);
                if enabled {
                    drift.resume();
                }
            }
            Interaction::SetFlowAll(enabled) => {
                drift.set_flow_all(enabled);
                if enabled {
                    drift.resume();
                } else {
                    drift.stop();
                }
            }
            Interaction::JumpToStart(target) => {
                for id in self.begin_jump(drift, target, now) {
                    drift.scroll_to(id, 0);
                }
            }
            Interaction::JumpToEnd(target) => {
                for id in self.begin_jump(drift, target, now) {
                    drift.scroll_to_end(id);
                }
            }
            Interaction::Nudge {
                container,
                direction,
            } => {
                let delta = match direction {
                    NudgeDirection::Left => -self.nav_step_px,
                    NudgeDirection::Right => self.nav_step_px,
                };
                drift.scroll_by(container, delta);
            }
        }
    }
}
