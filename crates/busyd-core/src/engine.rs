//! Visibility debounce engine.
//!
//! Decides when a busy indicator flips between shown and hidden, given a noisy
//! "work is pending" signal and an independent manual override.
//!
//! ```text
//!            activity(true)             timer fired / emit true
//!  Hidden ─────────────────► AwaitingShow ─────────────────────► Visible
//!    ▲  ◄─────────────────────────┘                              │   ▲
//!    │        activity(false)                   activity(false)  │   │ activity(true)
//!    │                                                           ▼   │
//!    └──────────────────────────────────────────────────── AwaitingHide
//!                     timer fired / emit false
//! ```
//!
//! `override(v)` jumps straight to `Visible` or `Hidden` from any state.
//!
//! The engine is a plain value: the caller feeds it events with the current
//! time, sleeps until [`VisibilityEngine::next_deadline`] and then calls
//! [`VisibilityEngine::check_timer`]. Every call returns the emission it
//! caused, if any.

use crate::config::TimingConfig;
use crate::error::Result;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Validated timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub debounce_delay: Duration,
    pub min_duration: Duration,
    pub extra_duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Indicator hidden, nothing pending.
    Hidden,
    /// Activity seen; waiting out the debounce delay before showing.
    AwaitingShow,
    /// Indicator shown.
    Visible,
    /// Activity ended; holding the indicator until the hide timer fires.
    AwaitingHide,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Hidden => "hidden",
            EngineState::AwaitingShow => "awaiting_show",
            EngineState::Visible => "visible",
            EngineState::AwaitingHide => "awaiting_hide",
        }
    }
}

pub struct VisibilityEngine {
    timing: Timing,
    state: EngineState,
    /// Deadline of the single pending timer. Only set in the awaiting states.
    timer: Option<Instant>,
    /// Earliest moment a natural hide may take effect.
    visible_until: Option<Instant>,
    last_emitted: bool,
    shut_down: bool,
}

impl VisibilityEngine {
    pub fn new(config: &TimingConfig) -> Result<Self> {
        Ok(Self::with_timing(config.validate()?))
    }

    pub fn with_timing(timing: Timing) -> Self {
        Self {
            timing,
            state: EngineState::Hidden,
            timer: None,
            visible_until: None,
            last_emitted: false,
            shut_down: false,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Last value handed to the output. Starts out `false`.
    pub fn is_visible(&self) -> bool {
        self.last_emitted
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Feed a "work is pending" sample. Never emits directly; a show or hide
    /// only happens once the timer it arms fires.
    pub fn on_activity(&mut self, pending: bool, now: Instant) -> Option<bool> {
        if self.shut_down {
            return None;
        }

        match (pending, self.state) {
            (true, EngineState::Hidden) => {
                debug!(
                    delay_ms = self.timing.debounce_delay.as_millis() as u64,
                    "activity started, debouncing show"
                );
                self.enter(EngineState::AwaitingShow, Some(now + self.timing.debounce_delay));
            }
            (true, EngineState::AwaitingHide) => {
                debug!("activity resumed, hide cancelled");
                self.enter(EngineState::Visible, None);
            }
            (true, EngineState::Visible | EngineState::AwaitingShow) => {}
            (false, EngineState::AwaitingShow) => {
                debug!("activity ended before debounce elapsed, show suppressed");
                self.enter(EngineState::Hidden, None);
            }
            (false, EngineState::Visible) => {
                let hide_delay = self.hide_delay(now);
                debug!(delay_ms = hide_delay.as_millis() as u64, "activity ended, scheduling hide");
                self.enter(EngineState::AwaitingHide, Some(now + hide_delay));
            }
            (false, EngineState::Hidden | EngineState::AwaitingHide) => {}
        }
        None
    }

    /// Apply a manual show/hide immediately, bypassing debounce and hold rules.
    pub fn on_override(&mut self, visible: bool, now: Instant) -> Option<bool> {
        if self.shut_down {
            return None;
        }

        debug!(visible, from = self.state.as_str(), "override applied");
        if visible {
            self.enter(EngineState::Visible, None);
            self.visible_until = Some(now + self.timing.min_duration);
        } else {
            self.enter(EngineState::Hidden, None);
        }
        self.emit(visible)
    }

    /// Fire the pending timer if its deadline has passed.
    pub fn check_timer(&mut self, now: Instant) -> Option<bool> {
        if self.shut_down {
            return None;
        }
        let due = self.timer?;
        if now < due {
            return None;
        }

        match self.state {
            EngineState::AwaitingShow => {
                debug!("debounce elapsed, showing");
                self.enter(EngineState::Visible, None);
                self.visible_until = Some(now + self.timing.min_duration);
                self.emit(true)
            }
            EngineState::AwaitingHide => {
                debug!("hold elapsed, hiding");
                self.enter(EngineState::Hidden, None);
                self.emit(false)
            }
            EngineState::Hidden | EngineState::Visible => {
                self.timer = None;
                None
            }
        }
    }

    /// When `check_timer()` needs to run next, or `None` if no timer is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.shut_down {
            return None;
        }
        self.timer
    }

    /// Cancel the pending timer and stop producing output. Safe to call twice.
    pub fn shutdown(&mut self) {
        if !self.shut_down {
            debug!(state = self.state.as_str(), "engine shut down");
        }
        self.shut_down = true;
        self.timer = None;
    }

    fn hide_delay(&self, now: Instant) -> Duration {
        let remaining = self
            .visible_until
            .map_or(Duration::ZERO, |until| until.saturating_duration_since(now));
        remaining.max(self.timing.extra_duration)
    }

    /// Switch state, replacing whatever timer the previous state had armed.
    fn enter(&mut self, state: EngineState, timer: Option<Instant>) {
        self.state = state;
        self.timer = timer;
    }

    fn emit(&mut self, visible: bool) -> Option<bool> {
        if visible == self.last_emitted {
            return None;
        }
        self.last_emitted = visible;
        Some(visible)
    }
}
