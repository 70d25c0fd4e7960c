//! Press-twice-to-exit detector.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

pub const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_millis(2_000);
pub const DEFAULT_EXIT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitConfirmationConfig {
    /// Window in which a second action confirms.
    pub timeout: Duration,
    /// Actions closer together than this count as one.
    pub debounce: Duration,
}

impl Default for ExitConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_EXIT_TIMEOUT,
            debounce: DEFAULT_EXIT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitDecision {
    /// First action; the caller shows a "press again to exit" prompt.
    AwaitingConfirmation,
    /// Second action inside the window; the caller terminates.
    Confirm,
}

#[derive(Debug, Clone)]
pub struct ExitConfirmationTimer {
    config: ExitConfirmationConfig,
    window_start: Option<Instant>,
    last_action: Option<Instant>,
    last_decision: ExitDecision,
}

impl Default for ExitConfirmationTimer {
    fn default() -> Self {
        Self::new(ExitConfirmationConfig::default())
    }
}

impl ExitConfirmationTimer {
    pub fn new(config: ExitConfirmationConfig) -> Self {
        Self {
            config,
            window_start: None,
            last_action: None,
            last_decision: ExitDecision::AwaitingConfirmation,
        }
    }

    pub fn on_action(&mut self) -> ExitDecision {
        self.on_action_at(Instant::now())
    }

    /// Record an action at `now`.
    ///
    /// Bursts inside the debounce interval collapse into the first action of the
    /// burst and repeat its decision.
    pub fn on_action_at(&mut self, now: Instant) -> ExitDecision {
        if let Some(last) = self.last_action
            && now.saturating_duration_since(last) < self.config.debounce
        {
            self.last_action = Some(now);
            trace!("collapsed repeated exit action");
            return self.last_decision;
        }
        self.last_action = Some(now);

        let decision = match self.window_start {
            Some(started) if now.saturating_duration_since(started) < self.config.timeout => {
                self.window_start = None;
                ExitDecision::Confirm
            }
            _ => {
                self.window_start = Some(now);
                ExitDecision::AwaitingConfirmation
            }
        };
        self.last_decision = decision;
        decision
    }

    /// Whether a first action is waiting for confirmation at `now`.
    pub fn is_awaiting_at(&self, now: Instant) -> bool {
        self.window_start
            .is_some_and(|started| now.saturating_duration_since(started) < self.config.timeout)
    }

    pub fn reset(&mut self) {
        self.window_start = None;
        self.last_action = None;
        self.last_decision = ExitDecision::AwaitingConfirmation;
    }
}
