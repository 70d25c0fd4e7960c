use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Observable state of a notification drain loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DrainState {
    /// Not draining: backgrounded, or foregrounded with an empty queue.
    #[default]
    Idle,
    /// Holding the drain lock and about to present the head event.
    Draining,
    /// An event is on screen.
    Displaying,
    /// Pause between two events.
    Gap,
}

#[derive(Debug, Clone, Default)]
pub struct DrainStateMachine {
    state: DrainState,
}

impl DrainStateMachine {
    pub fn state(&self) -> DrainState {
        self.state
    }

    /// An event became available while foregrounded.
    pub fn begin_drain(&mut self) -> Result<DrainState, ClientError> {
        self.transition_from_any_of(
            &[DrainState::Idle, DrainState::Draining],
            DrainState::Draining,
            "begin_drain",
        )
    }

    pub fn display(&mut self) -> Result<DrainState, ClientError> {
        self.transition_from_state(DrainState::Draining, DrainState::Displaying, "display")
    }

    /// Rendering failed; the event is dropped and draining continues.
    pub fn render_failed(&mut self) -> Result<DrainState, ClientError> {
        self.transition_from_state(DrainState::Displaying, DrainState::Draining, "render_failed")
    }

    pub fn start_gap(&mut self) -> Result<DrainState, ClientError> {
        self.transition_from_state(DrainState::Displaying, DrainState::Gap, "start_gap")
    }

    pub fn finish_gap(&mut self) -> Result<DrainState, ClientError> {
        self.transition_from_state(DrainState::Gap, DrainState::Draining, "finish_gap")
    }

    /// The queue ran dry; wait for the next publish.
    pub fn queue_empty(&mut self) -> Result<DrainState, ClientError> {
        self.transition_from_any_of(
            &[DrainState::Idle, DrainState::Draining],
            DrainState::Idle,
            "queue_empty",
        )
    }

    /// Foreground was lost; valid from every state.
    pub fn on_background(&mut self) -> DrainState {
        self.state = DrainState::Idle;
        self.state
    }

    fn transition_from_state(
        &mut self,
        expected: DrainState,
        next: DrainState,
        action: &'static str,
    ) -> Result<DrainState, ClientError> {
        self.transition_from_any_of(&[expected], next, action)
    }

    fn transition_from_any_of(
        &mut self,
        expected: &[DrainState],
        next: DrainState,
        action: &'static str,
    ) -> Result<DrainState, ClientError> {
        if !expected.contains(&self.state) {
            return Err(ClientError::InvalidTransition {
                current: self.state,
                action,
            });
        }
        self.state = next;
        Ok(next)
    }
}
