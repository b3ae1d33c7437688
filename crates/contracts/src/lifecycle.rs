//! Pipeline lifecycle state machine
//!
//! `Idle -> Connecting -> Running -> Draining -> Stopped`
//!
//! `Connecting -> Stopped` is the aborted-startup path. `Stopped` is terminal.

use std::fmt;

use crate::ContractError;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Connecting,
    Running,
    Draining,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }

    /// Numeric form for gauges
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Running => 2,
            Self::Draining => 3,
            Self::Stopped => 4,
        }
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Running)
                | (Connecting, Stopped)
                | (Running, Draining)
                | (Draining, Stopped)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current state and rejects illegal transitions
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == LifecycleState::Stopped
    }

    /// Move to `next`
    ///
    /// # Errors
    /// `InvalidTransition` if the move is not part of the state machine;
    /// the state is left unchanged.
    pub fn transition(&mut self, next: LifecycleState) -> Result<LifecycleState, ContractError> {
        if !self.state.can_transition_to(next) {
            return Err(ContractError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        let previous = self.state;
        self.state = next;
        Ok(previous)
    }
}
