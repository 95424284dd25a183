//! Operator session state machine.
//!
//! # States
//!
//! - `AwaitingCommand`: idle, reading commands and polling the badge reader
//! - `AddFlow`, `DeleteFlow`, `EditFlow`: a registry command in progress
//! - `Closed`: terminal
//!
//! # Valid Transitions
//!
//! - AwaitingCommand → AddFlow | DeleteFlow | EditFlow | Closed
//! - AddFlow | DeleteFlow | EditFlow → AwaitingCommand | Closed
//!
//! # Examples
//!
//! ```
//! use badgegate_network::{SessionState, SessionStateMachine};
//!
//! let mut machine = SessionStateMachine::new();
//! machine.transition_to(SessionState::AddFlow).unwrap();
//! machine.transition_to(SessionState::AwaitingCommand).unwrap();
//! assert!(machine.transition_to(SessionState::AwaitingCommand).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Maximum number of transitions kept per session.
const MAX_HISTORY_SIZE: usize = 32;

/// Phase of an operator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for a command line; unsolicited scans are reported.
    AwaitingCommand,

    /// `ADD` in progress.
    AddFlow,

    /// `DELETE` in progress.
    DeleteFlow,

    /// `EDIT` in progress.
    EditFlow,

    /// Connection finished; no further transitions.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::AwaitingCommand => "AwaitingCommand",
            SessionState::AddFlow => "AddFlow",
            SessionState::DeleteFlow => "DeleteFlow",
            SessionState::EditFlow => "EditFlow",
            SessionState::Closed => "Closed",
        };
        f.write_str(state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// ```
    /// use badgegate_network::SessionState;
    ///
    /// assert!(SessionState::AwaitingCommand.can_transition_to(&SessionState::EditFlow));
    /// assert!(!SessionState::AddFlow.can_transition_to(&SessionState::DeleteFlow));
    /// assert!(!SessionState::Closed.can_transition_to(&SessionState::AwaitingCommand));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (
                SessionState::AwaitingCommand,
                SessionState::AddFlow
                    | SessionState::DeleteFlow
                    | SessionState::EditFlow
                    | SessionState::Closed
            ) | (
                SessionState::AddFlow | SessionState::DeleteFlow | SessionState::EditFlow,
                SessionState::AwaitingCommand | SessionState::Closed
            )
        )
    }

    /// Whether a registry command is in progress.
    pub fn is_flow(&self) -> bool {
        matches!(
            self,
            SessionState::AddFlow | SessionState::DeleteFlow | SessionState::EditFlow
        )
    }
}

/// A single state transition with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,

    /// Not serialized; set to the deserialization time when read back.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Tracks the current state of one session and its recent transitions.
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
    history: VecDeque<StateTransition>,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: SessionState::AwaitingCommand,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    /// Transitions in order, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state` and record the transition.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` when `new_state` is not
    /// reachable from the current state; the state is left unchanged.
    pub fn transition_to(&mut self, new_state: SessionState) -> SessionResult<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(SessionError::InvalidTransition {
                from: self.current_state,
                to: new_state,
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
