//! Outage simulation state machine.
//!
//! ```text
//! Idle -> OutageInjected -> Monitoring -> Reconnected
//!                                      \-> TimedOut
//! ```
//!
//! There are no shortcuts: a simulation can only reach `Reconnected` or
//! `TimedOut` through `Monitoring`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shellbench_common::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutageState {
    /// Simulation created, variant not yet confirmed running
    Idle,
    /// Outage window opened
    OutageInjected,
    /// Probing connectivity
    Monitoring,
    /// A probe saw connectivity restored
    Reconnected,
    /// The outage window closed without a positive probe
    TimedOut,
}

impl fmt::Display for OutageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutageState::Idle => write!(f, "idle"),
            OutageState::OutageInjected => write!(f, "outage_injected"),
            OutageState::Monitoring => write!(f, "monitoring"),
            OutageState::Reconnected => write!(f, "reconnected"),
            OutageState::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutageTransition {
    pub from_state: OutageState,
    pub to_state: OutageState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutageStateMachine {
    variant_id: String,
    current_state: OutageState,
    history: Vec<OutageTransition>,
}

impl OutageStateMachine {
    pub fn new(variant_id: &str) -> Self {
        Self {
            variant_id: variant_id.to_string(),
            current_state: OutageState::Idle,
            history: Vec::new(),
        }
    }

    pub fn current_state(&self) -> OutageState {
        self.current_state
    }

    pub fn history(&self) -> &[OutageTransition] {
        &self.history
    }

    pub fn into_history(self) -> Vec<OutageTransition> {
        self.history
    }

    pub fn is_valid_transition(&self, target: OutageState) -> bool {
        matches!(
            (self.current_state, target),
            (OutageState::Idle, OutageState::OutageInjected)
                | (OutageState::OutageInjected, OutageState::Monitoring)
                | (OutageState::Monitoring, OutageState::Reconnected)
                | (OutageState::Monitoring, OutageState::TimedOut)
        )
    }

    pub fn transition_to(&mut self, target: OutageState, reason: Option<String>) -> Result<()> {
        if !self.is_valid_transition(target) {
            return Err(Error::invalid_transition(
                &self.variant_id,
                self.current_state.to_string(),
                target.to_string(),
            ));
        }

        let from = self.current_state;
        self.history.push(OutageTransition {
            from_state: from,
            to_state: target,
            timestamp: Utc::now(),
            reason,
        });
        self.current_state = target;

        tracing::debug!(
            "Outage simulation for {} transitioned from {} to {}",
            self.variant_id,
            from,
            target
        );
        Ok(())
    }
}
