//! Wire-compatible state encodings.
//!
//! Numeric values are part of the external contract (`spec.md` §6) and must
//! not be renumbered: REST clients and the load simulator depend on them.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Availability of an [`Agent`](crate::model::Agent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum AgentState {
    Unavailable = 0,
    Available = 1,
}

/// Open/closed state of the whole ACD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum AcdState {
    Closed = 0,
    Open = 1,
}

impl AcdState {
    /// The agent state every agent is driven to when the ACD moves to this state.
    pub fn target_agent_state(self) -> AgentState {
        match self {
            AcdState::Open => AgentState::Available,
            AcdState::Closed => AgentState::Unavailable,
        }
    }
}

/// Lifecycle state of a [`Contact`](crate::model::Contact).
///
/// `QUEUED -> ASSIGNED -> COMPLETE`, with `QUEUED -> COMPLETE` possible
/// directly (abandonment, `spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ContactState {
    Queued = 1,
    Assigned = 2,
    Complete = 3,
}
