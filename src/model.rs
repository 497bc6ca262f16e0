//! Domain types: [`Contact`] and [`Agent`] (`spec.md` §3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::states::{AgentState, ContactState};

/// Key namespace for a contact document: `contact:<uuid>`.
pub fn new_contact_key() -> String {
    format!("contact:{}", Uuid::new_v4())
}

/// Hash-tagged name for the per-skill availability index that backs
/// `avail:{s}`. All skill indexes share the `{availAgentsSkill}` tag so a
/// store that shards on hash tags (as Redis Cluster does) keeps them
/// co-located and intersectable in one `ZINTER` call (`spec.md` §3
/// "Sharding note").
pub fn avail_index_name(skill: &str) -> String {
    format!("{{availAgentsSkill}}:{skill}")
}

/// The FIFO queue's ordered-set name.
pub const QUEUE: &str = "queue";

/// A unit of work awaiting or assigned to an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub skills: Vec<String>,
    pub state: ContactState,
    pub agent: Option<String>,
}

impl Contact {
    pub fn new(skills: Vec<String>) -> Self {
        Self {
            skills,
            state: ContactState::Queued,
            agent: None,
        }
    }
}

/// A worker with possessed skills and an availability state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: String,
    pub fname: String,
    pub lname: String,
    pub skills: Vec<String>,
    pub state: AgentState,
}

impl Agent {
    pub fn new(id: String, fname: String, lname: String, skills: Vec<String>) -> Self {
        Self {
            id,
            fname,
            lname,
            skills,
            state: AgentState::Unavailable,
        }
    }
}
