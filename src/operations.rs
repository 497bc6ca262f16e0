//! # Operations layer
//!
//! Component C of `spec.md` §2/§4.2: idempotent, per-agent-locked mutators
//! used by both the REST surface ([`crate::api`]) and the dispatcher
//! ([`crate::dispatcher`]). Every agent-mutating operation here acquires
//! the same per-agent advisory lock the dispatcher's claim step uses, so
//! at most one actor at a time transitions any given agent
//! (`spec.md` §4.2's "at most one actor" guarantee).

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AcdConfig;
use crate::error::{AcdError, Outcome};
use crate::model::{avail_index_name, new_contact_key, Agent, Contact, QUEUE};
use crate::states::{AcdState, AgentState, ContactState};
use crate::store::Store;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The operations layer, parameterized over the store backend.
#[derive(Clone)]
pub struct Operations {
    store: Arc<dyn Store>,
    config: AcdConfig,
}

impl Operations {
    pub fn new(store: Arc<dyn Store>, config: AcdConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &AcdConfig {
        &self.config
    }

    async fn lock(&self, agent_key: &str) -> Option<crate::store::LockGuard> {
        self.store
            .lock(
                &format!("lock:{agent_key}"),
                self.config.lock_acquire_timeout,
                self.config.lock_hold_timeout,
            )
            .await
    }

    async fn load_agent(&self, agent_key: &str) -> Option<Agent> {
        let doc = self.store.doc_get(agent_key).await?;
        serde_json::from_value(doc).ok()
    }

    /// Fetch an agent's current document. Public mainly so integration
    /// tests can assert on agent state directly; the REST surface itself
    /// has no `GET /agent/{key}` route (`spec.md` §6 does not define
    /// one).
    pub async fn get_agent(&self, agent_key: &str) -> Outcome<Agent> {
        match self.load_agent(agent_key).await {
            Some(agent) => Outcome::Ok(agent),
            None => Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() }),
        }
    }

    // ---- ACD -------------------------------------------------------

    /// `set_acd_state`: bulk-drive every agent to the target availability.
    /// Per-agent `ERR`/`LOCKED` is swallowed (`spec.md` §4.2) — a single
    /// contended agent must not block opening or closing the whole ACD.
    pub async fn set_acd_state(&self, acd_state: AcdState) -> Outcome<AcdState> {
        let target = acd_state.target_agent_state();
        for agent_key in self.store.scan("agent:").await {
            match self.set_agent_state(&agent_key, target).await {
                Outcome::Ok(_) => {}
                Outcome::Err(err) => debug!("set_acd_state: {agent_key} skipped ({err})"),
                Outcome::Locked => debug!("set_acd_state: {agent_key} skipped (locked)"),
            }
        }
        info!("ACD set to {acd_state:?}");
        Outcome::Ok(acd_state)
    }

    // ---- Contacts ---------------------------------------------------

    /// `create_contact`: enqueue a new contact with the given required
    /// skills.
    pub async fn create_contact(&self, skills: Vec<String>) -> Outcome<String> {
        if skills.is_empty() {
            return Outcome::Err(AcdError::Validation("skills".to_string()));
        }
        let key = new_contact_key();
        let contact = Contact::new(skills);
        self.store.doc_set(&key, serde_json::to_value(&contact).expect("contact serializes")).await;
        self.store.ordered_set(QUEUE).zadd(&key, now_ms());
        info!("{key} created and queued");
        Outcome::Ok(key)
    }

    /// `complete_contact`: mark `COMPLETE` and schedule expiry. Does not
    /// remove the contact from the queue — an in-flight dispatcher pop
    /// that later observes `COMPLETE` is how abandonment is detected
    /// (`spec.md` §4.4 step 6, I6).
    pub async fn complete_contact(&self, contact_key: &str) -> Outcome<String> {
        let patched = self
            .store
            .doc_patch(contact_key, "state", json!(ContactState::Complete))
            .await;
        if !patched {
            return Outcome::Err(AcdError::NotFound { kind: "contact", key: contact_key.to_string() });
        }
        self.store.expire(contact_key, self.config.contact_ttl).await;
        info!("{contact_key} completed");
        Outcome::Ok(contact_key.to_string())
    }

    /// `get_contact`: fetch a contact's current document.
    pub async fn get_contact(&self, contact_key: &str) -> Outcome<Contact> {
        match self.store.doc_get(contact_key).await {
            Some(doc) => match serde_json::from_value(doc) {
                Ok(contact) => Outcome::Ok(contact),
                Err(err) => Outcome::Err(AcdError::Store(err.to_string())),
            },
            None => Outcome::Err(AcdError::NotFound { kind: "contact", key: contact_key.to_string() }),
        }
    }

    // ---- Agents -------------------------------------------------------

    /// `create_agent`: register a new agent, `UNAVAILABLE` by default.
    pub async fn create_agent(&self, agent_key: &str, fname: String, lname: String, skills: Vec<String>) -> Outcome<String> {
        let Some(_guard) = self.lock(agent_key).await else {
            return Outcome::Locked;
        };
        if self.store.exists(agent_key).await {
            return Outcome::Err(AcdError::AlreadyExists { kind: "agent", key: agent_key.to_string() });
        }
        let agent = Agent::new(agent_key.to_string(), fname, lname, skills);
        self.store.doc_set(agent_key, serde_json::to_value(&agent).expect("agent serializes")).await;
        info!("{agent_key} created");
        Outcome::Ok(agent_key.to_string())
    }

    /// `delete_agent`: remove an agent and scrub it from every
    /// availability index it was counted in.
    pub async fn delete_agent(&self, agent_key: &str) -> Outcome<String> {
        let Some(_guard) = self.lock(agent_key).await else {
            return Outcome::Locked;
        };
        let Some(agent) = self.load_agent(agent_key).await else {
            return Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() });
        };
        for skill in &agent.skills {
            self.store.ordered_set(&avail_index_name(skill)).zrem(agent_key);
        }
        self.store.delete(agent_key).await;
        info!("{agent_key} deleted");
        Outcome::Ok(agent_key.to_string())
    }

    /// `set_agent_state`: flip an agent between `AVAILABLE` and
    /// `UNAVAILABLE`, maintaining every `avail:{s}` index it belongs to
    /// (I1). This is also the dispatcher's atomic claim primitive
    /// (`spec.md` §4.4 step 4): claiming an agent *is* calling this with
    /// `UNAVAILABLE`.
    pub async fn set_agent_state(&self, agent_key: &str, target: AgentState) -> Outcome<String> {
        let Some(_guard) = self.lock(agent_key).await else {
            return Outcome::Locked;
        };
        let Some(agent) = self.load_agent(agent_key).await else {
            return Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() });
        };
        if agent.state == target {
            let state_name = if target == AgentState::Available { "AVAILABLE" } else { "UNAVAILABLE" };
            return Outcome::Err(AcdError::AlreadyInState { key: agent_key.to_string(), state: state_name });
        }

        match target {
            AgentState::Available => {
                // Score is taken fresh, inside the locked section, so
                // concurrent transitions of this agent serialize into
                // monotonically increasing scores (`spec.md` §4.2).
                let score = now_ms();
                for skill in &agent.skills {
                    self.store.ordered_set(&avail_index_name(skill)).zadd(agent_key, score);
                }
            }
            AgentState::Unavailable => {
                // Removal from every avail:{s} index MUST precede the
                // JSON state flip (`spec.md` §4.2's ordering rule for
                // UNAVAILABLE), so the dispatcher never observes an
                // agent in the index after it has gone unavailable.
                for skill in &agent.skills {
                    self.store.ordered_set(&avail_index_name(skill)).zrem(agent_key);
                }
            }
        }
        self.store.doc_patch(agent_key, "state", serde_json::to_value(target).expect("state serializes")).await;
        Outcome::Ok(agent_key.to_string())
    }

    /// `change_agent_info`: update display fields. Unlocked, matching the
    /// upstream original — `fname`/`lname` do not interact with the
    /// availability indexes, so no serialization is required beyond
    /// whatever the store itself guarantees per-call.
    pub async fn change_agent_info(&self, agent_key: &str, fname: String, lname: String) -> Outcome<String> {
        if !self.store.exists(agent_key).await {
            return Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() });
        }
        self.store
            .doc_mpatch(agent_key, &[("fname", json!(fname)), ("lname", json!(lname))])
            .await;
        Outcome::Ok(agent_key.to_string())
    }

    /// `add_agent_skill`: append a skill; if the agent is currently
    /// `AVAILABLE`, it becomes immediately discoverable for that skill.
    pub async fn add_agent_skill(&self, agent_key: &str, skill: &str) -> Outcome<String> {
        let Some(_guard) = self.lock(agent_key).await else {
            return Outcome::Locked;
        };
        let Some(agent) = self.load_agent(agent_key).await else {
            return Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() });
        };
        self.store.arr_append(agent_key, "skills", json!(skill)).await;
        if agent.state == AgentState::Available {
            self.store.ordered_set(&avail_index_name(skill)).zadd(agent_key, now_ms());
        }
        info!("{agent_key} gained skill {skill}");
        Outcome::Ok(agent_key.to_string())
    }

    /// `delete_agent_skill`: remove a skill and drop the agent from the
    /// associated availability index, if present there.
    pub async fn delete_agent_skill(&self, agent_key: &str, skill: &str) -> Outcome<String> {
        let Some(_guard) = self.lock(agent_key).await else {
            return Outcome::Locked;
        };
        if !self.store.exists(agent_key).await {
            return Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() });
        }
        let Some(idx) = self.store.arr_index(agent_key, "skills", &json!(skill)).await else {
            return Outcome::Err(AcdError::SkillAbsent(agent_key.to_string(), skill.to_string()));
        };
        self.store.arr_pop(agent_key, "skills", idx).await;
        self.store.ordered_set(&avail_index_name(skill)).zrem(agent_key);
        info!("{agent_key} lost skill {skill}");
        Outcome::Ok(agent_key.to_string())
    }

    /// `delete_skill`: remove a skill from the system entirely — drop its
    /// availability index and strip it from every agent that has it.
    ///
    /// Deliberately unlocked at the skill level (matches the Python
    /// original): a concurrent `add_agent_skill` for this exact skill may
    /// interleave and leave an agent holding a skill whose index was just
    /// cleared. `set_agent_state(AVAILABLE)` recreates the index on
    /// demand (`zadd` on an absent set creates it), so this self-heals
    /// (`spec.md` §9 Open Questions).
    pub async fn delete_skill(&self, skill: &str) -> Outcome<String> {
        self.store.ordered_set(&avail_index_name(skill)).clear();
        for agent_key in self.store.scan("agent:").await {
            match self.delete_agent_skill(&agent_key, skill).await {
                Outcome::Ok(_) | Outcome::Err(AcdError::SkillAbsent(..)) => {}
                Outcome::Err(err) => warn!("delete_skill: {agent_key} - {err}"),
                Outcome::Locked => warn!("delete_skill: {agent_key} locked, skill removal deferred"),
            }
        }
        info!("skill {skill} deleted");
        Outcome::Ok(skill.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ops() -> Operations {
        Operations::new(Arc::new(MemoryStore::new()), AcdConfig::default())
    }

    #[tokio::test]
    async fn create_contact_rejects_empty_skills() {
        let ops = ops();
        assert!(matches!(ops.create_contact(vec![]).await, Outcome::Err(AcdError::Validation(_))));
    }

    #[tokio::test]
    async fn create_contact_enqueues_and_is_retrievable() {
        let ops = ops();
        let Outcome::Ok(key) = ops.create_contact(vec!["English".into()]).await else { panic!() };
        assert!(ops.store.ordered_set(QUEUE).contains(&key));
        let Outcome::Ok(contact) = ops.get_contact(&key).await else { panic!() };
        assert_eq!(contact.state, ContactState::Queued);
        assert_eq!(contact.agent, None);
    }

    #[tokio::test]
    async fn complete_contact_unknown_key_errors() {
        let ops = ops();
        assert!(matches!(ops.complete_contact("contact:nope").await, Outcome::Err(AcdError::NotFound { .. })));
    }

    #[tokio::test]
    async fn complete_contact_transitions_and_schedules_expiry() {
        let ops = ops();
        let Outcome::Ok(key) = ops.create_contact(vec!["English".into()]).await else { panic!() };
        let Outcome::Ok(_) = ops.complete_contact(&key).await else { panic!() };
        let Outcome::Ok(contact) = ops.get_contact(&key).await else { panic!() };
        assert_eq!(contact.state, ContactState::Complete);
    }

    #[tokio::test]
    async fn create_agent_rejects_duplicate() {
        let ops = ops();
        assert!(matches!(
            ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await,
            Outcome::Ok(_)
        ));
        assert!(matches!(
            ops.create_agent("agent:1", "Bea".into(), "Smith".into(), vec![]).await,
            Outcome::Err(AcdError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn set_agent_state_available_populates_indexes() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into(), "Billing".into()])
            .await;
        let Outcome::Ok(_) = ops.set_agent_state("agent:1", AgentState::Available).await else { panic!() };
        assert!(ops.store.ordered_set(&avail_index_name("English")).contains("agent:1"));
        assert!(ops.store.ordered_set(&avail_index_name("Billing")).contains("agent:1"));
    }

    #[tokio::test]
    async fn set_agent_state_unavailable_clears_indexes() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.set_agent_state("agent:1", AgentState::Available).await;
        ops.set_agent_state("agent:1", AgentState::Unavailable).await;
        assert!(!ops.store.ordered_set(&avail_index_name("English")).contains("agent:1"));
    }

    #[tokio::test]
    async fn set_agent_state_already_in_state_is_err() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        // Agent starts UNAVAILABLE.
        assert!(matches!(
            ops.set_agent_state("agent:1", AgentState::Unavailable).await,
            Outcome::Err(AcdError::AlreadyInState { .. })
        ));
    }

    #[tokio::test]
    async fn delete_agent_scrubs_availability_indexes() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.set_agent_state("agent:1", AgentState::Available).await;
        ops.delete_agent("agent:1").await;
        assert!(!ops.store.ordered_set(&avail_index_name("English")).contains("agent:1"));
        assert!(!ops.store.exists("agent:1").await);
    }

    #[tokio::test]
    async fn add_and_delete_agent_skill() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.set_agent_state("agent:1", AgentState::Available).await;
        ops.add_agent_skill("agent:1", "Billing").await;
        assert!(ops.store.ordered_set(&avail_index_name("Billing")).contains("agent:1"));

        let Outcome::Ok(_) = ops.delete_agent_skill("agent:1", "Billing").await else { panic!() };
        assert!(!ops.store.ordered_set(&avail_index_name("Billing")).contains("agent:1"));
        assert!(matches!(
            ops.delete_agent_skill("agent:1", "Billing").await,
            Outcome::Err(AcdError::SkillAbsent(..))
        ));
    }

    #[tokio::test]
    async fn delete_skill_cascades_to_all_agents() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into(), "Billing".into()])
            .await;
        ops.set_agent_state("agent:1", AgentState::Available).await;
        ops.delete_skill("Billing").await;
        assert!(ops.store.ordered_set(&avail_index_name("Billing")).is_empty());
        let Outcome::Ok(agent) = ops.get_contact_agent_skills("agent:1").await else { panic!() };
        assert_eq!(agent, vec!["English".to_string()]);
        assert!(ops.store.ordered_set(&avail_index_name("English")).contains("agent:1"));
    }

    #[tokio::test]
    async fn set_acd_state_open_makes_all_agents_available() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.create_agent("agent:2", "Bea".into(), "Smith".into(), vec!["Spanish".into()]).await;
        ops.set_acd_state(AcdState::Open).await;
        assert!(ops.store.ordered_set(&avail_index_name("English")).contains("agent:1"));
        assert!(ops.store.ordered_set(&avail_index_name("Spanish")).contains("agent:2"));
    }

    #[tokio::test]
    async fn set_acd_state_closed_empties_all_indexes() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.set_acd_state(AcdState::Open).await;
        ops.set_acd_state(AcdState::Closed).await;
        assert!(ops.store.ordered_set(&avail_index_name("English")).is_empty());
    }

    // test-only helper kept local to this module
    impl Operations {
        async fn get_contact_agent_skills(&self, agent_key: &str) -> Outcome<Vec<String>> {
            match self.load_agent(agent_key).await {
                Some(agent) => Outcome::Ok(agent.skills),
                None => Outcome::Err(AcdError::NotFound { kind: "agent", key: agent_key.to_string() }),
            }
        }
    }
}
