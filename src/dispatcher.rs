//! # Dispatcher
//!
//! Component D of `spec.md` §2/§4.4: the single consumer that drains the
//! FIFO `queue`, finds the longest-available agent with the required
//! skills, and claims one. Modeled on the Python original's `dispatch`
//! loop one-for-one, using the same primitives the REST surface uses —
//! claiming an agent *is* `Operations::set_agent_state(UNAVAILABLE)`, the
//! exact call a client would make by hand.

use std::time::Duration;

use rand::Rng;
use tracing::{error, info};

use crate::error::Outcome;
use crate::model::{avail_index_name, QUEUE};
use crate::operations::Operations;
use crate::states::{AgentState, ContactState};
use crate::store::zinter;

/// Run the dispatch loop forever. Intended to be spawned as its own task
/// alongside the REST server (`spec.md` §4.4: "runs as an independent,
/// long-lived task... one logical instance"). Errors from any single
/// iteration are logged and swallowed — one bad contact must never stop
/// the loop (matches the Python original's outer `try`/`except`).
pub async fn run(ops: Operations) {
    info!("dispatcher started");
    loop {
        if let Err(err) = dispatch_once(&ops).await {
            error!("dispatcher: {err}");
        }
    }
}

async fn dispatch_once(ops: &Operations) -> Result<(), String> {
    let queue = ops.store().ordered_set(QUEUE);
    // Blocks indefinitely for the next contact, exactly like the
    // Python original's `BZPOPMIN` with no timeout.
    let Some((contact_key, timestamp)) = queue.zpop_min_blocking(None).await else {
        return Ok(());
    };

    let contact = match ops.get_contact(&contact_key).await {
        Outcome::Ok(contact) => contact,
        Outcome::Err(err) => return Err(format!("{contact_key}: {err}")),
        Outcome::Locked => return Err(format!("{contact_key}: unexpectedly locked")),
    };

    let avail_sets: Vec<_> = contact.skills.iter().map(|s| ops.store().ordered_set(&avail_index_name(s))).collect();
    let avail_refs: Vec<_> = avail_sets.iter().map(|s| s.as_ref()).collect();
    let candidates = zinter(&avail_refs);

    let mut found = false;
    for agent_key in candidates {
        match ops.set_agent_state(&agent_key, AgentState::Unavailable).await {
            Outcome::Ok(_) => {
                ops.store()
                    .doc_mpatch(
                        &contact_key,
                        &[
                            ("agent", serde_json::json!(agent_key)),
                            ("state", serde_json::to_value(ContactState::Assigned).expect("state serializes")),
                        ],
                    )
                    .await;
                info!("{contact_key} assigned to {agent_key}");
                found = true;
                break;
            }
            // Already UNAVAILABLE, or momentarily locked by another
            // claimant: try the next candidate, exactly like the Python
            // original does on any non-OK response.
            Outcome::Err(_) | Outcome::Locked => continue,
        }
    }

    if !found {
        let abandoned = matches!(ops.get_contact(&contact_key).await, Outcome::Ok(c) if c.state == ContactState::Complete);
        if !abandoned {
            // Requeue with a decelerator so other, possibly-matchable
            // contacts get a turn ahead of this one (`spec.md` §4.4 step
            // 6, I6 abandonment still honored on the next pop).
            let decel_ms = ops.config().requeue_decelerator.as_millis() as i64;
            queue.zadd(&contact_key, timestamp + decel_ms);
            info!("{contact_key} queued");
            let jitter_ms = rand::thread_rng().gen_range(0..2000);
            tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AcdConfig;
    use crate::store::MemoryStore;

    fn ops() -> Operations {
        Operations::new(Arc::new(MemoryStore::new()), AcdConfig::default())
    }

    #[tokio::test]
    async fn assigns_the_longest_available_matching_agent() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.create_agent("agent:2", "Bea".into(), "Smith".into(), vec!["English".into()]).await;
        // agent:1 available first, so it's the longer-idle candidate.
        ops.set_agent_state("agent:1", AgentState::Available).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        ops.set_agent_state("agent:2", AgentState::Available).await;

        let Outcome::Ok(contact_key) = ops.create_contact(vec!["English".into()]).await else { panic!() };
        dispatch_once(&ops).await.unwrap();

        let Outcome::Ok(contact) = ops.get_contact(&contact_key).await else { panic!() };
        assert_eq!(contact.state, ContactState::Assigned);
        assert_eq!(contact.agent, Some("agent:1".to_string()));
    }

    #[tokio::test]
    async fn requeues_when_no_agent_has_the_skill() {
        let ops = ops();
        let Outcome::Ok(contact_key) = ops.create_contact(vec!["Spanish".into()]).await else { panic!() };
        dispatch_once(&ops).await.unwrap();

        assert!(ops.store().ordered_set(QUEUE).contains(&contact_key));
        let Outcome::Ok(contact) = ops.get_contact(&contact_key).await else { panic!() };
        assert_eq!(contact.state, ContactState::Queued);
    }

    #[tokio::test]
    async fn does_not_requeue_an_abandoned_contact() {
        let ops = ops();
        let Outcome::Ok(contact_key) = ops.create_contact(vec!["Spanish".into()]).await else { panic!() };
        ops.complete_contact(&contact_key).await;
        dispatch_once(&ops).await.unwrap();

        assert!(!ops.store().ordered_set(QUEUE).contains(&contact_key));
    }

    #[tokio::test]
    async fn falls_through_to_next_candidate_when_first_is_already_claimed() {
        let ops = ops();
        ops.create_agent("agent:1", "Ada".into(), "Lovelace".into(), vec!["English".into()]).await;
        ops.create_agent("agent:2", "Bea".into(), "Smith".into(), vec!["English".into()]).await;
        ops.set_agent_state("agent:1", AgentState::Available).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        ops.set_agent_state("agent:2", AgentState::Available).await;
        // Simulate agent:1 already having been claimed by a racing dispatch.
        ops.set_agent_state("agent:1", AgentState::Unavailable).await;

        let Outcome::Ok(contact_key) = ops.create_contact(vec!["English".into()]).await else { panic!() };
        dispatch_once(&ops).await.unwrap();

        let Outcome::Ok(contact) = ops.get_contact(&contact_key).await else { panic!() };
        assert_eq!(contact.agent, Some("agent:2".to_string()));
    }
}
