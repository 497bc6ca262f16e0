//! # Load simulator
//!
//! Reproduces the upstream `simulator.py`'s three-phase flow against a
//! running ACD server over HTTP: open the ACD with a roster of agents
//! carrying random skills, fire off a burst of contacts each with random
//! skill requirements, then close the ACD. Each contact either rides out
//! to an assignment (and frees its agent back to AVAILABLE) or is
//! abandoned mid-wait, same as the original.

use std::time::Duration;

use clap::Parser;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use tracing::info;

const DEFAULT_AGENTS: usize = 40;
const DEFAULT_CONTACTS: usize = 100;

const LANGUAGES: [&str; 2] = ["English", "Spanish"];
const EXPERTISE: [&str; 3] = ["Support", "Disputes", "Billing"];
const FIRST_NAMES: [&str; 8] = ["Ada", "Grace", "Alan", "Katherine", "Linus", "Margaret", "Claude", "Barbara"];
const LAST_NAMES: [&str; 8] = ["Lovelace", "Hopper", "Turing", "Johnson", "Torvalds", "Hamilton", "Shannon", "Liskov"];

#[derive(Parser, Debug)]
#[command(about = "Basic ACD simulator")]
struct Args {
    /// Number of agents in the simulation.
    #[arg(long, default_value_t = DEFAULT_AGENTS)]
    agents: usize,

    /// Number of contacts in the simulation.
    #[arg(long, default_value_t = DEFAULT_CONTACTS)]
    contacts: usize,
}

fn random_skill_pair() -> Vec<String> {
    let mut rng = rand::thread_rng();
    vec![
        LANGUAGES.choose(&mut rng).unwrap().to_string(),
        EXPERTISE.choose(&mut rng).unwrap().to_string(),
    ]
}

async fn open_acd(client: &reqwest::Client, rest_url: &str, agents: usize) {
    let mut rng = rand::thread_rng();
    for i in 0..agents {
        let payload = json!({
            "fname": FIRST_NAMES.choose(&mut rng).unwrap(),
            "lname": LAST_NAMES.choose(&mut rng).unwrap(),
            "skills": random_skill_pair(),
        });
        let _ = client.post(format!("{rest_url}/agent/agent:{i}")).json(&payload).send().await;
    }
    let _ = client.post(format!("{rest_url}/acd")).json(&json!({ "state": 1 })).send().await;
}

async fn generate(client: reqwest::Client, rest_url: String) {
    let payload = json!({ "skills": random_skill_pair() });
    let Ok(response) = client.post(format!("{rest_url}/contact")).json(&payload).send().await else {
        return;
    };
    if !response.status().is_success() {
        return;
    }
    let Ok(body) = response.json::<serde_json::Value>().await else {
        return;
    };
    let Some(contact_key) = body["contact_key"].as_str().map(str::to_string) else {
        return;
    };

    let wait_secs = rand::thread_rng().gen_range(1.0..3.0);
    tokio::time::sleep(Duration::from_secs_f64(wait_secs)).await;

    if let Ok(response) = client.get(format!("{rest_url}/contact/{contact_key}")).send().await {
        if let Ok(body) = response.json::<serde_json::Value>().await {
            if body["state"] == json!(2) {
                let agent = body["agent"].as_str().unwrap_or_default().to_string();
                info!("{contact_key} complete with {agent}");
                let _ = client
                    .patch(format!("{rest_url}/agent/{agent}/state"))
                    .json(&json!({ "state": 1 }))
                    .send()
                    .await;
            } else {
                info!("{contact_key} abandoned");
            }
        }
    }

    let _ = client.patch(format!("{rest_url}/contact/{contact_key}")).send().await;
}

async fn close_acd(client: &reqwest::Client, rest_url: &str) {
    let _ = client.post(format!("{rest_url}/acd")).json(&json!({ "state": 0 })).send().await;
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let rest_url = std::env::var("REST_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let client = reqwest::Client::new();

    info!("simulator started");
    open_acd(&client, &rest_url, args.agents).await;

    let mut handles = Vec::with_capacity(args.contacts);
    for _ in 0..args.contacts {
        handles.push(tokio::spawn(generate(client.clone(), rest_url.clone())));
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    for handle in handles {
        let _ = handle.await;
    }
    tokio::time::sleep(Duration::from_secs(3)).await;

    close_acd(&client, &rest_url).await;
}
