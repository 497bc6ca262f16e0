//! Integration test that actually binds a real TCP port and serves a
//! request over it, rather than driving the operations layer in-process.
//! Marked `#[serial]` because it claims a fixed port: run concurrently
//! with a future test that reuses the same port, the two would race on
//! the bind.

use std::time::Duration;

use acd::{AcdConfig, AcdServer};
use serial_test::serial;

const BIND_ADDR: &str = "127.0.0.1:34127";

#[tokio::test]
#[serial]
async fn acd_server_binds_a_real_tcp_port_and_serves_requests() {
    let mut config = AcdConfig::default();
    config.bind_addr = BIND_ADDR.to_string();
    let server = AcdServer::builder(config).build();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the listener a moment to actually bind before hitting it.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{BIND_ADDR}/contact"))
        .json(&serde_json::json!({ "skills": ["English"] }))
        .send()
        .await
        .expect("server should be reachable on the bound port");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let body: serde_json::Value = response.json().await.expect("JSON envelope");
    assert!(body["contact_key"].as_str().unwrap().starts_with("contact:"));
}
