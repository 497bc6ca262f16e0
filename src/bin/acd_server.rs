//! ACD server binary: loads configuration from the environment, wires up
//! the in-memory store, spawns the dispatcher, and serves the REST API.

use acd::{AcdConfig, AcdServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AcdConfig::from_env();
    let server = AcdServer::builder(config).build();
    server.run().await
}
