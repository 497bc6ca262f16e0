//! # Server assembly
//!
//! Wires a [`Store`], the [`Operations`] layer, the dispatcher task, and
//! the Axum router into one runnable process, in the
//! `CallCenterServer`/`CallCenterServerBuilder` idiom: a builder collects
//! configuration, `build()` assembles the pieces, `run()` drives them to
//! completion.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::AcdConfig;
use crate::dispatcher;
use crate::operations::Operations;
use crate::store::{MemoryStore, Store};

/// Builds an [`AcdServer`] from configuration, defaulting to the
/// in-process [`MemoryStore`] when no other backend is supplied.
pub struct AcdServerBuilder {
    config: AcdConfig,
    store: Option<Arc<dyn Store>>,
}

impl AcdServerBuilder {
    pub fn new(config: AcdConfig) -> Self {
        Self { config, store: None }
    }

    /// Override the store backend (tests, or a future networked
    /// realization of [`Store`]).
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> AcdServer {
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let ops = Operations::new(store, self.config.clone());
        AcdServer { config: self.config, ops }
    }
}

/// An assembled, not-yet-running ACD server: the operations layer plus
/// the configuration needed to bind and serve.
pub struct AcdServer {
    config: AcdConfig,
    ops: Operations,
}

impl AcdServer {
    pub fn builder(config: AcdConfig) -> AcdServerBuilder {
        AcdServerBuilder::new(config)
    }

    /// Run the dispatcher and the REST surface concurrently. Returns only
    /// on a fatal bind error or when the process is asked to shut down
    /// (there is no dispatcher-side cancellation, per `spec.md` §5 —
    /// shutdown is by process termination, mirrored here by awaiting the
    /// server future and letting the dispatcher task run for the
    /// process's lifetime).
    pub async fn run(self) -> anyhow::Result<()> {
        let dispatcher_ops = self.ops.clone();
        tokio::spawn(async move {
            dispatcher::run(dispatcher_ops).await;
        });

        let router = crate::api::routes(self.ops);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("ACD server listening on {}", self.config.bind_addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_assembles_with_default_memory_store() {
        let server = AcdServer::builder(AcdConfig::default()).build();
        assert!(!server.ops.store().exists("agent:ghost").await);
    }
}
