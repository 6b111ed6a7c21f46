//! Storage node server

use crate::client::remote::HttpCoordinatorClient;
use crate::common::{format_bytes, CoordinatorApi, NodeConfig, Result};
use crate::coordinator::server::shutdown_signal;
use crate::node::http::{create_router, NodeState};
use crate::node::recovery::announce_local_chunks;
use crate::node::store::ChunkStore;
use std::sync::Arc;
use std::time::Duration;

/// Timeout for coordinator calls made during recovery
const RECOVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct NodeServer {
    config: NodeConfig,
}

impl NodeServer {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        let address = self.config.advertised();
        tracing::info!("Starting storage node: {}", self.config.node_id);
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Advertised as: {}", address);
        tracing::info!("  Data path: {}", self.config.data_path.display());
        tracing::info!("  Coordinator: {}", self.config.coordinator_url);

        let store = Arc::new(ChunkStore::open(&self.config.data_path)?);
        let stats = store.stats()?;
        tracing::info!(
            "  {} chunk(s) on disk ({}), {} corrupted",
            stats.chunks,
            format_bytes(stats.total_bytes),
            stats.corrupted
        );
        let coordinator =
            HttpCoordinatorClient::new(&self.config.coordinator_url, Some(RECOVERY_TIMEOUT))?;

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        serve_listener(
            listener,
            store,
            &coordinator,
            &self.config.node_id,
            &address,
            self.config.max_chunk_bytes,
        )
        .await
    }
}

/// Announce local chunks, then serve the node API on an already bound
/// listener.
///
/// Connections arriving during recovery wait in the listen backlog.
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    store: Arc<ChunkStore>,
    coordinator: &dyn CoordinatorApi,
    node_id: &str,
    address: &str,
    max_chunk_bytes: usize,
) -> Result<()> {
    if let Err(e) = announce_local_chunks(&store, coordinator, node_id, address).await {
        tracing::error!("Startup recovery failed: {}", e);
        return Err(e);
    }

    let router = create_router(
        NodeState {
            store,
            node_id: node_id.to_string(),
        },
        max_chunk_bytes,
    );

    tracing::info!("✓ Storage node {} ready on {}", node_id, listener.local_addr()?);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("HTTP server error: {}", e);
        return Err(e.into());
    }

    tracing::info!("Storage node {} stopped", node_id);
    Ok(())
}
