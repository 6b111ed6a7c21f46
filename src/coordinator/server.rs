//! Coordinator server

use crate::common::{CoordinatorConfig, Result};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::service::CoordinatorService;
use std::sync::Arc;

pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Namespace snapshot: {}", self.config.snapshot_path.display());

        let service = Arc::new(CoordinatorService::open(&self.config.snapshot_path)?);
        tracing::info!(
            "  {} file(s) in namespace, waiting for nodes to announce",
            service.status().files
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        serve_listener(listener, service).await
    }
}

/// Serve the coordinator API on an already bound listener
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    service: Arc<CoordinatorService>,
) -> Result<()> {
    let router = create_router(CoordState { service });

    tracing::info!("✓ Coordinator ready on {}", listener.local_addr()?);

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("HTTP server error: {}", e);
        return Err(e.into());
    }

    tracing::info!("Coordinator stopped");
    Ok(())
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
