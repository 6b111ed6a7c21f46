//! Startup recovery
//!
//! The coordinator keeps chunk locations in memory only, so a node that
//! starts (or restarts) re-registers itself and announces every intact
//! chunk it already holds. Announcements use append-if-absent, so running
//! this twice against the same coordinator leaves one entry per chunk.

use crate::common::{CoordinatorApi, Result};
use crate::node::store::ChunkStore;
use std::time::Instant;

/// Outcome of one recovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub announced: usize,
    pub failed: usize,
}

/// Register the node, then announce each locally stored chunk.
///
/// Failing to register the node aborts the pass. Failed announcements are
/// logged and counted; they do not stop the remaining chunks.
pub async fn announce_local_chunks(
    store: &ChunkStore,
    coordinator: &dyn CoordinatorApi,
    node_id: &str,
    address: &str,
) -> Result<RecoveryReport> {
    let start = Instant::now();
    coordinator.register_node(node_id, address).await?;
    tracing::info!("Registered node {} at {}", node_id, address);

    let chunks = store.list()?;
    let mut report = RecoveryReport::default();

    for chunk_id in &chunks {
        match coordinator.register_chunk(chunk_id, node_id).await {
            Ok(()) => {
                report.announced += 1;
                tracing::debug!("Announced {}", chunk_id);
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!("Failed to announce {}: {}", chunk_id, e);
            }
        }
    }

    tracing::info!(
        "Recovery done: {} announced, {} failed in {:?}",
        report.announced,
        report.failed,
        start.elapsed()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ChunkId;
    use crate::coordinator::CoordinatorService;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_announces_existing_chunks() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::open(dir.path()).unwrap();
        for i in 0..3 {
            store.put(&ChunkId::new("a.bin", i), b"data").unwrap();
        }

        let coord = CoordinatorService::in_memory();
        let report = announce_local_chunks(&store, &coord, "node-1", "http://n1")
            .await
            .unwrap();

        assert_eq!(report, RecoveryReport { announced: 3, failed: 0 });
        assert_eq!(coord.list_nodes().len(), 1);
        assert_eq!(coord.status().tracked_chunks, 3);
    }

    #[tokio::test]
    async fn test_running_twice_does_not_duplicate() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::open(dir.path()).unwrap();
        let chunk = ChunkId::new("a.bin", 0);
        store.put(&chunk, b"data").unwrap();

        let coord = CoordinatorService::in_memory();
        coord.commit_file("a.bin", vec![chunk.clone()], 4).unwrap();

        announce_local_chunks(&store, &coord, "node-1", "http://n1")
            .await
            .unwrap();
        announce_local_chunks(&store, &coord, "node-1", "http://n1")
            .await
            .unwrap();

        let resolution = coord.resolve_file("a.bin").unwrap();
        assert_eq!(resolution.chunks[0].nodes, vec!["node-1"]);
        assert_eq!(coord.list_nodes().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_still_registers() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::open(dir.path()).unwrap();
        let coord = CoordinatorService::in_memory();

        let report = announce_local_chunks(&store, &coord, "node-7", "http://n7")
            .await
            .unwrap();
        assert_eq!(report, RecoveryReport::default());
        assert_eq!(coord.lookup_node("node-7").unwrap().address, "http://n7");
    }
}
