//! Coordinator state and operations
//!
//! Owns the persisted namespace, the volatile location directory and node
//! registry, and the placement cursor. Each operation touches one map key
//! atomically; nothing spans keys. A resolve that races a commit of the
//! same file can therefore observe a mix of old and new state.

use crate::common::{
    ChunkId, ChunkPlacement, CoordinatorApi, CoordinatorStatus, Error, NodeInfo, Resolution,
    Result,
};
use crate::common::utils::validate_file_name;
use crate::coordinator::directory::LocationDirectory;
use crate::coordinator::namespace::Namespace;
use crate::coordinator::placement::PlacementManager;
use crate::coordinator::registry::NodeRegistry;
use async_trait::async_trait;
use std::path::Path;

pub struct CoordinatorService {
    namespace: Namespace,
    directory: LocationDirectory,
    registry: NodeRegistry,
    placement: PlacementManager,
}

impl CoordinatorService {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            directory: LocationDirectory::new(),
            registry: NodeRegistry::new(),
            placement: PlacementManager::new(),
        }
    }

    /// Coordinator whose namespace is persisted at `snapshot_path`
    pub fn open(snapshot_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Namespace::open(snapshot_path)?))
    }

    pub fn in_memory() -> Self {
        Self::new(Namespace::in_memory())
    }

    pub fn register_node(&self, node_id: &str, address: &str) -> Result<()> {
        if node_id.is_empty() {
            return Err(Error::InvalidConfig("node id cannot be empty".into()));
        }
        if self.registry.register(node_id, address) {
            tracing::info!("Storage node registered: {} at {}", node_id, address);
        } else {
            tracing::info!("Storage node re-registered: {} at {}", node_id, address);
        }
        Ok(())
    }

    pub fn list_nodes(&self) -> Vec<NodeInfo> {
        self.registry.snapshot()
    }

    pub fn lookup_node(&self, node_id: &str) -> Result<NodeInfo> {
        self.registry
            .lookup(node_id)
            .ok_or_else(|| Error::NodeUnreachable {
                node: node_id.to_string(),
                reason: "node is not registered".into(),
            })
    }

    pub fn next_node(&self) -> Result<NodeInfo> {
        let node = self.placement.next_node(&self.registry)?;
        tracing::debug!("Placement -> {}", node.id);
        Ok(node)
    }

    /// Upload path: always appends
    pub fn record_chunk_location(&self, chunk_id: ChunkId, node_id: &str) {
        tracing::debug!("Chunk {} stored on {}", chunk_id, node_id);
        self.directory.record(chunk_id, node_id);
    }

    /// Node announcement path: appends only if absent
    pub fn register_chunk(&self, chunk_id: ChunkId, node_id: &str) {
        let added = self.directory.register(chunk_id.clone(), node_id);
        tracing::debug!(
            "Node {} announced chunk {}{}",
            node_id,
            chunk_id,
            if added { "" } else { " (already known)" }
        );
    }

    /// Node holding the most recently stored copy of one chunk
    pub fn locate_chunk(&self, chunk_id: &ChunkId) -> Result<NodeInfo> {
        let nodes = self
            .directory
            .locations(chunk_id)
            .ok_or_else(|| Error::ChunkLocationMissing {
                file: chunk_id.file().to_string(),
                chunks: vec![chunk_id.to_string()],
            })?;
        let placement = ChunkPlacement {
            chunk_id: chunk_id.clone(),
            nodes,
        };
        let node_id = placement.newest().unwrap_or_default();
        self.lookup_node(node_id)
    }

    pub fn commit_file(&self, name: &str, chunks: Vec<ChunkId>, size: u64) -> Result<()> {
        validate_file_name(name)?;
        let count = chunks.len();
        self.namespace.commit(name, chunks, size)?;
        tracing::info!("File committed: {} ({} chunk(s), {} bytes)", name, count, size);
        Ok(())
    }

    /// Resolve a committed file to its chunk locations.
    ///
    /// Chunks with no recorded location go to `Resolution::missing`.
    pub fn resolve_file(&self, name: &str) -> Result<Resolution> {
        let entry = self.namespace.get(name).ok_or_else(|| {
            tracing::debug!("Resolve of unknown file: {}", name);
            Error::FileNotFound(name.to_string())
        })?;

        let mut chunks = Vec::with_capacity(entry.chunks.len());
        let mut missing = Vec::new();
        for chunk_id in entry.chunks {
            match self.directory.locations(&chunk_id) {
                Some(nodes) => chunks.push(ChunkPlacement { chunk_id, nodes }),
                None => {
                    tracing::warn!("Chunk {} has no known location on any node", chunk_id);
                    missing.push(chunk_id);
                }
            }
        }

        Ok(Resolution {
            file: name.to_string(),
            size: entry.size,
            chunks,
            missing,
        })
    }

    pub fn list_files(&self) -> Vec<String> {
        self.namespace.list()
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            files: self.namespace.len(),
            nodes: self.registry.len(),
            tracked_chunks: self.directory.len(),
            placements: self.placement.placements(),
        }
    }
}

#[async_trait]
impl CoordinatorApi for CoordinatorService {
    async fn register_node(&self, node_id: &str, address: &str) -> Result<()> {
        CoordinatorService::register_node(self, node_id, address)
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        Ok(CoordinatorService::list_nodes(self))
    }

    async fn lookup_node(&self, node_id: &str) -> Result<NodeInfo> {
        CoordinatorService::lookup_node(self, node_id)
    }

    async fn next_node(&self) -> Result<NodeInfo> {
        CoordinatorService::next_node(self)
    }

    async fn record_chunk_location(&self, chunk_id: &ChunkId, node_id: &str) -> Result<()> {
        CoordinatorService::record_chunk_location(self, chunk_id.clone(), node_id);
        Ok(())
    }

    async fn register_chunk(&self, chunk_id: &ChunkId, node_id: &str) -> Result<()> {
        CoordinatorService::register_chunk(self, chunk_id.clone(), node_id);
        Ok(())
    }

    async fn locate_chunk(&self, chunk_id: &ChunkId) -> Result<NodeInfo> {
        CoordinatorService::locate_chunk(self, chunk_id)
    }

    async fn commit_file(&self, name: &str, chunks: &[ChunkId], size: u64) -> Result<()> {
        CoordinatorService::commit_file(self, name, chunks.to_vec(), size)
    }

    async fn resolve_file(&self, name: &str) -> Result<Resolution> {
        CoordinatorService::resolve_file(self, name)
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        Ok(CoordinatorService::list_files(self))
    }

    async fn status(&self) -> Result<CoordinatorStatus> {
        Ok(CoordinatorService::status(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn ids(file: &str, n: u64) -> Vec<ChunkId> {
        (0..n).map(|i| ChunkId::new(file, i)).collect()
    }

    #[test]
    fn test_resolve_unknown_file() {
        let coord = CoordinatorService::in_memory();
        let err = coord.resolve_file("nonexistent").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(name) if name == "nonexistent"));
    }

    #[test]
    fn test_resolve_reports_missing_locations() {
        let coord = CoordinatorService::in_memory();
        let chunks = ids("f.bin", 3);
        coord.record_chunk_location(chunks[0].clone(), "node-1");
        coord.record_chunk_location(chunks[2].clone(), "node-2");
        coord.commit_file("f.bin", chunks.clone(), 300).unwrap();

        let resolution = coord.resolve_file("f.bin").unwrap();
        assert_eq!(resolution.size, 300);
        assert_eq!(resolution.chunks.len(), 2);
        assert_eq!(resolution.missing, vec![chunks[1].clone()]);
        assert!(!resolution.is_complete());
    }

    #[test]
    fn test_resolve_returns_copies_in_order() {
        let coord = CoordinatorService::in_memory();
        let chunks = ids("f.bin", 12);
        for (i, chunk) in chunks.iter().enumerate() {
            coord.record_chunk_location(chunk.clone(), &format!("node-{}", i % 3));
        }
        coord.commit_file("f.bin", chunks.clone(), 12).unwrap();

        let resolution = coord.resolve_file("f.bin").unwrap();
        let resolved: Vec<ChunkId> = resolution.chunks.iter().map(|p| p.chunk_id.clone()).collect();
        assert_eq!(resolved, chunks);

        // Later records do not leak into an earlier resolution
        coord.record_chunk_location(chunks[0].clone(), "node-9");
        assert_eq!(resolution.chunks[0].nodes, vec!["node-0"]);
    }

    #[test]
    fn test_locate_chunk_prefers_latest_store() {
        let coord = CoordinatorService::in_memory();
        coord.register_node("node-1", "http://a").unwrap();
        coord.register_node("node-2", "http://b").unwrap();
        let chunk = ChunkId::new("f.bin", 0);

        assert!(matches!(
            coord.locate_chunk(&chunk),
            Err(Error::ChunkLocationMissing { .. })
        ));

        coord.record_chunk_location(chunk.clone(), "node-1");
        assert_eq!(coord.locate_chunk(&chunk).unwrap().address, "http://a");

        // Overwrite landed elsewhere; the old copy is stale
        coord.record_chunk_location(chunk.clone(), "node-2");
        assert_eq!(coord.locate_chunk(&chunk).unwrap().id, "node-2");

        coord.record_chunk_location(ChunkId::new("f.bin", 1), "node-7");
        assert!(matches!(
            coord.locate_chunk(&ChunkId::new("f.bin", 1)),
            Err(Error::NodeUnreachable { .. })
        ));
    }

    #[test]
    fn test_empty_file_resolves_complete() {
        let coord = CoordinatorService::in_memory();
        coord.commit_file("empty", vec![], 0).unwrap();
        let resolution = coord.resolve_file("empty").unwrap();
        assert!(resolution.chunks.is_empty());
        assert!(resolution.is_complete());
    }

    #[test]
    fn test_register_node_leaves_directory_alone() {
        let coord = CoordinatorService::in_memory();
        coord.register_node("node-1", "http://a").unwrap();
        coord.register_node("node-1", "http://b").unwrap();
        let status = coord.status();
        assert_eq!(status.nodes, 1);
        assert_eq!(status.tracked_chunks, 0);
        assert_eq!(coord.lookup_node("node-1").unwrap().address, "http://b");
        assert!(matches!(
            coord.lookup_node("node-2"),
            Err(Error::NodeUnreachable { .. })
        ));
    }

    #[test]
    fn test_namespace_survives_restart_but_directory_does_not() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("namespace.snap");
        let chunks = ids("f.bin", 2);
        {
            let coord = CoordinatorService::open(&path).unwrap();
            coord.register_node("node-1", "http://a").unwrap();
            for chunk in &chunks {
                coord.record_chunk_location(chunk.clone(), "node-1");
            }
            coord.commit_file("f.bin", chunks.clone(), 20).unwrap();
        }

        let coord = CoordinatorService::open(&path).unwrap();
        assert_eq!(coord.list_files(), vec!["f.bin".to_string()]);
        assert_eq!(coord.status().nodes, 0);
        let resolution = coord.resolve_file("f.bin").unwrap();
        assert_eq!(resolution.missing, chunks);

        // Re-announcement heals the directory
        for chunk in &chunks {
            coord.register_chunk(chunk.clone(), "node-1");
        }
        assert!(coord.resolve_file("f.bin").unwrap().is_complete());
    }

    #[test]
    fn test_concurrent_commits_distinct_names() {
        let dir = tempdir().unwrap();
        let coord = Arc::new(CoordinatorService::open(dir.path().join("ns.snap")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let coord = coord.clone();
                std::thread::spawn(move || {
                    let name = format!("file-{}", t);
                    for round in 0..10u64 {
                        let n = t as u64 + round + 1;
                        coord.commit_file(&name, ids(&name, n), n).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for t in 0..8u64 {
            let name = format!("file-{}", t);
            let entry_chunks = coord.namespace.get(&name).unwrap().chunks;
            assert_eq!(entry_chunks, ids(&name, t + 10));
        }

        let reopened = CoordinatorService::open(dir.path().join("ns.snap")).unwrap();
        assert_eq!(reopened.list_files().len(), 8);
        for t in 0..8u64 {
            let name = format!("file-{}", t);
            assert_eq!(reopened.namespace.get(&name).unwrap().chunks, ids(&name, t + 10));
        }
    }
}
