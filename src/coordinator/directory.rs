//! Chunk-location directory: chunk id → node ids
//!
//! Volatile and advisory. It records where store calls were made or where
//! nodes announced chunks at startup, nothing more. After a coordinator
//! restart it is empty until nodes re-announce.

use crate::common::ChunkId;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct LocationDirectory {
    locations: DashMap<ChunkId, Vec<String>>,
}

impl LocationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `node_id`, even if it is already listed (upload path)
    pub fn record(&self, chunk_id: ChunkId, node_id: &str) {
        self.locations
            .entry(chunk_id)
            .or_default()
            .push(node_id.to_string());
    }

    /// Append `node_id` only if absent (node announcement path).
    /// Returns true if the node was added.
    pub fn register(&self, chunk_id: ChunkId, node_id: &str) -> bool {
        let mut nodes = self.locations.entry(chunk_id).or_default();
        if nodes.iter().any(|n| n == node_id) {
            return false;
        }
        nodes.push(node_id.to_string());
        true
    }

    /// Copy of the location list; `None` when nothing is recorded
    pub fn locations(&self, chunk_id: &ChunkId) -> Option<Vec<String>> {
        self.locations
            .get(chunk_id)
            .map(|nodes| nodes.value().clone())
            .filter(|nodes| !nodes.is_empty())
    }

    /// Number of chunks with at least one entry
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_duplicates() {
        let dir = LocationDirectory::new();
        let chunk = ChunkId::new("f", 0);
        dir.record(chunk.clone(), "node-1");
        dir.record(chunk.clone(), "node-1");
        dir.record(chunk.clone(), "node-2");

        assert_eq!(
            dir.locations(&chunk).unwrap(),
            vec!["node-1", "node-1", "node-2"]
        );
    }

    #[test]
    fn test_register_skips_duplicates() {
        let dir = LocationDirectory::new();
        let chunk = ChunkId::new("f", 0);
        assert!(dir.register(chunk.clone(), "node-1"));
        assert!(!dir.register(chunk.clone(), "node-1"));
        assert!(dir.register(chunk.clone(), "node-2"));

        assert_eq!(dir.locations(&chunk).unwrap(), vec!["node-1", "node-2"]);
    }

    #[test]
    fn test_register_after_record_does_not_duplicate() {
        let dir = LocationDirectory::new();
        let chunk = ChunkId::new("f", 3);
        dir.record(chunk.clone(), "node-1");
        assert!(!dir.register(chunk.clone(), "node-1"));
        assert_eq!(dir.locations(&chunk).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_chunk() {
        let dir = LocationDirectory::new();
        assert!(dir.locations(&ChunkId::new("f", 9)).is_none());
        assert!(dir.is_empty());
    }
}
