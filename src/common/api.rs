//! Remote call surface of the coordinator and storage nodes
//!
//! The client only talks to these traits. HTTP implementations live in
//! [`crate::client::remote`]; the coordinator service and the chunk store
//! implement them directly for in-process use.

use crate::common::{ChunkId, CoordinatorStatus, NodeInfo, Resolution, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

#[async_trait]
pub trait CoordinatorApi: Send + Sync {
    /// Idempotent upsert into the node registry
    async fn register_node(&self, node_id: &str, address: &str) -> Result<()>;

    /// Registered nodes in registration order
    async fn list_nodes(&self) -> Result<Vec<NodeInfo>>;

    /// Address of a registered node
    async fn lookup_node(&self, node_id: &str) -> Result<NodeInfo>;

    /// Round-robin placement target
    async fn next_node(&self) -> Result<NodeInfo>;

    /// Append `node_id` to the chunk's location list, duplicates included
    async fn record_chunk_location(&self, chunk_id: &ChunkId, node_id: &str) -> Result<()>;

    /// Append `node_id` to the chunk's location list unless already present
    async fn register_chunk(&self, chunk_id: &ChunkId, node_id: &str) -> Result<()>;

    /// Registered node holding the most recently stored copy of a chunk
    async fn locate_chunk(&self, chunk_id: &ChunkId) -> Result<NodeInfo>;

    /// Replace the namespace entry for `name` and persist the namespace
    async fn commit_file(&self, name: &str, chunks: &[ChunkId], size: u64) -> Result<()>;

    async fn resolve_file(&self, name: &str) -> Result<Resolution>;

    async fn list_files(&self) -> Result<Vec<String>>;

    async fn status(&self) -> Result<CoordinatorStatus>;
}

#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn put_chunk(&self, chunk_id: &ChunkId, data: Bytes) -> Result<()>;

    async fn get_chunk(&self, chunk_id: &ChunkId) -> Result<Bytes>;
}

/// Turns a node's registry entry into a callable handle
pub trait NodeConnector: Send + Sync {
    fn connect(&self, node: &NodeInfo) -> Result<Arc<dyn NodeApi>>;
}
