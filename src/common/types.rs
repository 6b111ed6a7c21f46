//! Types exchanged between coordinator, nodes and clients

use crate::common::{ChunkId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered storage node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub address: String,
}

impl NodeInfo {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

/// Where one chunk of a resolved file is reported to live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlacement {
    pub chunk_id: ChunkId,
    /// Node ids in the order their store calls were recorded
    pub nodes: Vec<String>,
}

impl ChunkPlacement {
    /// Node of the most recent store call.
    ///
    /// A re-upload keeps the chunk id but may land on a different node, and
    /// the node that held the previous version still lists it. Only the last
    /// entry is guaranteed to hold the committed content.
    pub fn newest(&self) -> Option<&str> {
        self.nodes.last().map(String::as_str)
    }
}

/// Result of resolving a committed file.
///
/// `chunks` holds every chunk with at least one recorded location, in
/// namespace order. Chunks without any location are listed in `missing`
/// rather than dropped, so a partial answer is never mistaken for a
/// complete one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub file: String,
    pub size: u64,
    pub chunks: Vec<ChunkPlacement>,
    #[serde(default)]
    pub missing: Vec<ChunkId>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// chunk id → node ids, ordered by numeric ordinal
    pub fn locations(&self) -> BTreeMap<ChunkId, Vec<String>> {
        self.chunks
            .iter()
            .map(|p| (p.chunk_id.clone(), p.nodes.clone()))
            .collect()
    }

    /// The placements, or `ChunkLocationMissing` if any chunk is unplaced
    pub fn into_complete(self) -> Result<Vec<ChunkPlacement>> {
        if !self.missing.is_empty() {
            return Err(Error::ChunkLocationMissing {
                file: self.file,
                chunks: self.missing.iter().map(|c| c.to_string()).collect(),
            });
        }
        Ok(self.chunks)
    }
}

/// Coordinator counters exposed on `/admin/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub files: usize,
    pub nodes: usize,
    pub tracked_chunks: usize,
    pub placements: u64,
}

// === Request bodies shared by the HTTP server and client ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterNodeRequest {
    pub id: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkLocationRequest {
    pub chunk_id: ChunkId,
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFileRequest {
    pub name: String,
    pub chunks: Vec<ChunkId>,
    pub size: u64,
}
