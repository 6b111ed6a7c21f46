//! In-process node connector
//!
//! Maps node ids to chunk stores living in the same process. Used to run
//! the client protocol without sockets, and to simulate a node going away.

use crate::common::{Error, NodeApi, NodeConnector, NodeInfo, Result};
use crate::node::store::ChunkStore;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct LocalNodes {
    stores: DashMap<String, Arc<ChunkStore>>,
}

impl LocalNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, node_id: impl Into<String>, store: Arc<ChunkStore>) {
        self.stores.insert(node_id.into(), store);
    }

    /// Detach a node; later connections to it fail with `NodeUnreachable`
    pub fn remove(&self, node_id: &str) -> Option<Arc<ChunkStore>> {
        self.stores.remove(node_id).map(|(_, store)| store)
    }

    pub fn get(&self, node_id: &str) -> Option<Arc<ChunkStore>> {
        self.stores.get(node_id).map(|s| s.value().clone())
    }
}

impl NodeConnector for LocalNodes {
    fn connect(&self, node: &NodeInfo) -> Result<Arc<dyn NodeApi>> {
        match self.get(&node.id) {
            Some(store) => Ok(store as Arc<dyn NodeApi>),
            None => Err(Error::NodeUnreachable {
                node: node.id.clone(),
                reason: "node is not attached".into(),
            }),
        }
    }
}
