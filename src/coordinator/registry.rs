//! Live node registry
//!
//! Kept in registration order so round-robin placement is reproducible.
//! Never persisted; nodes re-register when they start.

use crate::common::NodeInfo;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: RwLock<Vec<NodeInfo>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a node. A re-registering node keeps its original
    /// position. Returns true if the node was not known before.
    pub fn register(&self, node_id: &str, address: &str) -> bool {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        match nodes.iter_mut().find(|n| n.id == node_id) {
            Some(existing) => {
                existing.address = address.to_string();
                false
            }
            None => {
                nodes.push(NodeInfo::new(node_id, address));
                true
            }
        }
    }

    pub fn lookup(&self, node_id: &str) -> Option<NodeInfo> {
        self.with_nodes(|nodes| nodes.iter().find(|n| n.id == node_id).cloned())
    }

    /// Run `f` against a consistent view of the registered nodes
    pub fn with_nodes<R>(&self, f: impl FnOnce(&[NodeInfo]) -> R) -> R {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        f(&nodes)
    }

    pub fn snapshot(&self) -> Vec<NodeInfo> {
        self.with_nodes(|nodes| nodes.to_vec())
    }

    pub fn len(&self) -> usize {
        self.with_nodes(|nodes| nodes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent_upsert() {
        let registry = NodeRegistry::new();
        assert!(registry.register("node-a", "http://a:1"));
        assert!(registry.register("node-b", "http://b:1"));
        assert!(!registry.register("node-a", "http://a:2"));

        let nodes = registry.snapshot();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0], NodeInfo::new("node-a", "http://a:2"));
        assert_eq!(nodes[1].id, "node-b");
    }

    #[test]
    fn test_lookup() {
        let registry = NodeRegistry::new();
        registry.register("node-a", "http://a:1");
        assert_eq!(registry.lookup("node-a").unwrap().address, "http://a:1");
        assert!(registry.lookup("node-z").is_none());
    }
}
