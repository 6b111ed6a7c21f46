//! Round-robin chunk placement
//!
//! One shared cursor, incremented atomically per request and taken modulo
//! the node count at the time of the call. For a fixed registry the
//! sequence is reproducible. A call that races a registration may see
//! either the old or the new node count, so assignment across such a race
//! is not deterministic; that is accepted, not corrected.

use crate::common::{Error, NodeInfo, Result};
use crate::coordinator::registry::NodeRegistry;
use std::sync::atomic::{AtomicU64, Ordering};

/// PlacementManager picks the storage node for the next chunk.
#[derive(Debug, Default)]
pub struct PlacementManager {
    /// u64 so it cannot realistically wrap within a process lifetime
    cursor: AtomicU64,
}

impl PlacementManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `registered[cursor++ mod count]`.
    /// The cursor does not advance when no node is registered.
    pub fn next_node(&self, registry: &NodeRegistry) -> Result<NodeInfo> {
        registry.with_nodes(|nodes| {
            if nodes.is_empty() {
                return Err(Error::NoNodesAvailable);
            }
            let tick = self.cursor.fetch_add(1, Ordering::Relaxed);
            let index = (tick % nodes.len() as u64) as usize;
            Ok(nodes[index].clone())
        })
    }

    /// Number of placements handed out so far
    pub fn placements(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry_with(n: usize) -> NodeRegistry {
        let registry = NodeRegistry::new();
        for i in 0..n {
            registry.register(&format!("node-{}", i), &format!("http://localhost:{}", 6000 + i));
        }
        registry
    }

    #[test]
    fn test_no_nodes_available() {
        let manager = PlacementManager::new();
        let registry = NodeRegistry::new();

        let result = manager.next_node(&registry);
        assert!(matches!(result, Err(Error::NoNodesAvailable)));
        assert_eq!(manager.placements(), 0);
    }

    #[test]
    fn test_cycles_in_registration_order() {
        let manager = PlacementManager::new();
        let registry = registry_with(3);

        let picked: Vec<String> = (0..7)
            .map(|_| manager.next_node(&registry).unwrap().id)
            .collect();
        assert_eq!(
            picked,
            vec!["node-0", "node-1", "node-2", "node-0", "node-1", "node-2", "node-0"]
        );
    }

    #[test]
    fn test_fairness_floor_ceil() {
        for (n, k) in [(3usize, 10u64), (4, 4), (5, 23), (7, 100)] {
            let manager = PlacementManager::new();
            let registry = registry_with(n);

            let mut counts: HashMap<String, u64> = HashMap::new();
            for _ in 0..k {
                *counts.entry(manager.next_node(&registry).unwrap().id).or_default() += 1;
            }

            let floor = k / n as u64;
            let ceil = k.div_ceil(n as u64);
            assert_eq!(counts.len(), n.min(k as usize));
            for count in counts.values() {
                assert!(*count == floor || *count == ceil, "n={n} k={k} count={count}");
            }
        }
    }

    #[test]
    fn test_reproducible_for_fixed_registration() {
        let run = || {
            let manager = PlacementManager::new();
            let registry = registry_with(4);
            (0..20)
                .map(|_| manager.next_node(&registry).unwrap().id)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
