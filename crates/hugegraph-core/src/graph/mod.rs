//! Graph read view
//!
//! [`Graph`] is the capability every algorithm depends on. [`HugeGraph`] is
//! the paged implementation produced by the loader; its relationship storage
//! is a tagged variant with or without a property store.
//!
//! A published graph is immutable, so any number of threads may read it
//! concurrently without synchronisation.

pub mod adjacency;
pub mod compression;
pub mod property;

use crate::{Error, Result};
use adjacency::AdjacencyStore;
use property::PropertyStore;

/// Dense node id in `[0, node_count)`
pub type NodeId = u64;

/// Read-only view over a loaded graph
pub trait Graph: Send + Sync {
    /// Number of nodes
    fn node_count(&self) -> u64;

    /// Number of stored relationships
    fn relationship_count(&self) -> u64;

    /// Number of outgoing relationships of `node`
    fn degree(&self, node: NodeId) -> Result<usize>;

    /// True if a relationship property was loaded
    fn has_relationship_property(&self) -> bool;

    /// Visit nodes in ascending order until the visitor returns `false`
    fn for_each_node(&self, visitor: &mut dyn FnMut(NodeId) -> bool) {
        for node in 0..self.node_count() {
            if !visitor(node) {
                break;
            }
        }
    }

    /// Visit `(source, target)` of every relationship of `node` in storage
    /// order until the visitor returns `false`
    fn for_each_relationship(
        &self,
        node: NodeId,
        visitor: &mut dyn FnMut(NodeId, NodeId) -> bool,
    ) -> Result<()>;

    /// Like [`for_each_relationship`](Self::for_each_relationship) with the
    /// property value, or `fallback` when no property was loaded
    fn for_each_relationship_with_property(
        &self,
        node: NodeId,
        fallback: f64,
        visitor: &mut dyn FnMut(NodeId, NodeId, f64) -> bool,
    ) -> Result<()>;

    /// Property of the first `source -> target` relationship, `None` if the
    /// nodes are not adjacent or no property was loaded
    fn relationship_property_opt(&self, source: NodeId, target: NodeId) -> Result<Option<f64>>;

    /// Property of the first `source -> target` relationship, `fallback` if
    /// absent. Scans the adjacency list of `source`.
    fn relationship_property(&self, source: NodeId, target: NodeId, fallback: f64) -> Result<f64> {
        Ok(self
            .relationship_property_opt(source, target)?
            .unwrap_or(fallback))
    }
}

/// Relationship storage variants of a [`HugeGraph`]
#[derive(Debug, Clone)]
pub enum RelationshipStorage {
    /// Topology only
    Topology(AdjacencyStore),
    /// Topology plus one numeric property per relationship
    Weighted {
        /// Target lists
        adjacency: AdjacencyStore,
        /// Values parallel to the target lists
        properties: PropertyStore,
    },
}

impl RelationshipStorage {
    /// Target lists of either variant
    pub fn adjacency(&self) -> &AdjacencyStore {
        match self {
            Self::Topology(adjacency) => adjacency,
            Self::Weighted { adjacency, .. } => adjacency,
        }
    }

    /// Property store, if one was loaded
    pub fn properties(&self) -> Option<&PropertyStore> {
        match self {
            Self::Topology(_) => None,
            Self::Weighted { properties, .. } => Some(properties),
        }
    }
}

/// Immutable paged graph
#[derive(Debug, Clone)]
pub struct HugeGraph {
    node_count: u64,
    relationship_count: u64,
    storage: RelationshipStorage,
}

impl HugeGraph {
    pub(crate) fn new(storage: RelationshipStorage, relationship_count: u64) -> Self {
        Self {
            node_count: storage.adjacency().node_count(),
            relationship_count,
            storage,
        }
    }

    /// Underlying storage variant
    pub fn storage(&self) -> &RelationshipStorage {
        &self.storage
    }

    /// Key of the loaded relationship property
    pub fn property_key(&self) -> Option<&str> {
        self.storage.properties().map(PropertyStore::key)
    }

    /// Bytes held by all pages of the graph
    pub fn memory_usage(&self) -> usize {
        self.storage.adjacency().memory_usage()
            + self
                .storage
                .properties()
                .map_or(0, PropertyStore::memory_usage)
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node >= self.node_count {
            return Err(Error::index(node, self.node_count));
        }
        Ok(())
    }
}

impl Graph for HugeGraph {
    fn node_count(&self) -> u64 {
        self.node_count
    }

    fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    fn degree(&self, node: NodeId) -> Result<usize> {
        Ok(self.storage.adjacency().degree(node)? as usize)
    }

    fn has_relationship_property(&self) -> bool {
        self.storage.properties().is_some()
    }

    fn for_each_relationship(
        &self,
        node: NodeId,
        visitor: &mut dyn FnMut(NodeId, NodeId) -> bool,
    ) -> Result<()> {
        for target in self.storage.adjacency().cursor(node)? {
            if !visitor(node, target) {
                break;
            }
        }
        Ok(())
    }

    fn for_each_relationship_with_property(
        &self,
        node: NodeId,
        fallback: f64,
        visitor: &mut dyn FnMut(NodeId, NodeId, f64) -> bool,
    ) -> Result<()> {
        match &self.storage {
            RelationshipStorage::Topology(adjacency) => {
                for target in adjacency.cursor(node)? {
                    if !visitor(node, target, fallback) {
                        break;
                    }
                }
            }
            RelationshipStorage::Weighted {
                adjacency,
                properties,
            } => {
                let cursor = adjacency.cursor(node)?;
                let values = properties.values(node, cursor.remaining())?;
                for (target, value) in cursor.zip(values) {
                    if !visitor(node, target, value) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn relationship_property_opt(&self, source: NodeId, target: NodeId) -> Result<Option<f64>> {
        self.check_node(source)?;
        self.check_node(target)?;
        match &self.storage {
            RelationshipStorage::Topology(_) => Ok(None),
            RelationshipStorage::Weighted {
                adjacency,
                properties,
            } => {
                let cursor = adjacency.cursor(source)?;
                let values = properties.values(source, cursor.remaining())?;
                Ok(cursor
                    .zip(values)
                    .find(|(candidate, _)| *candidate == target)
                    .map(|(_, value)| value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{InMemorySource, LoadConfig, load_graph};

    fn weighted_graph() -> HugeGraph {
        let mut source = InMemorySource::new(4);
        source.add_relationship_with_property(0, 3, "cost", 3.0);
        source.add_relationship_with_property(0, 1, "cost", 1.0);
        source.add_relationship(1, 2);
        let config = LoadConfig::default().with_relationship_property("cost", 0.5);
        load_graph(&source, config).unwrap()
    }

    #[test]
    fn test_storage_variant() {
        let graph = weighted_graph();
        assert!(matches!(graph.storage(), RelationshipStorage::Weighted { .. }));
        assert_eq!(graph.property_key(), Some("cost"));
        assert!(graph.memory_usage() > 0);

        let topology = load_graph(&InMemorySource::new(2), LoadConfig::default()).unwrap();
        assert!(matches!(topology.storage(), RelationshipStorage::Topology(_)));
        assert!(topology.storage().properties().is_none());
        assert_eq!(topology.property_key(), None);
    }

    #[test]
    fn test_visitors_stop_early() {
        let graph = weighted_graph();

        let mut nodes = Vec::new();
        graph.for_each_node(&mut |node| {
            nodes.push(node);
            node < 1
        });
        assert_eq!(nodes, vec![0, 1]);

        let mut seen = Vec::new();
        graph
            .for_each_relationship(0, &mut |_, target| {
                seen.push(target);
                false
            })
            .unwrap();
        assert_eq!(seen, vec![3]);
    }

    #[test]
    fn test_relationship_values_in_storage_order() {
        let graph = weighted_graph();
        let mut seen = Vec::new();
        graph
            .for_each_relationship_with_property(0, f64::NAN, &mut |source, target, value| {
                seen.push((source, target, value));
                true
            })
            .unwrap();
        assert_eq!(seen, vec![(0, 3, 3.0), (0, 1, 1.0)]);
        assert_eq!(graph.relationship_property(1, 2, 9.0).unwrap(), 0.5);
        assert_eq!(graph.degree(0).unwrap(), 2);
    }

    #[test]
    fn test_topology_uses_fallback() {
        let mut source = InMemorySource::new(2);
        source.add_relationship(0, 1);
        let graph = load_graph(&source, LoadConfig::default()).unwrap();

        let mut values = Vec::new();
        graph
            .for_each_relationship_with_property(0, 7.0, &mut |_, _, value| {
                values.push(value);
                true
            })
            .unwrap();
        assert_eq!(values, vec![7.0]);
        assert_eq!(graph.relationship_property_opt(0, 1).unwrap(), None);
        assert!(matches!(graph.relationship_property_opt(2, 0), Err(Error::Index { .. })));
        assert!(matches!(
            graph.relationship_property_opt(0, 2),
            Err(Error::Index { index: 2, len: 2 })
        ));
    }
}
