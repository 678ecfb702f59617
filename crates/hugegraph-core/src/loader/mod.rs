//! Parallel graph loader
//!
//! Builds a [`HugeGraph`] from a [`RelationshipSource`] in four steps:
//!
//! 1. the node id space is cut into batches of `batch_size` nodes
//! 2. worker threads import batches into private fragments
//! 3. fragment sizes are prefix-summed into global positions
//! 4. fragments are flushed in parallel into shared page stores, which are
//!    then frozen
//!
//! The resulting layout depends only on the source, so loads with different
//! concurrency produce identical graphs. Any error aborts the whole load.

mod batch;
pub mod source;

use crate::concurrency::{
    DEFAULT_CONCURRENCY, TerminationFlag, batch_partitions, validate_concurrency, worker_pool,
};
use crate::graph::adjacency::AdjacencyStore;
use crate::graph::property::PropertyStore;
use crate::graph::{HugeGraph, RelationshipStorage};
use crate::{Error, Result};
use batch::{BatchFragment, BuildStores, PropertyRequest, place};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

pub use source::{InMemorySource, PropertyValue, RelationshipSource};

/// Default number of nodes per batch
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Relationship property to load next to the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Property key in the source
    pub name: String,
    /// Value stored for relationships that lack the property
    #[serde(default)]
    pub default_value: f64,
}

impl PropertyMapping {
    /// Map `name` with the given default
    pub fn new(name: impl Into<String>, default_value: f64) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Worker threads used for import and flush
    pub concurrency: usize,
    /// Nodes per batch
    pub batch_size: usize,
    /// Optional relationship property
    pub relationship_property: Option<PropertyMapping>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            relationship_property: None,
        }
    }
}

impl LoadConfig {
    /// Set the worker count
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Load `name` as relationship property with `default_value` for
    /// relationships that lack it
    pub fn with_relationship_property(mut self, name: impl Into<String>, default_value: f64) -> Self {
        self.relationship_property = Some(PropertyMapping::new(name, default_value));
        self
    }

    /// Check all fields
    pub fn validate(&self) -> Result<()> {
        validate_concurrency(self.concurrency)?;
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than 0"));
        }
        if let Some(mapping) = &self.relationship_property {
            if mapping.name.trim().is_empty() {
                return Err(Error::config("relationship property name must not be empty"));
            }
        }
        Ok(())
    }
}

/// Loads one source into a [`HugeGraph`]
pub struct GraphLoader<'a, S: RelationshipSource + ?Sized> {
    source: &'a S,
    config: LoadConfig,
    termination: TerminationFlag,
}

impl<'a, S: RelationshipSource + ?Sized> GraphLoader<'a, S> {
    /// Create a loader; fails if `config` is invalid
    pub fn new(source: &'a S, config: LoadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            termination: TerminationFlag::new(),
        })
    }

    /// Use `termination` to abort the load between batches
    pub fn with_termination(mut self, termination: TerminationFlag) -> Self {
        self.termination = termination;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Run the load
    pub fn load(&self) -> Result<HugeGraph> {
        let start = Instant::now();
        let node_count = self.source.node_count();
        let batches = batch_partitions(node_count, self.config.batch_size as u64);
        let property = self
            .config
            .relationship_property
            .as_ref()
            .map(|mapping| PropertyRequest {
                key: &mapping.name,
                default_value: mapping.default_value,
            });

        info!(
            node_count,
            batches = batches.len(),
            concurrency = self.config.concurrency,
            property = property.map(|p| p.key),
            "Loading graph"
        );

        if let Some((source, target)) = self.source.out_of_range_relationship() {
            return Err(Error::load(
                source,
                source.saturating_add(1),
                format!(
                    "relationship ({})->({}) starts outside [0, {})",
                    source, target, node_count
                ),
            ));
        }

        let pool = worker_pool(self.config.concurrency)?;
        let result = pool.install(|| {
            let fragments = batches
                .par_iter()
                .map(|nodes| {
                    self.termination.assert_running()?;
                    let fragment =
                        BatchFragment::import(self.source, nodes.clone(), node_count, property)?;
                    debug!(
                        start = nodes.start,
                        end = nodes.end,
                        relationships = fragment.relationship_count(),
                        bytes = fragment.byte_len(),
                        "Imported batch"
                    );
                    Ok::<_, Error>(fragment)
                })
                .collect::<Result<Vec<_>>>()?;

            let (placements, total) = place(&fragments);
            let stores = BuildStores::new(node_count, total, property.is_some())?;

            fragments
                .par_iter()
                .zip(placements.par_iter())
                .try_for_each(|(fragment, placement)| {
                    self.termination.assert_running()?;
                    fragment.flush(&stores, *placement)?;
                    debug!(
                        start = fragment.nodes().start,
                        end = fragment.nodes().end,
                        "Flushed batch"
                    );
                    Ok::<(), Error>(())
                })?;

            Ok::<_, Error>((stores, total.relationship_offset))
        });

        let (stores, relationship_count) = match result {
            Ok(built) => built,
            Err(Error::Cancelled) => {
                warn!("Graph load cancelled");
                return Err(Error::Cancelled);
            }
            Err(err) => return Err(err),
        };

        let graph = self.publish(stores, relationship_count)?;
        info!(
            node_count,
            relationship_count,
            memory_bytes = graph.memory_usage(),
            load_millis = start.elapsed().as_millis() as u64,
            "Graph loaded"
        );
        Ok(graph)
    }

    fn publish(&self, stores: BuildStores, relationship_count: u64) -> Result<HugeGraph> {
        let adjacency = AdjacencyStore::new(
            stores.targets.freeze(),
            stores.offsets.freeze(),
            stores.degrees.freeze(),
        )?;

        let storage = match (stores.properties, &self.config.relationship_property) {
            (Some(properties), Some(mapping)) => RelationshipStorage::Weighted {
                adjacency,
                properties: PropertyStore::new(
                    mapping.name.clone(),
                    mapping.default_value,
                    properties.values.freeze(),
                    properties.offsets.freeze(),
                ),
            },
            _ => RelationshipStorage::Topology(adjacency),
        };
        Ok(HugeGraph::new(storage, relationship_count))
    }
}

/// Load `source` with `config`
pub fn load_graph<S: RelationshipSource + ?Sized>(source: &S, config: LoadConfig) -> Result<HugeGraph> {
    GraphLoader::new(source, config)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn sample_source() -> InMemorySource {
        let mut source = InMemorySource::new(5);
        source.add_relationship_with_property(0, 1, "weight", 1.5);
        source.add_relationship_with_property(0, 4, "weight", 2);
        source.add_relationship(1, 2);
        source.add_relationship_with_property(3, 0, "weight", -4.0);
        source
    }

    fn targets(graph: &HugeGraph, node: u64) -> Vec<u64> {
        let mut seen = Vec::new();
        graph
            .for_each_relationship(node, &mut |_, target| {
                seen.push(target);
                true
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_default_config() {
        let config = LoadConfig::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.relationship_property.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            LoadConfig::default().with_batch_size(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(LoadConfig::default().with_concurrency(0).validate().is_err());
        assert!(
            LoadConfig::default()
                .with_relationship_property(" ", 0.0)
                .validate()
                .is_err()
        );

        let source = InMemorySource::new(1);
        assert!(GraphLoader::new(&source, LoadConfig::default().with_batch_size(0)).is_err());
    }

    #[test]
    fn test_load_topology() {
        let source = sample_source();
        let graph = load_graph(&source, LoadConfig::default().with_batch_size(2)).unwrap();

        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.relationship_count(), 4);
        assert!(!graph.has_relationship_property());
        assert_eq!(targets(&graph, 0), vec![1, 4]);
        assert_eq!(targets(&graph, 2), Vec::<u64>::new());
        assert_eq!(graph.relationship_property(0, 1, 9.0).unwrap(), 9.0);
    }

    #[test]
    fn test_load_weighted() {
        let source = sample_source();
        let config = LoadConfig::default()
            .with_batch_size(2)
            .with_relationship_property("weight", 0.25);
        let graph = load_graph(&source, config).unwrap();

        assert_eq!(graph.property_key(), Some("weight"));
        assert_eq!(graph.relationship_property_opt(0, 1).unwrap(), Some(1.5));
        assert_eq!(graph.relationship_property_opt(0, 4).unwrap(), Some(2.0));
        assert_eq!(graph.relationship_property_opt(1, 2).unwrap(), Some(0.25));
        assert_eq!(graph.relationship_property_opt(3, 0).unwrap(), Some(-4.0));
        assert_eq!(graph.relationship_property_opt(2, 3).unwrap(), None);
        assert_eq!(graph.relationship_property(2, 3, 7.0).unwrap(), 7.0);
    }

    #[test]
    fn test_load_empty_source() {
        let source = InMemorySource::new(0);
        let graph = load_graph(&source, LoadConfig::default()).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.relationship_count(), 0);
    }

    #[test]
    fn test_load_error_aborts() {
        let mut source = sample_source();
        source.add_relationship(4, 5);
        let err = load_graph(&source, LoadConfig::default().with_batch_size(2)).unwrap_err();
        assert!(matches!(err, Error::Load { batch: (4, 5), .. }), "{:?}", err);
    }

    #[test]
    fn test_unknown_source_node_aborts() {
        let mut source = sample_source();
        source.add_relationship(7, 0);
        let err = load_graph(&source, LoadConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Load { batch: (7, 8), .. }), "{:?}", err);
    }

    #[test]
    fn test_cancelled_load() {
        let source = sample_source();
        let flag = TerminationFlag::new();
        flag.terminate();

        let loader = GraphLoader::new(&source, LoadConfig::default())
            .unwrap()
            .with_termination(flag);
        assert!(matches!(loader.load(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_config_from_json() {
        let config: LoadConfig = serde_json::from_str(
            r#"{"batch_size": 64, "relationship_property": {"name": "cost"}}"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(
            config.relationship_property,
            Some(PropertyMapping::new("cost", 0.0))
        );
    }
}
