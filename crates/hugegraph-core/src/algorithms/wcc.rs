//! Weakly connected components
//!
//! Nodes are range-partitioned into one contiguous chunk per worker. Each
//! worker unions every relationship of its chunk into a shared
//! [`DisjointSetStruct`]; a second parallel pass materialises the set id of
//! every node. Relationship direction is ignored: `a -> b` joins `a` and `b`
//! exactly like `b -> a`.

use super::dss::DisjointSetStruct;
use crate::concurrency::{
    DEFAULT_CONCURRENCY, TerminationFlag, range_partitions, validate_concurrency, worker_pool,
};
use crate::graph::{Graph, NodeId};
use crate::paged::{PageStore, PagedArray};
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Nodes a worker unions between two termination checks
const TERMINATION_CHECK_INTERVAL: u64 = 4096;

/// WCC configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WccConfig {
    /// Worker threads
    pub concurrency: usize,
    /// Only union relationships whose property value is greater than this
    pub threshold: Option<f64>,
    /// Renumber components to `0..component_count`
    pub consecutive_ids: bool,
}

impl Default for WccConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            threshold: None,
            consecutive_ids: false,
        }
    }
}

impl WccConfig {
    /// Set the worker count
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the relationship property threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Request consecutive component ids
    pub fn with_consecutive_ids(mut self, consecutive_ids: bool) -> Self {
        self.consecutive_ids = consecutive_ids;
        self
    }

    /// Check all fields
    pub fn validate(&self) -> Result<()> {
        validate_concurrency(self.concurrency)?;
        if let Some(threshold) = self.threshold {
            if threshold.is_nan() {
                return Err(Error::config("threshold must be a number"));
            }
        }
        Ok(())
    }
}

/// Component id per node
#[derive(Debug, Clone)]
pub struct ComponentIds {
    ids: PagedArray<u64>,
}

impl ComponentIds {
    /// Component of `node`
    pub fn component_id(&self, node: NodeId) -> Result<u64> {
        self.ids.get(node)
    }

    /// Number of nodes
    pub fn node_count(&self) -> u64 {
        self.ids.len()
    }

    /// `(node, component)` pairs in node order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.ids.iter().enumerate().map(|(node, id)| (node as NodeId, id))
    }

    /// Number of nodes per component id
    pub fn component_sizes(&self) -> HashMap<u64, u64> {
        let mut sizes = HashMap::new();
        for id in self.ids.iter() {
            *sizes.entry(id).or_insert(0) += 1;
        }
        sizes
    }

    /// Number of distinct components
    pub fn component_count(&self) -> usize {
        self.component_sizes().len()
    }

    /// Renumber components to `0..component_count` in order of first
    /// appearance
    pub fn to_consecutive(&self) -> Result<Self> {
        let store = PageStore::<u64>::new(self.ids.len())?;
        let mut mapping: HashMap<u64, u64> = HashMap::new();
        for (node, id) in self.iter() {
            let next = mapping.len() as u64;
            let consecutive = *mapping.entry(id).or_insert(next);
            store.set(node, consecutive)?;
        }
        Ok(Self { ids: store.freeze() })
    }

    /// Summary over all components
    pub fn stats(&self, compute_millis: u64) -> WccStats {
        let sizes = self.component_sizes();
        WccStats {
            node_count: self.node_count(),
            component_count: sizes.len() as u64,
            largest_component: sizes.values().copied().max().unwrap_or(0),
            smallest_component: sizes.values().copied().min().unwrap_or(0),
            compute_millis,
        }
    }
}

/// Summary emitted in stats mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WccStats {
    /// Nodes considered
    pub node_count: u64,
    /// Distinct components
    pub component_count: u64,
    /// Size of the largest component
    pub largest_component: u64,
    /// Size of the smallest component
    pub smallest_component: u64,
    /// Wall time of the computation
    pub compute_millis: u64,
}

/// Result of one WCC run
#[derive(Debug, Clone)]
pub struct WccResult {
    /// Component id per node
    pub components: ComponentIds,
    /// Wall time of the computation
    pub compute_millis: u64,
}

impl WccResult {
    /// Summary of this run
    pub fn stats(&self) -> WccStats {
        self.components.stats(self.compute_millis)
    }
}

/// WCC driver over any [`Graph`]
pub struct Wcc<'a> {
    graph: &'a dyn Graph,
    config: WccConfig,
    termination: TerminationFlag,
}

impl<'a> Wcc<'a> {
    /// Create a driver; fails on invalid configuration or if a threshold is
    /// set for a graph without relationship property
    pub fn new(graph: &'a dyn Graph, config: WccConfig) -> Result<Self> {
        config.validate()?;
        if config.threshold.is_some() && !graph.has_relationship_property() {
            return Err(Error::config(
                "a threshold requires a graph loaded with a relationship property",
            ));
        }
        Ok(Self {
            graph,
            config,
            termination: TerminationFlag::new(),
        })
    }

    /// Use `termination` to abort the computation; checked every few
    /// thousand nodes
    pub fn with_termination(mut self, termination: TerminationFlag) -> Self {
        self.termination = termination;
        self
    }

    /// Run the computation
    pub fn compute(&self) -> Result<WccResult> {
        let start = Instant::now();
        let node_count = self.graph.node_count();
        info!(
            node_count,
            relationship_count = self.graph.relationship_count(),
            concurrency = self.config.concurrency,
            threshold = self.config.threshold,
            "Computing weakly connected components"
        );

        let pool = worker_pool(self.config.concurrency)?;
        let result = pool.install(|| {
            let dss = DisjointSetStruct::new(node_count)?;
            let chunks = range_partitions(node_count, self.config.concurrency);

            chunks.par_iter().try_for_each(|chunk| {
                self.termination.assert_running()?;
                self.union_chunk(&dss, chunk.clone())?;
                debug!(start = chunk.start, end = chunk.end, "Unioned chunk");
                Ok::<(), Error>(())
            })?;

            let ids = PageStore::<u64>::new(node_count)?;
            chunks.par_iter().try_for_each(|chunk| {
                self.termination.assert_running()?;
                let set_ids = chunk
                    .clone()
                    .map(|node| dss.set_id_of(node))
                    .collect::<Result<Vec<_>>>()?;
                ids.set_range(chunk.start, &set_ids)
            })?;

            Ok::<_, Error>(ComponentIds { ids: ids.freeze() })
        });

        let mut components = match result {
            Ok(components) => components,
            Err(Error::Cancelled) => {
                warn!("Weakly connected components cancelled");
                return Err(Error::Cancelled);
            }
            Err(err) => return Err(err),
        };
        if self.config.consecutive_ids {
            components = components.to_consecutive()?;
        }

        let compute_millis = start.elapsed().as_millis() as u64;
        info!(node_count, compute_millis, "Weakly connected components computed");
        Ok(WccResult {
            components,
            compute_millis,
        })
    }

    fn union_chunk(&self, dss: &DisjointSetStruct, chunk: Range<NodeId>) -> Result<()> {
        let mut failure: Option<Error> = None;
        let start = chunk.start;
        for node in chunk {
            if (node - start) % TERMINATION_CHECK_INTERVAL == 0 {
                self.termination.assert_running()?;
            }
            match self.config.threshold {
                None => self.graph.for_each_relationship(node, &mut |source, target| {
                    match dss.union(source, target) {
                        Ok(_) => true,
                        Err(err) => {
                            failure = Some(err);
                            false
                        }
                    }
                })?,
                Some(threshold) => self.graph.for_each_relationship_with_property(
                    node,
                    f64::NAN,
                    &mut |source, target, value| {
                        if value <= threshold || value.is_nan() {
                            return true;
                        }
                        match dss.union(source, target) {
                            Ok(_) => true,
                            Err(err) => {
                                failure = Some(err);
                                false
                            }
                        }
                    },
                )?,
            }
            if let Some(err) = failure.take() {
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Component id (the minimum node id of its component) for every node of
/// `graph`
pub fn compute_components(graph: &dyn Graph, concurrency: usize) -> Result<ComponentIds> {
    let config = WccConfig::default().with_concurrency(concurrency);
    Ok(Wcc::new(graph, config)?.compute()?.components)
}
