//! Registry of named in-memory graphs
//!
//! A catalog is an owned object handed to whoever needs it; there is no
//! process-wide instance. Graphs are shared as `Arc<dyn Graph>` so lookups
//! stay valid after the entry is removed.

use crate::graph::Graph;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Named graph registry
#[derive(Default)]
pub struct GraphCatalog {
    graphs: RwLock<HashMap<String, Arc<dyn Graph>>>,
}

impl GraphCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `graph` under `name`; the name must be non-empty and unused
    pub fn set(&self, name: &str, graph: Arc<dyn Graph>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::catalog("graph name must not be empty"));
        }

        let mut graphs = self.graphs.write();
        if graphs.contains_key(name) {
            return Err(Error::catalog(format!("graph '{}' already exists", name)));
        }
        info!(
            name,
            node_count = graph.node_count(),
            relationship_count = graph.relationship_count(),
            "Registered graph"
        );
        graphs.insert(name.to_string(), graph);
        Ok(())
    }

    /// Graph registered under `name`
    pub fn get(&self, name: &str) -> Result<Arc<dyn Graph>> {
        self.graphs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::catalog(format!("graph '{}' does not exist", name)))
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.graphs.read().contains_key(name)
    }

    /// Remove and return the graph registered under `name`
    pub fn remove(&self, name: &str) -> Result<Arc<dyn Graph>> {
        let removed = self.graphs.write().remove(name);
        match removed {
            Some(graph) => {
                info!(name, "Removed graph");
                Ok(graph)
            }
            None => Err(Error::catalog(format!("graph '{}' does not exist", name))),
        }
    }

    /// Drop every graph
    pub fn remove_all(&self) {
        let mut graphs = self.graphs.write();
        debug!(count = graphs.len(), "Clearing graph catalog");
        graphs.clear();
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.graphs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered graphs
    pub fn len(&self) -> usize {
        self.graphs.read().len()
    }

    /// True if no graph is registered
    pub fn is_empty(&self) -> bool {
        self.graphs.read().is_empty()
    }
}

impl std::fmt::Debug for GraphCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCatalog")
            .field("graphs", &self.names())
            .finish()
    }
}
