//! HugeGraph Core - In-Memory Graph Analytics Engine
//!
//! This crate provides the in-memory graph engine for HugeGraph, implementing:
//! - Paged primitive arrays addressed by shift/mask (no single huge allocation)
//! - Compressed adjacency lists with optional relationship properties
//! - Parallel, all-or-nothing bulk loading from a relationship source
//! - Lock-free disjoint set struct and weakly connected components
//! - An injected catalog of named graphs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Algorithms                      │
//! │   (Weakly Connected Components, DSS)        │
//! └──────────────┬──────────────────────────────┘
//!                │  Graph trait
//! ┌──────────────┴──────────────────────────────┐
//! │          Graph Read View                     │
//! │  (HugeGraph, Topology / Weighted storage)   │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │          Parallel Loader                     │
//! │  (Batches, Fragments, Prefix Sum, Flush)    │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │           Paged Storage                      │
//! │   (PageStore build form, PagedArray)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use hugegraph_core::algorithms::compute_components;
//! use hugegraph_core::loader::{InMemorySource, LoadConfig, load_graph};
//!
//! let mut source = InMemorySource::new(3);
//! source.add_relationship(1, 0);
//!
//! let graph = load_graph(&source, LoadConfig::default()).unwrap();
//! let components = compute_components(&graph, 2).unwrap();
//! assert_eq!(components.component_id(1).unwrap(), 0);
//! assert_eq!(components.component_id(2).unwrap(), 2);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod catalog;
pub mod concurrency;
pub mod error;
pub mod generator;
pub mod graph;
pub mod loader;
pub mod paged;

pub use catalog::GraphCatalog;
pub use error::{Error, Result};
pub use graph::{Graph, HugeGraph, NodeId};
