//! Graph algorithms over the [`Graph`](crate::graph::Graph) read view

pub mod dss;
pub mod wcc;

pub use dss::DisjointSetStruct;
pub use wcc::{ComponentIds, Wcc, WccConfig, WccResult, WccStats, compute_components};
