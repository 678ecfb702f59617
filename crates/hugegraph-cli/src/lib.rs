//! Command-line front end for HugeGraph
//!
//! The binary lives in `main.rs`; everything it runs is exposed here so the
//! commands can be exercised from tests.

pub mod commands;
pub mod config;
pub mod edge_list;
