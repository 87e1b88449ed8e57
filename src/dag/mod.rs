// src/dag/mod.rs

//! Chain graph and scheduling.
//!
//! - [`graph`] holds the immutable graph of operator chains.
//! - [`state`] holds the per-run bookkeeping shared by worker threads.
//! - [`scheduler`] contains [`AsyncNet`], which executes the graph.

pub mod graph;
pub mod scheduler;
pub mod state;

pub use graph::{ChainGraph, ChainGraphNode};
pub use scheduler::{AsyncNet, NetOptions};
pub use state::Readiness;
