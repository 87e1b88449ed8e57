// src/config/mod.rs

//! Chain-file configuration for chaindag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a chain file from disk (`loader.rs`).
//! - Validate basic invariants like DAG correctness (`validate.rs`).
//! - Derive the effective execution flags of a net (`flags.rs`).

pub mod flags;
pub mod loader;
pub mod model;
pub mod validate;

pub use flags::ExecutionFlags;
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{ChainConfig, ExecutorConfig, NetFile, NetSection, OpConfig, RawNetFile};
