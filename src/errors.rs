// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::exec::fault::RunFault;
use crate::types::DeviceType;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cycle detected in chain graph: {0}")]
    DagCycle(String),

    #[error("Invalid chain graph: {0}")]
    InvalidGraph(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid GPU id: {id} (max {max})")]
    InvalidGpuId { id: i32, max: i32 },

    #[error("Invalid NUMA node id: {id} (max {max})")]
    InvalidNumaNode { id: i32, max: i32 },

    #[error("Unsupported device type {0:?}")]
    UnsupportedDevice(DeviceType),

    #[error("parent count of chain {chain} dropped below zero")]
    ParentCountUnderflow { chain: usize },

    #[error("a run is already in progress on this net")]
    RunInProgress,

    #[error("failed to create worker pool: {0}")]
    PoolCreation(String),

    #[error("operator fault: {0}")]
    OperatorFault(RunFault),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SchedulerError>;
