// src/engine/mod.rs

//! Execution resources for the scheduler.
//!
//! - [`pool`] routes device placements to lazily created worker pools.
//! - [`stream`] assigns rotating per-thread streams to GPU-class chains.

pub mod pool;
pub mod stream;

pub use pool::{
    same_pool, Job, PoolFactory, PoolKey, PoolOptions, PoolRegistry, RayonPool, RayonPoolFactory,
    WorkerPool,
};
pub use stream::StreamAllocator;
