// src/exec/mod.rs

//! Operator execution layer.
//!
//! - [`event`] is the per-operator completion object chains synchronise on.
//! - [`operator`] defines the [`Operator`] trait the scheduler drives and the
//!   node that carries an operator's run-scoped counters.
//! - [`fault`] holds the run's first captured fault.
//! - [`simulated`] provides timing-only operators and a simulated GPU used by
//!   the CLI and tests.

pub mod event;
pub mod fault;
pub mod operator;
pub mod simulated;

pub use event::{Event, EventStatus};
pub use fault::{FaultSlot, RunFault};
pub use operator::{Operator, OperatorNode};
pub use simulated::{SimulatedDevice, SimulatedOp, build_ops};
