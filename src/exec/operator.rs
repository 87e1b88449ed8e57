// src/exec/operator.rs

//! Operator abstraction consumed by the scheduler.
//!
//! The scheduler never looks inside an operator. It only needs to know where
//! the operator runs, how to issue it on a stream, and how to order it behind
//! the events of upstream chains.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::exec::event::Event;
use crate::types::DeviceOption;

/// A unit of work executed inside a chain.
pub trait Operator: Send + Sync {
    /// Operator type used in error messages and stats (`None` = unknown).
    fn op_type(&self) -> Option<&str> {
        None
    }

    fn device_option(&self) -> DeviceOption;

    /// Whether a child on the same device may be issued while this
    /// operator's parents are still in flight.
    fn supports_async_scheduling(&self) -> bool {
        false
    }

    /// Issue the operator on `stream_id`.
    ///
    /// `Ok(false)` is an ordinary operator failure. `Err` (or a panic) is a
    /// fault and is captured as the run's error. Asynchronous implementations
    /// call [`Event::set_scheduled`] and complete `event` from the device
    /// side; an operator that leaves `event` untouched is treated as having
    /// completed synchronously.
    fn run_async(&self, stream_id: usize, event: &Event) -> anyhow::Result<bool>;

    /// Whether earlier work issued on `stream_id` has drained.
    fn is_stream_free(&self, _stream_id: usize) -> bool {
        true
    }

    /// Order this operator behind `events` before it is issued.
    ///
    /// The default blocks the worker thread on every event that stream
    /// ordering on this device cannot cover.
    fn wait_events(&self, events: &[&Event], _stream_id: usize) {
        let device = self.device_option();
        for event in events {
            let same_stream_family =
                event.device() == device && device.device_type.uses_streams();
            if !(same_stream_family && self.supports_async_scheduling()) {
                event.finish();
            }
        }
    }
}

/// Scheduler-side wrapper around one operator.
///
/// The counter and flag are only meaningful on the first operator of a
/// chain; they are reset at the start of every run.
pub struct OperatorNode {
    pub(crate) op: Box<dyn Operator>,
    pub(crate) event: Event,
    pub(crate) runtime_parent_count: AtomicI64,
    pub(crate) scheduled: AtomicBool,
}

impl OperatorNode {
    pub fn new(op: Box<dyn Operator>) -> Self {
        let event = Event::new(op.device_option());
        Self {
            op,
            event,
            runtime_parent_count: AtomicI64::new(0),
            scheduled: AtomicBool::new(false),
        }
    }

    pub fn operator(&self) -> &dyn Operator {
        self.op.as_ref()
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn type_name(&self) -> &str {
        self.op.op_type().unwrap_or("unknown")
    }

    /// Reset run-scoped state ahead of a new run.
    pub(crate) fn reset(&self, parent_count: usize) {
        self.event.reset();
        self.runtime_parent_count
            .store(parent_count as i64, Ordering::SeqCst);
        self.scheduled.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for OperatorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorNode")
            .field("type", &self.type_name())
            .field("device", &self.event.device())
            .field(
                "runtime_parent_count",
                &self.runtime_parent_count.load(Ordering::Relaxed),
            )
            .field("scheduled", &self.scheduled.load(Ordering::Relaxed))
            .finish()
    }
}
