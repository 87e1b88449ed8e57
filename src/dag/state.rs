// src/dag/state.rs

//! Run-scoped bookkeeping shared by every worker thread.
//!
//! Everything here is reset at the start of a run. Steady-state fields are
//! atomics; the only lock is the completion latch, which is touched once per
//! run by the thread that processes the last chain and by `wait()`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

use crate::exec::fault::FaultSlot;

/// Result of evaluating whether a chain may be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every parent allows the chain to start now.
    Ready,
    /// Some parent is still in flight on a device the chain cannot queue
    /// behind asynchronously.
    NotYet,
    /// A parent failed or was itself skipped; the chain must never run in
    /// this run.
    ParentFailed,
}

#[derive(Debug)]
pub(crate) struct RunState {
    total: usize,
    success: AtomicBool,
    processed: AtomicUsize,
    /// Number of chains submitted to a pool for execution this run.
    dispatched: AtomicUsize,
    skipped: Vec<AtomicBool>,
    in_flight: AtomicBool,
    done: Mutex<bool>,
    done_cv: Condvar,
    pub(crate) faults: FaultSlot,
}

impl RunState {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            success: AtomicBool::new(true),
            processed: AtomicUsize::new(0),
            dispatched: AtomicUsize::new(0),
            skipped: (0..total).map(|_| AtomicBool::new(false)).collect(),
            in_flight: AtomicBool::new(false),
            done: Mutex::new(true),
            done_cv: Condvar::new(),
            faults: FaultSlot::new(),
        }
    }

    /// Claim the net for a new run. Returns `false` if one is in flight.
    pub(crate) fn begin(&self) -> bool {
        !self.in_flight.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.success.store(true, Ordering::SeqCst);
        self.processed.store(0, Ordering::SeqCst);
        self.dispatched.store(0, Ordering::SeqCst);
        for flag in &self.skipped {
            flag.store(false, Ordering::SeqCst);
        }
        self.faults.clear();
        *self.done.lock().unwrap_or_else(|p| p.into_inner()) = self.total == 0;
    }

    pub(crate) fn mark_failed(&self) {
        self.success.store(false, Ordering::SeqCst);
    }

    pub(crate) fn success(&self) -> bool {
        self.success.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_skipped(&self, chain: usize) {
        self.skipped[chain].store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_skipped(&self, chain: usize) -> bool {
        self.skipped[chain].load(Ordering::SeqCst)
    }

    pub(crate) fn mark_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Count `chain` as processed; wakes waiters when it was the last one.
    pub(crate) fn mark_processed(&self) -> bool {
        let processed = self.processed.fetch_add(1, Ordering::AcqRel) + 1;
        if processed < self.total {
            return false;
        }
        let mut done = self.done.lock().unwrap_or_else(|p| p.into_inner());
        *done = true;
        drop(done);
        self.done_cv.notify_all();
        true
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Block until every chain of the current run has been processed.
    pub(crate) fn wait_done(&self) {
        let mut done = self.done.lock().unwrap_or_else(|p| p.into_inner());
        while !*done {
            done = self
                .done_cv
                .wait(done)
                .unwrap_or_else(|p| p.into_inner());
        }
    }
}
