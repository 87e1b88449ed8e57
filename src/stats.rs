// src/stats.rs

//! Per-operator timing.
//!
//! The scheduler only talks to [`StatsSink`]; [`ProfCounters`] is the
//! in-process implementation used when profiling is enabled for a net.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

/// Timing hooks called around every operator when stats are enabled.
pub trait StatsSink: Send + Sync {
    fn add_per_op_start_time(&self, op_id: usize);
    fn add_per_op_end_time(&self, op_id: usize);
    fn operator_stats(&self) -> Vec<OperatorStat>;
    fn per_operator_cost(&self) -> Vec<OperatorCost>;

    /// Log a one-line summary per operator type.
    fn print_stats(&self) {
        for cost in self.per_operator_cost() {
            info!(
                op_type = %cost.op_type,
                total_ms = cost.total_ms,
                count = cost.count,
                "operator cost"
            );
        }
    }
}

/// Mean wall time of one operator instance.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorStat {
    pub op_id: usize,
    pub op_type: String,
    pub mean_ms: f64,
    pub runs: u64,
}

/// Total time spent in all operators of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCost {
    pub op_type: String,
    pub total_ms: f64,
    pub count: u64,
}

#[derive(Debug, Default)]
struct OpTiming {
    started: Option<Instant>,
    total: Duration,
    runs: u64,
}

/// Accumulates per-op wall time across runs.
///
/// Each op is only timed by the thread running its chain, so a mutex per op
/// never sees contention in practice.
#[derive(Debug)]
pub struct ProfCounters {
    op_types: Vec<String>,
    timings: Vec<Mutex<OpTiming>>,
}

impl ProfCounters {
    pub fn new(op_types: Vec<String>) -> Self {
        let timings = op_types.iter().map(|_| Mutex::new(OpTiming::default())).collect();
        Self { op_types, timings }
    }

    fn with_timing(&self, op_id: usize, f: impl FnOnce(&mut OpTiming)) {
        if let Some(slot) = self.timings.get(op_id) {
            let mut timing = slot.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut timing);
        }
    }
}

impl StatsSink for ProfCounters {
    fn add_per_op_start_time(&self, op_id: usize) {
        self.with_timing(op_id, |t| t.started = Some(Instant::now()));
    }

    fn add_per_op_end_time(&self, op_id: usize) {
        self.with_timing(op_id, |t| {
            if let Some(start) = t.started.take() {
                t.total += start.elapsed();
                t.runs += 1;
            }
        });
    }

    fn operator_stats(&self) -> Vec<OperatorStat> {
        self.timings
            .iter()
            .enumerate()
            .map(|(op_id, slot)| {
                let t = slot.lock().unwrap_or_else(|p| p.into_inner());
                let mean_ms = if t.runs == 0 {
                    0.0
                } else {
                    t.total.as_secs_f64() * 1000.0 / t.runs as f64
                };
                OperatorStat {
                    op_id,
                    op_type: self.op_types[op_id].clone(),
                    mean_ms,
                    runs: t.runs,
                }
            })
            .collect()
    }

    fn per_operator_cost(&self) -> Vec<OperatorCost> {
        let mut by_type: BTreeMap<&str, (Duration, u64)> = BTreeMap::new();
        for (op_type, slot) in self.op_types.iter().zip(&self.timings) {
            let t = slot.lock().unwrap_or_else(|p| p.into_inner());
            let entry = by_type.entry(op_type.as_str()).or_default();
            entry.0 += t.total;
            entry.1 += t.runs;
        }
        by_type
            .into_iter()
            .map(|(op_type, (total, count))| OperatorCost {
                op_type: op_type.to_string(),
                total_ms: total.as_secs_f64() * 1000.0,
                count,
            })
            .collect()
    }
}
