// src/config/flags.rs

//! Execution-mode flags derived from the net type.
//!
//! The `dag` family of net types pins most of the scheduler's behaviour to a
//! fixed preset; every other net type takes the `[executor]` section as-is.

use crate::config::model::ExecutorConfig;
use crate::types::NetType;

/// Effective scheduling behaviour of one net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFlags {
    pub streams_per_gpu: usize,
    pub finish_chain: bool,
    pub always_schedule_child: bool,
    pub check_stream_status: bool,
    pub use_single_pool: bool,
    pub use_per_net_pools: bool,
    /// `run()` waits for completion before returning.
    pub is_blocking: bool,
    pub report_stats: bool,
    pub inference_mode: bool,
    pub max_gpus: i32,
    pub max_numa_nodes: i32,
    pub cpu_pool_size: usize,
}

impl ExecutionFlags {
    /// Resolve the flags for `net_type`.
    ///
    /// `enable_profiling`, when present, wins over whatever the net type says
    /// about stats: `1` turns them on, anything else turns them off.
    pub fn resolve(
        net_type: NetType,
        executor: &ExecutorConfig,
        enable_profiling: Option<i64>,
    ) -> Self {
        let mut flags = Self::from_executor(executor);

        match net_type {
            NetType::Dag | NetType::ProfDag | NetType::AsyncDag => {
                flags.streams_per_gpu = 1;
                flags.finish_chain = net_type != NetType::AsyncDag;
                flags.always_schedule_child = true;
                flags.check_stream_status = false;
                flags.use_single_pool = true;
                flags.use_per_net_pools = true;
                flags.is_blocking = true;
                flags.report_stats = net_type == NetType::ProfDag;
            }
            NetType::Simple | NetType::AsyncScheduling => {}
        }

        if let Some(value) = enable_profiling {
            flags.report_stats = value == 1;
        }

        flags
    }

    fn from_executor(executor: &ExecutorConfig) -> Self {
        Self {
            streams_per_gpu: executor.streams_per_gpu,
            finish_chain: executor.finish_chain,
            always_schedule_child: executor.always_schedule_child,
            check_stream_status: executor.check_stream_status,
            use_single_pool: executor.use_single_pool,
            use_per_net_pools: executor.use_per_net_pools,
            is_blocking: false,
            report_stats: false,
            inference_mode: executor.inference_mode,
            max_gpus: executor.max_gpus,
            max_numa_nodes: executor.max_numa_nodes,
            cpu_pool_size: executor.cpu_pool_size,
        }
    }
}

impl Default for ExecutionFlags {
    fn default() -> Self {
        Self::from_executor(&ExecutorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuned() -> ExecutorConfig {
        ExecutorConfig {
            streams_per_gpu: 4,
            check_stream_status: true,
            ..ExecutorConfig::default()
        }
    }

    #[test]
    fn dag_nets_use_the_fixed_preset() {
        let flags = ExecutionFlags::resolve(NetType::Dag, &tuned(), None);
        assert_eq!(flags.streams_per_gpu, 1);
        assert!(flags.finish_chain);
        assert!(flags.always_schedule_child);
        assert!(!flags.check_stream_status);
        assert!(flags.use_single_pool);
        assert!(flags.use_per_net_pools);
        assert!(flags.is_blocking);
        assert!(!flags.report_stats);
    }

    #[test]
    fn prof_dag_reports_stats_and_async_dag_does_not_finish_chains() {
        let prof = ExecutionFlags::resolve(NetType::ProfDag, &tuned(), None);
        assert!(prof.report_stats);
        assert!(prof.finish_chain);

        let async_dag = ExecutionFlags::resolve(NetType::AsyncDag, &tuned(), None);
        assert!(!async_dag.report_stats);
        assert!(!async_dag.finish_chain);
        assert!(async_dag.is_blocking);
    }

    #[test]
    fn other_nets_take_executor_section() {
        let flags = ExecutionFlags::resolve(NetType::AsyncScheduling, &tuned(), None);
        assert_eq!(flags.streams_per_gpu, 4);
        assert!(flags.check_stream_status);
        assert!(!flags.is_blocking);
        assert!(!flags.report_stats);
    }

    #[test]
    fn enable_profiling_overrides_net_type() {
        let on = ExecutionFlags::resolve(NetType::Simple, &tuned(), Some(1));
        assert!(on.report_stats);

        let off = ExecutionFlags::resolve(NetType::ProfDag, &tuned(), Some(0));
        assert!(!off.report_stats);
    }
}
