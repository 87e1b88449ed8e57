// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{DeviceType, NetType};

/// Chain file exactly as read from TOML, before validation.
///
/// ```toml
/// [net]
/// name = "demo"
/// type = "async_scheduling"
/// num_workers = 4
///
/// [executor]
/// streams_per_gpu = 2
///
/// [chain.load]
/// ops = [ { type = "Load", device = "cpu", millis = 2 } ]
///
/// [chain.conv]
/// after = ["load"]
/// ops = [ { type = "Conv", device = "cuda", device_id = 0 } ]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNetFile {
    #[serde(default)]
    pub net: NetSection,

    #[serde(default)]
    pub executor: ExecutorConfig,

    /// All chains from `[chain.<name>]`, keyed by chain name.
    #[serde(default)]
    pub chain: BTreeMap<String, ChainConfig>,
}

/// Validated chain file. Only obtainable through `TryFrom<RawNetFile>`.
#[derive(Debug, Clone)]
pub struct NetFile {
    pub net: NetSection,
    pub executor: ExecutorConfig,
    pub chain: BTreeMap<String, ChainConfig>,
}

impl NetFile {
    pub(crate) fn new_unchecked(
        net: NetSection,
        executor: ExecutorConfig,
        chain: BTreeMap<String, ChainConfig>,
    ) -> Self {
        Self {
            net,
            executor,
            chain,
        }
    }

    /// Total number of operators across all chains.
    pub fn num_ops(&self) -> usize {
        self.chain.values().map(|c| c.ops.len()).sum()
    }
}

/// `[net]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NetSection {
    #[serde(default = "default_net_name")]
    pub name: String,

    /// Selects a preset of execution flags; see `ExecutionFlags::resolve`.
    #[serde(default, rename = "type")]
    pub net_type: NetType,

    /// Worker threads per pool; `None` or `<= 0` uses the pool default.
    #[serde(default)]
    pub num_workers: Option<i32>,

    /// `enable_profiling` net argument; `1` turns per-op stats on, any other
    /// value turns them off, regardless of the net type.
    #[serde(default)]
    pub enable_profiling: Option<i64>,
}

fn default_net_name() -> String {
    "net".to_string()
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            name: default_net_name(),
            net_type: NetType::default(),
            num_workers: None,
            enable_profiling: None,
        }
    }
}

/// `[executor]` section: the scheduler's tunables.
///
/// These only apply as-is to `simple` / `async_scheduling` nets; the `dag`
/// family of net types overrides most of them.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Streams per worker per GPU.
    #[serde(default = "default_streams_per_gpu")]
    pub streams_per_gpu: usize,

    /// Run every operator in one single chain.
    #[serde(default)]
    pub inference_mode: bool,

    /// Wait for a chain's device work to drain before its children are
    /// considered.
    #[serde(default)]
    pub finish_chain: bool,

    /// Dispatch children as soon as their parent count drops to zero, even if
    /// a parent is still in flight on another device.
    #[serde(default)]
    pub always_schedule_child: bool,

    #[serde(default = "default_max_gpus")]
    pub max_gpus: i32,

    #[serde(default = "default_max_numa_nodes")]
    pub max_numa_nodes: i32,

    /// Default CPU pool size; `0` means one thread per logical CPU.
    #[serde(default)]
    pub cpu_pool_size: usize,

    /// Prefer streams whose earlier work has drained.
    #[serde(default)]
    pub check_stream_status: bool,

    /// Run everything on one CPU pool.
    #[serde(default)]
    pub use_single_pool: bool,

    /// Give this net its own pools instead of process-shared ones.
    #[serde(default)]
    pub use_per_net_pools: bool,
}

fn default_streams_per_gpu() -> usize {
    1
}

fn default_max_gpus() -> i32 {
    16
}

fn default_max_numa_nodes() -> i32 {
    8
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            streams_per_gpu: default_streams_per_gpu(),
            inference_mode: false,
            finish_chain: false,
            always_schedule_child: false,
            max_gpus: default_max_gpus(),
            max_numa_nodes: default_max_numa_nodes(),
            cpu_pool_size: 0,
            check_stream_status: false,
            use_single_pool: false,
            use_per_net_pools: false,
        }
    }
}

/// `[chain.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Chains that must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Operators, executed in order.
    #[serde(default)]
    pub ops: Vec<OpConfig>,
}

/// One simulated operator inside a chain.
#[derive(Debug, Clone, Deserialize)]
pub struct OpConfig {
    #[serde(rename = "type")]
    pub op_type: String,

    #[serde(default = "default_device")]
    pub device: DeviceType,

    /// GPU id or NUMA node.
    #[serde(default)]
    pub device_id: Option<i32>,

    /// Simulated work time.
    #[serde(default)]
    pub millis: u64,

    /// Report an ordinary operator failure.
    #[serde(default)]
    pub fail: bool,

    /// Raise a fault with this message.
    #[serde(default)]
    pub fault: Option<String>,

    /// Allow this op to be queued behind an in-flight parent on the same
    /// GPU instead of waiting on the host.
    #[serde(default)]
    pub async_scheduling: bool,
}

fn default_device() -> DeviceType {
    DeviceType::Cpu
}
