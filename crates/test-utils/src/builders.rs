#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chaindag::config::{ChainConfig, ExecutorConfig, NetFile, NetSection, OpConfig, RawNetFile};
use chaindag::dag::{AsyncNet, ChainGraph, NetOptions};
use chaindag::engine::PoolFactory;
use chaindag::exec::Operator;
use chaindag::types::{DeviceType, NetType};

/// Builder for `NetFile` to simplify test setup.
pub struct NetFileBuilder {
    config: RawNetFile,
}

impl NetFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawNetFile {
                net: NetSection::default(),
                executor: ExecutorConfig::default(),
                chain: BTreeMap::new(),
            },
        }
    }

    pub fn with_chain(mut self, name: &str, chain: ChainConfig) -> Self {
        self.config.chain.insert(name.to_string(), chain);
        self
    }

    pub fn net_type(mut self, net_type: NetType) -> Self {
        self.config.net.net_type = net_type;
        self
    }

    pub fn executor(mut self, executor: ExecutorConfig) -> Self {
        self.config.executor = executor;
        self
    }

    pub fn raw(self) -> RawNetFile {
        self.config
    }

    pub fn build(self) -> NetFile {
        NetFile::try_from(self.config).expect("Failed to build valid net file from builder")
    }
}

impl Default for NetFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ChainConfig`.
pub struct ChainConfigBuilder {
    chain: ChainConfig,
}

impl ChainConfigBuilder {
    pub fn new() -> Self {
        Self {
            chain: ChainConfig {
                after: vec![],
                ops: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.chain.after.push(dep.to_string());
        self
    }

    pub fn op(mut self, op_type: &str, device: DeviceType) -> Self {
        self.chain.ops.push(OpConfig {
            op_type: op_type.to_string(),
            device,
            device_id: None,
            millis: 0,
            fail: false,
            fault: None,
            async_scheduling: false,
        });
        self
    }

    pub fn cpu_op(self, op_type: &str) -> Self {
        self.op(op_type, DeviceType::Cpu)
    }

    /// Mark the most recently added op as failing.
    pub fn failing(mut self) -> Self {
        if let Some(op) = self.chain.ops.last_mut() {
            op.fail = true;
        }
        self
    }

    pub fn build(self) -> ChainConfig {
        self.chain
    }
}

impl Default for ChainConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-op chains connected by `(parent, child)` edges; operator `i` is
/// chain `i`.
pub fn single_op_graph(num_chains: usize, edges: &[(usize, usize)]) -> ChainGraph {
    let chains = (0..num_chains).map(|i| vec![i]).collect();
    ChainGraph::from_edges(chains, edges).expect("invalid test graph")
}

/// Build a net from a graph and operators with the given options.
pub fn net_with(
    graph: ChainGraph,
    ops: Vec<Box<dyn Operator>>,
    options: NetOptions,
    factory: Arc<dyn PoolFactory>,
) -> AsyncNet {
    AsyncNet::new(graph, ops, options, factory).expect("failed to build test net")
}
