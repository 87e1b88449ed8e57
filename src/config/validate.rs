// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{NetFile, RawNetFile};
use crate::errors::{Result, SchedulerError};

impl TryFrom<RawNetFile> for NetFile {
    type Error = SchedulerError;

    fn try_from(raw: RawNetFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_net(&raw)?;
        Ok(NetFile::new_unchecked(raw.net, raw.executor, raw.chain))
    }
}

fn validate_raw_net(cfg: &RawNetFile) -> Result<()> {
    ensure_has_chains(cfg)?;
    validate_executor_config(cfg)?;
    validate_chain_ops(cfg)?;
    validate_chain_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_chains(cfg: &RawNetFile) -> Result<()> {
    if cfg.chain.is_empty() {
        return Err(SchedulerError::ConfigError(
            "net must contain at least one [chain.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_executor_config(cfg: &RawNetFile) -> Result<()> {
    let ex = &cfg.executor;

    if ex.streams_per_gpu == 0 {
        return Err(SchedulerError::ConfigError(
            "[executor].streams_per_gpu must be >= 1 (got 0)".to_string(),
        ));
    }
    if ex.max_gpus < 1 {
        return Err(SchedulerError::ConfigError(format!(
            "[executor].max_gpus must be >= 1 (got {})",
            ex.max_gpus
        )));
    }
    if ex.max_numa_nodes < 1 {
        return Err(SchedulerError::ConfigError(format!(
            "[executor].max_numa_nodes must be >= 1 (got {})",
            ex.max_numa_nodes
        )));
    }

    Ok(())
}

fn validate_chain_ops(cfg: &RawNetFile) -> Result<()> {
    for (name, chain) in cfg.chain.iter() {
        if chain.ops.is_empty() {
            return Err(SchedulerError::ConfigError(format!(
                "chain '{}' must contain at least one op",
                name
            )));
        }
        for op in chain.ops.iter() {
            if op.op_type.trim().is_empty() {
                return Err(SchedulerError::ConfigError(format!(
                    "chain '{}' has an op with an empty `type`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_chain_dependencies(cfg: &RawNetFile) -> Result<()> {
    for (name, chain) in cfg.chain.iter() {
        for dep in chain.after.iter() {
            if !cfg.chain.contains_key(dep) {
                return Err(SchedulerError::ConfigError(format!(
                    "chain '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(SchedulerError::ConfigError(format!(
                    "chain '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawNetFile) -> Result<()> {
    // Edge direction: dep -> chain, so `after = ["A"]` on B adds A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.chain.keys() {
        graph.add_node(name.as_str());
    }

    for (name, chain) in cfg.chain.iter() {
        for dep in chain.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(SchedulerError::DagCycle(format!(
                "cycle detected in chain graph involving chain '{}'",
                node
            )))
        }
    }
}
