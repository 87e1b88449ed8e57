// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod stats;
pub mod types;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::NetFile;
use crate::dag::{AsyncNet, ChainGraph, NetOptions};
use crate::engine::RayonPoolFactory;
use crate::exec::{SimulatedDevice, build_ops};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - chain file loading
/// - simulated operators + the async net
/// - repeated runs on a blocking task
/// - Ctrl-C handling (stops after the current run)
pub async fn run(args: CliArgs) -> Result<()> {
    let net_path = &args.net;
    let cfg = load_and_validate(net_path)
        .with_context(|| format!("loading chain file {}", net_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let chain_names = chain_names(&cfg);
    let net = build_net(&cfg)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl-C received; stopping after the current run");
            stop.store(true, Ordering::SeqCst);
        });
    }

    let iterations = args.iterations;
    let failed = tokio::task::spawn_blocking(move || {
        run_iterations(&net, &chain_names, iterations, &stop)
    })
    .await
    .context("run task panicked")??;

    if failed > 0 {
        bail!("{failed} of {iterations} runs failed");
    }
    Ok(())
}

/// Build an [`AsyncNet`] of simulated operators from a validated chain file.
pub fn build_net(cfg: &NetFile) -> Result<AsyncNet> {
    let graph = ChainGraph::from_config(cfg)?;
    let gpu = Arc::new(SimulatedDevice::new());
    let ops = build_ops(cfg, &gpu);
    let options = NetOptions::from_config(cfg);
    let factory = Arc::new(RayonPoolFactory::new(options.flags.cpu_pool_size));
    let net = AsyncNet::new(graph, ops, options, factory)?;
    Ok(net)
}

/// Chain names in chain-id order, as the scheduler numbers them.
fn chain_names(cfg: &NetFile) -> Vec<String> {
    if cfg.executor.inference_mode {
        return vec![cfg.net.name.clone()];
    }
    cfg.chain.keys().cloned().collect()
}

/// Run `net` up to `iterations` times; returns the number of failed runs.
fn run_iterations(
    net: &AsyncNet,
    chain_names: &[String],
    iterations: u32,
    stop: &AtomicBool,
) -> Result<u32> {
    let mut failed = 0;

    for iteration in 1..=iterations {
        if stop.load(Ordering::SeqCst) {
            info!(iteration, "stop requested; not starting further runs");
            break;
        }

        let success = net.run()?;
        match net.handle_run_error() {
            Err(fault) => println!("run {iteration}: failed ({fault})"),
            Ok(_) if success => println!("run {iteration}: success"),
            Ok(_) => println!("run {iteration}: failed"),
        }
        if !success {
            failed += 1;
            for (chain, name) in chain_names.iter().enumerate() {
                if let Some(msg) = net.chain_error(chain) {
                    println!("  chain {name}: {msg}");
                } else if net.was_skipped(chain) {
                    println!("  chain {name}: skipped");
                }
            }
        }
    }

    if let Some(stats) = net.stats() {
        println!();
        println!("operator stats:");
        for stat in stats.operator_stats() {
            println!(
                "  #{:<3} {:<20} {:>9.3} ms  ({} runs)",
                stat.op_id, stat.op_type, stat.mean_ms, stat.runs
            );
        }
    }

    Ok(failed)
}

/// Simple dry-run output: print the net, its flags and its chains.
fn print_dry_run(cfg: &NetFile) -> Result<()> {
    let options = NetOptions::from_config(cfg);
    let graph = ChainGraph::from_config(cfg)?;
    let names: Vec<&String> = cfg.chain.keys().collect();

    println!("chaindag dry-run");
    println!("  net.name = {}", cfg.net.name);
    println!("  net.type = {:?}", cfg.net.net_type);
    println!("  flags = {:?}", options.flags);
    println!();

    println!("chains ({}):", cfg.chain.len());
    for (name, chain) in cfg.chain.iter() {
        println!("  - {name}");
        if !chain.after.is_empty() {
            println!("      after: {:?}", chain.after);
        }
        for op in chain.ops.iter() {
            let device = match op.device_id {
                Some(id) => format!("{}:{id}", op.device),
                None => op.device.to_string(),
            };
            println!("      op {} on {} ({} ms)", op.op_type, device, op.millis);
        }
    }

    let order: Vec<&str> = graph
        .topological_order()?
        .into_iter()
        .map(|id| names[id].as_str())
        .collect();
    println!();
    println!("order: {}", order.join(" -> "));

    debug!("dry-run complete (no execution)");
    Ok(())
}
