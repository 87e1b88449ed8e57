// src/dag/scheduler.rs

//! Asynchronous chain scheduler.
//!
//! An [`AsyncNet`] owns a validated [`ChainGraph`] plus one [`OperatorNode`]
//! per operator, and executes the graph on device-specific worker pools:
//!
//! - chains without parents are seeded at the start of a run
//! - a chain runs start to finish on one worker thread
//! - when a chain finishes, each child's parent counter is decremented and
//!   the thread that brings it to zero decides what happens to the child
//! - children of failed chains are skipped without ever being dispatched
//! - the run ends once every chain has been either executed or skipped
//!
//! Nothing here holds a lock while an operator runs. Counters and the
//! scheduled flag are atomics on the chain's first operator node.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info, trace_span, warn};

use crate::config::ExecutionFlags;
use crate::config::model::NetFile;
use crate::dag::graph::ChainGraph;
use crate::dag::state::{Readiness, RunState};
use crate::engine::{Job, PoolFactory, PoolOptions, PoolRegistry, StreamAllocator, WorkerPool};
use crate::errors::{Result, SchedulerError};
use crate::exec::event::{Event, EventStatus};
use crate::exec::fault::{RunFault, panic_message};
use crate::exec::operator::{Operator, OperatorNode};
use crate::stats::{ProfCounters, StatsSink};
use crate::types::DeviceType;

/// Construction options of an [`AsyncNet`].
#[derive(Clone)]
pub struct NetOptions {
    pub name: String,
    pub flags: ExecutionFlags,
    /// Requested pool size, `-1` for the pool default.
    pub num_workers: i32,
    /// Receives per-operator timings. When `None` and the flags ask for
    /// stats, a [`ProfCounters`] is created.
    pub stats: Option<Arc<dyn StatsSink>>,
}

impl NetOptions {
    pub fn from_config(cfg: &NetFile) -> Self {
        Self {
            name: cfg.net.name.clone(),
            flags: ExecutionFlags::resolve(
                cfg.net.net_type,
                &cfg.executor,
                cfg.net.enable_profiling,
            ),
            num_workers: cfg.net.num_workers.unwrap_or(-1),
            stats: None,
        }
    }
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            name: "net".to_string(),
            flags: ExecutionFlags::default(),
            num_workers: -1,
            stats: None,
        }
    }
}

/// A graph of operator chains executed asynchronously on worker pools.
pub struct AsyncNet {
    inner: Arc<NetCore>,
}

struct NetCore {
    name: String,
    graph: ChainGraph,
    nodes: Vec<OperatorNode>,
    /// Initial parent count per operator; non-zero only on first ops.
    parent_counts: Vec<usize>,
    flags: ExecutionFlags,
    registry: PoolRegistry,
    streams: StreamAllocator,
    /// Pool of every chain, resolved once before the first run starts.
    chain_pools: OnceLock<Vec<Arc<dyn WorkerPool>>>,
    stats: Option<Arc<dyn StatsSink>>,
    run: RunState,
    last_success: AtomicBool,
}

impl AsyncNet {
    /// Build a net from a graph and its operators, indexed by operator id.
    pub fn new(
        graph: ChainGraph,
        ops: Vec<Box<dyn Operator>>,
        options: NetOptions,
        factory: Arc<dyn PoolFactory>,
    ) -> Result<Self> {
        let NetOptions {
            name,
            flags,
            num_workers,
            stats,
        } = options;

        let graph = if flags.inference_mode {
            graph.into_single_chain()?
        } else {
            graph
        };

        if ops.len() != graph.num_ops() {
            return Err(SchedulerError::InvalidGraph(format!(
                "graph has {} operators but {} were supplied",
                graph.num_ops(),
                ops.len()
            )));
        }

        let nodes: Vec<OperatorNode> = ops.into_iter().map(OperatorNode::new).collect();

        let mut parent_counts = vec![0; nodes.len()];
        for chain in 0..graph.len() {
            parent_counts[graph.first_op(chain)] = graph.parents(chain).len();
        }

        let stats = match stats {
            Some(sink) => Some(sink),
            None if flags.report_stats => {
                let types = nodes.iter().map(|n| n.type_name().to_string()).collect();
                Some(Arc::new(ProfCounters::new(types)) as Arc<dyn StatsSink>)
            }
            None => None,
        };

        let registry = PoolRegistry::new(
            factory,
            PoolOptions {
                use_single_pool: flags.use_single_pool,
                use_per_net_pools: flags.use_per_net_pools,
                max_gpus: flags.max_gpus,
                max_numa_nodes: flags.max_numa_nodes,
                pool_size: num_workers,
            },
        );
        let streams = StreamAllocator::new(flags.streams_per_gpu, flags.check_stream_status);
        let run = RunState::new(graph.len());

        debug!(
            net = %name,
            chains = graph.len(),
            ops = nodes.len(),
            ?flags,
            "created async net"
        );

        Ok(Self {
            inner: Arc::new(NetCore {
                name,
                graph,
                nodes,
                parent_counts,
                flags,
                registry,
                streams,
                chain_pools: OnceLock::new(),
                stats,
                run,
                last_success: AtomicBool::new(true),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn graph(&self) -> &ChainGraph {
        &self.inner.graph
    }

    pub fn flags(&self) -> &ExecutionFlags {
        &self.inner.flags
    }

    pub fn num_chains(&self) -> usize {
        self.inner.graph.len()
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.inner.registry
    }

    pub fn stats(&self) -> Option<&Arc<dyn StatsSink>> {
        self.inner.stats.as_ref()
    }

    /// Start a run and return without waiting for it, unless the net is
    /// blocking.
    ///
    /// Fails with [`SchedulerError::RunInProgress`] if the previous run has
    /// not been collected with [`AsyncNet::wait`], and with a routing error if
    /// any chain cannot be placed on a pool. In both cases no chain runs.
    pub fn run_async(&self) -> Result<()> {
        let core = &self.inner;
        if !core.run.begin() {
            return Err(SchedulerError::RunInProgress);
        }
        if let Err(err) = core.prepare() {
            core.run.release();
            return Err(err);
        }

        info!(net = %core.name, chains = core.graph.len(), "starting run");

        let roots: Vec<usize> = core.graph.roots().collect();
        for chain in roots {
            core.submit(chain);
        }

        if core.flags.is_blocking {
            core.run.wait_done();
        }
        Ok(())
    }

    /// Block until the current run is over, finalize every chain's event and
    /// return whether the run succeeded.
    ///
    /// Without a run in flight this returns the previous run's result.
    pub fn wait(&self) -> bool {
        let core = &self.inner;
        if !core.run.is_in_flight() {
            return core.last_success.load(Ordering::SeqCst);
        }

        core.run.wait_done();
        core.finalize_events();

        let chains_ok = (0..core.graph.len())
            .all(|chain| core.chain_event(chain).query() != EventStatus::Failed);
        let success = core.run.success() && core.run.faults.get().is_none() && chains_ok;

        core.last_success.store(success, Ordering::SeqCst);
        core.run.release();

        info!(
            net = %core.name,
            success,
            processed = core.run.processed(),
            dispatched = core.run.dispatched(),
            "run finished"
        );
        success
    }

    /// Run the whole graph once and wait for it.
    pub fn run(&self) -> Result<bool> {
        self.run_async()?;
        Ok(self.wait())
    }

    /// First fault captured during the last run, if any.
    pub fn first_fault(&self) -> Option<RunFault> {
        self.inner.run.faults.get()
    }

    /// Surface the last run's captured fault as an error.
    pub fn handle_run_error(&self) -> Result<bool> {
        match self.first_fault() {
            Some(fault) => Err(SchedulerError::OperatorFault(fault)),
            None => Ok(self.inner.last_success.load(Ordering::SeqCst)),
        }
    }

    /// Whether `chain` may start, given either live event statuses or a
    /// snapshot from [`AsyncNet::status_snapshot`].
    pub fn can_schedule(&self, chain: usize, statuses: Option<&[EventStatus]>) -> Readiness {
        self.inner.can_schedule(chain, statuses)
    }

    /// Whether `child` may start now as far as `parent` is concerned.
    pub fn can_schedule_pair(&self, parent: usize, child: usize) -> bool {
        let core = &self.inner;
        let status = core.chain_event(parent).query();
        core.parent_readiness(parent, status, child) == Readiness::Ready
    }

    /// Status of every chain's event, indexed by chain id.
    pub fn status_snapshot(&self) -> Vec<EventStatus> {
        (0..self.num_chains())
            .map(|chain| self.inner.chain_event(chain).query())
            .collect()
    }

    pub fn event_status(&self, chain: usize) -> EventStatus {
        self.inner.chain_event(chain).query()
    }

    /// Error message attached to `chain`'s event, if it failed.
    pub fn chain_error(&self, chain: usize) -> Option<String> {
        self.inner.chain_event(chain).error_message()
    }

    /// Whether `chain` was handed to a worker in the last run and not
    /// skipped there.
    pub fn is_dispatched(&self, chain: usize) -> bool {
        let core = &self.inner;
        core.first_node(chain).scheduled.load(Ordering::SeqCst) && !core.run.is_skipped(chain)
    }

    /// Whether `chain` was skipped because an upstream chain failed.
    pub fn was_skipped(&self, chain: usize) -> bool {
        self.inner.run.is_skipped(chain)
    }

    pub fn dispatched_count(&self) -> usize {
        self.inner.run.dispatched()
    }

    /// Pool `chain` runs on, once pools have been resolved by a run.
    pub fn pool_for_chain(&self, chain: usize) -> Option<Arc<dyn WorkerPool>> {
        self.inner
            .chain_pools
            .get()
            .and_then(|pools| pools.get(chain))
            .cloned()
    }
}

impl Drop for AsyncNet {
    fn drop(&mut self) {
        if self.inner.run.is_in_flight() {
            self.wait();
        }
        if let Some(stats) = &self.inner.stats {
            stats.print_stats();
        }
    }
}

impl std::fmt::Debug for AsyncNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncNet")
            .field("name", &self.inner.name)
            .field("chains", &self.inner.graph.len())
            .field("ops", &self.inner.nodes.len())
            .finish()
    }
}

impl NetCore {
    fn chain_event(&self, chain: usize) -> &Event {
        &self.nodes[self.graph.last_op(chain)].event
    }

    fn first_node(&self, chain: usize) -> &OperatorNode {
        &self.nodes[self.graph.first_op(chain)]
    }

    /// Resolve pools and reset all run-scoped state.
    fn prepare(&self) -> Result<()> {
        self.resolve_pools()?;
        for (node, &count) in self.nodes.iter().zip(&self.parent_counts) {
            node.reset(count);
        }
        self.run.reset();
        Ok(())
    }

    fn resolve_pools(&self) -> Result<()> {
        if self.chain_pools.get().is_some() {
            return Ok(());
        }

        let mut pools = Vec::with_capacity(self.graph.len());
        for chain in 0..self.graph.len() {
            // Streams are indexed by GPU id even when everything shares one
            // CPU pool. Only per-device pools bound the id by `max_gpus`.
            let device = self.chain_event(chain).device();
            if device.device_type.uses_streams() {
                let id = device.device_id.unwrap_or(0);
                let max = self.flags.max_gpus;
                let in_range = id >= 0 && (self.flags.use_single_pool || id < max);
                if !in_range {
                    return Err(SchedulerError::InvalidGpuId { id, max });
                }
            }
            let first = self.first_node(chain).event.device();
            pools.push(self.registry.pool_for(&first)?);
        }

        // Losing a race here only means another caller resolved the same pools.
        let _ = self.chain_pools.set(pools);
        Ok(())
    }

    fn can_schedule(&self, chain: usize, statuses: Option<&[EventStatus]>) -> Readiness {
        let mut readiness = Readiness::Ready;
        for &parent in self.graph.parents(chain) {
            let status = match statuses.and_then(|s| s.get(parent)) {
                Some(status) => *status,
                None => self.chain_event(parent).query(),
            };
            match self.parent_readiness(parent, status, chain) {
                Readiness::ParentFailed => return Readiness::ParentFailed,
                Readiness::NotYet => readiness = Readiness::NotYet,
                Readiness::Ready => {}
            }
        }
        readiness
    }

    fn parent_readiness(&self, parent: usize, status: EventStatus, child: usize) -> Readiness {
        if status == EventStatus::Failed || self.run.is_skipped(parent) {
            return Readiness::ParentFailed;
        }
        let first = self.first_node(child);
        let allowed = DeviceType::can_schedule(
            self.chain_event(parent).device_type(),
            status,
            first.event.device_type(),
            first.op.supports_async_scheduling(),
        );
        if allowed {
            Readiness::Ready
        } else {
            Readiness::NotYet
        }
    }

    /// Decrement `chain`'s remaining parent count and return what is left.
    pub(crate) fn update_parent_count(&self, chain: usize) -> Result<i64> {
        let remaining = self
            .first_node(chain)
            .runtime_parent_count
            .fetch_sub(1, Ordering::AcqRel)
            - 1;
        if remaining < 0 {
            return Err(SchedulerError::ParentCountUnderflow { chain });
        }
        Ok(remaining)
    }

    /// Claim `chain` for execution. Only the first caller per run wins.
    pub(crate) fn test_and_set_scheduled(&self, chain: usize) -> bool {
        !self.first_node(chain).scheduled.swap(true, Ordering::AcqRel)
    }

    fn submit(self: &Arc<Self>, chain: usize) {
        let core = Arc::clone(self);
        self.run_on_pool(chain, Box::new(move || core.schedule(chain)));
    }

    fn run_on_pool(&self, chain: usize, job: Job) {
        match self.chain_pools.get().and_then(|pools| pools.get(chain)) {
            Some(pool) => pool.run(job),
            None => {
                error!(net = %self.name, chain, "no pool resolved for chain; running inline");
                job();
            }
        }
    }

    fn schedule(self: &Arc<Self>, chain: usize) {
        if !self.test_and_set_scheduled(chain) {
            debug!(chain, "chain already scheduled");
            return;
        }

        match catch_unwind(AssertUnwindSafe(|| self.start_chain(chain))) {
            Ok(Some(stream)) => {
                self.run.mark_dispatched();
                if !self.run_chain(chain, stream) {
                    self.run.mark_failed();
                }
            }
            Ok(None) => self.skip(chain),
            Err(payload) => {
                self.record_fault(chain, None, panic_message(payload.as_ref()));
                self.run.mark_failed();
            }
        }
        self.chain_finished(chain);
    }

    /// Pick a stream for `chain` and order it behind its parents.
    ///
    /// Returns `None` when a parent failed while the chain was waiting on it.
    fn start_chain(&self, chain: usize) -> Option<usize> {
        let stream = self.stream_for(chain);

        if !self.flags.finish_chain {
            let parents: Vec<&Event> = self
                .graph
                .parents(chain)
                .iter()
                .map(|&parent| self.chain_event(parent))
                .collect();
            if !parents.is_empty() {
                self.first_node(chain).op.wait_events(&parents, stream);
            }
        }

        match self.can_schedule(chain, None) {
            Readiness::ParentFailed => None,
            Readiness::Ready | Readiness::NotYet => Some(stream),
        }
    }

    fn stream_for(&self, chain: usize) -> usize {
        let device = self.chain_event(chain).device();
        if !device.device_type.uses_streams() {
            return 0;
        }
        let gpu_id = device.device_id.unwrap_or(0).max(0) as usize;
        let ops = self.graph.chain(chain);
        self.streams.next_stream(gpu_id, |stream| {
            ops.iter()
                .all(|&op| self.nodes[op].op.is_stream_free(stream))
        })
    }

    /// Execute every operator of `chain`; `false` if the chain failed.
    fn run_chain(&self, chain: usize, stream: usize) -> bool {
        let current = Cell::new(None);
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_ops(chain, stream, &current)));
        match outcome {
            Ok(Ok(ok)) => ok,
            Ok(Err(err)) => {
                self.record_fault(chain, current.get(), format!("{err:#}"));
                false
            }
            Err(payload) => {
                self.record_fault(chain, current.get(), panic_message(payload.as_ref()));
                false
            }
        }
    }

    fn run_ops(
        &self,
        chain: usize,
        stream: usize,
        current: &Cell<Option<usize>>,
    ) -> anyhow::Result<bool> {
        let ops = self.graph.chain(chain);

        for &op_id in ops {
            current.set(Some(op_id));
            let node = &self.nodes[op_id];
            let _span = trace_span!("op", op = node.type_name(), op_id, chain, stream).entered();

            if let Some(stats) = &self.stats {
                stats.add_per_op_start_time(op_id);
            }

            if !node.op.run_async(stream, &node.event)? {
                let message = format!("failed to execute operator: {}", node.type_name());
                error!(net = %self.name, chain, op = node.type_name(), "{message}");
                node.event.set_finished(Some(&message));
                self.chain_event(chain).set_finished(Some(&message));
                return Ok(false);
            }

            // Left untouched: the operator completed synchronously.
            if node.event.query() == EventStatus::Initialized {
                node.event.set_finished(None);
            }

            if let Some(stats) = &self.stats {
                if !node.event.device_type().is_cpu_class() {
                    node.event.finish();
                }
                stats.add_per_op_end_time(op_id);
            }
        }

        if self.flags.finish_chain {
            self.chain_event(chain).finish();
        }
        Ok(true)
    }

    fn record_fault(&self, chain: usize, op_id: Option<usize>, message: String) {
        let op_type = op_id.map(|id| self.nodes[id].type_name().to_string());
        let op_name = op_type.as_deref().unwrap_or("unknown");
        let text = format!("{message}, op {op_name}");

        error!(net = %self.name, chain, op = op_name, error = %message, "chain raised a fault");

        if let Some(id) = op_id {
            self.nodes[id].event.set_finished(Some(&text));
        }
        self.chain_event(chain).set_finished(Some(&text));

        let stored = self.run.faults.store(RunFault {
            chain,
            op_type,
            message,
        });
        if !stored {
            debug!(chain, "fault already captured for this run; keeping the first");
        }
    }

    fn chain_finished(self: &Arc<Self>, chain: usize) {
        self.resolve_children(vec![chain]);
    }

    /// Resolve the children of every chain in `pending`, and of any chain
    /// skipped on the way, then count each of them as processed.
    fn resolve_children(self: &Arc<Self>, mut pending: Vec<usize>) {
        while let Some(done) = pending.pop() {
            for &child in self.graph.children(done) {
                match self.update_parent_count(child) {
                    Ok(0) => self.dispatch_child(child, &mut pending),
                    Ok(_) => {}
                    Err(err) => {
                        error!(net = %self.name, chain = child, "{err}");
                        self.run.faults.store(RunFault {
                            chain: child,
                            op_type: None,
                            message: err.to_string(),
                        });
                        self.run.mark_failed();
                    }
                }
            }
            self.run.mark_processed();
        }
    }

    /// Decide what happens to `child` once its last parent has finished.
    fn dispatch_child(self: &Arc<Self>, child: usize, pending: &mut Vec<usize>) {
        match self.child_readiness(child) {
            Readiness::Ready => self.submit(child),
            Readiness::ParentFailed => {
                self.skip(child);
                pending.push(child);
            }
            Readiness::NotYet if self.flags.always_schedule_child || self.flags.finish_chain => {
                self.submit(child)
            }
            Readiness::NotYet => self.submit_poll(child),
        }
    }

    /// Live readiness of `child`. A panic from the child's operator fails the
    /// child like a fault raised while running it.
    fn child_readiness(&self, child: usize) -> Readiness {
        match catch_unwind(AssertUnwindSafe(|| self.can_schedule(child, None))) {
            Ok(readiness) => readiness,
            Err(payload) => {
                let op = self.graph.first_op(child);
                self.record_fault(child, Some(op), panic_message(payload.as_ref()));
                self.run.mark_failed();
                Readiness::ParentFailed
            }
        }
    }

    fn skip(&self, chain: usize) {
        warn!(net = %self.name, chain, "skipping chain: an upstream chain failed");
        self.run.mark_skipped(chain);
    }

    /// Wait on a worker until `chain`'s parents have drained, then resolve it.
    fn submit_poll(self: &Arc<Self>, chain: usize) {
        debug!(chain, "parents still in flight; polling before dispatch");
        let core = Arc::clone(self);
        let job = move || {
            for &parent in core.graph.parents(chain) {
                core.chain_event(parent).finish();
            }
            let mut pending = Vec::new();
            core.dispatch_child(chain, &mut pending);
            // Skipped chains never run, so their children are resolved here.
            if !pending.is_empty() {
                core.resolve_children(pending);
            }
        };
        self.run_on_pool(chain, Box::new(job));
    }

    /// Sweep events so nothing is left in flight once a run is over.
    fn finalize_events(&self) {
        for node in &self.nodes {
            if node.event.query() == EventStatus::Scheduled {
                node.event.finish();
            }
        }
        for chain in 0..self.graph.len() {
            let event = self.chain_event(chain);
            if event.query() == EventStatus::Initialized {
                event.set_finished(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RayonPoolFactory;
    use crate::types::DeviceOption;
    use std::thread;

    struct Noop;

    impl Operator for Noop {
        fn device_option(&self) -> DeviceOption {
            DeviceOption::cpu()
        }

        fn run_async(&self, _stream_id: usize, _event: &Event) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    fn diamond() -> AsyncNet {
        let graph = ChainGraph::from_edges(
            vec![vec![0], vec![1], vec![2], vec![3]],
            &[(0, 1), (0, 2), (1, 3), (2, 3)],
        )
        .unwrap();
        let ops: Vec<Box<dyn Operator>> = (0..4).map(|_| Box::new(Noop) as Box<dyn Operator>).collect();
        AsyncNet::new(
            graph,
            ops,
            NetOptions::default(),
            Arc::new(RayonPoolFactory::new(2)),
        )
        .unwrap()
    }

    #[test]
    fn exactly_one_decrement_observes_zero() {
        let net = diamond();
        net.inner.prepare().unwrap();

        let core = Arc::clone(&net.inner);
        let zeros: usize = (0..2)
            .map(|_| {
                let core = Arc::clone(&core);
                thread::spawn(move || core.update_parent_count(3).unwrap())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|remaining| *remaining == 0)
            .count();
        assert_eq!(zeros, 1);

        let err = core.update_parent_count(3).unwrap_err();
        assert!(matches!(err, SchedulerError::ParentCountUnderflow { chain: 3 }));
    }

    #[test]
    fn exactly_one_thread_wins_the_scheduled_flag() {
        let net = diamond();
        net.inner.prepare().unwrap();

        let wins = (0..8)
            .map(|_| {
                let core = Arc::clone(&net.inner);
                thread::spawn(move || core.test_and_set_scheduled(2))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(net.is_dispatched(2));
    }

    #[test]
    fn snapshot_and_live_readiness_agree() {
        let net = diamond();
        net.inner.prepare().unwrap();

        let mut statuses = net.status_snapshot();
        assert_eq!(net.can_schedule(1, Some(&statuses)), Readiness::NotYet);

        statuses[0] = EventStatus::Success;
        assert_eq!(net.can_schedule(1, Some(&statuses)), Readiness::Ready);
        statuses[1] = EventStatus::Failed;
        assert_eq!(net.can_schedule(3, Some(&statuses)), Readiness::ParentFailed);

        net.inner.chain_event(0).set_finished(None);
        assert_eq!(net.can_schedule(1, None), Readiness::Ready);
        assert!(net.can_schedule_pair(0, 2));
        assert!(!net.can_schedule_pair(1, 3));
    }

    #[test]
    fn operator_count_must_match_graph() {
        let graph = ChainGraph::independent(2);
        let ops: Vec<Box<dyn Operator>> = vec![Box::new(Noop)];
        let err = AsyncNet::new(
            graph,
            ops,
            NetOptions::default(),
            Arc::new(RayonPoolFactory::new(1)),
        )
        .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidGraph(_)));
    }

    #[test]
    fn inference_mode_runs_everything_as_one_chain() {
        let graph = ChainGraph::from_edges(vec![vec![1], vec![0]], &[(1, 0)]).unwrap();
        let ops: Vec<Box<dyn Operator>> = vec![Box::new(Noop), Box::new(Noop)];
        let options = NetOptions {
            flags: ExecutionFlags {
                inference_mode: true,
                ..ExecutionFlags::default()
            },
            ..NetOptions::default()
        };
        let net = AsyncNet::new(graph, ops, options, Arc::new(RayonPoolFactory::new(1))).unwrap();

        assert_eq!(net.num_chains(), 1);
        assert_eq!(net.graph().chain(0), &[0, 1]);
        assert!(net.run().unwrap());
    }
}
