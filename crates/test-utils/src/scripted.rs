use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chaindag::engine::{PoolFactory, RayonPoolFactory, WorkerPool};
use chaindag::errors::Result;
use chaindag::exec::{Event, Operator};
use chaindag::types::DeviceOption;

/// Shared record of which operators ran, in execution order.
pub type ExecutionLog = Arc<Mutex<Vec<usize>>>;

pub fn execution_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// What a [`ScriptedOp`] does when it runs.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    /// Ordinary operator failure.
    Fail,
    /// Returns an error.
    Fault(String),
    Panic(String),
    /// Completes its event from a background thread after the delay.
    Async(Duration),
    /// Like `Async`, but the device reports the error after the delay.
    AsyncFail(Duration, String),
    /// Sleeps on the worker, then fails.
    SlowFail(Duration),
}

/// An operator that:
/// - records its id in a shared [`ExecutionLog`]
/// - behaves according to a fixed [`Behaviour`].
pub struct ScriptedOp {
    id: usize,
    op_type: Option<String>,
    device: DeviceOption,
    behaviour: Behaviour,
    supports_async: bool,
    panic_on_stream_check: bool,
    panic_on_async_query: bool,
    log: ExecutionLog,
}

impl ScriptedOp {
    pub fn new(id: usize, log: &ExecutionLog) -> Self {
        Self {
            id,
            op_type: Some(format!("Op{id}")),
            device: DeviceOption::cpu(),
            behaviour: Behaviour::Succeed,
            supports_async: false,
            panic_on_stream_check: false,
            panic_on_async_query: false,
            log: Arc::clone(log),
        }
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn device(mut self, device: DeviceOption) -> Self {
        self.device = device;
        self
    }

    pub fn untyped(mut self) -> Self {
        self.op_type = None;
        self
    }

    pub fn supports_async(mut self, val: bool) -> Self {
        self.supports_async = val;
        self
    }

    /// Panic when asked whether a stream has drained.
    pub fn panic_on_stream_check(mut self) -> Self {
        self.panic_on_stream_check = true;
        self
    }

    /// Panic when asked whether it supports async scheduling.
    pub fn panic_on_async_query(mut self) -> Self {
        self.panic_on_async_query = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Operator> {
        Box::new(self)
    }
}

impl Operator for ScriptedOp {
    fn op_type(&self) -> Option<&str> {
        self.op_type.as_deref()
    }

    fn device_option(&self) -> DeviceOption {
        self.device
    }

    fn supports_async_scheduling(&self) -> bool {
        if self.panic_on_async_query {
            panic!("Op{} cannot report async support", self.id);
        }
        self.supports_async
    }

    fn is_stream_free(&self, _stream_id: usize) -> bool {
        if self.panic_on_stream_check {
            panic!("Op{} lost its stream", self.id);
        }
        true
    }

    fn run_async(&self, _stream_id: usize, event: &Event) -> anyhow::Result<bool> {
        self.log.lock().unwrap().push(self.id);
        match &self.behaviour {
            Behaviour::Succeed => Ok(true),
            Behaviour::Fail => Ok(false),
            Behaviour::Fault(msg) => Err(anyhow::anyhow!("{msg}")),
            Behaviour::Panic(msg) => panic!("{msg}"),
            Behaviour::Async(delay) => {
                event.set_scheduled();
                let done = event.clone();
                let delay = *delay;
                thread::spawn(move || {
                    thread::sleep(delay);
                    done.set_finished(None);
                });
                Ok(true)
            }
            Behaviour::AsyncFail(delay, msg) => {
                event.set_scheduled();
                let done = event.clone();
                let delay = *delay;
                let msg = msg.clone();
                thread::spawn(move || {
                    thread::sleep(delay);
                    done.set_finished(Some(&msg));
                });
                Ok(true)
            }
            Behaviour::SlowFail(delay) => {
                thread::sleep(*delay);
                Ok(false)
            }
        }
    }
}

/// `n` succeeding CPU operators sharing one log.
pub fn succeeding_ops(n: usize, log: &ExecutionLog) -> Vec<Box<dyn Operator>> {
    (0..n).map(|i| ScriptedOp::new(i, log).boxed()).collect()
}

/// Pool factory that counts and records every pool it creates.
#[derive(Default)]
pub struct CountingPoolFactory {
    inner: RayonPoolFactory,
    created: AtomicUsize,
    requests: Mutex<Vec<(String, i32, i32)>>,
}

impl CountingPoolFactory {
    pub fn new(default_pool_size: usize) -> Self {
        Self {
            inner: RayonPoolFactory::new(default_pool_size),
            created: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// `(device type, device id, pool size)` of every creation request.
    pub fn requests(&self) -> Vec<(String, i32, i32)> {
        self.requests.lock().unwrap().clone()
    }
}

impl PoolFactory for CountingPoolFactory {
    fn create(
        &self,
        device_type: &str,
        device_id: i32,
        pool_size: i32,
        _use_per_net_pools: bool,
    ) -> Result<Arc<dyn WorkerPool>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((device_type.to_string(), device_id, pool_size));
        self.inner.create(device_type, device_id, pool_size, true)
    }
}
