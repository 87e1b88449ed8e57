// src/exec/simulated.rs

//! Simulated operators for running chain files without real kernels.
//!
//! CPU-class ops sleep on the worker thread. GPU-class ops are issued to a
//! [`SimulatedDevice`], which keeps one FIFO thread per `(gpu, stream)` so
//! work on a stream completes in issue order, like a real device queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{debug, trace};

use crate::config::model::{NetFile, OpConfig};
use crate::exec::event::Event;
use crate::exec::operator::Operator;
use crate::types::DeviceOption;

type DeviceJob = Box<dyn FnOnce() + Send + 'static>;

struct StreamQueue {
    tx: Sender<DeviceJob>,
    pending: Arc<AtomicUsize>,
}

/// Host-side model of the GPUs' stream queues.
///
/// Stream threads are created on first use and exit once the device is
/// dropped.
#[derive(Default)]
pub struct SimulatedDevice {
    streams: Mutex<HashMap<(i32, usize), StreamQueue>>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` on `stream` of `gpu_id`.
    pub fn enqueue(
        &self,
        gpu_id: i32,
        stream: usize,
        job: impl FnOnce() + Send + 'static,
    ) -> anyhow::Result<()> {
        let mut streams = self.streams.lock().unwrap_or_else(|p| p.into_inner());
        let queue = match streams.entry((gpu_id, stream)) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(Self::spawn_stream(gpu_id, stream)?)
            }
        };

        queue.pending.fetch_add(1, Ordering::SeqCst);
        let pending = Arc::clone(&queue.pending);
        let job: DeviceJob = Box::new(move || {
            job();
            pending.fetch_sub(1, Ordering::SeqCst);
        });
        if queue.tx.send(job).is_err() {
            queue.pending.fetch_sub(1, Ordering::SeqCst);
            bail!("stream {stream} of gpu {gpu_id} is no longer running");
        }
        Ok(())
    }

    /// Whether every job queued on `stream` of `gpu_id` has completed.
    pub fn is_idle(&self, gpu_id: i32, stream: usize) -> bool {
        let streams = self.streams.lock().unwrap_or_else(|p| p.into_inner());
        streams
            .get(&(gpu_id, stream))
            .is_none_or(|queue| queue.pending.load(Ordering::SeqCst) == 0)
    }

    fn spawn_stream(gpu_id: i32, stream: usize) -> anyhow::Result<StreamQueue> {
        let (tx, rx) = mpsc::channel::<DeviceJob>();
        thread::Builder::new()
            .name(format!("sim-gpu{gpu_id}-s{stream}"))
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .with_context(|| format!("spawning stream {stream} of gpu {gpu_id}"))?;
        debug!(gpu_id, stream, "started simulated stream");
        Ok(StreamQueue {
            tx,
            pending: Arc::new(AtomicUsize::new(0)),
        })
    }
}

/// Operator that only takes time, fails or faults.
pub struct SimulatedOp {
    op_type: String,
    device: DeviceOption,
    work: Duration,
    fail: bool,
    fault: Option<String>,
    async_scheduling: bool,
    gpu: Arc<SimulatedDevice>,
}

impl SimulatedOp {
    pub fn from_config(cfg: &OpConfig, gpu: Arc<SimulatedDevice>) -> Self {
        Self {
            op_type: cfg.op_type.clone(),
            device: DeviceOption::new(cfg.device, cfg.device_id),
            work: Duration::from_millis(cfg.millis),
            fail: cfg.fail,
            fault: cfg.fault.clone(),
            async_scheduling: cfg.async_scheduling,
            gpu,
        }
    }

    fn gpu_id(&self) -> i32 {
        self.device.device_id.unwrap_or(0)
    }
}

impl Operator for SimulatedOp {
    fn op_type(&self) -> Option<&str> {
        Some(&self.op_type)
    }

    fn device_option(&self) -> DeviceOption {
        self.device
    }

    fn supports_async_scheduling(&self) -> bool {
        self.async_scheduling
    }

    fn run_async(&self, stream_id: usize, event: &Event) -> anyhow::Result<bool> {
        if let Some(message) = &self.fault {
            bail!("{message}");
        }
        if self.fail {
            return Ok(false);
        }

        if !self.device.device_type.uses_streams() {
            thread::sleep(self.work);
            return Ok(true);
        }

        event.set_scheduled();
        let done = event.clone();
        let work = self.work;
        let op_type = self.op_type.clone();
        self.gpu.enqueue(self.gpu_id(), stream_id, move || {
            thread::sleep(work);
            trace!(op = %op_type, "simulated kernel finished");
            done.set_finished(None);
        })?;
        Ok(true)
    }

    fn is_stream_free(&self, stream_id: usize) -> bool {
        !self.device.device_type.uses_streams() || self.gpu.is_idle(self.gpu_id(), stream_id)
    }

    fn wait_events(&self, events: &[&Event], stream_id: usize) {
        let on_device = self.device.device_type.uses_streams() && self.async_scheduling;
        for event in events {
            if on_device && event.device() == self.device {
                // Device-side wait: later work on this stream queues behind it.
                let pending = (*event).clone();
                if self
                    .gpu
                    .enqueue(self.gpu_id(), stream_id, move || {
                        pending.finish();
                    })
                    .is_ok()
                {
                    continue;
                }
            }
            event.finish();
        }
    }
}

/// Operators of every chain in `cfg`, numbered like [`crate::dag::ChainGraph::from_config`].
pub fn build_ops(cfg: &NetFile, gpu: &Arc<SimulatedDevice>) -> Vec<Box<dyn Operator>> {
    cfg.chain
        .values()
        .flat_map(|chain| chain.ops.iter())
        .map(|op| Box::new(SimulatedOp::from_config(op, Arc::clone(gpu))) as Box<dyn Operator>)
        .collect()
}
