// src/engine/stream.rs

//! Stream selection for GPU-class chains.
//!
//! Counters are per worker thread and per GPU id. They are never shared
//! between threads, so rotation is lock-free at the cost of perfect
//! round-robin fairness across the pool.

use std::cell::RefCell;

thread_local! {
    static STREAM_COUNTERS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Picks the stream a chain is issued on.
#[derive(Debug, Clone, Copy)]
pub struct StreamAllocator {
    streams_per_gpu: usize,
    check_stream_status: bool,
}

impl StreamAllocator {
    pub fn new(streams_per_gpu: usize, check_stream_status: bool) -> Self {
        Self {
            streams_per_gpu: streams_per_gpu.max(1),
            check_stream_status,
        }
    }

    pub fn streams_per_gpu(&self) -> usize {
        self.streams_per_gpu
    }

    /// Next stream for `gpu_id` on the calling thread.
    ///
    /// With status checking on, busy streams are skipped for at most one full
    /// rotation; if every stream is busy the next stream in rotation is used
    /// anyway.
    pub fn next_stream(&self, gpu_id: usize, is_free: impl Fn(usize) -> bool) -> usize {
        let first = self.advance(gpu_id);
        if !self.check_stream_status || is_free(first) {
            return first;
        }

        for _ in 1..self.streams_per_gpu {
            let candidate = self.advance(gpu_id);
            if is_free(candidate) {
                return candidate;
            }
        }

        let fallback = self.advance(gpu_id);
        tracing::debug!(
            gpu_id,
            stream = fallback,
            "all streams busy; accepting next stream in rotation"
        );
        fallback
    }

    fn advance(&self, gpu_id: usize) -> usize {
        STREAM_COUNTERS.with(|counters| {
            let mut counters = counters.borrow_mut();
            if gpu_id >= counters.len() {
                counters.resize(gpu_id + 1, 0);
            }
            let stream = counters[gpu_id] % self.streams_per_gpu;
            counters[gpu_id] = (stream + 1) % self.streams_per_gpu;
            stream
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn rotates_modulo_streams_per_gpu() {
        thread::spawn(|| {
            let alloc = StreamAllocator::new(3, false);
            let picked: Vec<_> = (0..7).map(|_| alloc.next_stream(0, |_| true)).collect();
            assert_eq!(picked, vec![0, 1, 2, 0, 1, 2, 0]);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn counters_are_per_device_and_per_thread() {
        thread::spawn(|| {
            let alloc = StreamAllocator::new(2, false);
            assert_eq!(alloc.next_stream(0, |_| true), 0);
            assert_eq!(alloc.next_stream(3, |_| true), 0);
            assert_eq!(alloc.next_stream(0, |_| true), 1);

            // A fresh thread starts its own rotation.
            let other = thread::spawn(move || alloc.next_stream(0, |_| true))
                .join()
                .unwrap();
            assert_eq!(other, 0);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn skips_busy_streams_when_checking() {
        thread::spawn(|| {
            let alloc = StreamAllocator::new(4, true);
            let picked = alloc.next_stream(0, |s| s == 2);
            assert_eq!(picked, 2);
            assert_eq!(alloc.next_stream(0, |_| true), 3);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn all_busy_still_returns_a_stream() {
        thread::spawn(|| {
            let alloc = StreamAllocator::new(3, true);
            let picked = alloc.next_stream(1, |_| false);
            assert!(picked < 3);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn busy_streams_are_ignored_without_checking() {
        thread::spawn(|| {
            let alloc = StreamAllocator::new(2, false);
            assert_eq!(alloc.next_stream(0, |_| false), 0);
        })
        .join()
        .unwrap();
    }
}
