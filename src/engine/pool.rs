// src/engine/pool.rs

//! Worker pools and the registry that routes devices to them.
//!
//! - [`WorkerPool`] / [`PoolFactory`] are the seams the scheduler consumes.
//! - [`RayonPoolFactory`] is the production factory, one `rayon` pool per key.
//! - [`PoolRegistry`] validates device placement, picks the pool key and
//!   lazily creates each pool exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

use crate::errors::{Result, SchedulerError};
use crate::exec::fault::panic_message;
use crate::types::{DeviceClass, DeviceOption, DeviceType};

/// A unit of work submitted to a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A set of worker threads dedicated to one affinity key.
pub trait WorkerPool: Send + Sync {
    /// Run `job` on one of the pool's threads. Must not run it inline.
    fn run(&self, job: Job);

    fn size(&self) -> usize;
}

/// Creates pools for a device type name, device id and size.
pub trait PoolFactory: Send + Sync {
    fn create(
        &self,
        device_type: &str,
        device_id: i32,
        pool_size: i32,
        use_per_net_pools: bool,
    ) -> Result<Arc<dyn WorkerPool>>;
}

/// Pool backed by a `rayon::ThreadPool`.
pub struct RayonPool {
    name: String,
    pool: rayon::ThreadPool,
}

impl RayonPool {
    pub fn build(name: String, num_threads: usize) -> Result<Self> {
        let thread_prefix = name.clone();
        let panic_pool = name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("{thread_prefix}-{i}"))
            .panic_handler(move |payload| {
                error!(
                    pool = %panic_pool,
                    panic = %panic_message(payload.as_ref()),
                    "worker job panicked outside chain execution"
                );
            })
            .build()
            .map_err(|e| SchedulerError::PoolCreation(format!("{name}: {e}")))?;

        Ok(Self { name, pool })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl WorkerPool for RayonPool {
    fn run(&self, job: Job) {
        self.pool.spawn(job);
    }

    fn size(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl fmt::Debug for RayonPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonPool")
            .field("name", &self.name)
            .field("threads", &self.size())
            .finish()
    }
}

type SharedPoolKey = (String, i32, i32);

/// Default factory.
///
/// Pools requested with `use_per_net_pools = false` are cached in the factory
/// and handed to every net that shares it; per-net requests always build a
/// fresh pool.
#[derive(Default)]
pub struct RayonPoolFactory {
    /// Size used when a request asks for `<= 0` threads; `0` lets rayon pick
    /// one thread per logical CPU.
    default_pool_size: usize,
    shared: Mutex<HashMap<SharedPoolKey, Arc<dyn WorkerPool>>>,
}

impl RayonPoolFactory {
    pub fn new(default_pool_size: usize) -> Self {
        Self {
            default_pool_size,
            shared: Mutex::new(HashMap::new()),
        }
    }

    fn build(&self, device_type: &str, device_id: i32, pool_size: i32) -> Result<Arc<dyn WorkerPool>> {
        let threads = if pool_size > 0 {
            pool_size as usize
        } else {
            self.default_pool_size
        };
        let name = format!("chaindag-{}-{}", device_type.to_lowercase(), device_id);
        let pool = RayonPool::build(name, threads)?;
        info!(
            pool = %pool.name(),
            threads = pool.size(),
            "created worker pool"
        );
        Ok(Arc::new(pool))
    }
}

impl PoolFactory for RayonPoolFactory {
    fn create(
        &self,
        device_type: &str,
        device_id: i32,
        pool_size: i32,
        use_per_net_pools: bool,
    ) -> Result<Arc<dyn WorkerPool>> {
        if use_per_net_pools {
            return self.build(device_type, device_id, pool_size);
        }

        let key = (device_type.to_string(), device_id, pool_size);
        let mut shared = self.shared.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(pool) = shared.get(&key) {
            return Ok(Arc::clone(pool));
        }
        let pool = self.build(device_type, device_id, pool_size)?;
        shared.insert(key, Arc::clone(&pool));
        Ok(pool)
    }
}

/// Routing options for [`PoolRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub use_single_pool: bool,
    pub use_per_net_pools: bool,
    pub max_gpus: i32,
    pub max_numa_nodes: i32,
    /// Requested pool size (`num_workers` of the net), `-1` for default.
    pub pool_size: i32,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            use_single_pool: false,
            use_per_net_pools: false,
            max_gpus: 16,
            max_numa_nodes: 8,
            pool_size: -1,
        }
    }
}

/// Cache key of a pool: device family, device id or NUMA node, and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub class: DeviceClass,
    pub device_id: i32,
    pub pool_size: i32,
}

/// Maps device placements to lazily created pools.
pub struct PoolRegistry {
    factory: Arc<dyn PoolFactory>,
    options: PoolOptions,
    pools: Mutex<HashMap<PoolKey, Arc<dyn WorkerPool>>>,
}

impl PoolRegistry {
    pub fn new(factory: Arc<dyn PoolFactory>, options: PoolOptions) -> Self {
        Self {
            factory,
            options,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Validate `device` and compute the key of the pool it runs on.
    pub fn key_for(&self, device: &DeviceOption) -> Result<PoolKey> {
        let pool_size = self.options.pool_size;

        if self.options.use_single_pool {
            return Ok(PoolKey {
                class: DeviceClass::Cpu,
                device_id: -1,
                pool_size,
            });
        }

        match device.device_type.class() {
            DeviceClass::Cpu => {
                let max = self.options.max_numa_nodes;
                let numa_node = match device.device_id {
                    Some(id) if id < 0 => {
                        return Err(SchedulerError::InvalidNumaNode { id, max });
                    }
                    Some(id) => id,
                    None => -1,
                };
                if numa_node >= max {
                    return Err(SchedulerError::InvalidNumaNode { id: numa_node, max });
                }
                Ok(PoolKey {
                    class: DeviceClass::Cpu,
                    device_id: numa_node,
                    pool_size,
                })
            }
            DeviceClass::Gpu => {
                let max = self.options.max_gpus;
                let gpu_id = device.device_id.unwrap_or(0);
                if gpu_id < 0 || gpu_id >= max {
                    return Err(SchedulerError::InvalidGpuId { id: gpu_id, max });
                }
                Ok(PoolKey {
                    class: DeviceClass::Gpu,
                    device_id: gpu_id,
                    pool_size,
                })
            }
            DeviceClass::Unsupported => Err(SchedulerError::UnsupportedDevice(device.device_type)),
        }
    }

    /// Pool for `device`, created on first use.
    pub fn pool_for(&self, device: &DeviceOption) -> Result<Arc<dyn WorkerPool>> {
        let key = self.key_for(device)?;
        self.get_or_create(key)
    }

    fn get_or_create(&self, key: PoolKey) -> Result<Arc<dyn WorkerPool>> {
        let mut pools = self.pools.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(pool) = pools.get(&key) {
            return Ok(Arc::clone(pool));
        }

        let device_type = match key.class {
            DeviceClass::Gpu => DeviceType::Cuda,
            _ => DeviceType::Cpu,
        };
        debug!(?key, "no cached pool for key; asking factory");
        let pool = self.factory.create(
            device_type.name(),
            key.device_id,
            key.pool_size,
            self.options.use_per_net_pools,
        )?;
        pools.insert(key, Arc::clone(&pool));
        Ok(pool)
    }

    /// Number of distinct pools created so far.
    pub fn len(&self) -> usize {
        self.pools.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity comparison of two pool handles.
pub fn same_pool(a: &Arc<dyn WorkerPool>, b: &Arc<dyn WorkerPool>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        inner: RayonPoolFactory,
    }

    impl PoolFactory for CountingFactory {
        fn create(
            &self,
            device_type: &str,
            device_id: i32,
            pool_size: i32,
            _use_per_net_pools: bool,
        ) -> Result<Arc<dyn WorkerPool>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.inner.create(device_type, device_id, pool_size, true)
        }
    }

    fn registry(options: PoolOptions) -> (Arc<CountingFactory>, PoolRegistry) {
        let factory = Arc::new(CountingFactory {
            created: AtomicUsize::new(0),
            inner: RayonPoolFactory::new(1),
        });
        let reg = PoolRegistry::new(factory.clone(), options);
        (factory, reg)
    }

    #[test]
    fn rejects_gpu_id_beyond_maximum() {
        let (factory, reg) = registry(PoolOptions::default());
        let err = reg.pool_for(&DeviceOption::cuda(99)).err().unwrap();
        assert!(matches!(err, SchedulerError::InvalidGpuId { id: 99, max: 16 }));
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_negative_and_out_of_range_numa_nodes() {
        let (_f, reg) = registry(PoolOptions::default());
        assert!(matches!(
            reg.key_for(&DeviceOption::numa(-2)),
            Err(SchedulerError::InvalidNumaNode { id: -2, .. })
        ));
        assert!(matches!(
            reg.key_for(&DeviceOption::numa(8)),
            Err(SchedulerError::InvalidNumaNode { id: 8, max: 8 })
        ));
        assert_eq!(reg.key_for(&DeviceOption::cpu()).unwrap().device_id, -1);
    }

    #[test]
    fn unsupported_device_has_no_pool() {
        let (_f, reg) = registry(PoolOptions::default());
        let dev = DeviceOption::new(DeviceType::Opengl, Some(0));
        assert!(matches!(
            reg.pool_for(&dev),
            Err(SchedulerError::UnsupportedDevice(DeviceType::Opengl))
        ));
    }

    #[test]
    fn pools_are_created_once_per_key() {
        let (factory, reg) = registry(PoolOptions::default());
        let a = reg.pool_for(&DeviceOption::cpu()).unwrap();
        let b = reg.pool_for(&DeviceOption::new(DeviceType::Ideep, None)).unwrap();
        let gpu = reg.pool_for(&DeviceOption::cuda(1)).unwrap();

        assert!(same_pool(&a, &b));
        assert!(!same_pool(&a, &gpu));
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn single_pool_mode_ignores_device_placement() {
        let (factory, reg) = registry(PoolOptions {
            use_single_pool: true,
            ..PoolOptions::default()
        });
        let cpu = reg.pool_for(&DeviceOption::numa(3)).unwrap();
        let gpu = reg.pool_for(&DeviceOption::cuda(2)).unwrap();
        assert!(same_pool(&cpu, &gpu));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shared_factory_reuses_pools_across_requests() {
        let factory = RayonPoolFactory::new(1);
        let a = factory.create("CPU", -1, 2, false).unwrap();
        let b = factory.create("CPU", -1, 2, false).unwrap();
        let c = factory.create("CPU", -1, 2, true).unwrap();
        assert!(same_pool(&a, &b));
        assert!(!same_pool(&a, &c));
        assert_eq!(a.size(), 2);
    }

    #[test]
    fn rayon_pool_runs_jobs_off_thread() {
        let pool = RayonPool::build("test-pool".into(), 1).unwrap();
        let (tx, rx) = mpsc::channel();
        pool.run(Box::new(move || {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }));
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("test-pool-0"));
    }
}
