// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::exec::event::EventStatus;

/// Device an operator (and therefore its event) is bound to.
///
/// This is a closed set: every routing and synchronisation decision the
/// scheduler makes is a lookup in the small capability table below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Cpu,
    Mkldnn,
    Ideep,
    /// CPU-class device used only by tests.
    TestOnly,
    Cuda,
    /// Known device type without a pool; requesting a pool for it fails.
    Opengl,
}

/// Which family of worker pools a device type is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Unsupported,
}

impl DeviceType {
    pub fn class(self) -> DeviceClass {
        match self {
            DeviceType::Cpu | DeviceType::Mkldnn | DeviceType::Ideep | DeviceType::TestOnly => {
                DeviceClass::Cpu
            }
            DeviceType::Cuda => DeviceClass::Gpu,
            DeviceType::Opengl => DeviceClass::Unsupported,
        }
    }

    pub fn is_cpu_class(self) -> bool {
        self.class() == DeviceClass::Cpu
    }

    /// Whether work for this device is issued on rotating streams.
    pub fn uses_streams(self) -> bool {
        self.class() == DeviceClass::Gpu
    }

    /// Name handed to the pool factory.
    pub fn name(self) -> &'static str {
        match self {
            DeviceType::Cpu => "CPU",
            DeviceType::Mkldnn => "MKLDNN",
            DeviceType::Ideep => "IDEEP",
            DeviceType::TestOnly => "ONLY_FOR_TEST",
            DeviceType::Cuda => "CUDA",
            DeviceType::Opengl => "OPENGL",
        }
    }

    /// Cross-device scheduling rule.
    ///
    /// A child may start once its parent succeeded. While the parent is still
    /// in flight, the child may only be queued behind it when both live on the
    /// same device type and the child can be ordered asynchronously (stream
    /// waits instead of a host-side block).
    pub fn can_schedule(
        parent: DeviceType,
        parent_status: EventStatus,
        child: DeviceType,
        child_supports_async: bool,
    ) -> bool {
        match parent_status {
            EventStatus::Success => true,
            EventStatus::Scheduled => parent == child && child_supports_async,
            EventStatus::Initialized | EventStatus::Failed => false,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(DeviceType::Cpu),
            "mkldnn" => Ok(DeviceType::Mkldnn),
            "ideep" => Ok(DeviceType::Ideep),
            "testonly" | "only_for_test" => Ok(DeviceType::TestOnly),
            "cuda" | "gpu" => Ok(DeviceType::Cuda),
            "opengl" => Ok(DeviceType::Opengl),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Device placement of a single operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceOption {
    pub device_type: DeviceType,
    /// GPU id for GPU-class devices, NUMA node for CPU-class devices.
    /// `None` means "no affinity".
    pub device_id: Option<i32>,
}

impl DeviceOption {
    pub fn cpu() -> Self {
        Self {
            device_type: DeviceType::Cpu,
            device_id: None,
        }
    }

    pub fn numa(node: i32) -> Self {
        Self {
            device_type: DeviceType::Cpu,
            device_id: Some(node),
        }
    }

    pub fn cuda(gpu_id: i32) -> Self {
        Self {
            device_type: DeviceType::Cuda,
            device_id: Some(gpu_id),
        }
    }

    pub fn new(device_type: DeviceType, device_id: Option<i32>) -> Self {
        Self {
            device_type,
            device_id,
        }
    }
}

impl Default for DeviceOption {
    fn default() -> Self {
        Self::cpu()
    }
}

/// Net type from the `[net]` section; selects a preset of execution flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NetType {
    #[default]
    Simple,
    Dag,
    ProfDag,
    AsyncDag,
    AsyncScheduling,
}

impl FromStr for NetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "simple" => Ok(NetType::Simple),
            "dag" => Ok(NetType::Dag),
            "prof_dag" => Ok(NetType::ProfDag),
            "async_dag" => Ok(NetType::AsyncDag),
            "async_scheduling" => Ok(NetType::AsyncScheduling),
            other => Err(format!(
                "invalid net type: {other} (expected simple, dag, prof_dag, async_dag or async_scheduling)"
            )),
        }
    }
}
