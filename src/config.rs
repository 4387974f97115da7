//! Runtime configuration of a [`Device`](crate::data_model::device::Device).

use crate::lock::Timeout;

/// Capacity of each entity arena. Creating an entity beyond its capacity
/// fails with [`Error::NoMemory`](crate::Error::NoMemory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_endpoints: usize,
    pub max_clusters: usize,
    pub max_attributes: usize,
    pub max_commands: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_endpoints: 16,
            max_clusters: 128,
            max_attributes: 1024,
            max_commands: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub limits: Limits,
    /// Number of attribute reports that can wait for the protocol stack
    pub report_queue_len: usize,
    /// Used by operations that take the execution lock on their own,
    /// such as attribute updates and endpoint enabling
    pub lock_timeout: Timeout,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            report_queue_len: 32,
            lock_timeout: Timeout::Forever,
        }
    }
}
