//! All the constants used by the data model.
//! Capacities that depend on the device are configured through
//! [`DeviceConfig`](crate::config::DeviceConfig) instead.

/// The root (descriptor) endpoint, always present before start
pub const ROOT_ENDPOINT_ID: u16 = 0x0000;
/// Highest endpoint ID that can be allocated, 0xFFFF is the wildcard
pub const MAX_ENDPOINT_ID: u16 = 0xFFFE;
pub const INVALID_ENDPOINT_ID: u16 = 0xFFFF;
pub const INVALID_CLUSTER_ID: u32 = 0xFFFF_FFFF;
pub const INVALID_ATTRIBUTE_ID: u32 = 0xFFFF_FFFF;
pub const INVALID_COMMAND_ID: u32 = 0xFFFF_FFFF;

/// Data Model Specification (7.1)
pub const DATA_MODEL_REVISION: u16 = 17;

/// Short strings carry a 1 byte length prefix on the wire, 0xFF is null
pub const SHORT_STRING_MAX_LEN: usize = 254;
/// Long strings carry a 2 byte length prefix on the wire, 0xFFFF is null
pub const LONG_STRING_MAX_LEN: usize = 65534;

/// Key of the persisted endpoint ID allocator
pub const ENDPOINT_COUNTER_KEY: &str = "min_uu_ep_id";
/// Longest persisted key, `ep:cluster:attribute` in hex
pub const ATTRIBUTE_KEY_LEN: usize = 22;
