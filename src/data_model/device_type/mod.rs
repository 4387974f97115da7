//! Device types (7.15) used by the endpoint helpers

pub mod root_node;

/// Device Type (7.15)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceType {
    pub device_type: u32,
    pub device_revision: u8,
}

pub const DEVICE_TYPE_ON_OFF_LIGHT: DeviceType = DeviceType {
    device_type: 0x0100,
    device_revision: 3,
};
