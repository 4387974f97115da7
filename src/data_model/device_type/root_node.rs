use super::DeviceType;

pub const DEVICE_TYPE_ROOT_NODE: DeviceType = DeviceType {
    device_type: 0x0016,
    device_revision: 1,
};
