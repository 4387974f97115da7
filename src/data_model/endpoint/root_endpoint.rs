use crate::{
    cluster::utility::basic_information::{self, DeviceInformation},
    constants::ROOT_ENDPOINT_ID,
    data_model::{
        device_type::root_node::DEVICE_TYPE_ROOT_NODE,
        endpoint::EndpointFlags,
        node::{EndpointHandle, Node},
    },
    Result,
};

/// Create endpoint 0 with the Root Node device type and its Basic
/// Information cluster. Must be the first endpoint of the node.
pub fn create(node: &mut Node, info: &DeviceInformation<'_>) -> Result<EndpointHandle> {
    let endpoint = node.create_endpoint_with_id(ROOT_ENDPOINT_ID, EndpointFlags::empty())?;
    node.set_device_type_id(
        endpoint,
        DEVICE_TYPE_ROOT_NODE.device_type,
        DEVICE_TYPE_ROOT_NODE.device_revision,
    )?;
    basic_information::create(node, endpoint, info)?;
    Ok(endpoint)
}
