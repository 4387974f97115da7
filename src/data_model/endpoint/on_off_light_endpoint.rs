use std::sync::Arc;

use crate::{
    cluster::on_off,
    data_model::{
        command::CommandHandler,
        device_type::DEVICE_TYPE_ON_OFF_LIGHT,
        endpoint::EndpointFlags,
        node::{EndpointHandle, Node},
    },
    Result,
};

/// Create an On/Off Light endpoint with the next free endpoint ID
pub fn create(
    node: &mut Node,
    flags: EndpointFlags,
    config: &on_off::Config,
    handler: Option<Arc<dyn CommandHandler>>,
) -> Result<EndpointHandle> {
    let endpoint = node.create_endpoint(flags)?;
    node.set_device_type_id(
        endpoint,
        DEVICE_TYPE_ON_OFF_LIGHT.device_type,
        DEVICE_TYPE_ON_OFF_LIGHT.device_revision,
    )?;
    on_off::create(node, endpoint, config, handler)?;
    Ok(endpoint)
}
