//! Endpoints (7.9) and declarative endpoint helpers

use bitflags::bitflags;

use crate::{
    data_model::{
        device_type::DeviceType,
        node::{ClusterHandle, EndpointHandle, Node},
    },
    Error, Result,
};

pub mod on_off_light_endpoint;
pub mod root_endpoint;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct EndpointFlags: u8 {
        /// The endpoint can be destroyed at runtime
        const DESTROYABLE = 0b00000001;
        /// The endpoint represents a bridged device
        const BRIDGE = 0b00000010;
    }
}

pub struct Endpoint {
    pub(crate) id: u16,
    pub(crate) flags: EndpointFlags,
    pub(crate) device_type: Option<DeviceType>,
    pub(crate) clusters: Vec<ClusterHandle>,
    /// Set once the protocol stack serves the endpoint
    pub(crate) enabled: bool,
}

impl Endpoint {
    pub(crate) fn new(id: u16, flags: EndpointFlags) -> Self {
        Self {
            id,
            flags,
            device_type: None,
            clusters: Vec::new(),
            enabled: false,
        }
    }
}

impl Node {
    pub fn endpoint_id(&self, endpoint: EndpointHandle) -> Option<u16> {
        self.endpoints.get(endpoint).map(|ep| ep.id)
    }

    pub fn endpoint_flags(&self, endpoint: EndpointHandle) -> Option<EndpointFlags> {
        self.endpoints.get(endpoint).map(|ep| ep.flags)
    }

    pub fn set_device_type_id(
        &mut self,
        endpoint: EndpointHandle,
        device_type: u32,
        device_revision: u8,
    ) -> Result<()> {
        let ep = self.endpoints.get_mut(endpoint).ok_or(Error::NotFound)?;
        ep.device_type = Some(DeviceType {
            device_type,
            device_revision,
        });
        Ok(())
    }

    pub fn device_type(&self, endpoint: EndpointHandle) -> Option<DeviceType> {
        self.endpoints.get(endpoint)?.device_type
    }

    pub fn device_type_id(&self, endpoint: EndpointHandle) -> Option<u32> {
        self.device_type(endpoint).map(|dt| dt.device_type)
    }

    pub fn is_enabled(&self, endpoint: EndpointHandle) -> bool {
        self.endpoints
            .get(endpoint)
            .map(|ep| ep.enabled)
            .unwrap_or(false)
    }

    pub(crate) fn set_enabled(&mut self, endpoint: EndpointHandle, enabled: bool) {
        if let Some(ep) = self.endpoints.get_mut(endpoint) {
            ep.enabled = enabled;
        }
    }

    pub fn cluster_count(&self, endpoint: EndpointHandle) -> usize {
        self.endpoints
            .get(endpoint)
            .map(|ep| ep.clusters.len())
            .unwrap_or(0)
    }
}
