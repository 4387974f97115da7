use bitflags::bitflags;
use tracing::debug;

use crate::{
    data_model::{
        attribute::AttributeFlags,
        node::{next_sibling, AttributeHandle, ClusterHandle, CommandHandle, EndpointHandle, Node},
        value::AttrValue,
    },
    interaction_model::path::ConcreteAttributePath,
    Error, Result,
};

pub mod on_off;
pub mod utility;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct ClusterFlags: u8 {
        const SERVER = 0b00000001;
        const CLIENT = 0b00000010;
        const INIT_FUNCTION = 0b00000100;
        const ATTRIBUTE_CHANGED_FUNCTION = 0b00001000;
        const SHUTDOWN_FUNCTION = 0b00010000;
        const PRE_ATTRIBUTE_CHANGED_FUNCTION = 0b00100000;
    }
}

impl ClusterFlags {
    /// Flags that are derived from the function list, not set by callers
    const FUNCTIONS: Self = Self::INIT_FUNCTION
        .union(Self::ATTRIBUTE_CHANGED_FUNCTION)
        .union(Self::SHUTDOWN_FUNCTION)
        .union(Self::PRE_ATTRIBUTE_CHANGED_FUNCTION);
}

/// Called once when the endpoint of the cluster goes live
pub type PluginInitCallback = fn();

pub type PreAttributeChangedFn = fn(path: &ConcreteAttributePath, val: &AttrValue) -> Result<()>;

/// Cluster implementation hooks, all optional
#[derive(Clone, Copy, Default)]
pub struct ClusterFunctions {
    pub init: Option<fn(endpoint_id: u16)>,
    pub attribute_changed: Option<fn(path: &ConcreteAttributePath)>,
    pub shutdown: Option<fn(endpoint_id: u16)>,
    /// Can veto an attribute update by returning an error
    pub pre_attribute_changed: Option<PreAttributeChangedFn>,
}

impl ClusterFunctions {
    fn flags(&self) -> ClusterFlags {
        let mut flags = ClusterFlags::empty();
        flags.set(ClusterFlags::INIT_FUNCTION, self.init.is_some());
        flags.set(
            ClusterFlags::ATTRIBUTE_CHANGED_FUNCTION,
            self.attribute_changed.is_some(),
        );
        flags.set(ClusterFlags::SHUTDOWN_FUNCTION, self.shutdown.is_some());
        flags.set(
            ClusterFlags::PRE_ATTRIBUTE_CHANGED_FUNCTION,
            self.pre_attribute_changed.is_some(),
        );
        flags
    }
}

/// Cluster (7.10)
pub struct Cluster {
    pub(crate) id: u32,
    pub(crate) endpoint: EndpointHandle,
    pub(crate) endpoint_id: u16,
    pub(crate) flags: ClusterFlags,
    pub(crate) plugin_server_init: Option<PluginInitCallback>,
    pub(crate) plugin_client_init: Option<PluginInitCallback>,
    pub(crate) functions: ClusterFunctions,
    pub(crate) attributes: Vec<AttributeHandle>,
    pub(crate) commands: Vec<CommandHandle>,
}

impl Node {
    /// Create a cluster on an endpoint.
    ///
    /// A cluster can be declared in several steps, e.g. server then client:
    /// if the cluster already exists, the flags are added to it and the
    /// existing handle is returned.
    pub fn create_cluster(
        &mut self,
        endpoint: EndpointHandle,
        cluster_id: u32,
        flags: ClusterFlags,
    ) -> Result<ClusterHandle> {
        let flags = flags - ClusterFlags::FUNCTIONS;
        if let Some(existing) = self.cluster(endpoint, cluster_id) {
            if let Some(cl) = self.clusters.get_mut(existing) {
                cl.flags |= flags;
            }
            return Ok(existing);
        }
        let endpoint_id = self.endpoint_id(endpoint).ok_or(Error::NotFound)?;
        let handle = self
            .clusters
            .insert(Cluster {
                id: cluster_id,
                endpoint,
                endpoint_id,
                flags,
                plugin_server_init: None,
                plugin_client_init: None,
                functions: ClusterFunctions::default(),
                attributes: Vec::new(),
                commands: Vec::new(),
            })
            .ok_or(Error::NoMemory)?;
        if let Some(ep) = self.endpoints.get_mut(endpoint) {
            ep.clusters.push(handle);
        }
        debug!(endpoint_id, cluster_id, ?flags, "cluster created");
        Ok(handle)
    }

    pub fn cluster(&self, endpoint: EndpointHandle, cluster_id: u32) -> Option<ClusterHandle> {
        self.endpoints
            .get(endpoint)?
            .clusters
            .iter()
            .copied()
            .find(|h| self.clusters.get(*h).map(|cl| cl.id) == Some(cluster_id))
    }

    pub fn first_cluster(&self, endpoint: EndpointHandle) -> Option<ClusterHandle> {
        self.endpoints.get(endpoint)?.clusters.first().copied()
    }

    pub fn next_cluster(&self, cluster: ClusterHandle) -> Option<ClusterHandle> {
        let endpoint = self.clusters.get(cluster)?.endpoint;
        next_sibling(&self.endpoints.get(endpoint)?.clusters, cluster)
    }

    /// Clusters of an endpoint in creation order
    pub fn clusters(&self, endpoint: EndpointHandle) -> impl Iterator<Item = ClusterHandle> + '_ {
        self.endpoints
            .get(endpoint)
            .map(|ep| ep.clusters.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
    }

    pub fn cluster_id(&self, cluster: ClusterHandle) -> Option<u32> {
        self.clusters.get(cluster).map(|cl| cl.id)
    }

    pub fn cluster_flags(&self, cluster: ClusterHandle) -> Option<ClusterFlags> {
        self.clusters.get(cluster).map(|cl| cl.flags)
    }

    /// The endpoint owning the cluster
    pub fn cluster_endpoint(&self, cluster: ClusterHandle) -> Option<EndpointHandle> {
        self.clusters.get(cluster).map(|cl| cl.endpoint)
    }

    pub fn set_plugin_server_init_callback(
        &mut self,
        cluster: ClusterHandle,
        callback: PluginInitCallback,
    ) -> Result<()> {
        let cl = self.clusters.get_mut(cluster).ok_or(Error::NotFound)?;
        cl.plugin_server_init = Some(callback);
        Ok(())
    }

    pub fn set_plugin_client_init_callback(
        &mut self,
        cluster: ClusterHandle,
        callback: PluginInitCallback,
    ) -> Result<()> {
        let cl = self.clusters.get_mut(cluster).ok_or(Error::NotFound)?;
        cl.plugin_client_init = Some(callback);
        Ok(())
    }

    pub fn plugin_server_init_callback(&self, cluster: ClusterHandle) -> Option<PluginInitCallback> {
        self.clusters.get(cluster)?.plugin_server_init
    }

    pub fn plugin_client_init_callback(&self, cluster: ClusterHandle) -> Option<PluginInitCallback> {
        self.clusters.get(cluster)?.plugin_client_init
    }

    /// Install the cluster implementation hooks. The corresponding
    /// `*_FUNCTION` flags reflect which hooks are present.
    pub fn add_function_list(
        &mut self,
        cluster: ClusterHandle,
        functions: ClusterFunctions,
    ) -> Result<()> {
        let cl = self.clusters.get_mut(cluster).ok_or(Error::NotFound)?;
        cl.flags = (cl.flags - ClusterFlags::FUNCTIONS) | functions.flags();
        cl.functions = functions;
        Ok(())
    }

    pub fn cluster_functions(&self, cluster: ClusterHandle) -> Option<ClusterFunctions> {
        self.clusters.get(cluster).map(|cl| cl.functions)
    }

    /// Collect the init callbacks of the clusters of an endpoint. They run
    /// later, once the node is no longer borrowed.
    pub(crate) fn endpoint_init(&self, endpoint: EndpointHandle) -> Option<EndpointInit> {
        let endpoint_id = self.endpoint_id(endpoint)?;
        let mut init = EndpointInit {
            endpoint_id,
            plugin_inits: vec![],
            inits: vec![],
        };
        for cl in self.clusters(endpoint).filter_map(|c| self.clusters.get(c)) {
            if cl.flags.contains(ClusterFlags::SERVER) {
                init.plugin_inits.extend(cl.plugin_server_init);
            }
            if cl.flags.contains(ClusterFlags::CLIENT) {
                init.plugin_inits.extend(cl.plugin_client_init);
            }
            init.inits.extend(cl.functions.init);
        }
        Some(init)
    }
}

pub(crate) struct EndpointInit {
    endpoint_id: u16,
    plugin_inits: Vec<PluginInitCallback>,
    inits: Vec<fn(endpoint_id: u16)>,
}

impl EndpointInit {
    pub(crate) fn run(self) {
        debug!(endpoint_id = self.endpoint_id, "initialising clusters");
        for init in self.plugin_inits {
            init();
        }
        for init in self.inits {
            init(self.endpoint_id);
        }
    }
}

#[repr(u32)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAttributes {
    ClusterRevision = 0xFFFD,
    FeatureMap = 0xFFFC,
}

/// Every server cluster carries its revision
pub fn create_cluster_revision(
    node: &mut Node,
    cluster: ClusterHandle,
    revision: u16,
) -> Result<AttributeHandle> {
    node.create_attribute(
        cluster,
        GlobalAttributes::ClusterRevision as u32,
        AttributeFlags::empty(),
        AttrValue::Uint16(revision),
    )
}

pub fn create_feature_map(
    node: &mut Node,
    cluster: ClusterHandle,
    features: u32,
) -> Result<AttributeHandle> {
    node.create_attribute(
        cluster,
        GlobalAttributes::FeatureMap as u32,
        AttributeFlags::empty(),
        AttrValue::Bitmap32(features),
    )
}
