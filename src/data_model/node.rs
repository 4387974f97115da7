//! The node (7.8) and the arenas of the entity graph.
//!
//! A process hosts exactly one [`Node`]. It owns every endpoint, cluster,
//! attribute and command in per-kind [`Arena`]s; parents keep the handles of
//! their children in creation order, which is the enumeration order.

use tracing::debug;

use crate::{
    cluster::Cluster,
    config::Limits,
    constants::MAX_ENDPOINT_ID,
    data_model::{
        arena::{Arena, Handle},
        attribute::Attribute,
        command::Command,
        endpoint::{Endpoint, EndpointFlags},
    },
    Error, Result,
};

pub type EndpointHandle = Handle<Endpoint>;
pub type ClusterHandle = Handle<Cluster>;
pub type AttributeHandle = Handle<Attribute>;
pub type CommandHandle = Handle<Command>;

pub struct Node {
    pub(crate) endpoint_list: Vec<EndpointHandle>,
    pub(crate) endpoints: Arena<Endpoint>,
    pub(crate) clusters: Arena<Cluster>,
    pub(crate) attributes: Arena<Attribute>,
    pub(crate) commands: Arena<Command>,
    /// Next endpoint ID to allocate, never decremented
    next_endpoint_id: u32,
}

impl Node {
    /// Create a node without any endpoint
    pub fn new(limits: Limits) -> Self {
        Self {
            endpoint_list: Vec::new(),
            endpoints: Arena::with_capacity(limits.max_endpoints),
            clusters: Arena::with_capacity(limits.max_clusters),
            attributes: Arena::with_capacity(limits.max_attributes),
            commands: Arena::with_capacity(limits.max_commands),
            next_endpoint_id: 0,
        }
    }

    /// The ID the next [`create_endpoint`](Self::create_endpoint) will use
    pub fn next_endpoint_id(&self) -> u32 {
        self.next_endpoint_id
    }

    /// Raise the endpoint ID allocator, e.g. to the value persisted by a
    /// previous boot. The allocator never goes backwards.
    pub fn reserve_endpoint_ids(&mut self, next_endpoint_id: u32) {
        self.next_endpoint_id = self.next_endpoint_id.max(next_endpoint_id);
    }

    /// Create an endpoint with the next unused endpoint ID and append it to
    /// the node.
    pub fn create_endpoint(&mut self, flags: EndpointFlags) -> Result<EndpointHandle> {
        let id = u16::try_from(self.next_endpoint_id)
            .ok()
            .filter(|id| *id <= MAX_ENDPOINT_ID)
            .ok_or(Error::NoMemory)?;
        self.insert_endpoint(id, flags)
    }

    /// Create an endpoint with a given ID, for endpoints whose ID must survive
    /// a reboot (bridged devices for example).
    pub fn create_endpoint_with_id(
        &mut self,
        endpoint_id: u16,
        flags: EndpointFlags,
    ) -> Result<EndpointHandle> {
        if endpoint_id > MAX_ENDPOINT_ID {
            return Err(Error::InvalidValue);
        }
        if self.endpoint(endpoint_id).is_some() {
            return Err(Error::AlreadyExists(endpoint_id as u32));
        }
        self.insert_endpoint(endpoint_id, flags)
    }

    fn insert_endpoint(&mut self, id: u16, flags: EndpointFlags) -> Result<EndpointHandle> {
        let handle = self
            .endpoints
            .insert(Endpoint::new(id, flags))
            .ok_or(Error::NoMemory)?;
        self.endpoint_list.push(handle);
        self.next_endpoint_id = self.next_endpoint_id.max(id as u32 + 1);
        debug!(endpoint_id = id, ?flags, "endpoint created");
        Ok(handle)
    }

    /// Destroy an endpoint and everything under it. Only endpoints created
    /// with [`EndpointFlags::DESTROYABLE`] can be destroyed.
    pub fn destroy_endpoint(&mut self, endpoint: EndpointHandle) -> Result<()> {
        let ep = self.endpoints.get(endpoint).ok_or(Error::NotFound)?;
        if !ep.flags.contains(EndpointFlags::DESTROYABLE) {
            return Err(Error::NotDestroyable);
        }
        let id = ep.id;
        let clusters = ep.clusters.clone();
        for cluster in clusters {
            self.release_cluster(cluster);
        }
        self.endpoints.remove(endpoint);
        self.endpoint_list.retain(|h| *h != endpoint);
        debug!(endpoint_id = id, "endpoint destroyed");
        Ok(())
    }

    fn release_cluster(&mut self, cluster: ClusterHandle) {
        if let Some(cl) = self.clusters.remove(cluster) {
            for attribute in cl.attributes {
                self.attributes.remove(attribute);
            }
            for command in cl.commands {
                self.commands.remove(command);
            }
        }
    }

    pub fn endpoint(&self, endpoint_id: u16) -> Option<EndpointHandle> {
        self.endpoint_list
            .iter()
            .copied()
            .find(|h| self.endpoints.get(*h).map(|ep| ep.id) == Some(endpoint_id))
    }

    pub fn first_endpoint(&self) -> Option<EndpointHandle> {
        self.endpoint_list.first().copied()
    }

    pub fn next_endpoint(&self, endpoint: EndpointHandle) -> Option<EndpointHandle> {
        next_sibling(&self.endpoint_list, endpoint)
    }

    /// All endpoints in creation order
    pub fn endpoints(&self) -> impl Iterator<Item = EndpointHandle> + '_ {
        self.endpoint_list.iter().copied()
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoint_list.len()
    }
}

/// The handle following `current` in a sibling list
pub(crate) fn next_sibling<T>(siblings: &[Handle<T>], current: Handle<T>) -> Option<Handle<T>> {
    let position = siblings.iter().position(|h| *h == current)?;
    siblings.get(position + 1).copied()
}
