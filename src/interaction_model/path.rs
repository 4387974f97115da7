//! Concrete paths (8.9.2), every component is known

/// Path of a single attribute on a single endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConcreteAttributePath {
    pub endpoint_id: u16,
    pub cluster_id: u32,
    pub attribute_id: u32,
}

impl ConcreteAttributePath {
    pub const fn new(endpoint_id: u16, cluster_id: u32, attribute_id: u32) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            attribute_id,
        }
    }
}

/// Path of a single command on a single endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConcreteCommandPath {
    pub endpoint_id: u16,
    pub cluster_id: u32,
    pub command_id: u32,
}

impl ConcreteCommandPath {
    pub const fn new(endpoint_id: u16, cluster_id: u32, command_id: u32) -> Self {
        Self {
            endpoint_id,
            cluster_id,
            command_id,
        }
    }
}
