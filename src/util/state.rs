//! State machines for the device lifecycle

/// Lifecycle of the data model (see [`Device`](crate::data_model::device::Device))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// The graph is being declared, no protocol traffic exists yet
    Building,
    /// One-shot transition while the protocol stack is being launched
    Starting,
    /// Protocol traffic flows, mutation requires the execution lock
    Running,
    /// Persisted state was erased and a restart requested, terminal
    FactoryReset,
}

impl LifecycleState {
    /// Whether the protocol stack may be touching the graph concurrently
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}
