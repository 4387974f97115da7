//! The lifecycle controller.
//!
//! A [`Device`] owns the data model and the protocol stack. While
//! [`Building`](LifecycleState::Building), the node is mutated directly through
//! [`Device::node_mut`]. [`Device::start`] hands the node to the stack, from
//! then on the node is only reachable through the execution lock.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    cluster::{ClusterFunctions, EndpointInit},
    config::DeviceConfig,
    constants::{ENDPOINT_COUNTER_KEY, ROOT_ENDPOINT_ID},
    data_model::{
        endpoint::EndpointFlags,
        handler::{AttributeUpdateCallback, DataModel, EventCallback, ProtocolStack},
        node::{EndpointHandle, Node},
    },
    lock::{ExecutionGuard, Timeout},
    storage::{NvStore, StoreError},
    util::state::LifecycleState,
    Error, Result,
};

pub struct Device {
    config: DeviceConfig,
    model: Arc<DataModel>,
    stack: Box<dyn ProtocolStack>,
}

impl Device {
    /// Create a device with an empty node. Static endpoints built before
    /// [`start`](Self::start) get the same IDs on every boot.
    pub fn new(config: DeviceConfig, store: Arc<dyn NvStore>, stack: Box<dyn ProtocolStack>) -> Self {
        let model = DataModel::new(&config, store);
        Self {
            config,
            model: Arc::new(model),
            stack,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.model.state()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The data model shared with the protocol stack
    pub fn model(&self) -> Arc<DataModel> {
        self.model.clone()
    }

    /// Direct access to the node while the graph is being built.
    ///
    /// Fails with [`Error::Busy`] if a clone of the [`model`](Self::model) is
    /// still alive.
    pub fn node_mut(&mut self) -> Result<&mut Node> {
        self.expect_state(LifecycleState::Building)?;
        Ok(self.model_mut()?.node_mut())
    }

    /// Install the application callback for attribute updates, before start
    pub fn set_attribute_update_callback(
        &mut self,
        callback: Box<dyn AttributeUpdateCallback>,
    ) -> Result<()> {
        self.expect_state(LifecycleState::Building)?;
        self.model_mut()?.set_update_callback(callback);
        Ok(())
    }

    /// Acquire the execution lock. Required for every mutation after start.
    pub fn lock(&self, timeout: Timeout) -> Result<ExecutionGuard<'_, Node>> {
        self.model.lock(timeout)
    }

    /// Start the protocol stack. Endpoint 0 must exist.
    ///
    /// Persistent attributes are loaded from the store, every endpoint is
    /// enabled and the cluster init callbacks run before the stack starts.
    pub fn start(&mut self, event_callback: Option<EventCallback>) -> Result<()> {
        self.expect_state(LifecycleState::Building)?;
        {
            let guard = self.lock(self.config.lock_timeout)?;
            let node = guard.try_borrow()?;
            if node.endpoint(ROOT_ENDPOINT_ID).is_none() {
                warn!("cannot start without the root endpoint");
                return Err(Error::InvalidState(LifecycleState::Building));
            }
        }
        self.model.set_state(LifecycleState::Starting);
        info!("starting the data model");

        match self.start_stack(event_callback) {
            Ok(()) => {
                self.model.set_state(LifecycleState::Running);
                info!("data model running");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to start");
                self.set_all_enabled(false)?;
                self.model.set_state(LifecycleState::Building);
                Err(e)
            }
        }
    }

    fn start_stack(&mut self, event_callback: Option<EventCallback>) -> Result<()> {
        if let Some(callback) = event_callback {
            self.stack.register_event_callback(callback)?;
        }
        let next_endpoint_id = {
            let guard = self.lock(self.config.lock_timeout)?;
            let mut node = guard.try_borrow_mut()?;
            let endpoints: Vec<_> = node.endpoints().collect();
            for endpoint in endpoints {
                self.model.load_persistent_attributes(&mut node, endpoint);
            }
            // dynamic endpoints of a previous boot keep their IDs reserved
            if let Some(persisted) = load_endpoint_counter(self.model.store()) {
                node.reserve_endpoint_ids(persisted);
            }
            node.next_endpoint_id()
        };
        self.store_endpoint_counter(next_endpoint_id)?;
        self.set_all_enabled(true)?;
        self.stack.start(self.model.clone())?;

        let inits = {
            let guard = self.lock(self.config.lock_timeout)?;
            let node = guard.try_borrow()?;
            let inits: Vec<EndpointInit> = node
                .endpoints()
                .filter_map(|ep| node.endpoint_init(ep))
                .collect();
            inits
        };
        inits.into_iter().for_each(EndpointInit::run);
        Ok(())
    }

    /// Serve an endpoint created after start. The endpoint must have at least
    /// one cluster.
    ///
    /// The endpoint counter is persisted before the stack sees the endpoint,
    /// a failed call leaves the endpoint disabled and can be retried.
    pub fn enable_endpoint(&mut self, endpoint: EndpointHandle) -> Result<()> {
        self.expect_state(LifecycleState::Running)?;
        let registration = {
            let guard = self.lock(self.config.lock_timeout)?;
            let mut node = guard.try_borrow_mut()?;
            if node.endpoint_id(endpoint).is_none() {
                return Err(Error::NotFound);
            }
            if node.is_enabled(endpoint) {
                return Err(Error::AlreadyEnabled);
            }
            if node.cluster_count(endpoint) == 0 {
                return Err(Error::EmptyEndpoint);
            }
            self.model.load_persistent_attributes(&mut node, endpoint);
            self.store_endpoint_counter(node.next_endpoint_id())?;
            node.set_enabled(endpoint, true);
            let registration =
                DataModel::endpoint_registration(&node, endpoint).ok_or(Error::NotFound)?;
            registration
        };

        // the stack may need the lock from its own context, it is not held here
        if let Err(e) = self.stack.endpoint_enabled(&registration) {
            error!(endpoint_id = registration.endpoint_id, error = %e, "stack rejected the endpoint");
            let guard = self.lock(self.config.lock_timeout)?;
            guard.try_borrow_mut()?.set_enabled(endpoint, false);
            return Err(e);
        }
        let init = {
            let guard = self.lock(self.config.lock_timeout)?;
            let init = guard.try_borrow()?.endpoint_init(endpoint);
            init
        };
        if let Some(init) = init {
            init.run();
        }
        info!(endpoint_id = registration.endpoint_id, "endpoint enabled");
        Ok(())
    }

    /// Destroy an endpoint and everything under it.
    ///
    /// After start, the endpoint is withdrawn from the stack and the cluster
    /// `shutdown` functions run before the graph is released.
    pub fn destroy_endpoint(&mut self, endpoint: EndpointHandle) -> Result<()> {
        let state = self.state();
        if !matches!(state, LifecycleState::Building | LifecycleState::Running) {
            return Err(Error::InvalidState(state));
        }
        let (endpoint_id, enabled, functions) = {
            let guard = self.lock(self.config.lock_timeout)?;
            let node = guard.try_borrow()?;
            let endpoint_id = node.endpoint_id(endpoint).ok_or(Error::NotFound)?;
            let destroyable = node
                .endpoint_flags(endpoint)
                .is_some_and(|f| f.contains(EndpointFlags::DESTROYABLE));
            if !destroyable {
                return Err(Error::NotDestroyable);
            }
            let functions: Vec<ClusterFunctions> = node
                .clusters(endpoint)
                .filter_map(|cl| node.cluster_functions(cl))
                .collect();
            (endpoint_id, node.is_enabled(endpoint), functions)
        };

        if enabled && state == LifecycleState::Running {
            self.stack.endpoint_disabled(endpoint_id)?;
            for shutdown in functions.iter().filter_map(|f| f.shutdown) {
                shutdown(endpoint_id);
            }
        }
        let guard = self.lock(self.config.lock_timeout)?;
        let result = guard.try_borrow_mut()?.destroy_endpoint(endpoint);
        result
    }

    /// Erase every persisted record and the stack identity, then restart.
    /// The device is unusable afterwards.
    pub fn factory_reset(&mut self) -> Result<()> {
        let state = self.state();
        if state == LifecycleState::FactoryReset {
            return Err(Error::InvalidState(state));
        }
        warn!("factory reset");
        self.model.store().erase_all()?;
        self.stack.erase_identity()?;
        self.model.set_state(LifecycleState::FactoryReset);
        self.stack.restart()
    }

    fn expect_state(&self, expected: LifecycleState) -> Result<()> {
        match self.state() {
            state if state == expected => Ok(()),
            state => Err(Error::InvalidState(state)),
        }
    }

    fn model_mut(&mut self) -> Result<&mut DataModel> {
        Arc::get_mut(&mut self.model).ok_or(Error::Busy)
    }

    fn set_all_enabled(&self, enabled: bool) -> Result<()> {
        let guard = self.lock(self.config.lock_timeout)?;
        let mut node = guard.try_borrow_mut()?;
        let endpoints: Vec<_> = node.endpoints().collect();
        for endpoint in endpoints {
            node.set_enabled(endpoint, enabled);
        }
        Ok(())
    }

    fn store_endpoint_counter(&self, next_endpoint_id: u32) -> Result<()> {
        self.model
            .store()
            .set(ENDPOINT_COUNTER_KEY, &next_endpoint_id.to_le_bytes())
            .inspect_err(|e| error!(error = %e, "failed to persist the endpoint counter"))?;
        debug!(next_endpoint_id, "endpoint counter persisted");
        Ok(())
    }
}

fn load_endpoint_counter(store: &dyn NvStore) -> Option<u32> {
    match store.get(ENDPOINT_COUNTER_KEY) {
        Ok(record) => match <[u8; 4]>::try_from(record.as_slice()) {
            Ok(bytes) => Some(u32::from_le_bytes(bytes)),
            Err(_) => {
                warn!(len = record.len(), "corrupt endpoint counter, ignoring it");
                None
            }
        },
        Err(StoreError::NotFound) => None,
        Err(e) => {
            error!(error = %e, "failed to load the endpoint counter");
            None
        }
    }
}
