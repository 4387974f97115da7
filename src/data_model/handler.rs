//! The boundary between the data model and the protocol stack.
//!
//! The stack reads, writes and invokes through [`Handler`], drains pending
//! attribute reports through [`ChangeNotifier`], and is driven by the
//! [`Device`](crate::data_model::device::Device) through [`ProtocolStack`].

use std::sync::Arc;

use parking_lot::Mutex;
use thingbuf::ThingBuf;
use tracing::{debug, error, warn};

use crate::{
    cluster::ClusterFlags,
    config::DeviceConfig,
    data_model::{
        attribute::AttributeFlags,
        command::CommandFlags,
        device_type::DeviceType,
        node::{AttributeHandle, EndpointHandle, Node},
        value::{AttrValType, AttrValue},
    },
    interaction_model::path::{ConcreteAttributePath, ConcreteCommandPath},
    lock::{ExecutionGuard, ExecutionLock, Timeout},
    storage::{NvStore, StoreError},
    tlv::TlvReader,
    util::state::LifecycleState,
    Error, Result,
};

/// Why the attribute update callback is called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// Before an update is applied, an error vetoes it
    PreUpdate,
    /// After an update was applied
    PostUpdate,
    /// The protocol stack read the attribute
    Read,
    /// The protocol stack is writing the attribute, an error vetoes it
    Write,
}

pub trait AttributeUpdateCallback: Send + Sync {
    fn on_update(
        &self,
        update: UpdateType,
        path: &ConcreteAttributePath,
        val: &AttrValue,
    ) -> Result<()>;
}

impl<F> AttributeUpdateCallback for F
where
    F: Fn(UpdateType, &ConcreteAttributePath, &AttrValue) -> Result<()> + Send + Sync,
{
    fn on_update(
        &self,
        update: UpdateType,
        path: &ConcreteAttributePath,
        val: &AttrValue,
    ) -> Result<()> {
        self(update, path, val)
    }
}

/// Events raised by the protocol stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    IpAddressChanged,
    CommissioningSessionStarted,
    CommissioningSessionStopped,
    CommissioningWindowOpened,
    CommissioningWindowClosed,
    CommissioningComplete,
    FailSafeTimerExpired,
    Other(u16),
}

pub type EventCallback = Box<dyn Fn(&DeviceEvent) + Send + Sync>;

/// The protocol stack, as seen by the lifecycle controller
pub trait ProtocolStack: Send {
    fn register_event_callback(&mut self, callback: EventCallback) -> Result<()>;
    /// Start serving the enabled endpoints of `model`
    fn start(&mut self, model: Arc<DataModel>) -> Result<()>;
    fn endpoint_enabled(&mut self, endpoint: &EndpointRegistration) -> Result<()>;
    fn endpoint_disabled(&mut self, endpoint_id: u16) -> Result<()>;
    /// Erase fabrics, keys and other identity state of the stack
    fn erase_identity(&mut self) -> Result<()>;
    fn restart(&mut self) -> Result<()>;
}

/// Who sends the response of an invoked command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDisposition {
    /// The stack sends the default status response
    Default,
    /// The command callback responded itself
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRegistration {
    pub id: u32,
    pub val_type: AttrValType,
    pub flags: AttributeFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRegistration {
    pub cluster_id: u32,
    pub flags: ClusterFlags,
    pub attributes: Vec<AttributeRegistration>,
    pub accepted_commands: Vec<u32>,
    pub generated_commands: Vec<u32>,
}

/// What the stack needs to serve an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistration {
    pub endpoint_id: u16,
    pub device_type: Option<DeviceType>,
    pub clusters: Vec<ClusterRegistration>,
}

pub trait ChangeNotifier<T> {
    fn consume_change(&self) -> Option<T>;
}

pub trait Handler {
    fn handle_read(&self, path: &ConcreteAttributePath) -> Result<AttrValue>;

    fn handle_write(&self, path: &ConcreteAttributePath, val: AttrValue) -> Result<()>;

    fn handle_invoke(
        &self,
        path: &ConcreteCommandPath,
        payload: &mut TlvReader<'_>,
    ) -> Result<ResponseDisposition>;

    /// Enabled endpoints, in enumeration order
    fn registration(&self) -> Result<Vec<EndpointRegistration>>;
}

/// The node behind its execution lock, plus what the protocol stack needs
/// around it.
pub struct DataModel {
    node: ExecutionLock<Node>,
    store: Arc<dyn NvStore>,
    state: Mutex<LifecycleState>,
    reports: ThingBuf<ConcreteAttributePath>,
    update_callback: Option<Box<dyn AttributeUpdateCallback>>,
    lock_timeout: Timeout,
}

impl DataModel {
    pub(crate) fn new(config: &DeviceConfig, store: Arc<dyn NvStore>) -> Self {
        Self {
            node: ExecutionLock::new(Node::new(config.limits)),
            store,
            state: Mutex::new(LifecycleState::Building),
            reports: ThingBuf::new(config.report_queue_len.max(1)),
            update_callback: None,
            lock_timeout: config.lock_timeout,
        }
    }

    /// Acquire the execution lock around the node
    pub fn lock(&self, timeout: Timeout) -> Result<ExecutionGuard<'_, Node>> {
        self.node.lock(timeout)
    }

    pub(crate) fn node_mut(&mut self) -> &mut Node {
        self.node.get_mut()
    }

    pub fn store(&self) -> &dyn NvStore {
        self.store.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    pub(crate) fn set_update_callback(&mut self, callback: Box<dyn AttributeUpdateCallback>) {
        self.update_callback = Some(callback);
    }

    /// Update an attribute after start, and report the change to the stack.
    ///
    /// Takes the execution lock with the configured timeout, which is
    /// reentrant if the caller already holds it. The update callback and the
    /// cluster `pre_attribute_changed` function can veto the update.
    pub fn update(
        &self,
        endpoint_id: u16,
        cluster_id: u32,
        attribute_id: u32,
        val: AttrValue,
    ) -> Result<()> {
        let state = self.state();
        if !state.is_live() {
            return Err(Error::InvalidState(state));
        }
        let path = ConcreteAttributePath::new(endpoint_id, cluster_id, attribute_id);
        self.apply(&path, val, UpdateType::PreUpdate)
    }

    /// Copy the payload of an attribute value into `buf`
    pub fn get_val_raw(
        &self,
        endpoint_id: u16,
        cluster_id: u32,
        attribute_id: u32,
        buf: &mut [u8],
    ) -> Result<usize> {
        let guard = self.lock(self.lock_timeout)?;
        let mut node = guard.try_borrow_mut()?;
        node.get_val_raw(
            &ConcreteAttributePath::new(endpoint_id, cluster_id, attribute_id),
            buf,
        )
    }

    fn apply(&self, path: &ConcreteAttributePath, val: AttrValue, kind: UpdateType) -> Result<()> {
        let guard = self.lock(self.lock_timeout)?;
        let (attribute, functions) = {
            let node = guard.try_borrow()?;
            let attribute = node.find_attribute(path).ok_or(Error::NotFound)?;
            node.attributes
                .get(attribute)
                .ok_or(Error::NotFound)?
                .validate(&val)?;
            let functions = node
                .attribute_cluster(attribute)
                .and_then(|cl| node.cluster_functions(cl))
                .unwrap_or_default();
            (attribute, functions)
        };

        // callbacks run without the node borrowed, they may read it
        if let Some(pre) = functions.pre_attribute_changed {
            pre(path, &val).map_err(|e| {
                debug!(?path, error = %e, "update vetoed by the cluster");
                Error::Vetoed
            })?;
        }
        if let Some(callback) = &self.update_callback {
            callback.on_update(kind, path, &val).map_err(|e| {
                debug!(?path, error = %e, "update vetoed by the application");
                Error::Vetoed
            })?;
        }

        {
            let mut node = guard.try_borrow_mut()?;
            let persistent = node
                .attribute_flags(attribute)
                .is_some_and(|f| f.contains(AttributeFlags::NONVOLATILE));
            // the record is written first, a failed write leaves memory untouched
            if persistent {
                node.persist_val(attribute, &val, self.store())?;
            }
            if let Err(e) = node.set_val(attribute, val.clone()) {
                if persistent {
                    if let Err(restore) = node.store_val_in_nvs(attribute, self.store()) {
                        warn!(?path, error = %restore, "persisted record differs from memory");
                    }
                }
                return Err(e);
            }
        }
        self.report(*path);

        if let Some(changed) = functions.attribute_changed {
            changed(path);
        }
        if kind == UpdateType::PreUpdate {
            if let Some(callback) = &self.update_callback {
                if let Err(e) = callback.on_update(UpdateType::PostUpdate, path, &val) {
                    warn!(?path, error = %e, "post update callback failed");
                }
            }
        }
        Ok(())
    }

    fn report(&self, path: ConcreteAttributePath) {
        if self.reports.push(path).is_err() {
            let dropped = self.reports.pop();
            warn!(?dropped, "report queue full, dropping the oldest report");
            if self.reports.push(path).is_err() {
                warn!(?path, "report dropped");
            }
        }
    }

    /// Load every persistent attribute of an endpoint from the store. Missing
    /// or stale records are replaced by the current value.
    pub(crate) fn load_persistent_attributes(&self, node: &mut Node, endpoint: EndpointHandle) {
        let graph: &Node = node;
        let attributes: Vec<AttributeHandle> = graph
            .clusters(endpoint)
            .flat_map(|cl| graph.attributes(cl))
            .filter(|a| {
                graph
                    .attribute_flags(*a)
                    .is_some_and(|f| f.contains(AttributeFlags::NONVOLATILE))
            })
            .collect();
        for attribute in attributes {
            let path = node.attribute_path(attribute);
            match node.get_val_from_nvs(attribute, self.store()) {
                Ok(val) => match node.set_val(attribute, val) {
                    Ok(()) => continue,
                    Err(e) => warn!(?path, error = %e, "persisted value rejected"),
                },
                Err(Error::Storage(StoreError::NotFound)) => {
                    debug!(?path, "no persisted value, storing the default")
                }
                Err(Error::PersistedTypeMismatch) => {
                    warn!(?path, "persisted value is stale, overwriting it")
                }
                Err(e) => {
                    error!(?path, error = %e, "failed to load persisted value");
                    continue;
                }
            }
            if let Err(e) = node.store_val_in_nvs(attribute, self.store()) {
                warn!(?path, error = %e, "failed to store the default value");
            }
        }
    }

    pub(crate) fn endpoint_registration(
        node: &Node,
        endpoint: EndpointHandle,
    ) -> Option<EndpointRegistration> {
        let endpoint_id = node.endpoint_id(endpoint)?;
        let clusters = node
            .clusters(endpoint)
            .filter_map(|cl| {
                let attributes = node
                    .attributes(cl)
                    .filter_map(|a| {
                        Some(AttributeRegistration {
                            id: node.attribute_id(a)?,
                            val_type: node.attribute_val_type(a)?,
                            flags: node.attribute_flags(a)?,
                        })
                    })
                    .collect();
                let commands_with = |direction: CommandFlags| -> Vec<u32> {
                    node.commands(cl)
                        .filter(|c| node.command_flags(*c).is_some_and(|f| f.contains(direction)))
                        .filter_map(|c| node.command_id(c))
                        .collect()
                };
                Some(ClusterRegistration {
                    cluster_id: node.cluster_id(cl)?,
                    flags: node.cluster_flags(cl)?,
                    attributes,
                    accepted_commands: commands_with(CommandFlags::ACCEPTED),
                    generated_commands: commands_with(CommandFlags::GENERATED),
                })
            })
            .collect();
        Some(EndpointRegistration {
            endpoint_id,
            device_type: node.device_type(endpoint),
            clusters,
        })
    }
}

impl Handler for DataModel {
    fn handle_read(&self, path: &ConcreteAttributePath) -> Result<AttrValue> {
        let guard = self.lock(self.lock_timeout)?;
        let val = {
            let mut node = guard.try_borrow_mut()?;
            let attribute = node.find_attribute(path).ok_or(Error::NotFound)?;
            node.get_val(attribute)?
        };
        if let Some(callback) = &self.update_callback {
            if let Err(e) = callback.on_update(UpdateType::Read, path, &val) {
                debug!(?path, error = %e, "read callback failed");
            }
        }
        Ok(val)
    }

    fn handle_write(&self, path: &ConcreteAttributePath, val: AttrValue) -> Result<()> {
        {
            let guard = self.lock(self.lock_timeout)?;
            let node = guard.try_borrow()?;
            let attribute = node.find_attribute(path).ok_or(Error::NotFound)?;
            let writable = node
                .attribute_flags(attribute)
                .is_some_and(|f| f.contains(AttributeFlags::WRITABLE));
            if !writable {
                return Err(Error::UnsupportedWrite);
            }
        }
        self.apply(path, val, UpdateType::Write)
    }

    fn handle_invoke(
        &self,
        path: &ConcreteCommandPath,
        payload: &mut TlvReader<'_>,
    ) -> Result<ResponseDisposition> {
        let guard = self.lock(self.lock_timeout)?;
        let (callback, flags) = {
            let node = guard.try_borrow()?;
            let command = node
                .endpoint(path.endpoint_id)
                .and_then(|ep| node.cluster(ep, path.cluster_id))
                .and_then(|cl| node.command_in(cl, path.command_id, CommandFlags::ACCEPTED))
                .ok_or(Error::NotFound)?;
            let callback = node.command_callback(command).ok_or(Error::NoCallback)?;
            (callback, node.command_flags(command).unwrap_or_default())
        };
        callback
            .invoke(path, payload)
            .inspect_err(|e| warn!(?path, error = %e, "command failed"))?;
        Ok(if flags.contains(CommandFlags::CUSTOM) {
            ResponseDisposition::Custom
        } else {
            ResponseDisposition::Default
        })
    }

    fn registration(&self) -> Result<Vec<EndpointRegistration>> {
        let guard = self.lock(self.lock_timeout)?;
        let node = guard.try_borrow()?;
        let endpoints = node
            .endpoints()
            .filter(|ep| node.is_enabled(*ep))
            .filter_map(|ep| Self::endpoint_registration(&node, ep))
            .collect();
        Ok(endpoints)
    }
}

impl ChangeNotifier<ConcreteAttributePath> for DataModel {
    fn consume_change(&self) -> Option<ConcreteAttributePath> {
        self.reports.pop()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        cluster::ClusterFunctions,
        data_model::{
            attribute::{override_fn, OverrideAccess},
            command::handler,
            endpoint::EndpointFlags,
        },
        storage::MemoryStore,
    };

    fn model(config: &DeviceConfig) -> (DataModel, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut model = DataModel::new(config, store.clone());
        let node = model.node_mut();
        let ep = node.create_endpoint(EndpointFlags::empty()).unwrap();
        let cl = node.create_cluster(ep, 0x0006, ClusterFlags::SERVER).unwrap();
        node.create_attribute(
            cl,
            0x0000,
            AttributeFlags::NONVOLATILE,
            AttrValue::Boolean(false),
        )
        .unwrap();
        let on_time = node
            .create_attribute(cl, 0x4001, AttributeFlags::WRITABLE, AttrValue::Uint16(0))
            .unwrap();
        node.add_bounds(on_time, AttrValue::Uint16(0), AttrValue::Uint16(600))
            .unwrap();
        model.set_state(LifecycleState::Running);
        (model, store)
    }

    #[test]
    fn test_update_persists_and_reports() {
        let (model, store) = model(&DeviceConfig::default());
        model.update(0, 0x0006, 0x0000, true.into()).unwrap();

        let path = ConcreteAttributePath::new(0, 0x0006, 0x0000);
        assert_eq!(model.handle_read(&path), Ok(AttrValue::Boolean(true)));
        assert_eq!(
            store.get(&crate::storage::attribute_key(&path)).unwrap(),
            vec![0x01, 0x01]
        );
        assert_eq!(model.consume_change(), Some(path));
        assert_eq!(model.consume_change(), None);
    }

    #[test]
    fn test_update_before_start() {
        let (model, _) = model(&DeviceConfig::default());
        model.set_state(LifecycleState::Building);
        assert_eq!(
            model.update(0, 0x0006, 0x0000, true.into()),
            Err(Error::InvalidState(LifecycleState::Building))
        );
    }

    #[test]
    fn test_report_queue_drops_oldest() {
        let config = DeviceConfig {
            report_queue_len: 2,
            ..DeviceConfig::default()
        };
        let (model, _) = model(&config);
        for on_time in [1u16, 2, 3] {
            model.update(0, 0x0006, 0x4001, on_time.into()).unwrap();
        }
        model.update(0, 0x0006, 0x0000, true.into()).unwrap();
        assert_eq!(
            model.consume_change(),
            Some(ConcreteAttributePath::new(0, 0x0006, 0x4001))
        );
        assert_eq!(
            model.consume_change(),
            Some(ConcreteAttributePath::new(0, 0x0006, 0x0000))
        );
        assert_eq!(model.consume_change(), None);
    }

    #[test]
    fn test_write_requires_writable() {
        let (model, _) = model(&DeviceConfig::default());
        let on_off = ConcreteAttributePath::new(0, 0x0006, 0x0000);
        assert_eq!(
            model.handle_write(&on_off, true.into()),
            Err(Error::UnsupportedWrite)
        );
        let on_time = ConcreteAttributePath::new(0, 0x0006, 0x4001);
        assert_eq!(
            model.handle_write(&on_time, AttrValue::Uint16(601)),
            Err(Error::ConstraintError)
        );
        model.handle_write(&on_time, AttrValue::Uint16(600)).unwrap();
        assert_eq!(model.handle_read(&on_time), Ok(AttrValue::Uint16(600)));
    }

    static CHANGED: AtomicUsize = AtomicUsize::new(0);

    fn count_change(_: &ConcreteAttributePath) {
        CHANGED.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_update_callbacks() {
        let (mut model, _) = model(&DeviceConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        model.set_update_callback(Box::new(
            move |update: UpdateType, _: &ConcreteAttributePath, val: &AttrValue| {
                log.lock().push(update);
                match val {
                    AttrValue::Uint16(v) if *v > 300 => Err(Error::InvalidValue),
                    _ => Ok(()),
                }
            },
        ));
        {
            let guard = model.lock(Timeout::Immediate).unwrap();
            let mut node = guard.borrow_mut();
            let ep = node.endpoint(0).unwrap();
            let cl = node.cluster(ep, 0x0006).unwrap();
            node.add_function_list(
                cl,
                ClusterFunctions {
                    attribute_changed: Some(count_change),
                    ..Default::default()
                },
            )
            .unwrap();
        }

        model.update(0, 0x0006, 0x4001, AttrValue::Uint16(10)).unwrap();
        assert_eq!(
            model.update(0, 0x0006, 0x4001, AttrValue::Uint16(400)),
            Err(Error::Vetoed)
        );
        assert_eq!(
            model.handle_read(&ConcreteAttributePath::new(0, 0x0006, 0x4001)),
            Ok(AttrValue::Uint16(10))
        );
        assert_eq!(CHANGED.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock(),
            vec![
                UpdateType::PreUpdate,
                UpdateType::PostUpdate,
                UpdateType::PreUpdate,
                UpdateType::Read
            ]
        );
    }

    #[test]
    fn test_invoke() {
        let (mut model, _) = model(&DeviceConfig::default());
        let invoked = Arc::new(AtomicUsize::new(0));
        {
            let counter = invoked.clone();
            let node = model.node_mut();
            let ep = node.endpoint(0).unwrap();
            let cl = node.cluster(ep, 0x0006).unwrap();
            node.create_command(
                cl,
                0x02,
                CommandFlags::ACCEPTED,
                Some(handler(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })),
            )
            .unwrap();
            node.create_command(
                cl,
                0x00,
                CommandFlags::ACCEPTED | CommandFlags::CUSTOM,
                Some(handler(|_, _| Ok(()))),
            )
            .unwrap();
            node.create_command(cl, 0x01, CommandFlags::ACCEPTED, None)
                .unwrap();
        }
        let mut payload = TlvReader::new(&[]);
        assert_eq!(
            model.handle_invoke(&ConcreteCommandPath::new(0, 0x0006, 0x02), &mut payload),
            Ok(ResponseDisposition::Default)
        );
        assert_eq!(
            model.handle_invoke(&ConcreteCommandPath::new(0, 0x0006, 0x00), &mut payload),
            Ok(ResponseDisposition::Custom)
        );
        assert_eq!(
            model.handle_invoke(&ConcreteCommandPath::new(0, 0x0006, 0x01), &mut payload),
            Err(Error::NoCallback)
        );
        assert_eq!(
            model.handle_invoke(&ConcreteCommandPath::new(0, 0x0008, 0x01), &mut payload),
            Err(Error::NotFound)
        );
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_persistent_attributes() {
        let (model, store) = model(&DeviceConfig::default());
        let path = ConcreteAttributePath::new(0, 0x0006, 0x0000);
        let key = crate::storage::attribute_key(&path);
        store.set(&key, &hex_literal::hex!("01 01")).unwrap();

        let guard = model.lock(Timeout::Immediate).unwrap();
        let mut node = guard.borrow_mut();
        let ep = node.endpoint(0).unwrap();
        model.load_persistent_attributes(&mut node, ep);
        let attribute = node.find_attribute(&path).unwrap();
        assert_eq!(node.get_val(attribute), Ok(AttrValue::Boolean(true)));

        // stale record, e.g. the attribute was a u8 in a previous firmware
        store.set(&key, &hex_literal::hex!("06 01")).unwrap();
        model.load_persistent_attributes(&mut node, ep);
        assert_eq!(store.get(&key).unwrap(), vec![0x01, 0x01]);
    }

    #[test]
    fn test_load_skips_unreadable_attribute() {
        let (model, store) = model(&DeviceConfig::default());
        let guard = model.lock(Timeout::Immediate).unwrap();
        let mut node = guard.borrow_mut();
        let ep = node.endpoint(0).unwrap();
        let cl = node.cluster(ep, 0x0006).unwrap();
        let sensor = node
            .create_attribute(cl, 0x4002, AttributeFlags::NONVOLATILE, AttrValue::Uint16(0))
            .unwrap();
        node.set_override_callback(
            sensor,
            override_fn(|access, _path, _val| match access {
                OverrideAccess::Read => Err(Error::InvalidValue),
                OverrideAccess::Write => Ok(()),
            }),
        )
        .unwrap();

        // neither attribute has a record, the unreadable one is skipped
        model.load_persistent_attributes(&mut node, ep);
        let sensor_path = ConcreteAttributePath::new(0, 0x0006, 0x4002);
        assert_eq!(
            store.get(&crate::storage::attribute_key(&sensor_path)),
            Err(StoreError::NotFound)
        );
        let on_off = ConcreteAttributePath::new(0, 0x0006, 0x0000);
        assert_eq!(
            store.get(&crate::storage::attribute_key(&on_off)).unwrap(),
            vec![0x01, 0x00]
        );
    }

    #[test]
    fn test_registration() {
        let (model, _) = model(&DeviceConfig::default());
        assert_eq!(model.registration(), Ok(vec![]));
        {
            let guard = model.lock(Timeout::Immediate).unwrap();
            let mut node = guard.borrow_mut();
            let ep = node.endpoint(0).unwrap();
            node.set_enabled(ep, true);
        }
        let registration = model.registration().unwrap();
        assert_eq!(registration.len(), 1);
        let cluster = &registration[0].clusters[0];
        assert_eq!(cluster.cluster_id, 0x0006);
        assert_eq!(
            cluster.attributes.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![0x0000, 0x4001]
        );
        assert!(cluster.attributes[1].flags.contains(AttributeFlags::MIN_MAX));
    }
}
