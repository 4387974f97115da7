//! Lifecycle of a device with a root endpoint and an On/Off light, driven
//! by a loopback protocol stack.

use std::{
    sync::{mpsc, Arc, OnceLock, Weak},
    thread,
    time::Duration,
};

use matter_node::{
    cluster::{on_off, utility::basic_information::DeviceInformation},
    config::DeviceConfig,
    data_model::{
        command::handler,
        device::Device,
        endpoint::{on_off_light_endpoint, root_endpoint, EndpointFlags},
        handler::{
            ChangeNotifier, DataModel, EndpointRegistration, EventCallback, Handler,
            ProtocolStack, ResponseDisposition,
        },
        node::Node,
        value::AttrValue,
    },
    interaction_model::path::{ConcreteAttributePath, ConcreteCommandPath},
    lock::{LockStatus, Timeout},
    storage::MemoryStore,
    tlv::TlvReader,
    util::state::LifecycleState,
    Error, Result,
};
use num::FromPrimitive;
use parking_lot::Mutex;

#[derive(Default)]
struct LoopbackStack {
    model: Arc<Mutex<Option<Arc<DataModel>>>>,
    enabled: Arc<Mutex<Vec<u16>>>,
}

impl ProtocolStack for LoopbackStack {
    fn register_event_callback(&mut self, _callback: EventCallback) -> Result<()> {
        Ok(())
    }

    fn start(&mut self, model: Arc<DataModel>) -> Result<()> {
        let endpoints = model.registration()?;
        self.enabled
            .lock()
            .extend(endpoints.iter().map(|ep| ep.endpoint_id));
        *self.model.lock() = Some(model);
        Ok(())
    }

    fn endpoint_enabled(&mut self, endpoint: &EndpointRegistration) -> Result<()> {
        self.enabled.lock().push(endpoint.endpoint_id);
        Ok(())
    }

    fn endpoint_disabled(&mut self, endpoint_id: u16) -> Result<()> {
        self.enabled.lock().retain(|id| *id != endpoint_id);
        Ok(())
    }

    fn erase_identity(&mut self) -> Result<()> {
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        *self.model.lock() = None;
        Ok(())
    }
}

fn info() -> DeviceInformation<'static> {
    DeviceInformation {
        vendor_id: 0xfff1,
        product_id: 0x8001,
        vendor_name: "Test vendor",
        product_name: "Test light",
        hardware_version: 1,
        software_version: 1,
        hardware_version_str: "v1",
        software_version_str: "1.0",
    }
}

const ON_OFF: ConcreteAttributePath =
    ConcreteAttributePath::new(1, on_off::CLUSTER_ID, on_off::Attributes::OnOff as u32);

/// Every endpoint, cluster and attribute with its value, in enumeration order
fn snapshot(node: &mut Node) -> Vec<(u16, u32, u32, AttrValue)> {
    let mut entries = vec![];
    let endpoints: Vec<_> = node.endpoints().collect();
    for ep in endpoints {
        let clusters: Vec<_> = node.clusters(ep).collect();
        for cl in clusters {
            let attributes: Vec<_> = node.attributes(cl).collect();
            for attr in attributes {
                let path = node.attribute_path(attr).unwrap();
                let val = node.get_val(attr).unwrap();
                entries.push((path.endpoint_id, path.cluster_id, path.attribute_id, val));
            }
        }
    }
    entries
}

#[test]
fn toggle_through_the_stack() {
    let model_slot: Arc<OnceLock<Weak<DataModel>>> = Arc::new(OnceLock::new());
    let slot = model_slot.clone();
    // the command handler runs with the lock held by the stack, the update
    // inside it is a reentrant acquire
    let toggle = handler(move |path, _payload| {
        let model = slot.get().and_then(Weak::upgrade).ok_or(Error::CommandFailed)?;
        let on = model.handle_read(&ON_OFF)?.as_bool().unwrap_or(false);
        let on = match on_off::Commands::from_u32(path.command_id) {
            Some(on_off::Commands::Off) => false,
            Some(on_off::Commands::On) => true,
            _ => !on,
        };
        model.update(path.endpoint_id, path.cluster_id, ON_OFF.attribute_id, on.into())
    });

    let store = Arc::new(MemoryStore::new());
    let stack = LoopbackStack::default();
    let enabled = stack.enabled.clone();
    let mut device = Device::new(DeviceConfig::default(), store.clone(), Box::new(stack));
    let node = device.node_mut().unwrap();
    root_endpoint::create(node, &info()).unwrap();
    on_off_light_endpoint::create(
        node,
        EndpointFlags::DESTROYABLE,
        &on_off::Config::default(),
        Some(toggle),
    )
    .unwrap();

    assert!(matches!(
        device.model().update(1, 6, 0, true.into()),
        Err(Error::InvalidState(LifecycleState::Building))
    ));
    device.start(None).unwrap();
    model_slot.set(Arc::downgrade(&device.model())).unwrap();
    assert_eq!(*enabled.lock(), vec![0, 1]);

    let model = device.model();
    let toggle_path =
        ConcreteCommandPath::new(1, on_off::CLUSTER_ID, on_off::Commands::Toggle as u32);
    {
        // the stack holds the lock while it dispatches
        let guard = model.lock(Timeout::Immediate).unwrap();
        assert_eq!(guard.status(), LockStatus::Success);
        let mut payload = TlvReader::new(&[0x15, 0x18]);
        assert_eq!(
            model.handle_invoke(&toggle_path, &mut payload),
            Ok(ResponseDisposition::Default)
        );
    }
    assert_eq!(model.handle_read(&ON_OFF), Ok(AttrValue::Boolean(true)));
    assert_eq!(model.consume_change(), Some(ON_OFF));

    let mut raw = [0u8; 1];
    assert_eq!(model.get_val_raw(1, 6, 0, &mut raw), Ok(1));
    assert_eq!(raw, [1]);

    // OnOff is persistent
    let record = matter_node::storage::NvStore::get(
        store.as_ref(),
        &matter_node::storage::attribute_key(&ON_OFF),
    )
    .unwrap();
    assert_eq!(record, vec![0x01, 0x01]);

    let light = device.lock(Timeout::Immediate).unwrap().borrow().endpoint(1).unwrap();
    device.destroy_endpoint(light).unwrap();
    assert_eq!(*enabled.lock(), vec![0]);
    assert_eq!(model.handle_read(&ON_OFF), Err(Error::NotFound));
}

#[test]
fn failed_acquire_leaves_graph_untouched() {
    let config = DeviceConfig {
        lock_timeout: Timeout::After(Duration::from_millis(20)),
        ..DeviceConfig::default()
    };
    let mut device = Device::new(
        config,
        Arc::new(MemoryStore::new()),
        Box::new(LoopbackStack::default()),
    );
    let node = device.node_mut().unwrap();
    root_endpoint::create(node, &info()).unwrap();
    on_off_light_endpoint::create(node, EndpointFlags::empty(), &on_off::Config::default(), None)
        .unwrap();
    device.start(None).unwrap();

    let before = snapshot(&mut device.lock(Timeout::Forever).unwrap().borrow_mut());

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let model = device.model();
    let holder = thread::spawn(move || {
        let _guard = model.lock(Timeout::Forever).unwrap();
        locked_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });
    locked_rx.recv().unwrap();

    assert!(matches!(
        device.lock(Timeout::After(Duration::from_millis(20))),
        Err(Error::LockTimeout)
    ));
    // updates use the configured timeout
    assert_eq!(
        device.model().update(1, 6, 0, true.into()),
        Err(Error::LockTimeout)
    );

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    let after = snapshot(&mut device.lock(Timeout::Forever).unwrap().borrow_mut());
    assert_eq!(before, after);
}

fn boot(store: Arc<MemoryStore>) -> Device {
    let mut device = Device::new(
        DeviceConfig::default(),
        store,
        Box::new(LoopbackStack::default()),
    );
    let node = device.node_mut().unwrap();
    root_endpoint::create(node, &info()).unwrap();
    on_off_light_endpoint::create(
        node,
        EndpointFlags::DESTROYABLE,
        &on_off::Config::default(),
        None,
    )
    .unwrap();
    device.start(None).unwrap();
    device
}

#[test]
fn static_endpoints_keep_their_ids_across_reboots() {
    let store = Arc::new(MemoryStore::new());
    let device = boot(store.clone());
    assert!(device.lock(Timeout::Immediate).unwrap().borrow().endpoint(1).is_some());
    device.model().update(1, 6, 0, true.into()).unwrap();
    drop(device);

    for _ in 0..3 {
        let device = boot(store.clone());
        {
            let guard = device.lock(Timeout::Immediate).unwrap();
            let node = guard.borrow();
            let ids: Vec<_> = node.endpoints().filter_map(|ep| node.endpoint_id(ep)).collect();
            assert_eq!(ids, vec![0, 1]);
        }
        assert_eq!(device.model().handle_read(&ON_OFF), Ok(AttrValue::Boolean(true)));
    }
}

#[test]
fn factory_reset_is_terminal() {
    let store = Arc::new(MemoryStore::new());
    let mut device = Device::new(
        DeviceConfig::default(),
        store.clone(),
        Box::new(LoopbackStack::default()),
    );
    root_endpoint::create(device.node_mut().unwrap(), &info()).unwrap();
    device.start(None).unwrap();
    assert!(!store.is_empty());

    device.factory_reset().unwrap();
    assert!(store.is_empty());
    assert_eq!(device.state(), LifecycleState::FactoryReset);
    assert!(matches!(device.start(None), Err(Error::InvalidState(_))));
    assert!(matches!(device.node_mut(), Err(Error::InvalidState(_))));
}
