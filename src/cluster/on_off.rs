use std::sync::Arc;

use crate::{
    cluster::{create_cluster_revision, create_feature_map, ClusterFlags},
    data_model::{
        attribute::AttributeFlags,
        command::{CommandFlags, CommandHandler},
        node::{ClusterHandle, EndpointHandle, Node},
        value::{AttrValType, AttrValue},
    },
    Result,
};

pub const CLUSTER_ID: u32 = 0x0006;
pub const CLUSTER_REVISION: u16 = 4;
/// Lighting feature, enables the global scene and timed attributes
pub const FEATURE_LIGHTING: u32 = 0x01;

#[repr(u32)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attributes {
    OnOff = 0x0000,
    GlobalSceneControl = 0x4000,
    OnTime = 0x4001,
    OffWaitTime = 0x4002,
    StartUpOnOff = 0x4003,
}

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartUpOnOff {
    Off = 0,
    On = 1,
    Toggle = 2,
}

#[repr(u32)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    Off = 0x00,
    On = 0x01,
    Toggle = 0x02,
    OnWithEffect = 0x40,
    OnWithRecallGlobalScene = 0x41,
    OnWithTimedOff = 0x42,
}

/// Initial values of the server attributes
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub on_off: bool,
    pub lighting: bool,
    /// `None` keeps the previous state across a reboot
    pub start_up_on_off: Option<StartUpOnOff>,
}

/// Create the On/Off server cluster on an endpoint. `Off`, `On` and `Toggle`
/// are routed to `handler`, which decides on the new state and applies it
/// through an update.
pub fn create(
    node: &mut Node,
    endpoint: EndpointHandle,
    config: &Config,
    handler: Option<Arc<dyn CommandHandler>>,
) -> Result<ClusterHandle> {
    let cluster = node.create_cluster(endpoint, CLUSTER_ID, ClusterFlags::SERVER)?;
    create_cluster_revision(node, cluster, CLUSTER_REVISION)?;
    create_feature_map(
        node,
        cluster,
        if config.lighting { FEATURE_LIGHTING } else { 0 },
    )?;

    node.create_attribute(
        cluster,
        Attributes::OnOff as _,
        AttributeFlags::NONVOLATILE,
        config.on_off.into(),
    )?;
    if config.lighting {
        node.create_attribute(
            cluster,
            Attributes::GlobalSceneControl as _,
            AttributeFlags::empty(),
            true.into(),
        )?;
        node.create_attribute(
            cluster,
            Attributes::OnTime as _,
            AttributeFlags::WRITABLE,
            0u16.into(),
        )?;
        node.create_attribute(
            cluster,
            Attributes::OffWaitTime as _,
            AttributeFlags::WRITABLE,
            0u16.into(),
        )?;
        let start_up = node.create_attribute(
            cluster,
            Attributes::StartUpOnOff as _,
            AttributeFlags::WRITABLE | AttributeFlags::NONVOLATILE | AttributeFlags::NULLABLE,
            match config.start_up_on_off {
                Some(v) => AttrValue::Enum8(v as u8),
                None => AttrValue::Null(AttrValType::Enum8),
            },
        )?;
        node.add_bounds(
            start_up,
            AttrValue::Enum8(StartUpOnOff::Off as u8),
            AttrValue::Enum8(StartUpOnOff::Toggle as u8),
        )?;
    }

    for command in [Commands::Off, Commands::On, Commands::Toggle] {
        node.create_command(
            cluster,
            command as _,
            CommandFlags::ACCEPTED,
            handler.clone(),
        )?;
    }
    Ok(cluster)
}

#[cfg(test)]
mod tests {
    use num::FromPrimitive;

    use super::*;
    use crate::{config::Limits, data_model::endpoint::EndpointFlags, Error};

    #[test]
    fn test_create_lighting() {
        let mut node = Node::new(Limits::default());
        let ep = node.create_endpoint(EndpointFlags::empty()).unwrap();
        let cl = create(
            &mut node,
            ep,
            &Config {
                lighting: true,
                ..Config::default()
            },
            None,
        )
        .unwrap();

        let ids: Vec<_> = node
            .attributes(cl)
            .filter_map(|a| node.attribute_id(a))
            .collect();
        assert_eq!(ids, vec![0xFFFD, 0xFFFC, 0x0000, 0x4000, 0x4001, 0x4002, 0x4003]);
        assert_eq!(node.commands(cl).count(), 3);
        assert_eq!(Commands::from_u32(0x02), Some(Commands::Toggle));

        let start_up = node.attribute(cl, Attributes::StartUpOnOff as _).unwrap();
        assert_eq!(node.get_val(start_up), Ok(AttrValue::Null(AttrValType::Enum8)));
        assert_eq!(
            node.set_val(start_up, AttrValue::Enum8(3)),
            Err(Error::ConstraintError)
        );
        node.set_val(start_up, AttrValue::Enum8(StartUpOnOff::Toggle as u8))
            .unwrap();
    }

    #[test]
    fn test_create_plain() {
        let mut node = Node::new(Limits::default());
        let ep = node.create_endpoint(EndpointFlags::empty()).unwrap();
        let cl = create(&mut node, ep, &Config::default(), None).unwrap();
        assert_eq!(node.attributes(cl).count(), 3);
        assert!(node.attribute(cl, Attributes::OnTime as _).is_none());
    }
}
