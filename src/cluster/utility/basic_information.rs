use crate::{
    cluster::{create_cluster_revision, create_feature_map, ClusterFlags},
    constants::DATA_MODEL_REVISION,
    data_model::{
        attribute::AttributeFlags,
        node::{ClusterHandle, EndpointHandle, Node},
        value::AttrValue,
    },
    Result,
};

pub const CLUSTER_ID: u32 = 0x0028;
pub const CLUSTER_REVISION: u16 = 1;

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Attributes {
    DataModelRevision = 0x0000,
    VendorName,
    VendorID,
    ProductName,
    ProductID,
    NodeLabel,
    Location,
    HardwareVersion,
    HardwareVersionString,
    SoftwareVersion,
    SoftwareVersionString,
    CapabilityMinima = 0x0013,
}

#[derive(Debug, Clone)]
pub struct DeviceInformation<'a> {
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor_name: &'a str,
    pub product_name: &'a str,
    pub hardware_version: u16,
    pub software_version: u32,
    pub hardware_version_str: &'a str,
    pub software_version_str: &'a str,
}

/// Create the Basic Information server cluster, its values come from `info`.
/// `NodeLabel` and `Location` are writable and persisted.
pub fn create(
    node: &mut Node,
    endpoint: EndpointHandle,
    info: &DeviceInformation<'_>,
) -> Result<ClusterHandle> {
    let cluster = node.create_cluster(endpoint, CLUSTER_ID, ClusterFlags::SERVER)?;
    create_cluster_revision(node, cluster, CLUSTER_REVISION)?;
    create_feature_map(node, cluster, 0)?;

    let fixed: [(Attributes, AttrValue); 9] = [
        (Attributes::DataModelRevision, DATA_MODEL_REVISION.into()),
        (Attributes::VendorName, info.vendor_name.into()),
        (Attributes::VendorID, info.vendor_id.into()),
        (Attributes::ProductName, info.product_name.into()),
        (Attributes::ProductID, info.product_id.into()),
        (Attributes::HardwareVersion, info.hardware_version.into()),
        (Attributes::HardwareVersionString, info.hardware_version_str.into()),
        (Attributes::SoftwareVersion, info.software_version.into()),
        (Attributes::SoftwareVersionString, info.software_version_str.into()),
    ];
    for (attribute, val) in fixed {
        node.create_attribute(cluster, attribute as _, AttributeFlags::empty(), val)?;
    }
    for attribute in [Attributes::NodeLabel, Attributes::Location] {
        node.create_attribute(
            cluster,
            attribute as _,
            AttributeFlags::WRITABLE | AttributeFlags::NONVOLATILE,
            "".into(),
        )?;
    }
    // CaseSessionsPerFabric = 3, SubscriptionsPerFabric = 3, kept as an opaque struct
    node.create_attribute(
        cluster,
        Attributes::CapabilityMinima as _,
        AttributeFlags::empty(),
        AttrValue::Array(vec![0x03, 0x03]),
    )?;
    Ok(cluster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Limits, data_model::endpoint::EndpointFlags};

    #[test]
    fn test_create_basic_information() {
        let info = DeviceInformation {
            vendor_id: 0xfff1,
            product_id: 0x8000,
            vendor_name: "Test vendor",
            product_name: "Empty Matter Device",
            hardware_version: 0x0001,
            software_version: 0x1001,
            hardware_version_str: "EXX-64-A1",
            software_version_str: "2023.04.01",
        };
        let mut node = Node::new(Limits::default());
        let ep = node.create_endpoint(EndpointFlags::empty()).unwrap();
        let cl = create(&mut node, ep, &info).unwrap();

        let vendor = node.attribute(cl, Attributes::VendorID as _).unwrap();
        assert_eq!(node.get_val(vendor), Ok(AttrValue::Uint16(0xfff1)));
        let name = node.attribute(cl, Attributes::ProductName as _).unwrap();
        assert_eq!(
            node.get_val(name),
            Ok(AttrValue::CharString("Empty Matter Device".to_owned()))
        );
        let label = node.attribute(cl, Attributes::NodeLabel as _).unwrap();
        assert!(node
            .attribute_flags(label)
            .unwrap()
            .contains(AttributeFlags::WRITABLE));
        assert_eq!(node.attributes(cl).count(), 14);
    }
}
