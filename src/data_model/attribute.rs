//! Attributes (7.13) and the attribute value database.
//!
//! Every attribute stores a copy of its current [`AttrValue`], whose type is
//! fixed when the attribute is created. [`Node::set_val`] and
//! [`Node::get_val`] work on that copy directly: they are meant for building
//! the graph and for code already holding the execution lock. Once the device
//! has started, values should be changed through
//! [`DataModel::update`](crate::data_model::handler::DataModel::update) so the
//! protocol stack can report the change.

use bitflags::bitflags;
use tracing::{debug, error, warn};

use crate::{
    data_model::{
        node::{next_sibling, AttributeHandle, ClusterHandle, Node},
        value::{AttrValType, AttrValue},
    },
    interaction_model::path::ConcreteAttributePath,
    storage::{attribute_key, NvStore},
    Error, Result,
};

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct AttributeFlags: u16 {
        const WRITABLE = 0b00000001;
        /// The value is kept in non-volatile storage
        const NONVOLATILE = 0b00000010;
        /// Set by [`Node::add_bounds`]
        const MIN_MAX = 0b00000100;
        const MUST_USE_TIMED_WRITE = 0b00001000;
        const NULLABLE = 0b00010000;
        /// Set by [`Node::set_override_callback`]
        const OVERRIDE = 0b00100000;
    }
}

impl AttributeFlags {
    const INTERNAL: Self = Self::MIN_MAX.union(Self::OVERRIDE);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAccess {
    /// Fill in the current value
    Read,
    /// Take the new value
    Write,
}

/// Redirects reads and writes of an attribute away from the database.
///
/// On [`OverrideAccess::Read`], `val` holds the stored value and is replaced
/// by the current one. On [`OverrideAccess::Write`], `val` is the validated
/// new value. The override runs while the graph is borrowed, it must not call
/// back into the data model.
pub trait AttributeOverride: Send {
    fn access(
        &mut self,
        access: OverrideAccess,
        path: &ConcreteAttributePath,
        val: &mut AttrValue,
    ) -> Result<()>;
}

impl<F> AttributeOverride for F
where
    F: FnMut(OverrideAccess, &ConcreteAttributePath, &mut AttrValue) -> Result<()> + Send,
{
    fn access(
        &mut self,
        access: OverrideAccess,
        path: &ConcreteAttributePath,
        val: &mut AttrValue,
    ) -> Result<()> {
        self(access, path, val)
    }
}

/// Box a closure as an override, helping closure signature inference
pub fn override_fn<F>(f: F) -> Box<dyn AttributeOverride>
where
    F: FnMut(OverrideAccess, &ConcreteAttributePath, &mut AttrValue) -> Result<()> + Send + 'static,
{
    Box::new(f)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub min: AttrValue,
    pub max: AttrValue,
}

impl Bounds {
    fn contains(&self, val: &AttrValue) -> bool {
        matches!(
            (val.compare(&self.min), val.compare(&self.max)),
            (Some(lo), Some(hi)) if lo.is_ge() && hi.is_le()
        )
    }
}

pub struct Attribute {
    pub(crate) id: u32,
    pub(crate) cluster: ClusterHandle,
    pub(crate) path: ConcreteAttributePath,
    pub(crate) flags: AttributeFlags,
    pub(crate) val_type: AttrValType,
    pub(crate) val: AttrValue,
    pub(crate) bounds: Option<Bounds>,
    pub(crate) override_callback: Option<Box<dyn AttributeOverride>>,
}

impl Attribute {
    /// Type, nullability, length and bounds checks shared by every write path
    pub(crate) fn validate(&self, val: &AttrValue) -> Result<()> {
        if val.val_type() != self.val_type {
            return Err(Error::TypeMismatch {
                expected: self.val_type,
                actual: val.val_type(),
            });
        }
        if val.is_null() {
            return if self.flags.contains(AttributeFlags::NULLABLE) {
                Ok(())
            } else {
                Err(Error::ConstraintError)
            };
        }
        val.check_len()?;
        match &self.bounds {
            Some(bounds) if !bounds.contains(val) => Err(Error::ConstraintError),
            _ => Ok(()),
        }
    }
}

impl Node {
    /// Create an attribute holding a copy of `val`; the type of `val` becomes
    /// the type of the attribute.
    pub fn create_attribute(
        &mut self,
        cluster: ClusterHandle,
        attribute_id: u32,
        flags: AttributeFlags,
        val: AttrValue,
    ) -> Result<AttributeHandle> {
        let cl = self.clusters.get(cluster).ok_or(Error::NotFound)?;
        let path = ConcreteAttributePath::new(cl.endpoint_id, cl.id, attribute_id);
        if self.attribute(cluster, attribute_id).is_some() {
            return Err(Error::AlreadyExists(attribute_id));
        }
        let attribute = Attribute {
            id: attribute_id,
            cluster,
            path,
            flags: flags - AttributeFlags::INTERNAL,
            val_type: val.val_type(),
            val: AttrValue::Null(val.val_type()),
            bounds: None,
            override_callback: None,
        };
        attribute.validate(&val)?;
        let attribute = Attribute { val, ..attribute };
        let handle = self.attributes.insert(attribute).ok_or(Error::NoMemory)?;
        if let Some(cl) = self.clusters.get_mut(cluster) {
            cl.attributes.push(handle);
        }
        debug!(?path, ?flags, "attribute created");
        Ok(handle)
    }

    pub fn attribute(&self, cluster: ClusterHandle, attribute_id: u32) -> Option<AttributeHandle> {
        self.clusters
            .get(cluster)?
            .attributes
            .iter()
            .copied()
            .find(|h| self.attributes.get(*h).map(|a| a.id) == Some(attribute_id))
    }

    pub fn first_attribute(&self, cluster: ClusterHandle) -> Option<AttributeHandle> {
        self.clusters.get(cluster)?.attributes.first().copied()
    }

    pub fn next_attribute(&self, attribute: AttributeHandle) -> Option<AttributeHandle> {
        let cluster = self.attributes.get(attribute)?.cluster;
        next_sibling(&self.clusters.get(cluster)?.attributes, attribute)
    }

    /// Attributes of a cluster in creation order
    pub fn attributes(&self, cluster: ClusterHandle) -> impl Iterator<Item = AttributeHandle> + '_ {
        self.clusters
            .get(cluster)
            .map(|cl| cl.attributes.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
    }

    /// Look an attribute up by its concrete path
    pub fn find_attribute(&self, path: &ConcreteAttributePath) -> Option<AttributeHandle> {
        let endpoint = self.endpoint(path.endpoint_id)?;
        let cluster = self.cluster(endpoint, path.cluster_id)?;
        self.attribute(cluster, path.attribute_id)
    }

    pub fn attribute_id(&self, attribute: AttributeHandle) -> Option<u32> {
        self.attributes.get(attribute).map(|a| a.id)
    }

    pub fn attribute_path(&self, attribute: AttributeHandle) -> Option<ConcreteAttributePath> {
        self.attributes.get(attribute).map(|a| a.path)
    }

    pub fn attribute_flags(&self, attribute: AttributeHandle) -> Option<AttributeFlags> {
        self.attributes.get(attribute).map(|a| a.flags)
    }

    pub fn attribute_val_type(&self, attribute: AttributeHandle) -> Option<AttrValType> {
        self.attributes.get(attribute).map(|a| a.val_type)
    }

    pub fn attribute_cluster(&self, attribute: AttributeHandle) -> Option<ClusterHandle> {
        self.attributes.get(attribute).map(|a| a.cluster)
    }

    /// Set the value in the database, or hand it to the override.
    ///
    /// The value must have the attribute's type and lie within its bounds;
    /// a rejected value leaves the attribute untouched.
    pub fn set_val(&mut self, attribute: AttributeHandle, val: AttrValue) -> Result<()> {
        let attr = self.attributes.get_mut(attribute).ok_or(Error::NotFound)?;
        if let Err(e) = attr.validate(&val) {
            warn!(path = ?attr.path, ?val, error = %e, "attribute value rejected");
            return Err(e);
        }
        match attr.override_callback.as_mut() {
            Some(callback) => {
                let mut val = val;
                callback.access(OverrideAccess::Write, &attr.path, &mut val)
            }
            None => {
                attr.val = val;
                Ok(())
            }
        }
    }

    /// Get the value from the database, or from the override.
    pub fn get_val(&mut self, attribute: AttributeHandle) -> Result<AttrValue> {
        let attr = self.attributes.get_mut(attribute).ok_or(Error::NotFound)?;
        match attr.override_callback.as_mut() {
            Some(callback) => {
                let mut val = attr.val.clone();
                callback.access(OverrideAccess::Read, &attr.path, &mut val)?;
                if val.val_type() != attr.val_type {
                    return Err(Error::TypeMismatch {
                        expected: attr.val_type,
                        actual: val.val_type(),
                    });
                }
                Ok(val)
            }
            None => Ok(attr.val.clone()),
        }
    }

    /// Copy the little-endian payload of a value into `buf`, returns the
    /// number of bytes written.
    pub fn get_val_raw(&mut self, path: &ConcreteAttributePath, buf: &mut [u8]) -> Result<usize> {
        let attribute = self.find_attribute(path).ok_or(Error::NotFound)?;
        let val = self.get_val(attribute)?;
        let len = val.payload_len();
        if len > buf.len() {
            return Err(Error::BufferTooSmall(len));
        }
        let mut writer = &mut buf[..len];
        val.encode_payload(&mut writer);
        Ok(len)
    }

    /// Restrict a numeric attribute to `[min, max]`.
    ///
    /// Fails for non numeric attributes, for bounds of another type and
    /// when `min > max`.
    pub fn add_bounds(
        &mut self,
        attribute: AttributeHandle,
        min: AttrValue,
        max: AttrValue,
    ) -> Result<()> {
        let attr = self.attributes.get_mut(attribute).ok_or(Error::NotFound)?;
        if !attr.val_type.is_boundable()
            || min.val_type() != attr.val_type
            || max.val_type() != attr.val_type
        {
            return Err(Error::InvalidBounds);
        }
        if !matches!(min.compare(&max), Some(order) if order.is_le()) {
            return Err(Error::InvalidBounds);
        }
        let bounds = Bounds { min, max };
        if !attr.val.is_null() && !bounds.contains(&attr.val) {
            warn!(path = ?attr.path, val = ?attr.val, "current value is outside the new bounds");
        }
        attr.bounds = Some(bounds);
        attr.flags |= AttributeFlags::MIN_MAX;
        Ok(())
    }

    pub fn bounds(&self, attribute: AttributeHandle) -> Option<&Bounds> {
        self.attributes.get(attribute)?.bounds.as_ref()
    }

    /// Once set, reads and writes go to the override instead of the database
    pub fn set_override_callback(
        &mut self,
        attribute: AttributeHandle,
        callback: Box<dyn AttributeOverride>,
    ) -> Result<()> {
        let attr = self.attributes.get_mut(attribute).ok_or(Error::NotFound)?;
        attr.override_callback = Some(callback);
        attr.flags |= AttributeFlags::OVERRIDE;
        Ok(())
    }

    pub fn override_callback(&mut self, attribute: AttributeHandle) -> Option<&mut (dyn AttributeOverride + 'static)> {
        self.attributes
            .get_mut(attribute)?
            .override_callback
            .as_deref_mut()
    }

    /// Persist the current value, keyed by the attribute path
    pub fn store_val_in_nvs(&mut self, attribute: AttributeHandle, store: &dyn NvStore) -> Result<()> {
        let val = self.get_val(attribute)?;
        self.persist_val(attribute, &val, store)
    }

    /// Persist `val` as the record of an attribute, leaving the value in
    /// memory as it is
    pub(crate) fn persist_val(
        &self,
        attribute: AttributeHandle,
        val: &AttrValue,
        store: &dyn NvStore,
    ) -> Result<()> {
        let path = self.attribute_path(attribute).ok_or(Error::NotFound)?;
        let record = val.to_record();
        store
            .set(&attribute_key(&path), &record)
            .inspect_err(|e| error!(?path, error = %e, "failed to persist attribute"))?;
        debug!(?path, record = %hex::encode(&record), "attribute persisted");
        Ok(())
    }

    /// Read the persisted value. A record whose type does not match the
    /// attribute is reported as [`Error::PersistedTypeMismatch`].
    pub fn get_val_from_nvs(&self, attribute: AttributeHandle, store: &dyn NvStore) -> Result<AttrValue> {
        let attr = self.attributes.get(attribute).ok_or(Error::NotFound)?;
        let record = store.get(&attribute_key(&attr.path))?;
        let val = AttrValue::from_record(&record)?;
        if val.val_type() != attr.val_type
            || (val.is_null() && !attr.flags.contains(AttributeFlags::NULLABLE))
        {
            warn!(path = ?attr.path, record = %hex::encode(&record), "stale persisted attribute");
            return Err(Error::PersistedTypeMismatch);
        }
        Ok(val)
    }
}
