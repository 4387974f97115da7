//! Interface to the non-volatile key-value store.
//!
//! The store itself is provided by the platform. Each persistent attribute is
//! one record, keyed by its endpoint, cluster and attribute IDs. Records are
//! independent of each other, there is no transaction across keys.

use core::fmt::Write;
use std::collections::BTreeMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::{constants::ATTRIBUTE_KEY_LEN, interaction_model::path::ConcreteAttributePath};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
    #[error("store is full")]
    Full,
    #[error("store I/O failed: {0}")]
    Io(&'static str),
}

/// A key-value store backed by flash or similar.
///
/// Implementations are called with the execution lock held, so they are
/// serialised with graph mutation and may block.
pub trait NvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn erase(&self, key: &str) -> Result<(), StoreError>;
    /// Erase every record, used by factory reset
    fn erase_all(&self) -> Result<(), StoreError>;
}

/// Key of the record holding an attribute value, `eeee:cccccccc:aaaaaaaa` in hex
pub type AttributeKey = heapless::String<ATTRIBUTE_KEY_LEN>;

pub fn attribute_key(path: &ConcreteAttributePath) -> AttributeKey {
    let mut key = AttributeKey::new();
    // 22 characters always fit the key
    let _ = write!(
        key,
        "{:04x}:{:08x}:{:08x}",
        path.endpoint_id, path.cluster_id, path.attribute_id
    );
    key
}

/// A volatile store, for hosts and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl NvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.records
            .lock()
            .get(key)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records.lock().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn erase(&self, key: &str) -> Result<(), StoreError> {
        self.records
            .lock()
            .remove(key)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn erase_all(&self) -> Result<(), StoreError> {
        self.records.lock().clear();
        Ok(())
    }
}

impl<S: NvStore + ?Sized> NvStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn erase(&self, key: &str) -> Result<(), StoreError> {
        (**self).erase(key)
    }

    fn erase_all(&self) -> Result<(), StoreError> {
        (**self).erase_all()
    }
}
