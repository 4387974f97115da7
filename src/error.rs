use thiserror::Error;

use crate::{data_model::value::AttrValType, storage::StoreError, util::state::LifecycleState};

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The handle is stale or the identifier does not exist
    #[error("entity not found")]
    NotFound,
    #[error("identifier {0:#x} already exists under this parent")]
    AlreadyExists(u32),
    /// An arena or the endpoint ID space is exhausted
    #[error("out of memory")]
    NoMemory,
    #[error("bounds are not valid for this attribute")]
    InvalidBounds,
    #[error("expected a value of type {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: AttrValType,
        actual: AttrValType,
    },
    /// The value is outside the attribute bounds or its length limit
    #[error("value violates the attribute constraints")]
    ConstraintError,
    #[error("attribute is not writable")]
    UnsupportedWrite,
    #[error("timed out acquiring the execution lock")]
    LockTimeout,
    /// The graph is already borrowed further up the same call chain
    #[error("data model is busy")]
    Busy,
    #[error("persistent storage error: {0}")]
    Storage(#[from] StoreError),
    /// The persisted record does not decode to the declared attribute type
    #[error("persisted record is stale or corrupt")]
    PersistedTypeMismatch,
    #[error("operation not permitted in state {0:?}")]
    InvalidState(LifecycleState),
    #[error("endpoint is not destroyable")]
    NotDestroyable,
    #[error("endpoint has no clusters")]
    EmptyEndpoint,
    #[error("endpoint is already enabled")]
    AlreadyEnabled,
    #[error("buffer too small, {0} bytes needed")]
    BufferTooSmall(usize),
    #[error("invalid value")]
    InvalidValue,
    #[error("command has no callback")]
    NoCallback,
    #[error("command callback failed")]
    CommandFailed,
    #[error("update vetoed by callback")]
    Vetoed,
    #[error("protocol stack error: {0}")]
    Stack(&'static str),
}
