//! Device-side data model for a Matter node.
//!
//! Firmware declares a tree of endpoints, clusters, attributes and commands on
//! the single [`Node`](data_model::node::Node) of the process, then hands the
//! tree to a protocol stack through [`Device::start`](data_model::device::Device::start).
//! After that, every mutation from application code goes through the
//! [`ExecutionLock`](lock::ExecutionLock).

#[macro_use]
extern crate num_derive;

/// Cluster definitions and cluster level operations
pub mod cluster;
pub mod config;
pub mod constants;
pub mod data_model;
pub mod error;
pub mod interaction_model;
pub mod lock;
pub mod storage;
pub mod tlv;
pub mod util;

pub use error::{Error, Result};
