pub mod arena;
pub mod attribute;
pub mod command;
pub mod device;
pub mod device_type;
pub mod endpoint;
pub mod handler;
pub mod node;
pub mod value;
