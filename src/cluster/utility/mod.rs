//! Utility clusters of the root endpoint

pub mod basic_information;
