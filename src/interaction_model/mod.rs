//! Interaction model types shared with the protocol stack

pub mod path;
