//! filetrust-core library exports

pub mod config;
pub mod trust;
