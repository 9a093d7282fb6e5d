//! Key-value persistence for message records.

pub mod dynamodb;
pub mod memory;
pub mod store;
