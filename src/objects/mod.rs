//! Object storage for mirrored message blobs.

pub mod memory;
pub mod s3;
pub mod store;
