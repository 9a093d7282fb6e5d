//! HTTP API handlers.

pub mod message;
