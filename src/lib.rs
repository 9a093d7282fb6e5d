//! Postbox library — message CRUD API over DynamoDB and S3.
//!
//! This crate provides the components for running a small HTTP service that
//! persists a single "message" resource redundantly in a key-value store
//! (the source of truth) and an object store (a derived blob mirror).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod kv;
pub mod metrics;
pub mod objects;
pub mod server;

use crate::config::Config;
use crate::kv::store::KeyValueStore;
use crate::objects::store::ObjectStore;

/// Shared application state passed to all handlers via `axum::extract::State`.
///
/// Store clients are constructed once at startup and injected here; there is
/// no module-level mutable state.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Key-value record store (DynamoDB or in-memory).
    pub kv: Arc<dyn KeyValueStore>,
    /// Object blob store (S3 or in-memory).
    pub objects: Arc<dyn ObjectStore>,
    /// Set once both stores have been provisioned successfully.
    ready: AtomicBool,
}

impl AppState {
    /// Build application state around the given store handles.
    /// Starts not-ready; call [`AppState::set_ready`] after provisioning.
    pub fn new(config: Config, kv: Arc<dyn KeyValueStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            config,
            kv,
            objects,
            ready: AtomicBool::new(false),
        }
    }

    /// Flag the instance as (un)ready to serve traffic.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Whether provisioning completed; reported by `GET /readyz`.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
