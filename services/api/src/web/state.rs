//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use folktales_core::ports::{AudioProbeService, DatabaseService, ObjectStorageService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub storage: Arc<dyn ObjectStorageService>,
    pub probe: Arc<dyn AudioProbeService>,
    pub config: Arc<Config>,
}
