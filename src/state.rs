//! Shared application state for the picker routes.

use crate::config::Registry;
use crate::store::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    /// Read-only after startup.
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, registry: Registry) -> Self {
        AppState {
            store,
            registry: Arc::new(registry),
        }
    }
}
