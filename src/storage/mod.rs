//! Comparison Storage
//!
//! Persistence for surveys, comparison sessions and adjustment histories.
//! The core only ever sees the `ComparisonStore` trait; the backend is picked
//! from configuration at startup.

pub mod persistence;
pub mod sled_store;

pub use persistence::{ComparisonStore, InMemoryStore, PersistenceError};
pub use sled_store::SledStore;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

/// Open the configured backend.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn ComparisonStore>, PersistenceError> {
    let store: Arc<dyn ComparisonStore> = match config.backend {
        StorageBackend::Sled => {
            std::fs::create_dir_all(&config.data_dir)
                .map_err(|e| PersistenceError::Storage(e.to_string()))?;
            Arc::new(SledStore::open(&config.data_dir)?)
        }
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
    };

    tracing::info!(backend = store.backend_name(), "Storage backend ready");
    Ok(store)
}
