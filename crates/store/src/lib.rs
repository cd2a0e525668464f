//! Persistence and scripture retrieval backends for Selah.
//!
//! Every backend implements both [`SpiritualStore`] and [`VerseIndex`]:
//! - [`InMemoryStore`]: process-local, for tests and `backend = "memory"`
//! - [`SqliteStore`]: one table per entity, FTS5 keyword index, stored embeddings

pub mod in_memory;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use vector::cosine_similarity;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use selah_config::StoreConfig;
use selah_core::error::StoreError;
use selah_core::{SpiritualStore, VerseIndex};
use std::sync::Arc;
use tracing::info;

/// The two collaborators handed to the engine, backed by one store.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn SpiritualStore>,
    pub index: Arc<dyn VerseIndex>,
}

impl Backends {
    /// Share one value as both collaborators.
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: SpiritualStore + VerseIndex + 'static,
    {
        Self {
            store: backend.clone(),
            index: backend,
        }
    }
}

/// Open the backend named by `[store].backend`.
pub async fn open(config: &StoreConfig) -> Result<Backends, StoreError> {
    match config.backend.as_str() {
        "memory" => {
            info!("Using in-memory store");
            Ok(Backends::shared(Arc::new(InMemoryStore::new())))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let store = SqliteStore::new(&config.database_url).await?;
            Ok(Backends::shared(Arc::new(store)))
        }
        other => Err(StoreError::Storage(format!(
            "store backend '{other}' is not available"
        ))),
    }
}
