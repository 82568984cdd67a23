use std::sync::Arc;

use tracing::warn;

pub mod client;
pub mod config;
pub mod firestore;
pub mod mock;
pub mod types;

pub use client::{DocumentStore, SharedDocumentStore};
pub use config::StoreConfig;
pub use firestore::FirestoreClient;
pub use mock::MockDocumentStore;
pub use types::Document;

/// Attempt to build the REST store client, optionally falling back to an
/// empty in-memory store.
pub fn build_store_from_env(default_to_mock: bool) -> anyhow::Result<SharedDocumentStore> {
    match StoreConfig::from_env().and_then(FirestoreClient::new) {
        Ok(client) => Ok(Arc::new(client)),
        Err(err) if default_to_mock => {
            warn!(?err, "Store configuration missing; using in-memory store");
            Ok(Arc::new(MockDocumentStore::default()))
        }
        Err(err) => Err(err),
    }
}
