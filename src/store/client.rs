use std::sync::Arc;

use async_trait::async_trait;

use super::types::Document;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch every record in `collection`, in whatever order the backing
    /// store returns them. A failed read fails the whole collection; there
    /// is no per-record partial success.
    async fn list_all(&self, collection: &str) -> anyhow::Result<Vec<Document>>;
}

pub type SharedDocumentStore = Arc<dyn DocumentStore>;
