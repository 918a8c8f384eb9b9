use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use sync_core::VectorClock;
use sync_messages::SerializedDocument;
use sync_replication::DocumentId;

/// Abstract load/save of document snapshots and clocks (C7), consumed by
/// [[crate::coordinator::SyncCoordinator]].
///
/// Implementations decide their own durability and retry policy; the coordinator only
/// requires that `put` is an atomic replace and that `vector_clock_merge` takes the
/// per-replica max rather than overwriting.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn get(&self, doc_id: &DocumentId) -> Result<Option<SerializedDocument>, Self::Error>;
    async fn put(&self, doc_id: &DocumentId, document: SerializedDocument) -> Result<(), Self::Error>;
    async fn list(&self) -> Result<Vec<DocumentId>, Self::Error>;
    async fn delete(&self, doc_id: &DocumentId) -> Result<(), Self::Error>;

    /// Separable from a full snapshot read, for callers that only need causal frontier
    /// information (e.g. computing a catch-up delta without loading every field).
    async fn vector_clock_get(&self, doc_id: &DocumentId) -> Result<VectorClock, Self::Error>;

    /// Merges `clock` into whatever is stored for `doc_id`, taking the per-replica max.
    async fn vector_clock_merge(
        &self,
        doc_id: &DocumentId,
        clock: &VectorClock,
    ) -> Result<(), Self::Error>;
}

/// An in-memory reference implementation, useful for tests and for a coordinator that has
/// not yet been wired to real storage. Never fails and never loses data for the lifetime of
/// the process — there's no disk, so there's no `PersistenceUnavailable` to simulate here.
#[derive(Default)]
pub struct InMemoryPersistence {
    documents: Mutex<HashMap<DocumentId, SerializedDocument>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryPersistence {
    type Error = std::convert::Infallible;

    async fn get(&self, doc_id: &DocumentId) -> Result<Option<SerializedDocument>, Self::Error> {
        Ok(self.documents.lock().unwrap().get(doc_id).cloned())
    }

    async fn put(&self, doc_id: &DocumentId, document: SerializedDocument) -> Result<(), Self::Error> {
        self.documents.lock().unwrap().insert(doc_id.clone(), document);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DocumentId>, Self::Error> {
        Ok(self.documents.lock().unwrap().keys().cloned().collect())
    }

    async fn delete(&self, doc_id: &DocumentId) -> Result<(), Self::Error> {
        self.documents.lock().unwrap().remove(doc_id);
        Ok(())
    }

    async fn vector_clock_get(&self, doc_id: &DocumentId) -> Result<VectorClock, Self::Error> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(doc_id)
            .map(|d| d.clock.clone())
            .unwrap_or_default())
    }

    async fn vector_clock_merge(
        &self,
        doc_id: &DocumentId,
        clock: &VectorClock,
    ) -> Result<(), Self::Error> {
        let mut documents = self.documents.lock().unwrap();
        if let Some(doc) = documents.get_mut(doc_id) {
            doc.clock.merge(clock);
        } else {
            log::debug!("vector_clock_merge for unknown document {doc_id}; ignoring");
        }
        Ok(())
    }
}
