use crate::errors::Result;
use crate::persistence::PersistenceAdapter;
use crate::services::{Service, ServiceHandle, start_service};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_messages::SerializedDocument;
use sync_replication::DocumentId;

/// Snapshots that failed to persist, kept in memory until a retry succeeds (§7
/// `PersistenceUnavailable`). Shared between [[crate::coordinator::SyncCoordinator]], which
/// fills it on a failed `put`, and [[PersistenceRetryService]], which drains it.
pub type PendingWrites = Arc<Mutex<HashMap<DocumentId, SerializedDocument>>>;

pub struct PersistenceRetryOptions<P> {
    pub persistence: Arc<P>,
    pub pending: PendingWrites,
    pub interval: Duration,
}

/// Periodically retries every pending snapshot against the persistence adapter. A document
/// is removed from the pending set as soon as one retry for it succeeds; the document's
/// coordinator-side state is never touched here, only its durable copy.
pub struct PersistenceRetryService<P> {
    persistence: Arc<P>,
    pending: PendingWrites,
    interval: Duration,
}

#[async_trait]
impl<P> Service for PersistenceRetryService<P>
where
    P: PersistenceAdapter + 'static,
{
    type Options = PersistenceRetryOptions<P>;

    async fn run(&mut self) -> Result<()> {
        tokio::time::sleep(self.interval).await;

        let snapshot: Vec<(DocumentId, SerializedDocument)> = {
            let pending = self.pending.lock().unwrap();
            pending.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        if snapshot.is_empty() {
            return Ok(());
        }

        for (document_id, document) in snapshot {
            match self.persistence.put(&document_id, document).await {
                Ok(()) => {
                    self.pending.lock().unwrap().remove(&document_id);
                    log::info!(
                        "persistence recovered for document {document_id}; flushed pending snapshot"
                    );
                }
                Err(e) => {
                    log::warn!("persistence retry for document {document_id} still failing: {e}");
                }
            }
        }
        Ok(())
    }

    async fn shutdown(self) -> Result<()> {
        Ok(())
    }
}

impl<P> PersistenceRetryService<P>
where
    P: PersistenceAdapter + 'static,
{
    pub async fn start(
        persistence: Arc<P>,
        pending: PendingWrites,
        interval: Duration,
    ) -> Result<ServiceHandle> {
        start_service(
            |options: PersistenceRetryOptions<P>| async move {
                Ok(PersistenceRetryService {
                    persistence: options.persistence,
                    pending: options.pending,
                    interval: options.interval,
                })
            },
            PersistenceRetryOptions {
                persistence,
                pending,
                interval,
            },
        )
        .await
    }
}
