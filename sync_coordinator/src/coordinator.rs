use crate::authz::Authorizer;
use crate::config::CoordinatorConfig;
use crate::connection::{ConnectionEvent, ConnectionId, ConnectionState, Transition};
use crate::errors::{self, CoordinatorError, Result};
use crate::fanout::{FanOutAdapter, document_channel};
use crate::persistence::PersistenceAdapter;
use crate::persistence_retry::PendingWrites;
use snafu::ResultExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use sync_core::{ReplicaId, VectorClock};
use sync_messages::{IncomingMessage, OutgoingMessage, SerializedDocument};
use sync_replication::{Delta, Document, DocumentId};
use tokio::sync::mpsc;

/// The wire shape published to a document's fan-out channel (§4.6): the delta plus the
/// publishing server's vector clock, so a peer server can maintain I1 for stamps the delta
/// itself doesn't carry (e.g. a replica that ticked without this round's changes touching
/// every field it knows about).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct FanOutEnvelope {
    delta: Delta,
    vector_clock: VectorClock,
}

/// The document registry and subscriber sets for one coordinator process (C6).
///
/// `documents` and `subscribers` are each guarded by their own coarse-grained mutex; per §5
/// no lock is ever held across an `.await` — document mutation happens entirely inside the
/// synchronous section, and persistence/fan-out/broadcast happen after the guard is dropped.
pub struct SyncCoordinator<P, F, A> {
    replica: ReplicaId,
    config: CoordinatorConfig,
    persistence: Arc<P>,
    fanout: Arc<F>,
    authorizer: Arc<A>,
    documents: Mutex<HashMap<DocumentId, Document>>,
    subscribers: Mutex<HashMap<DocumentId, HashMap<ConnectionId, mpsc::Sender<OutgoingMessage>>>>,
    pending_writes: PendingWrites,
}

impl<P, F, A> SyncCoordinator<P, F, A>
where
    P: PersistenceAdapter,
    F: FanOutAdapter,
    A: Authorizer,
{
    pub fn new(
        replica: ReplicaId,
        config: CoordinatorConfig,
        persistence: Arc<P>,
        fanout: Arc<F>,
        authorizer: Arc<A>,
    ) -> Self {
        Self {
            replica,
            config,
            persistence,
            fanout,
            authorizer,
            documents: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            pending_writes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The shared map of snapshots that failed to persist, for wiring a
    /// [[crate::persistence_retry::PersistenceRetryService]] alongside this coordinator.
    pub fn pending_writes(&self) -> PendingWrites {
        self.pending_writes.clone()
    }

    /// Tunables for this coordinator, e.g. the queue capacity a host should give each
    /// subscriber's outbound channel before calling [[SyncCoordinator::subscribe]].
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    async fn get_or_create_document(&self, document_id: &DocumentId) -> Result<Document> {
        self.ensure_loaded(document_id).await?;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(document_id)
            .expect("just ensured loaded")
            .clone())
    }

    /// Loads `document_id` into `self.documents` from persistence if it isn't already
    /// cached. A no-op (no suspension) once the document is present, so callers that need a
    /// lock-held mutate-in-place section can call this first and then take the lock
    /// synchronously without ever awaiting while holding it.
    async fn ensure_loaded(&self, document_id: &DocumentId) -> Result<()> {
        if self.documents.lock().unwrap().contains_key(document_id) {
            return Ok(());
        }
        let loaded = self
            .persistence
            .get(document_id)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            .context(errors::PersistenceUnavailableSnafu)?;
        let fresh = match loaded {
            Some(serialized) => serialized.into_document(self.replica.clone()),
            None => Document::new(document_id.clone(), self.replica.clone()),
        };
        self.documents
            .lock()
            .unwrap()
            .entry(document_id.clone())
            .or_insert(fresh);
        Ok(())
    }

    /// Applies `delta` to the cached document for `document_id` and folds in `sender_clock`,
    /// all under a single acquisition of `self.documents`'s lock (§5: no operation on a
    /// document may proceed in parallel with another on the same document). Must be called
    /// after [[SyncCoordinator::ensure_loaded]] has populated the cache; this step itself
    /// never suspends, so the lock is never held across an `.await`.
    fn apply_delta_locked(
        &self,
        document_id: &DocumentId,
        delta: &Delta,
        sender_clock: &VectorClock,
    ) -> Result<Document> {
        let mut documents = self.documents.lock().unwrap();
        let doc = documents
            .get_mut(document_id)
            .expect("ensure_loaded populated this entry");
        if let Err(source) = delta.apply(doc) {
            documents.remove(document_id);
            log::error!(
                "document {document_id} hit an invariant violation and was poisoned: {source}"
            );
            return Err(CoordinatorError::InvariantViolation {
                document_id: document_id.to_string(),
                source,
            });
        }
        for (replica, clock) in sender_clock.iter() {
            doc.observe(replica, *clock);
        }
        Ok(doc.clone())
    }

    /// Persists `doc`'s snapshot, queuing it for retry on failure (§7
    /// `PersistenceUnavailable`) rather than propagating the error — the coordinator keeps
    /// serving the document from memory either way.
    async fn persist_and_queue_on_failure(&self, document_id: &DocumentId, doc: &Document) {
        let snapshot = SerializedDocument::from(doc);
        if let Err(e) = self.persistence.put(document_id, snapshot.clone()).await {
            log::warn!(
                "persistence unavailable while storing document {document_id}: {e}; \
                 continuing from memory and queuing for retry"
            );
            self.pending_writes
                .lock()
                .unwrap()
                .insert(document_id.clone(), snapshot);
        } else {
            self.pending_writes.lock().unwrap().remove(document_id);
        }
    }

    /// Adds `conn_id` to `document_id`'s subscriber set and returns the catch-up delta for
    /// `known_clock` (empty clock if the subscriber has never synced this document before).
    pub async fn subscribe(
        &self,
        document_id: DocumentId,
        conn_id: ConnectionId,
        known_clock: Option<VectorClock>,
        sender: mpsc::Sender<OutgoingMessage>,
    ) -> Result<OutgoingMessage> {
        let doc = self.get_or_create_document(&document_id).await?;
        let baseline = known_clock.unwrap_or_default();
        let snapshot_delta = Delta::since(&doc, &baseline);

        self.subscribers
            .lock()
            .unwrap()
            .entry(document_id)
            .or_default()
            .insert(conn_id, sender);

        Ok(OutgoingMessage::SubscribeAck { snapshot_delta })
    }

    pub fn unsubscribe(&self, document_id: &DocumentId, conn_id: &ConnectionId) {
        if let Some(conns) = self.subscribers.lock().unwrap().get_mut(document_id) {
            conns.remove(conn_id);
        }
    }

    /// Drops `conn_id` from every document's subscriber set, regardless of which one (or
    /// ones, across reconnects) it was registered under.
    pub fn unsubscribe_all(&self, conn_id: &ConnectionId) {
        for conns in self.subscribers.lock().unwrap().values_mut() {
            conns.remove(conn_id);
        }
    }

    /// Produces the catch-up delta for a reconnecting client, without touching subscriber
    /// state. A thin wrapper over [[Delta::since]] plus lazy document load.
    pub async fn snapshot_for(
        &self,
        document_id: &DocumentId,
        known_clock: &VectorClock,
    ) -> Result<Delta> {
        let doc = self.get_or_create_document(document_id).await?;
        Ok(Delta::since(&doc, known_clock))
    }

    /// Applies an incoming delta, persists the result, and broadcasts it to every other
    /// local subscriber of the document plus the cross-server fan-out channel.
    ///
    /// `sender_clock` is the full vector clock the sender reports holding after producing
    /// this delta; folding it in (beyond what the changes' own stamps imply) keeps I1
    /// current even for replicas that ticked without writing a field this round.
    ///
    /// The document is loaded via [[SyncCoordinator::ensure_loaded]] (which may suspend on
    /// persistence I/O) and then mutated via [[SyncCoordinator::apply_delta_locked]] (which
    /// never suspends) under a single lock acquisition, so two concurrent deltas for the
    /// same document can never clobber one another's write-back (§5).
    pub async fn handle_incoming_delta(
        &self,
        delta: Delta,
        sender_clock: &VectorClock,
        from_conn: &ConnectionId,
    ) -> Result<()> {
        let document_id = delta.document_id.clone();
        self.ensure_loaded(&document_id).await?;
        let doc = self.apply_delta_locked(&document_id, &delta, sender_clock)?;

        self.persist_and_queue_on_failure(&document_id, &doc).await;
        self.broadcast_locally(&document_id, Some(from_conn), &delta)
            .await;

        let envelope = FanOutEnvelope {
            delta,
            vector_clock: doc.clock().clone(),
        };
        if let Err(e) = self
            .fanout
            .publish(
                &document_channel(&document_id),
                serde_json::to_vec(&envelope).unwrap_or_default(),
            )
            .await
        {
            log::warn!("fan-out publish failed for document {document_id}: {e}");
        }

        Ok(())
    }

    /// Applies a delta received from another coordinator process over the fan-out channel
    /// (§4.6 cross-server coordination). Re-applied and rebroadcast to this server's own
    /// local subscribers exactly like a locally-received delta, except it is never
    /// republished to fan-out — doing so would bounce the same delta between servers
    /// forever.
    pub async fn apply_remote_delta(&self, delta: Delta, vector_clock: &VectorClock) -> Result<()> {
        let document_id = delta.document_id.clone();
        self.ensure_loaded(&document_id).await?;
        let doc = self.apply_delta_locked(&document_id, &delta, vector_clock)?;

        self.persist_and_queue_on_failure(&document_id, &doc).await;
        self.broadcast_locally(&document_id, None, &delta).await;

        Ok(())
    }

    /// Subscribes to `document_id`'s fan-out channel and spawns a task that applies every
    /// remote delta published there via [[SyncCoordinator::apply_remote_delta]] for as long
    /// as the returned handle is alive. One listener per document a server wants to keep
    /// converged with its peers; the caller decides which documents that is (typically:
    /// every document with at least one local subscriber).
    pub async fn start_fanout_listener(
        self: Arc<Self>,
        document_id: DocumentId,
    ) -> Result<tokio::task::JoinHandle<()>>
    where
        P: 'static,
        F: 'static,
        A: 'static,
    {
        let channel = document_channel(&document_id);
        let mut rx = self
            .fanout
            .subscribe(&channel)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
            .context(errors::FanOutUnavailableSnafu)?;

        Ok(tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                match serde_json::from_slice::<FanOutEnvelope>(&payload) {
                    Ok(envelope) => {
                        if let Err(e) = self
                            .apply_remote_delta(envelope.delta, &envelope.vector_clock)
                            .await
                        {
                            log::warn!("failed to apply remote delta from {channel}: {e}");
                        }
                    }
                    Err(e) => log::warn!("malformed fan-out payload on {channel}: {e}"),
                }
            }
        }))
    }

    /// Delivers `delta` to every subscriber of `document_id` other than `exclude` (the
    /// connection the delta arrived from, if any — a remote delta applied from fan-out
    /// excludes no one). Best-effort (§5): a subscriber whose outbound queue is full or
    /// closed is dropped.
    async fn broadcast_locally(
        &self,
        document_id: &DocumentId,
        exclude: Option<&ConnectionId>,
        delta: &Delta,
    ) {
        let targets: Vec<(ConnectionId, mpsc::Sender<OutgoingMessage>)> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers
                .get(document_id)
                .map(|conns| {
                    conns
                        .iter()
                        .filter(|(conn_id, _)| exclude != Some(conn_id))
                        .map(|(conn_id, tx)| (conn_id.clone(), tx.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut dropped = Vec::new();
        for (conn_id, tx) in targets {
            let message = OutgoingMessage::DeltaEcho {
                delta: delta.clone(),
            };
            if tx.try_send(message).is_err() {
                dropped.push(conn_id);
            }
        }
        if dropped.is_empty() {
            return;
        }
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(conns) = subscribers.get_mut(document_id) {
            for conn_id in dropped {
                log::warn!(
                    "dropping subscriber {conn_id} on document {document_id}: outbound queue full"
                );
                conns.remove(&conn_id);
            }
        }
    }

    /// Routes one incoming message through the connection state machine, performing
    /// whatever document operation it implies. Returns the resulting [[Transition]] and,
    /// when one is owed, the message to send back to `conn_id`.
    pub async fn dispatch(
        &self,
        conn_id: &ConnectionId,
        state: &ConnectionState,
        message: IncomingMessage,
        sender: &mpsc::Sender<OutgoingMessage>,
    ) -> (Transition, Option<OutgoingMessage>) {
        if state.is_closed() {
            return (
                Transition::Rejected {
                    reason: "connection is already closed",
                },
                None,
            );
        }

        match message {
            IncomingMessage::Ping => (Transition::Moved(state.clone()), Some(OutgoingMessage::Pong)),
            IncomingMessage::Pong => (Transition::Moved(state.clone()), None),

            IncomingMessage::Auth { token } => {
                let event = if self.authorizer.authenticate(&token).await {
                    ConnectionEvent::AuthOk
                } else {
                    ConnectionEvent::AuthFail
                };
                let transition = state.transition(event);
                let reply = match &transition {
                    Transition::Moved(ConnectionState::Closed) => {
                        Some(OutgoingMessage::permission_denied("invalid credentials"))
                    }
                    _ => None,
                };
                (transition, reply)
            }

            IncomingMessage::Subscribe {
                document_id,
                known_clock,
            } => {
                if !self.authorizer.can_access(&document_id).await {
                    return (
                        Transition::Rejected {
                            reason: "not authorized for document",
                        },
                        Some(OutgoingMessage::permission_denied(format!(
                            "not authorized for document {document_id}"
                        ))),
                    );
                }
                match self
                    .subscribe(document_id.clone(), conn_id.clone(), known_clock, sender.clone())
                    .await
                {
                    Ok(ack) => (state.transition(ConnectionEvent::Subscribe(document_id)), Some(ack)),
                    Err(e) => (
                        Transition::Rejected {
                            reason: "subscribe failed",
                        },
                        error_response(&e),
                    ),
                }
            }

            IncomingMessage::Unsubscribe { document_id } => {
                self.unsubscribe(&document_id, conn_id);
                (state.transition(ConnectionEvent::Unsubscribe), None)
            }

            IncomingMessage::Delta {
                document_id,
                changes,
                vector_clock,
            } => {
                if state.subscribed_document() != Some(&document_id) {
                    return (
                        Transition::Rejected {
                            reason: "delta for a document this connection is not subscribed to",
                        },
                        Some(OutgoingMessage::bad_request(format!(
                            "not subscribed to document {document_id}"
                        ))),
                    );
                }
                if !self.authorizer.can_access(&document_id).await {
                    return (
                        Transition::Rejected {
                            reason: "not authorized for document",
                        },
                        Some(OutgoingMessage::permission_denied(format!(
                            "not authorized for document {document_id}"
                        ))),
                    );
                }
                let delta = Delta { document_id, changes };
                match self.handle_incoming_delta(delta, &vector_clock, conn_id).await {
                    Ok(()) => (Transition::Moved(state.clone()), None),
                    Err(e) => (
                        Transition::Rejected {
                            reason: "delta application failed",
                        },
                        error_response(&e),
                    ),
                }
            }
        }
    }
}

fn error_response(error: &CoordinatorError) -> Option<OutgoingMessage> {
    error
        .as_response_code()
        .map(|(code, detail)| OutgoingMessage::Error {
            code: code.to_owned(),
            detail,
        })
}
