use sync_core::VectorClock;
use sync_replication::{Change, Delta, DocumentId};

/// A framed message delivered to the coordinator from one connection.
///
/// Credential validation for `Auth` and authorization for `Subscribe`/`Delta` are external
/// collaborators; the coordinator only consumes the tag and payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncomingMessage {
    Auth {
        token: String,
    },
    Subscribe {
        document_id: DocumentId,
        /// The client's last known vector clock, if it has synced this document before.
        /// Drives the catch-up delta in the `SubscribeAck` response.
        known_clock: Option<VectorClock>,
    },
    Delta {
        document_id: DocumentId,
        changes: Vec<Change>,
        vector_clock: VectorClock,
    },
    Unsubscribe {
        document_id: DocumentId,
    },
    Ping,
    Pong,
}

impl IncomingMessage {
    /// Reconstructs the [[Delta]] carried by a `Delta` message, if this is one.
    pub fn as_delta(&self) -> Option<Delta> {
        match self {
            IncomingMessage::Delta {
                document_id,
                changes,
                ..
            } => Some(Delta {
                document_id: document_id.clone(),
                changes: changes.clone(),
            }),
            _ => None,
        }
    }
}

/// A framed message sent back to one connection.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Acknowledges a `Subscribe`, carrying the catch-up delta computed from the client's
    /// `known_clock` (empty if the client was already current).
    SubscribeAck { snapshot_delta: Delta },
    /// A delta re-broadcast to other subscribers of the same document.
    DeltaEcho { delta: Delta },
    Error { code: String, detail: String },
    Pong,
}

impl OutgoingMessage {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        OutgoingMessage::Error {
            code: "bad_request".to_owned(),
            detail: detail.into(),
        }
    }

    pub fn permission_denied(detail: impl Into<String>) -> Self {
        OutgoingMessage::Error {
            code: "permission_denied".to_owned(),
            detail: detail.into(),
        }
    }
}
