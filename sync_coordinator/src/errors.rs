use snafu::prelude::*;
use sync_replication::ReplicationError;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// §7 error taxonomy for the coordinator. `UnknownPath` does not appear here: it is not an
/// error at this layer, [[sync_replication::Document::get]] simply returns `None`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CoordinatorError {
    /// Two writes to the same field carried the same stamp but different values. Fatal for
    /// the affected document: it is removed from `documents` and further mutation is
    /// refused until an operator intervenes.
    #[snafu(display("document {document_id} hit an invariant violation and was poisoned: {source}"))]
    InvariantViolation {
        document_id: String,
        source: ReplicationError,
    },

    /// The persistence adapter is down. The coordinator keeps serving from memory; this is
    /// logged as a warning by the caller, not treated as fatal.
    #[snafu(display("persistence adapter unavailable: {source}"))]
    PersistenceUnavailable {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The fan-out adapter could not be subscribed to (§4.6 cross-server coordination).
    /// Local state and local subscribers are unaffected; only cross-server propagation is
    /// degraded until this is retried by the caller.
    #[snafu(display("fan-out adapter unavailable: {source}"))]
    FanOutUnavailable {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Sending to a subscriber's outbound channel failed (channel closed or over capacity).
    /// The subscriber is dropped; there is no retry at this layer.
    #[snafu(display("could not deliver to subscriber {connection_id}"))]
    TransportSendFailure { connection_id: String },

    /// The inbound message did not parse or referenced state that does not exist (e.g. a
    /// `Delta` for an unknown document when the sender was never subscribed).
    #[snafu(display("malformed incoming message: {detail}"))]
    MalformedIncomingMessage { detail: String },

    /// The connection attempted an operation its authorization does not permit.
    #[snafu(display("permission denied for connection {connection_id}: {detail}"))]
    PermissionDenied {
        connection_id: String,
        detail: String,
    },

    /// A background service task (e.g. the persistence retry loop) panicked.
    #[snafu(display("service '{label}' task panicked: {source}"))]
    ServiceJoin {
        label: String,
        source: tokio::task::JoinError,
    },
}

impl CoordinatorError {
    /// The `{ code, detail }` pair this error should be reported to the offending client as,
    /// per §7's propagation policy. `None` for faults that aren't reported back to a single
    /// connection (e.g. persistence issues, which are handled at the adapter boundary).
    pub fn as_response_code(&self) -> Option<(&'static str, String)> {
        match self {
            CoordinatorError::MalformedIncomingMessage { detail } => {
                Some(("bad_request", detail.clone()))
            }
            CoordinatorError::PermissionDenied { detail, .. } => {
                Some(("permission_denied", detail.clone()))
            }
            CoordinatorError::InvariantViolation { document_id, .. } => Some((
                "invariant_violation",
                format!("document {document_id} is poisoned"),
            )),
            CoordinatorError::PersistenceUnavailable { .. }
            | CoordinatorError::FanOutUnavailable { .. }
            | CoordinatorError::TransportSendFailure { .. }
            | CoordinatorError::ServiceJoin { .. } => None,
        }
    }
}
