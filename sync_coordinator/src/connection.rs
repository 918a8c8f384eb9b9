use sync_replication::DocumentId;
use sync_utils::IString;
use std::fmt;

/// Opaque identifier for one transport connection, scoped to this coordinator process.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ConnectionId(IString);

impl ConnectionId {
    pub fn new_random() -> Self {
        Self(IString::from(uuid::Uuid::new_v4().to_string()))
    }
}

impl<S> From<S> for ConnectionId
where
    S: Into<IString>,
{
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-connection lifecycle state (§4.6's state machine table).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Unauthenticated,
    Authenticated,
    Subscribed(DocumentId),
    Closed,
}

/// An event arriving for one connection, driving [[ConnectionState::transition]].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    AuthOk,
    AuthFail,
    Subscribe(DocumentId),
    Unsubscribe,
    Disconnect,
}

/// The outcome of offering an event to a state: either a (possibly unchanged) new state, or
/// a rejection that leaves the old state in place.
///
/// Mirrors the `StateUpdate`/"stay vs. transition" split used elsewhere in this codebase for
/// explicit state machines, without needing an actor runtime underneath it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Moved(ConnectionState),
    Rejected { reason: &'static str },
}

impl ConnectionState {
    /// Applies `event`, returning the resulting transition. Illegal combinations (e.g.
    /// `Subscribe` while `Unauthenticated`) are rejected rather than panicking — the caller
    /// decides whether a rejection is itself fatal to the connection.
    pub fn transition(&self, event: ConnectionEvent) -> Transition {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Unauthenticated, AuthOk) => Transition::Moved(Authenticated),
            (Unauthenticated, AuthFail) => Transition::Moved(Closed),
            (Authenticated, Subscribe(doc)) => Transition::Moved(Subscribed(doc)),
            (Authenticated, Disconnect) => Transition::Moved(Closed),
            (Subscribed(_), Subscribe(doc)) => Transition::Moved(Subscribed(doc)),
            (Subscribed(_), Unsubscribe) => Transition::Moved(Authenticated),
            (Subscribed(_), Disconnect) => Transition::Moved(Closed),
            (Closed, _) => Transition::Rejected {
                reason: "connection is already closed",
            },
            (state, event) => Transition::Rejected {
                reason: reason_for(state, &event),
            },
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }

    pub fn subscribed_document(&self) -> Option<&DocumentId> {
        match self {
            ConnectionState::Subscribed(doc) => Some(doc),
            _ => None,
        }
    }
}

fn reason_for(_state: &ConnectionState, _event: &ConnectionEvent) -> &'static str {
    "event is not valid in the connection's current state"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_ok_moves_to_authenticated() {
        let state = ConnectionState::Unauthenticated;
        assert_eq!(
            state.transition(ConnectionEvent::AuthOk),
            Transition::Moved(ConnectionState::Authenticated)
        );
    }

    #[test]
    fn auth_fail_closes() {
        let state = ConnectionState::Unauthenticated;
        assert_eq!(
            state.transition(ConnectionEvent::AuthFail),
            Transition::Moved(ConnectionState::Closed)
        );
    }

    #[test]
    fn subscribe_before_auth_is_rejected() {
        let state = ConnectionState::Unauthenticated;
        let doc = DocumentId::from("doc1");
        assert!(matches!(
            state.transition(ConnectionEvent::Subscribe(doc)),
            Transition::Rejected { .. }
        ));
    }

    #[test]
    fn closed_is_terminal() {
        let state = ConnectionState::Closed;
        assert!(matches!(
            state.transition(ConnectionEvent::AuthOk),
            Transition::Rejected { .. }
        ));
    }

    #[test]
    fn resubscribe_switches_documents() {
        let state = ConnectionState::Subscribed(DocumentId::from("doc1"));
        let next = state.transition(ConnectionEvent::Subscribe(DocumentId::from("doc2")));
        assert_eq!(
            next,
            Transition::Moved(ConnectionState::Subscribed(DocumentId::from("doc2")))
        );
    }
}
