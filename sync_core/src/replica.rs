use sync_utils::IString;
use std::fmt;

/// Opaque, non-empty, installation-unique identifier for one replica.
///
/// Ordered lexicographically, which is what [[crate::stamp::Stamp]] uses to break ties
/// between writes made at the same logical clock value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ReplicaId(IString);

impl ReplicaId {
    /// Mints a fresh replica id from a random UUID, formatted as a hyphenated string.
    ///
    /// This is a convenience for hosts that have no natural identifier of their own; any
    /// non-empty string works equally well as long as it stays stable for the replica's
    /// lifetime.
    pub fn new_random() -> Self {
        Self::from(uuid::Uuid::new_v4().to_string())
    }
}

impl<S> From<S> for ReplicaId
where
    S: Into<IString>,
{
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for ReplicaId {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_lexicographically() {
        let a = ReplicaId::from("alice");
        let b = ReplicaId::from("bob");
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn random_ids_are_distinct() {
        let a = ReplicaId::new_random();
        let b = ReplicaId::new_random();
        assert_ne!(a, b);
    }

    #[test]
    fn json_roundtrip() {
        let id = ReplicaId::from("replica-7");
        let encoded = serde_json::to_string(&id).unwrap();
        let decoded: ReplicaId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, id);
    }
}
