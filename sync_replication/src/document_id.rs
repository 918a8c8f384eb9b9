use sync_utils::IString;
use std::fmt;

/// Opaque identifier for one document, stable for the document's entire lifetime.
///
/// There is no global delete: a document exists for as long as any replica retains a
/// reference to its id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct DocumentId(IString);

impl DocumentId {
    pub fn new_random() -> Self {
        Self::from(uuid::Uuid::new_v4().to_string())
    }
}

impl<S> From<S> for DocumentId
where
    S: Into<IString>,
{
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
