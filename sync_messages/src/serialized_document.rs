use std::collections::BTreeMap;
use sync_core::{ReplicaId, VectorClock};
use sync_data_types::Register;
use sync_replication::{Document, DocumentId, Path};

/// The persistence-contract shape of a document: opaque but stable. Storage adapters
/// round-trip this losslessly; they never need to know about [[Document]]'s local-replica
/// bookkeeping.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SerializedDocument {
    pub id: DocumentId,
    pub fields: BTreeMap<Path, Register>,
    pub clock: VectorClock,
}

impl From<&Document> for SerializedDocument {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id().clone(),
            fields: doc
                .iter()
                .map(|(path, register)| (path.clone(), register.clone()))
                .collect(),
            clock: doc.clock().clone(),
        }
    }
}

impl SerializedDocument {
    /// Reconstructs a live [[Document]] owned locally by `replica`.
    pub fn into_document(self, replica: ReplicaId) -> Document {
        Document::load(self.id, replica, self.fields, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_data_types::Value;

    #[test]
    fn roundtrips_through_json() {
        let mut doc = Document::new(DocumentId::from("doc1"), ReplicaId::from("a"));
        doc.set(
            "title".into(),
            Value::new(serde_json::Value::String("x".into())),
        )
        .unwrap();

        let serialized = SerializedDocument::from(&doc);
        let json = serde_json::to_string(&serialized).unwrap();
        let decoded: SerializedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, serialized);

        let reloaded = decoded.into_document(ReplicaId::from("a"));
        assert_eq!(reloaded.get(&"title".into()), doc.get(&"title".into()));
        assert_eq!(reloaded.clock(), doc.clock());
    }
}
