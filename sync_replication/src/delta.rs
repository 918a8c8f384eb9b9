use crate::document::{Document, Path};
use crate::document_id::DocumentId;
use crate::errors::ReplicationResult;
use sync_core::{ReplicaId, Stamp};
use sync_data_types::FieldValue;

/// One field's worth of change, carrying everything needed to fold it into a remote
/// document's register: the value (or tombstone), the stamp that produced it, and who wrote
/// it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Change {
    pub path: Path,
    pub value: FieldValue,
    pub stamp: Stamp,
    pub origin: ReplicaId,
}

/// A set of field changes for one document, exchanged between replicas.
///
/// Changes are stored in insertion order by convention, but [[Delta::apply]] is commutative
/// and idempotent in that order: the final state depends only on which `(path, stamp)`
/// pairs were seen, never on the order or on duplicates (P2, P3).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Delta {
    pub document_id: DocumentId,
    pub changes: Vec<Change>,
}

impl Delta {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            changes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Computes the changes that, applied to `from`, would reproduce `to`'s value-visible
    /// state: every path in `to` whose register `from` either lacks or holds at a strictly
    /// lower stamp.
    ///
    /// Paths present only in `from` are never emitted — LWW is a grow-only value lattice;
    /// a field that should disappear is represented by a tombstone register that shows up in
    /// `to` like any other field.
    pub fn compute(from: &Document, to: &Document) -> Delta {
        let mut changes = Vec::new();
        for (path, to_register) in to.iter() {
            let needs_emit = match from.register(path) {
                None => true,
                Some(from_register) => from_register.stamp < to_register.stamp,
            };
            if needs_emit {
                changes.push(Change {
                    path: path.clone(),
                    value: to_register.value.clone(),
                    stamp: to_register.stamp.clone(),
                    origin: to_register.origin.clone(),
                });
            }
        }
        Delta {
            document_id: to.id().clone(),
            changes,
        }
    }

    /// Computes the catch-up delta for a client whose last known vector clock is
    /// `known_clock`: every field whose stamp's clock coordinate exceeds
    /// `known_clock[stamp.replica]`. Used by the sync coordinator's `snapshot_for` (C6) on
    /// resubscribe (S6).
    pub fn since(doc: &Document, known_clock: &sync_core::VectorClock) -> Delta {
        let mut changes = Vec::new();
        for (path, register) in doc.iter() {
            if register.stamp.clock > known_clock.get(&register.stamp.replica) {
                changes.push(Change {
                    path: path.clone(),
                    value: register.value.clone(),
                    stamp: register.stamp.clone(),
                    origin: register.origin.clone(),
                });
            }
        }
        Delta {
            document_id: doc.id().clone(),
            changes,
        }
    }

    /// Folds every change into `doc`'s field map via [[Document::offer]], then advances
    /// `doc`'s vector clock for each change's originating replica (I1 maintenance) even for
    /// changes whose value didn't end up winning the LWW comparison.
    pub fn apply(&self, doc: &mut Document) -> ReplicationResult<()> {
        for change in &self.changes {
            doc.offer(
                change.path.clone(),
                change.value.clone(),
                change.stamp.clone(),
                change.origin.clone(),
            )?;
            doc.observe(&change.stamp.replica, change.stamp.clock);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_id::DocumentId;
    use sync_core::ReplicaId;
    use sync_data_types::Value;

    fn doc(id: &str, replica: &str) -> Document {
        Document::new(DocumentId::from(id), ReplicaId::from(replica))
    }

    fn val(s: &str) -> Value {
        Value::new(serde_json::Value::String(s.to_owned()))
    }

    #[test]
    fn p6_delta_faithfulness() {
        let mut a = doc("doc1", "A");
        a.set("title".into(), val("x")).unwrap();

        let mut b = doc("doc1", "B");
        b.merge(&a).unwrap();
        b.set("priority".into(), val("high")).unwrap();

        let delta = Delta::compute(&a, &b);
        let mut applied = a.clone();
        delta.apply(&mut applied).unwrap();

        for path in b.paths() {
            assert_eq!(applied.get(path), b.get(path), "path {path} diverged");
        }
    }

    #[test]
    fn p2_idempotent_application() {
        let mut a = doc("doc1", "A");
        a.set("title".into(), val("x")).unwrap();
        let mut b = doc("doc1", "B");
        b.set("title".into(), val("y")).unwrap();

        let delta = Delta::compute(&a, &b);
        let mut once = a.clone();
        delta.apply(&mut once).unwrap();
        let mut twice = once.clone();
        delta.apply(&mut twice).unwrap();

        assert_eq!(once.get(&"title".into()), twice.get(&"title".into()));
        assert_eq!(once.clock(), twice.clock());
    }

    #[test]
    fn p3_commutative_application() {
        let base = doc("doc1", "Z");

        let mut a = base.clone();
        a.set("title".into(), val("x")).unwrap();
        let delta_a = Delta::compute(&base, &a);

        let mut b = base.clone();
        b.set("priority".into(), val("high")).unwrap();
        let delta_b = Delta::compute(&base, &b);

        let mut first_order = base.clone();
        delta_b.apply(&mut first_order).unwrap();
        delta_a.apply(&mut first_order).unwrap();

        let mut second_order = base.clone();
        delta_a.apply(&mut second_order).unwrap();
        delta_b.apply(&mut second_order).unwrap();

        assert_eq!(
            first_order.get(&"title".into()),
            second_order.get(&"title".into())
        );
        assert_eq!(
            first_order.get(&"priority".into()),
            second_order.get(&"priority".into())
        );
    }

    #[test]
    fn s6_catch_up_transmits_only_what_changed_since_known_clock() {
        let mut a = doc("doc1", "A");
        a.set("x".into(), val("1")).unwrap();
        a.set("y".into(), val("2")).unwrap();
        a.set("z".into(), val("3")).unwrap();

        let mut b = doc("doc1", "B");
        b.merge(&a).unwrap();

        // Client C disconnects holding clock {A: 3, B: 0} (fully caught up at this point).
        let known_clock = a.clock().clone();

        // A and B each make further writes.
        a.set("x".into(), val("1-updated")).unwrap();
        let mut merged = a.clone();
        merged.merge(&b).unwrap();
        b.set("w".into(), val("new-from-b")).unwrap();
        merged.merge(&b).unwrap();

        let catch_up = Delta::since(&merged, &known_clock);
        let touched_paths: std::collections::BTreeSet<_> = catch_up
            .changes
            .iter()
            .map(|c| c.path.to_string())
            .collect();

        assert_eq!(
            touched_paths,
            ["x", "w"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn unchanged_paths_are_not_emitted() {
        let mut a = doc("doc1", "A");
        a.set("title".into(), val("x")).unwrap();
        let b = a.clone();

        let delta = Delta::compute(&a, &b);
        assert!(delta.is_empty());
    }
}
