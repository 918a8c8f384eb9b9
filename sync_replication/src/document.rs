use crate::document_id::DocumentId;
use crate::errors::{PoisonedSnafu, ReplicationResult};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use sync_core::{ReplicaId, Stamp, VectorClock};
use sync_data_types::{FieldValue, Register, Value};
use sync_utils::IString;

/// A flat, host-opaque key into a document's field map. Hierarchical interpretation (e.g.
/// dotted paths) is entirely the host's concern; this crate treats it as one atomic string.
pub type Path = IString;

/// A replicated document: a map of path to LWW register, plus the vector clock recording
/// what this replica has observed from every other replica.
///
/// A document is created on first local write or first observed delta (via [[Document::new]]
/// or [[Document::load]]); there is no operation that deletes a whole document, only
/// individual fields (via tombstones).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    id: DocumentId,
    replica: ReplicaId,
    fields: BTreeMap<Path, Register>,
    clock: VectorClock,
}

impl Document {
    /// Creates a fresh, empty document owned locally by `replica`.
    pub fn new(id: DocumentId, replica: ReplicaId) -> Self {
        Self {
            id,
            replica,
            fields: BTreeMap::new(),
            clock: VectorClock::new(),
        }
    }

    /// Reconstructs a document from a previously persisted snapshot (C7), under local
    /// ownership by `replica`.
    ///
    /// `replica` need not match whichever replica originally produced the snapshot; it's
    /// simply who will own the stamps produced by future local writes on this instance.
    pub fn load(
        id: DocumentId,
        replica: ReplicaId,
        fields: BTreeMap<Path, Register>,
        clock: VectorClock,
    ) -> Self {
        Self {
            id,
            replica,
            fields,
            clock,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn replica_id(&self) -> &ReplicaId {
        &self.replica
    }

    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// The value at `path`, or `None` if the path was never written or is currently a
    /// tombstone. Use [[Document::register]] to tell those two cases apart.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.fields.get(path).and_then(|r| r.value.value())
    }

    pub fn register(&self, path: &Path) -> Option<&Register> {
        self.fields.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Register)> {
        self.fields.iter()
    }

    /// Writes `value` at `path` under a freshly minted local stamp.
    ///
    /// Every call ticks the clock once, even across multiple fields set in the same host
    /// operation: there is no batch stamp.
    pub fn set(&mut self, path: Path, value: Value) -> ReplicationResult<()> {
        self.write(path, FieldValue::Value(value))
    }

    /// Tombstones `path`. The register is not removed — its stamp still participates in
    /// future LWW comparisons, so a later write (from any replica) can still resurrect it.
    pub fn delete(&mut self, path: Path) -> ReplicationResult<()> {
        self.write(path, FieldValue::Tombstone)
    }

    fn write(&mut self, path: Path, value: FieldValue) -> ReplicationResult<()> {
        let stamp = self
            .clock
            .next_stamp(&self.replica)
            .context(crate::errors::ClockExhaustedSnafu {
                document_id: self.id.to_string(),
            })?;
        let origin = self.replica.clone();
        self.offer(path, value, stamp, origin)
    }

    /// Offers `(value, stamp, origin)` to the register at `path`, applying the LWW rule;
    /// creates the register if this is the first write ever seen for `path`.
    ///
    /// This is the shared primitive behind local writes, [[Document::merge]] and delta
    /// application (C5) — everywhere a `(path, value, stamp, origin)` tuple needs to be
    /// folded into the field map.
    pub fn offer(
        &mut self,
        path: Path,
        value: FieldValue,
        stamp: Stamp,
        origin: ReplicaId,
    ) -> ReplicationResult<()> {
        match self.fields.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(Register::new(value, stamp, origin));
                Ok(())
            }
            Entry::Occupied(mut slot) => slot
                .get_mut()
                .assign(value, stamp, origin)
                .context(PoisonedSnafu {
                    document_id: self.id.to_string(),
                }),
        }
    }

    /// Folds every field of `other` into `self` via [[Document::offer]], then merges the
    /// vector clocks coordinate-wise.
    pub fn merge(&mut self, other: &Document) -> ReplicationResult<()> {
        for (path, register) in other.fields.iter() {
            self.offer(
                path.clone(),
                register.value.clone(),
                register.stamp.clone(),
                register.origin.clone(),
            )?;
        }
        self.clock.merge(&other.clock);
        Ok(())
    }

    /// Records that `replica` has produced writes up to `clock`, without those writes
    /// necessarily being reflected in any local register yet (I1 maintenance for stamps
    /// whose clock coordinate outruns current knowledge).
    pub fn observe(&mut self, replica: &ReplicaId, clock: u64) {
        self.clock.observe(replica, clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, replica: &str) -> Document {
        Document::new(DocumentId::from(id), ReplicaId::from(replica))
    }

    fn val(s: &str) -> Value {
        Value::new(serde_json::Value::String(s.to_owned()))
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut d = doc("doc1", "a");
        d.set(Path::from("title"), val("x")).unwrap();
        assert_eq!(d.get(&Path::from("title")), Some(&val("x")));
    }

    #[test]
    fn unknown_path_reads_as_none() {
        let d = doc("doc1", "a");
        assert_eq!(d.get(&Path::from("missing")), None);
    }

    #[test]
    fn delete_tombstones_without_removing_register() {
        let mut d = doc("doc1", "a");
        d.set(Path::from("due"), val("2025-01-01")).unwrap();
        d.delete(Path::from("due")).unwrap();
        assert_eq!(d.get(&Path::from("due")), None);
        assert!(d.register(&Path::from("due")).unwrap().is_tombstone());
    }

    #[test]
    fn each_set_ticks_the_clock_even_within_one_host_call() {
        let mut d = doc("doc1", "a");
        d.set(Path::from("a"), val("1")).unwrap();
        d.set(Path::from("b"), val("2")).unwrap();
        assert_eq!(d.clock().get(&ReplicaId::from("a")), 2);
    }

    #[test]
    fn s1_basic_lww_tie_break_by_replica() {
        let mut a = doc("doc1", "A");
        let mut b = doc("doc1", "B");
        a.set(Path::from("title"), val("x")).unwrap();
        b.set(Path::from("title"), val("y")).unwrap();

        let mut a2 = a.clone();
        a2.merge(&b).unwrap();
        let mut b2 = b.clone();
        b2.merge(&a).unwrap();

        assert_eq!(a2.get(&Path::from("title")), Some(&val("y")));
        assert_eq!(b2.get(&Path::from("title")), Some(&val("y")));
    }

    #[test]
    fn s2_later_stamp_wins() {
        let mut a = doc("doc1", "A");
        a.set(Path::from("title"), val("x")).unwrap();

        let mut b = doc("doc1", "B");
        b.merge(&a).unwrap();
        b.set(Path::from("title"), val("y")).unwrap();

        let mut a2 = a.clone();
        a2.merge(&b).unwrap();

        assert_eq!(a2.get(&Path::from("title")), Some(&val("y")));
        assert_eq!(b.get(&Path::from("title")), Some(&val("y")));
    }

    #[test]
    fn s3_independent_fields_do_not_conflict() {
        let mut a = doc("doc1", "A");
        a.set(Path::from("title"), val("x")).unwrap();
        let mut b = doc("doc1", "B");
        b.set(Path::from("priority"), val("high")).unwrap();

        let mut merged = a.clone();
        merged.merge(&b).unwrap();

        assert_eq!(merged.get(&Path::from("title")), Some(&val("x")));
        assert_eq!(merged.get(&Path::from("priority")), Some(&val("high")));
    }

    #[test]
    fn s4_delete_vs_update_later_stamp_wins() {
        // A.delete("due") at (1,A); B.set("due", ...) at (2,B) — B's write is later.
        let mut a = doc("doc1", "A");
        a.delete(Path::from("due")).unwrap(); // (1, A)

        let mut b = doc("doc1", "B");
        b.set(Path::from("filler"), val("x")).unwrap(); // (1, B)
        b.set(Path::from("due"), val("2025-12-01")).unwrap(); // (2, B)

        let mut merged = a.clone();
        merged.merge(&b).unwrap();
        assert_eq!(merged.get(&Path::from("due")), Some(&val("2025-12-01")));
    }

    #[test]
    fn s4_reverse_stamps_leaves_tombstone() {
        // Same shape, but now A's delete is the later write: the tombstone wins.
        let mut a = doc("doc1", "A");
        a.set(Path::from("filler"), val("x")).unwrap(); // (1, A)
        a.delete(Path::from("due")).unwrap(); // (2, A)

        let mut b = doc("doc1", "B");
        b.set(Path::from("due"), val("2025-12-01")).unwrap(); // (1, B)

        let mut merged = a.clone();
        merged.merge(&b).unwrap();
        assert!(merged.register(&Path::from("due")).unwrap().is_tombstone());
        assert_eq!(merged.get(&Path::from("due")), None);
    }
}
