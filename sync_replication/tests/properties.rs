use proptest::prelude::*;
use std::collections::BTreeSet;
use sync_core::ReplicaId;
use sync_data_types::Value;
use sync_replication::{Delta, Document, DocumentId};

fn replica(name: &str) -> ReplicaId {
    ReplicaId::from(name)
}

fn val(s: &str) -> Value {
    Value::new(serde_json::Value::String(s.to_owned()))
}

#[derive(Clone, Debug)]
enum Op {
    Set { path: String, value: String },
    Delete { path: String },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        ("[a-c]", "[x-z0-9]{1,3}").prop_map(|(path, value)| Op::Set { path, value }),
        "[a-c]".prop_map(|path| Op::Delete { path }),
    ]
}

fn apply_op(doc: &mut Document, op: &Op) {
    match op {
        Op::Set { path, value } => doc.set(path.as_str().into(), val(value)).unwrap(),
        Op::Delete { path } => doc.delete(path.as_str().into()).unwrap(),
    }
}

proptest! {
    /// P1 — after two replicas observe the same multiset of writes, they agree on every
    /// path's value, independent of delivery order.
    #[test]
    fn p1_convergence(ops_a in proptest::collection::vec(op_strategy(), 0..8),
                      ops_b in proptest::collection::vec(op_strategy(), 0..8)) {
        let mut a = Document::new(DocumentId::from("doc"), replica("A"));
        for op in &ops_a { apply_op(&mut a, op); }

        let mut b = Document::new(DocumentId::from("doc"), replica("B"));
        for op in &ops_b { apply_op(&mut b, op); }

        let mut merged_ab = a.clone();
        merged_ab.merge(&b).unwrap();
        let mut merged_ba = b.clone();
        merged_ba.merge(&a).unwrap();

        let paths: BTreeSet<String> = merged_ab
            .paths()
            .chain(merged_ba.paths())
            .map(|p| p.as_ref().to_owned())
            .collect();
        for path in paths {
            let key = path.as_str().into();
            prop_assert_eq!(merged_ab.get(&key), merged_ba.get(&key));
        }
    }

    /// P4 — a replica's own clock coordinate never decreases across any sequence of local
    /// writes and merges.
    #[test]
    fn p4_monotone_clocks(ops in proptest::collection::vec(op_strategy(), 0..10)) {
        let mut doc = Document::new(DocumentId::from("doc"), replica("A"));
        let mut last = 0u64;
        for op in &ops {
            apply_op(&mut doc, op);
            let current = doc.clock().get(&replica("A"));
            prop_assert!(current >= last);
            last = current;
        }
    }

    /// P5 — every field's stamp clock never exceeds the document's own knowledge of that
    /// stamp's replica.
    #[test]
    fn p5_stamp_below_clock_frontier(ops_a in proptest::collection::vec(op_strategy(), 0..6),
                                      ops_b in proptest::collection::vec(op_strategy(), 0..6)) {
        let mut a = Document::new(DocumentId::from("doc"), replica("A"));
        for op in &ops_a { apply_op(&mut a, op); }
        let mut b = Document::new(DocumentId::from("doc"), replica("B"));
        for op in &ops_b { apply_op(&mut b, op); }
        a.merge(&b).unwrap();

        for (_, register) in a.iter() {
            let frontier = a.clock().get(&register.stamp.replica);
            prop_assert!(register.stamp.clock <= frontier);
        }
    }

    /// P6 — applying the delta between two documents to the source reproduces the target's
    /// visible state, for arbitrary operation sequences.
    #[test]
    fn p6_delta_faithfulness(ops_from in proptest::collection::vec(op_strategy(), 0..6),
                             ops_to in proptest::collection::vec(op_strategy(), 0..6)) {
        let mut from = Document::new(DocumentId::from("doc"), replica("A"));
        for op in &ops_from { apply_op(&mut from, op); }

        let mut to = from.clone();
        for op in &ops_to { apply_op(&mut to, op); }

        let delta = Delta::compute(&from, &to);
        let mut applied = from.clone();
        delta.apply(&mut applied).unwrap();

        for path in to.paths() {
            prop_assert_eq!(applied.get(path), to.get(path));
        }
    }
}

/// P7 — two concurrent writes at equal clock values resolve to the lexicographically
/// greater replica id, regardless of which side merges into which.
#[test]
fn p7_tie_break_determinism() {
    let mut a = Document::new(DocumentId::from("doc"), replica("alice"));
    a.set("title".into(), val("from-alice")).unwrap();

    let mut b = Document::new(DocumentId::from("doc"), replica("bob"));
    b.set("title".into(), val("from-bob")).unwrap();

    let mut merged_into_a = a.clone();
    merged_into_a.merge(&b).unwrap();
    let mut merged_into_b = b.clone();
    merged_into_b.merge(&a).unwrap();

    assert_eq!(
        merged_into_a.register(&"title".into()).unwrap().origin,
        replica("bob")
    );
    assert_eq!(
        merged_into_b.register(&"title".into()).unwrap().origin,
        replica("bob")
    );
}

/// P8 — delete-then-set (higher stamp) resurrects the value; set-then-delete (higher
/// stamp) leaves the tombstone in place.
#[test]
fn p8_tombstone_overwrite_order_matters() {
    let mut doc = Document::new(DocumentId::from("doc"), replica("A"));
    doc.set("p".into(), val("v0")).unwrap();
    doc.delete("p".into()).unwrap();
    doc.set("p".into(), val("v1")).unwrap();
    assert_eq!(doc.get(&"p".into()), Some(&val("v1")));

    let mut doc2 = Document::new(DocumentId::from("doc"), replica("A"));
    doc2.set("p".into(), val("v0")).unwrap();
    doc2.set("p".into(), val("v1")).unwrap();
    doc2.delete("p".into()).unwrap();
    assert_eq!(doc2.get(&"p".into()), None);
    assert!(doc2.register(&"p".into()).unwrap().is_tombstone());
}
