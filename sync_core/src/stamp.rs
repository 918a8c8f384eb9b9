use crate::ordering::{HappenedBeforeOrd, HappenedBeforeOrdering};
use crate::replica::ReplicaId;
use std::cmp;
use std::fmt;

/// An unsigned logical clock value. `0` means "never observed".
pub type Clock = u64;

/// The sole basis of conflict resolution for a single field register: `(clock, replica)`,
/// compared `clock` first and `replica` second.
///
/// Two distinct writes from the same replica can never carry the same stamp, because the
/// replica's own clock coordinate strictly increases between ticks (see
/// [[crate::vector_clock::VectorClock::next_stamp]]). Two different replicas can
/// legitimately produce the same `clock` value concurrently; `replica` breaks that tie
/// deterministically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Stamp {
    pub clock: Clock,
    pub replica: ReplicaId,
}

impl Stamp {
    pub fn new(clock: Clock, replica: ReplicaId) -> Self {
        Self { clock, replica }
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.clock, self.replica)
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.clock
            .cmp(&other.clock)
            .then_with(|| self.replica.cmp(&other.replica))
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl HappenedBeforeOrd for Stamp {
    fn hb_cmp(&self, other: &Self) -> HappenedBeforeOrdering {
        self.cmp(other).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stamp(clock: Clock, replica: &str) -> Stamp {
        Stamp::new(clock, ReplicaId::from(replica))
    }

    #[test]
    fn compares_clock_first() {
        assert!(stamp(1, "b") < stamp(2, "a"));
    }

    #[test]
    fn ties_break_on_replica() {
        assert!(stamp(5, "a") < stamp(5, "b"));
        assert!(stamp(5, "b") > stamp(5, "a"));
        assert_eq!(stamp(5, "a").cmp(&stamp(5, "a")), cmp::Ordering::Equal);
    }

    proptest! {
        #[test]
        fn total_order_is_antisymmetric(c1 in 0u64..1000, r1 in "[a-z]{1,4}", c2 in 0u64..1000, r2 in "[a-z]{1,4}") {
            let a = stamp(c1, &r1);
            let b = stamp(c2, &r2);
            assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        }
    }
}
