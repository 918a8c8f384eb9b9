use crate::errors::{ClockOverflowSnafu, CoreResult};
use crate::ordering::HappenedBeforeOrdering;
use crate::replica::ReplicaId;
use crate::stamp::{Clock, Stamp};
use snafu::OptionExt;
use std::collections::BTreeMap;

/// A replica's view of how far every replica it knows about (including itself) has
/// progressed.
///
/// Unknown replicas implicitly read as clock `0`; this is what lets the map stay open and
/// grow as new replicas are observed instead of needing a fixed, pre-agreed membership.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VectorClock {
    coords: BTreeMap<ReplicaId, Clock>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clock value this instance has recorded for `replica`, or `0` if it has never
    /// observed anything from that replica.
    pub fn get(&self, replica: &ReplicaId) -> Clock {
        self.coords.get(replica).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.coords.values().all(|&c| c == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReplicaId, &Clock)> {
        self.coords.iter()
    }

    /// Advances `replica`'s own coordinate by one and returns the stamp for the write that
    /// coordinate now represents.
    ///
    /// This is the sole Lamport tick operation (C1): every local mutation a replica makes
    /// goes through here exactly once, so two ticks from the same replica can never produce
    /// equal stamps. Fails only once the replica has made `u64::MAX` local writes.
    pub fn next_stamp(&mut self, replica: &ReplicaId) -> CoreResult<Stamp> {
        let next = self
            .get(replica)
            .checked_add(1)
            .context(ClockOverflowSnafu)?;
        self.coords.insert(replica.clone(), next);
        Ok(Stamp::new(next, replica.clone()))
    }

    /// Records that `replica` has been observed at `clock`, advancing this clock's
    /// coordinate for `replica` if `clock` is newer than what's already recorded.
    ///
    /// Never moves a coordinate backwards: observing a stale value is a no-op.
    pub fn observe(&mut self, replica: &ReplicaId, clock: Clock) {
        let entry = self.coords.entry(replica.clone()).or_insert(0);
        if clock > *entry {
            *entry = clock;
        }
    }

    /// Convenience for observing every coordinate of `other` at once, as when applying a
    /// delta that carries its source's clock.
    pub fn observe_many(&mut self, other: &VectorClock) {
        for (replica, &clock) in other.coords.iter() {
            self.observe(replica, clock);
        }
    }

    /// Coordinate-wise maximum of `self` and `other`, mutating `self` in place.
    pub fn merge(&mut self, other: &VectorClock) {
        self.observe_many(other);
    }

    /// The happened-before relationship between `self` and `other`.
    ///
    /// `self ≤ other` coordinate-wise yields [[HappenedBeforeOrdering::Before]] (or `Equal`
    /// if they match exactly); `self ≥ other` yields `After`; anything else (some
    /// coordinates ahead, others behind) is [[HappenedBeforeOrdering::Concurrent]].
    pub fn compare(&self, other: &VectorClock) -> HappenedBeforeOrdering {
        let mut self_ahead = false;
        let mut other_ahead = false;

        for replica in self.coords.keys().chain(other.coords.keys()) {
            let a = self.get(replica);
            let b = other.get(replica);
            match a.cmp(&b) {
                std::cmp::Ordering::Less => other_ahead = true,
                std::cmp::Ordering::Greater => self_ahead = true,
                std::cmp::Ordering::Equal => {}
            }
            if self_ahead && other_ahead {
                return HappenedBeforeOrdering::Concurrent;
            }
        }

        match (self_ahead, other_ahead) {
            (false, false) => HappenedBeforeOrdering::Equal,
            (true, false) => HappenedBeforeOrdering::After,
            (false, true) => HappenedBeforeOrdering::Before,
            (true, true) => HappenedBeforeOrdering::Concurrent,
        }
    }

    /// Whether `self` happened strictly before `other` (but is not equal to it).
    pub fn happened_before(&self, other: &VectorClock) -> bool {
        matches!(self.compare(other), HappenedBeforeOrdering::Before)
    }

    /// Whether `self` and `other` are concurrent, i.e. neither happened before the other.
    pub fn is_concurrent(&self, other: &VectorClock) -> bool {
        matches!(self.compare(other), HappenedBeforeOrdering::Concurrent)
    }
}

impl FromIterator<(ReplicaId, Clock)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (ReplicaId, Clock)>>(iter: I) -> Self {
        Self {
            coords: iter.into_iter().collect(),
        }
    }
}
