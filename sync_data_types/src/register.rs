use crate::errors::{DataResult, InvariantViolationSnafu};
use crate::value::FieldValue;
use snafu::ensure;
use sync_core::{ReplicaId, Stamp};

/// One LWW cell: a value, the stamp that last wrote it, and the replica that produced that
/// write.
///
/// `origin` is redundant with `stamp.replica` — kept alongside it purely for audit, so a
/// reader doesn't have to reach into the stamp to see who wrote a field.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Register {
    pub value: FieldValue,
    pub stamp: Stamp,
    pub origin: ReplicaId,
}

impl Register {
    pub fn new(value: FieldValue, stamp: Stamp, origin: ReplicaId) -> Self {
        Self {
            value,
            stamp,
            origin,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_tombstone()
    }

    /// Offers `(value, stamp, origin)` to this register, applying the LWW rule.
    ///
    /// A strictly newer stamp overwrites; a strictly older one is silently discarded; an
    /// equal stamp must carry an equal value, or this is an
    /// [[crate::errors::DataError::InvariantViolation]] — stamps are supposed to uniquely
    /// identify one write.
    pub fn assign(&mut self, value: FieldValue, stamp: Stamp, origin: ReplicaId) -> DataResult<()> {
        match stamp.cmp(&self.stamp) {
            std::cmp::Ordering::Greater => {
                self.value = value;
                self.stamp = stamp;
                self.origin = origin;
                Ok(())
            }
            std::cmp::Ordering::Less => Ok(()),
            std::cmp::Ordering::Equal => {
                ensure!(
                    self.value == value,
                    InvariantViolationSnafu {
                        stamp: stamp.to_string(),
                    }
                );
                Ok(())
            }
        }
    }
}
