use std::fmt;

/// An opaque, host-supplied payload.
///
/// The core never inspects the structure of a value; it only ever compares two values for
/// equality (to detect [[crate::errors::DataError::InvariantViolation]]) and moves them
/// around unchanged. A JSON-like tree is the natural universal representation, but nothing
/// here depends on that beyond using it as the encoded form.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Value(serde_json::Value);

impl Value {
    pub fn new(inner: serde_json::Value) -> Self {
        Self(inner)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a register currently holds: a live value, or an explicit tombstone.
///
/// Kept as a distinct marker rather than collapsing a delete into `Value::Null`: a host
/// whose values can themselves legitimately be JSON `null` must still be able to tell "set to
/// null" apart from "deleted" (see the tombstone open question this resolves).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Value(Value),
    Tombstone,
}

impl FieldValue {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, FieldValue::Tombstone)
    }

    /// The live value, or `None` if this is a tombstone.
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            FieldValue::Tombstone => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Value(Value::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tombstone_is_distinct_from_null_value() {
        let null_value = FieldValue::from(serde_json::Value::Null);
        let tombstone = FieldValue::Tombstone;
        assert_ne!(null_value, tombstone);
        assert!(!null_value.is_tombstone());
        assert!(tombstone.is_tombstone());
    }

    #[test]
    fn json_roundtrip_preserves_tombstone_marker() {
        let tombstone = FieldValue::Tombstone;
        let encoded = serde_json::to_string(&tombstone).unwrap();
        let decoded: FieldValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, tombstone);
    }
}
