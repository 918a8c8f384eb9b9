use snafu::Snafu;
use sync_data_types::DataError;

/// Faults raised while mutating or merging a document.
#[derive(Debug, Snafu)]
pub enum ReplicationError {
    /// A field received two different values at the same stamp. This is fatal for the
    /// affected document: further mutation is refused (§7 `InvariantViolation`) and the
    /// fault is surfaced to the caller to log and decide what to do with the document.
    #[snafu(display("document {document_id} is poisoned: {source}"))]
    Poisoned {
        document_id: String,
        source: DataError,
    },

    /// The local replica has exhausted its logical clock (`u64::MAX` local writes).
    #[snafu(display("replica clock exhausted for document {document_id}: {source}"))]
    ClockExhausted {
        document_id: String,
        source: sync_core::CoreError,
    },
}

pub type ReplicationResult<T> = std::result::Result<T, ReplicationError>;
