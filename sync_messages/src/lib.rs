//! Wire/persistence DTOs: the serialized document contract and the coordinator's framed
//! transport messages (§6). Serde-based and not byte-format-fixed — any self-describing
//! encoding (JSON, CBOR, ...) can carry these types.

pub mod serialized_document;
pub mod transport;

pub use serialized_document::SerializedDocument;
pub use transport::{IncomingMessage, OutgoingMessage};
