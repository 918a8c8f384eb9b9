#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

//! Documents and deltas: the convergent state and the diffs exchanged to keep it that way.

pub mod delta;
pub mod document;
pub mod document_id;
pub mod errors;

pub use delta::{Change, Delta};
pub use document::{Document, Path};
pub use document_id::DocumentId;
pub use errors::{ReplicationError, ReplicationResult};
