//! Replica identity, Lamport stamps and vector clocks: the causality primitives every other
//! crate in this workspace builds on.

pub mod errors;
pub mod ordering;
pub mod replica;
pub mod stamp;
pub mod vector_clock;

pub use errors::{CoreError, CoreResult};
pub use ordering::{HappenedBeforeOrd, HappenedBeforeOrdering};
pub use replica::ReplicaId;
pub use stamp::{Clock, Stamp};
pub use vector_clock::VectorClock;
