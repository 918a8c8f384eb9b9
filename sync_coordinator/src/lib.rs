#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

//! The sync coordinator: the document registry, subscriber sets and connection state
//! machine that sit in front of the replicated core (C6, C7, §5, §7).

pub mod authz;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod errors;
pub mod fanout;
pub mod persistence;
pub mod persistence_retry;
pub mod services;

pub use authz::{AllowAll, Authorizer};
pub use config::CoordinatorConfig;
pub use connection::{ConnectionEvent, ConnectionId, ConnectionState, Transition};
pub use coordinator::SyncCoordinator;
pub use errors::{CoordinatorError, Result};
pub use fanout::{FanOutAdapter, InMemoryFanOut};
pub use persistence::{InMemoryPersistence, PersistenceAdapter};
pub use persistence_retry::{PendingWrites, PersistenceRetryService};
pub use services::{Service, ServiceHandle, start_service};
