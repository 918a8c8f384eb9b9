use std::time::Duration;

/// Tunables for one [[crate::coordinator::SyncCoordinator]] instance.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorConfig {
    /// Outbound queue capacity per subscriber before it's dropped for backpressure (§5).
    pub subscriber_queue_capacity: usize,
    /// How often the persistence retry service attempts to flush documents that failed to
    /// persist (§7 `PersistenceUnavailable`).
    pub persistence_retry_interval: Duration,
}

impl CoordinatorConfig {
    pub const DEFAULT: Self = Self {
        subscriber_queue_capacity: 256,
        persistence_retry_interval: Duration::from_secs(5),
    };
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
