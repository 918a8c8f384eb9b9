use snafu::{Location, Snafu};

/// Faults raised while maintaining a single register.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DataError {
    /// Two writes carry the same stamp but disagree on value. Stamps are meant to be unique
    /// per `(replica, clock)`; this only happens if something outside this crate minted a
    /// duplicate stamp for two different writes.
    #[snafu(display(
        "invariant violation: stamp {stamp} was assigned two different values at {location}"
    ))]
    InvariantViolation {
        stamp: String,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type DataResult<T> = std::result::Result<T, DataError>;
