use snafu::{Location, Snafu};

/// Faults raised by this crate's own operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CoreError {
    #[snafu(display("Lamport clock for replica overflowed u64 at {location}"))]
    ClockOverflow {
        #[snafu(implicit)]
        location: Location,
    },
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
