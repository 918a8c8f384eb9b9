#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

//! Field values and the LWW register that holds them.

pub mod errors;
pub mod register;
pub mod value;

pub use errors::{DataError, DataResult};
pub use register::Register;
pub use value::{FieldValue, Value};
