//! Photo organization module.
//!
//! Copies the frozen index into `<destination>/<model>/<YYYYMMDD>/`.

mod executor;
mod types;

pub use executor::OrganizeExecutor;
pub use types::*;
