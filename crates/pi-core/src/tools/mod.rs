//! Top-level tools, one per operator action

mod boundaries;
mod capture;
mod setup;

pub use boundaries::CalculateBoundaries;
pub use capture::CaptureSignatures;
pub use setup::{SetupDataSources, SetupOutcome, SetupReport};
