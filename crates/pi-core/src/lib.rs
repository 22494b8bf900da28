//! Public Inspection Core
//!
//! Configuration, logging, and the operator tools built on the consensus,
//! validation, merge, and signature crates.
//!
//! # Core Concepts
//!
//! - [`Configuration`]: flat key/value document in TOML, JSON, or YAML
//! - [`InspectionSettings`]: every tool setting resolved at startup
//! - [`SetupDataSources`]: validate a load dataset and rebuild the inspection data
//! - [`CaptureSignatures`]: one party's signature and decisions
//! - [`CalculateBoundaries`]: re-derive every boundary state
//!
//! # Example
//!
//! ```rust,ignore
//! use pi_core::{Configuration, InspectionSettings, SetupDataSources, SetupOutcome};
//!
//! let config = Configuration::from_path("project/config.toml")?;
//! let settings = InspectionSettings::resolve(&config, "project")?;
//! match SetupDataSources::new(settings).execute(Path::new("load.json"))? {
//!     SetupOutcome::Completed(report) => println!("{} rows merged", report.merge.rows_appended()),
//!     SetupOutcome::Invalid(report) => eprintln!("{:?}", report.messages()),
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod logging;
mod tools;

pub use config::{
    model_from_config, ConfigError, Configuration, InspectionSettings, DEFAULT_SCRATCH_DATASET,
};
pub use error::{PiError, Result};
pub use logging::{init_logging, LogFormat, DEFAULT_LOG_FILTER};
pub use tools::{CalculateBoundaries, CaptureSignatures, SetupDataSources, SetupOutcome, SetupReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
