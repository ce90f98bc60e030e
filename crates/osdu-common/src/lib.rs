//! OSDU Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the OSDU workspace members.
//!
//! - **Logging**: `tracing` subscriber setup with console/file targets and
//!   text/JSON formats, configurable from the environment.
//!
//! # Example
//!
//! ```no_run
//! use osdu_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::builder().level(LogLevel::Debug).build();
//! init_logging(&config).ok();
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LogOutput};
