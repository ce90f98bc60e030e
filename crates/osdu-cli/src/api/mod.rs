//! API client module
//!
//! HTTP client for the platform services. Every request carries the bearer
//! token, data partition and a correlation id.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{OsduClient, Service, ServiceStatus};
pub use types::*;
