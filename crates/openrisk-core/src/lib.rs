//! # openrisk-core
//!
//! Shared foundation for the OpenRisk signal engine: calendar-month
//! arithmetic, identifiers, one error enum per subsystem, the YAML
//! configuration documents, and tracing setup.

pub mod config;
pub mod errors;
pub mod month;
pub mod tracing;
pub mod types;

pub use month::Month;
pub use types::{MetricId, RepoId};
