#![forbid(unsafe_code)]

//! Core domain model and evaluation pipeline for lull.
//!
//! This crate provides:
//! - Domain types (care events, suppression markers, state, output model)
//! - Event log operations and persistence
//! - The normalize / reduce / project pipeline
//! - Civil time conversions, configuration and logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod civil;
pub mod event_log;
pub mod store;
pub mod normalize;
pub mod reduce;
pub mod project;
pub mod routine;
pub mod pipeline;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, ConstraintConfig};
pub use civil::{parse_zone, CivilFields, CivilTime};
pub use event_log::EventLog;
pub use pipeline::{evaluate, Snapshot};
pub use export::export_csv;
