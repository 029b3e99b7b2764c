//! This crate provides the structured record stream fed by `specto-tracer`.
//!
//! The tracer opens one [Record] per traced line and attaches the variable
//! changes it discovers; the resulting ordered change list is what
//! downstream replay/visualization consumes, typically through the JSON
//! export.

mod error;
mod recorder;

pub use self::error::{Error, Result};
pub use self::recorder::{Record, Recorder, VariableChange};
