//! This crate allows to trace the execution of a hosted program, line by
//! line.
//!
//! Two main components are provided:
//! - A tracer that consumes execution steps (calls, executed lines, returns,
//!   raised errors) from a host runtime, diffs variable bindings between
//!   steps, and emits a human-readable log plus a structured record stream.
//! - A few traits to implement a custom host runtime, responsible for
//!   running the program to trace and delivering its execution steps.
//!
//! # Tracing hosted code
//!
//! This is the main use case of this crate.
//!
//! The [Tracer](self::tracer::Tracer) is built over a host runtime and
//! activated around a region of hosted code, either with a scoped guard or
//! through the instrumentation wrappers of the host runtime crate.
//!
//! ```no_run
//! use specto_runtime::Engine;
//! use specto_tracer::tracer::Tracer;
//!
//! fn main() -> specto_tracer::Result<()> {
//!     let engine = Engine::default();
//!
//!     // initialize the tracer
//!     let tracer = Tracer::builder()
//!         .with_runtime(engine.clone())
//!         .depth(2)
//!         .build()?;
//!
//!     {
//!         // every step taken by the engine on this thread is now traced
//!         let _scope = tracer.activate();
//!
//!         // ... run hosted code through `engine` ...
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Implementing a custom host runtime
//!
//! This is the advanced use case of this crate.
//!
//! The [Runtime](self::runtime::Runtime)/[Frame](self::runtime::Frame)
//! traits allow to implement the instrumentation port the tracer drives: a
//! per-thread `install(callback) -> previous callback` slot and step
//! notifications `(frame, step) -> continuation`. A host without an
//! interpreter-level hook can implement the port with explicitly
//! instrumented operations, the way `specto-runtime` does.

mod context;
mod error;

/// Module containing the record-stream contract consumed by the tracer.
pub mod record;

/// Module containing traits for implementing a custom host runtime.
pub mod runtime;

/// Module implementing the textual output sink.
pub mod sink;

/// Module implementing source text resolution.
pub mod source;

/// Module implementing the execution tracer.
pub mod tracer;

/// Module implementing variable watches and snapshots.
pub mod watch;

/// Module implementing the instrumentation wrappers.
pub mod wrap;

pub use self::error::{Error, Result};
pub use self::runtime::Value;
