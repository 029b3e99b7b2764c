//! Default host execution environment for `specto-tracer`.
//!
//! This crate implements the tracer's instrumentation port with a
//! cooperative, explicitly instrumented runtime: hosted programs are
//! expressed as Rust closures that report their own lines and bindings
//! through an [Activation] handle, and the [Engine] turns those reports
//! into the call/line/return/exception steps the tracer consumes.
//!
//! Explicit instrumentation is the documented substitution for an
//! interpreter-level callback hook: there is no way to observe a native
//! Rust function line by line, so traced operations are wrapped instead,
//! at the same granularity an interpreter would deliver.
//!
//! # Running instrumented code
//!
//! ```no_run
//! use specto_runtime::{CodeObject, Engine, Function, Value};
//!
//! let engine = Engine::default();
//!
//! let double = Function::new(
//!     CodeObject::new("double", "demo.sp", 1).with_params(["x"]),
//!     |act| {
//!         act.line(2);
//!         let x = act.get("x")?;
//!         let Value::Int(x) = x else {
//!             return Err(act.raise("TypeError", "x must be an integer"));
//!         };
//!         Ok(Value::Int(x * 2))
//!     },
//! );
//!
//! let result = engine.call(&double, &[Value::Int(21)]);
//! assert_eq!(result, Ok(Value::Int(42)));
//! ```
//!
//! Generator objects are explicit state machines: a [GeneratorFn] holds one
//! closure per segment between suspension points, and instantiating it
//! yields a [Resumable](specto_tracer::wrap::Resumable) computation.

mod class;
mod code;
mod engine;
mod error;
mod frame;
mod function;
mod generator;

/// Module implementing the instrumentation wrappers over hosted callables.
pub mod wrap;

pub use specto_tracer::Value;

pub use self::class::{Callable, Class, CoroutineFn};
pub use self::code::CodeObject;
pub use self::engine::Engine;
pub use self::error::{Error, Result};
pub use self::frame::Frame;
pub use self::function::{Activation, Function};
pub use self::generator::{GenFlow, GenInput, GenSegment, Generator, GeneratorFn};
