//! Instrumentation wrappers over hosted callables.
//!
//! Wrapping is the decorator form of tracing: a wrapped callable activates
//! the tracer's scope around each of its invocations (or, for generator
//! functions, around each resumption of its instances) and behaves
//! identically otherwise — results, errors and control flow are passed
//! through unchanged.
//!
//! When instrumentation is disabled process-wide (see
//! [tracing_disabled](specto_tracer::wrap::tracing_disabled)), every
//! wrapper returns the original callable unchanged.

use std::sync::Arc;

use specto_tracer::record::RecordSink;
use specto_tracer::tracer::Tracer;
use specto_tracer::wrap::tracing_disabled;

use crate::class::{Callable, Class};
use crate::code::CodeObject;
use crate::engine::Engine;
use crate::function::Function;
use crate::generator::GeneratorFn;

/// Wraps a plain function: each invocation of the wrapper scopes tracer
/// activation around a single call of the original.
pub fn function(tracer: &Tracer<Engine>, function: &Function) -> Function {
    if tracing_disabled() {
        return function.clone();
    }

    tracer.add_target_code(function.code().id());

    tracing::debug!(code = function.code().name(), "function instrumented");

    let params = function.code().params().to_vec();
    let code = CodeObject::internal(function.code().name(), &params);

    let inner = function.clone();
    let tracer = tracer.clone();

    Function::new(code, move |act| {
        let mut args = Vec::with_capacity(params.len());
        for param in &params {
            args.push(act.get(param)?);
        }

        tracer.trace_call(|| act.call(&inner, &args))
    })
}

/// Wraps a generator function: its instances are traced one resumption at
/// a time, so the consumer's time between resumptions is excluded.
pub fn generator_fn(tracer: &Tracer<Engine>, generator: &GeneratorFn) -> GeneratorFn {
    if tracing_disabled() {
        return generator.clone();
    }

    tracer.add_target_code(generator.code().id());

    tracing::debug!(code = generator.code().name(), "generator instrumented");

    generator.clone().traced_by(tracer.clone())
}

/// Wraps a single callable.
///
/// Coroutine functions cannot be instrumented; asking for one is a hard
/// error.
pub fn callable(
    tracer: &Tracer<Engine>,
    callable: &Callable,
) -> specto_tracer::Result<Callable> {
    if tracing_disabled() {
        return Ok(callable.clone());
    }

    match callable {
        Callable::Function(f) => Ok(Callable::Function(function(tracer, f))),
        Callable::Generator(g) => Ok(Callable::Generator(generator_fn(tracer, g))),
        Callable::Coroutine(_) => Err(specto_tracer::Error::UnsupportedTarget),
    }
}

/// Wraps a class: the function-wrapping rule is applied to every plain
/// function and generator function defined directly on it. Coroutine
/// functions are skipped, and left untouched.
pub fn class_def(tracer: &Tracer<Engine>, class: &Class) -> Class {
    if tracing_disabled() {
        return class.clone();
    }

    let mut wrapped = Class::new(class.name());

    for (name, method) in class.methods() {
        let method = match method {
            Callable::Function(f) => Callable::Function(function(tracer, f)),
            Callable::Generator(g) => Callable::Generator(generator_fn(tracer, g)),
            Callable::Coroutine(_) => method.clone(),
        };

        wrapped = wrapped.define(name, method);
    }

    wrapped
}

/// Wraps a function so that the value of each of its calls is appended to
/// the record stream as an access on the last record.
///
/// The wrapped function is not traced by this; it only feeds the recorder.
pub fn observed(recorder: Arc<dyn RecordSink>, function: &Function) -> Function {
    let params = function.code().params().to_vec();
    let code = CodeObject::internal(function.code().name(), &params);

    let inner = function.clone();

    Function::new(code, move |act| {
        let mut args = Vec::with_capacity(params.len());
        for param in &params {
            args.push(act.get(param)?);
        }

        let result = act.call(&inner, &args)?;
        recorder.add_access_to_last_record(&result);
        Ok(result)
    })
}
