//! Instrumentation wrappers.
//!
//! The wrappers scope tracer activation around hosted invocations: a plain
//! call is traced by [Tracer::trace_call](crate::tracer::Tracer::trace_call),
//! and a resumable computation (the host's generator objects) is traced one
//! resumption at a time by [TracedResumable], so the time the consumer
//! spends between resumptions never shows up in the trace.

use std::sync::LazyLock;

use crate::runtime::{Runtime, Value};
use crate::tracer::Tracer;

/// Environment variable fully disabling instrumentation for the process.
pub const DISABLE_ENV_VAR: &str = "SPECTO_DISABLED";

static DISABLED: LazyLock<bool> =
    LazyLock::new(|| std::env::var_os(DISABLE_ENV_VAR).is_some_and(|v| !v.is_empty()));

/// Returns whether instrumentation is disabled for the process.
///
/// When it is, every wrapper returns the original callable unchanged and
/// scoped activation is inert.
pub fn tracing_disabled() -> bool {
    *DISABLED
}

/// Outcome of resuming a resumable computation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOutcome {
    /// The computation suspended after producing a value.
    Yielded(Value),

    /// The computation ran to completion.
    Complete,
}

/// Trait for driving a resumable computation (the explicit form of a
/// generator object).
pub trait Resumable {
    /// Error raised by the computation.
    type Error;

    /// Runs the computation until its next suspension point, handing it the
    /// value sent by the consumer.
    ///
    /// Resuming an already-complete computation reports
    /// [ResumeOutcome::Complete] again.
    fn resume(&mut self, value: Option<Value>) -> Result<ResumeOutcome, Self::Error>;

    /// Runs the computation until its next suspension point, raising
    /// `error` at the current suspension point instead of sending a value.
    fn resume_with_error(&mut self, error: Self::Error) -> Result<ResumeOutcome, Self::Error>;
}

impl<G: Resumable + ?Sized> Resumable for Box<G> {
    type Error = G::Error;

    fn resume(&mut self, value: Option<Value>) -> Result<ResumeOutcome, Self::Error> {
        (**self).resume(value)
    }

    fn resume_with_error(&mut self, error: Self::Error) -> Result<ResumeOutcome, Self::Error> {
        (**self).resume_with_error(error)
    }
}

/// Resumable computation traced one resumption at a time.
///
/// Each resume activates the tracer's scope around exactly one step of the
/// underlying computation, so only the computation's own execution is
/// traced.
pub struct TracedResumable<R: Runtime, G> {
    tracer: Tracer<R>,
    inner: G,
}

impl<R: Runtime, G> TracedResumable<R, G> {
    /// Creates a traced wrapper around `inner`.
    pub const fn new(tracer: Tracer<R>, inner: G) -> Self {
        Self { tracer, inner }
    }

    /// Returns the underlying computation.
    pub fn into_inner(self) -> G {
        self.inner
    }
}

impl<R: Runtime, G: Resumable> Resumable for TracedResumable<R, G> {
    type Error = G::Error;

    fn resume(&mut self, value: Option<Value>) -> Result<ResumeOutcome, Self::Error> {
        let _scope = self.tracer.activate();
        self.inner.resume(value)
    }

    fn resume_with_error(&mut self, error: Self::Error) -> Result<ResumeOutcome, Self::Error> {
        let _scope = self.tracer.activate();
        self.inner.resume_with_error(error)
    }
}
