use std::sync::Arc;

use specto_tracer::Value;
use specto_tracer::tracer::Tracer;
use specto_tracer::wrap::{Resumable, ResumeOutcome, TracedResumable};

use crate::code::CodeObject;
use crate::engine::{Engine, bind_params};
use crate::frame::Frame;
use crate::function::Activation;

/// Outcome of one generator segment.
#[derive(Debug, Clone)]
pub enum GenFlow {
    /// Suspend the generator, handing this value to the consumer.
    Yield(Value),

    /// Run to completion.
    Return,
}

/// What the consumer handed to a resuming generator.
#[derive(Debug, Clone)]
pub enum GenInput {
    /// A value sent by the consumer (absent on a bare resume).
    Value(Option<Value>),

    /// An error injected by the consumer at the suspension point.
    Error(crate::Error),
}

impl GenInput {
    /// Returns the sent value, propagating an injected error.
    ///
    /// This is the common head of a segment that does not handle injected
    /// errors itself.
    pub fn value(self) -> crate::Result<Option<Value>> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Error(error) => Err(error),
        }
    }
}

/// One segment of a generator body: the code between two suspension
/// points.
pub type GenSegment = Box<dyn Fn(&mut Activation, GenInput) -> crate::Result<GenFlow> + Send + Sync>;

/// A hosted generator function: a code object plus the explicit state
/// machine of its body, one segment per stretch between suspension points.
#[derive(Clone)]
pub struct GeneratorFn {
    code: Arc<CodeObject>,
    segments: Arc<Vec<GenSegment>>,

    /// Set by the instrumentation wrappers: instantiated generators are
    /// handed out pre-wrapped, traced one resumption at a time.
    tracer: Option<Tracer<Engine>>,
}

impl GeneratorFn {
    /// Creates a generator function from its code object and segments.
    pub fn new(code: CodeObject, segments: Vec<GenSegment>) -> Self {
        Self {
            code: Arc::new(code),
            segments: Arc::new(segments),
            tracer: None,
        }
    }

    /// Returns the code object of this generator function.
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }

    pub(crate) fn traced_by(mut self, tracer: Tracer<Engine>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Instantiates the generator with the given arguments.
    ///
    /// Nothing executes until the first resume; calling a generator
    /// function only builds the suspended computation.
    pub fn instantiate(
        &self,
        engine: &Engine,
        args: &[Value],
    ) -> crate::Result<Box<dyn Resumable<Error = crate::Error>>> {
        let frame = Frame::new(Arc::clone(&self.code), None, bind_params(&self.code, args)?);

        let generator = Generator {
            engine: *engine,
            frame,
            segments: Arc::clone(&self.segments),
            next_segment: 0,
            done: false,
        };

        Ok(match &self.tracer {
            Some(tracer) => Box::new(TracedResumable::new(tracer.clone(), generator)),
            None => Box::new(generator),
        })
    }
}

impl std::fmt::Debug for GeneratorFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorFn")
            .field("code", &self.code.name())
            .field("segments", &self.segments.len())
            .finish_non_exhaustive()
    }
}

/// A live generator object: a suspended frame plus the index of the next
/// segment to run.
pub struct Generator {
    engine: Engine,
    frame: Frame,
    segments: Arc<Vec<GenSegment>>,
    next_segment: usize,
    done: bool,
}

impl Generator {
    fn step(&mut self, input: GenInput) -> crate::Result<ResumeOutcome> {
        if self.done || self.next_segment >= self.segments.len() {
            self.done = true;
            return Ok(ResumeOutcome::Complete);
        }

        // Every resumption re-enters the frame: the host reports a call
        // step positioned on the suspension line, exactly like a frame
        // being entered for the first time.
        self.engine.enter(&self.frame);

        let result = {
            let mut activation = Activation::new(self.engine, self.frame.clone());
            (self.segments[self.next_segment])(&mut activation, input)
        };

        match result {
            Ok(GenFlow::Yield(value)) => {
                self.engine.leave_ok(&self.frame, value.clone());
                self.next_segment += 1;
                Ok(ResumeOutcome::Yielded(value))
            }
            Ok(GenFlow::Return) => {
                self.engine.leave_ok(&self.frame, Value::None);
                self.done = true;
                Ok(ResumeOutcome::Complete)
            }
            Err(error) => {
                self.engine.leave_err(&self.frame, &error);
                self.done = true;
                Err(error)
            }
        }
    }
}

impl Resumable for Generator {
    type Error = crate::Error;

    fn resume(&mut self, value: Option<Value>) -> crate::Result<ResumeOutcome> {
        self.step(GenInput::Value(value))
    }

    fn resume_with_error(&mut self, error: crate::Error) -> crate::Result<ResumeOutcome> {
        self.step(GenInput::Error(error))
    }
}
