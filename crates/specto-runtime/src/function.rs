use std::sync::Arc;

use specto_tracer::Value;
use specto_tracer::runtime::Step;

use crate::code::CodeObject;
use crate::engine::Engine;
use crate::frame::Frame;

pub(crate) type Body = Arc<dyn Fn(&mut Activation) -> crate::Result<Value> + Send + Sync>;

/// A hosted plain function: a code object plus an explicitly instrumented
/// body.
#[derive(Clone)]
pub struct Function {
    code: Arc<CodeObject>,
    body: Body,
}

impl Function {
    /// Creates a function from its code object and body.
    ///
    /// The body reports its own execution through the [Activation] handle
    /// it receives: one [line](Activation::line) call per executed line,
    /// one [bind](Activation::bind) call per assignment.
    pub fn new(
        code: CodeObject,
        body: impl Fn(&mut Activation) -> crate::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            code: Arc::new(code),
            body: Arc::new(body),
        }
    }

    /// Returns the code object of this function.
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("code", &self.code.name())
            .finish_non_exhaustive()
    }
}

/// Execution handle given to the body of a hosted callable.
///
/// Every operation the body wants traced goes through this handle; the
/// frame position and bindings it maintains are what the step callback
/// observes.
pub struct Activation {
    engine: Engine,
    frame: Frame,
}

impl Activation {
    pub(crate) const fn new(engine: Engine, frame: Frame) -> Self {
        Self { engine, frame }
    }

    /// Marks the given line (1-based) as about to execute.
    pub fn line(&mut self, line: u32) {
        self.frame.set_line(line);
        self.engine.fire(&self.frame, &Step::Line);
    }

    /// Binds a variable in the current frame.
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) {
        self.frame.bind(name, value.into());
    }

    /// Looks a variable of the current frame up.
    pub fn get(&self, name: &str) -> crate::Result<Value> {
        self.frame
            .get(name)
            .ok_or_else(|| crate::Error::UnboundName(name.to_owned()))
    }

    /// Calls another hosted function from this frame.
    pub fn call(&mut self, function: &Function, args: &[Value]) -> crate::Result<Value> {
        self.engine.call(function, args)
    }

    /// Creates an error, to be returned from the body.
    pub fn raise(&self, kind: &str, message: impl Into<String>) -> crate::Error {
        crate::Error::raised(kind, message)
    }

    /// Returns the engine executing this frame.
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }
}
