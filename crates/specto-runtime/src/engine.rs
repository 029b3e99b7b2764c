use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::Mutex;
use specto_tracer::Value;
use specto_tracer::runtime::{Continuation, InstalledHandler, Runtime, Step};

use crate::code::CodeObject;
use crate::frame::Frame;
use crate::function::{Activation, Function};

pub(crate) type Handler = InstalledHandler<Engine>;

thread_local! {
    static HOST: RefCell<HostThread> = RefCell::new(HostThread::default());
}

/// Recorded interactive-session inputs, looked up by the source locator
/// for `<session-input-N>` code.
static SESSION_HISTORY: LazyLock<Mutex<HashMap<usize, String>>> = LazyLock::new(Mutex::default);

/// Per-thread host state: the installed step callback and the stack of
/// live frames.
#[derive(Default)]
struct HostThread {
    installed: Option<Handler>,
    frames: Vec<Frame>,
}

/// Handle over the host execution environment.
///
/// The environment itself is process-wide, with one callback slot and one
/// frame stack per thread (the way an interpreter's trace hook behaves);
/// the handle is freely copyable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    /// Creates a new engine handle.
    pub const fn new() -> Self {
        Self
    }

    /// Calls a hosted function with the given arguments.
    ///
    /// The call is reported to the installed step callback, if any; errors
    /// raised by the function propagate unchanged.
    pub fn call(&self, function: &Function, args: &[Value]) -> crate::Result<Value> {
        let frame = Frame::new(
            Arc::clone(function.code()),
            self.current_frame(),
            bind_params(function.code(), args)?,
        );

        self.enter(&frame);

        let result = {
            let mut activation = Activation::new(*self, frame.clone());
            (function.body())(&mut activation)
        };

        match result {
            Ok(value) => {
                self.leave_ok(&frame, value.clone());
                Ok(value)
            }
            Err(error) => {
                self.leave_err(&frame, &error);
                Err(error)
            }
        }
    }

    /// Records an interactive-session input, later resolved as the source
    /// text of `<session-input-N>` code.
    pub fn record_session_input(&self, entry: usize, text: impl Into<String>) {
        SESSION_HISTORY.lock().insert(entry, text.into());
    }

    /// Pushes a frame on the calling thread's stack and reports its entry.
    pub(crate) fn enter(&self, frame: &Frame) {
        HOST.with(|host| host.borrow_mut().frames.push(frame.clone()));

        match self.installed() {
            Some(handler) => {
                let continuation = handler.on_step(self, frame, &Step::Call);

                frame.set_trace(match continuation {
                    Continuation::Trace => Some(handler),
                    Continuation::Skip => None,
                });
            }
            None => frame.set_trace(None),
        }
    }

    /// Reports a normally completed frame (return or yield) and pops it.
    pub(crate) fn leave_ok(&self, frame: &Frame, value: Value) {
        self.fire(
            frame,
            &Step::Return {
                value: Some(value),
                completed: true,
            },
        );

        self.pop(frame);
    }

    /// Reports an error raised in a frame, then its unwound return, and
    /// pops it.
    pub(crate) fn leave_err(&self, frame: &Frame, error: &crate::Error) {
        self.fire(frame, &Step::Exception(error.exception_info()));
        self.fire(
            frame,
            &Step::Return {
                value: None,
                completed: false,
            },
        );

        self.pop(frame);
    }

    /// Reports a step of a live frame to the callback attached to it.
    ///
    /// Frame-attached callbacks only fire while some callback is installed
    /// on the thread; uninstalling (e.g. a trace scope ending inside the
    /// frame) silences them.
    pub(crate) fn fire(&self, frame: &Frame, step: &Step) {
        if self.installed().is_none() {
            return;
        }

        let Some(handler) = frame.trace() else {
            return;
        };

        if let Continuation::Skip = handler.on_step(self, frame, step) {
            frame.set_trace(None);
        }
    }

    fn pop(&self, frame: &Frame) {
        frame.set_trace(None);
        HOST.with(|host| host.borrow_mut().frames.pop());
    }
}

impl Runtime for Engine {
    type Frame = Frame;

    fn install(&self, handler: Option<Handler>) -> Option<Handler> {
        HOST.with(|host| std::mem::replace(&mut host.borrow_mut().installed, handler))
    }

    fn installed(&self) -> Option<Handler> {
        HOST.with(|host| host.borrow().installed.clone())
    }

    fn attach(&self, frame: &Frame, handler: Handler) {
        frame.set_trace(Some(handler));
    }

    fn current_frame(&self) -> Option<Frame> {
        HOST.with(|host| host.borrow().frames.last().cloned())
    }

    fn history_input(&self, entry: usize) -> Option<String> {
        SESSION_HISTORY.lock().get(&entry).cloned()
    }
}

/// Binds the declared parameters of `code` to `args`, checking arity.
pub(crate) fn bind_params(
    code: &CodeObject,
    args: &[Value],
) -> crate::Result<IndexMap<String, Value>> {
    let params = code.params();

    if params.len() != args.len() {
        return Err(crate::Error::Arity {
            function: code.name().to_owned(),
            expected: params.len(),
            got: args.len(),
        });
    }

    Ok(params.iter().cloned().zip(args.iter().cloned()).collect())
}
