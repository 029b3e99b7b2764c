mod value;

use std::path::PathBuf;
use std::sync::Arc;

pub use self::value::Value;

/// Identity of a code object within the host runtime.
///
/// Two callables share a `CodeId` only if they share the same underlying
/// code object.
pub type CodeId = u64;

/// Identity of an activation frame within the host runtime.
pub type FrameId = u64;

/// Source path carried by the code objects of instrumentation wrappers.
///
/// Frames whose code resolves to this path belong to the tracing machinery
/// itself and are never registered as trace targets.
pub const INTERNAL_PATH: &str = "<specto>";

/// Step callback installed into a host runtime.
pub type InstalledHandler<R> = Arc<dyn StepHandler<R>>;

/// Trait implementing the instrumentation port of a host runtime.
///
/// The runtime owns one callback slot **per thread**: installing a handler
/// only affects step delivery on the calling thread, and the previously
/// installed handler is handed back so it can be restored later.
pub trait Runtime: Send + Sync + Sized + 'static {
    /// Type of an activation frame of this runtime.
    type Frame: Frame;

    /// Installs `handler` as the step callback of the calling thread and
    /// returns the previously installed one.
    ///
    /// Passing `None` uninstalls the current callback.
    fn install(&self, handler: Option<InstalledHandler<Self>>) -> Option<InstalledHandler<Self>>;

    /// Returns the step callback currently installed on the calling thread.
    fn installed(&self) -> Option<InstalledHandler<Self>>;

    /// Attaches `handler` to an already-running frame, so that the frame's
    /// own steps (lines, return, errors) are delivered to it even though
    /// the handler was not installed when the frame was entered.
    fn attach(&self, frame: &Self::Frame, handler: InstalledHandler<Self>);

    /// Returns the frame currently executing on the calling thread, if any.
    fn current_frame(&self) -> Option<Self::Frame>;

    /// Returns the text of a historical interactive-session input.
    ///
    /// Consulted by the source locator when a frame's source path matches
    /// the synthetic `<session-input-N>` pattern.
    fn history_input(&self, entry: usize) -> Option<String> {
        let _ = entry;
        None
    }
}

/// Trait providing read access to an activation frame of a host runtime.
pub trait Frame: Clone {
    /// Returns the frame's identity.
    fn id(&self) -> FrameId;

    /// Returns the identity of the code object the frame executes.
    fn code_id(&self) -> CodeId;

    /// Returns the name of the module the frame's code belongs to.
    fn module_name(&self) -> Option<String>;

    /// Returns the source path of the frame's code.
    fn source_path(&self) -> PathBuf;

    /// Returns the line the frame is currently positioned on (1-based).
    fn line(&self) -> u32;

    /// Returns the frame of the caller, if any.
    fn parent(&self) -> Option<Self>;

    /// Returns the frame's variable bindings.
    ///
    /// The order is stable and documented: declared parameters first, then
    /// additional bindings in insertion order.
    fn bindings(&self) -> Vec<(String, Value)>;

    /// Looks a single binding up by name.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Returns the source text provided by the frame's module, if the
    /// module carries one (e.g., synthetic code with no backing file).
    fn module_source(&self) -> Option<String>;
}

/// Trait for implementing a step callback.
pub trait StepHandler<R: Runtime>: Send + Sync {
    /// Function called by the host runtime for every step it takes while
    /// this handler is installed (or attached to the stepping frame).
    fn on_step(&self, runtime: &R, frame: &R::Frame, step: &Step) -> Continuation;
}

/// One execution step taken by the host runtime.
#[derive(Debug, Clone)]
pub enum Step {
    /// A frame was entered (function call or resumption).
    Call,

    /// A line of the current frame is about to execute.
    Line,

    /// The current frame is being left.
    Return {
        /// Value produced by the frame, if it completed normally.
        ///
        /// `None` strictly means the frame was unwound by an error.
        value: Option<Value>,

        /// Whether the frame completed normally (plain return or yield)
        /// rather than being unwound by an error.
        completed: bool,
    },

    /// An error was raised in the current frame.
    Exception(ExceptionInfo),
}

impl Step {
    /// Returns the label of this step kind, as written in the trace log.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Line => "line",
            Self::Return { .. } => "return",
            Self::Exception(_) => "exception",
        }
    }
}

/// Description of an error raised by hosted code.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Kind of the error (e.g. `ValueError`).
    pub kind: String,

    /// Error message.
    pub message: String,
}

/// Decision returned by a step callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Keep delivering the finer-grained steps of the current frame to
    /// this handler.
    Trace,

    /// Stop instrumenting the current frame (nested frames entered later
    /// still consult the installed callback).
    Skip,
}
