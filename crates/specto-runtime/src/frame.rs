use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use specto_tracer::Value;
use specto_tracer::runtime::FrameId;

use crate::code::CodeObject;
use crate::engine::Handler;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// Activation frame of a hosted callable.
///
/// A frame lives on the thread that entered it and never crosses threads;
/// cloning yields another handle to the same frame.
#[derive(Clone)]
pub struct Frame {
    inner: Rc<FrameInner>,
}

struct FrameInner {
    id: FrameId,
    code: Arc<CodeObject>,
    parent: Option<Frame>,
    line: Cell<u32>,

    /// Variable bindings: declared parameters first, then insertion order.
    bindings: RefCell<IndexMap<String, Value>>,

    /// Step callback attached to this frame, fed its line/return/exception
    /// steps.
    trace: RefCell<Option<Handler>>,
}

impl Frame {
    pub(crate) fn new(
        code: Arc<CodeObject>,
        parent: Option<Frame>,
        bindings: IndexMap<String, Value>,
    ) -> Self {
        let first_line = code.first_line();

        Self {
            inner: Rc::new(FrameInner {
                id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
                code,
                parent,
                line: Cell::new(first_line),
                bindings: RefCell::new(bindings),
                trace: RefCell::new(None),
            }),
        }
    }

    /// Returns the code object this frame executes.
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.inner.code
    }

    pub(crate) fn set_line(&self, line: u32) {
        self.inner.line.set(line);
    }

    pub(crate) fn bind(&self, name: &str, value: Value) {
        self.inner.bindings.borrow_mut().insert(name.to_owned(), value);
    }

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.inner.bindings.borrow().get(name).cloned()
    }

    pub(crate) fn trace(&self) -> Option<Handler> {
        self.inner.trace.borrow().clone()
    }

    pub(crate) fn set_trace(&self, handler: Option<Handler>) {
        *self.inner.trace.borrow_mut() = handler;
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.inner.id)
            .field("code", &self.inner.code.name())
            .field("line", &self.inner.line.get())
            .finish_non_exhaustive()
    }
}

impl specto_tracer::runtime::Frame for Frame {
    fn id(&self) -> FrameId {
        self.inner.id
    }

    fn code_id(&self) -> u64 {
        self.inner.code.id()
    }

    fn module_name(&self) -> Option<String> {
        self.inner.code.module().map(str::to_owned)
    }

    fn source_path(&self) -> PathBuf {
        self.inner.code.path().to_path_buf()
    }

    fn line(&self) -> u32 {
        self.inner.line.get()
    }

    fn parent(&self) -> Option<Self> {
        self.inner.parent.clone()
    }

    fn bindings(&self) -> Vec<(String, Value)> {
        self.inner
            .bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn module_source(&self) -> Option<String> {
        self.inner.code.source().map(str::to_owned)
    }
}
