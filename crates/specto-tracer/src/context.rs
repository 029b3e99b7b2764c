use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter handing out the small numeric thread labels used in the log.
static NEXT_THREAD_ORDINAL: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONTEXT: RefCell<ThreadContext> = RefCell::new(ThreadContext::new());
}

/// Per-thread tracer bookkeeping, created on first use and torn down with
/// the thread.
///
/// The call depth is shared by every tracer active on the thread, so nested
/// scopes indent consistently.
pub(crate) struct ThreadContext {
    /// Current call depth. Starts below zero so the first traced call lands
    /// on depth 0 (no indentation).
    depth: i64,

    /// Ordinal of this thread, for the thread label column.
    ordinal: u64,
}

impl ThreadContext {
    fn new() -> Self {
        Self {
            depth: -1,
            ordinal: NEXT_THREAD_ORDINAL.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Runs `f` with the calling thread's context.
    pub(crate) fn with<T>(f: impl FnOnce(&mut Self) -> T) -> T {
        CONTEXT.with(|cx| f(&mut cx.borrow_mut()))
    }

    /// Returns the current call depth.
    pub(crate) const fn depth(&self) -> i64 {
        self.depth
    }

    /// Registers a frame entry and returns the new depth.
    pub(crate) const fn register_call(&mut self) -> i64 {
        self.depth += 1;
        self.depth
    }

    /// Registers a frame exit.
    pub(crate) const fn register_return(&mut self) {
        self.depth -= 1;
    }

    /// Returns the label of the calling thread: `<ordinal>-<name>`.
    pub(crate) fn label(&self) -> String {
        let thread = std::thread::current();
        format!("{}-{}", self.ordinal, thread.name().unwrap_or("unnamed"))
    }
}

/// Returns the indentation for the given call depth.
pub(crate) fn indent(depth: i64) -> String {
    " ".repeat(4 * usize::try_from(depth).unwrap_or(0))
}
