use std::thread::ThreadId;
use std::time::Instant;

use super::{Tracer, format_duration};
use crate::context::{self, ThreadContext};
use crate::runtime::{FrameId, Runtime};

/// Active tracing scope.
///
/// Returned by [Tracer::activate]; dropping it deactivates the scope:
/// the previously installed step callback is restored, the scope-entry
/// frame is unregistered, and the elapsed wall-clock time is written to the
/// log. Drop runs on every exit path, so restoration is guaranteed even
/// when the traced region unwinds.
///
/// The scope must be dropped on the thread that activated it.
#[must_use = "tracing stops when the scope is dropped"]
pub struct TraceScope<R: Runtime> {
    /// `None` for the inert scope handed out while instrumentation is
    /// disabled process-wide.
    tracer: Option<Tracer<R>>,

    /// Scope-entry frame registered at activation, if any.
    frame: Option<FrameId>,

    start: Instant,
    thread: ThreadId,
}

impl<R: Runtime> TraceScope<R> {
    pub(super) fn new(tracer: Tracer<R>, frame: Option<FrameId>, thread: ThreadId) -> Self {
        Self {
            tracer: Some(tracer),
            frame,
            start: Instant::now(),
            thread,
        }
    }

    pub(super) fn inert() -> Self {
        Self {
            tracer: None,
            frame: None,
            start: Instant::now(),
            thread: std::thread::current().id(),
        }
    }
}

impl<R: Runtime> Drop for TraceScope<R> {
    fn drop(&mut self) {
        let Some(tracer) = self.tracer.take() else {
            return;
        };

        let shared = &tracer.inner;

        let saved = shared
            .saved_handlers
            .lock()
            .get_mut(&self.thread)
            .and_then(Vec::pop)
            .flatten();
        shared.runtime.install(saved);

        if let Some(frame) = self.frame {
            shared.target_frames.lock().remove(&frame);
            shared.frame_snapshots.lock().remove(&frame);
        }

        let depth = ThreadContext::with(|cx| cx.depth());
        let indent = context::indent(depth + 1);
        let elapsed = format_duration(self.start.elapsed());

        shared.write(&format!("{indent}Elapsed time: {elapsed}"));

        tracing::debug!(thread = ?self.thread, "trace scope exited");
    }
}
