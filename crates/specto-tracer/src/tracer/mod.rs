mod builder;
mod scope;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub use self::builder::{Builder, Configured, NeedsRuntime};
pub use self::scope::TraceScope;
use crate::context::{self, ThreadContext};
use crate::record::RecordSink;
use crate::runtime::{
    CodeId, Continuation, Frame, FrameId, INTERNAL_PATH, InstalledHandler, Runtime, Step,
    StepHandler, Value,
};
use crate::sink::SinkWriter;
use crate::source;
use crate::watch::{Snapshot, ValueRenderer, Watch};
use crate::wrap::tracing_disabled;

/// Line-level execution tracer.
///
/// A tracer is built over a host runtime ([Tracer::builder]) and activated
/// around a region of hosted code ([Tracer::activate]). While a scope is
/// active on a thread, the tracer is that thread's installed step callback:
/// it filters the steps belonging to the traced region, reports control
/// flow and variable changes to its output sink, and feeds its record
/// stream.
///
/// Cloning a tracer is cheap and yields a handle to the same session state.
pub struct Tracer<R: Runtime> {
    inner: Arc<Shared<R>>,
}

impl<R: Runtime> Clone for Tracer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Runtime> Tracer<R> {
    /// Creates a tracer builder.
    pub const fn builder() -> Builder<NeedsRuntime<R>> {
        Builder::new()
    }

    /// Returns the host runtime this tracer is built over.
    pub fn runtime(&self) -> &R {
        &self.inner.runtime
    }

    /// Registers a code object as a trace target.
    ///
    /// Every frame executing this code object is traced while a scope is
    /// active, at any call depth. This is how the instrumentation wrappers
    /// mark the callables they wrap.
    pub fn add_target_code(&self, code_id: CodeId) {
        self.inner.target_codes.lock().insert(code_id);
    }

    /// Activates tracing on the calling thread until the returned scope is
    /// dropped.
    ///
    /// The previously installed step callback is saved and restored on drop
    /// (on every exit path, unwinding included). If the runtime reports a
    /// current frame that does not belong to the tracing machinery, that
    /// frame is registered as a trace target and the callback is attached
    /// to it, so the remainder of its body is traced too.
    ///
    /// Nested activations on the same thread are legal and stack.
    pub fn activate(&self) -> TraceScope<R> {
        if tracing_disabled() {
            return TraceScope::inert();
        }

        let handler: InstalledHandler<R> = self.inner.clone();

        let mut scope_frame = None;
        if let Some(frame) = self.inner.runtime.current_frame() {
            if !is_internal(&frame) {
                self.inner.runtime.attach(&frame, handler.clone());
                self.inner.target_frames.lock().insert(frame.id());
                scope_frame = Some(frame.id());
            }
        }

        let previous = self.inner.runtime.install(Some(handler));

        let thread = std::thread::current().id();
        self.inner
            .saved_handlers
            .lock()
            .entry(thread)
            .or_default()
            .push(previous);

        tracing::debug!(?thread, "trace scope entered");

        TraceScope::new(self.clone(), scope_frame, thread)
    }

    /// Traces a single invocation: activates a scope, runs `f`, and
    /// deactivates before handing the result back unchanged.
    pub fn trace_call<T>(&self, f: impl FnOnce() -> T) -> T {
        let _scope = self.activate();
        f()
    }
}

/// Session state shared between tracer handles, the active scopes, and the
/// installed step callback.
pub(crate) struct Shared<R: Runtime> {
    pub(crate) runtime: R,

    /// Record stream fed with line visits and variable changes.
    recorder: Arc<dyn RecordSink>,

    /// Watch specifications, evaluated at every step.
    watches: Vec<Arc<dyn Watch>>,

    /// Short-representation renderer for variables and return values.
    renderer: ValueRenderer,

    /// Maximum call depth to trace below a target (≥ 1).
    depth: usize,

    /// Prefix prepended to every log line.
    prefix: String,

    thread_label: bool,
    relative_time: bool,
    only_watch: bool,

    created: Instant,

    sink: Mutex<SinkWriter>,

    /// Code objects to trace (registered by the wrappers).
    target_codes: Mutex<HashSet<CodeId>>,

    /// Frames to trace (scope-entry frames, registered on activation).
    pub(crate) target_frames: Mutex<HashSet<FrameId>>,

    /// Last-seen variable snapshot, per live traced frame.
    pub(crate) frame_snapshots: Mutex<HashMap<FrameId, Snapshot>>,

    /// Saved previously-installed callbacks, one stack per thread.
    pub(crate) saved_handlers: Mutex<HashMap<ThreadId, Vec<Option<InstalledHandler<R>>>>>,

    /// Source path of the last emitted step, to report path changes once.
    last_source_path: Mutex<Option<PathBuf>>,

    /// High-water mark of the thread label column width.
    label_width: AtomicUsize,
}

impl<R: Runtime> Shared<R> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        runtime: R,
        recorder: Arc<dyn RecordSink>,
        watches: Vec<Arc<dyn Watch>>,
        renderer: ValueRenderer,
        depth: usize,
        prefix: String,
        thread_label: bool,
        relative_time: bool,
        only_watch: bool,
        sink: SinkWriter,
    ) -> Self {
        Self {
            runtime,
            recorder,
            watches,
            renderer,
            depth,
            prefix,
            thread_label,
            relative_time,
            only_watch,
            created: Instant::now(),
            sink: Mutex::new(sink),
            target_codes: Mutex::default(),
            target_frames: Mutex::default(),
            frame_snapshots: Mutex::default(),
            saved_handlers: Mutex::default(),
            last_source_path: Mutex::default(),
            label_width: AtomicUsize::new(0),
        }
    }

    pub(crate) fn write(&self, text: &str) {
        let line = format!("{}{}\n", self.prefix, text);
        self.sink.lock().write_line(&line);
    }

    fn is_target(&self, code_id: CodeId, frame_id: FrameId) -> bool {
        self.target_codes.lock().contains(&code_id)
            || self.target_frames.lock().contains(&frame_id)
    }

    /// Timestamp column: blank, or the elapsed time since the tracer was
    /// built when the relative-time toggle is set.
    fn timestamp(&self) -> String {
        if self.relative_time {
            format!("{} ", format_duration(self.created.elapsed()))
        } else {
            " ".repeat(16)
        }
    }

    /// Thread label column, left-justified to the widest label seen so far.
    fn padded_thread_label(&self) -> String {
        let label = format!("{} ", ThreadContext::with(|cx| cx.label()));

        let seen = self.label_width.fetch_max(label.len(), Ordering::Relaxed);
        let width = seen.max(label.len());

        format!("{label:<width$}")
    }

    fn report_source_path(&self, indent: &str, path: &std::path::Path) {
        let mut last = self.last_source_path.lock();

        if last.as_deref() != Some(path) {
            self.write(&format!("{indent}Source path:... {}", path.display()));
            *last = Some(path.to_path_buf());
        }
    }
}

impl<R: Runtime> StepHandler<R> for Shared<R> {
    fn on_step(&self, runtime: &R, frame: &R::Frame, step: &Step) -> Continuation {
        let code_id = frame.code_id();
        let frame_id = frame.id();

        if !self.is_target(code_id, frame_id) {
            // The callback runs for every step the host takes while any
            // tracer is active, so the depth-1 rejection must stay the
            // quickest possible check.
            if self.depth == 1 {
                return Continuation::Skip;
            }

            if is_internal(frame) {
                return Continuation::Skip;
            }

            let mut candidate = frame.parent();
            let mut matched = false;

            for _ in 1..self.depth {
                match candidate {
                    None => return Continuation::Skip,
                    Some(parent) => {
                        if self.is_target(parent.code_id(), parent.id()) {
                            matched = true;
                            break;
                        }

                        candidate = parent.parent();
                    }
                }
            }

            if !matched {
                return Continuation::Skip;
            }
        }

        let is_call = matches!(step, Step::Call);

        let depth = ThreadContext::with(|cx| {
            if is_call {
                cx.register_call()
            } else {
                cx.depth()
            }
        });
        let indent = context::indent(depth);

        let timestamp = self.timestamp();

        let mut line_no = frame.line();
        let resolved = source::resolve(runtime, frame);

        self.report_source_path(&indent, resolved.path());

        let mut source_line = resolved.line(line_no).to_owned();

        let thread_label = if self.thread_label {
            self.padded_thread_label()
        } else {
            String::new()
        };

        // A call landing on a decorated definition reports the `fn` line
        // that follows, not the decorator line itself.
        if is_call && source_line.trim_start().starts_with('@') {
            let mut candidate = line_no;

            while let Some(count) = resolved.line_count() {
                if usize::try_from(candidate).is_ok_and(|n| n > count) {
                    // end of source reached, keep the original line
                    break;
                }

                let text = resolved.line(candidate);
                if text.trim_start().starts_with("fn") {
                    line_no = candidate;
                    source_line = text.to_owned();
                    break;
                }

                candidate += 1;
            }
        }

        if !matches!(step, Step::Return { .. }) {
            self.recorder.add_record(line_no);
        }

        let previous = self
            .frame_snapshots
            .lock()
            .get(&frame_id)
            .cloned()
            .unwrap_or_default();

        let current = crate::watch::capture(frame, &self.watches, &self.renderer, self.only_watch);
        self.frame_snapshots
            .lock()
            .insert(frame_id, current.clone());

        for (name, (value, rendered)) in &current {
            match previous.get(name) {
                None => {
                    if is_call {
                        self.recorder.add_variable_change_to_last_record(name, value);
                    } else {
                        self.recorder
                            .add_variable_change_to_previous_record(name, value);
                    }

                    let label = if is_call {
                        "Starting var:.. "
                    } else {
                        "New var:....... "
                    };
                    self.write(&format!("{indent}{label}{name} = {rendered}"));
                }
                Some((_, seen)) if seen != rendered => {
                    self.recorder
                        .add_variable_change_to_previous_record(name, value);
                    self.write(&format!("{indent}Modified var:.. {name} = {rendered}"));
                }
                Some(_) => (),
            }
        }

        // A frame unwound by an error still reports a return step, with no
        // value and the completion flag cleared.
        let ended_by_exception = matches!(
            step,
            Step::Return {
                value: None,
                completed: false,
            }
        );

        if ended_by_exception {
            self.write(&format!("{indent}Call ended by exception"));
        } else {
            let label = step.label();
            self.write(&format!(
                "{indent}{timestamp}{thread_label}{label:<9} {line_no:>4} {source_line}"
            ));
        }

        if let Step::Return { value, .. } = step {
            self.frame_snapshots.lock().remove(&frame_id);
            ThreadContext::with(|cx| cx.register_return());

            if !ended_by_exception {
                let rendered = self.renderer.render(value.as_ref().unwrap_or(&Value::None));
                self.write(&format!("{indent}Return value:.. {rendered}"));
            }
        }

        if let Step::Exception(info) = step {
            let text = self.renderer.clip(&format!("{}: {}", info.kind, info.message));
            self.write(&format!("{indent}Exception:..... {text}"));
        }

        Continuation::Trace
    }
}

/// Returns whether the frame belongs to the tracing machinery itself.
pub(crate) fn is_internal<F: Frame>(frame: &F) -> bool {
    frame.source_path().as_os_str() == INTERNAL_PATH
}

/// Formats a duration the way elapsed times appear in the log:
/// `HH:MM:SS.ffffff`.
pub(crate) fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();

    format!(
        "{:02}:{:02}:{:02}.{:06}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60,
        duration.subsec_micros()
    )
}

#[cfg(test)]
mod tests {
    use super::format_duration;
    use std::time::Duration;

    #[test]
    fn duration_format_is_fixed_width() {
        assert_eq!(format_duration(Duration::from_micros(123)), "00:00:00.000123");
        assert_eq!(format_duration(Duration::from_secs(3661)), "01:01:01.000000");
    }
}
