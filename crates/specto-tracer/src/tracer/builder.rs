use std::marker::PhantomData;
use std::sync::Arc;

use super::{Shared, Tracer};
use crate::record::{NullRecordSink, RecordSink};
use crate::runtime::{Runtime, Value};
use crate::sink::{Output, SinkWriter};
use crate::watch::{ExplodingWatch, PlainWatch, ReprFn, ReprPredicate, ValueRenderer, Watch};

/// Builder for [Tracer].
///
/// It is usually created by calling [Tracer::builder], and allows to
/// specify which host runtime to trace and how the trace is reported.
/// Configuration is validated eagerly by [build](Self::build).
pub struct Builder<S> {
    state: S,
}

impl<R: Runtime> Builder<NeedsRuntime<R>> {
    pub(super) const fn new() -> Self {
        Self {
            state: NeedsRuntime(PhantomData),
        }
    }

    /// Specifies the host runtime whose steps are traced.
    pub fn with_runtime(self, runtime: R) -> Builder<Configured<R>> {
        Builder {
            state: Configured {
                runtime,
                recorder: Arc::new(NullRecordSink),
                watches: Vec::new(),
                custom_repr: Vec::new(),
                depth: 1,
                prefix: String::new(),
                output: None,
                overwrite: false,
                default_output: true,
                thread_label: false,
                max_variable_length: 100,
                relative_time: false,
                only_watch: true,
            },
        }
    }
}

impl<R: Runtime> Builder<Configured<R>> {
    /// Specifies the record stream the tracer feeds.
    pub fn with_recorder(mut self, recorder: Arc<dyn RecordSink>) -> Self {
        self.state.recorder = recorder;
        self
    }

    /// Adds a watched variable, reported under its own name.
    pub fn watch(mut self, name: impl Into<String>) -> Self {
        self.state.watches.push(Arc::new(PlainWatch::new(name)));
        self
    }

    /// Adds several watched variables at once.
    pub fn watches<I>(self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        names.into_iter().fold(self, |builder, name| builder.watch(name))
    }

    /// Adds an exploding watch: the variable is reported along with each of
    /// its container elements as an individual entry.
    pub fn watch_explode(mut self, name: impl Into<String>) -> Self {
        self.state.watches.push(Arc::new(ExplodingWatch::new(name)));
        self
    }

    /// Adds a custom watch specification.
    pub fn watch_object(mut self, watch: Arc<dyn Watch>) -> Self {
        self.state.watches.push(watch);
        self
    }

    /// Specifies how many call levels below a trace target are traced.
    ///
    /// Must be at least 1 (the default: only the targets themselves).
    pub fn depth(mut self, depth: usize) -> Self {
        self.state.depth = depth;
        self
    }

    /// Specifies a prefix prepended to every log line.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.state.prefix = prefix.into();
        self
    }

    /// Specifies the output target of the log.
    pub fn output(mut self, output: impl Into<Output>) -> Self {
        self.state.output = Some(output.into());
        self
    }

    /// Truncates the log file on the first write instead of appending.
    ///
    /// Only valid when the output target is a file path.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.state.overwrite = overwrite;
        self
    }

    /// Toggles the default output.
    ///
    /// When toggled off and no explicit target is set, the log goes to the
    /// process-wide fallback log path (see
    /// [set_default_log_path](crate::sink::set_default_log_path)) when one
    /// is configured.
    pub fn default_output(mut self, default_output: bool) -> Self {
        self.state.default_output = default_output;
        self
    }

    /// Toggles the thread label column.
    pub fn thread_label(mut self, enabled: bool) -> Self {
        self.state.thread_label = enabled;
        self
    }

    /// Adds a custom short representation, applied to every value matching
    /// the predicate.
    pub fn custom_repr(mut self, applies: ReprPredicate, repr: ReprFn) -> Self {
        self.state.custom_repr.push((applies, repr));
        self
    }

    /// Adds a custom short representation for non-container values.
    pub fn custom_scalar_repr(
        self,
        repr: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.custom_repr(Arc::new(|value: &Value| !value.is_container()), Arc::new(repr))
    }

    /// Adds a custom short representation for container values.
    pub fn custom_container_repr(
        self,
        repr: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.custom_repr(Arc::new(Value::is_container), Arc::new(repr))
    }

    /// Specifies the maximum rendered length of variables, return values
    /// and exception texts. `0` disables truncation. Defaults to 100.
    pub fn max_variable_length(mut self, max: usize) -> Self {
        self.state.max_variable_length = max;
        self
    }

    /// Renders the elapsed time since the tracer was built in the timestamp
    /// column instead of leaving it blank.
    pub fn relative_time(mut self, enabled: bool) -> Self {
        self.state.relative_time = enabled;
        self
    }

    /// Toggles whether only watched variables are reported.
    ///
    /// Defaults to `true`; toggling it off reports the full local bindings
    /// of every traced frame.
    pub fn only_watch(mut self, only_watch: bool) -> Self {
        self.state.only_watch = only_watch;
        self
    }

    /// Builds the tracer.
    ///
    /// Fails eagerly on an invalid configuration: a depth below 1, or the
    /// `overwrite` toggle combined with a non-file output target.
    pub fn build(self) -> crate::Result<Tracer<R>> {
        let state = self.state;

        if state.depth < 1 {
            return Err(crate::Error::InvalidDepth(state.depth));
        }

        let sink = SinkWriter::new(state.output, state.overwrite, state.default_output)?;

        let max_length = (state.max_variable_length > 0).then_some(state.max_variable_length);
        let renderer = ValueRenderer::new(state.custom_repr, max_length);

        Ok(Tracer {
            inner: Arc::new(Shared::new(
                state.runtime,
                state.recorder,
                state.watches,
                renderer,
                state.depth,
                state.prefix,
                state.thread_label,
                state.relative_time,
                state.only_watch,
                sink,
            )),
        })
    }
}

/// Builder state: the host runtime is not chosen yet.
pub struct NeedsRuntime<R>(PhantomData<R>);

/// Builder state: the host runtime is chosen, options may be set.
pub struct Configured<R: Runtime> {
    runtime: R,
    recorder: Arc<dyn RecordSink>,
    watches: Vec<Arc<dyn Watch>>,
    custom_repr: Vec<(ReprPredicate, ReprFn)>,
    depth: usize,
    prefix: String,
    output: Option<Output>,
    overwrite: bool,
    default_output: bool,
    thread_label: bool,
    max_variable_length: usize,
    relative_time: bool,
    only_watch: bool,
}
