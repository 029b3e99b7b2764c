//! Variable watches and per-frame snapshots.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::runtime::{Frame, Value};

/// Predicate selecting the values a custom representation applies to.
pub type ReprPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Custom short-representation function.
pub type ReprFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Read access to the variables of a frame, as seen by watches.
pub trait VariableLookup {
    /// Looks a binding up by name.
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<F: Frame> VariableLookup for F {
    fn lookup(&self, name: &str) -> Option<Value> {
        Frame::lookup(self, name)
    }
}

/// Trait for implementing a watch specification.
///
/// A watch reports (key, value) pairs for one frame; its values are tracked
/// and reported regardless of the only-watched-variables toggle. Keys are
/// merged into the snapshot in ascending lexical order per watch.
pub trait Watch: Send + Sync {
    /// Returns the values this watch reports for the given frame.
    ///
    /// A name that is not bound in the frame reports nothing.
    fn values(&self, vars: &dyn VariableLookup) -> Vec<(String, Value)>;
}

/// Watch reporting a single variable under its own name.
pub struct PlainWatch {
    name: String,
}

impl PlainWatch {
    /// Creates a watch for the given variable name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Watch for PlainWatch {
    fn values(&self, vars: &dyn VariableLookup) -> Vec<(String, Value)> {
        vars.lookup(&self.name)
            .map(|value| (self.name.clone(), value))
            .into_iter()
            .collect()
    }
}

/// Watch reporting a variable and, when it is a container, each of its
/// elements as an individual entry (`name[0]`, `name['key']`, ...).
pub struct ExplodingWatch {
    name: String,
}

impl ExplodingWatch {
    /// Creates an exploding watch for the given variable name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Watch for ExplodingWatch {
    fn values(&self, vars: &dyn VariableLookup) -> Vec<(String, Value)> {
        let Some(value) = vars.lookup(&self.name) else {
            return Vec::new();
        };

        let mut values = vec![(self.name.clone(), value.clone())];

        match value {
            Value::List(items) => {
                values.extend(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| (format!("{}[{i}]", self.name), item)),
                );
            }
            Value::Map(entries) => {
                values.extend(
                    entries
                        .into_iter()
                        .map(|(key, item)| (format!("{}['{key}']", self.name), item)),
                );
            }
            _ => (),
        }

        values
    }
}

/// Snapshot of a frame's variables: name → (value, rendered short text).
pub(crate) type Snapshot = IndexMap<String, (Value, String)>;

/// Short-representation renderer, shared by variable reporting and
/// return-value reporting.
pub(crate) struct ValueRenderer {
    custom: Vec<(ReprPredicate, ReprFn)>,

    /// Maximum rendered length; `None` disables truncation.
    max_length: Option<usize>,
}

impl ValueRenderer {
    pub(crate) const fn new(custom: Vec<(ReprPredicate, ReprFn)>, max_length: Option<usize>) -> Self {
        Self { custom, max_length }
    }

    /// Renders a value, applying the first matching custom representation
    /// and the configured length bound.
    pub(crate) fn render(&self, value: &Value) -> String {
        let rendered = self
            .custom
            .iter()
            .find(|(applies, _)| applies(value))
            .map_or_else(|| value.render(), |(_, repr)| repr(value));

        match self.max_length {
            Some(max) => truncate(&rendered, max),
            None => rendered,
        }
    }

    /// Truncates free-form text (e.g. exception messages) to the configured
    /// bound.
    pub(crate) fn clip(&self, text: &str) -> String {
        match self.max_length {
            Some(max) => truncate(text, max),
            None => text.to_owned(),
        }
    }
}

/// Captures the current snapshot of a frame.
///
/// Order: the frame's own bindings (declared parameters first, then
/// insertion order) unless `only_watch` is set, then each watch's values in
/// ascending lexical order of the watch's reported keys.
pub(crate) fn capture<F: Frame>(
    frame: &F,
    watches: &[Arc<dyn Watch>],
    renderer: &ValueRenderer,
    only_watch: bool,
) -> Snapshot {
    let mut snapshot = Snapshot::new();

    if !only_watch {
        for (name, value) in frame.bindings() {
            let rendered = renderer.render(&value);
            snapshot.insert(name, (value, rendered));
        }
    }

    for watch in watches {
        let mut values = watch.values(frame);
        values.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (name, value) in values {
            let rendered = renderer.render(&value);
            snapshot.insert(name, (value, rendered));
        }
    }

    snapshot
}

/// Shortens `text` to exactly `max_length` characters, marker included,
/// keeping the head and tail of the original.
fn truncate(text: &str, max_length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= max_length {
        return text.to_owned();
    }

    if max_length <= 3 {
        return "...".chars().take(max_length).collect();
    }

    let left = (max_length - 3) / 2;
    let right = max_length - 3 - left;

    let mut result: String = chars[..left].iter().collect();
    result.push_str("...");
    result.extend(&chars[chars.len() - right..]);
    result
}
