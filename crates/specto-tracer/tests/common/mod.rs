use std::sync::{Arc, Mutex};

use specto_runtime::Engine;
use specto_tracer::sink::Output;
use specto_tracer::tracer::{Builder, Configured, Tracer};

/// Sink capturing the emitted log in memory.
#[derive(Clone, Default)]
pub struct Capture {
    buffer: Arc<Mutex<String>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> Output {
        let buffer = Arc::clone(&self.buffer);

        Output::Callable(Box::new(move |line| {
            buffer.lock().unwrap().push_str(line);
        }))
    }

    pub fn text(&self) -> String {
        self.buffer.lock().unwrap().clone()
    }

    /// Captured text with elapsed durations replaced by a fixed token, for
    /// exact comparisons.
    pub fn scrubbed(&self) -> String {
        scrub_durations(&self.text())
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_owned).collect()
    }
}

pub fn scrub_durations(text: &str) -> String {
    let pattern = regex::Regex::new(r"Elapsed time: \d{2}:\d{2}:\d{2}\.\d{6}").unwrap();

    pattern
        .replace_all(text, "Elapsed time: <duration>")
        .into_owned()
}

/// Tracer builder preconfigured the way most tests want it: capturing
/// output, reporting full locals.
pub fn tracer(engine: Engine, capture: &Capture) -> Builder<Configured<Engine>> {
    Tracer::builder()
        .with_runtime(engine)
        .output(capture.output())
        .only_watch(false)
}

/// Replays the emitted call/line/return events and checks they form a
/// valid depth-labeled call tree; returns the maximum depth reached.
pub fn replay_call_tree(lines: &[String]) -> usize {
    let event = regex::Regex::new(r"^( *) {16}(call|line|return|exception) ").unwrap();

    let mut depth: i64 = 0;
    let mut max_depth: usize = 0;

    for line in lines {
        let Some(captures) = event.captures(line) else {
            continue;
        };

        let indent = captures[1].len() as i64;
        assert_eq!(indent % 4, 0, "indentation is a multiple of 4: {line}");

        let event_depth = indent / 4;

        match &captures[2] {
            "call" => {
                assert_eq!(event_depth, depth, "call enters one level: {line}");
                depth += 1;
                max_depth = max_depth.max(depth as usize);
            }
            "return" => {
                assert_eq!(event_depth, depth - 1, "return leaves one level: {line}");
                depth -= 1;
                assert!(depth >= 0, "depth never goes negative: {line}");
            }
            _ => {
                assert_eq!(event_depth, depth - 1, "step stays on its level: {line}");
            }
        }
    }

    assert_eq!(depth, 0, "every call returned");

    max_depth
}
