//! Source text resolution for traced frames.
//!
//! Resolved sources are cached for the lifetime of the process, keyed by
//! (module name, file path) — traced sources do not change. The cache has no
//! eviction; this is acceptable for short-lived trace sessions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;

use crate::runtime::{Frame, Runtime};

/// Line text substituted when a frame's source cannot be obtained.
pub const UNAVAILABLE_LINE: &str = "SOURCE IS UNAVAILABLE";

/// Synthetic file name given to interactive-session inputs.
static SESSION_INPUT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^<session-input-([0-9]+)>$").ok());

/// Encoding declaration recognized in the first two lines of a source file.
static ENCODING_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"coding[:=]\s*([-\w.]+)").ok());

static SOURCE_CACHE: LazyLock<Mutex<HashMap<SourceKey, Arc<SourceText>>>> =
    LazyLock::new(Mutex::default);

type SourceKey = (Option<String>, PathBuf);

/// Source text of one code object, resolved once per (module, path) pair.
#[derive(Debug)]
pub struct SourceText {
    path: PathBuf,

    /// `None` when no source could be obtained by any path.
    lines: Option<Vec<String>>,
}

impl SourceText {
    /// Returns the canonical path of this source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the text of the given line (1-based).
    ///
    /// Every line of an unavailable source reads as [UNAVAILABLE_LINE];
    /// lines past the end of an available source read as empty.
    pub fn line(&self, line_no: u32) -> &str {
        let Some(lines) = &self.lines else {
            return UNAVAILABLE_LINE;
        };

        usize::try_from(line_no)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|n| lines.get(n))
            .map_or("", String::as_str)
    }

    /// Returns the number of lines, if the source is available.
    pub fn line_count(&self) -> Option<usize> {
        self.lines.as_ref().map(Vec::len)
    }
}

/// Resolves the source text and canonical path for the given frame.
pub fn resolve<R: Runtime>(runtime: &R, frame: &R::Frame) -> Arc<SourceText> {
    let key = (frame.module_name(), frame.source_path());

    if let Some(source) = SOURCE_CACHE.lock().get(&key) {
        return Arc::clone(source);
    }

    let path = key.1.clone();
    let lines = fetch_lines(runtime, frame, &path);

    if lines.is_none() {
        tracing::debug!(path = %path.display(), "source unavailable");
    }

    let source = Arc::new(SourceText { path, lines });
    SOURCE_CACHE.lock().insert(key, Arc::clone(&source));

    source
}

fn fetch_lines<R: Runtime>(runtime: &R, frame: &R::Frame, path: &Path) -> Option<Vec<String>> {
    let lines = if let Some(text) = frame.module_source() {
        split_lines(&text)
    } else if let Some(entry) = session_input_entry(path) {
        runtime.history_input(entry).map(|text| split_lines(&text))?
    } else {
        let bytes = std::fs::read(path).ok()?;
        decode_lines(&bytes)
    };

    // A readable but empty source is as useless as a missing one.
    (!lines.is_empty()).then_some(lines)
}

fn session_input_entry(path: &Path) -> Option<usize> {
    let name = path.to_str()?;

    SESSION_INPUT_PATTERN
        .as_ref()?
        .captures(name)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Splits raw source bytes into lines, honoring an encoding declaration in
/// the first two lines (UTF-8 by default, replacement on error).
fn decode_lines(bytes: &[u8]) -> Vec<String> {
    let raw_lines: Vec<&[u8]> = split_byte_lines(bytes);

    let encoding = ENCODING_PATTERN
        .as_ref()
        .and_then(|pattern| {
            raw_lines.iter().take(2).find_map(|line| {
                let line = String::from_utf8_lossy(line);
                pattern
                    .captures(&line)
                    .and_then(|captures| captures.get(1).map(|m| m.as_str().to_owned()))
            })
        })
        .unwrap_or_else(|| "utf-8".to_owned());

    raw_lines
        .iter()
        .map(|line| decode(line, &encoding))
        .collect()
}

fn decode(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_ascii_lowercase().as_str() {
        "latin-1" | "latin1" | "iso-8859-1" => bytes.iter().map(|&b| char::from(b)).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

fn split_byte_lines(bytes: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();

    if lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}
