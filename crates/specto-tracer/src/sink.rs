//! Textual output sink of the tracer.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::LazyLock;

use parking_lot::Mutex;

/// Process-wide fallback log path.
///
/// Used by tracers built with the default-output toggle off and no explicit
/// output target.
static DEFAULT_LOG_PATH: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(Mutex::default);

/// Sets the process-wide fallback log path.
pub fn set_default_log_path(path: Option<PathBuf>) {
    *DEFAULT_LOG_PATH.lock() = path;
}

fn default_log_path() -> Option<PathBuf> {
    DEFAULT_LOG_PATH.lock().clone()
}

/// Output target of a tracer.
pub enum Output {
    /// Write to the process error stream, with an ASCII-escape fallback if
    /// a write is refused.
    Default,

    /// Write to a file. The file is truncated on the first write if the
    /// `overwrite` toggle is set; every write appends afterwards.
    Path(PathBuf),

    /// Hand each log line (newline included) to a callable.
    Callable(Box<dyn FnMut(&str) + Send>),

    /// Write to an arbitrary stream.
    Stream(Box<dyn std::io::Write + Send>),
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Callable(_) => f.write_str("Callable"),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<PathBuf> for Output {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for Output {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for Output {
    fn from(path: &str) -> Self {
        Self::Path(path.into())
    }
}

/// Configured writer behind a tracer.
pub(crate) enum SinkWriter {
    Stderr,
    File(FileWriter),
    Callable(Box<dyn FnMut(&str) + Send>),
    Stream(Box<dyn std::io::Write + Send>),
}

impl SinkWriter {
    /// Builds the writer for the given configuration.
    ///
    /// `overwrite` is only valid for file targets and is rejected eagerly
    /// otherwise.
    pub(crate) fn new(
        output: Option<Output>,
        overwrite: bool,
        default_output: bool,
    ) -> crate::Result<Self> {
        let output = output.unwrap_or_else(|| {
            if !default_output {
                if let Some(path) = default_log_path() {
                    return Output::Path(path);
                }
            }
            Output::Default
        });

        if overwrite && !matches!(output, Output::Path(_)) {
            return Err(crate::Error::OverwriteNeedsPath);
        }

        Ok(match output {
            Output::Default => Self::Stderr,
            Output::Path(path) => Self::File(FileWriter::new(path, overwrite)),
            Output::Callable(write) => Self::Callable(write),
            Output::Stream(stream) => Self::Stream(stream),
        })
    }

    /// Writes one log line (newline included).
    ///
    /// Failures past construction cannot propagate out of a step callback;
    /// they are logged and the traced program is left undisturbed.
    pub(crate) fn write_line(&mut self, line: &str) {
        match self {
            Self::Stderr => {
                let mut stderr = std::io::stderr();

                if stderr.write_all(line.as_bytes()).is_err() {
                    let _ = stderr.write_all(ascii_fallback(line).as_bytes());
                }
            }
            Self::File(writer) => writer.write(line),
            Self::Callable(write) => write(line),
            Self::Stream(stream) => {
                if let Err(error) = stream.write_all(line.as_bytes()) {
                    tracing::warn!(%error, "log stream write failed");
                }
            }
        }
    }
}

/// Best-effort rendering for streams that refuse the original text: every
/// non-ASCII character is replaced.
fn ascii_fallback(line: &str) -> String {
    line.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

/// File writer that truncates on the first write when asked to, and appends
/// on every write after that.
pub(crate) struct FileWriter {
    path: PathBuf,
    truncate_next: bool,
}

impl FileWriter {
    pub(crate) const fn new(path: PathBuf, overwrite: bool) -> Self {
        Self {
            path,
            truncate_next: overwrite,
        }
    }

    fn write(&mut self, line: &str) {
        let result = std::fs::OpenOptions::new()
            .create(true)
            .truncate(self.truncate_next)
            .append(!self.truncate_next)
            .write(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        match result {
            Ok(()) => self.truncate_next = false,
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "log file write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Output, SinkWriter, ascii_fallback};

    #[test]
    fn overwrite_requires_a_path() {
        assert!(matches!(
            SinkWriter::new(None, true, true),
            Err(crate::Error::OverwriteNeedsPath)
        ));

        assert!(matches!(
            SinkWriter::new(Some(Output::Callable(Box::new(|_| ()))), true, true),
            Err(crate::Error::OverwriteNeedsPath)
        ));

        assert!(SinkWriter::new(Some(Output::Path("t.log".into())), true, true).is_ok());
    }

    #[test]
    fn fallback_strips_non_ascii() {
        assert_eq!(ascii_fallback("x = 'caf\u{e9}'\n"), "x = 'caf?'\n");
    }
}
