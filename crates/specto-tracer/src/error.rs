/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configured tracing depth is below the minimum.
    #[error("tracing depth must be at least 1 (got {0})")]
    InvalidDepth(usize),

    /// The `overwrite` toggle was combined with a non-file output target.
    #[error("`overwrite` can only be used when writing the log to a file path")]
    OverwriteNeedsPath,

    /// A coroutine function was given to the instrumentation layer.
    #[error("coroutine functions cannot be instrumented")]
    UnsupportedTarget,
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
