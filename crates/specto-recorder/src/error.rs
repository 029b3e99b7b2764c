/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// JSON serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
