use specto_tracer::runtime::ExceptionInfo;

/// Error raised by hosted code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An error explicitly raised by a hosted program.
    #[error("{kind}: {message}")]
    Raised {
        /// Kind of the error (e.g. `ValueError`).
        kind: String,

        /// Error message.
        message: String,
    },

    /// A name was looked up without being bound in the frame.
    #[error("name `{0}` is not bound")]
    UnboundName(String),

    /// A callable was invoked with the wrong number of arguments.
    #[error("`{function}` takes {expected} argument(s), {got} given")]
    Arity {
        /// Name of the callable.
        function: String,

        /// Number of declared parameters.
        expected: usize,

        /// Number of arguments given.
        got: usize,
    },

    /// A coroutine function was invoked synchronously.
    #[error("coroutine `{0}` cannot be called synchronously")]
    CoroutineCall(String),
}

impl Error {
    /// Creates an error the way hosted code raises one.
    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Describes this error the way it appears in exception steps.
    pub(crate) fn exception_info(&self) -> ExceptionInfo {
        let (kind, message) = match self {
            Self::Raised { kind, message } => (kind.clone(), message.clone()),
            Self::UnboundName(_) => ("NameError".to_owned(), self.to_string()),
            Self::Arity { .. } => ("ArityError".to_owned(), self.to_string()),
            Self::CoroutineCall(_) => ("TypeError".to_owned(), self.to_string()),
        };

        ExceptionInfo { kind, message }
    }
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
