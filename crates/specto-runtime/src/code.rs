use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use specto_tracer::runtime::{CodeId, INTERNAL_PATH};

static NEXT_CODE_ID: AtomicU64 = AtomicU64::new(1);

/// Code object of a hosted callable: its identity, declared shape, and the
/// location of its source text.
#[derive(Debug, Clone)]
pub struct CodeObject {
    id: CodeId,
    name: String,
    module: Option<String>,
    path: PathBuf,
    first_line: u32,
    params: Vec<String>,
    source: Option<String>,
}

impl CodeObject {
    /// Creates a code object named `name`, whose definition starts at
    /// `first_line` of the file at `path`.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, first_line: u32) -> Self {
        Self {
            id: NEXT_CODE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            module: None,
            path: path.into(),
            first_line,
            params: Vec::new(),
            source: None,
        }
    }

    /// Creates the code object of an instrumentation wrapper.
    ///
    /// Its path is the internal sentinel, so frames executing it are never
    /// picked up as trace targets.
    pub(crate) fn internal(name: &str, params: &[String]) -> Self {
        Self::new(name, INTERNAL_PATH, 1).with_params(params.iter().cloned())
    }

    /// Sets the module this code object belongs to.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Declares the parameter names of the callable, in order.
    pub fn with_params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches inline source text, for code with no backing file.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the identity of this code object.
    pub const fn id(&self) -> CodeId {
        self.id
    }

    /// Returns the name of the callable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the module this code object belongs to, if set.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Returns the source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the line the definition starts on.
    pub const fn first_line(&self) -> u32 {
        self.first_line
    }

    /// Returns the declared parameter names.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns the inline source text, if any.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
