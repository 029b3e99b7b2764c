use std::sync::Arc;

use indexmap::IndexMap;

use crate::code::CodeObject;
use crate::function::Function;
use crate::generator::GeneratorFn;

/// A hosted callable, as held by a class method table.
#[derive(Debug, Clone)]
pub enum Callable {
    /// A plain function.
    Function(Function),

    /// A generator function.
    Generator(GeneratorFn),

    /// A coroutine function, driven by an external scheduler.
    Coroutine(CoroutineFn),
}

impl Callable {
    /// Returns the code object of this callable.
    pub fn code(&self) -> &Arc<CodeObject> {
        match self {
            Self::Function(function) => function.code(),
            Self::Generator(generator) => generator.code(),
            Self::Coroutine(coroutine) => coroutine.code(),
        }
    }
}

impl From<Function> for Callable {
    fn from(function: Function) -> Self {
        Self::Function(function)
    }
}

impl From<GeneratorFn> for Callable {
    fn from(generator: GeneratorFn) -> Self {
        Self::Generator(generator)
    }
}

impl From<CoroutineFn> for Callable {
    fn from(coroutine: CoroutineFn) -> Self {
        Self::Coroutine(coroutine)
    }
}

/// A hosted coroutine function.
///
/// The engine cannot drive one synchronously and the tracer cannot
/// instrument one; it only exists as a class member, scheduled elsewhere.
#[derive(Debug, Clone)]
pub struct CoroutineFn {
    code: Arc<CodeObject>,
}

impl CoroutineFn {
    /// Creates a coroutine function from its code object.
    pub fn new(code: CodeObject) -> Self {
        Self {
            code: Arc::new(code),
        }
    }

    /// Returns the code object of this coroutine function.
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }
}

/// A hosted class: a name and the callables defined directly on it, in
/// definition order.
#[derive(Debug, Clone)]
pub struct Class {
    name: String,
    methods: IndexMap<String, Callable>,
}

impl Class {
    /// Creates an empty class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: IndexMap::new(),
        }
    }

    /// Defines a method on the class.
    pub fn define(mut self, name: impl Into<String>, callable: impl Into<Callable>) -> Self {
        self.methods.insert(name.into(), callable.into());
        self
    }

    /// Returns the name of the class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a method by name.
    pub fn method(&self, name: &str) -> Option<&Callable> {
        self.methods.get(name)
    }

    /// Iterates over the methods in definition order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, &Callable)> {
        self.methods.iter().map(|(name, c)| (name.as_str(), c))
    }
}
