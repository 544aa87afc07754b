/*!
# Runtime Contract

The precompiler needs one capability it cannot provide itself: compiling the
derived clone, executing it, and talking to the parser classes it defines.
These traits describe that capability; [`node::NodeRuntime`] implements it
with a `node` subprocess, tests implement it with canned grammars.
*/

pub mod node;

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::source::ModuleFormat;
use crate::Result;

/// Emitted source of a derived clone plus what the runtime needs to find the
/// export map inside it
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub code: String,
    /// Path of the file the clone was derived from
    pub filename: String,
    pub format: ModuleFormat,
    pub export_key: String,
    /// Classes registered in the export map, in declaration order
    pub class_names: Vec<String>,
}

/// An error thrown by JavaScript code, with its message as the runtime reported it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// A parser class constructor recovered from the export map
pub trait ParserClass {
    /// `new Class(tokens)`
    fn instantiate(&self, tokens: &[Value]) -> std::result::Result<Box<dyn ParserInstance>, RuntimeError>;
}

/// A constructed parser
pub trait ParserInstance {
    /// Call the introspection method and return its value unchanged
    fn introspect(&self) -> std::result::Result<Value, RuntimeError>;
}

/// Class name to constructor, in declaration order
pub type ParserExports = IndexMap<String, Box<dyn ParserClass>>;

/// Compiles and executes a derived clone
pub trait ModuleLoader {
    /// Load the module and return its export map.
    ///
    /// `Ok(None)` means the module ran but published no export map. A module
    /// that fails to compile or throws while loading is an error.
    fn load(&self, module: &CompiledModule) -> Result<Option<ParserExports>>;
}

impl<L: ModuleLoader + ?Sized> ModuleLoader for Box<L> {
    fn load(&self, module: &CompiledModule) -> Result<Option<ParserExports>> {
        (**self).load(module)
    }
}

impl<L: ModuleLoader + ?Sized> ModuleLoader for &L {
    fn load(&self, module: &CompiledModule) -> Result<Option<ParserExports>> {
        (**self).load(module)
    }
}
