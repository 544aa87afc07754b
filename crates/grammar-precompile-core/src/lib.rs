//! # Grammar Precompile Core
//!
//! Build-time transform for Chevrotain grammars, including:
//! - Discovery of the local names bound to the library's `Parser` base class
//! - Discovery of the top-level classes that inherit from it
//! - A derived clone of the file that registers those classes in an export map
//! - Execution of that clone to obtain each class's serialized grammar
//! - Injection of the grammar into each class's `super(...)` call
//!
//! The grammar analysis that Chevrotain normally performs on every program
//! start is moved to build time: the transformed source passes
//! `{ serializedGrammar: JSON.parse("...") }` to the base constructor.

#![warn(clippy::all)]

/// Per-file diagnostic line: info level when the file context has `debug`
/// set, debug level otherwise.
macro_rules! diagnostic {
    ($ctx:expr, $($arg:tt)+) => {
        if $ctx.debug {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod analysis;
pub mod extract;
pub mod file_driver;
pub mod pipeline;
pub mod runtime;
pub mod source;
pub mod transform;

use serde::Deserialize;

// Re-export commonly used types
pub use analysis::{BaseClassAliases, GateDecision, SkipReason, UsageGate};
pub use extract::{GrammarExtractor, SerializedGrammars};
pub use file_driver::{FilePrecompiler, FileTransformationSummary};
pub use pipeline::{GrammarPrecompiler, PrecompileOutcome, TransformReport};
pub use runtime::{
    node::NodeRuntime, CompiledModule, ModuleLoader, ParserClass, ParserExports, ParserInstance,
    RuntimeError,
};
pub use source::{ModuleFormat, ParsedSource};
pub use transform::{ClassInjection, FileContext, InjectionOutcome, MaterializedModule};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the precompiler components
///
/// Diagnostics go to stderr so that transformed code can be written to stdout.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("grammar_precompile_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// What to do when a super call's config object already has the grammar property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Overwrite the existing property's value
    #[default]
    Replace,
    /// Add a second property with the same key
    Append,
    /// Leave the class untouched
    Skip,
}

/// Precompiler configuration
///
/// Every field has a default, so an empty JSON object is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrecompileConfig {
    /// Emit per-file diagnostics at info level. Never changes output.
    pub debug: bool,
    /// Module specifier of the grammar library
    pub library: String,
    /// Export name of the base class within the library
    pub base_class: String,
    /// Method called on a parser instance to obtain its serialized grammar
    pub introspection_method: String,
    /// Config property the base class reads the grammar from
    pub grammar_property: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for PrecompileConfig {
    fn default() -> Self {
        Self {
            debug: false,
            library: "chevrotain".to_string(),
            base_class: "Parser".to_string(),
            introspection_method: "getSerializedGastProductions".to_string(),
            grammar_property: "serializedGrammar".to_string(),
            duplicate_policy: DuplicatePolicy::Replace,
        }
    }
}

impl PrecompileConfig {
    /// Parse a configuration from JSON text.
    ///
    /// Accepts either the bare config object or the plugin option shape
    /// `{ "options": { ... } }`.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let config = if value.get("options").is_some() {
            serde_json::from_value::<PluginOptions>(value)?.options
        } else {
            serde_json::from_value(value)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.library.is_empty() {
            return Err(PrecompileError::Config("library must not be empty".to_string()));
        }
        for (field, value) in [
            ("baseClass", &self.base_class),
            ("introspectionMethod", &self.introspection_method),
            ("grammarProperty", &self.grammar_property),
        ] {
            if !is_identifier_name(value) {
                return Err(PrecompileError::Config(format!(
                    "{field} must be a JavaScript identifier, got {value:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Plugin option set as it appears in babel-style configuration files
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    pub options: PrecompileConfig,
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Error types for precompile operations
#[derive(thiserror::Error, Debug)]
pub enum PrecompileError {
    /// Source text could not be parsed
    #[error("{filename}: {message}")]
    Parse { filename: String, message: String },

    /// Code generation failed
    #[error("Code generation failed: {0}")]
    Emit(std::io::Error),

    /// The derived clone failed to compile or load
    #[error("{filename}: {message}")]
    Load { filename: String, message: String },

    /// A parser class threw while being instantiated or introspected
    #[error("{filename}: {class_name}: {message}")]
    Extraction {
        filename: String,
        class_name: String,
        message: String,
    },

    /// No node binary available for the runtime
    #[error("Node.js executable not found: {0}")]
    NodeNotFound(#[from] which::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for precompile operations
pub type Result<T> = std::result::Result<T, PrecompileError>;
