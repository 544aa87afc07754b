/*!
# Program Transformations

The two rewrites of the pipeline:

1. `materialize`: a deep clone of the file that registers every parser class in
   an export map so the runtime can hand the constructors back
2. `inject`: the edit of the original program that embeds each serialized
   grammar into the class's `super(...)` call

Both build their new nodes through the small constructors in `builders`.
*/

pub mod builders;
pub mod inject;
pub mod materialize;

pub use inject::{ClassInjection, InjectionOutcome, InjectionSkip, Injector};
pub use materialize::{is_derived_clone, ExportMaterializer, MaterializedModule, EXPORT_KEY_PREFIX};

/// Per-file state shared by the pipeline stages
#[derive(Debug, Clone)]
pub struct FileContext {
    pub filename: String,
    pub debug: bool,
}

impl Default for FileContext {
    fn default() -> Self {
        Self {
            filename: "unknown.js".to_string(),
            debug: false,
        }
    }
}

impl FileContext {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
