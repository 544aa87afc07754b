//! Grammar extraction: instantiate each recovered parser class and capture the
//! value of its introspection method.

use indexmap::map::{IndexMap, Iter};
use serde_json::Value;

use crate::runtime::ParserExports;
use crate::transform::FileContext;
use crate::{PrecompileError, Result};

/// Serialized grammar per parser class, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializedGrammars {
    grammars: IndexMap<String, Value>,
}

impl SerializedGrammars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_name: impl Into<String>, grammar: Value) {
        self.grammars.insert(class_name.into(), grammar);
    }

    pub fn get(&self, class_name: &str) -> Option<&Value> {
        self.grammars.get(class_name)
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.grammars.iter()
    }
}

impl FromIterator<(String, Value)> for SerializedGrammars {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            grammars: iter.into_iter().collect(),
        }
    }
}

pub struct GrammarExtractor;

impl GrammarExtractor {
    /// Extract every grammar, or fail on the first class that throws.
    ///
    /// Classes are instantiated without tokens; the grammar does not depend
    /// on input.
    pub fn extract(exports: &ParserExports, ctx: &FileContext) -> Result<SerializedGrammars> {
        let mut grammars = SerializedGrammars::new();
        for (class_name, class) in exports {
            let failed = |err: crate::runtime::RuntimeError| PrecompileError::Extraction {
                filename: ctx.filename.clone(),
                class_name: class_name.clone(),
                message: err.message,
            };
            let instance = class.instantiate(&[]).map_err(failed)?;
            let grammar = instance.introspect().map_err(failed)?;
            diagnostic!(ctx, file = %ctx.filename, class = %class_name, "   --- Serialized grammar extracted");
            grammars.insert(class_name.clone(), grammar);
        }
        Ok(grammars)
    }
}
