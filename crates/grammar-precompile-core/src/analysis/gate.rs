/*!
# Usage Gate

Decides up front whether a file needs the expensive part of the pipeline.
Most files never import the grammar library, and most that do only use its
lexer; both cases leave here untouched.
*/

use std::fmt;

use swc_core::ecma::ast::Program;

use super::bindings::BindingResolver;
use super::patterns::{InheritsFrom, TopLevelClasses};
use super::BaseClassAliases;
use crate::PrecompileConfig;

/// Why a file was passed through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file never imports or requires the grammar library at top level
    NoLibraryImport,
    /// The library is imported but no top-level class extends its base class
    NoParserClasses,
    /// The program is a derived clone produced by this crate
    DerivedClone,
    /// The runtime returned no parser classes for the clone
    NoExports,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoLibraryImport => "grammar library not imported",
            SkipReason::NoParserClasses => "no Parser class inheritance",
            SkipReason::DerivedClone => "derived clone",
            SkipReason::NoExports => "no parsers found",
        };
        f.write_str(text)
    }
}

/// Outcome of the gate for one program
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Skip(SkipReason),
    Proceed {
        aliases: BaseClassAliases,
        /// Names of the matching classes, in source order
        class_names: Vec<String>,
    },
}

/// Combines binding resolution and inheritance matching
pub struct UsageGate<'a> {
    config: &'a PrecompileConfig,
}

impl<'a> UsageGate<'a> {
    pub fn new(config: &'a PrecompileConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, program: &Program) -> GateDecision {
        let aliases =
            BindingResolver::new(&self.config.library, &self.config.base_class).resolve(program);
        if aliases.is_empty() {
            return GateDecision::Skip(SkipReason::NoLibraryImport);
        }

        let class_names: Vec<String> =
            TopLevelClasses::find_matching(program, &InheritsFrom::new(&aliases))
                .iter()
                .map(|found| found.name().to_string())
                .collect();
        if class_names.is_empty() {
            return GateDecision::Skip(SkipReason::NoParserClasses);
        }

        GateDecision::Proceed {
            aliases,
            class_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ParsedSource;

    fn evaluate(source: &str) -> GateDecision {
        let parsed = ParsedSource::parse(source, "test.js").unwrap();
        UsageGate::new(&PrecompileConfig::default()).evaluate(&parsed.program)
    }

    #[test]
    fn test_skips_without_import() {
        assert_eq!(
            evaluate("class A extends Parser {}"),
            GateDecision::Skip(SkipReason::NoLibraryImport)
        );
    }

    #[test]
    fn test_skips_without_subclass() {
        let source = r#"
            import { createToken, Parser } from "chevrotain";
            const Comma = createToken({ name: "Comma", pattern: /,/ });
        "#;
        assert_eq!(evaluate(source), GateDecision::Skip(SkipReason::NoParserClasses));
    }

    #[test]
    fn test_proceeds_with_subclasses() {
        let source = r#"
            const cv = require("chevrotain");
            class First extends cv.Parser {}
            class Helper {}
            class Second extends cv.Parser {}
        "#;
        match evaluate(source) {
            GateDecision::Proceed {
                aliases,
                class_names,
            } => {
                assert!(aliases.contains("cv.Parser"));
                assert_eq!(class_names, vec!["First", "Second"]);
            }
            other => panic!("expected Proceed, got {other:?}"),
        }
    }
}
