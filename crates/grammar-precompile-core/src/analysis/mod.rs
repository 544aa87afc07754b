/*!
# Static Analysis

Read-only passes over the top-level scope of a program:

- `bindings`: which local names reach the grammar library's `Parser` class
- `patterns`: which top-level classes inherit from one of those names
- `gate`: the cheap check that decides whether a file needs the full pipeline

Nothing below the top level is inspected. An import inside a function, or a
class declared inside a block, never makes a file eligible.
*/

pub mod bindings;
pub mod gate;
pub mod patterns;

use std::fmt;

use indexmap::IndexSet;

pub use bindings::BindingResolver;
pub use gate::{GateDecision, SkipReason, UsageGate};
pub use patterns::{ClassPattern, InheritsFrom, TopLevelClass, TopLevelClasses};

/// Local names (plain or dotted) through which a file reaches the base class
///
/// A plain alias such as `"Parser"` comes from a named import or a destructured
/// require; a dotted alias such as `"chevrotain.Parser"` comes from a default,
/// namespace, or whole-module require binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseClassAliases {
    names: IndexSet<String>,
}

impl BaseClassAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>) -> bool {
        self.names.insert(alias.into())
    }

    /// Alias for a binding of the whole module, e.g. `chevrotain` → `chevrotain.Parser`
    pub fn insert_member(&mut self, object: &str, base_class: &str) -> bool {
        self.insert(format!("{object}.{base_class}"))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.names.contains(alias)
    }

    pub fn contains_member(&self, object: &str, property: &str) -> bool {
        self.names.contains(format!("{object}.{property}").as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl fmt::Display for BaseClassAliases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "]")
    }
}

impl<S: Into<String>> FromIterator<S> for BaseClassAliases {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut aliases = Self::new();
        for alias in iter {
            aliases.insert(alias);
        }
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_deduplicate_and_keep_order() {
        let mut aliases = BaseClassAliases::new();
        assert!(aliases.insert("P"));
        assert!(aliases.insert_member("chevrotain", "Parser"));
        assert!(!aliases.insert("P"));
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.iter().collect::<Vec<_>>(), vec!["P", "chevrotain.Parser"]);
        assert_eq!(aliases.to_string(), "[P, chevrotain.Parser]");
    }

    #[test]
    fn test_member_lookup() {
        let aliases: BaseClassAliases = ["cv.Parser"].into_iter().collect();
        assert!(aliases.contains_member("cv", "Parser"));
        assert!(!aliases.contains_member("cv", "Lexer"));
        assert!(!aliases.contains("cv"));
    }
}
