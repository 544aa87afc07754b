/*!
# Grammar Injector

Embeds precomputed grammars into the original program. For every parser class
with a grammar, the first top-level `super(...)` statement of its constructor
receives `serializedGrammar: JSON.parse("...")` in its config argument:

```text
super(tokens)              →  super(tokens, { serializedGrammar: JSON.parse("...") })
super(tokens, { a: 1 })    →  super(tokens, { a: 1, serializedGrammar: JSON.parse("...") })
super(tokens, config)      →  unchanged
```

Injection is best-effort. A class whose shape does not allow a safe edit is
left exactly as it was and reported with the reason.
*/

use std::fmt;

use indexmap::IndexMap;
use swc_core::ecma::ast::*;

use super::builders;
use super::FileContext;
use crate::analysis::{BaseClassAliases, ClassPattern, InheritsFrom, TopLevelClasses};
use crate::extract::SerializedGrammars;
use crate::{DuplicatePolicy, Result};

/// Why a parser class was not injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionSkip {
    /// The class has no constructor with a body
    NoConstructor,
    /// The constructor has no `super(...)` statement at its top level
    NoSuperCall,
    /// The config argument is not a plain object literal
    UnsupportedConfigShape,
    /// The config object already has the property and the policy is `skip`
    AlreadyPresent,
    /// The runtime returned no grammar for the class
    NoGrammar,
}

impl fmt::Display for InjectionSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            InjectionSkip::NoConstructor => "no constructor",
            InjectionSkip::NoSuperCall => "no top-level super call in constructor",
            InjectionSkip::UnsupportedConfigShape => "config argument is not an object literal",
            InjectionSkip::AlreadyPresent => "grammar property already present",
            InjectionSkip::NoGrammar => "no serialized grammar",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    /// The property was added
    Injected,
    /// An existing property with the same key was overwritten
    Replaced,
    Skipped(InjectionSkip),
}

/// Result of injection for one parser class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInjection {
    pub class_name: String,
    pub outcome: InjectionOutcome,
}

pub struct Injector<'a> {
    aliases: &'a BaseClassAliases,
    grammars: &'a SerializedGrammars,
    property: &'a str,
    policy: DuplicatePolicy,
}

impl<'a> Injector<'a> {
    pub fn new(
        aliases: &'a BaseClassAliases,
        grammars: &'a SerializedGrammars,
        property: &'a str,
        policy: DuplicatePolicy,
    ) -> Self {
        Self {
            aliases,
            grammars,
            property,
            policy,
        }
    }

    /// Inject into every parser class of `program`, in source order
    pub fn inject(&self, program: &mut Program, ctx: &FileContext) -> Result<Vec<ClassInjection>> {
        // Serialize up front so a failure leaves the program untouched.
        let mut texts = IndexMap::with_capacity(self.grammars.len());
        for (name, grammar) in self.grammars.iter() {
            texts.insert(name.to_string(), serde_json::to_string(grammar)?);
        }

        let pattern = InheritsFrom::new(self.aliases);
        let mut results = Vec::new();
        TopLevelClasses::for_each_mut(program, |ident, class| {
            if !pattern.matches(class) {
                return;
            }
            let class_name = ident.sym.to_string();
            let outcome = match texts.get(&class_name) {
                Some(json) => self.inject_class(class, json),
                None => InjectionOutcome::Skipped(InjectionSkip::NoGrammar),
            };
            match outcome {
                InjectionOutcome::Skipped(reason) if ctx.debug => {
                    tracing::warn!(file = %ctx.filename, class = %class_name, "   --- Skipping Parser class: {reason}");
                }
                InjectionOutcome::Skipped(reason) => {
                    tracing::debug!(file = %ctx.filename, class = %class_name, "   --- Skipping Parser class: {reason}");
                }
                _ => {
                    diagnostic!(ctx, file = %ctx.filename, class = %class_name, "   --- Adding serialized grammar to Parser class");
                }
            }
            results.push(ClassInjection {
                class_name,
                outcome,
            });
        });
        Ok(results)
    }

    fn inject_class(&self, class: &mut Class, json: &str) -> InjectionOutcome {
        let Some(body) = class.body.iter_mut().find_map(|member| match member {
            ClassMember::Constructor(ctor) => ctor.body.as_mut(),
            _ => None,
        }) else {
            return InjectionOutcome::Skipped(InjectionSkip::NoConstructor);
        };

        let Some(call) = body.stmts.iter_mut().find_map(super_call_mut) else {
            return InjectionOutcome::Skipped(InjectionSkip::NoSuperCall);
        };

        let property = builders::key_value(self.property, builders::json_parse_call(json));
        self.add_to_config(&mut call.args, property)
    }

    fn add_to_config(&self, args: &mut Vec<ExprOrSpread>, property: PropOrSpread) -> InjectionOutcome {
        // Behind a spread the position of the config argument is unknown.
        if args.iter().take(2).any(|arg| arg.spread.is_some()) {
            return InjectionOutcome::Skipped(InjectionSkip::UnsupportedConfigShape);
        }

        if args.len() < 2 {
            if args.is_empty() {
                args.push(builders::arg(builders::undefined()));
            }
            args.push(builders::arg(builders::object(vec![property])));
            return InjectionOutcome::Injected;
        }

        let Expr::Object(config) = &mut *args[1].expr else {
            return InjectionOutcome::Skipped(InjectionSkip::UnsupportedConfigShape);
        };

        let existing = config
            .props
            .iter()
            .position(|prop| declares_property(prop, self.property));
        match (existing, self.policy) {
            (Some(_), DuplicatePolicy::Skip) => {
                InjectionOutcome::Skipped(InjectionSkip::AlreadyPresent)
            }
            (Some(index), DuplicatePolicy::Replace) => {
                config.props[index] = property;
                InjectionOutcome::Replaced
            }
            (None, _) | (Some(_), DuplicatePolicy::Append) => {
                config.props.push(property);
                InjectionOutcome::Injected
            }
        }
    }
}

/// The `super(...)` call of an expression statement
fn super_call_mut(stmt: &mut Stmt) -> Option<&mut CallExpr> {
    let Stmt::Expr(ExprStmt { expr, .. }) = stmt else {
        return None;
    };
    match &mut **expr {
        Expr::Call(call) if matches!(call.callee, Callee::Super(_)) => Some(call),
        _ => None,
    }
}

fn declares_property(prop: &PropOrSpread, name: &str) -> bool {
    let PropOrSpread::Prop(prop) = prop else {
        return false;
    };
    match &**prop {
        Prop::KeyValue(kv) => builders::prop_name_is(&kv.key, name),
        Prop::Shorthand(ident) => &*ident.sym == name,
        _ => false,
    }
}
