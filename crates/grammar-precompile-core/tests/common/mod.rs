//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use grammar_precompile_core::{
    CompiledModule, ModuleLoader, ParsedSource, ParserClass, ParserExports, ParserInstance,
    RuntimeError,
};
use serde_json::{json, Value};
use swc_core::ecma::ast::*;
use swc_core::ecma::visit::{Visit, VisitWith};

/// Grammar the canned loader reports for a class without an override
pub fn default_grammar(class_name: &str) -> Value {
    json!([{ "type": "Rule", "name": class_name.to_lowercase(), "definition": [] }])
}

/// Loader answering every registered class with a canned grammar.
///
/// Every module it is asked to load is recorded for inspection.
#[derive(Clone, Default)]
pub struct CannedLoader {
    grammars: HashMap<String, Value>,
    failures: HashMap<String, String>,
    missing: bool,
    pub loaded: Rc<RefCell<Vec<CompiledModule>>>,
}

impl CannedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grammar(mut self, class_name: &str, grammar: Value) -> Self {
        self.grammars.insert(class_name.to_string(), grammar);
        self
    }

    /// The class throws with `message` when constructed
    pub fn failing(mut self, class_name: &str, message: &str) -> Self {
        self.failures.insert(class_name.to_string(), message.to_string());
        self
    }

    /// Pretend the module published no export map
    pub fn without_exports(mut self) -> Self {
        self.missing = true;
        self
    }

    pub fn last_module(&self) -> CompiledModule {
        self.loaded.borrow().last().cloned().expect("no module loaded")
    }
}

impl ModuleLoader for CannedLoader {
    fn load(&self, module: &CompiledModule) -> grammar_precompile_core::Result<Option<ParserExports>> {
        self.loaded.borrow_mut().push(module.clone());
        if self.missing {
            return Ok(None);
        }
        let mut exports = ParserExports::new();
        for name in &module.class_names {
            let class = CannedClass {
                grammar: self
                    .grammars
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| default_grammar(name)),
                failure: self.failures.get(name).cloned(),
            };
            exports.insert(name.clone(), Box::new(class));
        }
        Ok(Some(exports))
    }
}

struct CannedClass {
    grammar: Value,
    failure: Option<String>,
}

impl ParserClass for CannedClass {
    fn instantiate(&self, tokens: &[Value]) -> Result<Box<dyn ParserInstance>, RuntimeError> {
        assert!(tokens.is_empty(), "grammar classes are built without tokens");
        match &self.failure {
            Some(message) => Err(RuntimeError::new(message.clone())),
            None => Ok(Box::new(CannedInstance(self.grammar.clone()))),
        }
    }
}

struct CannedInstance(Value);

impl ParserInstance for CannedInstance {
    fn introspect(&self) -> Result<Value, RuntimeError> {
        Ok(self.0.clone())
    }
}

/// Every `JSON.parse("...")` argument in `code`, decoded, in source order
pub fn embedded_grammars(code: &str) -> Vec<Value> {
    let parsed = ParsedSource::parse(code, "output.js").expect("output must parse");
    let mut finder = JsonParseArgs::default();
    parsed.program.visit_with(&mut finder);
    finder
        .0
        .iter()
        .map(|text| serde_json::from_str(text).expect("embedded grammar must be JSON"))
        .collect()
}

#[derive(Default)]
struct JsonParseArgs(Vec<String>);

impl Visit for JsonParseArgs {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Callee::Expr(callee) = &call.callee {
            if let Expr::Member(MemberExpr {
                obj,
                prop: MemberProp::Ident(prop),
                ..
            }) = &**callee
            {
                let is_json = matches!(&**obj, Expr::Ident(ident) if &*ident.sym == "JSON");
                if is_json && &*prop.sym == "parse" {
                    if let Some(ExprOrSpread { expr, .. }) = call.args.first() {
                        if let Expr::Lit(Lit::Str(text)) = &**expr {
                            self.0.push(text.value.to_string());
                        }
                    }
                }
            }
        }
        call.visit_children_with(self);
    }
}
