/*!
# Binding Resolver

Finds the top-level imports and requires of the grammar library and records
every alias through which its base class is reachable.
*/

use swc_core::ecma::ast::*;

use super::BaseClassAliases;
use crate::transform::builders::prop_name_is;

/// Collects base class aliases for one library/base class pair
pub struct BindingResolver<'a> {
    library: &'a str,
    base_class: &'a str,
}

impl<'a> BindingResolver<'a> {
    pub fn new(library: &'a str, base_class: &'a str) -> Self {
        Self {
            library,
            base_class,
        }
    }

    /// Resolve every alias introduced at the top level of `program`
    pub fn resolve(&self, program: &Program) -> BaseClassAliases {
        let mut aliases = BaseClassAliases::new();
        match program {
            Program::Module(module) => {
                for item in &module.body {
                    match item {
                        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                            self.collect_import(import, &mut aliases);
                        }
                        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                            decl: Decl::Var(var),
                            ..
                        })) => self.collect_requires(var, &mut aliases),
                        ModuleItem::Stmt(stmt) => self.collect_stmt(stmt, &mut aliases),
                        _ => {}
                    }
                }
            }
            Program::Script(script) => {
                for stmt in &script.body {
                    self.collect_stmt(stmt, &mut aliases);
                }
            }
        }
        aliases
    }

    fn collect_stmt(&self, stmt: &Stmt, aliases: &mut BaseClassAliases) {
        if let Stmt::Decl(Decl::Var(var)) = stmt {
            self.collect_requires(var, aliases);
        }
    }

    fn collect_import(&self, import: &ImportDecl, aliases: &mut BaseClassAliases) {
        if import.type_only || &*import.src.value != self.library {
            return;
        }
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Named(named) => {
                    if named.is_type_only {
                        continue;
                    }
                    let imported = match &named.imported {
                        Some(ModuleExportName::Ident(ident)) => &*ident.sym,
                        Some(ModuleExportName::Str(name)) => &*name.value,
                        None => &*named.local.sym,
                    };
                    if imported == self.base_class {
                        aliases.insert(named.local.sym.to_string());
                    }
                }
                ImportSpecifier::Default(default) => {
                    aliases.insert_member(&default.local.sym, self.base_class);
                }
                ImportSpecifier::Namespace(namespace) => {
                    aliases.insert_member(&namespace.local.sym, self.base_class);
                }
            }
        }
    }

    fn collect_requires(&self, var: &VarDecl, aliases: &mut BaseClassAliases) {
        for declarator in &var.decls {
            let Some(init) = &declarator.init else {
                continue;
            };
            if !self.is_library_require(init) {
                continue;
            }
            match &declarator.name {
                Pat::Ident(binding) => {
                    aliases.insert_member(&binding.id.sym, self.base_class);
                }
                Pat::Object(pattern) => {
                    for prop in &pattern.props {
                        if let Some(local) = self.destructured_base_class(prop) {
                            aliases.insert(local);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// `{ Parser }`, `{ Parser: P }` and `{ Parser: P = fallback }`
    fn destructured_base_class(&self, prop: &ObjectPatProp) -> Option<String> {
        match prop {
            ObjectPatProp::Assign(assign) if &*assign.key.id.sym == self.base_class => {
                Some(assign.key.id.sym.to_string())
            }
            ObjectPatProp::KeyValue(kv) if prop_name_is(&kv.key, self.base_class) => {
                match &*kv.value {
                    Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                    Pat::Assign(AssignPat { left, .. }) => match &**left {
                        Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// `require("<library>")` with a plain string argument
    fn is_library_require(&self, expr: &Expr) -> bool {
        let Expr::Call(call) = expr else {
            return false;
        };
        let Callee::Expr(callee) = &call.callee else {
            return false;
        };
        if !matches!(&**callee, Expr::Ident(ident) if &*ident.sym == "require") {
            return false;
        }
        match call.args.first() {
            Some(ExprOrSpread { spread: None, expr }) => {
                matches!(&**expr, Expr::Lit(Lit::Str(s)) if &*s.value == self.library)
            }
            _ => false,
        }
    }
}
