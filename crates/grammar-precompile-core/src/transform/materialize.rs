/*!
# Export Materializer

Builds the derived clone of a file. The clone is the original program plus:

- a statement creating the export map under a unique key, placed after any
  leading directive prologue (`"use strict";`) so the directives keep effect
- after every parser class declaration, a statement registering the class in
  that map under its own name

The runtime executes the clone and hands the registered constructors back.
The original program is never modified here.
*/

use swc_core::ecma::ast::*;
use uuid::Uuid;

use super::builders;
use crate::analysis::{BaseClassAliases, ClassPattern, InheritsFrom, TopLevelClasses};
use crate::source::ModuleFormat;

/// Prefix of the export map key; also marks a program as a derived clone
pub const EXPORT_KEY_PREFIX: &str = "__grammar_precompile_parsers_";

/// A derived clone ready to be emitted and loaded
#[derive(Debug, Clone)]
pub struct MaterializedModule {
    pub program: Program,
    pub export_key: String,
    pub format: ModuleFormat,
    /// Registered classes, in source order
    pub class_names: Vec<String>,
}

pub struct ExportMaterializer<'a> {
    aliases: &'a BaseClassAliases,
}

impl<'a> ExportMaterializer<'a> {
    pub fn new(aliases: &'a BaseClassAliases) -> Self {
        Self { aliases }
    }

    pub fn materialize(&self, program: &Program) -> MaterializedModule {
        let export_key = format!("{EXPORT_KEY_PREFIX}{}", Uuid::new_v4().simple());
        self.materialize_with_key(program, export_key)
    }

    /// Same as [`materialize`](Self::materialize) with a caller-chosen key
    pub fn materialize_with_key(&self, program: &Program, export_key: String) -> MaterializedModule {
        let format = ModuleFormat::detect(program);
        let pattern = InheritsFrom::new(self.aliases);
        let mut class_names = Vec::new();

        let program = match program.clone() {
            Program::Module(mut module) => {
                let prologue = module
                    .body
                    .iter()
                    .take_while(|item| matches!(item, ModuleItem::Stmt(stmt) if is_directive(stmt)))
                    .count();
                let mut items = module.body.drain(..);
                let mut body = Vec::with_capacity(items.len() + 1);
                body.extend(items.by_ref().take(prologue));
                body.push(match format {
                    ModuleFormat::EsModule => {
                        builders::export_const(&export_key, builders::empty_object())
                    }
                    ModuleFormat::CommonJs => ModuleItem::Stmt(commonjs_export_map(&export_key)),
                });
                for item in items {
                    let registered = TopLevelClasses::of_item(&item)
                        .filter(|found| pattern.matches(found.class))
                        .map(|found| found.name().to_string());
                    body.push(item);
                    if let Some(name) = registered {
                        body.push(ModuleItem::Stmt(registration(&export_key, format, &name)));
                        class_names.push(name);
                    }
                }
                module.body = body;
                Program::Module(module)
            }
            Program::Script(mut script) => {
                let prologue = script.body.iter().take_while(|stmt| is_directive(stmt)).count();
                let mut stmts = script.body.drain(..);
                let mut body = Vec::with_capacity(stmts.len() + 1);
                body.extend(stmts.by_ref().take(prologue));
                body.push(commonjs_export_map(&export_key));
                for stmt in stmts {
                    let registered = TopLevelClasses::of_stmt(&stmt)
                        .filter(|found| pattern.matches(found.class))
                        .map(|found| found.name().to_string());
                    body.push(stmt);
                    if let Some(name) = registered {
                        body.push(registration(&export_key, ModuleFormat::CommonJs, &name));
                        class_names.push(name);
                    }
                }
                script.body = body;
                Program::Script(script)
            }
        };

        MaterializedModule {
            program,
            export_key,
            format,
            class_names,
        }
    }
}

/// `exports.KEY = {};`
fn commonjs_export_map(export_key: &str) -> Stmt {
    builders::assign_stmt(
        builders::member(builders::ident_expr("exports"), export_key),
        builders::empty_object(),
    )
}

/// `KEY.Name = Name;` or `exports.KEY.Name = Name;`
fn registration(export_key: &str, format: ModuleFormat, class_name: &str) -> Stmt {
    let map = match format {
        ModuleFormat::EsModule => builders::ident_expr(export_key),
        ModuleFormat::CommonJs => Box::new(Expr::Member(builders::member(
            builders::ident_expr("exports"),
            export_key,
        ))),
    };
    builders::assign_stmt(
        builders::member(map, class_name),
        builders::ident_expr(class_name),
    )
}

/// A string literal expression statement, as found in a directive prologue
fn is_directive(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(ExprStmt { expr, .. }) if matches!(&**expr, Expr::Lit(Lit::Str(_))))
}

/// Whether a program is a clone produced by [`ExportMaterializer`]
///
/// The clone's first item after the directive prologue establishes the export
/// map; nothing else in a real program uses the reserved prefix.
pub fn is_derived_clone(program: &Program) -> bool {
    match program {
        Program::Module(module) => match module
            .body
            .iter()
            .find(|item| !matches!(item, ModuleItem::Stmt(stmt) if is_directive(stmt)))
        {
            Some(ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                decl: Decl::Var(var),
                ..
            }))) => var.decls.iter().any(|decl| {
                matches!(&decl.name, Pat::Ident(binding) if binding.id.sym.starts_with(EXPORT_KEY_PREFIX))
            }),
            Some(ModuleItem::Stmt(stmt)) => is_commonjs_export_map(stmt),
            _ => false,
        },
        Program::Script(script) => script
            .body
            .iter()
            .find(|stmt| !is_directive(stmt))
            .is_some_and(is_commonjs_export_map),
    }
}

fn is_commonjs_export_map(stmt: &Stmt) -> bool {
    let Stmt::Expr(ExprStmt { expr, .. }) = stmt else {
        return false;
    };
    let Expr::Assign(AssignExpr {
        left: AssignTarget::Simple(SimpleAssignTarget::Member(target)),
        ..
    }) = &**expr
    else {
        return false;
    };
    let is_exports = matches!(&*target.obj, Expr::Ident(ident) if &*ident.sym == "exports");
    let is_key = matches!(&target.prop, MemberProp::Ident(prop) if prop.sym.starts_with(EXPORT_KEY_PREFIX));
    is_exports && is_key
}
