/*!
# Class Pattern Matching

Matching of class declarations against the base class aliases, plus the
walker that enumerates the top-level class declarations of a program.
*/

use swc_core::ecma::ast::*;

use super::BaseClassAliases;

/// Pattern matcher for class nodes
pub trait ClassPattern {
    /// Check if this pattern matches the given class
    fn matches(&self, class: &Class) -> bool;
}

/// Matches classes whose superclass is one of the known base class aliases
///
/// Only two shapes are recognized: a bare identifier (`extends Parser`) and a
/// non-computed member access on an identifier (`extends cv.Parser`). Anything
/// else is rejected, including deeper chains and call expressions.
pub struct InheritsFrom<'a> {
    aliases: &'a BaseClassAliases,
}

impl<'a> InheritsFrom<'a> {
    pub fn new(aliases: &'a BaseClassAliases) -> Self {
        Self { aliases }
    }
}

impl ClassPattern for InheritsFrom<'_> {
    fn matches(&self, class: &Class) -> bool {
        let Some(super_class) = &class.super_class else {
            return false;
        };
        match &**super_class {
            Expr::Ident(ident) => self.aliases.contains(&ident.sym),
            Expr::Member(MemberExpr {
                obj,
                prop: MemberProp::Ident(prop),
                ..
            }) => match &**obj {
                Expr::Ident(object) => self.aliases.contains_member(&object.sym, &prop.sym),
                _ => false,
            },
            _ => false,
        }
    }
}

/// A named class declared at the top level of a program
#[derive(Debug, Clone, Copy)]
pub struct TopLevelClass<'a> {
    pub ident: &'a Ident,
    pub class: &'a Class,
}

impl TopLevelClass<'_> {
    pub fn name(&self) -> &str {
        &self.ident.sym
    }
}

/// Utility for enumerating top-level class declarations
pub struct TopLevelClasses;

impl TopLevelClasses {
    /// All named top-level classes, in source order
    pub fn find_all(program: &Program) -> Vec<TopLevelClass<'_>> {
        match program {
            Program::Module(module) => module.body.iter().filter_map(Self::of_item).collect(),
            Program::Script(script) => script.body.iter().filter_map(Self::of_stmt).collect(),
        }
    }

    /// Top-level classes matching a pattern
    pub fn find_matching<'a, P: ClassPattern>(
        program: &'a Program,
        pattern: &P,
    ) -> Vec<TopLevelClass<'a>> {
        Self::find_all(program)
            .into_iter()
            .filter(|found| pattern.matches(found.class))
            .collect()
    }

    /// The class declared by a module item, if any
    pub fn of_item(item: &ModuleItem) -> Option<TopLevelClass<'_>> {
        match item {
            ModuleItem::Stmt(stmt) => Self::of_stmt(stmt),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                decl: Decl::Class(decl),
                ..
            })) => Some(TopLevelClass {
                ident: &decl.ident,
                class: &*decl.class,
            }),
            ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(ExportDefaultDecl {
                decl: DefaultDecl::Class(ClassExpr {
                    ident: Some(ident),
                    class,
                    ..
                }),
                ..
            })) => Some(TopLevelClass {
                ident,
                class: &**class,
            }),
            _ => None,
        }
    }

    /// The class declared by a statement, if any
    pub fn of_stmt(stmt: &Stmt) -> Option<TopLevelClass<'_>> {
        match stmt {
            Stmt::Decl(Decl::Class(decl)) => Some(TopLevelClass {
                ident: &decl.ident,
                class: &*decl.class,
            }),
            _ => None,
        }
    }

    /// Mutable access to every named top-level class
    pub fn for_each_mut<F>(program: &mut Program, mut f: F)
    where
        F: FnMut(&Ident, &mut Class),
    {
        match program {
            Program::Module(module) => {
                for item in module.body.iter_mut() {
                    match item {
                        ModuleItem::Stmt(Stmt::Decl(Decl::Class(decl)))
                        | ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                            decl: Decl::Class(decl),
                            ..
                        })) => f(&decl.ident, &mut *decl.class),
                        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(
                            ExportDefaultDecl {
                                decl:
                                    DefaultDecl::Class(ClassExpr {
                                        ident: Some(ident),
                                        class,
                                        ..
                                    }),
                                ..
                            },
                        )) => f(ident, &mut **class),
                        _ => {}
                    }
                }
            }
            Program::Script(script) => {
                for stmt in script.body.iter_mut() {
                    if let Stmt::Decl(Decl::Class(decl)) = stmt {
                        f(&decl.ident, &mut *decl.class);
                    }
                }
            }
        }
    }
}
