//! Constructors for the AST fragments the transforms insert.
//!
//! All nodes use `DUMMY_SP` and an empty syntax context: they have no source
//! position and carry no comments.

use swc_core::common::{SyntaxContext, DUMMY_SP};
use swc_core::ecma::ast::*;

pub fn ident(name: &str) -> Ident {
    Ident::new(name.into(), DUMMY_SP, SyntaxContext::empty())
}

pub fn ident_expr(name: &str) -> Box<Expr> {
    Box::new(Expr::Ident(ident(name)))
}

/// `obj.prop`
pub fn member(obj: Box<Expr>, prop: &str) -> MemberExpr {
    MemberExpr {
        span: DUMMY_SP,
        obj,
        prop: MemberProp::Ident(IdentName::new(prop.into(), DUMMY_SP)),
    }
}

pub fn empty_object() -> Box<Expr> {
    object(Vec::new())
}

pub fn object(props: Vec<PropOrSpread>) -> Box<Expr> {
    Box::new(Expr::Object(ObjectLit {
        span: DUMMY_SP,
        props,
    }))
}

pub fn string(value: &str) -> Box<Expr> {
    Box::new(Expr::Lit(Lit::Str(Str {
        span: DUMMY_SP,
        value: value.into(),
        raw: None,
    })))
}

pub fn undefined() -> Box<Expr> {
    ident_expr("undefined")
}

pub fn arg(expr: Box<Expr>) -> ExprOrSpread {
    ExprOrSpread { spread: None, expr }
}

/// `target = value;`
pub fn assign_stmt(target: MemberExpr, value: Box<Expr>) -> Stmt {
    Stmt::Expr(ExprStmt {
        span: DUMMY_SP,
        expr: Box::new(Expr::Assign(AssignExpr {
            span: DUMMY_SP,
            op: AssignOp::Assign,
            left: AssignTarget::Simple(SimpleAssignTarget::Member(target)),
            right: value,
        })),
    })
}

/// `export const name = init;`
pub fn export_const(name: &str, init: Box<Expr>) -> ModuleItem {
    ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
        span: DUMMY_SP,
        decl: Decl::Var(Box::new(VarDecl {
            span: DUMMY_SP,
            ctxt: SyntaxContext::empty(),
            kind: VarDeclKind::Const,
            declare: false,
            decls: vec![VarDeclarator {
                span: DUMMY_SP,
                name: Pat::Ident(BindingIdent {
                    id: ident(name),
                    type_ann: None,
                }),
                init: Some(init),
                definite: false,
            }],
        })),
    }))
}

/// `JSON.parse("<json>")`
///
/// Embedding the grammar as one string literal keeps the emitted expression
/// flat no matter how deeply nested the grammar is.
pub fn json_parse_call(json: &str) -> Box<Expr> {
    Box::new(Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(Box::new(Expr::Member(member(ident_expr("JSON"), "parse")))),
        args: vec![arg(string(json))],
        type_args: None,
    }))
}

/// `key: value`
pub fn key_value(key: &str, value: Box<Expr>) -> PropOrSpread {
    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp {
        key: PropName::Ident(IdentName::new(key.into(), DUMMY_SP)),
        value,
    })))
}

/// Whether a property key spells `name`, either as identifier or string
pub fn prop_name_is(key: &PropName, name: &str) -> bool {
    match key {
        PropName::Ident(ident) => &*ident.sym == name,
        PropName::Str(s) => &*s.value == name,
        _ => false,
    }
}
