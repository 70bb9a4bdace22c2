//! Arena context for AST allocation.
//!
//! [`AstContext`] groups the typed arenas the parser allocates into. All
//! nodes are bump-allocated, with the `'a` lifetime tracking the arenas'
//! scope: the caller creates the arenas, hands a context to the parser, and
//! keeps the arenas alive for as long as any [`Program`](crate::Program)
//! built from them is in use.
//!
//! Source text is also allocated here (through the string arena), which is
//! what lets tokens and identifier names borrow their lexemes instead of
//! copying them.

use casm_base::{Arena, StrArena};

use crate::ast::{DbgArg, ElseIf, Expr, ExprKind, Stmt};
use casm_base::SourceLocation;

/// Collection of typed arenas for AST allocation during parsing.
///
/// The context is `Copy`; it only holds references to arenas owned by the
/// caller. [`AstArenas`] bundles the owning side for convenience.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    /// Arena for expression nodes.
    pub exprs: &'a Arena<Expr<'a>>,
    /// Arena for statement nodes.
    pub stmts: &'a Arena<Stmt<'a>>,
    /// Arena for else-if clauses.
    pub elifs: &'a Arena<ElseIf<'a>>,
    /// Arena for debug-statement arguments.
    pub dbg_args: &'a Arena<DbgArg<'a>>,
    /// Arena for expression reference lists (call arguments).
    pub expr_refs: &'a Arena<&'a Expr<'a>>,
    /// Arena for string data: source buffers, qualified names, labels.
    pub strs: &'a StrArena,
}

impl<'a> AstContext<'a> {
    /// Builds a context over an [`AstArenas`] bundle.
    pub fn new(arenas: &'a AstArenas<'a>) -> Self {
        AstContext {
            exprs: &arenas.exprs,
            stmts: &arenas.stmts,
            elifs: &arenas.elifs,
            dbg_args: &arenas.dbg_args,
            expr_refs: &arenas.expr_refs,
            strs: &arenas.strs,
        }
    }

    /// Allocates an expression node with an empty `resolved_type` slot.
    pub fn expr(&self, kind: ExprKind<'a>, location: SourceLocation) -> &'a Expr<'a> {
        self.exprs.alloc(Expr::new(kind, location))
    }

    /// Copies a string into the arena.
    pub fn str(&self, s: &str) -> &'a str {
        self.strs.alloc_str(s)
    }
}

/// The owning side of an [`AstContext`]: one arena per node family.
///
/// Dropping this frees every AST node, string, and source buffer of the
/// compilation in one sweep.
#[derive(Default)]
pub struct AstArenas<'a> {
    pub exprs: Arena<Expr<'a>>,
    pub stmts: Arena<Stmt<'a>>,
    pub elifs: Arena<ElseIf<'a>>,
    pub dbg_args: Arena<DbgArg<'a>>,
    pub expr_refs: Arena<&'a Expr<'a>>,
    pub strs: StrArena,
}

impl<'a> AstArenas<'a> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_allocates_expressions() {
        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let lit = ctx.expr(ExprKind::IntLiteral(7), SourceLocation::start());
        match lit.kind {
            ExprKind::IntLiteral(v) => assert_eq!(v, 7),
            _ => panic!("expected integer literal"),
        }
        assert!(lit.resolved_type.get().is_none());
    }

    #[test]
    fn context_interns_strings() {
        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let name = ctx.str("helper");
        assert_eq!(name, "helper");
    }
}
