//! Source pretty-printer.
//!
//! Renders a [`Program`] back to parseable source text. The printer is the
//! inverse of the parser up to formatting: re-parsing its output yields a
//! structurally equal tree. Two choices make that hold:
//!
//! - every binary operation is printed parenthesized, and parentheses are
//!   transparent to the parser (they produce no node), so grouping always
//!   survives;
//! - `dbg` labels are not printed (they are re-synthesized from structure
//!   on the next parse, from the same structure).

use std::fmt::Write;

use crate::ast::{Block, Expr, ExprKind, Program, Stmt, StmtKind};

/// Renders a whole program: imports first, then function definitions.
pub fn print_program(program: &Program<'_>) -> String {
    let mut out = String::new();

    for import in &program.imports {
        out.push_str("#import ");
        for (i, name) in import.names.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(name);
        }
        let _ = write!(out, " from \"{}\";\n", import.path);
    }
    if !program.imports.is_empty() {
        out.push('\n');
    }

    for (i, function) in program.functions.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{} {}(", function.return_type.ty, function.name);
        for (j, param) in function.params.iter().enumerate() {
            if j > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{} {}", param.ty.ty, param.name);
        }
        out.push_str(") {\n");
        print_block_stmts(&function.body, 1, &mut out);
        out.push_str("}\n");
    }

    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn print_block_stmts(block: &Block<'_>, depth: usize, out: &mut String) {
    for stmt in block.stmts {
        print_stmt(stmt, depth, out);
    }
}

fn print_stmt(stmt: &Stmt<'_>, depth: usize, out: &mut String) {
    match &stmt.kind {
        StmtKind::Return(value) => {
            indent(depth, out);
            out.push_str("return");
            if let Some(value) = value {
                out.push(' ');
                print_expr(value, out);
            }
            out.push_str(";\n");
        }
        StmtKind::Expr(expr) => {
            indent(depth, out);
            print_expr(expr, out);
            out.push_str(";\n");
        }
        StmtKind::VarDecl { name, ty, init } => {
            indent(depth, out);
            let _ = write!(out, "{} {}", ty.ty, name);
            if let Some(init) = init {
                out.push_str(" = ");
                print_expr(init, out);
            }
            out.push_str(";\n");
        }
        StmtKind::If {
            condition,
            then_block,
            else_ifs,
            else_block,
        } => {
            indent(depth, out);
            out.push_str("if (");
            print_expr(condition, out);
            out.push_str(") {\n");
            print_block_stmts(then_block, depth + 1, out);
            indent(depth, out);
            out.push('}');
            for elif in *else_ifs {
                out.push_str(" else if (");
                print_expr(elif.condition, out);
                out.push_str(") {\n");
                print_block_stmts(&elif.body, depth + 1, out);
                indent(depth, out);
                out.push('}');
            }
            if let Some(else_block) = else_block {
                out.push_str(" else {\n");
                print_block_stmts(else_block, depth + 1, out);
                indent(depth, out);
                out.push('}');
            }
            out.push('\n');
        }
        StmtKind::While { condition, body } => {
            indent(depth, out);
            out.push_str("while (");
            print_expr(condition, out);
            out.push_str(") {\n");
            print_block_stmts(body, depth + 1, out);
            indent(depth, out);
            out.push_str("}\n");
        }
        StmtKind::For {
            init,
            condition,
            update,
            body,
        } => {
            indent(depth, out);
            out.push_str("for (");
            if let Some(init) = init {
                match &init.kind {
                    StmtKind::VarDecl { name, ty, init } => {
                        let _ = write!(out, "{} {}", ty.ty, name);
                        if let Some(init) = init {
                            out.push_str(" = ");
                            print_expr(init, out);
                        }
                    }
                    StmtKind::Expr(expr) => print_expr(expr, out),
                    _ => {}
                }
            }
            out.push_str("; ");
            if let Some(condition) = condition {
                print_expr(condition, out);
            }
            out.push_str("; ");
            if let Some(update) = update {
                print_expr(update, out);
            }
            out.push_str(") {\n");
            print_block_stmts(body, depth + 1, out);
            indent(depth, out);
            out.push_str("}\n");
        }
        StmtKind::Block(block) => {
            indent(depth, out);
            out.push_str("{\n");
            print_block_stmts(block, depth + 1, out);
            indent(depth, out);
            out.push_str("}\n");
        }
        StmtKind::Dbg { args } => {
            indent(depth, out);
            out.push_str("dbg(");
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(arg.expr, out);
            }
            out.push_str(");\n");
        }
    }
}

fn print_expr(expr: &Expr<'_>, out: &mut String) {
    match &expr.kind {
        ExprKind::IntLiteral(value) => {
            let _ = write!(out, "{}", value);
        }
        ExprKind::BoolLiteral(value) => {
            out.push_str(if *value { "true" } else { "false" });
        }
        ExprKind::Variable(name) => out.push_str(name),
        ExprKind::Binary { op, left, right } => {
            out.push('(');
            print_expr(left, out);
            let _ = write!(out, " {} ", op.symbol());
            print_expr(right, out);
            out.push(')');
        }
        ExprKind::Unary { op, operand } => {
            out.push('(');
            out.push_str(op.symbol());
            print_expr(operand, out);
            out.push(')');
        }
        ExprKind::Call { name, args, .. } => {
            out.push_str(name);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                print_expr(arg, out);
            }
            out.push(')');
        }
    }
}
