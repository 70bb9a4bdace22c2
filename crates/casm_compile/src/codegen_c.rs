//! C back end.
//!
//! Emits one self-contained translation unit: standard headers, forward
//! declarations for every reachable function (ordered by allocated name),
//! then definitions in program order. Unreachable functions are elided
//! entirely.
//!
//! Expressions are emitted fully parenthesized for every binary operation,
//! so source precedence survives no matter how the C compiler would have
//! grouped things. Assignments that appear *inside* another expression get
//! an extra pair of parentheses to keep their value-producing semantics.
//!
//! `dbg(a, b, …)` lowers to a single `printf` per statement. Arguments
//! that are function calls are hoisted into `__dbg_tmp_N` temporaries
//! first (the counter increments across the whole emission), preserving
//! evaluation order and single evaluation; everything else is inlined with
//! the cast its type requires.

use std::collections::HashMap;
use std::fmt::Write;

use casm_language::ast::{Block, DbgArg, Expr, ExprKind, Stmt, StmtKind};
use casm_language::{BinaryOp, Function, Program, Type};

/// Emits the whole program as C source text.
pub fn emit_c(program: &Program<'_>) -> String {
    let mut emitter = CEmitter::new(program);
    emitter.emit_program(program);
    emitter.out
}

fn c_type(ty: Type) -> &'static str {
    match ty {
        Type::I8 => "int8_t",
        Type::I16 => "int16_t",
        Type::I32 => "int32_t",
        Type::I64 => "int64_t",
        Type::U8 => "uint8_t",
        Type::U16 => "uint16_t",
        Type::U32 => "uint32_t",
        Type::U64 => "uint64_t",
        Type::Bool => "_Bool",
        Type::Void => "void",
    }
}

/// Qualified names that were never resolved fall back to a textual
/// mangling: `:` becomes `_`.
fn mangle(name: &str) -> String {
    name.replace(':', "_")
}

struct CEmitter<'p> {
    out: String,
    /// symbol id → allocated name, for resolved call sites.
    names: HashMap<u32, &'p str>,
    dbg_tmp_counter: u32,
}

impl<'p> CEmitter<'p> {
    fn new(program: &'p Program<'_>) -> Self {
        let mut names = HashMap::new();
        for function in &program.functions {
            if let Some(allocated) = function.allocated_name.as_deref() {
                names.insert(function.symbol_id, allocated);
            }
        }
        Self {
            out: String::new(),
            names,
            dbg_tmp_counter: 0,
        }
    }

    fn emit_program(&mut self, program: &Program<'_>) {
        self.out.push_str("#include <stdint.h>\n");
        self.out.push_str("#include <stdbool.h>\n");
        self.out.push_str("#include <stdio.h>\n");
        self.out.push('\n');

        let mut reachable: Vec<&Function<'_>> = program
            .functions
            .iter()
            .filter(|f| f.allocated_name.is_some())
            .collect();

        let mut declarations = reachable.clone();
        declarations.sort_by_key(|f| f.allocated_name.as_deref().unwrap_or(""));
        for function in &declarations {
            self.emit_signature(function);
            self.out.push_str(";\n");
        }
        self.out.push('\n');

        let last = reachable.len().saturating_sub(1);
        for (i, function) in reachable.drain(..).enumerate() {
            self.emit_signature(function);
            self.out.push_str(" {\n");
            self.emit_block_stmts(&function.body, function, 1);
            self.out.push_str("}\n");
            if i < last {
                self.out.push('\n');
            }
        }
    }

    fn emit_signature(&mut self, function: &Function<'_>) {
        let name = function.allocated_name.as_deref().unwrap_or(function.name);
        let _ = write!(
            self.out,
            "{} {}(",
            c_type(function.return_type.ty),
            mangle(name)
        );
        if function.params.is_empty() {
            self.out.push_str("void");
        } else {
            for (i, param) in function.params.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                let _ = write!(self.out, "{} {}", c_type(param.ty.ty), param.name);
            }
        }
        self.out.push(')');
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str("    ");
        }
    }

    fn emit_block_stmts(&mut self, block: &Block<'_>, function: &Function<'_>, depth: usize) {
        for stmt in block.stmts {
            self.emit_stmt(stmt, function, depth);
        }
    }

    fn emit_stmt(&mut self, stmt: &Stmt<'_>, function: &Function<'_>, depth: usize) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                self.indent(depth);
                let _ = write!(self.out, "{} {}", c_type(ty.ty), name);
                if let Some(init) = init {
                    let text = self.expr_text(init, false);
                    let _ = write!(self.out, " = {}", text);
                }
                self.out.push_str(";\n");
            }
            StmtKind::Expr(expr) => {
                self.indent(depth);
                let text = self.expr_text(expr, false);
                let _ = write!(self.out, "{};\n", text);
            }
            StmtKind::Return(value) => {
                self.indent(depth);
                self.out.push_str("return");
                if let Some(value) = value {
                    let text = self.expr_text(value, false);
                    let _ = write!(self.out, " {}", text);
                }
                self.out.push_str(";\n");
            }
            StmtKind::If {
                condition,
                then_block,
                else_ifs,
                else_block,
            } => {
                self.indent(depth);
                let text = self.expr_text(condition, false);
                let _ = write!(self.out, "if ({}) {{\n", text);
                self.emit_block_stmts(then_block, function, depth + 1);
                self.indent(depth);
                self.out.push('}');

                for elif in *else_ifs {
                    let text = self.expr_text(elif.condition, false);
                    let _ = write!(self.out, " else if ({}) {{\n", text);
                    self.emit_block_stmts(&elif.body, function, depth + 1);
                    self.indent(depth);
                    self.out.push('}');
                }

                if let Some(else_block) = else_block {
                    self.out.push_str(" else {\n");
                    self.emit_block_stmts(else_block, function, depth + 1);
                    self.indent(depth);
                    self.out.push('}');
                }
                self.out.push('\n');
            }
            StmtKind::While { condition, body } => {
                self.indent(depth);
                let text = self.expr_text(condition, false);
                let _ = write!(self.out, "while ({}) {{\n", text);
                self.emit_block_stmts(body, function, depth + 1);
                self.indent(depth);
                self.out.push_str("}\n");
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.indent(depth);
                self.out.push_str("for (");
                if let Some(init) = init {
                    match &init.kind {
                        StmtKind::VarDecl { name, ty, init } => {
                            let _ = write!(self.out, "{} {}", c_type(ty.ty), name);
                            if let Some(init) = init {
                                let text = self.expr_text(init, false);
                                let _ = write!(self.out, " = {}", text);
                            }
                        }
                        StmtKind::Expr(expr) => {
                            let text = self.expr_text(expr, false);
                            self.out.push_str(&text);
                        }
                        _ => {}
                    }
                }
                self.out.push_str("; ");
                if let Some(condition) = condition {
                    let text = self.expr_text(condition, false);
                    self.out.push_str(&text);
                }
                self.out.push_str("; ");
                if let Some(update) = update {
                    let text = self.expr_text(update, false);
                    self.out.push_str(&text);
                }
                self.out.push_str(") {\n");
                self.emit_block_stmts(body, function, depth + 1);
                self.indent(depth);
                self.out.push_str("}\n");
            }
            StmtKind::Block(block) => {
                // Brace-wrapped so the scope survives in the C output.
                self.indent(depth);
                self.out.push_str("{\n");
                self.emit_block_stmts(block, function, depth + 1);
                self.indent(depth);
                self.out.push_str("}\n");
            }
            StmtKind::Dbg { args } => self.emit_dbg(stmt, args, function, depth),
        }
    }

    /// One `printf` per `dbg`, with call arguments hoisted into
    /// single-evaluation temporaries first.
    fn emit_dbg(
        &mut self,
        stmt: &Stmt<'_>,
        args: &[DbgArg<'_>],
        function: &Function<'_>,
        depth: usize,
    ) {
        let mut value_texts: Vec<String> = Vec::with_capacity(args.len());

        for arg in args {
            if matches!(arg.expr.kind, ExprKind::Call { .. }) {
                let tmp = format!("__dbg_tmp_{}", self.dbg_tmp_counter);
                self.dbg_tmp_counter += 1;
                let init = self.expr_text(arg.expr, false);
                self.indent(depth);
                let _ = write!(self.out, "{} {} = {};\n", c_type(arg.expr.ty()), tmp, init);
                value_texts.push(tmp);
            } else {
                value_texts.push(self.expr_text(arg.expr, true));
            }
        }

        let mut format = format!(
            "{}:{}:{}: ",
            function.display_path, stmt.location.line, stmt.location.column
        );
        let mut values = String::new();
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                format.push_str(", ");
            }
            let label = arg.label.replace('%', "%%");
            let _ = write!(format, "{} = {}", label, dbg_format_spec(arg.expr.ty()));
            values.push_str(", ");
            values.push_str(&dbg_value_text(arg.expr.ty(), &value_texts[i]));
        }

        self.indent(depth);
        let _ = write!(self.out, "printf(\"{}\\n\"{});\n", format, values);
    }

    fn expr_text(&self, expr: &Expr<'_>, nested: bool) -> String {
        match &expr.kind {
            ExprKind::IntLiteral(value) => value.to_string(),
            ExprKind::BoolLiteral(value) => if *value { "true" } else { "false" }.to_string(),
            ExprKind::Variable(name) => (*name).to_string(),
            ExprKind::Binary { op, left, right } => {
                if *op == BinaryOp::Assign {
                    let text = format!(
                        "{} = {}",
                        self.expr_text(left, true),
                        self.expr_text(right, true)
                    );
                    if nested {
                        format!("({})", text)
                    } else {
                        text
                    }
                } else {
                    format!(
                        "({} {} {})",
                        self.expr_text(left, true),
                        op.symbol(),
                        self.expr_text(right, true)
                    )
                }
            }
            ExprKind::Unary { op, operand } => {
                format!("({}{})", op.symbol(), self.expr_text(operand, true))
            }
            ExprKind::Call {
                name,
                args,
                resolved_symbol,
            } => {
                let callee = self
                    .names
                    .get(&resolved_symbol.get())
                    .map(|n| mangle(n))
                    .unwrap_or_else(|| mangle(name));
                let mut text = format!("{}(", callee);
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        text.push_str(", ");
                    }
                    text.push_str(&self.expr_text(arg, true));
                }
                text.push(')');
                text
            }
        }
    }
}

/// printf conversion for a debug value of the given type.
fn dbg_format_spec(ty: Type) -> &'static str {
    match ty {
        Type::I8 | Type::I16 | Type::I32 => "%d",
        Type::I64 => "%lld",
        Type::U8 | Type::U16 | Type::U32 => "%u",
        Type::U64 => "%llu",
        Type::Bool => "%s",
        Type::Void => "%d",
    }
}

/// The argument expression passed to printf, with the cast its conversion
/// requires.
fn dbg_value_text(ty: Type, text: &str) -> String {
    match ty {
        Type::I64 => format!("(long long){}", text),
        Type::U8 | Type::U16 | Type::U32 => format!("(unsigned int){}", text),
        Type::U64 => format!("(unsigned long long){}", text),
        Type::Bool => format!("({}) ? \"true\" : \"false\"", text),
        _ => text.to_string(),
    }
}
