//! WebAssembly text back end.
//!
//! Emits one self-contained `(module …)`. All integer source types share
//! the stack lowering of the source compiler: locals and literal constants
//! are `i32`, with signedness encoded in operator suffixes (`div_s` vs
//! `div_u`, `lt_s` vs `lt_u`, …). Declared parameter and result types use
//! the width mapping (`i64` for the 64-bit types). `bool` is `i32` with
//! values 0 and 1.
//!
//! ## Control flow
//!
//! `while` and `for` lower to the `block $break` / `loop $continue` shape
//! with the condition negated into a `br_if $break`; `for` re-emits its
//! update expression immediately before `br $continue`. An else-if chain
//! nests a fresh `if` inside the outer `else`, one `end` per opened `if`.
//!
//! ## Debug lowering
//!
//! If any reachable function contains a `dbg` statement the module imports
//! the seven-function `host` debug interface and declares one page of
//! memory. Each `dbg` appends its format text, `<file>:<line>:<col>:
//! label = %, ...` with `%` doubled inside labels, to a growing data pool
//! and emits `debug_begin(offset, len)`, one `debug_value_<type>` per
//! argument, and a final `debug_end`. The pool is flushed after the last
//! function as a single `(data (i32.const 0) …)` directive, and `"memory"`
//! is exported. Without `dbg` no imports, memory, or data appear at all.

use std::collections::HashMap;
use std::fmt::Write;

use casm_base::SourceLocation;
use casm_language::ast::{Block, DbgArg, Expr, ExprKind, Stmt, StmtKind};
use casm_language::{BinaryOp, Function, Program, Type, UnaryOp};

/// Emitter failures. Only malformed input that slipped past semantic
/// analysis can trigger these.
#[derive(Debug)]
pub enum EmitError {
    /// A `dbg` argument whose type has no debug channel.
    UnsupportedDbgType {
        ty: Type,
        location: SourceLocation,
    },
}

impl std::fmt::Display for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmitError::UnsupportedDbgType { ty, location } => write!(
                f,
                "dbg argument of unsupported type '{}' at {}",
                ty, location
            ),
        }
    }
}

impl std::error::Error for EmitError {}

/// Emits the whole program as WAT text.
pub fn emit_wat(program: &Program<'_>) -> Result<String, EmitError> {
    let mut emitter = WatEmitter::new(program);
    emitter.emit_program(program)?;
    Ok(emitter.out)
}

/// Declared-width type mapping for parameters and results.
fn wat_type(ty: Type) -> &'static str {
    match ty {
        Type::I64 | Type::U64 => "i64",
        _ => "i32",
    }
}

fn mangle(name: &str) -> String {
    name.replace(':', "_")
}

/// The growing format-string pool flushed as the module's data segment.
#[derive(Default)]
struct DataPool {
    entries: Vec<String>,
    total_len: usize,
}

impl DataPool {
    /// Appends a format text, returning its `(offset, length)` in the
    /// segment. The next format's offset is the current cumulative length.
    fn append(&mut self, text: String) -> (usize, usize) {
        let offset = self.total_len;
        let length = text.len();
        self.total_len += length;
        self.entries.push(text);
        (offset, length)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct WatEmitter<'p> {
    out: String,
    names: HashMap<u32, &'p str>,
    pool: DataPool,
}

impl<'p> WatEmitter<'p> {
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
            pool: DataPool::default(),
        }
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth * 2 {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn emit_program(&mut self, program: &Program<'_>) -> Result<(), EmitError> {
        self.out.push_str("(module\n");

        let reachable: Vec<&Function<'_>> = program
            .functions
            .iter()
            .filter(|f| f.allocated_name.is_some())
            .collect();

        let has_dbg = reachable.iter().any(|f| block_has_dbg(&f.body));
        if has_dbg {
            self.line(1, "(import \"host\" \"debug_begin\" (func $debug_begin (param i32 i32)))");
            self.line(1, "(import \"host\" \"debug_value_i32\" (func $debug_value_i32 (param i32)))");
            self.line(1, "(import \"host\" \"debug_value_i64\" (func $debug_value_i64 (param i64)))");
            self.line(1, "(import \"host\" \"debug_value_u32\" (func $debug_value_u32 (param i32)))");
            self.line(1, "(import \"host\" \"debug_value_u64\" (func $debug_value_u64 (param i64)))");
            self.line(1, "(import \"host\" \"debug_value_bool\" (func $debug_value_bool (param i32)))");
            self.line(1, "(import \"host\" \"debug_end\" (func $debug_end))");
            self.line(1, "(memory 1)");
        }

        let last = reachable.len().saturating_sub(1);
        for (i, function) in reachable.iter().enumerate() {
            self.emit_function(function)?;
            if i < last {
                self.out.push('\n');
            }
        }

        if let Some(main) = reachable
            .iter()
            .find(|f| f.original_name == "main")
            .and_then(|f| f.allocated_name.as_deref())
        {
            let text = format!("(export \"main\" (func ${}))", mangle(main));
            self.line(1, &text);
        }

        if has_dbg && !self.pool.is_empty() {
            let mut data = String::from("(data (i32.const 0)");
            for entry in &self.pool.entries {
                let _ = write!(data, " \"{}\"", escape_wat_string(entry));
            }
            data.push(')');
            self.line(1, &data);
            self.line(1, "(export \"memory\" (memory 0))");
        }

        self.out.push_str(")\n");
        Ok(())
    }

    fn emit_function(&mut self, function: &Function<'_>) -> Result<(), EmitError> {
        let name = function
            .allocated_name
            .as_deref()
            .unwrap_or(function.original_name);

        let mut header = format!("(func ${}", mangle(name));
        for param in &function.params {
            let _ = write!(header, " (param ${} {})", param.name, wat_type(param.ty.ty));
        }
        if function.return_type.ty != Type::Void {
            let _ = write!(header, " (result {})", wat_type(function.return_type.ty));
        }

        // Locals are hoisted to the function header; nested control flow is
        // searched, nested scopes flatten into one namespace.
        let mut locals: Vec<&str> = Vec::new();
        collect_locals_in_block(&function.body, &mut locals);
        for local in locals {
            if function.params.iter().any(|p| p.name == local) {
                continue;
            }
            let _ = write!(header, " (local ${} i32)", local);
        }

        self.line(1, &header);
        for stmt in function.body.stmts {
            self.emit_stmt(stmt, function, 2)?;
        }
        self.line(1, ")");
        Ok(())
    }

    fn emit_stmt(
        &mut self,
        stmt: &Stmt<'_>,
        function: &Function<'_>,
        depth: usize,
    ) -> Result<(), EmitError> {
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => {
                if let Some(init) = init {
                    self.emit_expr(init, depth);
                    let text = format!("local.set ${}", name);
                    self.line(depth, &text);
                }
            }
            StmtKind::Expr(expr) => {
                self.emit_expr(expr, depth);
                if expr.ty() != Type::Void {
                    self.line(depth, "drop");
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.emit_expr(value, depth);
                }
                self.line(depth, "return");
            }
            StmtKind::If {
                condition,
                then_block,
                else_ifs,
                else_block,
            } => {
                self.emit_if(condition, then_block, else_ifs, else_block.as_ref(), function, depth)?;
            }
            StmtKind::While { condition, body } => {
                self.line(depth, "block $break");
                self.line(depth, "loop $continue");
                self.emit_expr(condition, depth + 1);
                self.line(depth + 1, "i32.eqz");
                self.line(depth + 1, "br_if $break");
                for stmt in body.stmts {
                    self.emit_stmt(stmt, function, depth + 1)?;
                }
                self.line(depth + 1, "br $continue");
                self.line(depth, "end");
                self.line(depth, "end");
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.emit_stmt(init, function, depth)?;
                }
                self.line(depth, "block $break");
                self.line(depth, "loop $continue");
                if let Some(condition) = condition {
                    self.emit_expr(condition, depth + 1);
                    self.line(depth + 1, "i32.eqz");
                    self.line(depth + 1, "br_if $break");
                }
                for stmt in body.stmts {
                    self.emit_stmt(stmt, function, depth + 1)?;
                }
                if let Some(update) = update {
                    self.emit_expr(update, depth + 1);
                    if update.ty() != Type::Void {
                        self.line(depth + 1, "drop");
                    }
                }
                self.line(depth + 1, "br $continue");
                self.line(depth, "end");
                self.line(depth, "end");
            }
            StmtKind::Block(block) => {
                // No Wasm wrapping; blocks only matter for scope collection.
                for stmt in block.stmts {
                    self.emit_stmt(stmt, function, depth)?;
                }
            }
            StmtKind::Dbg { args } => self.emit_dbg(stmt, args, function, depth)?,
        }
        Ok(())
    }

    /// `if … (else …)? end`, nesting each else-if inside the outer `else`.
    fn emit_if(
        &mut self,
        condition: &Expr<'_>,
        then_block: &Block<'_>,
        else_ifs: &[casm_language::ElseIf<'_>],
        else_block: Option<&Block<'_>>,
        function: &Function<'_>,
        depth: usize,
    ) -> Result<(), EmitError> {
        self.emit_expr(condition, depth);
        self.line(depth, "if");
        for stmt in then_block.stmts {
            self.emit_stmt(stmt, function, depth + 1)?;
        }

        if let Some((head, rest)) = else_ifs.split_first() {
            self.line(depth, "else");
            self.emit_if(head.condition, &head.body, rest, else_block, function, depth + 1)?;
        } else if let Some(else_block) = else_block {
            self.line(depth, "else");
            for stmt in else_block.stmts {
                self.emit_stmt(stmt, function, depth + 1)?;
            }
        }

        self.line(depth, "end");
        Ok(())
    }

    fn emit_dbg(
        &mut self,
        stmt: &Stmt<'_>,
        args: &[DbgArg<'_>],
        function: &Function<'_>,
        depth: usize,
    ) -> Result<(), EmitError> {
        let mut format = format!(
            "{}:{}:{}: ",
            function.display_path, stmt.location.line, stmt.location.column
        );
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                format.push_str(", ");
            }
            let _ = write!(format, "{} = %", arg.label.replace('%', "%%"));
        }

        let (offset, length) = self.pool.append(format);
        let text = format!("i32.const {}", offset);
        self.line(depth, &text);
        let text = format!("i32.const {}", length);
        self.line(depth, &text);
        self.line(depth, "call $debug_begin");

        for arg in args {
            let suffix = match arg.expr.ty() {
                Type::I8 | Type::I16 | Type::I32 => "i32",
                Type::I64 => "i64",
                Type::U8 | Type::U16 | Type::U32 => "u32",
                Type::U64 => "u64",
                Type::Bool => "bool",
                Type::Void => {
                    return Err(EmitError::UnsupportedDbgType {
                        ty: Type::Void,
                        location: arg.expr.location,
                    })
                }
            };
            self.emit_expr(arg.expr, depth);
            let text = format!("call $debug_value_{}", suffix);
            self.line(depth, &text);
        }

        self.line(depth, "call $debug_end");
        Ok(())
    }

    fn emit_expr(&mut self, expr: &Expr<'_>, depth: usize) {
        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                let text = format!("i32.const {}", value);
                self.line(depth, &text);
            }
            ExprKind::BoolLiteral(value) => {
                let text = format!("i32.const {}", if *value { 1 } else { 0 });
                self.line(depth, &text);
            }
            ExprKind::Variable(name) => {
                let text = format!("local.get ${}", name);
                self.line(depth, &text);
            }
            ExprKind::Binary { op, left, right } => {
                if *op == BinaryOp::Assign {
                    self.emit_expr(right, depth);
                    if let ExprKind::Variable(name) = &left.kind {
                        let text = format!("local.tee ${}", name);
                        self.line(depth, &text);
                    }
                } else {
                    self.emit_expr(left, depth);
                    self.emit_expr(right, depth);
                    self.line(depth, binop_instruction(*op, left.ty()));
                }
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    self.line(depth, "i32.const 0");
                    self.emit_expr(operand, depth);
                    self.line(depth, "i32.sub");
                }
                UnaryOp::Not => {
                    self.emit_expr(operand, depth);
                    self.line(depth, "i32.eqz");
                }
            },
            ExprKind::Call {
                name,
                args,
                resolved_symbol,
            } => {
                for arg in *args {
                    self.emit_expr(arg, depth);
                }
                let callee = self
                    .names
                    .get(&resolved_symbol.get())
                    .map(|n| mangle(n))
                    .unwrap_or_else(|| mangle(name));
                let text = format!("call ${}", callee);
                self.line(depth, &text);
            }
        }
    }
}

/// Instruction for a (non-assignment) binary operator over operands of the
/// given resolved type. Signedness picks the suffix; logical operators are
/// plain bitwise ops because their operands are already 0/1.
fn binop_instruction(op: BinaryOp, operand_ty: Type) -> &'static str {
    let signed = !operand_ty.is_numeric() || operand_ty.is_signed();
    match op {
        BinaryOp::Add => "i32.add",
        BinaryOp::Sub => "i32.sub",
        BinaryOp::Mul => "i32.mul",
        BinaryOp::Div => {
            if signed {
                "i32.div_s"
            } else {
                "i32.div_u"
            }
        }
        BinaryOp::Mod => {
            if signed {
                "i32.rem_s"
            } else {
                "i32.rem_u"
            }
        }
        BinaryOp::Eq => "i32.eq",
        BinaryOp::Ne => "i32.ne",
        BinaryOp::Lt => {
            if signed {
                "i32.lt_s"
            } else {
                "i32.lt_u"
            }
        }
        BinaryOp::Gt => {
            if signed {
                "i32.gt_s"
            } else {
                "i32.gt_u"
            }
        }
        BinaryOp::Le => {
            if signed {
                "i32.le_s"
            } else {
                "i32.le_u"
            }
        }
        BinaryOp::Ge => {
            if signed {
                "i32.ge_s"
            } else {
                "i32.ge_u"
            }
        }
        BinaryOp::And => "i32.and",
        BinaryOp::Or => "i32.or",
        BinaryOp::Assign => unreachable!("assignment lowers to local.tee"),
    }
}

/// Collects declared variable names for the function header, recursing
/// through nested control flow but never into another function.
fn collect_locals_in_block<'a>(block: &Block<'a>, out: &mut Vec<&'a str>) {
    for stmt in block.stmts {
        collect_locals_in_stmt(stmt, out);
    }
}

fn collect_locals_in_stmt<'a>(stmt: &Stmt<'a>, out: &mut Vec<&'a str>) {
    match &stmt.kind {
        StmtKind::VarDecl { name, .. } => {
            if !out.contains(name) {
                out.push(*name);
            }
        }
        StmtKind::If {
            then_block,
            else_ifs,
            else_block,
            ..
        } => {
            collect_locals_in_block(then_block, out);
            for elif in *else_ifs {
                collect_locals_in_block(&elif.body, out);
            }
            if let Some(else_block) = else_block {
                collect_locals_in_block(else_block, out);
            }
        }
        StmtKind::While { body, .. } => collect_locals_in_block(body, out),
        StmtKind::For { init, body, .. } => {
            if let Some(init) = init {
                collect_locals_in_stmt(init, out);
            }
            collect_locals_in_block(body, out);
        }
        StmtKind::Block(block) => collect_locals_in_block(block, out),
        _ => {}
    }
}

fn block_has_dbg(block: &Block<'_>) -> bool {
    block.stmts.iter().any(stmt_has_dbg)
}

fn stmt_has_dbg(stmt: &Stmt<'_>) -> bool {
    match &stmt.kind {
        StmtKind::Dbg { .. } => true,
        StmtKind::If {
            then_block,
            else_ifs,
            else_block,
            ..
        } => {
            block_has_dbg(then_block)
                || else_ifs.iter().any(|e| block_has_dbg(&e.body))
                || else_block.as_ref().map_or(false, block_has_dbg)
        }
        StmtKind::While { body, .. } => block_has_dbg(body),
        StmtKind::For { init, body, .. } => {
            init.map_or(false, |i| stmt_has_dbg(i)) || block_has_dbg(body)
        }
        StmtKind::Block(block) => block_has_dbg(block),
        _ => false,
    }
}

/// Escapes a format text for a WAT string literal.
fn escape_wat_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(byte as char),
            other => {
                let _ = write!(out, "\\{:02x}", other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::finalize_single_module;
    use crate::name_alloc::allocate_names;
    use crate::semantics::analyze_program;
    use casm_base::DiagnosticList;
    use casm_language::{AstArenas, AstContext, Parser};

    fn compile(source: &str) -> String {
        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let source = ctx.str(source);
        let mut parser = Parser::new(ctx, source);
        let mut program = parser.parse();
        assert!(parser.errors().is_empty(), "{:?}", parser.errors());
        finalize_single_module(&mut program, "test.csm");
        let mut diagnostics = DiagnosticList::new();
        assert!(
            analyze_program(&program, &mut diagnostics),
            "semantic errors: {}",
            diagnostics.render()
        );
        allocate_names(&mut program);
        emit_wat(&program).unwrap()
    }

    fn ops_of(wat: &str) -> Vec<&str> {
        wat.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn arithmetic_lowers_to_the_stack_model() {
        let wat = compile("i32 main() { i32 x = 2 + 3 * 4; return x; }");
        let ops = ops_of(&wat);
        let start = ops.iter().position(|l| l.starts_with("(func $main")).unwrap();
        assert_eq!(
            &ops[start + 1..start + 9],
            &[
                "i32.const 2",
                "i32.const 3",
                "i32.const 4",
                "i32.mul",
                "i32.add",
                "local.set $x",
                "local.get $x",
                "return",
            ]
        );
        assert!(wat.contains("(func $main (result i32) (local $x i32)"));
    }

    #[test]
    fn module_without_dbg_has_no_imports_or_memory() {
        let wat = compile("i32 main() { return 0; }");
        assert!(!wat.contains("import"));
        assert!(!wat.contains("memory"));
        assert!(!wat.contains("(data"));
    }

    #[test]
    fn main_is_exported_as_main() {
        let wat = compile("i32 main() { return 0; }");
        assert!(wat.contains("(export \"main\" (func $main))"));
    }

    #[test]
    fn assignment_uses_local_tee() {
        let wat = compile("i32 main() { i32 x; return (x = 1) + (x = 2); }");
        let count = wat.matches("local.tee $x").count();
        assert_eq!(count, 2, "got:\n{}", wat);
    }

    #[test]
    fn statement_assignment_drops_the_value() {
        let wat = compile("i32 main() { i32 x; x = 3; return x; }");
        assert!(wat.contains("local.tee $x"), "got:\n{}", wat);
        assert!(wat.contains("drop"), "got:\n{}", wat);
    }

    #[test]
    fn unary_operators_lower_as_specified() {
        let wat = compile("i32 main() { i32 x = 5; bool b = true; i32 y = -x; bool c = !b; return y; }");
        let ops = ops_of(&wat);
        let neg = ops.iter().position(|l| *l == "i32.const 0").unwrap();
        assert_eq!(ops[neg + 1], "local.get $x");
        assert_eq!(ops[neg + 2], "i32.sub");
        assert!(wat.contains("i32.eqz"), "got:\n{}", wat);
    }

    #[test]
    fn unsigned_operations_use_unsigned_suffixes() {
        let wat = compile("i32 main() { u32 a = 10; u32 b = 3; u32 q = a / b; bool lt = a < b; dbg(q); if (lt) { return 1; } return 0; }");
        assert!(wat.contains("i32.div_u"), "got:\n{}", wat);
        assert!(wat.contains("i32.lt_u"), "got:\n{}", wat);
    }

    #[test]
    fn signed_operations_use_signed_suffixes() {
        let wat = compile("i32 main() { i32 a = 10; i32 b = 3; i32 q = a / b; i32 r = a % b; return q + r; }");
        assert!(wat.contains("i32.div_s"), "got:\n{}", wat);
        assert!(wat.contains("i32.rem_s"), "got:\n{}", wat);
    }

    #[test]
    fn while_lowers_to_block_loop() {
        let wat = compile("i32 main() { i32 x = 0; while (x < 3) { x = x + 1; } return x; }");
        let ops = ops_of(&wat);
        let block = ops.iter().position(|l| *l == "block $break").unwrap();
        assert_eq!(ops[block + 1], "loop $continue");
        assert!(wat.contains("i32.eqz"));
        assert!(wat.contains("br_if $break"));
        assert!(wat.contains("br $continue"));
    }

    #[test]
    fn for_update_runs_before_the_back_branch() {
        let wat = compile("i32 main() { i32 acc = 0; for (i32 i = 0; i < 3; i = i + 1) { acc = acc + i; } return acc; }");
        let ops = ops_of(&wat);
        let br = ops.iter().rposition(|l| *l == "br $continue").unwrap();
        // The update (i = i + 1 via tee, then drop) sits right before br.
        assert_eq!(ops[br - 1], "drop");
        assert_eq!(ops[br - 2], "local.tee $i");
    }

    #[test]
    fn else_if_chain_nests_with_matched_ends() {
        let wat = compile(
            "i32 main() { i32 x = 1; if (x < 0) { return 0; } else if (x < 2) { return 1; } else { return 2; } return 3; }",
        );
        let ifs = wat.lines().filter(|l| l.trim() == "if").count();
        let ends = wat.lines().filter(|l| l.trim() == "end").count();
        // One end per if; no loops in this program.
        assert_eq!(ifs, 2, "got:\n{}", wat);
        assert_eq!(ends, ifs, "got:\n{}", wat);
    }

    #[test]
    fn dbg_emits_the_host_protocol() {
        let wat = compile("i32 main() {\n    i32 x = 5;\n    dbg(x, x + 1);\n    return 0;\n}");
        assert!(wat.contains("(import \"host\" \"debug_begin\" (func $debug_begin (param i32 i32)))"));
        assert!(wat.contains("(import \"host\" \"debug_end\" (func $debug_end))"));
        assert!(wat.contains("(memory 1)"));
        assert!(wat.contains("(export \"memory\" (memory 0))"));

        let ops = ops_of(&wat);
        let begin = ops.iter().position(|l| *l == "call $debug_begin").unwrap();
        assert_eq!(ops[begin - 2], "i32.const 0");
        let format = "test.csm:3:4: x = %, x + 1 = %";
        assert_eq!(ops[begin - 1], format!("i32.const {}", format.len()));
        assert_eq!(ops[begin + 1], "local.get $x");
        assert_eq!(ops[begin + 2], "call $debug_value_i32");
        assert_eq!(ops[begin + 3], "local.get $x");
        assert_eq!(ops[begin + 4], "i32.const 1");
        assert_eq!(ops[begin + 5], "i32.add");
        assert_eq!(ops[begin + 6], "call $debug_value_i32");
        assert_eq!(ops[begin + 7], "call $debug_end");

        assert!(
            wat.contains("(data (i32.const 0) \"test.csm:3:4: x = %, x + 1 = %\")"),
            "got:\n{}",
            wat
        );
    }

    #[test]
    fn second_format_starts_at_the_first_ones_length() {
        let wat = compile(
            "i32 main() {\n    i32 x = 1;\n    dbg(x);\n    dbg(x);\n    return 0;\n}",
        );
        let first = "test.csm:3:4: x = %";
        assert!(wat.contains(&format!("i32.const {}", first.len())), "got:\n{}", wat);
        // Second dbg begins at offset == len(first).
        let ops = ops_of(&wat);
        let begins: Vec<usize> = ops
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == "call $debug_begin")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(begins.len(), 2);
        assert_eq!(ops[begins[1] - 2], format!("i32.const {}", first.len()));
    }

    #[test]
    fn dbg_value_channels_match_types() {
        let wat = compile(
            "i32 main() { i64 a = 1; u64 b = 2; u32 c = 3; bool d = true; dbg(a, b, c, d); return 0; }",
        );
        assert!(wat.contains("call $debug_value_i64"));
        assert!(wat.contains("call $debug_value_u64"));
        assert!(wat.contains("call $debug_value_u32"));
        assert!(wat.contains("call $debug_value_bool"));
    }

    #[test]
    fn dead_functions_do_not_appear() {
        let wat = compile("i32 unused() { return 9; }\ni32 main() { return 0; }");
        assert!(!wat.contains("$unused"), "got:\n{}", wat);
    }

    #[test]
    fn parameters_use_declared_width_mapping() {
        let wat = compile("i64 wide(i64 n) { return n; }\ni32 main() { wide(1); return 0; }");
        assert!(wat.contains("(func $wide (param $n i64) (result i64)"), "got:\n{}", wat);
    }

    #[test]
    fn void_function_has_no_result() {
        let wat = compile("void tick() { }\ni32 main() { tick(); return 0; }");
        assert!(wat.contains("(func $tick\n"), "got:\n{}", wat);
        assert!(!wat.contains("(func $tick (result"), "got:\n{}", wat);
    }

    #[test]
    fn emitting_twice_is_byte_identical() {
        let source = "i32 main() { i32 x = 1; dbg(x); while (x < 5) { x = x + 1; } return x; }";
        assert_eq!(compile(source), compile(source));
    }
}
