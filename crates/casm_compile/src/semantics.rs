//! Two-pass semantic analysis.
//!
//! Pass 1 registers every function of the merged program in the flat
//! [`FunctionTable`]; a duplicate definition inside one module is a hard
//! error and stops analysis before pass 2.
//!
//! Pass 2 walks each function body with a fresh [`ScopeStack`] seeded with
//! the parameters (marked initialized). Every expression receives its
//! `resolved_type`; every check records a diagnostic and continues where
//! feasible, so a single run reports every detectable error.
//!
//! The checks: undeclared and uninitialized variable use, assignment
//! target and type errors (the right-hand side is analyzed first so its
//! errors surface even when the left side is unusable), call arity and
//! argument types, unknown functions, arithmetic and comparison operand
//! rules, logical operators over `bool`, `bool`-typed control-flow
//! conditions, return-type mismatches in both directions, duplicate
//! variables per scope, structurally missing returns, and `void`-typed
//! `dbg` arguments. A call to a `void` function is accepted only as the
//! whole expression of an expression statement.

use casm_base::DiagnosticList;
use casm_language::ast::{Block, Expr, ExprKind, Stmt, StmtKind};
use casm_language::{binary_result_type, unary_result_type, BinaryOp, Program, Type, UnaryOp};

use crate::symtab::{FunctionTable, ScopeStack};

/// Runs both passes over a merged program.
///
/// Returns `true` when no diagnostics were produced; the program is then
/// fully annotated and safe to hand to the later phases.
pub fn analyze_program(program: &Program<'_>, diagnostics: &mut DiagnosticList) -> bool {
    let before = diagnostics.len();

    let mut table = FunctionTable::new();
    collect_functions(program, &mut table, diagnostics);
    if diagnostics.len() > before {
        return false;
    }

    for function in &program.functions {
        let mut analyzer = FunctionAnalyzer {
            table: &table,
            scopes: ScopeStack::new(),
            diagnostics: &mut *diagnostics,
            file: &function.display_path,
            module: &function.module_path,
            return_type: function.return_type.ty,
        };
        analyzer.analyze_function(function);
    }

    diagnostics.len() == before
}

/// Pass 1: register every function, rejecting same-module duplicates.
fn collect_functions<'a>(
    program: &Program<'a>,
    table: &mut FunctionTable<'a>,
    diagnostics: &mut DiagnosticList,
) {
    for function in &program.functions {
        if !table.add(function) {
            diagnostics.add(
                function.display_path.clone(),
                format!("Function '{}' already defined", function.original_name),
                function.location,
            );
        }
    }
}

struct FunctionAnalyzer<'t, 'a, 'd> {
    table: &'t FunctionTable<'a>,
    scopes: ScopeStack<'a>,
    diagnostics: &'d mut DiagnosticList,
    file: &'t str,
    module: &'t str,
    return_type: Type,
}

impl<'t, 'a, 'd> FunctionAnalyzer<'t, 'a, 'd> {
    fn error(&mut self, message: impl Into<String>, location: casm_base::SourceLocation) {
        self.diagnostics.add(self.file, message, location);
    }

    fn analyze_function(&mut self, function: &casm_language::Function<'a>) {
        self.scopes.push_scope();
        for param in &function.params {
            self.scopes.declare(param.name, param.ty.ty, param.location);
            self.scopes.mark_initialized(param.name);
        }

        self.analyze_block(&function.body);
        self.scopes.pop_scope();

        if function.return_type.ty != Type::Void && !block_has_return(&function.body) {
            self.error(
                format!("Function '{}' missing return statement", function.original_name),
                function.location,
            );
        }
    }

    fn analyze_block(&mut self, block: &Block<'a>) {
        self.scopes.push_scope();
        for stmt in block.stmts {
            self.analyze_statement(stmt);
        }
        self.scopes.pop_scope();
    }

    fn analyze_statement(&mut self, stmt: &Stmt<'a>) {
        match &stmt.kind {
            StmtKind::Return(value) => match value {
                Some(expr) => {
                    let ty = self.analyze_expression_hinted(expr, Some(self.return_type));
                    if !ty.convertible_to(self.return_type) {
                        self.error(
                            format!("Return type mismatch: expected {}", self.return_type),
                            stmt.location,
                        );
                    }
                }
                None => {
                    if self.return_type != Type::Void {
                        self.error("Function must return a value", stmt.location);
                    }
                }
            },
            StmtKind::VarDecl { name, ty, init } => {
                if !self.scopes.declare(name, ty.ty, stmt.location) {
                    self.error(
                        format!("Variable '{}' already declared in this scope", name),
                        stmt.location,
                    );
                }
                if let Some(init) = init {
                    let init_ty = self.analyze_expression_hinted(init, Some(ty.ty));
                    if !init_ty.convertible_to(ty.ty) {
                        self.error("Initializer type mismatch", stmt.location);
                    }
                    self.scopes.mark_initialized(name);
                }
            }
            StmtKind::Expr(expr) => {
                // A void call is fine as a whole statement; its value just
                // cannot be consumed anywhere else.
                self.analyze_expression(expr);
            }
            StmtKind::If {
                condition,
                then_block,
                else_ifs,
                else_block,
            } => {
                let cond_ty = self.analyze_expression(condition);
                if cond_ty != Type::Bool {
                    self.error("If condition must have bool type", condition.location);
                }
                self.analyze_block(then_block);
                for elif in *else_ifs {
                    let elif_ty = self.analyze_expression(elif.condition);
                    if elif_ty != Type::Bool {
                        self.error("Else-if condition must have bool type", elif.condition.location);
                    }
                    self.analyze_block(&elif.body);
                }
                if let Some(else_block) = else_block {
                    self.analyze_block(else_block);
                }
            }
            StmtKind::While { condition, body } => {
                let cond_ty = self.analyze_expression(condition);
                if cond_ty != Type::Bool {
                    self.error("While condition must have bool type", condition.location);
                }
                self.analyze_block(body);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                // The init clause gets its own scope so its variable stays
                // local to the loop.
                self.scopes.push_scope();
                if let Some(init) = init {
                    self.analyze_statement(init);
                }
                if let Some(condition) = condition {
                    let cond_ty = self.analyze_expression(condition);
                    if cond_ty != Type::Bool {
                        self.error("For loop condition must have bool type", condition.location);
                    }
                }
                if let Some(update) = update {
                    self.analyze_expression(update);
                }
                self.analyze_block(body);
                self.scopes.pop_scope();
            }
            StmtKind::Block(block) => self.analyze_block(block),
            StmtKind::Dbg { args } => {
                for arg in *args {
                    let ty = self.analyze_expression(arg.expr);
                    if ty == Type::Void {
                        self.error("dbg argument must produce a value", arg.expr.location);
                    }
                }
            }
        }
    }

    fn analyze_expression(&mut self, expr: &Expr<'a>) -> Type {
        self.analyze_expression_hinted(expr, None)
    }

    /// Analyzes an expression. `hint` carries the target type of the
    /// surrounding assignment, initializer, return, or argument so that a
    /// bare integer literal infers the 64-bit default of the right
    /// signedness (`i64` in signed contexts, `u64` in unsigned ones).
    fn analyze_expression_hinted(&mut self, expr: &Expr<'a>, hint: Option<Type>) -> Type {
        let ty = match &expr.kind {
            ExprKind::IntLiteral(_) => match hint {
                Some(target) if target.is_numeric() && !target.is_signed() => Type::U64,
                _ => Type::I64,
            },
            ExprKind::BoolLiteral(_) => Type::Bool,
            ExprKind::Variable(name) => {
                let binding = self.scopes.lookup(name).map(|v| (v.ty, v.initialized));
                match binding {
                    Some((ty, initialized)) => {
                        if !initialized {
                            self.error(
                                format!("Variable '{}' used before initialization", name),
                                expr.location,
                            );
                        }
                        ty
                    }
                    None => {
                        self.error(format!("Undefined variable '{}'", name), expr.location);
                        Type::Void
                    }
                }
            }
            ExprKind::Binary { op, left, right } => {
                self.analyze_binary(expr, *op, left, right, hint)
            }
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.analyze_expression_hinted(operand, hint);
                match op {
                    UnaryOp::Neg => {
                        if !operand_ty.is_numeric() {
                            self.error("Unary negation requires numeric operand", expr.location);
                        }
                    }
                    UnaryOp::Not => {
                        if operand_ty != Type::Bool {
                            self.error("Logical NOT requires boolean operand", expr.location);
                        }
                    }
                }
                unary_result_type(*op, operand_ty)
            }
            ExprKind::Call { name, args, .. } => self.analyze_call(expr, name, args),
        };

        expr.resolved_type.set(Some(ty));
        ty
    }

    fn analyze_binary(
        &mut self,
        expr: &Expr<'a>,
        op: BinaryOp,
        left: &Expr<'a>,
        right: &Expr<'a>,
        hint: Option<Type>,
    ) -> Type {
        if op == BinaryOp::Assign {
            // RHS first: its errors must surface even when the LHS is
            // unusable. The target type is peeked without reporting so the
            // RHS literal inference still sees it.
            let target = match &left.kind {
                ExprKind::Variable(name) => self.scopes.lookup(name).map(|v| v.ty),
                _ => None,
            };
            let right_ty = self.analyze_expression_hinted(right, target);

            let left_ty = match &left.kind {
                ExprKind::Variable(name) => {
                    let binding = self.scopes.lookup(name).map(|v| v.ty);
                    match binding {
                        Some(ty) => {
                            left.resolved_type.set(Some(ty));
                            self.scopes.mark_initialized(name);
                            Some(ty)
                        }
                        None => {
                            self.error(format!("Undefined variable '{}'", name), left.location);
                            None
                        }
                    }
                }
                _ => {
                    self.error("Can only assign to variables", expr.location);
                    None
                }
            };

            return match left_ty {
                Some(left_ty) => {
                    if !right_ty.convertible_to(left_ty) {
                        self.error("Assignment type mismatch", expr.location);
                    }
                    left_ty
                }
                None => Type::Void,
            };
        }

        let left_ty = self.analyze_expression_hinted(left, hint);
        // A numeric left operand hints the right one, so `count % 2` works
        // when `count` is unsigned.
        let right_hint = if left_ty.is_numeric() { Some(left_ty) } else { hint };
        let right_ty = self.analyze_expression_hinted(right, right_hint);

        if op.is_arithmetic() {
            if !left_ty.is_numeric() || !right_ty.is_numeric() {
                self.error("Arithmetic operators require numeric operands", expr.location);
                return Type::Void;
            }
            if !left_ty.convertible_to(right_ty) && !right_ty.convertible_to(left_ty) {
                self.error("Operands must have compatible types", expr.location);
                return Type::Void;
            }
        } else if op.is_comparison() {
            if !left_ty.is_numeric() || !right_ty.is_numeric() {
                self.error("Comparison operators require numeric operands", expr.location);
                return Type::Bool;
            }
            if !left_ty.convertible_to(right_ty) && !right_ty.convertible_to(left_ty) {
                self.error("Operands must have compatible types", expr.location);
                return Type::Bool;
            }
        } else if op.is_logical() {
            if left_ty != Type::Bool {
                self.error("Logical operators require boolean operands", left.location);
            }
            if right_ty != Type::Bool {
                self.error("Logical operators require boolean operands", right.location);
            }
        }

        binary_result_type(left_ty, op, right_ty)
    }

    fn analyze_call(&mut self, expr: &Expr<'a>, name: &str, args: &[&Expr<'a>]) -> Type {
        let signature = match self.table.resolve(name, self.module) {
            Some(signature) => signature.clone(),
            None => {
                self.error(format!("Undefined function '{}'", name), expr.location);
                // Still analyze the arguments for their own errors.
                for arg in args {
                    self.analyze_expression(arg);
                }
                return Type::Void;
            }
        };

        if args.len() != signature.param_types.len() {
            self.error(
                format!(
                    "Function '{}' expects {} arguments, got {}",
                    name,
                    signature.param_types.len(),
                    args.len()
                ),
                expr.location,
            );
        }

        for (i, arg) in args.iter().enumerate() {
            let param_ty = signature.param_types.get(i).copied();
            let arg_ty = self.analyze_expression_hinted(arg, param_ty);
            if let Some(param_ty) = param_ty {
                if !arg_ty.convertible_to(param_ty) {
                    self.error(format!("Argument {} type mismatch", i + 1), expr.location);
                }
            }
        }

        signature.return_type
    }
}

/// Structural missing-return check: does any statement in the block (or a
/// nested block) return?
fn block_has_return(block: &Block<'_>) -> bool {
    block.stmts.iter().any(stmt_has_return)
}

fn stmt_has_return(stmt: &Stmt<'_>) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If {
            then_block,
            else_ifs,
            else_block,
            ..
        } => {
            block_has_return(then_block)
                || else_ifs.iter().any(|e| block_has_return(&e.body))
                || else_block.as_ref().map_or(false, block_has_return)
        }
        StmtKind::While { body, .. } => block_has_return(body),
        StmtKind::For { body, .. } => block_has_return(body),
        StmtKind::Block(block) => block_has_return(block),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::finalize_single_module;
    use casm_language::{AstArenas, AstContext, Parser};

    fn analyze(source: &str) -> Vec<String> {
        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let source = ctx.str(source);
        let mut parser = Parser::new(ctx, source);
        let mut program = parser.parse();
        assert!(parser.errors().is_empty(), "parse failed: {:?}", parser.errors());
        finalize_single_module(&mut program, "test.csm");

        let mut diagnostics = DiagnosticList::new();
        analyze_program(&program, &mut diagnostics);
        diagnostics
            .into_vec()
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn assert_clean(source: &str) {
        let errors = analyze(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn accepts_simple_arithmetic_program() {
        assert_clean("i32 main() { i32 x = 2 + 3 * 4; return x; }");
    }

    #[test]
    fn literal_defaults_may_initialize_narrow_variables() {
        assert_clean("i32 main() { i8 small = 7; u16 wide = 300; i32 x = 0; return x; }");
    }

    #[test]
    fn literals_adopt_the_unsigned_default_in_unsigned_contexts() {
        assert_clean(
            "u32 half(u32 n) { return n / 2; }\n\
             i32 main() { u64 big = 5; u32 small = half(8); big = big + 1; return 0; }",
        );
    }

    #[test]
    fn undefined_variable_is_reported() {
        let errors = analyze("i32 main() { return missing; }");
        assert!(errors.iter().any(|e| e.contains("Undefined variable 'missing'")));
    }

    #[test]
    fn use_before_initialization_is_reported() {
        let errors = analyze("i32 main() { i32 x; return x; }");
        assert!(errors.iter().any(|e| e.contains("used before initialization")));
    }

    #[test]
    fn assignment_initializes_for_later_uses() {
        assert_clean("i32 main() { i32 x; x = 3; return x; }");
    }

    #[test]
    fn duplicate_variable_in_scope_is_reported() {
        let errors = analyze("i32 main() { i32 x = 1; i32 x = 2; return x; }");
        assert!(errors.iter().any(|e| e.contains("already declared in this scope")));
    }

    #[test]
    fn shadowing_in_nested_block_is_fine() {
        assert_clean("i32 main() { i32 x = 1; { i32 x = 2; x = x + 1; } return x; }");
    }

    #[test]
    fn signedness_mismatch_is_reported() {
        let errors = analyze("i32 main() { i32 x = 1; u32 y = 1; i32 z = x + y; return z; }");
        assert!(errors.iter().any(|e| e.contains("compatible types")));
    }

    #[test]
    fn narrowing_assignment_is_reported() {
        let errors = analyze("i32 main() { i32 wide = 1; i16 narrow = 0; narrow = wide; return narrow; }");
        assert!(errors.iter().any(|e| e.contains("Assignment type mismatch")));
    }

    #[test]
    fn condition_must_be_bool_even_for_zero_or_one() {
        let errors = analyze("i32 main() { i32 x = 1; if (x) { } return 0; }");
        assert!(errors.iter().any(|e| e.contains("If condition must have bool type")));

        let errors = analyze("i32 main() { while (0) { } return 0; }");
        assert!(errors.iter().any(|e| e.contains("While condition must have bool type")));

        let errors = analyze("i32 main() { for (; 1;) { } return 0; }");
        assert!(errors.iter().any(|e| e.contains("For loop condition must have bool type")));
    }

    #[test]
    fn logical_operators_require_bool() {
        let errors = analyze("i32 main() { bool b = 1 && true; return 0; }");
        assert!(errors.iter().any(|e| e.contains("Logical operators require boolean operands")));
    }

    #[test]
    fn relational_result_is_bool() {
        assert_clean("i32 main() { bool b = 1 < 2; if (b) { return 1; } return 0; }");
    }

    #[test]
    fn unknown_function_is_reported() {
        let errors = analyze("i32 main() { return missing(); }");
        assert!(errors.iter().any(|e| e.contains("Undefined function 'missing'")));
    }

    #[test]
    fn wrong_arity_is_reported() {
        let errors = analyze("i32 add(i32 a, i32 b) { return a + b; }\ni32 main() { return add(1); }");
        assert!(errors.iter().any(|e| e.contains("expects 2 arguments, got 1")));
    }

    #[test]
    fn argument_type_mismatch_is_reported() {
        let errors = analyze("i32 f(bool b) { return 0; }\ni32 main() { return f(5); }");
        assert!(errors.iter().any(|e| e.contains("Argument 1 type mismatch")));
    }

    #[test]
    fn return_type_mismatches_both_ways() {
        let errors = analyze("void f() { return 1; }\ni32 main() { f(); return 0; }");
        assert!(errors.iter().any(|e| e.contains("Return type mismatch: expected void")));

        let errors = analyze("i32 f() { return; }\ni32 main() { return f(); }");
        assert!(errors.iter().any(|e| e.contains("Function must return a value")));
    }

    #[test]
    fn void_call_is_a_valid_expression_statement() {
        assert_clean("void log() { }\ni32 main() { log(); return 0; }");
    }

    #[test]
    fn void_call_cannot_be_consumed() {
        let errors = analyze("void log() { }\ni32 main() { i32 x = log(); return x; }");
        assert!(errors.iter().any(|e| e.contains("Initializer type mismatch")));
    }

    #[test]
    fn void_dbg_argument_is_reported() {
        let errors = analyze("void log() { }\ni32 main() { dbg(log()); return 0; }");
        assert!(errors.iter().any(|e| e.contains("dbg argument must produce a value")));
    }

    #[test]
    fn empty_body_is_fine_for_void_only() {
        assert_clean("void tick() { }\ni32 main() { tick(); return 0; }");

        let errors = analyze("i32 f() { }\ni32 main() { return f(); }");
        assert!(errors.iter().any(|e| e.contains("missing return statement")));
    }

    #[test]
    fn duplicate_function_in_same_module_is_hard_error() {
        let errors = analyze("i32 f() { return 1; }\ni32 f() { return 2; }\ni32 main() { return f(); }");
        assert!(errors.iter().any(|e| e.contains("Function 'f' already defined")));
    }

    #[test]
    fn for_init_variable_is_scoped_to_the_loop() {
        let errors = analyze(
            "i32 main() { for (i32 i = 0; i < 3; i = i + 1) { } return i; }",
        );
        assert!(errors.iter().any(|e| e.contains("Undefined variable 'i'")));
    }

    #[test]
    fn assignment_inside_expression_has_lhs_type() {
        assert_clean("i32 main() { i32 x; return (x = 1) + (x = 2); }");
    }

    #[test]
    fn every_expression_gets_a_resolved_type() {
        let arenas = AstArenas::new();
        let ctx = AstContext::new(&arenas);
        let source = ctx.str("i32 main() { i32 x = 1 + 2; bool b = x < 4; return x; }");
        let mut parser = Parser::new(ctx, source);
        let mut program = parser.parse();
        finalize_single_module(&mut program, "test.csm");
        let mut diagnostics = DiagnosticList::new();
        assert!(analyze_program(&program, &mut diagnostics));

        for stmt in program.functions[0].body.stmts {
            if let StmtKind::VarDecl { init: Some(init), .. } = &stmt.kind {
                assert!(init.resolved_type.get().is_some());
            }
        }
    }
}
