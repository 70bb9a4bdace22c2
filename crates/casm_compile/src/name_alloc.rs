//! Reachability-driven global name allocation.
//!
//! Every function reachable from `main` receives an `allocated_name` that
//! is unique across the whole program. Three priorities are tried in
//! order:
//!
//! 1. the original name, exactly as written;
//! 2. `<module-basename>_<original-name>`;
//! 3. `<module-basename>_<original-name>_<N>` for N = 2, 3, …, capped
//!    at 100.
//!
//! Priority 1 is skipped outright when another *reachable* function shares
//! the original name but lives in a different module, so that a conflict
//! mangles *both* sides uniformly instead of letting whichever allocates
//! first keep the pretty name.
//!
//! Unreachable functions receive no name and are elided by the emitters.
//! Only reachable functions contribute to the used-names set, so dead code
//! cannot squat on a name.
//!
//! After allocation, every call site in the program is resolved to its
//! target's symbol id (same-module preference for unqualified homonyms,
//! basename matching for qualified names), so the emitters never re-scan
//! the function list by name.

use std::collections::{HashMap, HashSet};

use casm_language::ast::{Block, Expr, ExprKind, Stmt, StmtKind};
use casm_language::Program;

use crate::call_graph::CallGraph;
use crate::symtab::FunctionTable;

/// Highest suffix tried for priority 3 before giving up.
const MAX_NAME_SUFFIX: u32 = 100;

/// Assigns allocated names to every reachable function and resolves call
/// sites. Deterministic given the loader's stable function ordering.
pub fn allocate_names(program: &mut Program<'_>) {
    let graph = CallGraph::build(program);
    let reachable = graph.reachable();

    let mut used: HashSet<String> = HashSet::new();
    let mut assigned: HashMap<u32, String> = HashMap::new();

    for &symbol_id in &reachable {
        let record = match program.functions.iter().find(|f| f.symbol_id == symbol_id) {
            Some(record) => record,
            None => continue,
        };

        let conflicting = program.functions.iter().any(|other| {
            other.symbol_id != symbol_id
                && reachable.contains(&other.symbol_id)
                && other.original_name == record.original_name
                && other.module_path != record.module_path
        });

        let original = record.original_name.to_string();
        let basename = record.module_basename().to_string();

        let mut chosen = None;
        if !conflicting && !used.contains(&original) {
            chosen = Some(original.clone());
        }
        if chosen.is_none() {
            let candidate = format!("{}_{}", basename, original);
            if !used.contains(&candidate) {
                chosen = Some(candidate);
            }
        }
        if chosen.is_none() {
            for n in 2..=MAX_NAME_SUFFIX {
                let candidate = format!("{}_{}_{}", basename, original, n);
                if !used.contains(&candidate) {
                    chosen = Some(candidate);
                    break;
                }
            }
        }

        if let Some(name) = chosen {
            used.insert(name.clone());
            assigned.insert(symbol_id, name);
        }
    }

    for function in &mut program.functions {
        function.allocated_name = assigned.get(&function.symbol_id).cloned();
    }

    resolve_call_sites(program);
}

/// Stores each call site's target symbol id on the call node.
fn resolve_call_sites(program: &Program<'_>) {
    let mut table = FunctionTable::new();
    for function in &program.functions {
        table.add(function);
    }

    for function in &program.functions {
        resolve_in_block(&function.body, &table, &function.module_path);
    }
}

fn resolve_in_block(block: &Block<'_>, table: &FunctionTable<'_>, module: &str) {
    for stmt in block.stmts {
        resolve_in_stmt(stmt, table, module);
    }
}

fn resolve_in_stmt(stmt: &Stmt<'_>, table: &FunctionTable<'_>, module: &str) {
    match &stmt.kind {
        StmtKind::Return(Some(expr)) => resolve_in_expr(expr, table, module),
        StmtKind::Return(None) => {}
        StmtKind::Expr(expr) => resolve_in_expr(expr, table, module),
        StmtKind::VarDecl { init, .. } => {
            if let Some(init) = init {
                resolve_in_expr(init, table, module);
            }
        }
        StmtKind::If {
            condition,
            then_block,
            else_ifs,
            else_block,
        } => {
            resolve_in_expr(condition, table, module);
            resolve_in_block(then_block, table, module);
            for elif in *else_ifs {
                resolve_in_expr(elif.condition, table, module);
                resolve_in_block(&elif.body, table, module);
            }
            if let Some(else_block) = else_block {
                resolve_in_block(else_block, table, module);
            }
        }
        StmtKind::While { condition, body } => {
            resolve_in_expr(condition, table, module);
            resolve_in_block(body, table, module);
        }
        StmtKind::For {
            init,
            condition,
            update,
            body,
        } => {
            if let Some(init) = init {
                resolve_in_stmt(init, table, module);
            }
            if let Some(condition) = condition {
                resolve_in_expr(condition, table, module);
            }
            if let Some(update) = update {
                resolve_in_expr(update, table, module);
            }
            resolve_in_block(body, table, module);
        }
        StmtKind::Block(block) => resolve_in_block(block, table, module),
        StmtKind::Dbg { args } => {
            for arg in *args {
                resolve_in_expr(arg.expr, table, module);
            }
        }
    }
}

fn resolve_in_expr(expr: &Expr<'_>, table: &FunctionTable<'_>, module: &str) {
    match &expr.kind {
        ExprKind::Call {
            name,
            args,
            resolved_symbol,
        } => {
            if let Some(signature) = table.resolve(name, module) {
                resolved_symbol.set(signature.symbol_id);
            }
            for arg in *args {
                resolve_in_expr(arg, table, module);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            resolve_in_expr(left, table, module);
            resolve_in_expr(right, table, module);
        }
        ExprKind::Unary { operand, .. } => resolve_in_expr(operand, table, module),
        ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) | ExprKind::Variable(_) => {}
    }
}
