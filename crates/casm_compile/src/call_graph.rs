//! Whole-program call graph and reachability.
//!
//! Nodes are functions keyed by symbol id. For every call site in a
//! function body (including calls buried in conditions, loop clauses, and
//! `dbg` arguments) an edge is added from the enclosing function to
//! *every* function whose name matches the call. Matching is conservative
//! on purpose: before name allocation has disambiguated homonyms, a call
//! to `helper` must keep every `helper` alive so diagnostics and dead-code
//! elimination stay sound. Qualified calls (`module:function`) match on
//! the module basename. Edges are deduplicated per caller.
//!
//! The entry point is the function named `main`; without one the reachable
//! set is empty and the emitters produce no function bodies.

use casm_language::ast::{module_basename, Block, Expr, ExprKind, Stmt, StmtKind};
use casm_language::Program;

/// One function node and its outgoing edges.
#[derive(Debug)]
pub struct CallGraphNode<'a> {
    pub symbol_id: u32,
    pub name: &'a str,
    pub callees: Vec<u32>,
}

/// The caller → callee graph of a merged program.
#[derive(Debug)]
pub struct CallGraph<'a> {
    nodes: Vec<CallGraphNode<'a>>,
    entry_point_id: u32,
}

impl<'a> CallGraph<'a> {
    /// Builds the graph from an annotated program.
    pub fn build(program: &Program<'a>) -> Self {
        let mut nodes: Vec<CallGraphNode<'a>> = Vec::with_capacity(program.functions.len());
        let mut entry_point_id = 0;

        for function in &program.functions {
            if function.original_name == "main" && entry_point_id == 0 {
                entry_point_id = function.symbol_id;
            }
            nodes.push(CallGraphNode {
                symbol_id: function.symbol_id,
                name: function.original_name,
                callees: Vec::new(),
            });
        }

        for (index, function) in program.functions.iter().enumerate() {
            let mut call_names: Vec<&str> = Vec::new();
            collect_calls_in_block(&function.body, &mut call_names);

            for call_name in call_names {
                for target in program.functions.iter() {
                    if call_matches(call_name, target.original_name, &target.module_path) {
                        let callees = &mut nodes[index].callees;
                        if !callees.contains(&target.symbol_id) {
                            callees.push(target.symbol_id);
                        }
                    }
                }
            }
        }

        Self {
            nodes,
            entry_point_id,
        }
    }

    /// The graph's nodes, in program order.
    pub fn nodes(&self) -> &[CallGraphNode<'a>] {
        &self.nodes
    }

    /// Symbol id of `main`, or 0 when the program has no entry point.
    pub fn entry_point_id(&self) -> u32 {
        self.entry_point_id
    }

    /// All symbol ids reachable from the entry point, in breadth-first
    /// discovery order. Empty when there is no `main`.
    pub fn reachable(&self) -> Vec<u32> {
        if self.entry_point_id == 0 {
            return Vec::new();
        }

        let mut visited: Vec<u32> = Vec::new();
        let mut queue: Vec<u32> = vec![self.entry_point_id];
        let mut head = 0;

        while head < queue.len() {
            let current = queue[head];
            head += 1;
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);

            if let Some(node) = self.nodes.iter().find(|n| n.symbol_id == current) {
                for &callee in &node.callees {
                    queue.push(callee);
                }
            }
        }

        visited
    }

    /// Every function that has an edge to `callee_id`, by reverse scan.
    pub fn callers_of(&self, callee_id: u32) -> Vec<u32> {
        let mut callers = Vec::new();
        for node in &self.nodes {
            if node.callees.contains(&callee_id) && !callers.contains(&node.symbol_id) {
                callers.push(node.symbol_id);
            }
        }
        callers
    }
}

/// Does a call-site name match a function definition?
fn call_matches(call_name: &str, function_name: &str, function_module: &str) -> bool {
    match call_name.split_once(':') {
        Some((module, name)) => {
            name == function_name && module_basename(function_module) == module
        }
        None => call_name == function_name,
    }
}

fn collect_calls_in_block<'a>(block: &Block<'a>, out: &mut Vec<&'a str>) {
    for stmt in block.stmts {
        collect_calls_in_stmt(stmt, out);
    }
}

fn collect_calls_in_stmt<'a>(stmt: &Stmt<'a>, out: &mut Vec<&'a str>) {
    match &stmt.kind {
        StmtKind::Return(value) => {
            if let Some(expr) = value {
                collect_calls_in_expr(expr, out);
            }
        }
        StmtKind::Expr(expr) => collect_calls_in_expr(expr, out),
        StmtKind::VarDecl { init, .. } => {
            if let Some(init) = init {
                collect_calls_in_expr(init, out);
            }
        }
        StmtKind::If {
            condition,
            then_block,
            else_ifs,
            else_block,
        } => {
            collect_calls_in_expr(condition, out);
            collect_calls_in_block(then_block, out);
            for elif in *else_ifs {
                collect_calls_in_expr(elif.condition, out);
                collect_calls_in_block(&elif.body, out);
            }
            if let Some(else_block) = else_block {
                collect_calls_in_block(else_block, out);
            }
        }
        StmtKind::While { condition, body } => {
            collect_calls_in_expr(condition, out);
            collect_calls_in_block(body, out);
        }
        StmtKind::For {
            init,
            condition,
            update,
            body,
        } => {
            if let Some(init) = init {
                collect_calls_in_stmt(init, out);
            }
            if let Some(condition) = condition {
                collect_calls_in_expr(condition, out);
            }
            if let Some(update) = update {
                collect_calls_in_expr(update, out);
            }
            collect_calls_in_block(body, out);
        }
        StmtKind::Block(block) => collect_calls_in_block(block, out),
        StmtKind::Dbg { args } => {
            for arg in *args {
                collect_calls_in_expr(arg.expr, out);
            }
        }
    }
}

fn collect_calls_in_expr<'a>(expr: &Expr<'a>, out: &mut Vec<&'a str>) {
    match &expr.kind {
        ExprKind::Call { name, args, .. } => {
            if !out.contains(name) {
                out.push(*name);
            }
            for arg in *args {
                collect_calls_in_expr(arg, out);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            collect_calls_in_expr(left, out);
            collect_calls_in_expr(right, out);
        }
        ExprKind::Unary { operand, .. } => collect_calls_in_expr(operand, out),
        ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) | ExprKind::Variable(_) => {}
    }
}
