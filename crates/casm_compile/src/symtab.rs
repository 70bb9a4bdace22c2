//! Symbol tables for semantic analysis.
//!
//! Two structures live here:
//!
//! - [`ScopeStack`] — lexically scoped variables. Each block pushes a scope;
//!   lookup walks from the innermost scope outward. A variable tracks its
//!   type, definition location, and whether it has been initialized.
//! - [`FunctionTable`] — a flat table of every function in the merged
//!   program. Cross-module homonyms are legal; duplicates are only rejected
//!   within a single module. Call sites resolve against the table with a
//!   same-module preference, and `module:function` qualified names match on
//!   the module basename.

use casm_base::SourceLocation;
use casm_language::ast::module_basename;
use casm_language::{Function, Type};

/// A variable binding in one scope.
#[derive(Debug, Clone)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub ty: Type,
    pub initialized: bool,
    pub location: SourceLocation,
}

/// A stack of lexical scopes.
#[derive(Debug, Default)]
pub struct ScopeStack<'a> {
    scopes: Vec<Vec<Variable<'a>>>,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declares a variable in the innermost scope.
    ///
    /// Returns `false` if the name is already declared in that scope; outer
    /// shadowing is allowed.
    pub fn declare(&mut self, name: &'a str, ty: Type, location: SourceLocation) -> bool {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => return false,
        };
        if scope.iter().any(|v| v.name == name) {
            return false;
        }
        scope.push(Variable {
            name,
            ty,
            initialized: false,
            location,
        });
        true
    }

    /// Finds a variable, walking scopes from innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<&Variable<'a>> {
        for scope in self.scopes.iter().rev() {
            if let Some(var) = scope.iter().find(|v| v.name == name) {
                return Some(var);
            }
        }
        None
    }

    /// Marks the nearest variable with this name as initialized.
    pub fn mark_initialized(&mut self, name: &str) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(var) = scope.iter_mut().find(|v| v.name == name) {
                var.initialized = true;
                return;
            }
        }
    }
}

/// One function's callable signature.
#[derive(Debug, Clone)]
pub struct FunctionSignature<'a> {
    pub symbol_id: u32,
    pub name: &'a str,
    pub module_path: String,
    pub display_path: String,
    pub return_type: Type,
    pub param_types: Vec<Type>,
    pub location: SourceLocation,
}

/// The flat, whole-program function table.
#[derive(Debug, Default)]
pub struct FunctionTable<'a> {
    functions: Vec<FunctionSignature<'a>>,
}

impl<'a> FunctionTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function.
    ///
    /// Returns `false` when a function with the same name already exists in
    /// the same module; homonyms from different modules are accepted.
    pub fn add(&mut self, function: &Function<'a>) -> bool {
        let duplicate = self
            .functions
            .iter()
            .any(|f| f.name == function.original_name && f.module_path == function.module_path);
        if duplicate {
            return false;
        }
        self.functions.push(FunctionSignature {
            symbol_id: function.symbol_id,
            name: function.original_name,
            module_path: function.module_path.clone(),
            display_path: function.display_path.clone(),
            return_type: function.return_type.ty,
            param_types: function.params.iter().map(|p| p.ty.ty).collect(),
            location: function.location,
        });
        true
    }

    /// All registered signatures, in registration order.
    pub fn functions(&self) -> &[FunctionSignature<'a>] {
        &self.functions
    }

    /// Resolves a call-site name as seen from `caller_module`.
    ///
    /// Unqualified names prefer a function in the caller's own module, then
    /// fall back to the first match in program order. Qualified names
    /// (`module:function`) match the function name against the given module
    /// basename only.
    pub fn resolve(&self, call_name: &str, caller_module: &str) -> Option<&FunctionSignature<'a>> {
        if let Some((module, function)) = call_name.split_once(':') {
            return self
                .functions
                .iter()
                .find(|f| f.name == function && module_basename(&f.module_path) == module);
        }

        self.functions
            .iter()
            .find(|f| f.name == call_name && f.module_path == caller_module)
            .or_else(|| self.functions.iter().find(|f| f.name == call_name))
    }
}
