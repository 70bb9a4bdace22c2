//! Recursive-descent parser for one casm source file.
//!
//! The entry point ([`Parser::parse`]) yields a [`Program`] with imports
//! first, then function definitions, terminating at end of input.
//!
//! ## Error recovery
//!
//! The parser records a diagnostic at every unexpected token and keeps
//! going, so one run reports as many syntax errors as possible. After a
//! failed top-level construct it synchronizes to the next top-level
//! boundary: a semicolon at brace depth zero, or a closing brace that
//! returns the depth to zero. Inside a block, a failed statement skips a
//! single token to guarantee progress.
//!
//! Lexer error tokens (integer overflow, stray characters) are reported
//! once, at tokenization time, and then dropped from the stream so they do
//! not cascade.
//!
//! ## Debug labels
//!
//! For every argument of `dbg(...)` the parser synthesizes a source-like
//! label used by the emitters to annotate printed values: variable
//! references use their name, literals their text, calls `name()`, and
//! compound expressions are rebuilt from their structure (`x + 1`, `-n`).

use casm_base::SourceLocation;

use crate::arena_ctx::AstContext;
use crate::ast::{
    BinaryOp, Block, DbgArg, ElseIf, Expr, ExprKind, Function, Import, Param, Program, Stmt,
    StmtKind, UnaryOp,
};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::types::TypeNode;
use std::cell::Cell;

/// A syntax error with its location; the caller attaches the file name.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    pub message: String,
    pub location: SourceLocation,
}

/// Parser state for a single source buffer.
pub struct Parser<'a> {
    ctx: AstContext<'a>,
    tokens: Vec<Token<'a>>,
    current: usize,
    errors: Vec<ParseDiagnostic>,
}

impl<'a> Parser<'a> {
    /// Tokenizes `source` and prepares to parse it.
    ///
    /// `source` must be arena-backed (or otherwise outlive the arenas);
    /// all identifier names in the produced AST borrow from it.
    pub fn new(ctx: AstContext<'a>, source: &'a str) -> Self {
        let mut errors = Vec::new();
        let mut tokens = Vec::new();
        for token in Lexer::tokenize(source) {
            if let TokenKind::Error(err) = token.kind {
                errors.push(ParseDiagnostic {
                    message: err.message().to_string(),
                    location: token.location,
                });
            } else {
                tokens.push(token);
            }
        }
        Self {
            ctx,
            tokens,
            current: 0,
            errors,
        }
    }

    /// The syntax errors recorded so far.
    pub fn errors(&self) -> &[ParseDiagnostic] {
        &self.errors
    }

    /// Consumes the parser, returning its recorded errors.
    pub fn into_errors(self) -> Vec<ParseDiagnostic> {
        self.errors
    }

    // ------------------------------------------------------------------
    // Token stream helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Token<'a> {
        self.tokens
            .get(self.current)
            .copied()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, SourceLocation::start()))
    }

    fn peek_next(&self) -> Token<'a> {
        self.tokens
            .get(self.current + 1)
            .copied()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, SourceLocation::start()))
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind<'a>) -> bool {
        self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind<'a>) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_eof(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn error(&mut self, message: impl Into<String>) {
        let location = self.peek().location;
        self.error_at(message, location);
    }

    fn error_at(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.errors.push(ParseDiagnostic {
            message: message.into(),
            location,
        });
    }

    /// Skips to the next top-level boundary: a `;` at depth 0 or a `}`
    /// closing back down to depth 0.
    fn synchronize_top_level(&mut self) {
        let mut depth: u32 = 0;
        while !self.at_eof() {
            match self.advance().kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => return,
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Program structure
    // ------------------------------------------------------------------

    /// Parses the whole file: imports first, then function definitions.
    pub fn parse(&mut self) -> Program<'a> {
        let mut program = Program::new();

        while self.check(TokenKind::Hash) {
            match self.parse_import() {
                Some(import) => program.imports.push(import),
                None => self.synchronize_top_level(),
            }
        }

        while !self.at_eof() {
            match self.parse_function() {
                Some(function) => program.functions.push(function),
                None => self.synchronize_top_level(),
            }
        }

        program
    }

    /// `# import NAME (, NAME)* from "PATH" ;` or `# import "PATH" ;`
    fn parse_import(&mut self) -> Option<Import<'a>> {
        let location = self.peek().location;
        if !self.matches(TokenKind::Hash) {
            self.error("Expected '#' for import statement");
            return None;
        }
        if !self.matches(TokenKind::Import) {
            self.error("Expected 'import' keyword after '#'");
            return None;
        }

        let mut names = Vec::new();
        let path;

        if let TokenKind::Str(p) = self.peek().kind {
            // Shorthand: the path's basename is the imported name.
            self.advance();
            path = p;
            names.push(self.ctx.str(crate::ast::module_basename(p)));
        } else {
            loop {
                match self.peek().kind {
                    TokenKind::Ident(name) => {
                        self.advance();
                        names.push(name);
                    }
                    _ => {
                        self.error("Expected identifier in import list");
                        return None;
                    }
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
            if !self.matches(TokenKind::From) {
                self.error("Expected 'from' after import names");
                return None;
            }
            match self.peek().kind {
                TokenKind::Str(p) => {
                    self.advance();
                    path = p;
                }
                _ => {
                    self.error("Expected string literal for file path");
                    return None;
                }
            }
        }

        if !self.matches(TokenKind::Semicolon) {
            self.error("Expected ';' after import statement");
            return None;
        }

        Some(Import {
            names,
            path,
            location,
        })
    }

    /// `TYPE IDENT ( params? ) BLOCK`
    fn parse_function(&mut self) -> Option<Function<'a>> {
        let errors_before = self.errors.len();

        let return_type = match self.peek().kind.as_type() {
            Some(ty) => TypeNode::new(ty, self.peek().location),
            None => {
                self.error("Expected type for function return");
                return None;
            }
        };
        self.advance();

        let (name, location) = match self.peek().kind {
            TokenKind::Ident(name) => (name, self.peek().location),
            _ => {
                self.error("Expected function name");
                return None;
            }
        };
        self.advance();

        if !self.matches(TokenKind::LParen) {
            self.error("Expected '(' after function name");
            return None;
        }

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let ty = match self.peek().kind.as_type() {
                    Some(ty) => TypeNode::new(ty, self.peek().location),
                    None => {
                        self.error("Expected type in parameter list");
                        // Skip to the next comma or the closing paren.
                        while !self.check(TokenKind::Comma)
                            && !self.check(TokenKind::RParen)
                            && !self.at_eof()
                        {
                            self.advance();
                        }
                        if self.matches(TokenKind::Comma) {
                            continue;
                        }
                        break;
                    }
                };
                self.advance();

                let (param_name, param_location) = match self.peek().kind {
                    TokenKind::Ident(name) => (name, self.peek().location),
                    _ => {
                        self.error("Expected parameter name");
                        break;
                    }
                };
                self.advance();

                params.push(Param {
                    name: param_name,
                    ty,
                    location: param_location,
                });

                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.matches(TokenKind::RParen) {
            self.error("Expected ')' after parameters");
        }

        let body = self.parse_block();

        if self.errors.len() > errors_before {
            return None;
        }

        Some(Function {
            name,
            return_type,
            params,
            body,
            location,
            symbol_id: 0,
            original_name: name,
            module_path: String::new(),
            display_path: String::new(),
            allocated_name: None,
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Block<'a> {
        let location = self.peek().location;
        if !self.matches(TokenKind::LBrace) {
            self.error("Expected '{' at start of block");
            return Block {
                stmts: self.ctx.stmts.alloc_slice(Vec::new()),
                location,
            };
        }

        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                // Skip one token so a bad statement cannot stall the parse.
                None => {
                    self.advance();
                }
            }
        }

        if !self.matches(TokenKind::RBrace) {
            self.error("Expected '}' at end of block");
        }

        Block {
            stmts: self.ctx.stmts.alloc_slice(stmts),
            location,
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt<'a>> {
        let token = self.peek();

        match token.kind {
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                if !self.matches(TokenKind::Semicolon) {
                    self.error("Expected ';' after return statement");
                }
                Some(Stmt::new(StmtKind::Return(value), token.location))
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::LBrace => {
                let block = self.parse_block();
                Some(Stmt::new(StmtKind::Block(block), token.location))
            }
            TokenKind::Ident("dbg") if self.peek_next().kind == TokenKind::LParen => {
                self.parse_dbg_statement()
            }
            kind if kind.is_type_keyword() => self.parse_var_decl(),
            _ => {
                let expr = match self.parse_expression() {
                    Some(expr) => expr,
                    None => {
                        self.error("Expected statement");
                        return None;
                    }
                };
                if !self.matches(TokenKind::Semicolon) {
                    self.error("Expected ';' after expression");
                }
                Some(Stmt::new(StmtKind::Expr(expr), token.location))
            }
        }
    }

    /// `TYPE IDENT ( = EXPR )? ;`
    fn parse_var_decl(&mut self) -> Option<Stmt<'a>> {
        let token = self.peek();
        let ty = TypeNode::new(token.kind.as_type()?, token.location);
        self.advance();

        let name = match self.peek().kind {
            TokenKind::Ident(name) => name,
            _ => {
                self.error("Expected identifier after type");
                return None;
            }
        };
        self.advance();

        let init = if self.matches(TokenKind::Assign) {
            match self.parse_expression() {
                Some(expr) => Some(expr),
                None => {
                    self.error("Expected expression after '='");
                    None
                }
            }
        } else {
            None
        };

        if !self.matches(TokenKind::Semicolon) {
            self.error("Expected ';' after variable declaration");
        }

        Some(Stmt::new(StmtKind::VarDecl { name, ty, init }, token.location))
    }

    fn parse_if_statement(&mut self) -> Option<Stmt<'a>> {
        let location = self.peek().location;
        self.advance(); // 'if'

        if !self.matches(TokenKind::LParen) {
            self.error("Expected '(' after 'if'");
            return None;
        }
        let condition = self.parse_expression()?;
        if !self.matches(TokenKind::RParen) {
            self.error("Expected ')' after if condition");
            return None;
        }
        if !self.check(TokenKind::LBrace) {
            self.error("If statement body must be a block");
            return None;
        }
        let then_block = self.parse_block();

        let mut else_ifs = Vec::new();
        let mut else_block = None;

        while self.matches(TokenKind::Else) {
            if self.matches(TokenKind::If) {
                if !self.matches(TokenKind::LParen) {
                    self.error("Expected '(' after 'else if'");
                    return None;
                }
                let elif_condition = self.parse_expression()?;
                if !self.matches(TokenKind::RParen) {
                    self.error("Expected ')' after else-if condition");
                    return None;
                }
                if !self.check(TokenKind::LBrace) {
                    self.error("Else-if statement body must be a block");
                    return None;
                }
                let body = self.parse_block();
                else_ifs.push(ElseIf {
                    condition: elif_condition,
                    body,
                });
            } else {
                if !self.check(TokenKind::LBrace) {
                    self.error("Else statement body must be a block");
                    return None;
                }
                else_block = Some(self.parse_block());
                break;
            }
        }

        Some(Stmt::new(
            StmtKind::If {
                condition,
                then_block,
                else_ifs: self.ctx.elifs.alloc_slice(else_ifs),
                else_block,
            },
            location,
        ))
    }

    fn parse_while_statement(&mut self) -> Option<Stmt<'a>> {
        let location = self.peek().location;
        self.advance(); // 'while'

        if !self.matches(TokenKind::LParen) {
            self.error("Expected '(' after 'while'");
            return None;
        }
        let condition = self.parse_expression()?;
        if !self.matches(TokenKind::RParen) {
            self.error("Expected ')' after while condition");
            return None;
        }
        if !self.check(TokenKind::LBrace) {
            self.error("While statement body must be a block");
            return None;
        }
        let body = self.parse_block();

        Some(Stmt::new(StmtKind::While { condition, body }, location))
    }

    /// `for ( (VARDECL | EXPR)? ; EXPR? ; EXPR? ) BLOCK`
    fn parse_for_statement(&mut self) -> Option<Stmt<'a>> {
        let location = self.peek().location;
        self.advance(); // 'for'

        if !self.matches(TokenKind::LParen) {
            self.error("Expected '(' after 'for'");
            return None;
        }

        let init = if self.matches(TokenKind::Semicolon) {
            None
        } else if self.peek().kind.is_type_keyword() {
            // Variable declaration consumes its own semicolon.
            let stmt = self.parse_var_decl()?;
            Some(&*self.ctx.stmts.alloc(stmt))
        } else {
            let init_location = self.peek().location;
            let expr = self.parse_expression()?;
            if !self.matches(TokenKind::Semicolon) {
                self.error("Expected ';' after for init");
                return None;
            }
            Some(&*self.ctx.stmts.alloc(Stmt::new(StmtKind::Expr(expr), init_location)))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if !self.matches(TokenKind::Semicolon) {
            self.error("Expected ';' after for condition");
            return None;
        }

        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if !self.matches(TokenKind::RParen) {
            self.error("Expected ')' after for clauses");
            return None;
        }

        if !self.check(TokenKind::LBrace) {
            self.error("For statement body must be a block");
            return None;
        }
        let body = self.parse_block();

        Some(Stmt::new(
            StmtKind::For {
                init,
                condition,
                update,
                body,
            },
            location,
        ))
    }

    /// `dbg ( EXPR ( , EXPR )* ) ;`
    fn parse_dbg_statement(&mut self) -> Option<Stmt<'a>> {
        let location = self.peek().location;
        self.advance(); // 'dbg'
        self.advance(); // '('

        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let expr = match self.parse_expression() {
                    Some(expr) => expr,
                    None => {
                        self.error("Expected expression in dbg");
                        return None;
                    }
                };
                let label = self.ctx.str(&synthesize_label(expr));
                args.push(DbgArg { expr, label });

                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }

        if !self.matches(TokenKind::RParen) {
            self.error("Expected ')' after dbg arguments");
            return None;
        }
        if !self.matches(TokenKind::Semicolon) {
            self.error("Expected ';' after dbg statement");
            return None;
        }

        Some(Stmt::new(
            StmtKind::Dbg {
                args: self.ctx.dbg_args.alloc_slice(args),
            },
            location,
        ))
    }

    // ------------------------------------------------------------------
    // Expressions (precedence climbing, low to high)
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Option<&'a Expr<'a>> {
        self.parse_assignment()
    }

    /// Assignment is right-associative. The LHS-must-be-a-variable rule is
    /// enforced by semantic analysis so it is reported exactly once.
    fn parse_assignment(&mut self) -> Option<&'a Expr<'a>> {
        let expr = self.parse_logical_or()?;

        if self.check(TokenKind::Assign) {
            let location = self.peek().location;
            self.advance();
            let value = match self.parse_assignment() {
                Some(value) => value,
                None => {
                    self.error("Expected expression after '='");
                    return Some(expr);
                }
            };
            return Some(self.ctx.expr(
                ExprKind::Binary {
                    op: BinaryOp::Assign,
                    left: expr,
                    right: value,
                },
                location,
            ));
        }

        Some(expr)
    }

    fn parse_logical_or(&mut self) -> Option<&'a Expr<'a>> {
        let mut expr = self.parse_logical_and()?;
        while self.check(TokenKind::OrOr) {
            let location = self.advance().location;
            let right = match self.parse_logical_and() {
                Some(right) => right,
                None => {
                    self.error("Expected expression after '||'");
                    return Some(expr);
                }
            };
            expr = self.ctx.expr(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    left: expr,
                    right,
                },
                location,
            );
        }
        Some(expr)
    }

    fn parse_logical_and(&mut self) -> Option<&'a Expr<'a>> {
        let mut expr = self.parse_equality()?;
        while self.check(TokenKind::AndAnd) {
            let location = self.advance().location;
            let right = match self.parse_equality() {
                Some(right) => right,
                None => {
                    self.error("Expected expression after '&&'");
                    return Some(expr);
                }
            };
            expr = self.ctx.expr(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    left: expr,
                    right,
                },
                location,
            );
        }
        Some(expr)
    }

    fn parse_equality(&mut self) -> Option<&'a Expr<'a>> {
        let mut expr = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            let location = self.advance().location;
            let right = match self.parse_relational() {
                Some(right) => right,
                None => {
                    self.error("Expected expression after operator");
                    return Some(expr);
                }
            };
            expr = self.ctx.expr(ExprKind::Binary { op, left: expr, right }, location);
        }
        Some(expr)
    }

    fn parse_relational(&mut self) -> Option<&'a Expr<'a>> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            let location = self.advance().location;
            let right = match self.parse_additive() {
                Some(right) => right,
                None => {
                    self.error("Expected expression after operator");
                    return Some(expr);
                }
            };
            expr = self.ctx.expr(ExprKind::Binary { op, left: expr, right }, location);
        }
        Some(expr)
    }

    fn parse_additive(&mut self) -> Option<&'a Expr<'a>> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let location = self.advance().location;
            let right = match self.parse_multiplicative() {
                Some(right) => right,
                None => {
                    self.error("Expected expression after operator");
                    return Some(expr);
                }
            };
            expr = self.ctx.expr(ExprKind::Binary { op, left: expr, right }, location);
        }
        Some(expr)
    }

    fn parse_multiplicative(&mut self) -> Option<&'a Expr<'a>> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            let location = self.advance().location;
            let right = match self.parse_unary() {
                Some(right) => right,
                None => {
                    self.error("Expected expression after operator");
                    return Some(expr);
                }
            };
            expr = self.ctx.expr(ExprKind::Binary { op, left: expr, right }, location);
        }
        Some(expr)
    }

    fn parse_unary(&mut self) -> Option<&'a Expr<'a>> {
        let op = match self.peek().kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let location = self.advance().location;
            let operand = self.parse_unary()?;
            return Some(self.ctx.expr(ExprKind::Unary { op, operand }, location));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<&'a Expr<'a>> {
        let token = self.peek();

        match token.kind {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Some(self.ctx.expr(ExprKind::IntLiteral(value), token.location))
            }
            TokenKind::True => {
                self.advance();
                Some(self.ctx.expr(ExprKind::BoolLiteral(true), token.location))
            }
            TokenKind::False => {
                self.advance();
                Some(self.ctx.expr(ExprKind::BoolLiteral(false), token.location))
            }
            TokenKind::Ident(name) => {
                self.advance();
                let mut name = name;

                // Optional `module:function` qualification.
                if self.check(TokenKind::Colon) {
                    self.advance();
                    match self.peek().kind {
                        TokenKind::Ident(member) => {
                            self.advance();
                            name = self.ctx.str(&format!("{}:{}", name, member));
                        }
                        _ => {
                            self.error("Expected identifier after ':' in qualified name");
                            return None;
                        }
                    }
                }

                if self.check(TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            let arg = match self.parse_expression() {
                                Some(arg) => arg,
                                None => {
                                    self.error("Expected expression in function call");
                                    return None;
                                }
                            };
                            args.push(arg);
                            if !self.matches(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    if !self.matches(TokenKind::RParen) {
                        self.error("Expected ')' after function arguments");
                    }
                    Some(self.ctx.expr(
                        ExprKind::Call {
                            name,
                            args: self.ctx.expr_refs.alloc_slice(args),
                            resolved_symbol: Cell::new(0),
                        },
                        token.location,
                    ))
                } else {
                    Some(self.ctx.expr(ExprKind::Variable(name), token.location))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                if !self.matches(TokenKind::RParen) {
                    self.error("Expected ')' after expression");
                }
                Some(expr)
            }
            _ => {
                self.error("Expected expression");
                None
            }
        }
    }
}

/// Rebuilds a source-like label for a `dbg` argument from its structure.
///
/// Labels never depend on evaluated values; they only annotate the printed
/// output.
fn synthesize_label(expr: &Expr<'_>) -> String {
    match &expr.kind {
        ExprKind::Variable(name) => (*name).to_string(),
        ExprKind::IntLiteral(value) => value.to_string(),
        ExprKind::BoolLiteral(value) => value.to_string(),
        ExprKind::Call { name, .. } => format!("{}()", name),
        ExprKind::Binary { op, left, right } => format!(
            "{} {} {}",
            synthesize_label(left),
            op.symbol(),
            synthesize_label(right)
        ),
        ExprKind::Unary { op, operand } => {
            format!("{}{}", op.symbol(), synthesize_label(operand))
        }
    }
}
