//! Lexer for casm source text.
//!
//! The lexer walks a UTF-8-agnostic byte buffer and produces [`Token`]s
//! carrying source locations. It is strictly zero-copy: identifier and
//! string payloads are slices of the input buffer.
//!
//! ## Behavior
//!
//! - ASCII whitespace and both comment forms (`// …` to end of line,
//!   `/* … */` non-nesting) are skipped between tokens.
//! - Keywords are recognized by exact identifier match.
//! - Operators use maximal munch: `==`, `!=`, `<=`, `>=`, `&&`, `||` win
//!   over their single-character prefixes. A stray `&` or `|` yields an
//!   error token.
//! - Integer literals are base-10 and consumed greedily; a value outside
//!   the 64-bit signed parse range yields an error token whose location the
//!   parser surfaces.
//! - `\n` advances the line counter and resets the column to 0; columns are
//!   0-based byte offsets from the start of the current line.

use casm_base::SourceLocation;

use crate::token::{LexError, Token, TokenKind};

/// A cursor over one source buffer.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    current: usize,
    line: u32,
    column: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer at the start of `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            current: 0,
            line: 1,
            column: 0,
            line_start: 0,
        }
    }

    /// Tokenizes the whole buffer, ending with an [`TokenKind::Eof`] token.
    pub fn tokenize(source: &'a str) -> Vec<Token<'a>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.bytes.len() {
            0
        } else {
            self.bytes[self.current + 1]
        }
    }

    fn advance(&mut self) -> u8 {
        if self.is_at_end() {
            return 0;
        }
        let c = self.bytes[self.current];
        self.current += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 0;
            self.line_start = self.current;
        } else {
            self.column += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.advance();
                }
                b'/' if self.peek_next() == b'/' => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() && self.peek() != b'\n' {
                        self.advance();
                    }
                }
                b'/' if self.peek_next() == b'*' => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == b'*' && self.peek_next() == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn location_at(&self, offset: usize, line: u32, column: u32) -> SourceLocation {
        SourceLocation::new(line, column, offset)
    }

    fn token(&self, kind: TokenKind<'a>, offset: usize, line: u32, column: u32) -> Token<'a> {
        Token::new(kind, self.location_at(offset, line, column))
    }

    fn scan_number(&mut self, start: usize, line: u32, column: u32) -> Token<'a> {
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }
        let lexeme = &self.source[start..self.current];
        match lexeme.parse::<i64>() {
            Ok(value) => self.token(TokenKind::IntLiteral(value), start, line, column),
            Err(_) => self.token(TokenKind::Error(LexError::IntegerOverflow), start, line, column),
        }
    }

    fn scan_identifier(&mut self, start: usize, line: u32, column: u32) -> Token<'a> {
        while !self.is_at_end() && is_identifier_cont(self.peek()) {
            self.advance();
        }
        let lexeme = &self.source[start..self.current];
        let kind = match lexeme {
            "i8" => TokenKind::I8,
            "i16" => TokenKind::I16,
            "i32" => TokenKind::I32,
            "i64" => TokenKind::I64,
            "u8" => TokenKind::U8,
            "u16" => TokenKind::U16,
            "u32" => TokenKind::U32,
            "u64" => TokenKind::U64,
            "bool" => TokenKind::Bool,
            "void" => TokenKind::Void,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "import" => TokenKind::Import,
            "from" => TokenKind::From,
            _ => TokenKind::Ident(lexeme),
        };
        self.token(kind, start, line, column)
    }

    fn scan_string(&mut self, start: usize, line: u32, column: u32) -> Token<'a> {
        // Opening quote already consumed.
        let content_start = self.current;
        while !self.is_at_end() && self.peek() != b'"' && self.peek() != b'\n' {
            self.advance();
        }
        if self.peek() != b'"' {
            return self.token(TokenKind::Error(LexError::UnterminatedString), start, line, column);
        }
        let content = &self.source[content_start..self.current];
        self.advance();
        self.token(TokenKind::Str(content), start, line, column)
    }

    /// Scans and returns the next token.
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();

        let start = self.current;
        let line = self.line;
        let column = self.column;

        if self.is_at_end() {
            return self.token(TokenKind::Eof, start, line, column);
        }

        let c = self.advance();
        match c {
            b'(' => self.token(TokenKind::LParen, start, line, column),
            b')' => self.token(TokenKind::RParen, start, line, column),
            b'{' => self.token(TokenKind::LBrace, start, line, column),
            b'}' => self.token(TokenKind::RBrace, start, line, column),
            b';' => self.token(TokenKind::Semicolon, start, line, column),
            b',' => self.token(TokenKind::Comma, start, line, column),
            b'#' => self.token(TokenKind::Hash, start, line, column),
            b':' => self.token(TokenKind::Colon, start, line, column),
            b'+' => self.token(TokenKind::Plus, start, line, column),
            b'-' => self.token(TokenKind::Minus, start, line, column),
            b'*' => self.token(TokenKind::Star, start, line, column),
            b'/' => self.token(TokenKind::Slash, start, line, column),
            b'%' => self.token(TokenKind::Percent, start, line, column),
            b'=' => {
                if self.peek() == b'=' {
                    self.advance();
                    self.token(TokenKind::Eq, start, line, column)
                } else {
                    self.token(TokenKind::Assign, start, line, column)
                }
            }
            b'!' => {
                if self.peek() == b'=' {
                    self.advance();
                    self.token(TokenKind::Ne, start, line, column)
                } else {
                    self.token(TokenKind::Not, start, line, column)
                }
            }
            b'<' => {
                if self.peek() == b'=' {
                    self.advance();
                    self.token(TokenKind::Le, start, line, column)
                } else {
                    self.token(TokenKind::Lt, start, line, column)
                }
            }
            b'>' => {
                if self.peek() == b'=' {
                    self.advance();
                    self.token(TokenKind::Ge, start, line, column)
                } else {
                    self.token(TokenKind::Gt, start, line, column)
                }
            }
            b'&' => {
                if self.peek() == b'&' {
                    self.advance();
                    self.token(TokenKind::AndAnd, start, line, column)
                } else {
                    self.token(TokenKind::Error(LexError::UnexpectedCharacter), start, line, column)
                }
            }
            b'|' => {
                if self.peek() == b'|' {
                    self.advance();
                    self.token(TokenKind::OrOr, start, line, column)
                } else {
                    self.token(TokenKind::Error(LexError::UnexpectedCharacter), start, line, column)
                }
            }
            b'"' => self.scan_string(start, line, column),
            c if c.is_ascii_digit() => self.scan_number(start, line, column),
            c if is_identifier_start(c) => self.scan_identifier(start, line, column),
            _ => self.token(TokenKind::Error(LexError::UnexpectedCharacter), start, line, column),
        }
    }
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_identifier_cont(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}
