//! A recursive descent parser for Brook source text.
//!
//! The parser consumes tokens from a [Lexer] with buffered lookahead (one
//! token in the common case, up to six while detecting assignments) and
//! emits an unverified [Ir] tree.
//!
//! A compilation unit is an implicit module named `main`: declarations
//! (methods, classes, nested modules) become children of the module scope,
//! every other line becomes an instruction of the synthetic `main`
//! function. Expressions are parsed by precedence climbing with three
//! operator tiers; every operator application is modeled as a method call
//! on its left (or only) operand.
//!
//! The parser fails with a `SyntaxError` carrying the offending tokens on
//! the first unexpected token or unterminated construct; it does not
//! attempt recovery.
//!
//! # Example
//!
//! ```
//! use brook::{ir::Ir, lexer::Lexer, parser::Parser, Code};
//!
//! let code = Code::from("def twice(x:Int) -> Int\n  return x + x\nend\n");
//! let mut ir = Ir::new();
//! let module = Parser::new(Lexer::new(&code)).parse_unit(&mut ir).unwrap();
//! assert_eq!(ir.name(module), Some("main"));
//! ```

mod expression;
mod method;
mod statement;

#[cfg(test)]
mod __tests__;

use crate::ir::{Ir, NodeId, NodeKind};
use crate::lexer::Lexer;
use crate::{CompileError, CompileResult, ErrorKind, Token, TokenKind};
use std::collections::VecDeque;

/// The recursive descent parser over a token stream.
pub struct Parser<'c> {
    lexer: Lexer<'c>,
    buffer: VecDeque<Token>,
}

impl<'c> Parser<'c> {
    pub fn new(lexer: Lexer<'c>) -> Self {
        Self {
            lexer,
            buffer: VecDeque::new(),
        }
    }

    /// Parse a whole compilation unit into the implicit `main` module.
    pub fn parse_unit(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let module = ir.new_module("main", Vec::new());
        let mut instructions = Vec::new();

        loop {
            match self.parse_line(ir)? {
                None => break,
                Some(value) => self.place(ir, module, value, &mut instructions),
            }
        }

        let main = ir.new_function("main", Vec::new(), instructions, None, Vec::new());
        ir.module_set_main(module, main);
        Ok(module)
    }

    /// Parse an inline `module NAME … end` construct.
    pub(crate) fn parse_module(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::Module)?];
        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.text().to_string();
        tokens.push(name_token);

        let module = ir.new_module(&name, tokens.clone());
        let mut instructions = Vec::new();

        loop {
            match self.strip_newlines()? {
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Expected `end` before end of input for module".to_string(),
                        tokens,
                    ))
                }
                Some(token) if token.kind == TokenKind::End => {
                    self.next_token()?;
                    break;
                }
                Some(_) => match self.parse_line(ir)? {
                    None => continue,
                    Some(value) => self.place(ir, module, value, &mut instructions),
                },
            }
        }

        let main = ir.new_function("main", Vec::new(), instructions, None, Vec::new());
        ir.module_set_main(module, main);
        Ok(module)
    }

    /// Scopes are added as children of the enclosing module; every other
    /// value is an instruction.
    fn place(&self, ir: &mut Ir, module: NodeId, value: NodeId, instructions: &mut Vec<NodeId>) {
        let scope = matches!(
            ir.kind(value),
            NodeKind::Method(_) | NodeKind::Class(_) | NodeKind::Module(_)
        );
        if scope {
            ir.scope_add_child(module, value);
        } else {
            instructions.push(value);
        }
    }

    /// Fill the lookahead buffer up to `n` tokens, stopping at end of input.
    fn fill(&mut self, n: usize) -> CompileResult<()> {
        while self.buffer.len() < n {
            match self.lexer.lex()? {
                Some(token) => self.buffer.push_back(token),
                None => break,
            }
        }
        Ok(())
    }

    /// Look ahead of the current token by `n` tokens (1 is the next token).
    pub(crate) fn look_ahead(&mut self, n: usize) -> CompileResult<Option<Token>> {
        self.fill(n)?;
        Ok(self.buffer.get(n - 1).cloned())
    }

    pub(crate) fn look_ahead_kind(&mut self, n: usize) -> CompileResult<Option<TokenKind>> {
        Ok(self.look_ahead(n)?.map(|token| token.kind))
    }

    /// Return the next token and move forward by one token.
    pub(crate) fn next_token(&mut self) -> CompileResult<Option<Token>> {
        self.fill(1)?;
        Ok(self.buffer.pop_front())
    }

    /// Consume the next token, requiring the given kind.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        match self.next_token()? {
            None => Err(CompileError::new(
                ErrorKind::SyntaxError,
                format!("Expected {:?} before end of input", kind),
                Vec::new(),
            )),
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.unexpected(token)),
        }
    }

    /// Skip newline tokens, returning the following lookahead.
    pub(crate) fn strip_newlines(&mut self) -> CompileResult<Option<Token>> {
        loop {
            match self.look_ahead(1)? {
                Some(token) if token.kind == TokenKind::Newline => {
                    self.next_token()?;
                }
                other => return Ok(other),
            }
        }
    }

    pub(crate) fn unexpected(&self, token: Token) -> CompileError {
        CompileError::new(
            ErrorKind::SyntaxError,
            format!("Unexpected {:?}: `{}`", token.kind, token.text()),
            vec![token],
        )
    }
}
