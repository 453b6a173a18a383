use super::Parser;
use crate::ir::{Assignment, Branch, Break, Import, Ir, Loop, NodeId, NodeKind, Return, Variable};
use crate::{CompileError, CompileResult, ErrorKind, TokenKind};

/// The assignment token must lie within the first six tokens of the line:
/// the shortest form is `foo =`, the longest `const foo:Bar =`.
const ASSIGNMENT_WINDOW: usize = 6;

impl<'c> Parser<'c> {
    /// Parse one line. Returns `None` at the end of the input.
    pub(crate) fn parse_line(&mut self, ir: &mut Ir) -> CompileResult<Option<NodeId>> {
        let token = match self.strip_newlines()? {
            None => return Ok(None),
            Some(token) => token,
        };

        let value = match token.kind {
            TokenKind::Return => self.parse_return(ir)?,
            TokenKind::Import => self.parse_import(ir)?,
            TokenKind::If => self.parse_branch(ir)?,
            TokenKind::While => self.parse_while(ir)?,
            TokenKind::Loop => self.parse_loop(ir)?,
            TokenKind::Break => self.parse_break(ir)?,
            TokenKind::Identifier | TokenKind::Const => {
                if self.detect_assignment()? {
                    self.parse_assignment(ir)?
                } else {
                    self.parse_value(ir)?
                }
            }
            _ => self.parse_value(ir)?,
        };
        Ok(Some(value))
    }

    fn detect_assignment(&mut self) -> CompileResult<bool> {
        for n in 1..=ASSIGNMENT_WINDOW {
            match self.look_ahead_kind(n)? {
                None | Some(TokenKind::Newline) => break,
                Some(TokenKind::Assign) => return Ok(true),
                Some(_) => continue,
            }
        }
        Ok(false)
    }

    fn parse_return(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let tokens = vec![self.expect(TokenKind::Return)?];

        let value = match self.look_ahead_kind(1)? {
            None | Some(TokenKind::Newline) | Some(TokenKind::End) => None,
            Some(_) => Some(self.parse_value(ir)?),
        };

        Ok(ir.push(
            tokens,
            NodeKind::Return(Return {
                value,
                function: None,
            }),
        ))
    }

    fn parse_import(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::Import)?];
        let mut path = Vec::new();

        // Paths can start with any number of dots.
        while self.look_ahead_kind(1)? == Some(TokenKind::Dot) {
            tokens.push(self.expect(TokenKind::Dot)?);
            path.push(".".to_string());
        }

        // Then identifiers separated by dots.
        loop {
            let token = self.expect(TokenKind::Identifier)?;
            path.push(token.text().to_string());
            tokens.push(token);

            if self.look_ahead_kind(1)? == Some(TokenKind::Dot) {
                tokens.push(self.expect(TokenKind::Dot)?);
            } else {
                break;
            }
        }

        let alias = if self.look_ahead_kind(1)? == Some(TokenKind::As) {
            tokens.push(self.expect(TokenKind::As)?);
            let token = self.expect(TokenKind::Identifier)?;
            let alias = token.text().to_string();
            tokens.push(token);
            Some(alias)
        } else {
            None
        };

        Ok(ir.push(tokens, NodeKind::Import(Import { path, alias })))
    }

    fn parse_branch(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::If)?];
        let condition = self.parse_value(ir)?;

        let mut on_true = Vec::new();
        loop {
            match self.strip_newlines()? {
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Expected `end` or `else` before end of input for if branch".to_string(),
                        tokens,
                    ))
                }
                Some(token) if token.kind == TokenKind::End => {
                    tokens.push(self.expect(TokenKind::End)?);
                    return Ok(ir.push(
                        tokens,
                        NodeKind::Branch(Branch {
                            condition,
                            on_true,
                            on_false: Vec::new(),
                        }),
                    ));
                }
                Some(token) if token.kind == TokenKind::Else => {
                    tokens.push(self.expect(TokenKind::Else)?);
                    break;
                }
                Some(_) => match self.parse_line(ir)? {
                    Some(value) => on_true.push(value),
                    None => continue,
                },
            }
        }

        let mut on_false = Vec::new();
        loop {
            match self.strip_newlines()? {
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Expected `end` before end of input for else branch".to_string(),
                        tokens,
                    ))
                }
                Some(token) if token.kind == TokenKind::End => {
                    tokens.push(self.expect(TokenKind::End)?);
                    return Ok(ir.push(
                        tokens,
                        NodeKind::Branch(Branch {
                            condition,
                            on_true,
                            on_false,
                        }),
                    ));
                }
                Some(_) => match self.parse_line(ir)? {
                    Some(value) => on_false.push(value),
                    None => continue,
                },
            }
        }
    }

    /// `while COND … end` lowers to a loop whose first instruction breaks
    /// when the condition fails.
    fn parse_while(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::While)?];
        let condition = self.parse_value(ir)?;

        let body = self.parse_block(ir, &mut tokens, "while loop")?;

        let exit = ir.push(Vec::new(), NodeKind::Break(Break::default()));
        let guard = ir.push(
            Vec::new(),
            NodeKind::Branch(Branch {
                condition,
                on_true: Vec::new(),
                on_false: vec![exit],
            }),
        );

        let mut instructions = vec![guard];
        instructions.extend(body);
        Ok(ir.push(
            tokens,
            NodeKind::Loop(Loop {
                instructions,
                function: None,
            }),
        ))
    }

    fn parse_loop(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::Loop)?];
        let instructions = self.parse_block(ir, &mut tokens, "loop")?;
        Ok(ir.push(
            tokens,
            NodeKind::Loop(Loop {
                instructions,
                function: None,
            }),
        ))
    }

    /// Lines up to a closing `end`, which is consumed.
    pub(crate) fn parse_block(
        &mut self,
        ir: &mut Ir,
        tokens: &mut Vec<crate::Token>,
        construct: &str,
    ) -> CompileResult<Vec<NodeId>> {
        let mut instructions = Vec::new();
        loop {
            match self.strip_newlines()? {
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        format!("Expected `end` before end of input for {}", construct),
                        tokens.clone(),
                    ))
                }
                Some(token) if token.kind == TokenKind::End => {
                    tokens.push(self.expect(TokenKind::End)?);
                    return Ok(instructions);
                }
                Some(_) => match self.parse_line(ir)? {
                    Some(value) => instructions.push(value),
                    None => continue,
                },
            }
        }
    }

    fn parse_break(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let token = self.expect(TokenKind::Break)?;
        Ok(ir.push(vec![token], NodeKind::Break(Break::default())))
    }

    fn parse_assignment(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let variable = self.parse_variable(ir)?;
        let mut tokens = ir.tokens(variable);
        tokens.push(self.expect(TokenKind::Assign)?);
        let value = self.parse_value(ir)?;
        Ok(ir.push(tokens, NodeKind::Assignment(Assignment { variable, value })))
    }

    /// Parse a variable, with optional constness and type signature.
    pub(crate) fn parse_variable(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = Vec::new();

        let constant = if self.look_ahead_kind(1)? == Some(TokenKind::Const) {
            tokens.push(self.expect(TokenKind::Const)?);
            true
        } else {
            false
        };

        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.text().to_string();
        tokens.push(name_token);

        let ty = self.parse_type_sig(ir, TokenKind::Typeof)?;

        Ok(ir.push(
            tokens,
            NodeKind::Variable(Variable { name, ty, constant }),
        ))
    }

    /// Parse an optional type signature introduced by `introducer`.
    pub(crate) fn parse_type_sig(
        &mut self,
        ir: &mut Ir,
        introducer: TokenKind,
    ) -> CompileResult<Option<NodeId>> {
        if self.look_ahead_kind(1)? != Some(introducer) {
            return Ok(None);
        }
        self.next_token()?;
        Ok(Some(self.parse_value(ir)?))
    }
}
