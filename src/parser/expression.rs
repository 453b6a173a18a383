use super::Parser;
use crate::ir::{Attribute, Call, Ir, Literal, LiteralValue, NodeId, NodeKind, Reference};
use crate::token::BINARY_TIERS;
use crate::{CompileError, CompileResult, ErrorKind, Token, TokenKind};

impl<'c> Parser<'c> {
    /// Parse an expression by precedence climbing.
    ///
    /// Tier 0 (comparisons) binds loosest, the last tier (multiplicative)
    /// binds tightest; all operators are left associative and lower to
    /// method calls on their left operand.
    pub(crate) fn parse_value(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        self.parse_binary(ir, 0)
    }

    fn parse_binary(&mut self, ir: &mut Ir, tier: usize) -> CompileResult<NodeId> {
        if tier == BINARY_TIERS.len() {
            return self.parse_unary(ir);
        }

        let mut lhs = self.parse_binary(ir, tier + 1)?;
        loop {
            match self.look_ahead_kind(1)? {
                Some(kind) if BINARY_TIERS[tier].contains(&kind) => {
                    let operation = match self.next_token()? {
                        Some(token) => token,
                        None => break,
                    };
                    let rhs = self.parse_binary(ir, tier + 1)?;
                    lhs = self.operation_call(ir, lhs, &operation, vec![rhs]);
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    /// `a OP b` becomes `a.OP(b)`, a prefix `OP a` becomes `a.OP()`.
    fn operation_call(
        &self,
        ir: &mut Ir,
        value: NodeId,
        operation: &Token,
        arguments: Vec<NodeId>,
    ) -> NodeId {
        let name = operation.kind.spelling().unwrap_or_default().to_string();
        let attribute = ir.push(
            vec![operation.clone()],
            NodeKind::Attribute(Attribute {
                value,
                name,
                attribute: None,
                verified: false,
            }),
        );
        ir.push(
            vec![operation.clone()],
            NodeKind::Call(Call {
                called: attribute,
                arguments,
                return_type: None,
                function: None,
            }),
        )
    }

    fn parse_unary(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        // Collect prefix operations; they accumulate outermost first and
        // apply innermost first.
        let mut operations = Vec::new();
        loop {
            match self.look_ahead_kind(1)? {
                Some(kind) if kind.is_unary_operation() => match self.next_token()? {
                    Some(token) => operations.push(token),
                    None => break,
                },
                _ => break,
            }
        }

        let mut value = self.parse_single_value(ir)?;
        for operation in operations.iter().rev() {
            value = self.operation_call(ir, value, operation, Vec::new());
        }

        // Postfix constructs on the accumulated value.
        loop {
            match self.look_ahead_kind(1)? {
                Some(TokenKind::GroupStart) => value = self.parse_call(ir, value)?,
                Some(TokenKind::Dot) => value = self.parse_attribute(ir, value)?,
                Some(TokenKind::As) => value = self.parse_cast(ir, value)?,
                _ => break,
            }
        }

        Ok(value)
    }

    pub(crate) fn parse_single_value(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let token = match self.look_ahead(1)? {
            None => {
                return Err(CompileError::new(
                    ErrorKind::SyntaxError,
                    "Expected value before end of input".to_string(),
                    Vec::new(),
                ))
            }
            Some(token) => token,
        };

        match token.kind {
            TokenKind::Def => self.parse_method(ir),
            TokenKind::Class => self.parse_class(ir),
            TokenKind::Module => self.parse_module(ir),
            TokenKind::New => {
                // Constructor calls are ordinary calls on the class value.
                self.next_token()?;
                self.parse_single_value(ir)
            }
            TokenKind::Identifier | TokenKind::SelfKw => {
                let token = match self.next_token()? {
                    Some(token) => token,
                    None => return Err(self.unexpected(token)),
                };
                let name = token.text().to_string();
                Ok(ir.push(
                    vec![token],
                    NodeKind::Reference(Reference {
                        name,
                        value: None,
                        verified: false,
                    }),
                ))
            }
            TokenKind::Integer | TokenKind::Dot => self.parse_number(ir),
            TokenKind::True | TokenKind::False => {
                let token = match self.next_token()? {
                    Some(token) => token,
                    None => return Err(self.unexpected(token)),
                };
                let value = token.kind == TokenKind::True;
                Ok(self.literal(ir, LiteralValue::Bool(value), "Bool", vec![token]))
            }
            TokenKind::String => {
                let token = self.expect(TokenKind::String)?;
                let value = token.text().to_string();
                Ok(self.literal(ir, LiteralValue::Str(value), "String", vec![token]))
            }
            TokenKind::FormatString => {
                let token = self.expect(TokenKind::FormatString)?;
                let value = decode_escapes(token.text());
                Ok(self.literal(ir, LiteralValue::Str(value), "String", vec![token]))
            }
            TokenKind::GroupStart => {
                self.expect(TokenKind::GroupStart)?;
                let value = self.parse_value(ir)?;
                self.expect(TokenKind::GroupEnd)?;
                Ok(value)
            }
            _ => Err(self.unexpected(token)),
        }
    }

    fn literal(
        &self,
        ir: &mut Ir,
        value: LiteralValue,
        type_name: &str,
        tokens: Vec<Token>,
    ) -> NodeId {
        let ty = ir.push(
            Vec::new(),
            NodeKind::Reference(Reference {
                name: type_name.to_string(),
                value: None,
                verified: false,
            }),
        );
        ir.push(tokens, NodeKind::Literal(Literal { value, ty }))
    }

    fn parse_number(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let first = match self.next_token()? {
            Some(token) => token,
            None => {
                return Err(CompileError::new(
                    ErrorKind::SyntaxError,
                    "Expected number before end of input".to_string(),
                    Vec::new(),
                ))
            }
        };

        // Real starting with a dot: `.INT`
        if first.kind == TokenKind::Dot {
            let digits = self.expect(TokenKind::Integer)?;
            let text = format!(".{}", digits.text().replace('_', ""));
            let value = self.parse_real(&text, &digits)?;
            return Ok(self.literal(ir, LiteralValue::Real(value), "Real", vec![first, digits]));
        }

        let integer_part = first.text().replace('_', "");

        // Real with a trailing or embedded dot: `INT.` or `INT.INT`
        if self.look_ahead_kind(1)? == Some(TokenKind::Dot) {
            let dot = self.expect(TokenKind::Dot)?;
            let mut tokens = vec![first, dot];
            let mut text = format!("{}.", integer_part);

            if self.look_ahead_kind(1)? == Some(TokenKind::Integer) {
                let digits = self.expect(TokenKind::Integer)?;
                text.push_str(&digits.text().replace('_', ""));
                tokens.push(digits);
            }

            let value = self.parse_real(&text, &tokens[0])?;
            return Ok(self.literal(ir, LiteralValue::Real(value), "Real", tokens));
        }

        // Integer
        match integer_part.parse::<i64>() {
            Ok(value) => Ok(self.literal(ir, LiteralValue::Int(value), "Int", vec![first])),
            Err(_) => Err(CompileError::new(
                ErrorKind::SyntaxError,
                format!("Integer literal `{}` is out of range", first.text()),
                vec![first],
            )),
        }
    }

    fn parse_real(&self, text: &str, token: &Token) -> CompileResult<f64> {
        text.parse::<f64>().map_err(|_| {
            CompileError::new(
                ErrorKind::SyntaxError,
                format!("Real literal `{}` is out of range", text),
                vec![token.clone()],
            )
        })
    }

    /// A call on the accumulated value: `(` arguments `)`.
    fn parse_call(&mut self, ir: &mut Ir, called: NodeId) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::GroupStart)?];

        let mut arguments = Vec::new();
        if self.look_ahead_kind(1)? == Some(TokenKind::GroupEnd) {
            tokens.push(self.expect(TokenKind::GroupEnd)?);
        } else {
            loop {
                arguments.push(self.parse_value(ir)?);
                match self.next_token()? {
                    Some(token) if token.kind == TokenKind::Comma => continue,
                    Some(token) if token.kind == TokenKind::GroupEnd => {
                        tokens.push(token);
                        break;
                    }
                    Some(token) => return Err(self.unexpected(token)),
                    None => {
                        return Err(CompileError::new(
                            ErrorKind::SyntaxError,
                            "Expected `)` before end of input for call".to_string(),
                            tokens,
                        ))
                    }
                }
            }
        }

        Ok(ir.push(
            tokens,
            NodeKind::Call(Call {
                called,
                arguments,
                return_type: None,
                function: None,
            }),
        ))
    }

    fn parse_attribute(&mut self, ir: &mut Ir, value: NodeId) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::Dot)?];
        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.text().to_string();
        tokens.push(name_token);

        Ok(ir.push(
            tokens,
            NodeKind::Attribute(Attribute {
                value,
                name,
                attribute: None,
                verified: false,
            }),
        ))
    }

    /// `value as TYPE` lowers to a call of the `as` method with the target
    /// type as the return type hint.
    fn parse_cast(&mut self, ir: &mut Ir, value: NodeId) -> CompileResult<NodeId> {
        let token = self.expect(TokenKind::As)?;
        let ty = self.parse_single_value(ir)?;

        let attribute = ir.push(
            vec![token.clone()],
            NodeKind::Attribute(Attribute {
                value,
                name: "as".to_string(),
                attribute: None,
                verified: false,
            }),
        );
        Ok(ir.push(
            vec![token],
            NodeKind::Call(Call {
                called: attribute,
                arguments: Vec::new(),
                return_type: Some(ty),
                function: None,
            }),
        ))
    }
}

/// Decode the standard backslash escapes of a format string.
pub(crate) fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
