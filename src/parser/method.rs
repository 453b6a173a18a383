use super::Parser;
use crate::ir::{Call, Ir, NodeId, NodeKind};
use crate::{CompileError, CompileResult, ErrorKind, Token, TokenKind};

impl<'c> Parser<'c> {
    /// Parse one of the four `def` shapes: named method, binary operator,
    /// unary operator or cast.
    pub(crate) fn parse_method(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::Def)?];

        let second = self.look_ahead_kind(2)?;
        let cast_like = matches!(second, Some(TokenKind::As) | Some(TokenKind::Typeof));

        let (name, arguments, defaults, return_type) = if !cast_like {
            let (name, arguments, defaults) =
                if self.look_ahead_kind(1)? == Some(TokenKind::SelfKw) {
                    // Binary operation: `def self OP rhs`
                    tokens.push(self.expect(TokenKind::SelfKw)?);
                    let operation = self.operation_token(&mut tokens, true)?;
                    let rhs = self.parse_variable(ir)?;
                    (operation, vec![rhs], vec![None])
                } else if second == Some(TokenKind::SelfKw) {
                    // Unary operation: `def OP self`
                    let operation = self.operation_token(&mut tokens, false)?;
                    tokens.push(self.expect(TokenKind::SelfKw)?);
                    (operation, Vec::new(), Vec::new())
                } else {
                    let name_token = self.expect(TokenKind::Identifier)?;
                    let name = name_token.text().to_string();
                    tokens.push(name_token);
                    let (arguments, defaults) = self.parse_method_arguments(ir)?;
                    (name, arguments, defaults)
                };
            let return_type = self.parse_type_sig(ir, TokenKind::Returns)?;
            (name, arguments, defaults, return_type)
        } else {
            // Cast: `def self as TYPE`
            tokens.push(self.expect(TokenKind::SelfKw)?);
            match self.look_ahead(1)? {
                Some(token) if token.kind == TokenKind::As => {
                    tokens.push(self.expect(TokenKind::As)?);
                    let target = self.parse_single_value(ir)?;
                    ("as".to_string(), Vec::new(), Vec::new(), Some(target))
                }
                Some(token) => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Implicit casts are not supported".to_string(),
                        vec![token],
                    ))
                }
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Expected `as` before end of input".to_string(),
                        tokens,
                    ))
                }
            }
        };

        self.parse_method_body(ir, &name, arguments, defaults, return_type, tokens)
    }

    fn operation_token(
        &mut self,
        tokens: &mut Vec<Token>,
        binary: bool,
    ) -> CompileResult<String> {
        let token = match self.next_token()? {
            Some(token) => token,
            None => {
                return Err(CompileError::new(
                    ErrorKind::SyntaxError,
                    "Expected operation before end of input".to_string(),
                    tokens.clone(),
                ))
            }
        };
        let valid = if binary {
            token.kind.is_binary_operation()
        } else {
            token.kind.is_unary_operation()
        };
        if !valid {
            return Err(CompileError::new(
                ErrorKind::SyntaxError,
                format!("{} is not a valid operation", token),
                vec![token],
            ));
        }
        let name = token.kind.spelling().unwrap_or_default().to_string();
        tokens.push(token);
        Ok(name)
    }

    /// Parse a constructor group: `new(args) … end`.
    pub(crate) fn parse_constructor(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let tokens = vec![self.expect(TokenKind::New)?];
        let (arguments, defaults) = self.parse_method_arguments(ir)?;
        self.parse_method_body(ir, "", arguments, defaults, None, tokens)
    }

    fn parse_method_arguments(
        &mut self,
        ir: &mut Ir,
    ) -> CompileResult<(Vec<NodeId>, Vec<Option<NodeId>>)> {
        self.expect(TokenKind::GroupStart)?;

        let mut arguments = Vec::new();
        let mut defaults = Vec::new();

        if self.look_ahead_kind(1)? == Some(TokenKind::GroupEnd) {
            self.next_token()?;
            return Ok((arguments, defaults));
        }

        loop {
            arguments.push(self.parse_variable(ir)?);

            let mut token = match self.next_token()? {
                Some(token) => token,
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Expected `)` before end of input for arguments".to_string(),
                        Vec::new(),
                    ))
                }
            };

            if token.kind == TokenKind::Assign {
                defaults.push(Some(self.parse_value(ir)?));
                token = match self.next_token()? {
                    Some(token) => token,
                    None => {
                        return Err(CompileError::new(
                            ErrorKind::SyntaxError,
                            "Expected `)` before end of input for arguments".to_string(),
                            Vec::new(),
                        ))
                    }
                };
            } else {
                defaults.push(None);
            }

            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::GroupEnd => break,
                _ => return Err(self.unexpected(token)),
            }
        }

        Ok((arguments, defaults))
    }

    /// Parse the instruction list of a method and build its overload set.
    ///
    /// Every defaulted argument contributes an additional overload whose
    /// body forwards to the overload with one more parameter supplied, from
    /// right to left.
    fn parse_method_body(
        &mut self,
        ir: &mut Ir,
        name: &str,
        arguments: Vec<NodeId>,
        defaults: Vec<Option<NodeId>>,
        return_type: Option<NodeId>,
        mut tokens: Vec<Token>,
    ) -> CompileResult<NodeId> {
        let instructions = self.parse_block(ir, &mut tokens, "method")?;

        // Defaults must form a trailing contiguous suffix.
        let first_default = defaults.iter().position(|value| value.is_some());
        if let Some(first_default) = first_default {
            if let Some(gap) = defaults[first_default..].iter().position(|v| v.is_none()) {
                let offender = arguments[first_default + gap];
                return Err(CompileError::new(
                    ErrorKind::SyntaxError,
                    "Cannot have non-defaulted arguments after defaulted ones".to_string(),
                    ir.tokens(offender),
                ));
            }
        }

        let full = ir.new_function(
            "",
            arguments.clone(),
            instructions,
            return_type,
            tokens.clone(),
        );
        let mut overloads = vec![full];
        let mut previous = full;

        for index in (0..arguments.len()).rev() {
            let default = match defaults[index] {
                Some(default) => default,
                None => break,
            };

            let copied: Vec<NodeId> = arguments[..index]
                .iter()
                .map(|&argument| ir.copy_node(argument))
                .collect();

            let mut call_arguments = copied.clone();
            call_arguments.push(default);
            let forward = ir.push(
                Vec::new(),
                NodeKind::Call(Call {
                    called: previous,
                    arguments: call_arguments,
                    return_type: None,
                    function: None,
                }),
            );

            let overload = ir.new_function("", copied, vec![forward], return_type, tokens.clone());
            overloads.push(overload);
            previous = overload;
        }

        Ok(ir.new_method(name, overloads, tokens))
    }

    /// Parse a class: attribute declarations, methods and at most one
    /// constructor group.
    pub(crate) fn parse_class(&mut self, ir: &mut Ir) -> CompileResult<NodeId> {
        let mut tokens = vec![self.expect(TokenKind::Class)?];
        let name_token = self.expect(TokenKind::Identifier)?;
        let name = name_token.text().to_string();
        tokens.push(name_token);

        let mut constructor: Option<NodeId> = None;
        let mut attributes = Vec::new();

        loop {
            let token = match self.strip_newlines()? {
                None => {
                    return Err(CompileError::new(
                        ErrorKind::SyntaxError,
                        "Expected `end` before end of input for class".to_string(),
                        tokens,
                    ))
                }
                Some(token) => token,
            };

            match token.kind {
                TokenKind::End => {
                    tokens.push(self.expect(TokenKind::End)?);
                    break;
                }
                TokenKind::Def => attributes.push(self.parse_method(ir)?),
                TokenKind::New => {
                    let group = self.parse_constructor(ir)?;
                    match constructor {
                        Some(existing) => ir.method_assimilate(existing, group),
                        None => constructor = Some(group),
                    }
                }
                TokenKind::Identifier => attributes.push(self.parse_variable(ir)?),
                _ => return Err(self.unexpected(token)),
            }
        }

        ir.new_class(&name, constructor, attributes, tokens)
    }
}
