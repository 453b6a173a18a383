//! Compiler front-end for the Brook programming language.
//!
//! Brook is a small imperative, statically typed, object oriented language.
//! This crate ingests Brook source text and produces a fully resolved, type
//! checked intermediate representation suitable for lowering to a code
//! generator backend.
//!
//! # Overview
//!
//! The front-end is a strict pipeline of three subsystems:
//!
//! 1. A table driven **lexer** ([lexer]) implemented as a nondeterministic
//!    finite automaton over characters. The automaton is built once and
//!    shared; keywords, operators, strings and numbers are all encoded as
//!    sub-automata of a single tree.
//! 2. A recursive descent **parser** ([parser]) with precedence climbing
//!    expression parsing. The parser emits an untyped [ir] tree where binary
//!    and unary operators are modeled as method calls on their left operand.
//! 3. A semantic **verifier** ([verify]) which performs name resolution,
//!    type inference, overload resolution and a limited form of generic
//!    specialization through dependent types.
//!
//! # Example
//!
//! ```
//! use brook::{compile_unit, Code};
//!
//! let code = Code::from("import io\nio.print(`Hello`)\n");
//! let (ir, module) = compile_unit(&code).unwrap();
//! assert_eq!(ir.name(module), Some("main"));
//! ```
//!
//! Verification mutates the tree in place; after [compile_unit] returns, the
//! tree is immutable for the backend, which consumes it through
//! [Ir::resolve_type](ir::Ir::resolve_type), [Ir::resolve_value](ir::Ir::resolve_value)
//! and the context accessors.

mod code;
mod error;
mod logger;
mod position;
mod token;

pub mod builtins;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod types;
pub mod verify;

use once_cell::unsync::OnceCell;

pub use ir::{Ir, NodeId};

/// The line and column information at a code point.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A wrapper for the source text to be compiled, with lines information.
pub struct Code<'c> {
    pub value: &'c [u8],
    line_starts: OnceCell<Vec<usize>>,
}

/// A enum structure to assign multiple level debugging to the front-end
/// subsystems.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}

/// The closed set of token kinds produced by the lexer.
///
/// Every kind except [Newline](TokenKind::Newline), [Identifier](TokenKind::Identifier)
/// and the literal kinds has a fixed surface [spelling](TokenKind::spelling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Newline,

    Identifier,

    Const,
    Ref,
    Def,
    End,
    Return,
    Class,
    New,
    As,
    Module,
    Loop,
    While,
    For,
    In,
    Break,
    SelfKw,
    If,
    Elif,
    Else,
    Import,
    Pragma,
    True,
    False,

    /// Raw, backtick delimited string literal.
    String,
    /// Double quoted string literal with escape processing.
    FormatString,
    Integer,

    GroupStart,
    GroupEnd,
    Typeof,
    Returns,
    Comma,
    Assign,
    Dot,

    Add,
    Sub,
    Mul,
    FloorDiv,
    Div,
    Mod,
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
    Not,
    And,
    Or,
    FatArrow,
}

/// Element of the tokenized data.
///
/// `start..end` is the half open byte range of the lexeme in the source.
/// `data` carries the raw lexeme, or the decoded payload for string kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub data: Option<std::string::String>,
}

/// Classification of a structured front-end failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No lexer transition applies at the failure position.
    UnexpectedCharacter,
    /// Unexpected token or unterminated form.
    SyntaxError,
    /// A name was not found in the scope chain.
    MissingReference,
    /// A name matched more than one declaration in the scope chain.
    AmbiguousReference,
    /// Incompatibility at an assignment, return or call.
    TypeError,
    /// More than one overload is compatible with a call.
    AmbiguousOverload,
    /// Flow sensitive rule violation.
    SemanticError,
    /// Reserved for impossible states.
    InternalError,
}

/// One contextual frame of a [CompileError]: a message and the token ranges
/// it refers to.
#[derive(Debug, Clone)]
pub struct ErrorFrame {
    pub message: std::string::String,
    pub tokens: Vec<Token>,
}

/// A structured diagnostic raised by the lexer, parser or verifier.
///
/// Errors accumulate contextual frames while they propagate: the first frame
/// is the originating cause, later frames describe the enclosing constructs.
/// No error is recovered locally; the first failure aborts the affected
/// compilation unit.
#[derive(Debug, Clone)]
pub struct CompileError {
    kind: ErrorKind,
    frames: Vec<ErrorFrame>,
}

/// Result alias used across the front-end.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Lex, parse and verify a compilation unit against the [builtins] module.
///
/// Returns the IR arena together with the id of the verified root module.
pub fn compile_unit(code: &Code) -> CompileResult<(Ir, NodeId)> {
    let mut ir = Ir::new();
    let builtin = builtins::install(&mut ir);
    let module = parser::Parser::new(lexer::Lexer::new(code)).parse_unit(&mut ir)?;
    verify::Verifier::new(&mut ir, builtin).verify_module(module)?;
    Ok((ir, module))
}
