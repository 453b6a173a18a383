//! A table driven lexer for Brook source text.
//!
//! The lexer is a nondeterministic finite automaton over characters. The
//! automaton is a tree of [LexNode]s built once (on first use) and shared by
//! every [Lexer]: whitespace loops on the root, the newline and comment
//! handling, both string forms, every operator, punctuation and keyword
//! spelling, identifiers and integer literals are all encoded as
//! sub-automata of the same tree.
//!
//! Execution keeps a *set* of live states. For every incoming character the
//! successor set is the union of the matching edges of each live state.
//! When the successor set becomes empty the accumulated lexeme is emitted
//! from the live set (preferring the earliest installed terminal, which
//! makes keywords win over identifiers) and the character is retried for the
//! next token. When the successor set collapses back to the root, the
//! boundary lay before the current character and accumulation restarts.
//!
//! # Example
//!
//! ```
//! use brook::{lexer, Code, TokenKind};
//!
//! let code = Code::from("count = count + 1\n");
//! let tokens = lexer::tokenize(&code).unwrap();
//! let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::Identifier,
//!         TokenKind::Assign,
//!         TokenKind::Identifier,
//!         TokenKind::Add,
//!         TokenKind::Integer,
//!         TokenKind::Newline,
//!     ]
//! );
//! ```

mod scan;
mod tree;

#[cfg(test)]
mod __tests__;

use crate::{Code, TokenKind};
use once_cell::sync::Lazy;
use std::str::CharIndices;

pub use scan::tokenize;

/// Index of the root node of the [LexTree].
pub const ROOT: usize = 0;

/// A single character predicate labeling an automaton edge.
///
/// Predicates are evaluated against `Option<char>`; `None` stands for the
/// end of input, which only [NewlineOrEnd](Pred::NewlineOrEnd) accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pred {
    /// Space or horizontal tab.
    Whitespace,
    /// Exactly the given character.
    Char(char),
    /// Any character except the given one.
    NotChar(char),
    /// Any character not contained in the given set.
    NoneOf(&'static [char]),
    /// A line feed, or the end of input.
    NewlineOrEnd,
    /// `[A-Za-z_]`
    WordStart,
    /// `[A-Za-z0-9_]`
    WordContinue,
    /// `[0-9]`
    Digit,
    /// Any character.
    Any,
}

/// A post processing step applied to the lexeme of a terminal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Post {
    /// Strip the single delimiter character from both ends of the lexeme.
    TrimDelimiters,
}

/// One state of the lexer automaton.
#[derive(Debug, Default)]
pub struct LexNode {
    links: Vec<(usize, Pred)>,
    token: Option<TokenKind>,
    post: Option<Post>,
}

/// The complete lexer automaton, an arena of [LexNode]s rooted at [ROOT].
#[derive(Debug)]
pub struct LexTree {
    nodes: Vec<LexNode>,
}

/// The shared automaton, built once on first use.
static LEX_TREE: Lazy<LexTree> = Lazy::new(LexTree::build);

/// A character stream lexer over a [Code] unit.
///
/// [Lexer::lex] produces one token per call, `Ok(None)` at the end of the
/// input, or an `UnexpectedCharacter` error when no automaton transition
/// applies.
pub struct Lexer<'c> {
    text: &'c str,
    chars: CharIndices<'c>,
    current: Option<(usize, char)>,
    invalid_at: Option<usize>,
}

impl<'c> Lexer<'c> {
    pub fn new(code: &Code<'c>) -> Self {
        match std::str::from_utf8(code.value) {
            Ok(text) => {
                let mut chars = text.char_indices();
                let current = chars.next();
                Self {
                    text,
                    chars,
                    current,
                    invalid_at: None,
                }
            }
            Err(err) => Self {
                text: "",
                chars: "".char_indices(),
                current: None,
                invalid_at: Some(err.valid_up_to()),
            },
        }
    }
}
