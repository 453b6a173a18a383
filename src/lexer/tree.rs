use super::{LexNode, LexTree, Post, Pred, ROOT};
use crate::TokenKind;

/// Literal spellings installed as linear chains of the automaton.
///
/// Entries sharing a prefix must be ordered longest first so that the longer
/// chain outlives the shorter one in the live state set.
const DIRECT_MAP: &[(&str, TokenKind)] = &[
    // Operators
    ("+", TokenKind::Add),
    ("-", TokenKind::Sub),
    ("*", TokenKind::Mul),
    ("//", TokenKind::FloorDiv),
    ("/", TokenKind::Div),
    ("%", TokenKind::Mod),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::Ne),
    ("<=", TokenKind::Le),
    ("<", TokenKind::Lt),
    (">=", TokenKind::Ge),
    (">", TokenKind::Gt),
    ("!", TokenKind::Not),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("=>", TokenKind::FatArrow),
    // Punctuation
    ("(", TokenKind::GroupStart),
    (")", TokenKind::GroupEnd),
    (":", TokenKind::Typeof),
    ("->", TokenKind::Returns),
    (",", TokenKind::Comma),
    ("=", TokenKind::Assign),
    (".", TokenKind::Dot),
    // Keywords
    ("const", TokenKind::Const),
    ("ref", TokenKind::Ref),
    ("def", TokenKind::Def),
    ("end", TokenKind::End),
    ("return", TokenKind::Return),
    ("class", TokenKind::Class),
    ("new", TokenKind::New),
    ("as", TokenKind::As),
    ("module", TokenKind::Module),
    ("loop", TokenKind::Loop),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("break", TokenKind::Break),
    ("self", TokenKind::SelfKw),
    ("elif", TokenKind::Elif),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("import", TokenKind::Import),
    ("pragma", TokenKind::Pragma),
    // Constants
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

impl LexNode {
    fn new() -> Self {
        Self::default()
    }
}

impl LexTree {
    pub(super) fn links(&self, index: usize) -> &[(usize, Pred)] {
        &self.nodes[index].links
    }

    pub(super) fn token(&self, index: usize) -> Option<TokenKind> {
        self.nodes[index].token
    }

    pub(super) fn post(&self, index: usize) -> Option<Post> {
        self.nodes[index].post
    }

    fn push(&mut self) -> usize {
        self.nodes.push(LexNode::new());
        self.nodes.len() - 1
    }

    fn link(&mut self, from: usize, to: usize, pred: Pred) {
        self.nodes[from].links.push((to, pred));
    }

    fn terminal(&mut self, index: usize, token: TokenKind) {
        self.nodes[index].token = Some(token);
    }

    /// Build the complete automaton.
    ///
    /// Installation order is significant: token emission scans the live set
    /// in installation order, so keyword chains must be installed before the
    /// identifier sub-automaton for the keyword kind to win the tie.
    pub(super) fn build() -> Self {
        let mut tree = LexTree {
            nodes: vec![LexNode::new()],
        };

        // Whitespace loops on the root, collapsing the live set back to it.
        tree.link(ROOT, ROOT, Pred::Whitespace);

        // Newlines
        let newline = tree.push();
        tree.terminal(newline, TokenKind::Newline);
        tree.link(ROOT, newline, Pred::Char('\n'));

        // Comments run to the end of the line and terminate as a newline.
        let comment = tree.push();
        tree.link(ROOT, comment, Pred::Char('#'));
        tree.link(comment, comment, Pred::NotChar('\n'));
        tree.link(comment, newline, Pred::NewlineOrEnd);

        // Format strings: double quoted, with a backslash escape branch.
        let body = tree.push();
        tree.link(ROOT, body, Pred::Char('"'));
        tree.link(body, body, Pred::NoneOf(&['"', '\\']));
        let escape = tree.push();
        tree.link(body, escape, Pred::Char('\\'));
        tree.link(escape, body, Pred::Any);
        let close = tree.push();
        tree.terminal(close, TokenKind::FormatString);
        tree.nodes[close].post = Some(Post::TrimDelimiters);
        tree.link(body, close, Pred::Char('"'));

        // Raw strings: backtick delimited, taken verbatim.
        let body = tree.push();
        tree.link(ROOT, body, Pred::Char('`'));
        tree.link(body, body, Pred::NotChar('`'));
        let close = tree.push();
        tree.terminal(close, TokenKind::String);
        tree.nodes[close].post = Some(Post::TrimDelimiters);
        tree.link(body, close, Pred::Char('`'));

        // Direct map: each spelling becomes its own chain from the root.
        for (value, token) in DIRECT_MAP {
            let mut node = ROOT;
            for ch in value.chars() {
                let next = tree.push();
                tree.link(node, next, Pred::Char(ch));
                node = next;
            }
            tree.terminal(node, *token);
        }

        // Identifiers
        let head = tree.push();
        tree.terminal(head, TokenKind::Identifier);
        tree.link(ROOT, head, Pred::WordStart);
        let tail = tree.push();
        tree.terminal(tail, TokenKind::Identifier);
        tree.link(head, tail, Pred::WordContinue);
        tree.link(tail, tail, Pred::WordContinue);

        // Integers, with underscore digit separators. An underscore must be
        // both preceded and followed by a digit: the underscore node carries
        // no token, so a trailing underscore fails to lex.
        let head = tree.push();
        tree.terminal(head, TokenKind::Integer);
        tree.link(ROOT, head, Pred::Digit);
        let underscore = tree.push();
        let tail = tree.push();
        tree.terminal(tail, TokenKind::Integer);
        tree.link(head, underscore, Pred::Char('_'));
        tree.link(head, tail, Pred::Digit);
        tree.link(underscore, tail, Pred::Digit);
        tree.link(tail, underscore, Pred::Char('_'));
        tree.link(tail, tail, Pred::Digit);

        tree
    }
}

impl Pred {
    /// Whether the predicate accepts the character; `None` is end of input.
    pub fn matches(&self, c: Option<char>) -> bool {
        match (self, c) {
            (Pred::NewlineOrEnd, None) => true,
            (_, None) => false,
            (Pred::Whitespace, Some(c)) => c == ' ' || c == '\t',
            (Pred::Char(expected), Some(c)) => c == *expected,
            (Pred::NotChar(excluded), Some(c)) => c != *excluded,
            (Pred::NoneOf(excluded), Some(c)) => !excluded.contains(&c),
            (Pred::NewlineOrEnd, Some(c)) => c == '\n',
            (Pred::WordStart, Some(c)) => c.is_ascii_alphabetic() || c == '_',
            (Pred::WordContinue, Some(c)) => c.is_ascii_alphanumeric() || c == '_',
            (Pred::Digit, Some(c)) => c.is_ascii_digit(),
            (Pred::Any, Some(_)) => true,
        }
    }
}
