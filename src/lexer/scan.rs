use super::{LexTree, Lexer, Post, LEX_TREE, ROOT};
use crate::{Code, CompileError, CompileResult, ErrorKind, Token};

/// Tokenize a whole unit, in strict source order.
pub fn tokenize(code: &Code) -> CompileResult<Vec<Token>> {
    let mut lexer = Lexer::new(code);
    let mut stream = Vec::new();
    while let Some(token) = lexer.lex()? {
        stream.push(token);
    }
    Ok(stream)
}

impl<'c> Lexer<'c> {
    /// Byte offset of the current (unconsumed) character.
    fn offset(&self) -> usize {
        match self.current {
            Some((index, _)) => index,
            None => self.text.len(),
        }
    }

    fn advance(&mut self) {
        self.current = self.chars.next();
    }

    /// Lex a single token.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub fn lex(&mut self) -> CompileResult<Option<Token>> {
        if let Some(pointer) = self.invalid_at {
            return Err(CompileError::new(
                ErrorKind::UnexpectedCharacter,
                format!("Source is not valid UTF-8 at byte {}", pointer),
                Vec::new(),
            ));
        }

        let tree: &LexTree = &LEX_TREE;
        let mut token_start = self.offset();
        let mut data = String::new();
        let mut current_nodes: Vec<usize> = vec![ROOT];

        loop {
            let c = self.current.map(|(_, ch)| ch);

            let mut next_nodes: Vec<usize> = Vec::new();
            for &node in &current_nodes {
                for (target, pred) in tree.links(node) {
                    if pred.matches(c) {
                        next_nodes.push(*target);
                    }
                }
            }

            // No transition applies: the token ends before this character.
            if next_nodes.is_empty() {
                return self.emit(tree, &current_nodes, token_start, data);
            }

            // Only the whitespace loop survived: the boundary lay before the
            // current character, restart accumulation behind it.
            let restart = next_nodes.len() == 1 && next_nodes[0] == ROOT;
            if !restart {
                if let Some(ch) = c {
                    data.push(ch);
                }
            }

            if self.current.is_none() {
                return self.emit(tree, &next_nodes, token_start, data);
            }
            self.advance();

            if restart {
                token_start = self.offset();
                data.clear();
            }
            current_nodes = next_nodes;
        }
    }

    fn emit(
        &self,
        tree: &LexTree,
        nodes: &[usize],
        start: usize,
        data: String,
    ) -> CompileResult<Option<Token>> {
        let end = self.offset();

        for &node in nodes {
            if let Some(kind) = tree.token(node) {
                let data = match tree.post(node) {
                    Some(Post::TrimDelimiters) => {
                        let mut inner = data.chars();
                        inner.next();
                        inner.next_back();
                        inner.as_str().to_string()
                    }
                    None => data,
                };
                return Ok(Some(Token::new(kind, start, end, Some(data))));
            }
        }

        match self.current {
            Some((pointer, c)) => Err(CompileError::new(
                ErrorKind::UnexpectedCharacter,
                format!("Unexpected character {:?} at byte {}", c, pointer),
                Vec::new(),
            )),
            None if nodes.contains(&ROOT) => Ok(None),
            None => Err(CompileError::new(
                ErrorKind::UnexpectedCharacter,
                format!("Unexpected end of input at byte {}", end),
                Vec::new(),
            )),
        }
    }
}
