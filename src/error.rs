use crate::{Code, CompileError, ErrorFrame, ErrorKind, Token};
use std::fmt::{Display, Formatter, Write};

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::UnexpectedCharacter => "UnexpectedCharacter",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::MissingReference => "MissingReference",
            ErrorKind::AmbiguousReference => "AmbiguousReference",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::AmbiguousOverload => "AmbiguousOverload",
            ErrorKind::SemanticError => "SemanticError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: String, tokens: Vec<Token>) -> Self {
        Self {
            kind,
            frames: vec![ErrorFrame { message, tokens }],
        }
    }

    pub fn internal(message: &str) -> Self {
        Self::new(ErrorKind::InternalError, message.to_string(), Vec::new())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn frames(&self) -> &[ErrorFrame] {
        &self.frames
    }

    /// Push an outer contextual frame while the error propagates.
    pub fn add(mut self, message: String, tokens: Vec<Token>) -> Self {
        self.frames.push(ErrorFrame { message, tokens });
        self
    }

    /// The message of the originating frame.
    pub fn message(&self) -> &str {
        &self.frames[0].message
    }

    /// Render a user facing report with line and column positions and the
    /// offending source lines.
    pub fn format(&self, code: &Code) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", self.kind.label(), self.frames[0].message);
        for (index, frame) in self.frames.iter().enumerate() {
            if index > 0 && !frame.message.is_empty() {
                let _ = writeln!(out, "  in {}", frame.message);
            }
            for token in &frame.tokens {
                let _ = writeln!(out, "  @ {}", code.position_of(token));
                for line in code.annotate(token).lines() {
                    let _ = writeln!(out, "  | {}", line);
                }
            }
        }
        out
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.frames[0].message)?;
        for frame in self.frames.iter().skip(1) {
            if !frame.message.is_empty() {
                write!(f, "\n  in {}", frame.message)?;
            }
        }
        Ok(())
    }
}
