//! The semantic verifier.
//!
//! Verification is a single depth first pass over a module: name
//! resolution, type inference, overload resolution and dependent type
//! specialization all happen in this pass, annotating the IR in place.
//!
//! All verifier state is owned by [Verifier]: a stack of *hard scopes*
//! (module, class, method, function) driving name resolution, and a stack
//! of *soft frames* (loop, branch) driving flow analysis. Verifying
//! multiple units in parallel just means instantiating independent
//! verifiers.
//!
//! # Example
//!
//! ```
//! use brook::{builtins, ir::Ir, lexer::Lexer, parser::Parser, verify::Verifier, Code};
//!
//! let code = Code::from("import io\nio.print(`Hello`)\n");
//! let mut ir = Ir::new();
//! let builtin = builtins::install(&mut ir);
//! let module = Parser::new(Lexer::new(&code)).parse_unit(&mut ir).unwrap();
//! Verifier::new(&mut ir, builtin).verify_module(module).unwrap();
//! ```

mod call;
mod nodes;

#[cfg(test)]
mod __tests__;

use crate::ir::{Ir, NodeId, NodeKind};
use crate::{CompileError, CompileResult, ErrorKind, Log};

/// The verifier over one IR arena.
pub struct Verifier<'i> {
    ir: &'i mut Ir,
    builtins: NodeId,
    scopes: Vec<NodeId>,
    frames: Vec<Frame>,
    specializations: usize,
    log: Log<&'static str>,
}

/// One soft scope frame. The base frame of every hard scope carries the
/// `definitely_returns` flag checked by return path analysis.
struct Frame {
    kind: FrameKind,
    node: Option<NodeId>,
    definitely_returns: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Base,
    Loop,
    Branch,
}

impl Frame {
    fn new(kind: FrameKind, node: Option<NodeId>) -> Self {
        Self {
            kind,
            node,
            definitely_returns: false,
        }
    }
}

impl<'i> Verifier<'i> {
    pub fn new(ir: &'i mut Ir, builtins: NodeId) -> Self {
        Self {
            ir,
            builtins,
            scopes: Vec::new(),
            frames: Vec::new(),
            specializations: 0,
            log: Log::None,
        }
    }

    /// Set a log label to debug the verification pass.
    pub fn set_log(&mut self, log: Log<&'static str>) {
        self.log = log;
    }

    /// Verify a module against the builtins. Idempotent.
    pub fn verify_module(&mut self, module: NodeId) -> CompileResult<()> {
        match self.ir.kind(module) {
            NodeKind::Module(_) => self.verify(module),
            _ => Err(CompileError::internal("Verification starts at a module")),
        }
    }

    pub(crate) fn current_scope(&self) -> NodeId {
        match self.scopes.last() {
            Some(&scope) => scope,
            None => self.builtins,
        }
    }

    /// Run `body` inside a hard scope: the soft frame stack is swapped out
    /// and restored on every exit path.
    fn scoped<T>(
        &mut self,
        scope: NodeId,
        body: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.trace("enter scope", Some(scope));
        let saved = std::mem::take(&mut self.frames);
        self.frames.push(Frame::new(FrameKind::Base, Some(scope)));
        self.scopes.push(scope);

        let result = body(self);

        self.scopes.pop();
        self.frames = saved;
        self.trace("leave scope", Some(scope));
        result
    }

    /// Run `body` inside a soft frame; yields the body result together with
    /// the frame's `definitely_returns` flag.
    fn soft_scoped<T>(
        &mut self,
        kind: FrameKind,
        node: Option<NodeId>,
        body: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<(T, bool)> {
        self.frames.push(Frame::new(kind, node));
        let result = body(self);
        let returns = self
            .frames
            .pop()
            .map_or(false, |frame| frame.definitely_returns);
        result.map(|value| (value, returns))
    }

    /// Record that the current frame definitely returns.
    fn mark_returns(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.definitely_returns = true;
        }
    }

    fn base_frame_returns(&self) -> bool {
        self.frames
            .first()
            .map_or(false, |frame| frame.definitely_returns)
    }

    /// The nearest enclosing loop of the current function, if any.
    fn nearest_loop(&self) -> Option<NodeId> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.kind == FrameKind::Loop)
            .and_then(|frame| frame.node)
    }

    /// Whether the current hard scope is a dependent function, which
    /// relaxes overload ambiguity until specialization.
    pub(crate) fn scope_is_dependent(&self) -> bool {
        match self.scopes.last() {
            Some(&scope) => {
                matches!(self.ir.kind(scope), NodeKind::Function(f) if f.dependent)
            }
            None => false,
        }
    }

    pub(crate) fn bool_class(&self) -> CompileResult<NodeId> {
        self.ir
            .local_context(self.builtins)
            .and_then(|context| context.get("Bool"))
            .ok_or_else(|| CompileError::internal("Builtins do not define Bool"))
    }

    pub(crate) fn type_error(&self, message: String, tokens: Vec<crate::Token>) -> CompileError {
        CompileError::new(ErrorKind::TypeError, message, tokens)
    }

    pub(crate) fn semantic_error(
        &self,
        message: String,
        tokens: Vec<crate::Token>,
    ) -> CompileError {
        CompileError::new(ErrorKind::SemanticError, message, tokens)
    }

    fn trace(&self, _message: &str, _node: Option<NodeId>) {
        #[cfg(debug_assertions)]
        if self.log.order() >= Log::Verbose(()).order() {
            match _node {
                Some(node) => println!(
                    "[{}; Verifier]: {} {} {}",
                    self.log,
                    _message,
                    self.ir.kind(node).label(),
                    self.ir.name(node).unwrap_or("")
                ),
                None => println!("[{}; Verifier]: {}", self.log, _message),
            }
        }
    }
}
