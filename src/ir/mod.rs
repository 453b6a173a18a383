//! The intermediate representation of a Brook compilation unit.
//!
//! The IR is a tree (with up references) of nodes held in an arena: an [Ir]
//! owns a flat list of [Node]s and every edge is a [NodeId] index into it.
//! The arena layout keeps the naturally cyclic scope structure (a scope owns
//! its children, every bound child points back at its owning scope) in plain
//! owned data, and lets the verifier annotate nodes in place.
//!
//! Nodes fall into two kinds:
//!
//! - **values** (expression like) yield a type once resolved;
//! - **instructions** (statement like) yield no type.
//!
//! Every node carries the tokens it originates from for diagnostics. The
//! parser creates nodes unresolved; the verifier binds references, infers
//! types and selects overloads in place; afterwards the tree is immutable
//! for the backend.

mod access;
mod build;
mod context;
mod display;

use crate::Token;
use indexmap::IndexMap;

pub use display::{IrTree, SourceOf};

/// A handle to a node in an [Ir] arena.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// The arena holding every node of a compilation unit, builtins included.
pub struct Ir {
    nodes: Vec<Node>,
}

/// One IR node: its originating tokens, the scope that owns it (if it is
/// bound into a context) and its variant payload.
#[derive(Debug, Clone)]
pub struct Node {
    pub tokens: Vec<Token>,
    pub owner: Option<NodeId>,
    pub kind: NodeKind,
}

/// An ordered mapping from name to bound child, plus a back reference to
/// the owning scope.
///
/// Insertion order is semantically significant: overload numbering, child
/// traversal and overload resolution all follow declaration order.
#[derive(Debug, Clone)]
pub struct Context {
    pub scope: Option<NodeId>,
    children: IndexMap<String, NodeId>,
}

/// The closed set of node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Module(Module),
    ModuleType(ModuleType),
    Function(Function),
    ExternalFunction(ExternalFunction),
    FunctionType(FunctionType),
    Method(Method),
    Class(Class),
    DependentType(DependentType),
    Variable(Variable),
    Assignment(Assignment),
    Call(Call),
    Literal(Literal),
    Reference(Reference),
    Attribute(Attribute),
    Return(Return),
    Branch(Branch),
    Loop(Loop),
    Break(Break),
    Comment(Comment),
    Import(Import),
}

/// A namespace container scope.
///
/// The implicit compilation unit module is named `main`; its free standing
/// instructions live in the synthetic `main` function.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub context: Context,
    pub main: Option<NodeId>,
    pub ty: NodeId,
    pub verified: bool,
}

/// The type of a module value; compatible only with itself.
#[derive(Debug, Clone)]
pub struct ModuleType {
    pub module: NodeId,
}

/// Distinguishes plain functions from constructor functions.
///
/// A constructor is a function specialized to return its enclosing class;
/// it may not contain a return instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Constructor,
}

/// A basic container for instructions.
///
/// An argument declared without a type signature receives a fresh
/// [DependentType] and marks the function dependent; dependent functions
/// are specialized per call site.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
    pub arguments: Vec<NodeId>,
    pub instructions: Vec<NodeId>,
    pub local_context: Context,
    pub closed_context: Context,
    pub ty: NodeId,
    pub dependent: bool,
    /// Whether the source declared a return type, as opposed to one
    /// inferred from a return instruction.
    pub declared_return: bool,
    pub verified: bool,
    /// Specializations produced for this function, keyed by the concrete
    /// argument types of the call.
    pub specializations: Vec<(Vec<NodeId>, NodeId)>,
}

/// A function satisfied by the host linker.
///
/// Carries both the internal name used for lookup inside the IR and the
/// linkage name used at code generation time.
#[derive(Debug, Clone)]
pub struct ExternalFunction {
    pub name: String,
    pub external_name: String,
    pub ty: NodeId,
    pub verified: bool,
}

/// The type of a callable: argument types plus an optional return type.
///
/// A missing return type on the calling side acts as a wildcard, which is
/// what enables call site return type inference.
#[derive(Debug, Clone)]
pub struct FunctionType {
    pub arguments: Vec<NodeId>,
    pub return_type: Option<NodeId>,
    pub verified: bool,
}

/// A generic container for functions sharing a name; implements overloading.
///
/// Overloads are numbered `"0".."n-1"` in declaration order inside
/// `overload_context`.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub overload_context: Context,
    pub verified: bool,
}

/// A user defined type: an optional constructor group and an instance
/// attribute context.
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub constructor: Option<NodeId>,
    pub instance_context: Context,
    pub verified: bool,
}

/// A type placeholder resolved per call site.
///
/// While untargeted, every compatibility probe records the other type into
/// `compatibles` and succeeds; once `target` is assigned the placeholder
/// delegates to it.
#[derive(Debug, Clone, Default)]
pub struct DependentType {
    pub compatibles: Vec<NodeId>,
    pub target: Option<NodeId>,
}

/// A named container for a value, with an optional declared type.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub ty: Option<NodeId>,
    pub constant: bool,
}

/// Binds a value to a variable, declaring the variable on first use.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub variable: NodeId,
    pub value: NodeId,
}

/// Executes a callable with specific arguments.
///
/// `return_type` is the optional call site hint (set for casts); `function`
/// is the concrete callable chosen during verification.
#[derive(Debug, Clone)]
pub struct Call {
    pub called: NodeId,
    pub arguments: Vec<NodeId>,
    pub return_type: Option<NodeId>,
    pub function: Option<NodeId>,
}

/// A direct piece of constant data.
#[derive(Debug, Clone)]
pub struct Literal {
    pub value: LiteralValue,
    pub ty: NodeId,
}

/// The payload of a [Literal].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
}

/// A by-name link to an object in the current or parent scopes.
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    pub value: Option<NodeId>,
    pub verified: bool,
}

/// A member access on a value, resolved through the value's instance and
/// global contexts.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub value: NodeId,
    pub name: String,
    pub attribute: Option<NodeId>,
    pub verified: bool,
}

/// Returns from the enclosing function with an optional value.
#[derive(Debug, Clone)]
pub struct Return {
    pub value: Option<NodeId>,
    pub function: Option<NodeId>,
}

/// A two way conditional.
#[derive(Debug, Clone)]
pub struct Branch {
    pub condition: NodeId,
    pub on_true: Vec<NodeId>,
    pub on_false: Vec<NodeId>,
}

/// An unconditional loop, exited through [Break].
#[derive(Debug, Clone)]
pub struct Loop {
    pub instructions: Vec<NodeId>,
    pub function: Option<NodeId>,
}

/// Exits the nearest enclosing loop of the same function.
#[derive(Debug, Clone, Default)]
pub struct Break {
    pub target: Option<NodeId>,
}

/// An inert piece of metadata.
#[derive(Debug, Clone)]
pub struct Comment {
    pub text: String,
}

/// An import line: path segments (leading `"."` segments for relative
/// paths) and an optional alias.
#[derive(Debug, Clone)]
pub struct Import {
    pub path: Vec<String>,
    pub alias: Option<String>,
}

impl NodeKind {
    /// A short label naming the variant, for diagnostics and tree printing.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Module(_) => "Module",
            NodeKind::ModuleType(_) => "ModuleType",
            NodeKind::Function(_) => "Function",
            NodeKind::ExternalFunction(_) => "ExternalFunction",
            NodeKind::FunctionType(_) => "FunctionType",
            NodeKind::Method(_) => "Method",
            NodeKind::Class(_) => "Class",
            NodeKind::DependentType(_) => "DependentType",
            NodeKind::Variable(_) => "Variable",
            NodeKind::Assignment(_) => "Assignment",
            NodeKind::Call(_) => "Call",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Reference(_) => "Reference",
            NodeKind::Attribute(_) => "Attribute",
            NodeKind::Return(_) => "Return",
            NodeKind::Branch(_) => "Branch",
            NodeKind::Loop(_) => "Loop",
            NodeKind::Break(_) => "Break",
            NodeKind::Comment(_) => "Comment",
            NodeKind::Import(_) => "Import",
        }
    }
}
