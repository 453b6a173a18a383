use super::{Context, Ir, Node, NodeId, NodeKind};
use crate::{CompileError, CompileResult};

impl Ir {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn tokens(&self, id: NodeId) -> Vec<crate::Token> {
        self.nodes[id.0].tokens.clone()
    }

    /// The name of a bound object, if the variant carries one.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Module(m) => Some(&m.name),
            NodeKind::Function(f) => Some(&f.name),
            NodeKind::ExternalFunction(f) => Some(&f.name),
            NodeKind::Method(m) => Some(&m.name),
            NodeKind::Class(c) => Some(&c.name),
            NodeKind::Variable(v) => Some(&v.name),
            NodeKind::Reference(r) => Some(&r.name),
            _ => None,
        }
    }

    /// The scope which owns the node through one of its contexts.
    pub fn owner(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].owner
    }

    pub fn set_owner(&mut self, id: NodeId, owner: NodeId) {
        self.nodes[id.0].owner = Some(owner);
    }

    /// The lexically declared names of a scope.
    pub fn local_context(&self, id: NodeId) -> Option<&Context> {
        match self.kind(id) {
            NodeKind::Module(m) => Some(&m.context),
            NodeKind::Function(f) => Some(&f.local_context),
            NodeKind::Method(m) => Some(&m.overload_context),
            NodeKind::Class(c) => Some(&c.instance_context),
            _ => None,
        }
    }

    /// The closed over names of a scope (`self` inside methods).
    pub fn closed_context(&self, id: NodeId) -> Option<&Context> {
        match self.kind(id) {
            NodeKind::Function(f) => Some(&f.closed_context),
            _ => None,
        }
    }

    /// The context accessible from the value itself in attribute position.
    pub fn global_context(&self, id: NodeId) -> Option<&Context> {
        match self.kind(self.resolve_value(id)) {
            NodeKind::Module(m) => Some(&m.context),
            _ => None,
        }
    }

    /// The context reachable through an instance of the (type) node.
    pub fn instance_context(&self, id: NodeId) -> Option<&Context> {
        match self.kind(self.resolve_value(id)) {
            NodeKind::Class(c) => Some(&c.instance_context),
            _ => None,
        }
    }

    /// Follow references and attributes to the ultimate resolved node.
    ///
    /// Unresolved links resolve to themselves; after verification every
    /// link is bound.
    pub fn resolve_value(&self, id: NodeId) -> NodeId {
        match self.kind(id) {
            NodeKind::Reference(r) => match r.value {
                Some(value) => self.resolve_value(value),
                None => id,
            },
            NodeKind::Attribute(a) => match a.attribute {
                Some(attribute) => self.resolve_value(attribute),
                None => id,
            },
            _ => id,
        }
    }

    /// The type of a value node; instructions yield `None`.
    pub fn resolve_type(&self, id: NodeId) -> CompileResult<Option<NodeId>> {
        match self.kind(id) {
            NodeKind::Module(m) => Ok(Some(m.ty)),
            NodeKind::Function(f) => Ok(Some(f.ty)),
            NodeKind::ExternalFunction(f) => Ok(Some(f.ty)),
            NodeKind::Variable(v) => Ok(v.ty),
            NodeKind::Literal(l) => Ok(Some(l.ty)),
            NodeKind::Call(c) => {
                if let Some(hint) = c.return_type {
                    return Ok(Some(hint));
                }
                match c.function {
                    Some(function) => match self.resolve_type(function)? {
                        Some(fn_ty) => match self.kind(fn_ty) {
                            NodeKind::FunctionType(ft) => Ok(ft.return_type),
                            _ => Err(CompileError::internal("Callable without function type")),
                        },
                        None => Err(CompileError::internal("Callable without a type")),
                    },
                    None => Err(CompileError::internal(
                        "Call type requested before resolution",
                    )),
                }
            }
            NodeKind::Reference(r) => match r.value {
                Some(value) => self.resolve_type(value),
                None => Err(CompileError::internal(
                    "Reference type requested before resolution",
                )),
            },
            NodeKind::Attribute(a) => match a.attribute {
                Some(attribute) => self.resolve_type(attribute),
                None => Err(CompileError::internal(
                    "Attribute type requested before resolution",
                )),
            },
            NodeKind::Return(_)
            | NodeKind::Branch(_)
            | NodeKind::Loop(_)
            | NodeKind::Break(_)
            | NodeKind::Comment(_)
            | NodeKind::Import(_) => Ok(None),
            NodeKind::Assignment(_) => {
                Err(CompileError::internal("Assignments do not have types"))
            }
            NodeKind::Method(_)
            | NodeKind::Class(_)
            | NodeKind::ModuleType(_)
            | NodeKind::FunctionType(_)
            | NodeKind::DependentType(_) => Err(CompileError::internal(
                "Type of type entities is not implemented",
            )),
        }
    }

    /// Bind `child` into the local context of `scope` under its own name.
    pub fn add_local_child(&mut self, scope: NodeId, child: NodeId) {
        let name = self.name(child).unwrap_or_default().to_string();
        self.add_local_child_named(scope, name, child);
    }

    /// Bind `child` into the local context of `scope` under `name`, making
    /// `scope` its owner.
    pub fn add_local_child_named(&mut self, scope: NodeId, name: String, child: NodeId) {
        self.set_owner(child, scope);
        match &mut self.nodes[scope.0].kind {
            NodeKind::Module(m) => m.context.insert(name, child),
            NodeKind::Function(f) => f.local_context.insert(name, child),
            NodeKind::Method(m) => m.overload_context.insert(name, child),
            NodeKind::Class(c) => c.instance_context.insert(name, child),
            _ => {}
        }
    }

    /// Bind an additional name for an existing node without transferring
    /// ownership (import aliases).
    pub fn bind_alias(&mut self, scope: NodeId, name: String, target: NodeId) {
        match &mut self.nodes[scope.0].kind {
            NodeKind::Module(m) => m.context.insert(name, target),
            NodeKind::Function(f) => f.local_context.insert(name, target),
            NodeKind::Method(m) => m.overload_context.insert(name, target),
            NodeKind::Class(c) => c.instance_context.insert(name, target),
            _ => {}
        }
    }
}

impl Default for Ir {
    fn default() -> Self {
        Self::new()
    }
}
