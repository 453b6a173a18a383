use super::{
    Class, Context, DependentType, ExternalFunction, Function, FunctionKind, FunctionType, Ir,
    Method, Module, ModuleType, Node, NodeId, NodeKind, Variable,
};
use crate::{CompileError, CompileResult, ErrorKind, Token};
use std::collections::HashMap;

impl Ir {
    /// Append a node and return its handle.
    pub fn push(&mut self, tokens: Vec<Token>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tokens,
            owner: None,
            kind,
        });
        id
    }

    /// Create an empty module together with its [ModuleType].
    pub fn new_module(&mut self, name: &str, tokens: Vec<Token>) -> NodeId {
        let ty = self.push(
            Vec::new(),
            NodeKind::ModuleType(ModuleType { module: NodeId(0) }),
        );
        let module = self.push(
            tokens,
            NodeKind::Module(Module {
                name: name.to_string(),
                context: Context::new(None),
                main: None,
                ty,
                verified: false,
            }),
        );
        if let NodeKind::ModuleType(module_type) = &mut self.nodes[ty.0].kind {
            module_type.module = module;
        }
        if let NodeKind::Module(m) = &mut self.nodes[module.0].kind {
            m.context.scope = Some(module);
        }
        module
    }

    /// Attach the synthetic `main` function holding a module's free
    /// standing instructions.
    pub fn module_set_main(&mut self, module: NodeId, main: NodeId) {
        self.set_owner(main, module);
        if let NodeKind::Module(m) = &mut self.nodes[module.0].kind {
            m.main = Some(main);
        }
    }

    /// Add a declaration to a scope, assimilating methods of the same name
    /// into one overload set and overwriting anything else.
    pub fn scope_add_child(&mut self, scope: NodeId, child: NodeId) {
        let name = self.name(child).unwrap_or_default().to_string();
        let existing = self
            .local_context(scope)
            .and_then(|context| context.get(&name));

        if let Some(existing) = existing {
            let both_methods = matches!(self.kind(existing), NodeKind::Method(_))
                && matches!(self.kind(child), NodeKind::Method(_));
            if both_methods {
                self.method_assimilate(existing, child);
                return;
            }
        }
        self.add_local_child_named(scope, name, child);
    }

    /// Create a function.
    ///
    /// Arguments without a declared type receive a fresh [DependentType]
    /// and mark the function dependent.
    pub fn new_function(
        &mut self,
        name: &str,
        arguments: Vec<NodeId>,
        instructions: Vec<NodeId>,
        return_type: Option<NodeId>,
        tokens: Vec<Token>,
    ) -> NodeId {
        let mut dependent = false;
        let mut argument_types = Vec::with_capacity(arguments.len());
        for &argument in &arguments {
            let declared = match self.kind(argument) {
                NodeKind::Variable(v) => v.ty,
                _ => None,
            };
            let ty = match declared {
                Some(ty) => ty,
                None => {
                    let placeholder =
                        self.push(Vec::new(), NodeKind::DependentType(DependentType::default()));
                    if let NodeKind::Variable(v) = &mut self.nodes[argument.0].kind {
                        v.ty = Some(placeholder);
                    }
                    placeholder
                }
            };
            if matches!(self.kind(ty), NodeKind::DependentType(_)) {
                dependent = true;
            }
            argument_types.push(ty);
        }

        let declared_return = return_type.is_some();
        let ty = self.push(
            Vec::new(),
            NodeKind::FunctionType(FunctionType {
                arguments: argument_types,
                return_type,
                verified: false,
            }),
        );

        let function = self.push(
            tokens,
            NodeKind::Function(Function {
                name: name.to_string(),
                kind: FunctionKind::Function,
                arguments: arguments.clone(),
                instructions,
                local_context: Context::new(None),
                closed_context: Context::new(None),
                ty,
                dependent,
                declared_return,
                verified: false,
                specializations: Vec::new(),
            }),
        );
        if let NodeKind::Function(f) = &mut self.nodes[function.0].kind {
            f.local_context.scope = Some(function);
            f.closed_context.scope = Some(function);
        }
        for argument in arguments {
            self.add_local_child(function, argument);
        }
        function
    }

    /// Create an external function from its internal name, linkage name and
    /// signature.
    pub fn new_external_function(
        &mut self,
        name: &str,
        external_name: &str,
        arguments: Vec<NodeId>,
        return_type: Option<NodeId>,
    ) -> NodeId {
        let ty = self.push(
            Vec::new(),
            NodeKind::FunctionType(FunctionType {
                arguments,
                return_type,
                verified: false,
            }),
        );
        self.push(
            Vec::new(),
            NodeKind::ExternalFunction(ExternalFunction {
                name: name.to_string(),
                external_name: external_name.to_string(),
                ty,
                verified: false,
            }),
        )
    }

    /// Create a method from its ordered overloads.
    pub fn new_method(&mut self, name: &str, overloads: Vec<NodeId>, tokens: Vec<Token>) -> NodeId {
        let method = self.push(
            tokens,
            NodeKind::Method(Method {
                name: name.to_string(),
                overload_context: Context::new(None),
                verified: false,
            }),
        );
        if let NodeKind::Method(m) = &mut self.nodes[method.0].kind {
            m.overload_context.scope = Some(method);
        }
        for overload in overloads {
            self.method_add_overload(method, overload);
        }
        method
    }

    /// Append an overload, renaming it to its position in the set.
    pub fn method_add_overload(&mut self, method: NodeId, overload: NodeId) {
        let index = match self.kind(method) {
            NodeKind::Method(m) => m.overload_context.len(),
            _ => 0,
        };
        let name = index.to_string();
        match &mut self.nodes[overload.0].kind {
            NodeKind::Function(f) => f.name = name.clone(),
            NodeKind::ExternalFunction(f) => f.name = name.clone(),
            _ => {}
        }
        self.add_local_child_named(method, name, overload);
    }

    /// Merge the overload set of `other` into `method`.
    pub fn method_assimilate(&mut self, method: NodeId, other: NodeId) {
        let overloads = match self.kind(other) {
            NodeKind::Method(m) => m.overload_context.values(),
            _ => Vec::new(),
        };
        for overload in overloads {
            self.method_add_overload(method, overload);
        }
    }

    /// Create a class from its optional constructor group and attribute
    /// declarations.
    ///
    /// Constructor overloads are converted to constructor functions: their
    /// return type is forced to the class and `self` is closed over. Every
    /// method overload among the attributes also closes over `self`.
    pub fn new_class(
        &mut self,
        name: &str,
        constructor: Option<NodeId>,
        attributes: Vec<NodeId>,
        tokens: Vec<Token>,
    ) -> CompileResult<NodeId> {
        let class = self.push(
            tokens,
            NodeKind::Class(Class {
                name: name.to_string(),
                constructor: None,
                instance_context: Context::new(None),
                verified: false,
            }),
        );
        if let NodeKind::Class(c) = &mut self.nodes[class.0].kind {
            c.instance_context.scope = Some(class);
        }

        for attribute in attributes {
            self.scope_add_child(class, attribute);
        }
        let methods = match self.local_context(class) {
            Some(context) => context.values(),
            None => Vec::new(),
        };
        for child in methods {
            if let NodeKind::Method(m) = self.kind(child) {
                for overload in m.overload_context.values() {
                    self.close_over_self(overload, class);
                }
            }
        }

        if let Some(constructor) = constructor {
            let overloads = match self.kind(constructor) {
                NodeKind::Method(m) => m.overload_context.values(),
                _ => Vec::new(),
            };
            for overload in overloads {
                let (ty, tokens) = match self.kind(overload) {
                    NodeKind::Function(f) => (f.ty, self.tokens(overload)),
                    _ => continue,
                };
                let declared = match self.kind(ty) {
                    NodeKind::FunctionType(ft) => ft.return_type.is_some(),
                    _ => false,
                };
                if declared {
                    return Err(CompileError::new(
                        ErrorKind::TypeError,
                        "Constructors must return nothing".to_string(),
                        tokens,
                    ));
                }
                if let NodeKind::Function(f) = &mut self.nodes[overload.0].kind {
                    f.kind = FunctionKind::Constructor;
                }
                if let NodeKind::FunctionType(ft) = &mut self.nodes[ty.0].kind {
                    ft.return_type = Some(class);
                }
                self.close_over_self(overload, class);
            }
            self.set_owner(constructor, class);
            if let NodeKind::Class(c) = &mut self.nodes[class.0].kind {
                c.constructor = Some(constructor);
            }
        }

        Ok(class)
    }

    fn close_over_self(&mut self, function: NodeId, class: NodeId) {
        let variable = self.push(
            Vec::new(),
            NodeKind::Variable(Variable {
                name: "self".to_string(),
                ty: Some(class),
                constant: false,
            }),
        );
        self.set_owner(variable, function);
        if let NodeKind::Function(f) = &mut self.nodes[function.0].kind {
            f.closed_context.insert("self".to_string(), variable);
        }
    }

    /// An unverified deep copy of a node.
    ///
    /// Shared substructure stays shared in the copy: a dependent argument
    /// type that doubles as the return type is copied once, so retargeting
    /// the argument retargets the return as well. Modules, classes and
    /// external functions are reference-like and are never copied.
    pub fn copy_node(&mut self, id: NodeId) -> NodeId {
        let mut memo = HashMap::new();
        self.copy_with(id, &mut memo)
    }

    fn copy_with(&mut self, id: NodeId, memo: &mut HashMap<NodeId, NodeId>) -> NodeId {
        if let Some(&copied) = memo.get(&id) {
            return copied;
        }

        let tokens = self.tokens(id);
        let kind = self.kind(id).clone();
        let copied = match kind {
            NodeKind::Module(_)
            | NodeKind::Class(_)
            | NodeKind::ExternalFunction(_)
            | NodeKind::ModuleType(_) => return id,

            NodeKind::Function(mut f) => {
                f.arguments = self.copy_all(&f.arguments, memo);
                f.instructions = self.copy_all(&f.instructions, memo);
                f.ty = self.copy_with(f.ty, memo);
                f.local_context = self.copy_context(&f.local_context, memo);
                f.closed_context = self.copy_context(&f.closed_context, memo);
                f.verified = false;
                f.specializations = Vec::new();
                let copy = self.push(tokens, NodeKind::Function(f));
                self.rebind_function_contexts(copy);
                copy
            }
            NodeKind::FunctionType(mut ft) => {
                ft.arguments = self.copy_all(&ft.arguments, memo);
                ft.return_type = ft.return_type.map(|ty| self.copy_with(ty, memo));
                ft.verified = false;
                self.push(tokens, NodeKind::FunctionType(ft))
            }
            NodeKind::Method(m) => {
                let overloads: Vec<(String, NodeId)> = m
                    .overload_context
                    .iter()
                    .map(|(name, child)| (name.to_string(), child))
                    .collect();
                let copy = self.push(
                    tokens,
                    NodeKind::Method(Method {
                        name: m.name.clone(),
                        overload_context: Context::new(None),
                        verified: false,
                    }),
                );
                if let NodeKind::Method(m) = &mut self.nodes[copy.0].kind {
                    m.overload_context.scope = Some(copy);
                }
                for (name, overload) in overloads {
                    let overload = self.copy_with(overload, memo);
                    self.add_local_child_named(copy, name, overload);
                }
                copy
            }
            NodeKind::DependentType(d) => self.push(
                tokens,
                NodeKind::DependentType(DependentType {
                    compatibles: d.compatibles.clone(),
                    target: None,
                }),
            ),
            NodeKind::Variable(mut v) => {
                v.ty = v.ty.map(|ty| self.copy_with(ty, memo));
                self.push(tokens, NodeKind::Variable(v))
            }
            NodeKind::Assignment(mut a) => {
                a.variable = self.copy_with(a.variable, memo);
                a.value = self.copy_with(a.value, memo);
                self.push(tokens, NodeKind::Assignment(a))
            }
            NodeKind::Call(mut c) => {
                c.called = self.copy_with(c.called, memo);
                c.arguments = self.copy_all(&c.arguments, memo);
                c.return_type = c.return_type.map(|ty| self.copy_with(ty, memo));
                c.function = None;
                self.push(tokens, NodeKind::Call(c))
            }
            NodeKind::Literal(mut l) => {
                l.ty = self.copy_with(l.ty, memo);
                self.push(tokens, NodeKind::Literal(l))
            }
            NodeKind::Reference(mut r) => {
                r.value = None;
                r.verified = false;
                self.push(tokens, NodeKind::Reference(r))
            }
            NodeKind::Attribute(mut a) => {
                a.value = self.copy_with(a.value, memo);
                a.attribute = None;
                a.verified = false;
                self.push(tokens, NodeKind::Attribute(a))
            }
            NodeKind::Return(mut r) => {
                r.value = r.value.map(|value| self.copy_with(value, memo));
                r.function = None;
                self.push(tokens, NodeKind::Return(r))
            }
            NodeKind::Branch(mut b) => {
                b.condition = self.copy_with(b.condition, memo);
                b.on_true = self.copy_all(&b.on_true, memo);
                b.on_false = self.copy_all(&b.on_false, memo);
                self.push(tokens, NodeKind::Branch(b))
            }
            NodeKind::Loop(mut l) => {
                l.instructions = self.copy_all(&l.instructions, memo);
                l.function = None;
                self.push(tokens, NodeKind::Loop(l))
            }
            NodeKind::Break(_) => self.push(tokens, NodeKind::Break(Default::default())),
            NodeKind::Comment(c) => self.push(tokens, NodeKind::Comment(c)),
            NodeKind::Import(i) => self.push(tokens, NodeKind::Import(i)),
        };
        memo.insert(id, copied);
        copied
    }

    fn copy_all(&mut self, ids: &[NodeId], memo: &mut HashMap<NodeId, NodeId>) -> Vec<NodeId> {
        ids.iter().map(|&id| self.copy_with(id, memo)).collect()
    }

    fn copy_context(&mut self, context: &Context, memo: &mut HashMap<NodeId, NodeId>) -> Context {
        let entries: Vec<(String, NodeId)> = context
            .iter()
            .map(|(name, child)| (name.to_string(), child))
            .collect();
        let mut copy = Context::new(None);
        for (name, child) in entries {
            let child = self.copy_with(child, memo);
            copy.insert(name, child);
        }
        copy
    }

    fn rebind_function_contexts(&mut self, function: NodeId) {
        let children: Vec<NodeId> = match self.kind(function) {
            NodeKind::Function(f) => {
                let mut all = f.local_context.values();
                all.extend(f.closed_context.values());
                all
            }
            _ => Vec::new(),
        };
        for child in children {
            self.set_owner(child, function);
        }
        if let NodeKind::Function(f) = &mut self.nodes[function.0].kind {
            f.local_context.scope = Some(function);
            f.closed_context.scope = Some(function);
        }
    }
}
