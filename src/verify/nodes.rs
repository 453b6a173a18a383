use super::{FrameKind, Verifier};
use crate::ir::{FunctionKind, FunctionType, NodeId, NodeKind};
use crate::resolve;
use crate::types::check_compatibility;
use crate::{CompileResult, ErrorKind};

impl<'i> Verifier<'i> {
    /// Verify one node, dispatching on its variant.
    pub(crate) fn verify(&mut self, id: NodeId) -> CompileResult<()> {
        match self.ir.kind(id) {
            NodeKind::Module(_) => self.verify_module_node(id),
            NodeKind::ModuleType(mt) => {
                let module = mt.module;
                self.verify(module)
            }
            NodeKind::Function(_) => self.verify_function(id),
            NodeKind::ExternalFunction(_) => self.verify_external_function(id),
            NodeKind::FunctionType(_) => self.verify_function_type(id),
            NodeKind::Method(_) => self.verify_method(id),
            NodeKind::Class(_) => self.verify_class(id),
            NodeKind::DependentType(_) | NodeKind::Comment(_) => Ok(()),
            NodeKind::Variable(_) => self.verify_variable(id),
            NodeKind::Assignment(_) => self.verify_assignment(id),
            NodeKind::Call(_) => self.verify_call(id),
            NodeKind::Literal(_) => self.verify_literal(id),
            NodeKind::Reference(_) => self.verify_reference(id),
            NodeKind::Attribute(_) => self.verify_attribute(id),
            NodeKind::Return(_) => self.verify_return(id),
            NodeKind::Branch(_) => self.verify_branch(id),
            NodeKind::Loop(_) => self.verify_loop(id),
            NodeKind::Break(_) => self.verify_break(id),
            NodeKind::Import(_) => self.verify_import(id),
        }
    }

    fn verify_module_node(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, main, children) = match self.ir.kind(id) {
            NodeKind::Module(m) => (m.verified, m.main, m.context.values()),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::Module(m) = self.ir.kind_mut(id) {
            m.verified = true;
        }

        self.scoped(id, |v| {
            if let Some(main) = main {
                v.verify(main)?;
            }
            for child in children {
                v.verify(child)?;
            }
            Ok(())
        })
    }

    fn verify_function(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, ty, instructions) = match self.ir.kind(id) {
            NodeKind::Function(f) => (f.verified, f.ty, f.instructions.clone()),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::Function(f) = self.ir.kind_mut(id) {
            f.verified = true;
        }

        self.scoped(id, |v| {
            v.verify(ty)?;
            for instruction in &instructions {
                v.verify(*instruction)?;
            }
            v.verify_function_paths(id)
        })
    }

    /// Analytical verification: a function with a declared, non void return
    /// type must return on every path.
    fn verify_function_paths(&mut self, id: NodeId) -> CompileResult<()> {
        let declared = match self.ir.kind(id) {
            NodeKind::Function(f) => f.kind == FunctionKind::Function && f.declared_return,
            _ => false,
        };
        if declared && !self.base_frame_returns() {
            return Err(self.semantic_error(
                "All code paths must return".to_string(),
                self.ir.tokens(id),
            ));
        }
        Ok(())
    }

    fn verify_external_function(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, ty) = match self.ir.kind(id) {
            NodeKind::ExternalFunction(f) => (f.verified, f.ty),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::ExternalFunction(f) = self.ir.kind_mut(id) {
            f.verified = true;
        }
        self.verify(ty)
    }

    fn verify_function_type(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, arguments, return_type) = match self.ir.kind(id) {
            NodeKind::FunctionType(ft) => (ft.verified, ft.arguments.clone(), ft.return_type),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::FunctionType(ft) = self.ir.kind_mut(id) {
            ft.verified = true;
        }

        for argument in arguments {
            self.verify(argument)?;
        }
        if let Some(return_type) = return_type {
            self.verify(return_type)?;
        }
        Ok(())
    }

    fn verify_method(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, name, overloads) = match self.ir.kind(id) {
            NodeKind::Method(m) => (m.verified, m.name.clone(), m.overload_context.values()),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::Method(m) = self.ir.kind_mut(id) {
            m.verified = true;
        }

        self.scoped(id, |v| {
            for &overload in &overloads {
                v.verify(overload)?;
            }
            v.check_overload_conflicts(id, &name, &overloads)
        })
    }

    /// No two overloads may have type compatible signatures. Dependent
    /// overloads are exempt: probing them would pollute their dependent
    /// type accumulators.
    fn check_overload_conflicts(
        &mut self,
        method: NodeId,
        name: &str,
        overloads: &[NodeId],
    ) -> CompileResult<()> {
        let concrete: Vec<(NodeId, NodeId)> = overloads
            .iter()
            .filter_map(|&overload| match self.ir.kind(overload) {
                NodeKind::Function(f) if !f.dependent => Some((overload, f.ty)),
                NodeKind::ExternalFunction(f) => Some((overload, f.ty)),
                _ => None,
            })
            .collect();

        for (index, &(first, first_ty)) in concrete.iter().enumerate() {
            for &(second, second_ty) in &concrete[index + 1..] {
                if check_compatibility(self.ir, first_ty, second_ty)? {
                    let mut tokens = self.ir.tokens(first);
                    tokens.extend(self.ir.tokens(second));
                    tokens.extend(self.ir.tokens(method));
                    return Err(crate::CompileError::new(
                        ErrorKind::AmbiguousOverload,
                        format!("Conflicting overloads for {}", name),
                        tokens,
                    ));
                }
            }
        }
        Ok(())
    }

    fn verify_class(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, constructor, attributes) = match self.ir.kind(id) {
            NodeKind::Class(c) => (c.verified, c.constructor, c.instance_context.values()),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::Class(c) = self.ir.kind_mut(id) {
            c.verified = true;
        }

        self.scoped(id, |v| {
            if let Some(constructor) = constructor {
                v.verify(constructor)?;
            }
            for attribute in attributes {
                v.verify(attribute)?;
            }
            Ok(())
        })
    }

    fn verify_variable(&mut self, id: NodeId) -> CompileResult<()> {
        let ty = match self.ir.kind(id) {
            NodeKind::Variable(v) => v.ty,
            _ => None,
        };
        match ty {
            Some(ty) => self.verify(ty),
            None => Ok(()),
        }
    }

    fn verify_reference(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, name) = match self.ir.kind(id) {
            NodeKind::Reference(r) => (r.verified, r.name.clone()),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::Reference(r) = self.ir.kind_mut(id) {
            r.verified = true;
        }

        let scope = self.current_scope();
        let value = resolve::resolve_reference(self.ir, scope, self.builtins, &name, None)
            .map_err(|error| error.add(format!("reference to {}", name), self.ir.tokens(id)))?;

        if let NodeKind::Reference(r) = self.ir.kind_mut(id) {
            r.value = Some(value);
        }
        self.verify(value)
    }

    fn verify_attribute(&mut self, id: NodeId) -> CompileResult<()> {
        let (verified, value, name) = match self.ir.kind(id) {
            NodeKind::Attribute(a) => (a.verified, a.value, a.name.clone()),
            _ => return Ok(()),
        };
        if verified {
            return Ok(());
        }
        if let NodeKind::Attribute(a) = self.ir.kind_mut(id) {
            a.verified = true;
        }

        self.verify(value)?;
        let attribute = resolve::resolve_attribute(self.ir, value, &name)
            .map_err(|error| error.add(format!("attribute {}", name), self.ir.tokens(id)))?;

        if let NodeKind::Attribute(a) = self.ir.kind_mut(id) {
            a.attribute = Some(attribute);
        }
        self.verify(attribute)
    }

    fn verify_call(&mut self, id: NodeId) -> CompileResult<()> {
        let (called, arguments, hint) = match self.ir.kind(id) {
            NodeKind::Call(c) => (c.called, c.arguments.clone(), c.return_type),
            _ => return Ok(()),
        };

        self.verify(called)?;
        if let Some(hint) = hint {
            self.verify(hint)?;
        }

        let mut argument_types = Vec::with_capacity(arguments.len());
        for &argument in &arguments {
            self.verify(argument)?;
            match self.ir.resolve_type(argument)? {
                Some(ty) => argument_types.push(ty),
                None => {
                    return Err(self.type_error(
                        format!(
                            "Cannot pass non value {} as an argument",
                            self.ir.display(argument)
                        ),
                        self.ir.tokens(argument),
                    ))
                }
            }
        }

        let call_type = self.ir.push(
            Vec::new(),
            NodeKind::FunctionType(FunctionType {
                arguments: argument_types,
                return_type: hint,
                verified: true,
            }),
        );

        let called_text = format!("{}", self.ir.display(called));
        let function = self
            .resolve_call(called, call_type)
            .map_err(|error| error.add(format!("call of {}", called_text), self.ir.tokens(id)))?;

        if let NodeKind::Call(c) = self.ir.kind_mut(id) {
            c.function = Some(function);
        }
        Ok(())
    }

    fn verify_literal(&mut self, id: NodeId) -> CompileResult<()> {
        let ty = match self.ir.kind(id) {
            NodeKind::Literal(l) => l.ty,
            _ => return Ok(()),
        };
        self.verify(ty)
    }

    /// Either rebind an existing variable of the same name or declare the
    /// new one locally, then check assignability.
    fn verify_assignment(&mut self, id: NodeId) -> CompileResult<()> {
        let (variable, value) = match self.ir.kind(id) {
            NodeKind::Assignment(a) => (a.variable, a.value),
            _ => return Ok(()),
        };
        let (name, declared) = match self.ir.kind(variable) {
            NodeKind::Variable(v) => (v.name.clone(), v.ty),
            _ => return Err(crate::CompileError::internal("Assignment without variable")),
        };

        let scope = self.current_scope();
        let target = match resolve::resolve_reference(
            self.ir,
            scope,
            self.builtins,
            &name,
            Some(variable),
        ) {
            Ok(existing) => {
                let (existing_ty, constant) = match self.ir.kind(existing) {
                    NodeKind::Variable(v) => (v.ty, v.constant),
                    _ => {
                        return Err(self.type_error(
                            format!("Cannot assign to {}", name),
                            self.ir.tokens(id),
                        ))
                    }
                };
                if constant {
                    return Err(self.type_error(
                        format!("Cannot reassign constant variable {}", name),
                        self.ir.tokens(id),
                    ));
                }
                if existing_ty.is_none() {
                    if let NodeKind::Variable(v) = self.ir.kind_mut(existing) {
                        v.ty = declared;
                    }
                } else if declared.is_some() {
                    return Err(self.type_error(
                        format!("Cannot override the type of variable {}", name),
                        self.ir.tokens(id),
                    ));
                }
                if let NodeKind::Assignment(a) = self.ir.kind_mut(id) {
                    a.variable = existing;
                }
                existing
            }
            Err(error) if error.kind() == ErrorKind::MissingReference => {
                self.ir.add_local_child(scope, variable);
                variable
            }
            Err(error) => return Err(error),
        };

        self.verify(value)?;
        self.verify(target)?;

        let value_ty = match self.ir.resolve_type(value)? {
            Some(ty) => ty,
            None => {
                return Err(self.type_error(
                    format!("Cannot assign non value {}", self.ir.display(value)),
                    self.ir.tokens(id),
                ))
            }
        };

        let target_ty = match self.ir.kind(target) {
            NodeKind::Variable(v) => v.ty,
            _ => None,
        };
        match target_ty {
            None => {
                if let NodeKind::Variable(v) = self.ir.kind_mut(target) {
                    v.ty = Some(value_ty);
                }
                Ok(())
            }
            Some(target_ty) => {
                if check_compatibility(self.ir, value_ty, target_ty)? {
                    Ok(())
                } else {
                    Err(self.type_error(
                        format!(
                            "Cannot assign {} of type {} to variable {} of type {}",
                            self.ir.display(value),
                            self.ir.display(value_ty),
                            name,
                            self.ir.display(target_ty),
                        ),
                        self.ir.tokens(id),
                    ))
                }
            }
        }
    }

    /// Record the return, inferring or checking the function's return type
    /// and updating the flow analysis state.
    fn verify_return(&mut self, id: NodeId) -> CompileResult<()> {
        let value = match self.ir.kind(id) {
            NodeKind::Return(r) => r.value,
            _ => return Ok(()),
        };

        let scope = self.current_scope();
        let (constructor, fn_ty) = match self.ir.kind(scope) {
            NodeKind::Function(f) => (f.kind == FunctionKind::Constructor, f.ty),
            _ => {
                return Err(self.semantic_error(
                    "Cannot return outside of a function".to_string(),
                    self.ir.tokens(id),
                ))
            }
        };
        if constructor {
            return Err(self.semantic_error(
                "Returns within constructors are invalid".to_string(),
                self.ir.tokens(id),
            ));
        }

        if let Some(value) = value {
            self.verify(value)?;
        }
        let value_ty = match value {
            Some(value) => self.ir.resolve_type(value)?,
            None => None,
        };

        let declared = match self.ir.kind(fn_ty) {
            NodeKind::FunctionType(ft) => ft.return_type,
            _ => None,
        };
        match (declared, value_ty) {
            (None, Some(value_ty)) => {
                if let NodeKind::FunctionType(ft) = self.ir.kind_mut(fn_ty) {
                    ft.return_type = Some(value_ty);
                }
            }
            (None, None) => {}
            (Some(declared), Some(value_ty)) => {
                if !check_compatibility(self.ir, declared, value_ty)? {
                    return Err(self.type_error(
                        format!(
                            "Cannot return a value of type {} from a function returning {}",
                            self.ir.display(value_ty),
                            self.ir.display(declared),
                        ),
                        self.ir.tokens(id),
                    ));
                }
            }
            (Some(_), None) => {
                return Err(self.type_error(
                    "A return value is required".to_string(),
                    self.ir.tokens(id),
                ))
            }
        }

        if let NodeKind::Return(r) = self.ir.kind_mut(id) {
            r.function = Some(scope);
        }
        self.mark_returns();
        Ok(())
    }

    fn verify_branch(&mut self, id: NodeId) -> CompileResult<()> {
        let (condition, on_true, on_false) = match self.ir.kind(id) {
            NodeKind::Branch(b) => (b.condition, b.on_true.clone(), b.on_false.clone()),
            _ => return Ok(()),
        };

        let scope = self.current_scope();
        if !matches!(self.ir.kind(scope), NodeKind::Function(_)) {
            return Err(self.semantic_error(
                "Cannot branch outside of a function".to_string(),
                self.ir.tokens(id),
            ));
        }

        self.verify(condition)?;
        let condition_ty = match self.ir.resolve_type(condition)? {
            Some(ty) => ty,
            None => {
                return Err(self.type_error(
                    "Branch condition must be a value".to_string(),
                    self.ir.tokens(id),
                ))
            }
        };
        let bool_class = self.bool_class()?;
        if !check_compatibility(self.ir, condition_ty, bool_class)? {
            return Err(self.type_error(
                format!(
                    "Branch condition of type {} is not a Bool",
                    self.ir.display(condition_ty)
                ),
                self.ir.tokens(id),
            ));
        }

        let ((), true_returns) = self.soft_scoped(FrameKind::Branch, Some(id), |v| {
            for &instruction in &on_true {
                v.verify(instruction)?;
            }
            Ok(())
        })?;
        let ((), false_returns) = self.soft_scoped(FrameKind::Branch, Some(id), |v| {
            for &instruction in &on_false {
                v.verify(instruction)?;
            }
            Ok(())
        })?;

        // Both arms must return for the branch to definitely return.
        if true_returns && false_returns {
            self.mark_returns();
        }
        Ok(())
    }

    fn verify_loop(&mut self, id: NodeId) -> CompileResult<()> {
        let instructions = match self.ir.kind(id) {
            NodeKind::Loop(l) => l.instructions.clone(),
            _ => return Ok(()),
        };

        let scope = self.current_scope();
        if !matches!(self.ir.kind(scope), NodeKind::Function(_)) {
            return Err(self.semantic_error(
                "Cannot loop outside of a function".to_string(),
                self.ir.tokens(id),
            ));
        }
        if let NodeKind::Loop(l) = self.ir.kind_mut(id) {
            l.function = Some(scope);
        }

        let ((), _) = self.soft_scoped(FrameKind::Loop, Some(id), |v| {
            for &instruction in &instructions {
                v.verify(instruction)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn verify_break(&mut self, id: NodeId) -> CompileResult<()> {
        match self.nearest_loop() {
            Some(target) => {
                if let NodeKind::Break(b) = self.ir.kind_mut(id) {
                    b.target = Some(target);
                }
                Ok(())
            }
            None => Err(self.semantic_error(
                "Cannot break outside of a loop".to_string(),
                self.ir.tokens(id),
            )),
        }
    }

    /// Imports resolve against the scope chain; relative paths (leading
    /// dots) are resolved against the filesystem by the driver, not here.
    fn verify_import(&mut self, id: NodeId) -> CompileResult<()> {
        let (path, alias) = match self.ir.kind(id) {
            NodeKind::Import(i) => (i.path.clone(), i.alias.clone()),
            _ => return Ok(()),
        };

        if path.first().map(String::as_str) == Some(".") {
            return Ok(());
        }
        let head = match path.first() {
            Some(head) => head.clone(),
            None => return Ok(()),
        };

        let scope = self.current_scope();
        let mut target = resolve::resolve_reference(self.ir, scope, self.builtins, &head, None)
            .map_err(|error| error.add(format!("import of {}", head), self.ir.tokens(id)))?;
        for segment in &path[1..] {
            target = resolve::resolve_attribute(self.ir, target, segment)
                .map_err(|error| error.add(format!("import of {}", segment), self.ir.tokens(id)))?;
        }
        self.verify(target)?;

        if let Some(alias) = alias {
            self.ir.bind_alias(scope, alias, target);
        }
        Ok(())
    }
}
