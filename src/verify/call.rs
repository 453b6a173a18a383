use super::Verifier;
use crate::ir::{NodeId, NodeKind};
use crate::types::check_compatibility;
use crate::{CompileError, CompileResult, ErrorKind};

impl<'i> Verifier<'i> {
    /// Obtain the concrete callable for a call of the given function type.
    ///
    /// Methods select the unique compatible overload; dependent functions
    /// produce (or reuse) a specialization; classes route through their
    /// constructor group.
    pub(crate) fn resolve_call(
        &mut self,
        called: NodeId,
        call_type: NodeId,
    ) -> CompileResult<NodeId> {
        let target = self.ir.resolve_value(called);
        match self.ir.kind(target) {
            NodeKind::Function(_) | NodeKind::ExternalFunction(_) => {
                self.function_resolve_call(target, call_type)
            }
            NodeKind::Method(_) => self.method_resolve_call(target, call_type),
            NodeKind::Class(c) => match c.constructor {
                Some(constructor) => self.method_resolve_call(constructor, call_type),
                None => Err(self.type_error(
                    format!(
                        "Class {} does not have a constructor",
                        self.ir.name(target).unwrap_or("")
                    ),
                    self.ir.tokens(target),
                )),
            },
            _ => Err(self.type_error(
                format!("{} object is not callable", self.ir.display(target)),
                self.ir.tokens(target),
            )),
        }
    }

    fn function_resolve_call(
        &mut self,
        function: NodeId,
        call_type: NodeId,
    ) -> CompileResult<NodeId> {
        let (ty, dependent) = match self.ir.kind(function) {
            NodeKind::Function(f) => (f.ty, f.dependent),
            NodeKind::ExternalFunction(f) => (f.ty, false),
            _ => return Err(CompileError::internal("Callable is not a function")),
        };

        if !check_compatibility(self.ir, ty, call_type)? {
            return Err(self.type_error(
                format!(
                    "{} is not compatible with {}",
                    self.ir.display(call_type),
                    self.ir.display(ty),
                ),
                self.ir.tokens(function),
            ));
        }

        if !dependent {
            return Ok(function);
        }
        self.specialize(function, call_type)
    }

    /// Produce a concrete instance of a dependent function for this call.
    ///
    /// The clone's dependent argument types are retargeted to the call's
    /// concrete types and the clone is verified in place. Clones register
    /// as siblings in the defining scope under a mangled name and are
    /// cached per concrete argument type list, so a repeated call shape
    /// reuses its specialization.
    fn specialize(&mut self, function: NodeId, call_type: NodeId) -> CompileResult<NodeId> {
        let call_arguments = match self.ir.kind(call_type) {
            NodeKind::FunctionType(ft) => ft.arguments.clone(),
            _ => return Err(CompileError::internal("Call type is not a function type")),
        };
        let key: Vec<NodeId> = call_arguments
            .iter()
            .map(|&argument| self.ir.resolve_value(argument))
            .collect();

        if let NodeKind::Function(f) = self.ir.kind(function) {
            if let Some((_, cached)) = f.specializations.iter().find(|(k, _)| *k == key) {
                return Ok(*cached);
            }
        }

        let clone = self.ir.copy_node(function);
        let (arguments, clone_ty) = match self.ir.kind(clone) {
            NodeKind::Function(f) => (f.arguments.clone(), f.ty),
            _ => return Err(CompileError::internal("Specialization is not a function")),
        };

        for (index, &argument) in arguments.iter().enumerate() {
            let argument_ty = match self.ir.kind(argument) {
                NodeKind::Variable(v) => v.ty,
                _ => None,
            };
            let argument_ty = match argument_ty {
                Some(ty) if matches!(self.ir.kind(ty), NodeKind::DependentType(_)) => ty,
                _ => continue,
            };
            let concrete = match key.get(index) {
                Some(&concrete) => concrete,
                None => continue,
            };
            if let NodeKind::DependentType(d) = self.ir.kind_mut(argument_ty) {
                d.target = Some(concrete);
            }
            if let NodeKind::FunctionType(ft) = self.ir.kind_mut(clone_ty) {
                ft.arguments[index] = concrete;
            }
        }
        if let NodeKind::Function(f) = self.ir.kind_mut(clone) {
            f.dependent = false;
        }

        // Register the clone as a sibling in the scope that declared the
        // function (skipping the overload container).
        let mut base = self.ir.name(function).unwrap_or("").to_string();
        let mut scope = self.ir.owner(function);
        while let Some(owner) = scope {
            match self.ir.kind(owner) {
                NodeKind::Method(m) => {
                    base = m.name.clone();
                    scope = self.ir.owner(owner);
                }
                _ => break,
            }
        }
        let scope = scope.unwrap_or_else(|| self.current_scope());
        let name = format!("{}${}", base, self.specializations);
        self.specializations += 1;
        if let NodeKind::Function(f) = self.ir.kind_mut(clone) {
            f.name = name.clone();
        }
        self.ir.add_local_child_named(scope, name, clone);

        self.verify(clone)?;

        if let NodeKind::Function(f) = self.ir.kind_mut(function) {
            f.specializations.push((key, clone));
        }
        Ok(clone)
    }

    fn method_resolve_call(&mut self, method: NodeId, call_type: NodeId) -> CompileResult<NodeId> {
        let (name, overloads) = match self.ir.kind(method) {
            NodeKind::Method(m) => (m.name.clone(), m.overload_context.values()),
            _ => return Err(CompileError::internal("Overload set is not a method")),
        };

        // Collect overloads which accept the call type; compatibility
        // failures are not fatal here.
        let mut matches = Vec::new();
        for overload in overloads {
            match self.function_resolve_call(overload, call_type) {
                Ok(function) => matches.push(function),
                Err(error) if error.kind() == ErrorKind::TypeError => continue,
                Err(error) => return Err(error),
            }
        }

        match matches.len() {
            0 => Err(self.type_error(
                format!(
                    "{} is not compatible with any overload of {}",
                    self.ir.display(call_type),
                    name,
                ),
                self.ir.tokens(method),
            )),
            1 => Ok(matches[0]),
            // Inside a dependent function the first declared match is taken
            // provisionally; specialization settles the choice later.
            _ if self.scope_is_dependent() => Ok(matches[0]),
            _ => {
                let mut tokens = Vec::new();
                for &found in &matches {
                    tokens.extend(self.ir.tokens(found));
                }
                Err(CompileError::new(
                    ErrorKind::AmbiguousOverload,
                    format!("Ambiguous overloads for {}", name),
                    tokens,
                ))
            }
        }
    }
}
