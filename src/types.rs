//! Type compatibility.
//!
//! Compatibility is symmetric at the top level: two types are compatible
//! when either direction reports compatibility. The per variant rules are
//! directional; an untargeted [DependentType](crate::ir::DependentType)
//! records every probed type into its observed set and accepts, which is
//! what drives call site specialization.

use crate::ir::{Ir, NodeId, NodeKind};
use crate::CompileResult;

/// Whether `a` and `b` are compatible, in either direction.
pub fn check_compatibility(ir: &mut Ir, a: NodeId, b: NodeId) -> CompileResult<bool> {
    if compatible_one_way(ir, a, b)? {
        return Ok(true);
    }
    compatible_one_way(ir, b, a)
}

enum Rule {
    Module(NodeId),
    Class,
    Function(Vec<NodeId>, Option<NodeId>),
    DependentTarget(NodeId),
    DependentOpen,
    Other,
}

fn compatible_one_way(ir: &mut Ir, a: NodeId, b: NodeId) -> CompileResult<bool> {
    let a = ir.resolve_value(a);
    let b = ir.resolve_value(b);
    if a == b {
        return Ok(true);
    }

    let rule = match ir.kind(a) {
        NodeKind::ModuleType(mt) => Rule::Module(mt.module),
        NodeKind::Class(_) => Rule::Class,
        NodeKind::FunctionType(ft) => Rule::Function(ft.arguments.clone(), ft.return_type),
        NodeKind::DependentType(d) => match d.target {
            Some(target) => Rule::DependentTarget(target),
            None => Rule::DependentOpen,
        },
        _ => Rule::Other,
    };

    match rule {
        Rule::Module(module) => Ok(match ir.kind(b) {
            NodeKind::ModuleType(other) => other.module == module,
            _ => false,
        }),
        // A class is compatible only with itself, which the identity check
        // above has already ruled out.
        Rule::Class => Ok(false),
        Rule::Function(arguments, return_type) => {
            let (other_arguments, other_return) = match ir.kind(b) {
                NodeKind::FunctionType(ft) => (ft.arguments.clone(), ft.return_type),
                _ => return Ok(false),
            };
            if arguments.len() != other_arguments.len() {
                return Ok(false);
            }
            for (&own, &other) in arguments.iter().zip(other_arguments.iter()) {
                if !check_compatibility(ir, own, other)? {
                    return Ok(false);
                }
            }
            // A missing return type on either side acts as a wildcard; this
            // is what lets call sites without a hint infer their type.
            match (return_type, other_return) {
                (Some(own), Some(other)) => check_compatibility(ir, own, other),
                _ => Ok(true),
            }
        }
        Rule::DependentTarget(target) => compatible_one_way(ir, target, b),
        Rule::DependentOpen => {
            if let NodeKind::DependentType(d) = ir.kind_mut(a) {
                if !d.compatibles.contains(&b) {
                    d.compatibles.push(b);
                }
            }
            Ok(true)
        }
        Rule::Other => Ok(false),
    }
}
