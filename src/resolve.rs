//! Name lookup across nested scopes.
//!
//! Resolution walks the chain of owning scopes from the current scope up to
//! the distinguished builtins module, collecting every binding whose name
//! equals the query. Exactly one match is required; anything else is a
//! structured resolution failure.

use crate::ir::{Ir, NodeId};
use crate::{CompileError, CompileResult, ErrorKind, Token};

/// Resolve `name` from `scope`, walking owners up to `builtins`.
///
/// At every scope both the local context and the closed over context are
/// consulted, so method bodies see `self` alongside their arguments.
/// `exclude` filters out a declaration that must not match itself (used by
/// assignments resolving their own target).
pub fn resolve_reference(
    ir: &Ir,
    scope: NodeId,
    builtins: NodeId,
    name: &str,
    exclude: Option<NodeId>,
) -> CompileResult<NodeId> {
    let mut found: Vec<NodeId> = Vec::new();

    let mut current = scope;
    loop {
        if let Some(context) = ir.local_context(current) {
            if let Some(hit) = context.get(name) {
                found.push(hit);
            }
        }
        if let Some(context) = ir.closed_context(current) {
            if let Some(hit) = context.get(name) {
                found.push(hit);
            }
        }

        // Go to builtins once the top of the tree is reached.
        if current == builtins {
            break;
        }
        current = match ir.owner(current) {
            Some(owner) => owner,
            None => builtins,
        };
    }

    found.retain(|&hit| Some(hit) != exclude);

    match found.len() {
        0 => Err(CompileError::new(
            ErrorKind::MissingReference,
            format!("No reference to {}", name),
            Vec::new(),
        )),
        1 => Ok(found[0]),
        _ => {
            let mut tokens: Vec<Token> = Vec::new();
            for &hit in &found {
                tokens.extend(ir.tokens(hit));
            }
            Err(CompileError::new(
                ErrorKind::AmbiguousReference,
                format!("Ambiguous reference to {}", name),
                tokens,
            ))
        }
    }
}

/// Resolve an attribute of a value.
///
/// The search space is the union of the instance context of the value's
/// type and the global context of the value itself, in that order of
/// preference.
pub fn resolve_attribute(ir: &Ir, value: NodeId, name: &str) -> CompileResult<NodeId> {
    let target = ir.resolve_value(value);

    let instance = match ir.resolve_type(target) {
        Ok(Some(ty)) => ir.instance_context(ty).and_then(|context| context.get(name)),
        _ => None,
    };
    if let Some(hit) = instance {
        return Ok(hit);
    }

    if let Some(context) = ir.global_context(target) {
        if let Some(hit) = context.get(name) {
            return Ok(hit);
        }
    }

    Err(CompileError::new(
        ErrorKind::MissingReference,
        format!("{} does not have an attribute {}", ir.display(target), name),
        ir.tokens(value),
    ))
}
