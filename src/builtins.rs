//! The distinguished builtins module.
//!
//! Name resolution bottoms out here: the scope chain of every unit ends at
//! this module. It provides the primitive classes `Int`, `Real`, `Bool` and
//! `String`, whose operator and cast methods are backed by external
//! functions satisfied by the host linker, and the `io` module with its
//! `print` function.

use crate::ir::{Class, Context, Ir, NodeId, NodeKind};

/// Build the builtins module into the arena and return its id.
pub fn install(ir: &mut Ir) -> NodeId {
    let builtins = ir.new_module("builtins", Vec::new());

    let int = empty_class(ir, builtins, "Int");
    let real = empty_class(ir, builtins, "Real");
    let boolean = empty_class(ir, builtins, "Bool");
    let string = empty_class(ir, builtins, "String");

    // Int
    for (name, external) in [
        ("+", "brook_int_add"),
        ("-", "brook_int_sub"),
        ("*", "brook_int_mul"),
        ("//", "brook_int_floor_div"),
        ("%", "brook_int_mod"),
    ] {
        operation(ir, int, name, vec![int], Some(int), external);
    }
    operation(ir, int, "/", vec![int], Some(real), "brook_int_div");
    for (name, external) in [
        ("==", "brook_int_eq"),
        ("!=", "brook_int_ne"),
        ("<", "brook_int_lt"),
        ("<=", "brook_int_le"),
        (">", "brook_int_gt"),
        (">=", "brook_int_ge"),
    ] {
        operation(ir, int, name, vec![int], Some(boolean), external);
    }
    operation(ir, int, "-", vec![], Some(int), "brook_int_neg");
    operation(ir, int, "+", vec![], Some(int), "brook_int_pos");
    operation(ir, int, "as", vec![], Some(real), "brook_int_to_real");
    operation(ir, int, "as", vec![], Some(string), "brook_int_to_string");

    // Real
    for (name, external) in [
        ("+", "brook_real_add"),
        ("-", "brook_real_sub"),
        ("*", "brook_real_mul"),
        ("/", "brook_real_div"),
    ] {
        operation(ir, real, name, vec![real], Some(real), external);
    }
    for (name, external) in [
        ("==", "brook_real_eq"),
        ("!=", "brook_real_ne"),
        ("<", "brook_real_lt"),
        ("<=", "brook_real_le"),
        (">", "brook_real_gt"),
        (">=", "brook_real_ge"),
    ] {
        operation(ir, real, name, vec![real], Some(boolean), external);
    }
    operation(ir, real, "-", vec![], Some(real), "brook_real_neg");
    operation(ir, real, "+", vec![], Some(real), "brook_real_pos");
    operation(ir, real, "as", vec![], Some(int), "brook_real_to_int");
    operation(ir, real, "as", vec![], Some(string), "brook_real_to_string");

    // Bool
    operation(ir, boolean, "!", vec![], Some(boolean), "brook_bool_not");
    operation(ir, boolean, "==", vec![boolean], Some(boolean), "brook_bool_eq");
    operation(ir, boolean, "!=", vec![boolean], Some(boolean), "brook_bool_ne");
    operation(ir, boolean, "as", vec![], Some(string), "brook_bool_to_string");

    // String
    operation(ir, string, "+", vec![string], Some(string), "brook_string_concat");
    operation(ir, string, "==", vec![string], Some(boolean), "brook_string_eq");
    operation(ir, string, "!=", vec![string], Some(boolean), "brook_string_ne");

    // io
    let io = ir.new_module("io", Vec::new());
    let print = ir.new_external_function("print", "puts", vec![string], Some(int));
    ir.add_local_child(io, print);
    ir.add_local_child(builtins, io);

    builtins
}

fn empty_class(ir: &mut Ir, module: NodeId, name: &str) -> NodeId {
    let class = ir.push(
        Vec::new(),
        NodeKind::Class(Class {
            name: name.to_string(),
            constructor: None,
            instance_context: Context::new(None),
            verified: false,
        }),
    );
    if let NodeKind::Class(c) = ir.kind_mut(class) {
        c.instance_context.scope = Some(class);
    }
    ir.add_local_child(module, class);
    class
}

/// Add an operator, comparison or cast overload to a class, creating the
/// method on first use.
fn operation(
    ir: &mut Ir,
    class: NodeId,
    name: &str,
    arguments: Vec<NodeId>,
    return_type: Option<NodeId>,
    external: &str,
) {
    let method = match ir.local_context(class).and_then(|context| context.get(name)) {
        Some(method) => method,
        None => {
            let method = ir.new_method(name, Vec::new(), Vec::new());
            ir.add_local_child_named(class, name.to_string(), method);
            method
        }
    };
    let overload = ir.new_external_function(external, external, arguments, return_type);
    ir.method_add_overload(method, overload);
}
