use crate::builtins;
use crate::ir::{DependentType, FunctionKind, Ir, NodeId, NodeKind};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::verify::Verifier;
use crate::{Code, CompileError, ErrorKind};

fn compile(source: &str) -> (Ir, NodeId, NodeId) {
    let code = Code::from(source);
    let mut ir = Ir::new();
    let builtin = builtins::install(&mut ir);
    let module = Parser::new(Lexer::new(&code))
        .parse_unit(&mut ir)
        .unwrap_or_else(|error| panic!("parse failed: {}", error));
    Verifier::new(&mut ir, builtin)
        .verify_module(module)
        .unwrap_or_else(|error| panic!("verification failed: {}", error));
    (ir, module, builtin)
}

fn compile_error(source: &str) -> CompileError {
    let code = Code::from(source);
    let mut ir = Ir::new();
    let builtin = builtins::install(&mut ir);
    let module = Parser::new(Lexer::new(&code))
        .parse_unit(&mut ir)
        .unwrap_or_else(|error| panic!("parse failed: {}", error));
    match Verifier::new(&mut ir, builtin).verify_module(module) {
        Ok(()) => panic!("verification should fail"),
        Err(error) => error,
    }
}

fn builtin_class(ir: &Ir, builtin: NodeId, name: &str) -> NodeId {
    ir.local_context(builtin)
        .and_then(|context| context.get(name))
        .unwrap_or_else(|| panic!("no builtin {}", name))
}

fn main_instructions(ir: &Ir, module: NodeId) -> Vec<NodeId> {
    let main = match ir.kind(module) {
        NodeKind::Module(m) => m.main.unwrap(),
        _ => panic!("not a module"),
    };
    match ir.kind(main) {
        NodeKind::Function(f) => f.instructions.clone(),
        _ => panic!("main is not a function"),
    }
}

fn module_child(ir: &Ir, module: NodeId, name: &str) -> NodeId {
    match ir.kind(module) {
        NodeKind::Module(m) => m
            .context
            .get(name)
            .unwrap_or_else(|| panic!("no module child {}", name)),
        _ => panic!("not a module"),
    }
}

fn function_signature(ir: &Ir, function: NodeId) -> (Vec<NodeId>, Option<NodeId>) {
    let ty = match ir.kind(function) {
        NodeKind::Function(f) => f.ty,
        NodeKind::ExternalFunction(f) => f.ty,
        _ => panic!("not a callable"),
    };
    match ir.kind(ty) {
        NodeKind::FunctionType(ft) => (ft.arguments.clone(), ft.return_type),
        _ => panic!("not a function type"),
    }
}

fn assert_all_references_resolved(ir: &Ir) {
    for index in 0..ir.len() {
        if let NodeKind::Reference(r) = ir.kind(NodeId(index)) {
            assert!(
                r.value.is_some(),
                "reference {} left unresolved after verification",
                r.name
            );
        }
    }
}

#[test]
fn hello_world_resolves_io_print() {
    let (ir, module, builtin) = compile("import io\nio.print(`Hello`)\n");
    let instructions = main_instructions(&ir, module);
    assert_eq!(instructions.len(), 2);

    let function = match ir.kind(instructions[1]) {
        NodeKind::Call(c) => c.function.expect("call must be resolved"),
        _ => panic!("expected call"),
    };
    match ir.kind(function) {
        NodeKind::ExternalFunction(f) => assert_eq!(f.external_name, "puts"),
        other => panic!("expected external function, got {}", other.label()),
    }

    let (arguments, return_type) = function_signature(&ir, function);
    let string = builtin_class(&ir, builtin, "String");
    let int = builtin_class(&ir, builtin, "Int");
    assert_eq!(ir.resolve_value(arguments[0]), string);
    assert_eq!(ir.resolve_value(return_type.unwrap()), int);

    assert_all_references_resolved(&ir);
}

#[test]
fn operator_overloading_on_classes() {
    let (ir, module, _) = compile(
        "class Pair\n  def self + other:Pair -> Pair\n    return new Pair(1)\n  end\n  new(x:Int) end\nend\n",
    );
    let class = module_child(&ir, module, "Pair");
    let (constructor, add) = match ir.kind(class) {
        NodeKind::Class(c) => (c.constructor.unwrap(), c.instance_context.get("+").unwrap()),
        _ => panic!("expected class"),
    };

    let overloads = match ir.kind(add) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected method"),
    };
    assert_eq!(overloads.len(), 1);
    let (arguments, return_type) = function_signature(&ir, overloads[0]);
    assert_eq!(arguments.len(), 1);
    assert_eq!(ir.resolve_value(arguments[0]), class);
    assert_eq!(ir.resolve_value(return_type.unwrap()), class);

    let constructors = match ir.kind(constructor) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected constructor group"),
    };
    assert_eq!(constructors.len(), 1);
    match ir.kind(constructors[0]) {
        NodeKind::Function(f) => {
            assert_eq!(f.kind, FunctionKind::Constructor);
            assert_eq!(f.arguments.len(), 1);
        }
        _ => panic!("expected constructor function"),
    }
    let (_, constructed) = function_signature(&ir, constructors[0]);
    assert_eq!(constructed.unwrap(), class);
}

#[test]
fn default_arguments_forward_through_the_overload_chain() {
    let (ir, module, _) = compile("def f(a:Int, b:Int = 1, c:Int = 2) return a end\nf(7)\n");
    let method = module_child(&ir, module, "f");
    let overloads = match ir.kind(method) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected method"),
    };
    assert_eq!(overloads.len(), 3);

    // The one argument overload forwards to the two argument one, which
    // forwards to the full signature.
    for index in [2, 1] {
        let instructions = match ir.kind(overloads[index]) {
            NodeKind::Function(f) => f.instructions.clone(),
            _ => panic!("expected function"),
        };
        assert_eq!(instructions.len(), 1);
        match ir.kind(instructions[0]) {
            NodeKind::Call(c) => assert_eq!(c.function, Some(overloads[index - 1])),
            _ => panic!("expected forwarding call"),
        }
    }

    // `f(7)` selects the one argument overload.
    let instructions = main_instructions(&ir, module);
    match ir.kind(instructions[0]) {
        NodeKind::Call(c) => assert_eq!(c.function, Some(overloads[2])),
        _ => panic!("expected call"),
    }
}

#[test]
fn dependent_functions_specialize_per_call_site() {
    let (ir, module, builtin) = compile("def id(x) return x end\nid(1)\nid(`a`)\n");
    let int = builtin_class(&ir, builtin, "Int");
    let string = builtin_class(&ir, builtin, "String");

    // The original stays dependent, with its placeholder untargeted and
    // both observed types recorded.
    let method = module_child(&ir, module, "id");
    let overloads = match ir.kind(method) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected method"),
    };
    let original = overloads[0];
    let (arguments, _) = function_signature(&ir, original);
    match ir.kind(arguments[0]) {
        NodeKind::DependentType(DependentType {
            compatibles,
            target,
        }) => {
            assert!(target.is_none());
            assert!(compatibles.contains(&int));
            assert!(compatibles.contains(&string));
        }
        _ => panic!("expected dependent argument"),
    }
    match ir.kind(original) {
        NodeKind::Function(f) => assert!(f.dependent),
        _ => panic!("expected function"),
    }

    // Two specializations live as siblings in the module scope.
    let instructions = main_instructions(&ir, module);
    let specialized: Vec<NodeId> = instructions[0..2]
        .iter()
        .map(|&call| match ir.kind(call) {
            NodeKind::Call(c) => c.function.unwrap(),
            _ => panic!("expected call"),
        })
        .collect();
    assert_ne!(specialized[0], specialized[1]);

    for (clone, expected) in specialized.iter().zip([int, string]) {
        assert_eq!(ir.owner(*clone), Some(module));
        match ir.kind(*clone) {
            NodeKind::Function(f) => assert!(!f.dependent),
            _ => panic!("expected function"),
        }
        let (arguments, return_type) = function_signature(&ir, *clone);
        assert_eq!(arguments[0], expected);
        match ir.kind(return_type.unwrap()) {
            NodeKind::DependentType(d) => assert_eq!(d.target, Some(expected)),
            other => panic!("expected targeted return, got {}", other.label()),
        }
    }

    assert_all_references_resolved(&ir);
}

#[test]
fn repeated_call_shapes_reuse_their_specialization() {
    let (ir, module, _) = compile("def id(x) return x end\nid(1)\nid(2)\n");
    let instructions = main_instructions(&ir, module);
    let resolved: Vec<Option<NodeId>> = instructions
        .iter()
        .map(|&call| match ir.kind(call) {
            NodeKind::Call(c) => c.function,
            _ => panic!("expected call"),
        })
        .collect();
    assert_eq!(resolved[0], resolved[1]);
}

#[test]
fn missing_return_on_a_path_is_a_semantic_error() {
    let error = compile_error("def f(b:Bool) -> Int\n  if b return 1 end\nend\n");
    assert_eq!(error.kind(), ErrorKind::SemanticError);
    assert!(error.message().contains("All code paths must return"));
}

#[test]
fn returning_in_both_arms_satisfies_path_analysis() {
    compile("def f(b:Bool) -> Int\n  if b\n    return 1\n  else\n    return 2\n  end\nend\n");
}

#[test]
fn straight_line_return_satisfies_path_analysis() {
    compile("def f() -> Int\n  return 41 + 1\nend\n");
}

#[test]
fn a_loop_does_not_count_as_returning() {
    let error = compile_error("def f() -> Int\n  loop\n    return 1\n  end\nend\n");
    assert_eq!(error.kind(), ErrorKind::SemanticError);
}

#[test]
fn duplicate_concrete_overloads_are_ambiguous() {
    let error = compile_error("def g(x:Int) end\ndef g(x:Int) end\ng(1)\n");
    assert_eq!(error.kind(), ErrorKind::AmbiguousOverload);
}

#[test]
fn incompatible_call_is_a_type_error() {
    let error = compile_error("def g(x:Int) end\ng(`text`)\n");
    assert_eq!(error.kind(), ErrorKind::TypeError);
}

#[test]
fn unknown_names_are_missing_references() {
    let error = compile_error("nowhere\n");
    assert_eq!(error.kind(), ErrorKind::MissingReference);
}

#[test]
fn break_outside_a_loop_is_a_semantic_error() {
    let error = compile_error("def f()\n  break\nend\n");
    assert_eq!(error.kind(), ErrorKind::SemanticError);
}

#[test]
fn break_binds_to_the_nearest_enclosing_loop() {
    let (ir, module, _) = compile("def f(b:Bool)\n  loop\n    if b\n      break\n    end\n  end\nend\n");
    let method = module_child(&ir, module, "f");
    let overload = match ir.kind(method) {
        NodeKind::Method(m) => m.overload_context.values()[0],
        _ => panic!("expected method"),
    };
    let body = match ir.kind(overload) {
        NodeKind::Function(f) => f.instructions.clone(),
        _ => panic!("expected function"),
    };
    let (loop_id, guarded) = match ir.kind(body[0]) {
        NodeKind::Loop(l) => (body[0], l.instructions.clone()),
        _ => panic!("expected loop"),
    };
    let break_id = match ir.kind(guarded[0]) {
        NodeKind::Branch(b) => b.on_true[0],
        _ => panic!("expected branch"),
    };
    match ir.kind(break_id) {
        NodeKind::Break(b) => assert_eq!(b.target, Some(loop_id)),
        _ => panic!("expected break"),
    }
}

#[test]
fn returns_within_constructors_are_invalid() {
    let error =
        compile_error("class P\n  new(x:Int)\n    return x\n  end\nend\nnew P(1)\n");
    assert_eq!(error.kind(), ErrorKind::SemanticError);
}

#[test]
fn branch_conditions_must_be_bool() {
    let error = compile_error("if 1\nend\n");
    assert_eq!(error.kind(), ErrorKind::TypeError);
}

#[test]
fn comparisons_produce_bool_conditions() {
    compile("x = 1\nwhile x < 10\n  x = x + 1\nend\n");
}

#[test]
fn assignment_infers_and_then_enforces_the_type() {
    let error = compile_error("x = 1\nx = `text`\n");
    assert_eq!(error.kind(), ErrorKind::TypeError);
}

#[test]
fn rebinding_may_not_override_a_declared_type() {
    let error = compile_error("x:Int = 1\nx:String = `a`\n");
    assert_eq!(error.kind(), ErrorKind::TypeError);
}

#[test]
fn constants_cannot_be_reassigned() {
    let error = compile_error("const x = 1\nx = 2\n");
    assert_eq!(error.kind(), ErrorKind::TypeError);
}

#[test]
fn casts_select_the_overload_by_return_type() {
    let (ir, module, builtin) = compile("x = 1 as Real\ny = 1 as String\n");
    let real = builtin_class(&ir, builtin, "Real");
    let string = builtin_class(&ir, builtin, "String");

    let instructions = main_instructions(&ir, module);
    let variable_type = |assignment: NodeId| -> NodeId {
        match ir.kind(assignment) {
            NodeKind::Assignment(a) => match ir.kind(a.variable) {
                NodeKind::Variable(v) => ir.resolve_value(v.ty.unwrap()),
                _ => panic!("expected variable"),
            },
            _ => panic!("expected assignment"),
        }
    };
    assert_eq!(variable_type(instructions[0]), real);
    assert_eq!(variable_type(instructions[1]), string);
}

#[test]
fn methods_close_over_self() {
    let (ir, module, builtin) = compile(
        "class Counter\n  count:Int\n  def value() -> Int\n    return self.count\n  end\n  new(start:Int)\n    count = start\n  end\nend\n",
    );
    let class = module_child(&ir, module, "Counter");
    let int = builtin_class(&ir, builtin, "Int");
    match ir.kind(class) {
        NodeKind::Class(c) => {
            let count = c.instance_context.get("count").unwrap();
            match ir.kind(count) {
                NodeKind::Variable(v) => {
                    assert_eq!(ir.resolve_value(v.ty.unwrap()), int);
                }
                _ => panic!("expected variable attribute"),
            }
        }
        _ => panic!("expected class"),
    }
}

#[test]
fn import_aliases_bind_in_scope() {
    let (ir, module, builtin) = compile("import io as console\nconsole.print(`hi`)\n");
    let instructions = main_instructions(&ir, module);
    let io = ir
        .local_context(builtin)
        .and_then(|context| context.get("io"))
        .unwrap();
    match ir.kind(instructions[1]) {
        NodeKind::Call(c) => match ir.kind(c.called) {
            NodeKind::Attribute(a) => {
                let base = match ir.kind(a.value) {
                    NodeKind::Reference(r) => r.value.unwrap(),
                    _ => panic!("expected reference base"),
                };
                assert_eq!(base, io);
            }
            _ => panic!("expected attribute"),
        },
        _ => panic!("expected call"),
    }
    // The alias must not steal ownership of the aliased module.
    assert_eq!(ir.owner(io), Some(builtin));
}

#[test]
fn relative_imports_are_left_to_the_driver() {
    compile("import ..sibling.helper\n");
}

#[test]
fn verification_is_idempotent() {
    let code = Code::from("def f() -> Int\n  return 1\nend\nf()\n");
    let mut ir = Ir::new();
    let builtin = builtins::install(&mut ir);
    let module = Parser::new(Lexer::new(&code)).parse_unit(&mut ir).unwrap();

    Verifier::new(&mut ir, builtin).verify_module(module).unwrap();
    let size_after_first = ir.len();
    Verifier::new(&mut ir, builtin).verify_module(module).unwrap();
    assert_eq!(ir.len(), size_after_first);
}

#[test]
fn shadowing_a_builtin_name_is_ambiguous() {
    // `io` is bound both at module level and in builtins.
    let error = compile_error("def io() end\nio\n");
    assert_eq!(error.kind(), ErrorKind::AmbiguousReference);
}

#[test]
fn builtin_arithmetic_resolves() {
    let (ir, module, builtin) = compile("x = 1 + 2 * 3\n");
    let int = builtin_class(&ir, builtin, "Int");
    let instructions = main_instructions(&ir, module);
    match ir.kind(instructions[0]) {
        NodeKind::Assignment(a) => match ir.kind(a.variable) {
            NodeKind::Variable(v) => {
                // The inferred type is the Int return of the builtin `+`.
                assert_eq!(ir.resolve_value(v.ty.unwrap()), int);
            }
            _ => panic!("expected variable"),
        },
        _ => panic!("expected assignment"),
    }
}
