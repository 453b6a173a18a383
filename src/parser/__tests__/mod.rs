use crate::ir::{FunctionKind, Ir, LiteralValue, NodeId, NodeKind};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::{Code, CompileError, ErrorKind};

fn parse(source: &str) -> (Ir, NodeId) {
    let code = Code::from(source);
    let mut ir = Ir::new();
    let module = Parser::new(Lexer::new(&code))
        .parse_unit(&mut ir)
        .unwrap_or_else(|error| panic!("parse failed: {}", error));
    (ir, module)
}

fn parse_error(source: &str) -> CompileError {
    let code = Code::from(source);
    let mut ir = Ir::new();
    match Parser::new(Lexer::new(&code)).parse_unit(&mut ir) {
        Ok(_) => panic!("parsing should fail"),
        Err(error) => error,
    }
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

/// The `(operation, lhs, arguments)` triple of an operator call.
fn operation_call(ir: &Ir, id: NodeId) -> (String, NodeId, Vec<NodeId>) {
    let call = match ir.kind(id) {
        NodeKind::Call(c) => c,
        other => panic!("expected call, got {}", other.label()),
    };
    match ir.kind(call.called) {
        NodeKind::Attribute(a) => (a.name.clone(), a.value, call.arguments.clone()),
        other => panic!("expected attribute callee, got {}", other.label()),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let (ir, module) = parse("1 + 2 * 3\n");
    let instructions = main_instructions(&ir, module);
    assert_eq!(instructions.len(), 1);

    let (name, lhs, arguments) = operation_call(&ir, instructions[0]);
    assert_eq!(name, "+");
    assert!(matches!(
        ir.kind(lhs),
        NodeKind::Literal(l) if l.value == LiteralValue::Int(1)
    ));

    let (inner, lhs, arguments_inner) = operation_call(&ir, arguments[0]);
    assert_eq!(inner, "*");
    assert!(matches!(
        ir.kind(lhs),
        NodeKind::Literal(l) if l.value == LiteralValue::Int(2)
    ));
    assert!(matches!(
        ir.kind(arguments_inner[0]),
        NodeKind::Literal(l) if l.value == LiteralValue::Int(3)
    ));
}

#[test]
fn binary_operators_are_left_associative() {
    let (ir, module) = parse("1 - 2 - 3\n");
    let instructions = main_instructions(&ir, module);

    let (name, lhs, _) = operation_call(&ir, instructions[0]);
    assert_eq!(name, "-");
    let (inner, _, _) = operation_call(&ir, lhs);
    assert_eq!(inner, "-");
}

#[test]
fn comparison_binds_loosest() {
    let (ir, module) = parse("1 + 2 < 3 * 4\n");
    let instructions = main_instructions(&ir, module);
    let (name, lhs, arguments) = operation_call(&ir, instructions[0]);
    assert_eq!(name, "<");
    assert_eq!(operation_call(&ir, lhs).0, "+");
    assert_eq!(operation_call(&ir, arguments[0]).0, "*");
}

#[test]
fn prefix_operators_apply_innermost_first() {
    let (ir, module) = parse("-x\n");
    let instructions = main_instructions(&ir, module);
    let (name, lhs, arguments) = operation_call(&ir, instructions[0]);
    assert_eq!(name, "-");
    assert!(arguments.is_empty());
    assert!(matches!(ir.kind(lhs), NodeKind::Reference(r) if r.name == "x"));
}

#[test]
fn casts_carry_a_return_type_hint() {
    let (ir, module) = parse("x as Real\n");
    let instructions = main_instructions(&ir, module);
    let call = match ir.kind(instructions[0]) {
        NodeKind::Call(c) => c,
        _ => panic!("expected call"),
    };
    assert!(call.arguments.is_empty());
    let hint = call.return_type.expect("cast must carry a hint");
    assert!(matches!(ir.kind(hint), NodeKind::Reference(r) if r.name == "Real"));
    match ir.kind(call.called) {
        NodeKind::Attribute(a) => assert_eq!(a.name, "as"),
        _ => panic!("expected attribute callee"),
    }
}

#[test]
fn while_lowers_to_loop_with_inverted_guard() {
    let (ir, module) = parse("while x\nend\n");
    let instructions = main_instructions(&ir, module);
    let body = match ir.kind(instructions[0]) {
        NodeKind::Loop(l) => l.instructions.clone(),
        _ => panic!("expected loop"),
    };
    match ir.kind(body[0]) {
        NodeKind::Branch(b) => {
            assert!(b.on_true.is_empty());
            assert_eq!(b.on_false.len(), 1);
            assert!(matches!(ir.kind(b.on_false[0]), NodeKind::Break(_)));
        }
        _ => panic!("expected guard branch"),
    }
}

#[test]
fn import_collects_leading_dots_and_alias() {
    let (ir, module) = parse("import ..a.b as c\n");
    let instructions = main_instructions(&ir, module);
    match ir.kind(instructions[0]) {
        NodeKind::Import(i) => {
            assert_eq!(i.path, vec![".", ".", "a", "b"]);
            assert_eq!(i.alias.as_deref(), Some("c"));
        }
        _ => panic!("expected import"),
    }
}

#[test]
fn assignment_is_detected_within_the_lookahead_window() {
    let (ir, module) = parse("const x:Int = 1\n");
    let instructions = main_instructions(&ir, module);
    match ir.kind(instructions[0]) {
        NodeKind::Assignment(a) => match ir.kind(a.variable) {
            NodeKind::Variable(v) => {
                assert_eq!(v.name, "x");
                assert!(v.constant);
                assert!(v.ty.is_some());
            }
            _ => panic!("expected variable"),
        },
        _ => panic!("expected assignment"),
    }
}

#[test]
fn assignment_detection_stops_at_newlines() {
    let (ir, module) = parse("x\ny = 1\n");
    let instructions = main_instructions(&ir, module);
    assert!(matches!(ir.kind(instructions[0]), NodeKind::Reference(_)));
    assert!(matches!(ir.kind(instructions[1]), NodeKind::Assignment(_)));
}

#[test]
fn equality_is_not_an_assignment() {
    let (ir, module) = parse("x == 1\n");
    let instructions = main_instructions(&ir, module);
    assert!(matches!(ir.kind(instructions[0]), NodeKind::Call(_)));
}

#[test]
fn named_method_with_defaults_synthesizes_overload_chain() {
    let (ir, module) = parse("def f(a:Int, b:Int = 1, c:Int = 2) return a end\n");
    let method = module_child(&ir, module, "f");
    let overloads = match ir.kind(method) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected method"),
    };
    assert_eq!(overloads.len(), 3);

    let arity = |id: NodeId| match ir.kind(id) {
        NodeKind::Function(f) => f.arguments.len(),
        _ => panic!("expected function"),
    };
    assert_eq!(arity(overloads[0]), 3);
    assert_eq!(arity(overloads[1]), 2);
    assert_eq!(arity(overloads[2]), 1);

    // The shorter overloads forward to the next longer one.
    for (index, &overload) in overloads.iter().enumerate().skip(1) {
        let instructions = match ir.kind(overload) {
            NodeKind::Function(f) => f.instructions.clone(),
            _ => panic!("expected function"),
        };
        assert_eq!(instructions.len(), 1);
        match ir.kind(instructions[0]) {
            NodeKind::Call(c) => {
                assert_eq!(c.called, overloads[index - 1]);
                assert_eq!(c.arguments.len(), arity(overloads[index - 1]));
            }
            _ => panic!("expected forwarding call"),
        }
    }
}

#[test]
fn defaults_must_be_a_trailing_suffix() {
    let error = parse_error("def f(a:Int = 1, b:Int) end\n");
    assert_eq!(error.kind(), ErrorKind::SyntaxError);
}

#[test]
fn operator_method_shapes() {
    let (ir, module) = parse(
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
    match ir.kind(overloads[0]) {
        NodeKind::Function(f) => assert_eq!(f.arguments.len(), 1),
        _ => panic!("expected function"),
    }

    let constructors = match ir.kind(constructor) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected constructor method"),
    };
    assert_eq!(constructors.len(), 1);
    match ir.kind(constructors[0]) {
        NodeKind::Function(f) => {
            assert_eq!(f.kind, FunctionKind::Constructor);
            assert_eq!(f.arguments.len(), 1);
        }
        _ => panic!("expected constructor function"),
    }
}

#[test]
fn unary_and_cast_method_shapes() {
    let (ir, module) = parse("def ! self -> Bool\nend\ndef self as Real\nend\n");
    let negation = module_child(&ir, module, "!");
    match ir.kind(negation) {
        NodeKind::Method(m) => assert_eq!(m.overload_context.len(), 1),
        _ => panic!("expected method"),
    }
    let cast = module_child(&ir, module, "as");
    let overloads = match ir.kind(cast) {
        NodeKind::Method(m) => m.overload_context.values(),
        _ => panic!("expected method"),
    };
    match ir.kind(overloads[0]) {
        NodeKind::Function(f) => match ir.kind(f.ty) {
            NodeKind::FunctionType(ft) => {
                let ret = ft.return_type.unwrap();
                assert!(matches!(ir.kind(ret), NodeKind::Reference(r) if r.name == "Real"));
            }
            _ => panic!("expected function type"),
        },
        _ => panic!("expected function"),
    }
}

#[test]
fn invalid_binary_operator_definition_fails() {
    let error = parse_error("def self ! rhs:Int end\n");
    assert_eq!(error.kind(), ErrorKind::SyntaxError);
}

#[test]
fn duplicate_methods_assimilate() {
    let (ir, module) = parse("def g(x:Int) end\ndef g(x:Int, y:Int) end\n");
    let method = module_child(&ir, module, "g");
    match ir.kind(method) {
        NodeKind::Method(m) => {
            assert_eq!(m.overload_context.len(), 2);
            let names: Vec<&str> = m.overload_context.iter().map(|(name, _)| name).collect();
            assert_eq!(names, vec!["0", "1"]);
        }
        _ => panic!("expected method"),
    }
}

#[test]
fn inline_modules_nest() {
    let (ir, module) = parse("module util\n  def helper() end\nend\n");
    let nested = module_child(&ir, module, "util");
    match ir.kind(nested) {
        NodeKind::Module(m) => {
            assert!(m.context.contains("helper"));
            assert!(m.main.is_some());
        }
        _ => panic!("expected module"),
    }
}

#[test]
fn real_literal_forms() {
    let (ir, module) = parse("1.5\n.5\n");
    let instructions = main_instructions(&ir, module);
    let real = |id: NodeId| match ir.kind(id) {
        NodeKind::Literal(l) => match l.value {
            LiteralValue::Real(value) => value,
            _ => panic!("expected real"),
        },
        _ => panic!("expected literal"),
    };
    assert_eq!(real(instructions[0]), 1.5);
    assert_eq!(real(instructions[1]), 0.5);
}

#[test]
fn format_string_escapes_decode() {
    let (ir, module) = parse("\"a\\nb\"\n");
    let instructions = main_instructions(&ir, module);
    match ir.kind(instructions[0]) {
        NodeKind::Literal(l) => assert_eq!(l.value, LiteralValue::Str("a\nb".to_string())),
        _ => panic!("expected literal"),
    }
}

#[test]
fn unterminated_method_fails() {
    let error = parse_error("def f()\nreturn 1\n");
    assert_eq!(error.kind(), ErrorKind::SyntaxError);
}

#[test]
fn unexpected_token_fails() {
    let error = parse_error(") \n");
    assert_eq!(error.kind(), ErrorKind::SyntaxError);
}

// Structural equivalence of two trees, ignoring node identities and
// verification state. The visited set breaks the constructor cycle (a
// constructor's return type points back at its class).
fn equivalent(a: &Ir, x: NodeId, b: &Ir, y: NodeId) -> bool {
    let mut seen = std::collections::HashSet::new();
    node_equivalent(a, x, b, y, &mut seen)
}

fn all_equivalent(
    a: &Ir,
    xs: &[NodeId],
    b: &Ir,
    ys: &[NodeId],
    seen: &mut std::collections::HashSet<(usize, usize)>,
) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .zip(ys.iter())
            .all(|(&x, &y)| node_equivalent(a, x, b, y, seen))
}

fn opt_equivalent(
    a: &Ir,
    x: Option<NodeId>,
    b: &Ir,
    y: Option<NodeId>,
    seen: &mut std::collections::HashSet<(usize, usize)>,
) -> bool {
    match (x, y) {
        (None, None) => true,
        (Some(x), Some(y)) => node_equivalent(a, x, b, y, seen),
        _ => false,
    }
}

fn context_equivalent(
    a: &Ir,
    x: &crate::ir::Context,
    b: &Ir,
    y: &crate::ir::Context,
    seen: &mut std::collections::HashSet<(usize, usize)>,
) -> bool {
    x.len() == y.len()
        && x.iter()
            .zip(y.iter())
            .all(|((n1, c1), (n2, c2))| n1 == n2 && node_equivalent(a, c1, b, c2, seen))
}

fn node_equivalent(
    a: &Ir,
    x: NodeId,
    b: &Ir,
    y: NodeId,
    seen: &mut std::collections::HashSet<(usize, usize)>,
) -> bool {
    use NodeKind::*;

    if !seen.insert((x.0, y.0)) {
        return true;
    }

    match (a.kind(x), b.kind(y)) {
        (Module(m1), Module(m2)) => {
            m1.name == m2.name
                && opt_equivalent(a, m1.main, b, m2.main, seen)
                && context_equivalent(a, &m1.context, b, &m2.context, seen)
        }
        (Function(f1), Function(f2)) => {
            f1.kind == f2.kind
                && all_equivalent(a, &f1.arguments, b, &f2.arguments, seen)
                && all_equivalent(a, &f1.instructions, b, &f2.instructions, seen)
                && node_equivalent(a, f1.ty, b, f2.ty, seen)
        }
        (FunctionType(t1), FunctionType(t2)) => {
            all_equivalent(a, &t1.arguments, b, &t2.arguments, seen)
                && opt_equivalent(a, t1.return_type, b, t2.return_type, seen)
        }
        (Method(m1), Method(m2)) => {
            m1.name == m2.name
                && context_equivalent(a, &m1.overload_context, b, &m2.overload_context, seen)
        }
        (Class(c1), Class(c2)) => {
            c1.name == c2.name
                && opt_equivalent(a, c1.constructor, b, c2.constructor, seen)
                && context_equivalent(a, &c1.instance_context, b, &c2.instance_context, seen)
        }
        (DependentType(_), DependentType(_)) => true,
        (Variable(v1), Variable(v2)) => {
            v1.name == v2.name
                && v1.constant == v2.constant
                && opt_equivalent(a, v1.ty, b, v2.ty, seen)
        }
        (Assignment(s1), Assignment(s2)) => {
            node_equivalent(a, s1.variable, b, s2.variable, seen)
                && node_equivalent(a, s1.value, b, s2.value, seen)
        }
        (Call(c1), Call(c2)) => {
            node_equivalent(a, c1.called, b, c2.called, seen)
                && all_equivalent(a, &c1.arguments, b, &c2.arguments, seen)
                && opt_equivalent(a, c1.return_type, b, c2.return_type, seen)
        }
        (Literal(l1), Literal(l2)) => {
            l1.value == l2.value && node_equivalent(a, l1.ty, b, l2.ty, seen)
        }
        (Reference(r1), Reference(r2)) => r1.name == r2.name,
        (Attribute(a1), Attribute(a2)) => {
            a1.name == a2.name && node_equivalent(a, a1.value, b, a2.value, seen)
        }
        (Return(r1), Return(r2)) => opt_equivalent(a, r1.value, b, r2.value, seen),
        (Branch(b1), Branch(b2)) => {
            node_equivalent(a, b1.condition, b, b2.condition, seen)
                && all_equivalent(a, &b1.on_true, b, &b2.on_true, seen)
                && all_equivalent(a, &b1.on_false, b, &b2.on_false, seen)
        }
        (Loop(l1), Loop(l2)) => all_equivalent(a, &l1.instructions, b, &l2.instructions, seen),
        (Break(_), Break(_)) => true,
        (Comment(c1), Comment(c2)) => c1.text == c2.text,
        (Import(i1), Import(i2)) => i1.path == i2.path && i1.alias == i2.alias,
        _ => false,
    }
}

#[test]
fn pretty_printing_round_trips() {
    let source = "\
def greet(name:String) -> Int
  return io.print(name)
end
class Pair
  x:Int
  def self + other:Pair -> Pair
    return new Pair(1)
  end
  new(a:Int)
  end
end
import io
x = 1
while x < 10
  x = x + 1
end
if x == 10
  io.print(`done`)
else
  io.print(\"odd\\n\")
end
greet(`hi`)
";
    let (ir, module) = parse(source);
    let rendered = format!("{}", ir.display(module));
    let (reparsed, module_again) = parse(&rendered);
    assert!(
        equivalent(&ir, module, &reparsed, module_again),
        "pretty printed source did not round trip:\n{}",
        rendered
    );
}
