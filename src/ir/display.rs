use super::{FunctionKind, Ir, LiteralValue, NodeId, NodeKind};
use ptree::TreeItem;
use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Renders a node back to surface syntax.
///
/// The rendering is parseable: feeding it back through the parser yields a
/// structurally equivalent tree. Operator calls are emitted in operator
/// notation with explicit grouping, so associativity survives the trip.
pub struct SourceOf<'i> {
    ir: &'i Ir,
    id: NodeId,
}

/// Adapter printing an IR subtree with `ptree`, one line per node.
#[derive(Clone)]
pub struct IrTree<'i> {
    ir: &'i Ir,
    id: NodeId,
}

impl Ir {
    /// A [Display] wrapper rendering the node as surface syntax.
    pub fn display(&self, id: NodeId) -> SourceOf {
        SourceOf { ir: self, id }
    }

    /// Pretty print the node tree to standard output.
    pub fn print_tree(&self, id: NodeId) -> std::io::Result<()> {
        ptree::print_tree(&IrTree { ir: self, id })
    }
}

impl<'i> Display for SourceOf<'i> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.ir.kind(self.id) {
            NodeKind::Module(m) if m.name == "main" => render_unit(f, self.ir, self.id),
            kind if is_instruction(kind) => render_line(f, self.ir, self.id, 0),
            _ => render_value(f, self.ir, self.id),
        }
    }
}

fn is_instruction(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Assignment(_)
            | NodeKind::Return(_)
            | NodeKind::Branch(_)
            | NodeKind::Loop(_)
            | NodeKind::Break(_)
            | NodeKind::Comment(_)
            | NodeKind::Import(_)
            | NodeKind::Method(_)
            | NodeKind::Class(_)
            | NodeKind::Module(_)
    )
}

fn is_binary_name(name: &str) -> bool {
    matches!(
        name,
        "==" | "!=" | "<" | "<=" | ">" | ">=" | "+" | "-" | "*" | "/" | "//" | "%"
    )
}

fn is_unary_name(name: &str) -> bool {
    matches!(name, "+" | "-" | "!")
}

fn indented(f: &mut Formatter<'_>, indent: usize) -> FmtResult {
    for _ in 0..indent {
        write!(f, "  ")?;
    }
    Ok(())
}

fn render_unit(f: &mut Formatter<'_>, ir: &Ir, module: NodeId) -> FmtResult {
    let (children, main) = match ir.kind(module) {
        NodeKind::Module(m) => (m.context.values(), m.main),
        _ => return Ok(()),
    };
    for child in children {
        render_line(f, ir, child, 0)?;
    }
    if let Some(main) = main {
        if let NodeKind::Function(function) = ir.kind(main) {
            for &instruction in &function.instructions {
                render_line(f, ir, instruction, 0)?;
            }
        }
    }
    Ok(())
}

fn render_line(f: &mut Formatter<'_>, ir: &Ir, id: NodeId, indent: usize) -> FmtResult {
    match ir.kind(id) {
        NodeKind::Method(m) => {
            for overload in m.overload_context.values() {
                render_def(f, ir, &m.name, overload, indent)?;
            }
            Ok(())
        }
        NodeKind::Class(c) => {
            indented(f, indent)?;
            writeln!(f, "class {}", c.name)?;
            for child in c.instance_context.values() {
                render_line(f, ir, child, indent + 1)?;
            }
            if let Some(constructor) = c.constructor {
                if let NodeKind::Method(m) = ir.kind(constructor) {
                    for overload in m.overload_context.values() {
                        render_def(f, ir, "", overload, indent + 1)?;
                    }
                }
            }
            indented(f, indent)?;
            writeln!(f, "end")
        }
        NodeKind::Module(m) => {
            indented(f, indent)?;
            writeln!(f, "module {}", m.name)?;
            for child in m.context.values() {
                render_line(f, ir, child, indent + 1)?;
            }
            if let Some(main) = m.main {
                if let NodeKind::Function(function) = ir.kind(main) {
                    for &instruction in &function.instructions {
                        render_line(f, ir, instruction, indent + 1)?;
                    }
                }
            }
            indented(f, indent)?;
            writeln!(f, "end")
        }
        NodeKind::Assignment(a) => {
            indented(f, indent)?;
            render_declaration(f, ir, a.variable)?;
            write!(f, " = ")?;
            render_value(f, ir, a.value)?;
            writeln!(f)
        }
        NodeKind::Return(r) => {
            indented(f, indent)?;
            match r.value {
                Some(value) => {
                    write!(f, "return ")?;
                    render_value(f, ir, value)?;
                    writeln!(f)
                }
                None => writeln!(f, "return"),
            }
        }
        NodeKind::Branch(b) => {
            indented(f, indent)?;
            write!(f, "if ")?;
            render_value(f, ir, b.condition)?;
            writeln!(f)?;
            for &instruction in &b.on_true {
                render_line(f, ir, instruction, indent + 1)?;
            }
            if !b.on_false.is_empty() {
                indented(f, indent)?;
                writeln!(f, "else")?;
                for &instruction in &b.on_false {
                    render_line(f, ir, instruction, indent + 1)?;
                }
            }
            indented(f, indent)?;
            writeln!(f, "end")
        }
        NodeKind::Loop(l) => {
            indented(f, indent)?;
            writeln!(f, "loop")?;
            for &instruction in &l.instructions {
                render_line(f, ir, instruction, indent + 1)?;
            }
            indented(f, indent)?;
            writeln!(f, "end")
        }
        NodeKind::Break(_) => {
            indented(f, indent)?;
            writeln!(f, "break")
        }
        NodeKind::Comment(c) => {
            indented(f, indent)?;
            writeln!(f, "#{}", c.text)
        }
        NodeKind::Import(i) => {
            indented(f, indent)?;
            write!(f, "import ")?;
            let mut separate = false;
            for segment in &i.path {
                if segment == "." {
                    write!(f, ".")?;
                } else {
                    if separate {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", segment)?;
                    separate = true;
                }
            }
            match &i.alias {
                Some(alias) => writeln!(f, " as {}", alias),
                None => writeln!(f),
            }
        }
        NodeKind::Variable(_) => {
            indented(f, indent)?;
            render_declaration(f, ir, id)?;
            writeln!(f)
        }
        _ => {
            indented(f, indent)?;
            render_value(f, ir, id)?;
            writeln!(f)
        }
    }
}

fn render_def(
    f: &mut Formatter<'_>,
    ir: &Ir,
    name: &str,
    overload: NodeId,
    indent: usize,
) -> FmtResult {
    let function = match ir.kind(overload) {
        NodeKind::Function(function) => function,
        _ => return Ok(()),
    };
    let return_type = match ir.kind(function.ty) {
        NodeKind::FunctionType(ft) => ft.return_type,
        _ => None,
    };

    indented(f, indent)?;
    if function.kind == FunctionKind::Constructor {
        write!(f, "new(")?;
        render_arguments(f, ir, &function.arguments)?;
        writeln!(f, ")")?;
    } else if name == "as" {
        write!(f, "def self as ")?;
        if let Some(ty) = return_type {
            render_value(f, ir, ty)?;
        }
        writeln!(f)?;
    } else if is_binary_name(name) && function.arguments.len() == 1 {
        write!(f, "def self {} ", name)?;
        render_arguments(f, ir, &function.arguments)?;
        render_return(f, ir, return_type)?;
        writeln!(f)?;
    } else if is_unary_name(name) && function.arguments.is_empty() {
        write!(f, "def {} self", name)?;
        render_return(f, ir, return_type)?;
        writeln!(f)?;
    } else {
        write!(f, "def {}(", name)?;
        render_arguments(f, ir, &function.arguments)?;
        write!(f, ")")?;
        render_return(f, ir, return_type)?;
        writeln!(f)?;
    }

    for &instruction in &function.instructions {
        render_line(f, ir, instruction, indent + 1)?;
    }
    indented(f, indent)?;
    writeln!(f, "end")
}

fn render_return(f: &mut Formatter<'_>, ir: &Ir, return_type: Option<NodeId>) -> FmtResult {
    if let Some(ty) = return_type {
        write!(f, " -> ")?;
        render_value(f, ir, ty)?;
    }
    Ok(())
}

fn render_arguments(f: &mut Formatter<'_>, ir: &Ir, arguments: &[NodeId]) -> FmtResult {
    for (index, &argument) in arguments.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        render_declaration(f, ir, argument)?;
    }
    Ok(())
}

fn render_declaration(f: &mut Formatter<'_>, ir: &Ir, variable: NodeId) -> FmtResult {
    match ir.kind(variable) {
        NodeKind::Variable(v) => {
            if v.constant {
                write!(f, "const ")?;
            }
            write!(f, "{}", v.name)?;
            if let Some(ty) = v.ty {
                if !matches!(ir.kind(ty), NodeKind::DependentType(_)) {
                    write!(f, ":")?;
                    render_value(f, ir, ty)?;
                }
            }
            Ok(())
        }
        _ => render_value(f, ir, variable),
    }
}

fn render_value(f: &mut Formatter<'_>, ir: &Ir, id: NodeId) -> FmtResult {
    match ir.kind(id) {
        NodeKind::Reference(r) => write!(f, "{}", r.name),
        NodeKind::Attribute(a) => {
            render_value(f, ir, a.value)?;
            write!(f, ".{}", a.name)
        }
        NodeKind::Variable(v) => write!(f, "{}", v.name),
        NodeKind::Literal(l) => match &l.value {
            LiteralValue::Int(value) => write!(f, "{}", value),
            LiteralValue::Real(value) => write!(f, "{:?}", value),
            LiteralValue::Bool(value) => write!(f, "{}", value),
            LiteralValue::Str(value) => write!(f, "`{}`", value),
            LiteralValue::Bytes(value) => write!(f, "`{}`", String::from_utf8_lossy(value)),
        },
        NodeKind::Call(c) => {
            if let NodeKind::Attribute(a) = ir.kind(c.called) {
                if c.arguments.len() == 1 && is_binary_name(&a.name) {
                    write!(f, "(")?;
                    render_value(f, ir, a.value)?;
                    write!(f, " {} ", a.name)?;
                    render_value(f, ir, c.arguments[0])?;
                    return write!(f, ")");
                }
                if c.arguments.is_empty() && a.name == "as" {
                    if let Some(ty) = c.return_type {
                        write!(f, "(")?;
                        render_value(f, ir, a.value)?;
                        write!(f, " as ")?;
                        render_value(f, ir, ty)?;
                        return write!(f, ")");
                    }
                }
                if c.arguments.is_empty() && is_unary_name(&a.name) {
                    write!(f, "({}", a.name)?;
                    render_value(f, ir, a.value)?;
                    return write!(f, ")");
                }
            }
            render_value(f, ir, c.called)?;
            write!(f, "(")?;
            for (index, &argument) in c.arguments.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                render_value(f, ir, argument)?;
            }
            write!(f, ")")
        }
        NodeKind::Module(m) => write!(f, "{}", m.name),
        NodeKind::Class(c) => write!(f, "{}", c.name),
        NodeKind::Method(m) => write!(f, "{}", m.name),
        NodeKind::Function(function) => write!(f, "{}", function.name),
        NodeKind::ExternalFunction(function) => write!(f, "{}", function.name),
        NodeKind::FunctionType(ft) => {
            write!(f, "(")?;
            for (index, &argument) in ft.arguments.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                render_type(f, ir, argument)?;
            }
            write!(f, ")")?;
            if let Some(return_type) = ft.return_type {
                write!(f, " -> ")?;
                render_type(f, ir, return_type)?;
            }
            Ok(())
        }
        NodeKind::DependentType(d) => match d.target {
            Some(target) => render_type(f, ir, target),
            None => write!(f, "?"),
        },
        NodeKind::ModuleType(mt) => {
            write!(f, "module ")?;
            render_value(f, ir, mt.module)
        }
        _ => write!(f, "<{}>", ir.kind(id).label()),
    }
}

/// Render a type position node by the name of what it resolves to.
fn render_type(f: &mut Formatter<'_>, ir: &Ir, id: NodeId) -> FmtResult {
    let resolved = ir.resolve_value(id);
    match ir.kind(resolved) {
        NodeKind::Class(c) => write!(f, "{}", c.name),
        NodeKind::DependentType(d) => match d.target {
            Some(target) => render_type(f, ir, target),
            None => write!(f, "?"),
        },
        _ => render_value(f, ir, resolved),
    }
}

impl<'i> TreeItem for IrTree<'i> {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        let label = self.ir.kind(self.id).label();
        match self.ir.kind(self.id) {
            NodeKind::Literal(l) => write!(f, "{} {:?}", label, l.value),
            NodeKind::Reference(r) => write!(f, "{} {}", label, r.name),
            NodeKind::Attribute(a) => write!(f, "{} .{}", label, a.name),
            _ => match self.ir.name(self.id) {
                Some(name) => write!(f, "{} {}", label, name),
                None => write!(f, "{}", label),
            },
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        let ids: Vec<NodeId> = match self.ir.kind(self.id) {
            NodeKind::Module(m) => {
                let mut all = m.context.values();
                all.extend(m.main);
                all
            }
            NodeKind::Function(function) => {
                let mut all = function.arguments.clone();
                all.extend(function.instructions.iter().copied());
                all
            }
            NodeKind::Method(m) => m.overload_context.values(),
            NodeKind::Class(c) => {
                let mut all = c.instance_context.values();
                all.extend(c.constructor);
                all
            }
            NodeKind::Call(c) => {
                let mut all = vec![c.called];
                all.extend(c.arguments.iter().copied());
                all
            }
            NodeKind::Attribute(a) => vec![a.value],
            NodeKind::Assignment(a) => vec![a.variable, a.value],
            NodeKind::Return(r) => r.value.into_iter().collect(),
            NodeKind::Branch(b) => {
                let mut all = vec![b.condition];
                all.extend(b.on_true.iter().copied());
                all.extend(b.on_false.iter().copied());
                all
            }
            NodeKind::Loop(l) => l.instructions.clone(),
            NodeKind::FunctionType(ft) => {
                let mut all = ft.arguments.clone();
                all.extend(ft.return_type);
                all
            }
            _ => Vec::new(),
        };
        Cow::Owned(
            ids.into_iter()
                .map(|id| IrTree { ir: self.ir, id })
                .collect(),
        )
    }
}
