// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! CellML XML (or an in-memory model) back to CellML Text.
//!
//! Arithmetic is always printed fully bracketed, `(a + b)`, so that the
//! output reparses to the same tree shape regardless of precedence.

use tracing::warn;

use crate::ast::{Apply, Cn, CnValue, Component, MathNode, Model, Operator, Piecewise, Units};
use crate::token::is_keyword;
use crate::xml;

const INDENT: &str = "    ";

fn props(pairs: &[(&str, Option<&String>)]) -> String {
    let set: Vec<String> = pairs
        .iter()
        .filter_map(|(key, value)| value.map(|v| format!("{key}: {v}")))
        .collect();
    if set.is_empty() {
        String::new()
    } else {
        format!(" {{{}}}", set.join(", "))
    }
}

/// Names come through as-is; a keyword here won't reparse.
fn name(ident: &str) -> &str {
    if is_keyword(ident) {
        warn!(keyword = ident, "name is a CellML Text keyword; output will not reparse");
    }
    ident
}

fn relational_symbol(op: &Operator) -> Option<&'static str> {
    let sym = match op {
        Operator::Eq => "==",
        Operator::Neq => "!=",
        Operator::Lt => "<",
        Operator::Leq => "<=",
        Operator::Gt => ">",
        Operator::Geq => ">=",
        _ => return None,
    };
    Some(sym)
}

fn cn_text(cn: &Cn) -> String {
    let value = match &cn.value {
        CnValue::Real(value) => value.clone(),
        CnValue::ENotation { mantissa, exponent } => format!("{mantissa}e{exponent}"),
    };
    match cn.units {
        Some(ref units) => format!("{value} {{units: {units}}}"),
        None => value,
    }
}

struct TextGenerator {
    out: String,
    depth: usize,
}

impl TextGenerator {
    fn new() -> Self {
        TextGenerator {
            out: String::new(),
            depth: 0,
        }
    }

    fn indent(&self) -> String {
        INDENT.repeat(self.depth)
    }

    fn line(&mut self, text: &str) {
        let indent = self.indent();
        self.out.push_str(&indent);
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn model(&mut self, model: &Model) {
        match model.name {
            Some(ref model_name) => self.line(&format!("def model {} as", name(model_name))),
            None => self.line("def model as"),
        }

        self.depth += 1;
        for units in model.units.iter() {
            self.units(units);
        }
        for component in model.components.iter() {
            self.component(component);
        }
        self.depth -= 1;

        // exactly one blank line before the closing enddef
        while self.out.ends_with("\n\n") {
            self.out.pop();
        }
        self.blank();
        self.line("enddef;");
    }

    fn units(&mut self, units: &Units) {
        self.line(&format!("def unit {} as", name(&units.name)));
        self.depth += 1;
        for unit in units.units.iter() {
            let props = props(&[
                ("prefix", unit.prefix.as_ref()),
                ("exponent", unit.exponent.as_ref()),
                ("multiplier", unit.multiplier.as_ref()),
            ]);
            self.line(&format!("unit {}{};", name(&unit.units), props));
        }
        self.depth -= 1;
        self.line("enddef;");
        self.blank();
    }

    fn component(&mut self, component: &Component) {
        self.line(&format!("def comp {} as", name(&component.name)));
        self.depth += 1;
        for var in component.variables.iter() {
            let props = props(&[
                ("init", var.initial_value.as_ref()),
                ("interface", var.interface.as_ref()),
            ]);
            self.line(&format!(
                "var {}: {}{};",
                name(&var.name),
                name(&var.units),
                props
            ));
        }
        for math in component.maths.iter() {
            for node in math.children.iter() {
                self.statement(node);
            }
        }
        self.depth -= 1;
        self.line("enddef;");
        self.blank();
    }

    fn statement(&mut self, node: &MathNode) {
        let text = match node.as_equation() {
            Some((lhs, rhs)) => {
                let lhs = self.operand(lhs);
                let rhs = self.operand(rhs);
                format!("{lhs} = {rhs};")
            }
            None => format!("{};", self.expr(node)),
        };
        self.line(&text);
    }

    /// An expression in a position where the grammar only accepts
    /// arithmetic: comparisons and logical chains get brackets.
    fn operand(&mut self, node: &MathNode) -> String {
        let text = self.expr(node);
        match node {
            MathNode::Apply(apply) if apply.op.is_relational() || apply.op.is_logical() => {
                format!("({text})")
            }
            _ => text,
        }
    }

    fn expr(&mut self, node: &MathNode) -> String {
        match node {
            MathNode::Apply(apply) => self.apply(apply),
            MathNode::Ci(ci) => name(ci).to_owned(),
            MathNode::Cn(cn) => cn_text(cn),
            MathNode::Constant(c) => c.name().to_owned(),
            MathNode::Piecewise(piecewise) => self.piecewise(piecewise),
            MathNode::Bvar(inner) => self.expr(inner),
        }
    }

    fn joined(&mut self, args: &[MathNode], sep: &str) -> String {
        let args: Vec<String> = args.iter().map(|arg| self.operand(arg)).collect();
        args.join(sep)
    }

    fn call(&mut self, name: &str, args: &[MathNode]) -> String {
        let args: Vec<String> = args.iter().map(|arg| self.expr(arg)).collect();
        format!("{}({})", name, args.join(", "))
    }

    fn apply(&mut self, apply: &Apply) -> String {
        let args = &apply.args;
        if let Some(sym) = relational_symbol(&apply.op) {
            return self.joined(args, &format!(" {sym} "));
        }

        match &apply.op {
            Operator::Plus => format!("({})", self.joined(args, " + ")),
            Operator::Minus if args.len() == 1 => format!("-{}", self.operand(&args[0])),
            Operator::Minus => format!("({})", self.joined(args, " - ")),
            Operator::Times => format!("({})", self.joined(args, "*")),
            Operator::Divide => format!("({})", self.joined(args, "/")),
            Operator::And => self.joined(args, " and "),
            Operator::Or => self.joined(args, " or "),
            Operator::Diff => match apply.derivative_parts() {
                Some((dep, indep)) => {
                    let dep = self.expr(dep);
                    let indep = self.expr(indep);
                    format!("ode({dep}, {indep})")
                }
                None => self.call("diff", args),
            },
            Operator::Power => self.call("pow", args),
            Operator::Root => self.call("sqrt", args),
            Operator::Other(name) => {
                warn!(operator = %name, "operator has no CellML Text spelling");
                self.call(name, args)
            }
            op => self.call(op.name(), args),
        }
    }

    fn piecewise(&mut self, piecewise: &Piecewise) -> String {
        let mut text = "sel\n".to_owned();

        self.depth += 1;
        let indent = self.indent();
        for piece in piecewise.pieces.iter() {
            let condition = self.expr(&piece.condition);
            let value = self.operand(&piece.value);
            text.push_str(&format!("{indent}case {condition}: {value};\n"));
        }
        if let Some(ref otherwise) = piecewise.otherwise {
            let value = self.operand(otherwise);
            text.push_str(&format!("{indent}otherwise: {value};\n"));
        }
        self.depth -= 1;

        text.push_str(&self.indent());
        text.push_str("endsel");
        text
    }
}

/// Render a model as CellML Text. The output ends with a newline.
pub fn generate_model(model: &Model) -> String {
    let mut generator = TextGenerator::new();
    generator.model(model);
    generator.out
}

/// Render a single math node as a CellML Text expression.
pub fn generate_expr(node: &MathNode) -> String {
    let mut generator = TextGenerator::new();
    generator.expr(node)
}

/// Convert a CellML XML document to CellML Text.
///
/// Failures don't produce a structured error: the result is a single
/// `// Error: ...` comment line instead, so a live preview can show it
/// in place of the text.
pub fn generate(input: &str) -> String {
    match xml::read_model(input) {
        Ok(model) => generate_model(&model),
        Err(err) => {
            let details = err.get_details().unwrap_or_else(|| err.to_string());
            format!("// Error: {}", details.replace('\n', " "))
        }
    }
}
