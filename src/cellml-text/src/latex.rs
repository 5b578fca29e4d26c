// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! LaTeX rendering of MathML trees for equation previews.
//!
//! Each node is rendered against the precedence its parent requires and
//! wrapped in `\left( \right)` when its own precedence is lower.

use std::collections::HashSet;

use lazy_static::lazy_static;
use tracing::warn;

use crate::ast::{Apply, Cn, CnValue, Constant, Math, MathNode, Operator, Piecewise};
use crate::xml;

const PREC_ATOM: u8 = 100;
const PREC_FUNCTION: u8 = 90;
const PREC_POWER: u8 = 80;
const PREC_TIMES: u8 = 70;
const PREC_PLUS: u8 = 60;
const PREC_RELATIONAL: u8 = 50;
const PREC_LOGICAL: u8 = 40;
const PREC_UNKNOWN: u8 = 0;

const MISSING: &str = "\\text{?}";

lazy_static! {
    static ref GREEK_LETTERS: HashSet<&'static str> = [
        "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
        "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi",
        "chi", "psi", "omega",
    ]
    .iter()
    .cloned()
    .collect();
}

/// Greek letters LaTeX has no command for, because they look like a
/// Latin letter: lowercase omicron and most capitals.
fn latin_lookalike(letter: &str, capital: bool) -> Option<&'static str> {
    let latin = match (letter, capital) {
        ("omicron", false) => "o",
        ("alpha", true) => "A",
        ("beta", true) => "B",
        ("epsilon", true) => "E",
        ("zeta", true) => "Z",
        ("eta", true) => "H",
        ("iota", true) => "I",
        ("kappa", true) => "K",
        ("mu", true) => "M",
        ("nu", true) => "N",
        ("omicron", true) => "O",
        ("rho", true) => "P",
        ("tau", true) => "T",
        ("chi", true) => "X",
        _ => return None,
    };
    Some(latin)
}

fn greek(part: &str) -> String {
    let lower = part.to_lowercase();
    if !GREEK_LETTERS.contains(lower.as_str()) {
        return part.to_owned();
    }
    let capital = part.chars().next().is_some_and(|c| c.is_uppercase());
    if let Some(latin) = latin_lookalike(&lower, capital) {
        return latin.to_owned();
    }
    if capital {
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => format!("\\{}{}", first.to_uppercase(), chars.as_str()),
            None => part.to_owned(),
        }
    } else {
        format!("\\{lower}")
    }
}

/// Formats a CellML identifier as a LaTeX symbol.
///
/// `_` separates the base name from subscripts: `V_m` becomes `V_{m}`,
/// `alpha_n` becomes `\alpha_{n}`. A third part becomes a superscript
/// unless it is a single character closing a three-part name, in which
/// case it is another subscript. A fourth part subscripts the
/// superscript, and anything after that joins the subscript list.
pub fn parse_identifier(name: &str) -> String {
    let parts: Vec<&str> = name.split('_').filter(|p| !p.is_empty()).collect();
    if parts.len() < 2 {
        return match parts.first() {
            Some(base) => greek(base),
            None => name.to_owned(),
        };
    }

    let base = greek(parts[0]);
    let mut subscripts = vec![greek(parts[1])];
    let mut superscript = None;

    if let Some(third) = parts.get(2) {
        if parts.len() == 3 && third.chars().count() == 1 {
            subscripts.push(greek(third));
        } else {
            let mut sup = greek(third);
            if let Some(fourth) = parts.get(3) {
                sup = format!("{}_{{{}}}", sup, greek(fourth));
            }
            superscript = Some(sup);
        }
    }
    subscripts.extend(parts.iter().skip(4).map(|p| greek(p)));

    let mut result = format!("{}_{{{}}}", base, subscripts.join(","));
    if let Some(sup) = superscript {
        result.push_str(&format!("^{{{sup}}}"));
    }
    result
}

fn constant(c: &Constant) -> &'static str {
    match c {
        Constant::Pi => "\\pi",
        Constant::ExponentialE => "e",
        Constant::Infinity => "\\infty",
        Constant::NotANumber => "\\mathrm{NaN}",
        Constant::True => "\\mathrm{true}",
        Constant::False => "\\mathrm{false}",
    }
}

fn cn(cn: &Cn) -> (String, u8) {
    match &cn.value {
        CnValue::Real(value) => (value.clone(), PREC_ATOM),
        CnValue::ENotation { mantissa, exponent } => {
            (format!("{mantissa} \\times 10^{{{exponent}}}"), PREC_TIMES)
        }
    }
}

fn relational_symbol(op: &Operator) -> Option<&'static str> {
    let sym = match op {
        Operator::Eq => "==",
        Operator::Neq => "\\neq",
        Operator::Lt => "<",
        Operator::Leq => "\\leq",
        Operator::Gt => ">",
        Operator::Geq => "\\geq",
        _ => return None,
    };
    Some(sym)
}

/// One-argument functions LaTeX has an operator command for.
fn function_command(op: &Operator) -> Option<&'static str> {
    let cmd = match op {
        Operator::Ln => "\\ln",
        Operator::Log => "\\log",
        Operator::Sin => "\\sin",
        Operator::Cos => "\\cos",
        Operator::Tan => "\\tan",
        Operator::Sec => "\\sec",
        Operator::Csc => "\\csc",
        Operator::Cot => "\\cot",
        Operator::Sinh => "\\sinh",
        Operator::Cosh => "\\cosh",
        Operator::Tanh => "\\tanh",
        Operator::Coth => "\\coth",
        Operator::Arcsin => "\\arcsin",
        Operator::Arccos => "\\arccos",
        Operator::Arctan => "\\arctan",
        _ => return None,
    };
    Some(cmd)
}

/// Whether a power base can go without brackets.
fn is_atomic_base(node: &MathNode) -> bool {
    match node {
        MathNode::Ci(_) => true,
        MathNode::Cn(cn) => matches!(cn.value, CnValue::Real(_)) && cn.is_non_negative(),
        _ => false,
    }
}

struct LatexGenerator {}

impl LatexGenerator {
    fn walk(&mut self, node: &MathNode, context: u8) -> String {
        let (text, prec) = self.render(node);
        if prec < context {
            format!("\\left({text}\\right)")
        } else {
            text
        }
    }

    fn arg(&mut self, apply: &Apply, i: usize, context: u8) -> String {
        match apply.args.get(i) {
            Some(node) => self.walk(node, context),
            None => {
                warn!(operator = %apply.op, index = i, "missing operand");
                MISSING.to_owned()
            }
        }
    }

    fn joined(&mut self, apply: &Apply, context: u8, sep: &str) -> String {
        if apply.args.is_empty() {
            warn!(operator = %apply.op, "no operands");
            return MISSING.to_owned();
        }
        let args: Vec<String> = apply
            .args
            .iter()
            .map(|arg| self.walk(arg, context))
            .collect();
        args.join(sep)
    }

    /// Top-level equations are assignments and render with a single `=`.
    fn statement(&mut self, node: &MathNode) -> String {
        match node.as_equation() {
            Some((lhs, rhs)) => {
                let lhs = self.walk(lhs, 0);
                let rhs = self.walk(rhs, 0);
                format!("{lhs} = {rhs}")
            }
            None => self.walk(node, 0),
        }
    }

    fn render(&mut self, node: &MathNode) -> (String, u8) {
        match node {
            MathNode::Apply(apply) => self.apply(apply),
            MathNode::Ci(name) => (parse_identifier(name), PREC_ATOM),
            MathNode::Cn(c) => cn(c),
            MathNode::Constant(c) => (constant(c).to_owned(), PREC_ATOM),
            MathNode::Piecewise(piecewise) => (self.piecewise(piecewise), PREC_ATOM),
            MathNode::Bvar(inner) => self.render(inner),
        }
    }

    fn apply(&mut self, apply: &Apply) -> (String, u8) {
        if let Some(sym) = relational_symbol(&apply.op) {
            let text = self.joined(apply, PREC_RELATIONAL + 1, &format!(" {sym} "));
            return (text, PREC_RELATIONAL);
        }

        if let Some(cmd) = function_command(&apply.op) {
            let arg = self.arg(apply, 0, 0);
            return (format!("{cmd}\\left({arg}\\right)"), PREC_FUNCTION);
        }

        match &apply.op {
            Operator::Plus => (self.joined(apply, PREC_PLUS, " + "), PREC_PLUS),
            Operator::Minus if apply.args.len() == 1 => {
                let operand = self.arg(apply, 0, PREC_PLUS + 1);
                (format!("-{operand}"), PREC_PLUS)
            }
            Operator::Minus => {
                let mut text = self.arg(apply, 0, PREC_PLUS);
                for i in 1..apply.args.len().max(2) {
                    text.push_str(" - ");
                    text.push_str(&self.arg(apply, i, PREC_PLUS + 1));
                }
                (text, PREC_PLUS)
            }
            Operator::Times => (self.joined(apply, PREC_TIMES, " \\cdot "), PREC_TIMES),
            Operator::Divide => {
                let num = self.arg(apply, 0, 0);
                let den = self.arg(apply, 1, 0);
                (format!("\\frac{{{num}}}{{{den}}}"), PREC_TIMES)
            }
            Operator::And | Operator::Or => {
                let sym = if apply.op == Operator::And {
                    " \\land "
                } else {
                    " \\lor "
                };
                let args: Vec<String> = apply
                    .args
                    .iter()
                    .map(|arg| {
                        // same-operator chains read fine without brackets
                        let context = match arg {
                            MathNode::Apply(inner) if inner.op == apply.op => PREC_LOGICAL,
                            _ => PREC_LOGICAL + 1,
                        };
                        self.walk(arg, context)
                    })
                    .collect();
                (args.join(sym), PREC_LOGICAL)
            }
            Operator::Power => {
                let base = match apply.args.first() {
                    Some(base) if is_atomic_base(base) => self.walk(base, 0),
                    Some(base) => format!("\\left({}\\right)", self.walk(base, 0)),
                    None => self.arg(apply, 0, 0),
                };
                let exponent = self.arg(apply, 1, 0);
                (format!("{base}^{{{exponent}}}"), PREC_POWER)
            }
            Operator::Root => {
                let arg = self.arg(apply, 0, 0);
                (format!("\\sqrt{{{arg}}}"), PREC_FUNCTION)
            }
            Operator::Diff => match apply.derivative_parts() {
                Some((dep, indep)) => {
                    let dep = self.walk(dep, 0);
                    let indep = self.walk(indep, 0);
                    (format!("\\frac{{d{dep}}}{{d{indep}}}"), PREC_FUNCTION)
                }
                None => self.unknown(apply),
            },
            Operator::Exp => {
                let arg = self.arg(apply, 0, 0);
                (format!("e^{{{arg}}}"), PREC_FUNCTION)
            }
            Operator::Abs => {
                let arg = self.arg(apply, 0, 0);
                (format!("\\left|{arg}\\right|"), PREC_FUNCTION)
            }
            Operator::Floor => {
                let arg = self.arg(apply, 0, 0);
                (format!("\\lfloor {arg} \\rfloor"), PREC_FUNCTION)
            }
            Operator::Ceiling => {
                let arg = self.arg(apply, 0, 0);
                (format!("\\lceil {arg} \\rceil"), PREC_FUNCTION)
            }
            Operator::Sech | Operator::Csch => {
                let arg = self.arg(apply, 0, 0);
                (
                    format!("\\operatorname{{{}}}\\left({}\\right)", apply.op.name(), arg),
                    PREC_FUNCTION,
                )
            }
            _ => self.unknown(apply),
        }
    }

    fn unknown(&mut self, apply: &Apply) -> (String, u8) {
        warn!(operator = %apply.op, "no LaTeX form for operator");
        let args: Vec<String> = apply.args.iter().map(|arg| self.walk(arg, 0)).collect();
        (
            format!("\\text{{{}}}({})", apply.op.name(), args.join(", ")),
            PREC_UNKNOWN,
        )
    }

    fn piecewise(&mut self, piecewise: &Piecewise) -> String {
        let mut rows = vec![];
        for piece in piecewise.pieces.iter() {
            let value = self.walk(&piece.value, 0);
            let condition = self.walk(&piece.condition, 0);
            rows.push(format!("{value} & \\text{{if }} {condition}"));
        }
        if let Some(ref otherwise) = piecewise.otherwise {
            let value = self.walk(otherwise, 0);
            rows.push(format!("{value} & \\text{{otherwise}}"));
        }
        format!("\\begin{{cases}} {} \\end{{cases}}", rows.join(" \\\\ "))
    }
}

/// Render every top-level child of a `math` block, one per line.
pub fn convert(math: &Math) -> String {
    let mut generator = LatexGenerator {};
    let lines: Vec<String> = math
        .children
        .iter()
        .map(|node| generator.statement(node))
        .collect();
    lines.join("\n")
}

/// Render a single equation or expression.
pub fn convert_node(node: &MathNode) -> String {
    let mut generator = LatexGenerator {};
    generator.statement(node)
}

/// Render the first `math` element of an XML document. Failures come back
/// as a `% Error: ...` LaTeX comment.
pub fn convert_xml(input: &str) -> String {
    match xml::read_math(input) {
        Ok(math) => convert(&math),
        Err(err) => {
            let details = err.get_details().unwrap_or_else(|| err.to_string());
            format!("% Error: {}", details.replace('\n', " "))
        }
    }
}
