// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

/// The lines an equation was parsed from, inclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        LineSpan { start, end }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

impl fmt::Display for LineSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// In-memory source annotation on an equation's top-level `apply`.
/// Never written out as XML.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceTag {
    pub attribute: String,
    pub span: LineSpan,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    And,
    Or,
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Root,
    Diff,
    Abs,
    Floor,
    Ceiling,
    Exp,
    Ln,
    Log,
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Arcsin,
    Arccos,
    Arctan,
    Other(String),
}

impl Operator {
    /// Maps a MathML element name to an operator.
    pub fn from_name(name: &str) -> Operator {
        match name {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "lt" => Operator::Lt,
            "leq" => Operator::Leq,
            "gt" => Operator::Gt,
            "geq" => Operator::Geq,
            "and" => Operator::And,
            "or" => Operator::Or,
            "plus" => Operator::Plus,
            "minus" => Operator::Minus,
            "times" => Operator::Times,
            "divide" => Operator::Divide,
            "power" => Operator::Power,
            "root" => Operator::Root,
            "diff" => Operator::Diff,
            "abs" => Operator::Abs,
            "floor" => Operator::Floor,
            "ceiling" => Operator::Ceiling,
            "exp" => Operator::Exp,
            "ln" => Operator::Ln,
            "log" => Operator::Log,
            "sin" => Operator::Sin,
            "cos" => Operator::Cos,
            "tan" => Operator::Tan,
            "sec" => Operator::Sec,
            "csc" => Operator::Csc,
            "cot" => Operator::Cot,
            "sinh" => Operator::Sinh,
            "cosh" => Operator::Cosh,
            "tanh" => Operator::Tanh,
            "sech" => Operator::Sech,
            "csch" => Operator::Csch,
            "coth" => Operator::Coth,
            "arcsin" => Operator::Arcsin,
            "arccos" => Operator::Arccos,
            "arctan" => Operator::Arctan,
            _ => Operator::Other(name.to_owned()),
        }
    }

    /// Maps a function name as written in CellML Text to an operator.
    pub fn from_function_name(name: &str) -> Operator {
        match name {
            "sqrt" => Operator::Root,
            "pow" => Operator::Power,
            "ceil" => Operator::Ceiling,
            _ => Operator::from_name(name),
        }
    }

    /// The MathML element name.
    pub fn name(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Leq => "leq",
            Operator::Gt => "gt",
            Operator::Geq => "geq",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Plus => "plus",
            Operator::Minus => "minus",
            Operator::Times => "times",
            Operator::Divide => "divide",
            Operator::Power => "power",
            Operator::Root => "root",
            Operator::Diff => "diff",
            Operator::Abs => "abs",
            Operator::Floor => "floor",
            Operator::Ceiling => "ceiling",
            Operator::Exp => "exp",
            Operator::Ln => "ln",
            Operator::Log => "log",
            Operator::Sin => "sin",
            Operator::Cos => "cos",
            Operator::Tan => "tan",
            Operator::Sec => "sec",
            Operator::Csc => "csc",
            Operator::Cot => "cot",
            Operator::Sinh => "sinh",
            Operator::Cosh => "cosh",
            Operator::Tanh => "tanh",
            Operator::Sech => "sech",
            Operator::Csch => "csch",
            Operator::Coth => "coth",
            Operator::Arcsin => "arcsin",
            Operator::Arccos => "arccos",
            Operator::Arctan => "arctan",
            Operator::Other(name) => name,
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Neq | Operator::Lt | Operator::Leq | Operator::Gt | Operator::Geq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Pi,
    ExponentialE,
    Infinity,
    NotANumber,
    True,
    False,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Constant> {
        let c = match name {
            "pi" => Constant::Pi,
            "exponentiale" => Constant::ExponentialE,
            "infinity" => Constant::Infinity,
            "notanumber" => Constant::NotANumber,
            "true" => Constant::True,
            "false" => Constant::False,
            _ => return None,
        };
        Some(c)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::ExponentialE => "exponentiale",
            Constant::Infinity => "infinity",
            Constant::NotANumber => "notanumber",
            Constant::True => "true",
            Constant::False => "false",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CnValue {
    Real(String),
    /// `<cn type="e-notation">mantissa<sep/>exponent</cn>`
    ENotation { mantissa: String, exponent: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cn {
    pub value: CnValue,
    pub units: Option<String>,
}

impl Cn {
    pub fn new(value: &str) -> Self {
        Cn {
            value: CnValue::Real(value.to_owned()),
            units: None,
        }
    }

    pub fn with_units(value: &str, units: &str) -> Self {
        Cn {
            value: CnValue::Real(value.to_owned()),
            units: Some(units.to_owned()),
        }
    }

    /// Whether the literal is known to be non-negative, i.e. safe to
    /// use as a power base without brackets.
    pub fn is_non_negative(&self) -> bool {
        let text = match &self.value {
            CnValue::Real(s) => s,
            CnValue::ENotation { mantissa, .. } => mantissa,
        };
        !text.trim_start().starts_with('-')
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    pub value: MathNode,
    pub condition: MathNode,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Piecewise {
    pub pieces: Vec<Piece>,
    pub otherwise: Option<Box<MathNode>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Apply {
    pub op: Operator,
    pub args: Vec<MathNode>,
    pub source: Option<SourceTag>,
}

impl Apply {
    pub fn new(op: Operator, args: Vec<MathNode>) -> Self {
        Apply {
            op,
            args,
            source: None,
        }
    }

    /// The source annotation as an attribute name/value pair, the way a
    /// host would look it up on a DOM node.
    pub fn source_attribute(&self) -> Option<(&str, String)> {
        self.source
            .as_ref()
            .map(|tag| (tag.attribute.as_str(), tag.span.to_string()))
    }

    /// For `diff`: the bound variable and the differentiated expression.
    pub fn derivative_parts(&self) -> Option<(&MathNode, &MathNode)> {
        if self.op != Operator::Diff {
            return None;
        }
        let indep = self.args.iter().find_map(|arg| match arg {
            MathNode::Bvar(inner) => Some(inner.as_ref()),
            _ => None,
        })?;
        let dep = self
            .args
            .iter()
            .find(|arg| !matches!(arg, MathNode::Bvar(_)))?;
        Some((dep, indep))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MathNode {
    Apply(Apply),
    Ci(String),
    Cn(Cn),
    Constant(Constant),
    Piecewise(Piecewise),
    Bvar(Box<MathNode>),
}

impl MathNode {
    pub fn apply(op: Operator, args: Vec<MathNode>) -> Self {
        MathNode::Apply(Apply::new(op, args))
    }

    pub fn ci(name: &str) -> Self {
        MathNode::Ci(name.to_owned())
    }

    pub fn cn(value: &str) -> Self {
        MathNode::Cn(Cn::new(value))
    }

    /// `apply(eq, lhs, rhs)`: the shape of a top-level equation.
    pub fn as_equation(&self) -> Option<(&MathNode, &MathNode)> {
        match self {
            MathNode::Apply(Apply { op: Operator::Eq, args, .. }) if args.len() == 2 => {
                Some((&args[0], &args[1]))
            }
            _ => None,
        }
    }

    pub fn strip_source(self) -> Self {
        match self {
            MathNode::Apply(Apply { op, args, .. }) => MathNode::Apply(Apply {
                op,
                args: args.into_iter().map(|a| a.strip_source()).collect(),
                source: None,
            }),
            MathNode::Piecewise(Piecewise { pieces, otherwise }) => {
                MathNode::Piecewise(Piecewise {
                    pieces: pieces
                        .into_iter()
                        .map(|p| Piece {
                            value: p.value.strip_source(),
                            condition: p.condition.strip_source(),
                        })
                        .collect(),
                    otherwise: otherwise.map(|o| Box::new(o.strip_source())),
                })
            }
            MathNode::Bvar(inner) => MathNode::Bvar(Box::new(inner.strip_source())),
            leaf => leaf,
        }
    }
}
