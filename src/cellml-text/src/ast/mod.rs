// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Typed CellML model tree with embedded MathML.
//!
//! Every node is owned by exactly one parent. The parser builds these,
//! the XML reader rebuilds them from documents, and the generators only
//! ever borrow them.

pub mod math;

pub use math::{
    Apply, Cn, CnValue, Constant, LineSpan, MathNode, Operator, Piece, Piecewise, SourceTag,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Model {
    pub name: Option<String>,
    pub units: Vec<Units>,
    pub components: Vec<Component>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Units {
    pub name: String,
    pub units: Vec<Unit>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unit {
    pub units: String,
    pub prefix: Option<String>,
    pub exponent: Option<String>,
    pub multiplier: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub variables: Vec<Variable>,
    pub maths: Vec<Math>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub units: String,
    pub initial_value: Option<String>,
    pub interface: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Math {
    pub children: Vec<MathNode>,
}

impl Model {
    /// Finds the equation whose source span covers `line`.
    pub fn equation_at_line(&self, line: usize) -> Option<&Apply> {
        self.components
            .iter()
            .flat_map(|c| c.maths.iter())
            .flat_map(|m| m.children.iter())
            .find_map(|node| match node {
                MathNode::Apply(apply) => match apply.source {
                    Some(ref tag) if tag.span.contains(line) => Some(apply),
                    _ => None,
                },
                _ => None,
            })
    }

    pub fn strip_source(self) -> Self {
        Model {
            components: self
                .components
                .into_iter()
                .map(|c| Component {
                    maths: c
                        .maths
                        .into_iter()
                        .map(|m| Math {
                            children: m.children.into_iter().map(|n| n.strip_source()).collect(),
                        })
                        .collect(),
                    ..c
                })
                .collect(),
            ..self
        }
    }
}

impl Component {
    pub fn new(name: &str) -> Self {
        Component {
            name: name.to_owned(),
            variables: vec![],
            maths: vec![],
        }
    }
}
