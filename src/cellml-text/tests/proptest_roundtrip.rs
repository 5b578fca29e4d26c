// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for the text generator and parser.
//!
//! These tests verify that:
//! 1. Generated expression text reparses to the tree it came from
//! 2. Parsing arbitrary input never panics and yields either XML or exactly one error

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use cellml_text::ast::{Constant, MathNode, Operator, Piece, Piecewise};
use cellml_text::{generate_expr, latex, parse, parse_math};

fn ident_strategy() -> impl Strategy<Value = MathNode> {
    prop::sample::select(vec!["a", "b", "x", "V_m", "alpha", "t1", "g_Na_max"])
        .prop_map(MathNode::ci)
}

fn number_strategy() -> impl Strategy<Value = MathNode> {
    prop_oneof![
        (0u32..1000).prop_map(|n| MathNode::cn(&n.to_string())),
        (0u32..1000).prop_map(|n| MathNode::cn(&format!("{}.5", n))),
    ]
}

fn leaf_strategy() -> BoxedStrategy<MathNode> {
    prop_oneof![
        ident_strategy(),
        number_strategy(),
        Just(MathNode::Constant(Constant::Pi)),
    ]
    .boxed()
}

fn binary(op: Operator) -> impl Fn((MathNode, MathNode)) -> MathNode {
    move |(l, r)| MathNode::apply(op.clone(), vec![l, r])
}

fn expr_strategy() -> BoxedStrategy<MathNode> {
    leaf_strategy()
        .prop_recursive(4, 32, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(binary(Operator::Plus)),
                (inner.clone(), inner.clone()).prop_map(binary(Operator::Minus)),
                (inner.clone(), inner.clone()).prop_map(binary(Operator::Times)),
                (inner.clone(), inner.clone()).prop_map(binary(Operator::Divide)),
                (inner.clone(), inner.clone()).prop_map(binary(Operator::Power)),
                inner
                    .clone()
                    .prop_map(|e| MathNode::apply(Operator::Minus, vec![e])),
                inner
                    .clone()
                    .prop_map(|e| MathNode::apply(Operator::Exp, vec![e])),
                (inner.clone(), inner.clone(), inner.clone()).prop_map(|(c, v, o)| {
                    MathNode::Piecewise(Piecewise {
                        pieces: vec![Piece {
                            value: v,
                            condition: MathNode::apply(Operator::Gt, vec![c, MathNode::cn("0")]),
                        }],
                        otherwise: Some(Box::new(o)),
                    })
                }),
            ]
        })
        .boxed()
}

fn condition_strategy() -> BoxedStrategy<MathNode> {
    let comparison = (expr_strategy(), expr_strategy())
        .prop_map(binary(Operator::Leq))
        .boxed();
    prop_oneof![
        comparison.clone(),
        (comparison.clone(), comparison).prop_map(binary(Operator::And)),
    ]
    .boxed()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn generated_text_reparses(expr in expr_strategy()) {
        let text = generate_expr(&expr);
        let parsed = parse_math(&text);
        prop_assert!(parsed.is_ok(), "{}: {:?}", text, parsed);
        prop_assert_eq!(expr, parsed.unwrap());
    }

    #[test]
    fn generated_conditions_reparse(cond in condition_strategy()) {
        let text = generate_expr(&cond);
        let parsed = parse_math(&text);
        prop_assert!(parsed.is_ok(), "{}: {:?}", text, parsed);
        prop_assert_eq!(cond, parsed.unwrap());
    }

    #[test]
    fn latex_never_panics(expr in expr_strategy()) {
        let rendered = latex::convert_node(&expr);
        prop_assert!(!rendered.is_empty());
    }

    #[test]
    fn parse_reports_at_most_one_error(input in "[a-z0-9 ;:=+*/(){},\n-]{0,80}") {
        let result = parse(&input);
        prop_assert!(result.errors.len() <= 1);
        prop_assert_eq!(result.xml.is_some(), result.errors.is_empty());
        prop_assert_eq!(result.model.is_some(), result.errors.is_empty());
    }

    #[test]
    fn wrapped_statements_parse(expr in expr_strategy()) {
        let text = format!(
            "def model m as\n  def comp c as\n    y = {};\n  enddef;\nenddef;\n",
            generate_expr(&expr)
        );
        let result = parse(&text);
        prop_assert!(result.errors.is_empty(), "{}: {:?}", text, result.errors);
    }
}
