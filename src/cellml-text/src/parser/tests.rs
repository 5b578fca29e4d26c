// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::*;
use crate::ast::{CnValue, Constant};

fn ci(name: &str) -> MathNode {
    MathNode::ci(name)
}

fn cn(value: &str) -> MathNode {
    MathNode::cn(value)
}

fn apply(op: Operator, args: Vec<MathNode>) -> MathNode {
    MathNode::apply(op, args)
}

fn model_of(input: &str) -> Model {
    let result = parse(input);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    result.model.unwrap()
}

fn first_equation(model: &Model) -> &MathNode {
    &model.components[0].maths[0].children[0]
}

#[test]
fn test_precedence() {
    assert_eq!(
        apply(
            Operator::Plus,
            vec![ci("a"), apply(Operator::Times, vec![ci("b"), ci("c")])]
        ),
        parse_math("a + b * c").unwrap()
    );
    assert_eq!(
        apply(
            Operator::Times,
            vec![apply(Operator::Plus, vec![ci("a"), ci("b")]), ci("c")]
        ),
        parse_math("(a + b) * c").unwrap()
    );
    // left associative
    assert_eq!(
        apply(
            Operator::Minus,
            vec![apply(Operator::Minus, vec![ci("a"), ci("b")]), ci("c")]
        ),
        parse_math("a - b - c").unwrap()
    );
    assert_eq!(
        apply(
            Operator::Divide,
            vec![apply(Operator::Divide, vec![ci("a"), ci("b")]), ci("c")]
        ),
        parse_math("a / b / c").unwrap()
    );
}

#[test]
fn test_unary_minus() {
    assert_eq!(
        apply(
            Operator::Minus,
            vec![apply(Operator::Minus, vec![cn("5")])]
        ),
        parse_math("- -5").unwrap()
    );
    assert_eq!(
        apply(
            Operator::Times,
            vec![apply(Operator::Minus, vec![ci("a")]), ci("b")]
        ),
        parse_math("-a * b").unwrap()
    );
}

#[test]
fn test_conditions() {
    assert_eq!(
        apply(
            Operator::And,
            vec![
                apply(Operator::Gt, vec![ci("a"), ci("b")]),
                apply(Operator::Leq, vec![ci("c"), cn("1")]),
            ]
        ),
        parse_math("a > b and c <= 1").unwrap()
    );
    assert_eq!(
        apply(
            Operator::Or,
            vec![
                apply(Operator::Eq, vec![ci("a"), cn("1")]),
                apply(Operator::Neq, vec![ci("b"), cn("2")]),
            ]
        ),
        parse_math("(a == 1) or b != 2").unwrap()
    );
}

#[test]
fn test_calls() {
    assert_eq!(
        apply(
            Operator::Diff,
            vec![MathNode::Bvar(Box::new(ci("t"))), ci("V")]
        ),
        parse_math("ode(V, t)").unwrap()
    );
    assert_eq!(
        apply(Operator::Root, vec![MathNode::Constant(Constant::Pi)]),
        parse_math("sqrt(pi)").unwrap()
    );
    assert_eq!(
        apply(Operator::Power, vec![ci("x"), cn("2")]),
        parse_math("pow(x, 2)").unwrap()
    );
    assert_eq!(
        apply(Operator::Exp, vec![apply(Operator::Minus, vec![ci("x")])]),
        parse_math("exp(-x)").unwrap()
    );
    assert_eq!(
        apply(Operator::Other("rem".to_owned()), vec![ci("a"), cn("2")]),
        parse_math("rem(a, 2)").unwrap()
    );
    // one-argument ode is not a derivative
    assert_eq!(
        apply(Operator::Other("ode".to_owned()), vec![ci("V")]),
        parse_math("ode(V)").unwrap()
    );
}

#[test]
fn test_cn_units() {
    assert_eq!(
        MathNode::Cn(Cn::with_units("5", "mV")),
        parse_math("5 {units: mV}").unwrap()
    );
    assert_eq!(
        MathNode::Cn(Cn::with_units("5", "mV")),
        parse_math("5 {units: mV, extra: 1}").unwrap()
    );
    let node = parse_math("1.5e3").unwrap();
    assert_eq!(
        MathNode::Cn(Cn {
            value: CnValue::Real("1.5e3".to_owned()),
            units: None,
        }),
        node
    );
    assert!(parse_math("5 {units: mV").is_err());
}

#[test]
fn test_piecewise() {
    let node = parse_math("sel case a > 1: 2; case a > 0: 1; otherwise: 0; endsel").unwrap();
    let expected = MathNode::Piecewise(Piecewise {
        pieces: vec![
            Piece {
                value: cn("2"),
                condition: apply(Operator::Gt, vec![ci("a"), cn("1")]),
            },
            Piece {
                value: cn("1"),
                condition: apply(Operator::Gt, vec![ci("a"), cn("0")]),
            },
        ],
        otherwise: Some(Box::new(cn("0"))),
    });
    assert_eq!(expected, node);

    let node = parse_math("sel endsel").unwrap();
    assert_eq!(
        MathNode::Piecewise(Piecewise {
            pieces: vec![],
            otherwise: None,
        }),
        node
    );
}

#[test]
fn test_variable_scenario() {
    let input = "def model m as\n def comp c as\n var a: dimensionless {init: 10};\n enddef;\nenddef;";
    let result = parse(input);
    assert!(result.is_ok());
    assert!(result.errors.is_empty());

    let xml = result.xml.as_ref().unwrap();
    assert!(
        xml.contains("<variable name=\"a\" units=\"dimensionless\" initial_value=\"10\"/>"),
        "{xml}"
    );

    let model = result.model.unwrap();
    assert_eq!(Some("m".to_owned()), model.name);
    let var = &model.components[0].variables[0];
    assert_eq!("a", var.name);
    assert_eq!("dimensionless", var.units);
    assert_eq!(Some("10".to_owned()), var.initial_value);
    assert_eq!(None, var.interface);
}

#[test]
fn test_variable_properties() {
    let model = model_of(
        "def model m as
  def comp c as
    var V: mV {init: -75, colour: red, interface: public,};
  enddef;
enddef;",
    );
    let var = &model.components[0].variables[0];
    assert_eq!(Some("-75".to_owned()), var.initial_value);
    assert_eq!(Some("public".to_owned()), var.interface);
}

#[test]
fn test_unit_blocks() {
    let model = model_of(
        "def model m as
  def unit per_ms as
    unit second {prefix: milli, exponent: -1};
    unit metre;
  enddef;
enddef;",
    );
    assert_eq!(1, model.units.len());
    assert_eq!("per_ms", model.units[0].name);
    assert_eq!(
        vec![
            Unit {
                units: "second".to_owned(),
                prefix: Some("milli".to_owned()),
                exponent: Some("-1".to_owned()),
                multiplier: None,
            },
            Unit {
                units: "metre".to_owned(),
                ..Default::default()
            },
        ],
        model.units[0].units
    );
}

#[test]
fn test_source_lines() {
    let input = "def model m as
def comp c as
a = b +
  c;
x = 1;
enddef;
enddef;";
    let result = parse(input);
    let xml = result.xml.unwrap();
    assert!(!xml.contains(DEFAULT_SOURCE_LINE_ATTRIBUTE));

    let model = result.model.unwrap();
    let eqn = model.equation_at_line(4).unwrap();
    assert_eq!(
        Some((DEFAULT_SOURCE_LINE_ATTRIBUTE, "3-4".to_owned())),
        eqn.source_attribute()
    );
    let eqn = model.equation_at_line(5).unwrap();
    assert_eq!(
        Some((DEFAULT_SOURCE_LINE_ATTRIBUTE, "5".to_owned())),
        eqn.source_attribute()
    );

    // both equations share one math block
    assert_eq!(1, model.components[0].maths.len());
    assert_eq!(2, model.components[0].maths[0].children.len());
}

#[test]
fn test_source_lines_disabled() {
    let input = "def model m as def comp c as a = 1; enddef; enddef;";

    for options in [
        ParserOptions::without_source_lines(),
        ParserOptions {
            source_line_attribute: Some(String::new()),
        },
    ] {
        let result = parse_with_options(input, &options);
        let model = result.model.unwrap();
        match first_equation(&model) {
            MathNode::Apply(apply) => assert_eq!(None, apply.source),
            other => panic!("expected apply, got {other:?}"),
        }
    }

    let options = ParserOptions {
        source_line_attribute: Some("data-line".to_owned()),
    };
    let model = parse_with_options(input, &options).model.unwrap();
    let eqn = model.equation_at_line(1).unwrap();
    assert_eq!(Some(("data-line", "1".to_owned())), eqn.source_attribute());
}

#[test]
fn test_syntax_error() {
    let input = "def model m as
def comp c as
a = ;
enddef;
enddef;";
    let result = parse(input);
    assert!(!result.is_ok());
    assert!(result.xml.is_none());
    assert!(result.model.is_none());
    assert_eq!(1, result.errors.len());

    let err = &result.errors[0];
    assert_eq!(3, err.line);
    assert_eq!(ErrorCode::UnexpectedToken, err.code);
    assert_eq!("expected expression but found ';'", err.message);
}

#[test]
fn test_first_error_wins() {
    // two problems; only the first is reported
    let input = "def model m as
def comp c as
var a dimensionless;
b = = 1;
enddef;
enddef;";
    let result = parse(input);
    assert_eq!(1, result.errors.len());
    assert_eq!(3, result.errors[0].line);
    assert_eq!(
        "expected ':' but found 'dimensionless'",
        result.errors[0].message
    );
}

#[test]
fn test_eof_and_extra_tokens() {
    let result = parse("def model m as\n");
    assert_eq!(1, result.errors.len());
    assert_eq!(ErrorCode::UnrecognizedEof, result.errors[0].code);
    assert_eq!(2, result.errors[0].line);
    assert_eq!(
        "expected 'enddef' but found end of input",
        result.errors[0].message
    );

    let result = parse("def model m as enddef;\nx");
    assert_eq!(1, result.errors.len());
    assert_eq!(ErrorCode::ExtraToken, result.errors[0].code);
    assert_eq!(2, result.errors[0].line);

    let err = parse_math("a b").unwrap_err();
    assert_eq!(ErrorCode::ExtraToken, err.code);

    let result = parse("def model m as def foo x as enddef; enddef;");
    assert_eq!("expected 'comp' or 'unit' but found 'foo'", result.errors[0].message);
}

#[test]
fn test_anonymous_and_empty_model() {
    let model = model_of("def model as enddef;");
    assert_eq!(None, model.name);
    assert!(model.components.is_empty());

    let model = model_of("def model m as def comp c as enddef; enddef;");
    assert!(model.components[0].maths.is_empty());
}

#[test]
fn test_unknown_characters_are_warnings() {
    let result = parse("def model m as # \nenddef;");
    assert!(result.is_ok());
    assert_eq!(1, result.warnings.len());
    assert_eq!(ErrorCode::UnknownCharacter, result.warnings[0].code);
    assert_eq!(1, result.warnings[0].line);
}

#[test]
fn test_result_json() {
    let result = parse("def model m as\nenddef x");
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["xml"].is_null());
    assert!(json.get("model").is_none());
    assert_eq!(2, json["errors"][0]["line"]);
    assert_eq!("unexpected_token", json["errors"][0]["code"]);
}
