// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs;

use cellml_text::ast::{MathNode, Model};
use cellml_text::{generate, generate_model, latex, parse, xml};

static TEXT_MODELS: &[&str] = &[
    "test/models/membrane.txt",
    "test/models/gating.txt",
    "test/models/piecewise.txt",
];

static XML_MODELS: &[&str] = &["test/models/e_notation.cellml", "test/models/derivative.cellml"];

fn read(path: &str) -> String {
    let file_path = format!("../../{}", path);
    eprintln!("model: {}", path);
    fs::read_to_string(file_path).unwrap()
}

fn parse_model(text: &str) -> Model {
    let result = parse(text);
    assert!(result.errors.is_empty(), "{:?}\n{}", result.errors, text);
    result.model.unwrap().strip_source()
}

fn find_piecewise(node: &MathNode) -> Option<&MathNode> {
    match node {
        MathNode::Piecewise(_) => Some(node),
        MathNode::Apply(apply) => apply.args.iter().find_map(find_piecewise),
        MathNode::Bvar(inner) => find_piecewise(inner),
        _ => None,
    }
}

#[test]
fn roundtrips_text_through_model() {
    for &path in TEXT_MODELS {
        let text = read(path);
        let model = parse_model(&text);

        let generated = generate_model(&model);
        let reparsed = parse_model(&generated);

        assert_eq!(model, reparsed, "{}", generated);
        // generating is stable once the text is in canonical form
        assert_eq!(generated, generate_model(&reparsed));
    }
}

#[test]
fn roundtrips_text_through_xml() {
    for &path in TEXT_MODELS {
        let text = read(path);
        let result = parse(&text);
        let xml = result.xml.unwrap();
        assert!(!xml.contains("data-source-line"));

        let model = result.model.unwrap().strip_source();
        let from_xml = xml::read_model(&xml).unwrap();
        assert_eq!(model, from_xml);

        let generated = generate(&xml);
        assert_eq!(model, parse_model(&generated), "{}", generated);
    }
}

#[test]
fn roundtrips_xml_models() {
    for &path in XML_MODELS {
        let input = read(path);
        let model = xml::read_model(&input).unwrap();

        let text = generate(&input);
        assert!(!text.starts_with("// Error"), "{}", text);

        let reparsed = parse(&text);
        assert!(reparsed.errors.is_empty(), "{:?}\n{}", reparsed.errors, text);
        let reparsed = reparsed.model.unwrap();
        assert_eq!(model.components.len(), reparsed.components.len());
        assert_eq!(model.units, reparsed.units);
        for (a, b) in model.components.iter().zip(reparsed.components.iter()) {
            assert_eq!(a.variables, b.variables);
        }
    }
}

#[test]
fn derivative_roundtrip() {
    let input = read("test/models/derivative.cellml");

    let text = generate(&input);
    assert!(text.contains("ode(V, t) = -(k*V);"), "{}", text);

    let model = parse_model(&text);
    let math = &model.components[0].maths[0];
    assert_eq!("\\frac{dV}{dt} = -k \\cdot V", latex::convert(math));
}

#[test]
fn e_notation_survives() {
    let input = read("test/models/e_notation.cellml");

    let text = generate(&input);
    assert!(
        text.contains("k = (1.38e-23 {units: dimensionless}*F);"),
        "{}",
        text
    );
    assert!(text.contains("unit mole {exponent: -1};"), "{}", text);

    let model = xml::read_model(&input).unwrap();
    assert_eq!(1, model.components.len());
    assert_eq!(
        "k = 1.38 \\times 10^{-23} \\cdot F",
        latex::convert(&model.components[0].maths[0])
    );

    let xml = xml::to_xml(&model).unwrap();
    assert!(xml.contains("<cn cellml:units=\"dimensionless\" type=\"e-notation\">1.38<sep/>-23</cn>"));
}

#[test]
fn piecewise_roundtrip() {
    let model = parse_model(&read("test/models/piecewise.txt"));
    let reparsed = parse_model(&generate_model(&model));

    let original = find_piecewise(&model.components[0].maths[0].children[0]).unwrap();
    let again = find_piecewise(&reparsed.components[0].maths[0].children[0]).unwrap();

    match (original, again) {
        (MathNode::Piecewise(a), MathNode::Piecewise(b)) => {
            assert_eq!(2, a.pieces.len());
            assert_eq!(a.pieces.len(), b.pieces.len());
            for (pa, pb) in a.pieces.iter().zip(b.pieces.iter()) {
                assert_eq!(pa.value, pb.value);
                assert_eq!(pa.condition, pb.condition);
            }
            assert_eq!(a.otherwise, b.otherwise);
        }
        _ => unreachable!(),
    }
}

#[test]
fn source_lines_point_at_equations() {
    let text = read("test/models/gating.txt");
    let model = parse(&text).model.unwrap();

    let eqn = model.equation_at_line(11).unwrap();
    assert_eq!(
        Some(("data-source-line", "11".to_owned())),
        eqn.source_attribute()
    );
    assert!(model.equation_at_line(1).is_none());
}
