// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Reads CellML/MathML documents back into the typed tree.
//!
//! The document is first collected into a small untyped element tree
//! (local names only, namespace prefixes dropped), then converted.
//! Elements outside what the text format can express are skipped at the
//! model level and rejected inside `math`.

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::ast::{
    Apply, Cn, CnValue, Component, Constant, Math, MathNode, Model, Operator, Piece, Piecewise,
    Unit, Units, Variable,
};
use crate::common::Result;
use crate::xml_err;

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        let mut text = String::new();
        for child in self.children.iter() {
            if let Node::Text(t) = child {
                text.push_str(t);
            }
        }
        text.trim().to_owned()
    }

    /// Depth-first search for the first element named `name`, including self.
    fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.elements().find_map(|el| el.find(name))
    }
}

fn decode(raw: &[u8]) -> Result<String> {
    let raw = match std::str::from_utf8(raw) {
        Ok(raw) => raw,
        Err(err) => return xml_err!(XmlDeserialization, format!("invalid utf-8: {err}")),
    };
    match unescape(raw) {
        Ok(text) => Ok(text.into_owned()),
        Err(err) => xml_err!(XmlDeserialization, format!("bad escape: {err}")),
    }
}

fn local_name(raw: &[u8]) -> Result<String> {
    let full = decode(raw)?;
    Ok(match full.rsplit_once(':') {
        Some((_, local)) => local.to_owned(),
        None => full,
    })
}

fn open_element(e: &BytesStart<'_>) -> Result<Element> {
    let mut el = Element {
        name: local_name(e.name().as_ref())?,
        ..Default::default()
    };
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => return xml_err!(XmlDeserialization, format!("attribute error: {err}")),
        };
        let key = decode(attr.key.as_ref())?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let key = match key.rsplit_once(':') {
            Some((_, local)) => local.to_owned(),
            None => key,
        };
        el.attrs.push((key, decode(&attr.value)?));
    }
    Ok(el)
}

fn close_element(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        }
    }
}

fn parse_document(input: &str) -> Result<Element> {
    let mut reader = Reader::from_reader(input.as_bytes());
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = vec![];
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(open_element(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let el = open_element(e)?;
                close_element(&mut stack, &mut root, el);
            }
            Ok(Event::End(_)) => {
                if let Some(el) = stack.pop() {
                    close_element(&mut stack, &mut root, el);
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = decode(e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return xml_err!(
                    XmlDeserialization,
                    format!(
                        "XML parse error at position {}: {err}",
                        reader.error_position()
                    )
                );
            }
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return xml_err!(XmlDeserialization, "unclosed element at end of input".to_owned());
    }

    match root {
        Some(root) => Ok(root),
        None => xml_err!(XmlDeserialization, "document has no root element".to_owned()),
    }
}

fn convert_model(el: &Element) -> Result<Model> {
    let mut model = Model {
        name: el.attr("name").map(str::to_owned),
        ..Default::default()
    };

    for child in el.elements() {
        if child.name == "units" {
            model.units.push(convert_units(child));
        }
    }

    collect_components(el, &mut model.components)?;

    Ok(model)
}

/// Components nested inside other components (or inside grouping
/// elements) are flattened, in document order.
fn collect_components(el: &Element, out: &mut Vec<Component>) -> Result<()> {
    for child in el.elements() {
        match child.name.as_str() {
            "component" => {
                out.push(convert_component(child)?);
                collect_components(child, out)?;
            }
            "units" | "math" | "variable" => {}
            _ => collect_components(child, out)?,
        }
    }
    Ok(())
}

fn convert_units(el: &Element) -> Units {
    Units {
        name: el.attr("name").unwrap_or_default().to_owned(),
        units: el
            .elements()
            .filter(|child| child.name == "unit")
            .map(|child| Unit {
                units: child.attr("units").unwrap_or_default().to_owned(),
                prefix: child.attr("prefix").map(str::to_owned),
                exponent: child.attr("exponent").map(str::to_owned),
                multiplier: child.attr("multiplier").map(str::to_owned),
            })
            .collect(),
    }
}

fn convert_component(el: &Element) -> Result<Component> {
    let mut component = Component::new(el.attr("name").unwrap_or_default());

    for child in el.elements() {
        match child.name.as_str() {
            "variable" => component.variables.push(Variable {
                name: child.attr("name").unwrap_or_default().to_owned(),
                units: child.attr("units").unwrap_or_default().to_owned(),
                initial_value: child.attr("initial_value").map(str::to_owned),
                interface: child.attr("interface").map(str::to_owned),
            }),
            "math" => component.maths.push(convert_math(child)?),
            "component" => {}
            other => debug!("skipping <{}> in component '{}'", other, component.name),
        }
    }

    Ok(component)
}

fn convert_math(el: &Element) -> Result<Math> {
    let children = el
        .elements()
        .map(convert_node)
        .collect::<Result<Vec<_>>>()?;
    Ok(Math { children })
}

fn single_child<'a>(el: &'a Element) -> Result<&'a Element> {
    match el.elements().next() {
        Some(child) => Ok(child),
        None => xml_err!(UnsupportedElement, format!("<{}> has no content", el.name)),
    }
}

fn convert_cn(el: &Element) -> Result<Cn> {
    let units = el.attr("units").map(str::to_owned);
    if el.attr("type") == Some("e-notation") {
        let mut mantissa = String::new();
        let mut exponent = String::new();
        let mut seen_sep = false;
        for child in el.children.iter() {
            match child {
                Node::Element(sep) if sep.name == "sep" => seen_sep = true,
                Node::Element(other) => {
                    return xml_err!(
                        UnsupportedElement,
                        format!("<{}> inside <cn>", other.name)
                    );
                }
                Node::Text(t) if seen_sep => exponent.push_str(t.trim()),
                Node::Text(t) => mantissa.push_str(t.trim()),
            }
        }
        if !seen_sep {
            return xml_err!(
                UnsupportedElement,
                "e-notation <cn> without <sep/>".to_owned()
            );
        }
        return Ok(Cn {
            value: CnValue::ENotation { mantissa, exponent },
            units,
        });
    }

    Ok(Cn {
        value: CnValue::Real(el.text()),
        units,
    })
}

fn convert_piecewise(el: &Element) -> Result<Piecewise> {
    let mut piecewise = Piecewise {
        pieces: vec![],
        otherwise: None,
    };
    for child in el.elements() {
        match child.name.as_str() {
            "piece" => {
                let mut parts = child.elements();
                let (value, condition) = match (parts.next(), parts.next()) {
                    (Some(value), Some(condition)) => (value, condition),
                    _ => {
                        return xml_err!(
                            UnsupportedElement,
                            "<piece> needs a value and a condition".to_owned()
                        );
                    }
                };
                piecewise.pieces.push(Piece {
                    value: convert_node(value)?,
                    condition: convert_node(condition)?,
                });
            }
            "otherwise" => {
                let value = convert_node(single_child(child)?)?;
                piecewise.otherwise = Some(Box::new(value));
            }
            other => {
                return xml_err!(UnsupportedElement, format!("<{other}> inside <piecewise>"));
            }
        }
    }
    Ok(piecewise)
}

fn convert_node(el: &Element) -> Result<MathNode> {
    let node = match el.name.as_str() {
        "apply" => {
            let mut children = el.elements();
            let op = match children.next() {
                Some(op) => Operator::from_name(&op.name),
                None => return xml_err!(MissingOperator, "<apply> without an operator".to_owned()),
            };
            let mut args = vec![];
            let mut qualifier = None;
            for child in children {
                match child.name.as_str() {
                    "degree" | "logbase" => {
                        let value = convert_node(single_child(child)?)?;
                        qualifier = Some((child.name.as_str(), value));
                    }
                    _ => args.push(convert_node(child)?),
                }
            }
            match qualifier {
                Some((name, value)) => qualified(op, name, value, args),
                None => MathNode::Apply(Apply::new(op, args)),
            }
        }
        "ci" => MathNode::Ci(el.text()),
        "cn" => MathNode::Cn(convert_cn(el)?),
        "piecewise" => MathNode::Piecewise(convert_piecewise(el)?),
        "bvar" => MathNode::Bvar(Box::new(convert_node(single_child(el)?)?)),
        name => match Constant::from_name(name) {
            Some(c) => MathNode::Constant(c),
            None => return xml_err!(UnsupportedElement, format!("<{name}> in math")),
        },
    };
    Ok(node)
}

/// Folds a `degree` or `logbase` qualifier into plain arithmetic, since
/// the text format only has square roots and base-10 logs.
fn qualified(op: Operator, qualifier: &str, value: MathNode, args: Vec<MathNode>) -> MathNode {
    match (&op, qualifier) {
        (Operator::Root, "degree") if value == MathNode::cn("2") => {
            MathNode::apply(Operator::Root, args)
        }
        (Operator::Root, "degree") => {
            let exponent = MathNode::apply(Operator::Divide, vec![MathNode::cn("1"), value]);
            let mut args = args;
            args.push(exponent);
            MathNode::apply(Operator::Power, args)
        }
        (Operator::Log, "logbase") if value == MathNode::cn("10") => {
            MathNode::apply(Operator::Log, args)
        }
        (Operator::Log, "logbase") => MathNode::apply(
            Operator::Divide,
            vec![
                MathNode::apply(Operator::Ln, args),
                MathNode::apply(Operator::Ln, vec![value]),
            ],
        ),
        _ => {
            debug!("ignoring <{}> on <{}>", qualifier, op.name());
            MathNode::apply(op, args)
        }
    }
}

/// Reads a CellML document. The `model` element may be the root or
/// nested anywhere below it.
pub fn read_model(input: &str) -> Result<Model> {
    let root = parse_document(input)?;
    match root.find("model") {
        Some(model) => convert_model(model),
        None => xml_err!(MissingModel, format!("no <model> element (root is <{}>)", root.name)),
    }
}

/// Reads a standalone MathML fragment rooted at (or containing) `math`.
pub fn read_math(input: &str) -> Result<Math> {
    let root = parse_document(input)?;
    match root.find("math") {
        Some(math) => convert_math(math),
        None => xml_err!(UnsupportedElement, format!("no <math> element (root is <{}>)", root.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    #[test]
    fn test_read_model() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.cellml.org/cellml/2.0#" name="hh">
  <units name="ms">
    <unit units="second" prefix="milli"/>
  </units>
  <import href="other.cellml"/>
  <component name="membrane">
    <variable name="V" units="mV" initial_value="-75" interface="public"/>
    <variable name="t" units="ms"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML" xmlns:cellml="http://www.cellml.org/cellml/2.0#">
      <apply><eq/>
        <apply><diff/><bvar><ci>t</ci></bvar><ci>V</ci></apply>
        <cn cellml:units="mV">1</cn>
      </apply>
    </math>
  </component>
</model>"#;
        let model = read_model(input).unwrap();
        assert_eq!(Some("hh".to_owned()), model.name);
        assert_eq!(1, model.units.len());
        assert_eq!(Some("milli".to_owned()), model.units[0].units[0].prefix);
        assert_eq!(1, model.components.len());

        let comp = &model.components[0];
        assert_eq!("membrane", comp.name);
        assert_eq!(Some("-75".to_owned()), comp.variables[0].initial_value);
        assert_eq!(None, comp.variables[1].interface);

        let (lhs, rhs) = comp.maths[0].children[0].as_equation().unwrap();
        let diff = match lhs {
            MathNode::Apply(apply) => apply,
            _ => panic!("expected apply"),
        };
        let (dep, indep) = diff.derivative_parts().unwrap();
        assert_eq!(&MathNode::ci("V"), dep);
        assert_eq!(&MathNode::ci("t"), indep);
        assert_eq!(&MathNode::Cn(Cn::with_units("1", "mV")), rhs);
    }

    #[test]
    fn test_nested_components_are_flattened() {
        let input = r#"<model name="m">
  <group><component name="a"><component name="b"/></component></group>
  <component name="c"/>
</model>"#;
        let model = read_model(input).unwrap();
        let names: Vec<_> = model.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(vec!["a", "b", "c"], names);
    }

    #[test]
    fn test_read_math() {
        let input = r#"<math xmlns="http://www.w3.org/1998/Math/MathML">
  <apply><eq/><ci>x</ci>
    <piecewise>
      <piece><cn>1</cn><apply><gt/><ci>a</ci><pi/></apply></piece>
      <otherwise><cn type="e-notation">2.5<sep/>-3</cn></otherwise>
    </piecewise>
  </apply>
</math>"#;
        let math = read_math(input).unwrap();
        let (_, rhs) = math.children[0].as_equation().unwrap();
        let pw = match rhs {
            MathNode::Piecewise(pw) => pw,
            _ => panic!("expected piecewise"),
        };
        assert_eq!(1, pw.pieces.len());
        assert_eq!(MathNode::cn("1"), pw.pieces[0].value);
        assert_eq!(
            MathNode::apply(
                Operator::Gt,
                vec![MathNode::ci("a"), MathNode::Constant(Constant::Pi)]
            ),
            pw.pieces[0].condition
        );
        assert_eq!(
            Some(Box::new(MathNode::Cn(Cn {
                value: CnValue::ENotation {
                    mantissa: "2.5".to_owned(),
                    exponent: "-3".to_owned(),
                },
                units: None,
            }))),
            pw.otherwise
        );
    }

    #[test]
    fn test_errors() {
        let err = read_model("<notmodel/>").unwrap_err();
        assert_eq!(ErrorCode::MissingModel, err.code);

        let err = read_math("<math><apply></apply></math>").unwrap_err();
        assert_eq!(ErrorCode::MissingOperator, err.code);

        let err = read_math("<math><matrix/></math>").unwrap_err();
        assert_eq!(ErrorCode::UnsupportedElement, err.code);

        let err = read_model("<model><component></model>").unwrap_err();
        assert_eq!(ErrorCode::XmlDeserialization, err.code);
    }

    #[test]
    fn test_qualifiers() {
        let input = r#"<math>
  <apply><eq/><ci>y</ci><apply><root/><degree><cn>3</cn></degree><ci>x</ci></apply></apply>
  <apply><eq/><ci>s</ci><apply><root/><degree><cn>2</cn></degree><ci>x</ci></apply></apply>
  <apply><eq/><ci>l</ci><apply><log/><logbase><cn>2</cn></logbase><ci>x</ci></apply></apply>
  <apply><eq/><ci>z</ci><ci>x</ci></apply>
</math>"#;
        let math = read_math(input).unwrap();
        assert_eq!(4, math.children.len());

        let rhs = |i: usize| math.children[i].as_equation().unwrap().1.clone();
        assert_eq!(
            MathNode::apply(
                Operator::Power,
                vec![
                    MathNode::ci("x"),
                    MathNode::apply(Operator::Divide, vec![MathNode::cn("1"), MathNode::cn("3")]),
                ]
            ),
            rhs(0)
        );
        assert_eq!(MathNode::apply(Operator::Root, vec![MathNode::ci("x")]), rhs(1));
        assert_eq!(
            MathNode::apply(
                Operator::Divide,
                vec![
                    MathNode::apply(Operator::Ln, vec![MathNode::ci("x")]),
                    MathNode::apply(Operator::Ln, vec![MathNode::cn("2")]),
                ]
            ),
            rhs(2)
        );
        assert_eq!(MathNode::ci("x"), rhs(3));
    }

    #[test]
    fn test_unknown_operator_is_kept() {
        let math = read_math("<math><apply><rem/><ci>a</ci><cn>2</cn></apply></math>").unwrap();
        assert_eq!(
            MathNode::apply(
                Operator::Other("rem".to_owned()),
                vec![MathNode::ci("a"), MathNode::cn("2")]
            ),
            math.children[0]
        );
    }
}
