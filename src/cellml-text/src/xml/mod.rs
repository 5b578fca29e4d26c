// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::ast::{Apply, Cn, CnValue, Component, Math, MathNode, Model, Piecewise, Units, Variable};
use crate::common::{Error, ErrorCode, ErrorKind, Result};

mod reader;

pub use self::reader::{read_math, read_model};

pub const CELLML_NS: &str = "http://www.cellml.org/cellml/2.0#";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
const CELLML_PREFIX_ATTR: &str = "xmlns:cellml";
const CN_UNITS_ATTR: &str = "cellml:units";

pub(crate) trait ToXml<W: Write> {
    fn write_xml(&self, writer: &mut Writer<W>) -> Result<()>;
}

pub(crate) type XmlWriter = Cursor<Vec<u8>>;

fn xml_error<E: fmt::Display>(err: E) -> Error {
    Error::new(
        ErrorKind::Xml,
        ErrorCode::XmlSerialization,
        Some(err.to_string()),
    )
}

fn start_elem<'a>(tag_name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut elem = BytesStart::new(tag_name);
    for attr in attrs.iter() {
        elem.push_attribute(*attr);
    }
    elem
}

fn write_tag_start_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    writer
        .write_event(Event::Start(start_elem(tag_name, attrs)))
        .map_err(xml_error)
}

fn write_tag_start(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    write_tag_start_with_attrs(writer, tag_name, &[])
}

fn write_tag_end(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(tag_name)))
        .map_err(xml_error)
}

fn write_tag_text(writer: &mut Writer<XmlWriter>, content: &str) -> Result<()> {
    writer
        .write_event(Event::Text(BytesText::new(content)))
        .map_err(xml_error)
}

fn write_empty_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    writer
        .write_event(Event::Empty(start_elem(tag_name, attrs)))
        .map_err(xml_error)
}

fn write_empty(writer: &mut Writer<XmlWriter>, tag_name: &str) -> Result<()> {
    write_empty_with_attrs(writer, tag_name, &[])
}

/// `<tag>content</tag>` on one line, or `<tag/>` when there is no content.
fn write_tag_with_attrs(
    writer: &mut Writer<XmlWriter>,
    tag_name: &str,
    content: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    if content.is_empty() {
        return write_empty_with_attrs(writer, tag_name, attrs);
    }

    write_tag_start_with_attrs(writer, tag_name, attrs)?;

    write_tag_text(writer, content)?;

    write_tag_end(writer, tag_name)
}

impl ToXml<XmlWriter> for Model {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        if let Some(ref name) = self.name {
            attrs.push(("name", name.as_str()));
        }
        attrs.push(("xmlns", CELLML_NS));

        if self.units.is_empty() && self.components.is_empty() {
            return write_empty_with_attrs(writer, "model", &attrs);
        }

        write_tag_start_with_attrs(writer, "model", &attrs)?;

        for units in self.units.iter() {
            units.write_xml(writer)?;
        }

        for component in self.components.iter() {
            component.write_xml(writer)?;
        }

        write_tag_end(writer, "model")
    }
}

impl ToXml<XmlWriter> for Units {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = &[("name", self.name.as_str())];
        if self.units.is_empty() {
            return write_empty_with_attrs(writer, "units", attrs);
        }

        write_tag_start_with_attrs(writer, "units", attrs)?;
        for unit in self.units.iter() {
            let mut attrs = vec![("units", unit.units.as_str())];
            if let Some(ref prefix) = unit.prefix {
                attrs.push(("prefix", prefix.as_str()));
            }
            if let Some(ref exponent) = unit.exponent {
                attrs.push(("exponent", exponent.as_str()));
            }
            if let Some(ref multiplier) = unit.multiplier {
                attrs.push(("multiplier", multiplier.as_str()));
            }
            write_empty_with_attrs(writer, "unit", &attrs)?;
        }
        write_tag_end(writer, "units")
    }
}

impl ToXml<XmlWriter> for Component {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = &[("name", self.name.as_str())];
        if self.variables.is_empty() && self.maths.is_empty() {
            return write_empty_with_attrs(writer, "component", attrs);
        }

        write_tag_start_with_attrs(writer, "component", attrs)?;

        for var in self.variables.iter() {
            var.write_xml(writer)?;
        }

        for math in self.maths.iter() {
            math.write_xml(writer)?;
        }

        write_tag_end(writer, "component")
    }
}

impl ToXml<XmlWriter> for Variable {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![("name", self.name.as_str()), ("units", self.units.as_str())];
        if let Some(ref init) = self.initial_value {
            attrs.push(("initial_value", init.as_str()));
        }
        if let Some(ref interface) = self.interface {
            attrs.push(("interface", interface.as_str()));
        }
        write_empty_with_attrs(writer, "variable", &attrs)
    }
}

impl ToXml<XmlWriter> for Math {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let attrs = &[("xmlns", MATHML_NS), (CELLML_PREFIX_ATTR, CELLML_NS)];
        if self.children.is_empty() {
            return write_empty_with_attrs(writer, "math", attrs);
        }

        write_tag_start_with_attrs(writer, "math", attrs)?;
        for child in self.children.iter() {
            child.write_xml(writer)?;
        }
        write_tag_end(writer, "math")
    }
}

impl ToXml<XmlWriter> for MathNode {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        match self {
            MathNode::Apply(apply) => apply.write_xml(writer),
            MathNode::Ci(name) => write_tag_with_attrs(writer, "ci", name, &[]),
            MathNode::Cn(cn) => cn.write_xml(writer),
            MathNode::Constant(c) => write_empty(writer, c.name()),
            MathNode::Piecewise(piecewise) => piecewise.write_xml(writer),
            MathNode::Bvar(inner) => {
                write_tag_start(writer, "bvar")?;
                inner.write_xml(writer)?;
                write_tag_end(writer, "bvar")
            }
        }
    }
}

impl ToXml<XmlWriter> for Apply {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        // the source tag lives only on the in-memory tree
        write_tag_start(writer, "apply")?;
        write_empty(writer, self.op.name())?;
        for arg in self.args.iter() {
            arg.write_xml(writer)?;
        }
        write_tag_end(writer, "apply")
    }
}

impl ToXml<XmlWriter> for Cn {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        let mut attrs = vec![];
        if let Some(ref units) = self.units {
            attrs.push((CN_UNITS_ATTR, units.as_str()));
        }
        match &self.value {
            CnValue::Real(value) => write_tag_with_attrs(writer, "cn", value, &attrs),
            CnValue::ENotation { mantissa, exponent } => {
                attrs.push(("type", "e-notation"));
                write_tag_start_with_attrs(writer, "cn", &attrs)?;
                write_tag_text(writer, mantissa)?;
                write_empty(writer, "sep")?;
                write_tag_text(writer, exponent)?;
                write_tag_end(writer, "cn")
            }
        }
    }
}

impl ToXml<XmlWriter> for Piecewise {
    fn write_xml(&self, writer: &mut Writer<XmlWriter>) -> Result<()> {
        if self.pieces.is_empty() && self.otherwise.is_none() {
            return write_empty(writer, "piecewise");
        }

        write_tag_start(writer, "piecewise")?;
        for piece in self.pieces.iter() {
            write_tag_start(writer, "piece")?;
            piece.value.write_xml(writer)?;
            piece.condition.write_xml(writer)?;
            write_tag_end(writer, "piece")?;
        }
        if let Some(ref otherwise) = self.otherwise {
            write_tag_start(writer, "otherwise")?;
            otherwise.write_xml(writer)?;
            write_tag_end(writer, "otherwise")?;
        }
        write_tag_end(writer, "piecewise")
    }
}

fn render<T: ToXml<XmlWriter>>(node: &T) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    node.write_xml(&mut writer)?;
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(xml_error)
}

/// Serialize a model as indented CellML 2.0 XML.
pub fn to_xml(model: &Model) -> Result<String> {
    render(model)
}

/// Serialize a standalone `math` element.
pub fn math_to_xml(math: &Math) -> Result<String> {
    render(math)
}
