// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for CellML Text.
//!
//! The whole token stream is collected up front; every grammar function
//! returns a `SyntaxResult` and the first mismatch is propagated straight
//! back to [`parse_with_options`], which turns it into a [`ParseResult`]
//! holding exactly one error. There is no recovery.

use serde::Serialize;
use tracing::debug;

use crate::ast::{
    Apply, Cn, Component, Constant, LineSpan, Math, MathNode, Model, Operator, Piece, Piecewise,
    SourceTag, Unit, Units, Variable,
};
use crate::common::{ErrorCode, ParserError, SyntaxResult};
use crate::token::{Lexer, Lined, Token};
use crate::xml;

#[cfg(test)]
mod tests;

pub const DEFAULT_SOURCE_LINE_ATTRIBUTE: &str = "data-source-line";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserOptions {
    /// Name of the in-memory attribute recording each equation's source
    /// lines. `None` or an empty name turns tagging off. It is never
    /// serialized either way.
    pub source_line_attribute: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            source_line_attribute: Some(DEFAULT_SOURCE_LINE_ATTRIBUTE.to_owned()),
        }
    }
}

impl ParserOptions {
    pub fn without_source_lines() -> Self {
        ParserOptions {
            source_line_attribute: None,
        }
    }
}

/// Either `xml` and `model` are set and `errors` is empty, or neither is
/// set and `errors` holds exactly one entry.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ParseResult {
    pub xml: Option<String>,
    #[serde(skip)]
    pub model: Option<Model>,
    pub errors: Vec<ParserError>,
    pub warnings: Vec<ParserError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// TokenKind discriminant for efficient peek comparisons without payload matching
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenKind {
    Def,
    Model,
    Comp,
    EndDef,
    As,
    Var,
    Unit,
    Sel,
    Case,
    Otherwise,
    EndSel,
    And,
    Or,
    Assign,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Ident,
    Num,
}

impl<'a> From<&Token<'a>> for TokenKind {
    fn from(token: &Token<'a>) -> Self {
        match token {
            Token::Def => TokenKind::Def,
            Token::Model => TokenKind::Model,
            Token::Comp => TokenKind::Comp,
            Token::EndDef => TokenKind::EndDef,
            Token::As => TokenKind::As,
            Token::Var => TokenKind::Var,
            Token::Unit => TokenKind::Unit,
            Token::Sel => TokenKind::Sel,
            Token::Case => TokenKind::Case,
            Token::Otherwise => TokenKind::Otherwise,
            Token::EndSel => TokenKind::EndSel,
            Token::And => TokenKind::And,
            Token::Or => TokenKind::Or,
            Token::Assign => TokenKind::Assign,
            Token::Eq => TokenKind::Eq,
            Token::Neq => TokenKind::Neq,
            Token::Lt => TokenKind::Lt,
            Token::Lte => TokenKind::Lte,
            Token::Gt => TokenKind::Gt,
            Token::Gte => TokenKind::Gte,
            Token::Plus => TokenKind::Plus,
            Token::Minus => TokenKind::Minus,
            Token::Mul => TokenKind::Mul,
            Token::Div => TokenKind::Div,
            Token::Comma => TokenKind::Comma,
            Token::Colon => TokenKind::Colon,
            Token::Semicolon => TokenKind::Semicolon,
            Token::LParen => TokenKind::LParen,
            Token::RParen => TokenKind::RParen,
            Token::LBrace => TokenKind::LBrace,
            Token::RBrace => TokenKind::RBrace,
            Token::Ident(_) => TokenKind::Ident,
            Token::Num(_) => TokenKind::Num,
        }
    }
}

impl TokenKind {
    fn describe(self) -> String {
        let text = match self {
            TokenKind::Ident => return "identifier".to_owned(),
            TokenKind::Num => return "number".to_owned(),
            TokenKind::Def => "def",
            TokenKind::Model => "model",
            TokenKind::Comp => "comp",
            TokenKind::EndDef => "enddef",
            TokenKind::As => "as",
            TokenKind::Var => "var",
            TokenKind::Unit => "unit",
            TokenKind::Sel => "sel",
            TokenKind::Case => "case",
            TokenKind::Otherwise => "otherwise",
            TokenKind::EndSel => "endsel",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::Neq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Lte => "<=",
            TokenKind::Gt => ">",
            TokenKind::Gte => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Mul => "*",
            TokenKind::Div => "/",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
        };
        format!("'{text}'")
    }
}

/// Parser state holding tokenized input
struct Parser<'input> {
    tokens: Vec<Lined<Token<'input>>>,
    pos: usize,
    eof_line: usize,
    source_attribute: Option<String>,
}

impl<'input> Parser<'input> {
    fn new(
        tokens: Vec<Lined<Token<'input>>>,
        eof_line: usize,
        options: &ParserOptions,
    ) -> Self {
        let source_attribute = options
            .source_line_attribute
            .as_ref()
            .filter(|name| !name.is_empty())
            .cloned();
        Parser {
            tokens,
            pos: 0,
            eof_line,
            source_attribute,
        }
    }

    /// Peek at the current token without consuming it
    fn peek(&self) -> Option<&Lined<Token<'input>>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens
            .get(self.pos + offset)
            .map(|(_, tok)| TokenKind::from(tok))
    }

    /// Advance to the next token and return the consumed token
    fn advance(&mut self) -> Option<Lined<Token<'input>>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Line of the current token, or of the end of input.
    fn line(&self) -> usize {
        self.peek().map_or(self.eof_line, |(line, _)| *line)
    }

    fn unexpected<T>(&self, expected: &str) -> SyntaxResult<T> {
        match self.peek() {
            Some((line, tok)) => Err(ParserError::new(
                *line,
                ErrorCode::UnexpectedToken,
                format!("expected {} but found '{}'", expected, tok.text()),
            )),
            None => Err(ParserError::new(
                self.eof_line,
                ErrorCode::UnrecognizedEof,
                format!("expected {expected} but found end of input"),
            )),
        }
    }

    /// Expect the current token to match the expected kind, returning an error if not
    fn expect(&mut self, expected: TokenKind) -> SyntaxResult<Lined<Token<'input>>> {
        if self.peek_kind() == Some(expected) {
            // peek_kind just matched, so there is a token to take
            match self.advance() {
                Some(tok) => Ok(tok),
                None => self.unexpected(&expected.describe()),
            }
        } else {
            self.unexpected(&expected.describe())
        }
    }

    fn expect_ident(&mut self) -> SyntaxResult<&'input str> {
        match self.expect(TokenKind::Ident)? {
            (_, Token::Ident(name)) => Ok(name),
            _ => self.unexpected("identifier"),
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Model := 'def' 'model' Identifier? 'as' Block* 'enddef' ';'
    fn parse_model(&mut self) -> SyntaxResult<Model> {
        self.expect(TokenKind::Def)?;
        self.expect(TokenKind::Model)?;
        let name = if self.peek_kind() == Some(TokenKind::Ident) {
            Some(self.expect_ident()?.to_owned())
        } else {
            None
        };
        self.expect(TokenKind::As)?;

        let mut model = Model {
            name,
            ..Default::default()
        };

        while self.peek_kind() == Some(TokenKind::Def) {
            self.parse_block(&mut model)?;
        }

        self.expect(TokenKind::EndDef)?;
        self.expect(TokenKind::Semicolon)?;

        if let Some((line, tok)) = self.peek() {
            return Err(ParserError::new(
                *line,
                ErrorCode::ExtraToken,
                format!("expected end of input but found '{}'", tok.text()),
            ));
        }

        Ok(model)
    }

    /// Block := 'def' ( Component | Unit )
    fn parse_block(&mut self, model: &mut Model) -> SyntaxResult<()> {
        self.expect(TokenKind::Def)?;
        match self.peek_kind() {
            Some(TokenKind::Comp) => {
                let component = self.parse_component()?;
                model.components.push(component);
            }
            Some(TokenKind::Unit) => {
                let units = self.parse_units()?;
                model.units.push(units);
            }
            _ => return self.unexpected("'comp' or 'unit'"),
        }
        Ok(())
    }

    /// Component := 'comp' Identifier 'as' (Variable | MathStatement)* 'enddef' ';'
    fn parse_component(&mut self) -> SyntaxResult<Component> {
        self.expect(TokenKind::Comp)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::As)?;

        let mut component = Component::new(name);
        let mut math = Math::default();

        loop {
            match self.peek_kind() {
                Some(TokenKind::EndDef) => break,
                Some(TokenKind::Var) => {
                    let var = self.parse_variable()?;
                    component.variables.push(var);
                }
                _ => {
                    let eqn = self.parse_math_statement()?;
                    math.children.push(eqn);
                }
            }
        }

        self.expect(TokenKind::EndDef)?;
        self.expect(TokenKind::Semicolon)?;

        if !math.children.is_empty() {
            component.maths.push(math);
        }

        Ok(component)
    }

    /// Unit := 'unit' Identifier 'as' ('unit' Identifier PropBlock? ';')* 'enddef' ';'
    fn parse_units(&mut self) -> SyntaxResult<Units> {
        self.expect(TokenKind::Unit)?;
        let name = self.expect_ident()?.to_owned();
        self.expect(TokenKind::As)?;

        let mut units = vec![];
        while self.peek_kind() == Some(TokenKind::Unit) {
            self.advance();
            let mut unit = Unit {
                units: self.expect_ident()?.to_owned(),
                ..Default::default()
            };
            if self.peek_kind() == Some(TokenKind::LBrace) {
                for (key, value) in self.parse_props()? {
                    match key {
                        "prefix" => unit.prefix = Some(value),
                        "exponent" => unit.exponent = Some(value),
                        "multiplier" => unit.multiplier = Some(value),
                        _ => debug!(key, unit = %unit.units, "dropping unrecognized unit property"),
                    }
                }
            }
            self.expect(TokenKind::Semicolon)?;
            units.push(unit);
        }

        self.expect(TokenKind::EndDef)?;
        self.expect(TokenKind::Semicolon)?;

        Ok(Units { name, units })
    }

    /// Variable := 'var' Identifier ':' Identifier PropBlock? ';'
    fn parse_variable(&mut self) -> SyntaxResult<Variable> {
        self.expect(TokenKind::Var)?;
        let name = self.expect_ident()?.to_owned();
        self.expect(TokenKind::Colon)?;
        let units = self.expect_ident()?.to_owned();

        let mut var = Variable {
            name,
            units,
            ..Default::default()
        };

        if self.peek_kind() == Some(TokenKind::LBrace) {
            for (key, value) in self.parse_props()? {
                match key {
                    "init" => var.initial_value = Some(value),
                    "interface" => var.interface = Some(value),
                    _ => debug!(key, var = %var.name, "dropping unrecognized variable property"),
                }
            }
        }

        self.expect(TokenKind::Semicolon)?;

        Ok(var)
    }

    /// PropBlock := '{' Prop (',' Prop)* '}'
    fn parse_props(&mut self) -> SyntaxResult<Vec<(&'input str, String)>> {
        self.expect(TokenKind::LBrace)?;

        let mut props = vec![];
        loop {
            let key = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_prop_value()?;
            props.push((key, value));

            if self.peek_kind() != Some(TokenKind::Comma) {
                break;
            }
            self.advance(); // consume ','

            // Handle trailing comma
            if self.peek_kind() == Some(TokenKind::RBrace) {
                break;
            }
        }

        self.expect(TokenKind::RBrace)?;

        Ok(props)
    }

    /// Prop value: '-'? Number | Identifier
    fn parse_prop_value(&mut self) -> SyntaxResult<String> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.advance();
                let (_, tok) = self.expect(TokenKind::Num)?;
                Ok(format!("-{}", tok.text()))
            }
            Some(TokenKind::Num) | Some(TokenKind::Ident) => match self.advance() {
                Some((_, tok)) => Ok(tok.text().to_owned()),
                None => self.unexpected("number or identifier"),
            },
            _ => self.unexpected("number or identifier"),
        }
    }

    /// MathStatement := Expression '=' Expression ';'
    fn parse_math_statement(&mut self) -> SyntaxResult<MathNode> {
        let start_line = self.line();
        let lhs = self.parse_expression()?;
        self.expect(TokenKind::Assign)?;
        let rhs = self.parse_expression()?;
        let (end_line, _) = self.expect(TokenKind::Semicolon)?;

        let mut eqn = Apply::new(Operator::Eq, vec![lhs, rhs]);
        eqn.source = self.source_attribute.as_ref().map(|attribute| SourceTag {
            attribute: attribute.clone(),
            span: LineSpan::new(start_line, end_line),
        });

        Ok(MathNode::Apply(eqn))
    }

    /// Condition := Comparison (('and'|'or') Comparison)*
    fn parse_condition(&mut self) -> SyntaxResult<MathNode> {
        let mut left = self.parse_comparison()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::And) => Operator::And,
                Some(TokenKind::Or) => Operator::Or,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = MathNode::apply(op, vec![left, right]);
        }

        Ok(left)
    }

    /// Comparison := Expression (CompOp Expression)?
    fn parse_comparison(&mut self) -> SyntaxResult<MathNode> {
        let left = self.parse_expression()?;

        let op = match self.peek_kind() {
            Some(TokenKind::Eq) => Operator::Eq,
            Some(TokenKind::Neq) => Operator::Neq,
            Some(TokenKind::Lt) => Operator::Lt,
            Some(TokenKind::Lte) => Operator::Leq,
            Some(TokenKind::Gt) => Operator::Gt,
            Some(TokenKind::Gte) => Operator::Geq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_expression()?;

        Ok(MathNode::apply(op, vec![left, right]))
    }

    /// Expression := Term (('+'|'-') Term)*
    fn parse_expression(&mut self) -> SyntaxResult<MathNode> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => Operator::Plus,
                Some(TokenKind::Minus) => Operator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = MathNode::apply(op, vec![left, right]);
        }

        Ok(left)
    }

    /// Term := Factor (('*'|'/') Factor)*
    fn parse_term(&mut self) -> SyntaxResult<MathNode> {
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Mul) => Operator::Times,
                Some(TokenKind::Div) => Operator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = MathNode::apply(op, vec![left, right]);
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> SyntaxResult<MathNode> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.advance();
                let operand = self.parse_factor()?;
                Ok(MathNode::apply(Operator::Minus, vec![operand]))
            }
            Some(TokenKind::Num) => {
                let (_, tok) = self.expect(TokenKind::Num)?;
                let mut cn = Cn::new(tok.text());
                if self.peek_kind() == Some(TokenKind::LBrace) {
                    cn.units = self.parse_cn_units()?;
                }
                Ok(MathNode::Cn(cn))
            }
            Some(TokenKind::Ident) => {
                if self.peek_kind_at(1) == Some(TokenKind::LParen) {
                    return self.parse_call();
                }
                let name = self.expect_ident()?;
                match Constant::from_name(name) {
                    Some(c) => Ok(MathNode::Constant(c)),
                    None => Ok(MathNode::ci(name)),
                }
            }
            Some(TokenKind::LParen) => {
                self.advance(); // consume '('
                let expr = self.parse_condition()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            Some(TokenKind::Sel) => self.parse_piecewise(),
            _ => self.unexpected("expression"),
        }
    }

    /// `{units: name, ...}` after a number. Anything besides a leading
    /// `units:` pair is skipped.
    fn parse_cn_units(&mut self) -> SyntaxResult<Option<String>> {
        self.expect(TokenKind::LBrace)?;

        let mut units = None;
        let has_units = matches!(self.peek(), Some((_, Token::Ident("units"))))
            && self.peek_kind_at(1) == Some(TokenKind::Colon)
            && self.peek_kind_at(2) == Some(TokenKind::Ident);
        if has_units {
            self.advance();
            self.advance();
            units = Some(self.expect_ident()?.to_owned());
        }

        while self.peek_kind() != Some(TokenKind::RBrace) {
            if self.is_at_end() {
                return self.unexpected("'}'");
            }
            self.advance();
        }
        self.expect(TokenKind::RBrace)?;

        Ok(units)
    }

    /// Function application: id(args), with `ode(dep, indep)` desugared
    /// into MathML's `diff`/`bvar` form
    fn parse_call(&mut self) -> SyntaxResult<MathNode> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let mut args = self.parse_comma_separated_exprs()?;
        self.expect(TokenKind::RParen)?;

        if name == "ode" && args.len() == 2 {
            let indep = args.pop().map(Box::new);
            let dep = args.pop();
            if let (Some(dep), Some(indep)) = (dep, indep) {
                return Ok(MathNode::apply(
                    Operator::Diff,
                    vec![MathNode::Bvar(indep), dep],
                ));
            }
        }

        Ok(MathNode::apply(Operator::from_function_name(name), args))
    }

    /// Parse comma-separated expressions (for function arguments)
    fn parse_comma_separated_exprs(&mut self) -> SyntaxResult<Vec<MathNode>> {
        let mut exprs = Vec::new();

        // Handle empty list
        if self.peek_kind() == Some(TokenKind::RParen) {
            return Ok(exprs);
        }

        exprs.push(self.parse_condition()?);

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance(); // consume ','
            exprs.push(self.parse_condition()?);
        }

        Ok(exprs)
    }

    /// 'sel' ('case' Condition ':' Expression ';')* ('otherwise' ':' Expression ';')? 'endsel'
    fn parse_piecewise(&mut self) -> SyntaxResult<MathNode> {
        self.expect(TokenKind::Sel)?;

        let mut pieces = vec![];
        while self.peek_kind() == Some(TokenKind::Case) {
            self.advance();
            let condition = self.parse_condition()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            self.expect(TokenKind::Semicolon)?;
            pieces.push(Piece { value, condition });
        }

        let mut otherwise = None;
        if self.peek_kind() == Some(TokenKind::Otherwise) {
            self.advance();
            self.expect(TokenKind::Colon)?;
            otherwise = Some(Box::new(self.parse_expression()?));
            self.expect(TokenKind::Semicolon)?;
        }

        self.expect(TokenKind::EndSel)?;

        Ok(MathNode::Piecewise(Piecewise { pieces, otherwise }))
    }
}

/// Parse CellML Text source into a model tree and its XML rendering,
/// using the default options.
pub fn parse(input: &str) -> ParseResult {
    parse_with_options(input, &ParserOptions::default())
}

pub fn parse_with_options(input: &str, options: &ParserOptions) -> ParseResult {
    let mut lexer = Lexer::new(input);
    let tokens: Vec<_> = lexer.by_ref().collect();
    let eof_line = lexer.line();
    let warnings = lexer.take_diagnostics();

    let mut parser = Parser::new(tokens, eof_line, options);
    let model = match parser.parse_model() {
        Ok(model) => model,
        Err(err) => {
            debug!(line = err.line, message = %err.message, "parse failed");
            return ParseResult {
                xml: None,
                model: None,
                errors: vec![err],
                warnings,
            };
        }
    };

    match xml::to_xml(&model) {
        Ok(xml) => ParseResult {
            xml: Some(xml),
            model: Some(model),
            errors: vec![],
            warnings,
        },
        Err(err) => ParseResult {
            xml: None,
            model: None,
            errors: vec![ParserError::new(
                eof_line,
                err.code,
                err.get_details().unwrap_or_else(|| err.to_string()),
            )],
            warnings,
        },
    }
}

/// Parse a single standalone expression, including comparisons and
/// `and`/`or` chains.
pub fn parse_math(input: &str) -> SyntaxResult<MathNode> {
    let mut lexer = Lexer::new(input);
    let tokens: Vec<_> = lexer.by_ref().collect();
    let eof_line = lexer.line();

    let mut parser = Parser::new(tokens, eof_line, &ParserOptions::without_source_lines());
    let expr = parser.parse_condition()?;

    if let Some((line, tok)) = parser.peek() {
        return Err(ParserError::new(
            *line,
            ErrorCode::ExtraToken,
            format!("expected end of input but found '{}'", tok.text()),
        ));
    }

    Ok(expr)
}
