// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownCharacter,
    UnexpectedToken,
    UnrecognizedEof,
    ExtraToken,
    XmlDeserialization,
    XmlSerialization,
    MissingModel,
    MissingOperator,
    UnsupportedElement,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            UnknownCharacter => "unknown_character",
            UnexpectedToken => "unexpected_token",
            UnrecognizedEof => "unrecognized_eof",
            ExtraToken => "extra_token",
            XmlDeserialization => "xml_deserialization",
            XmlSerialization => "xml_serialization",
            MissingModel => "missing_model",
            MissingOperator => "missing_operator",
            UnsupportedElement => "unsupported_element",
        };

        write!(f, "{name}")
    }
}

/// A diagnostic tied to a 1-based source line.
///
/// Syntax errors and lexical warnings share this shape; which list a
/// diagnostic lands in on [`crate::ParseResult`] decides whether it was fatal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ParserError {
    pub line: usize,
    pub code: ErrorCode,
    pub message: String,
}

impl ParserError {
    pub fn new(line: usize, code: ErrorCode, message: impl Into<String>) -> Self {
        ParserError {
            line,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl error::Error for ParserError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Xml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl From<ParserError> for Error {
    fn from(err: ParserError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            code: err.code,
            details: Some(err.to_string()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Parse => "ParseError",
            ErrorKind::Xml => "XmlError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;
pub type SyntaxResult<T> = result::Result<T, ParserError>;

#[macro_export]
macro_rules! xml_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Xml, ErrorCode::$code, Some($str)))
    }}
);

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Xml,
        ErrorCode::MissingModel,
        Some("no <model> root".to_owned()),
    );
    assert_eq!("XmlError{missing_model: no <model> root}", format!("{err}"));

    let err = Error::new(ErrorKind::Parse, ErrorCode::ExtraToken, None);
    assert_eq!("ParseError{extra_token}", format!("{err}"));
}

#[test]
fn test_parser_error_into_error() {
    let perr = ParserError::new(3, ErrorCode::UnexpectedToken, "expected ';' but found 'x'");
    assert_eq!("line 3: expected ';' but found 'x'", perr.to_string());

    let err = Error::from(perr);
    assert_eq!(ErrorKind::Parse, err.kind);
    assert_eq!(ErrorCode::UnexpectedToken, err.code);
}
