// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod ast;
pub mod common;
pub mod generator;
pub mod latex;
mod parser;
mod token;
pub mod xml;

pub use self::common::{Error, ErrorCode, ErrorKind, ParserError, Result};
pub use self::generator::{generate, generate_expr, generate_model};
pub use self::parser::{
    DEFAULT_SOURCE_LINE_ATTRIBUTE, ParseResult, ParserOptions, parse, parse_math,
    parse_with_options,
};
pub use self::token::{Lexer, Token};
