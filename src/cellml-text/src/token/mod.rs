// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// a hand-written scanner for CellML Text, tracking 1-based line
// numbers instead of byte spans

use std::str::CharIndices;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use self::Token::*;
use crate::common::{ErrorCode, ParserError};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'input> {
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
    Ident(&'input str),
    Num(&'input str),
}

impl<'input> Token<'input> {
    /// The source text this token was scanned from.
    pub fn text(&self) -> &'input str {
        match self {
            Def => "def",
            Model => "model",
            Comp => "comp",
            EndDef => "enddef",
            As => "as",
            Var => "var",
            Unit => "unit",
            Sel => "sel",
            Case => "case",
            Otherwise => "otherwise",
            EndSel => "endsel",
            And => "and",
            Or => "or",
            Assign => "=",
            Eq => "==",
            Neq => "!=",
            Lt => "<",
            Lte => "<=",
            Gt => ">",
            Gte => ">=",
            Plus => "+",
            Minus => "-",
            Mul => "*",
            Div => "/",
            Comma => ",",
            Colon => ":",
            Semicolon => ";",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            Ident(s) | Num(s) => s,
        }
    }
}

/// A token paired with the line it starts on.
pub type Lined<T> = (usize, T);

pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
    line: usize,
    diagnostics: Vec<ParserError>,
}

const KEYWORDS: &[(&str, Token<'static>)] = &[
    ("def", Def),
    ("model", Model),
    ("comp", Comp),
    ("enddef", EndDef),
    ("as", As),
    ("var", Var),
    ("unit", Unit),
    ("sel", Sel),
    ("case", Case),
    ("otherwise", Otherwise),
    ("endsel", EndSel),
    ("and", And),
    ("or", Or),
];

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            lookahead: None,
            line: 1,
            diagnostics: vec![],
        };
        t.lookahead = t.chars.next();
        t
    }

    /// The current line, i.e. the line of the next unread character.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Lexical anomalies seen so far. Scanning never stops on these.
    pub fn diagnostics(&self) -> &[ParserError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<ParserError> {
        std::mem::take(&mut self.diagnostics)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        if let Some((_, '\n')) = self.lookahead {
            self.line += 1;
        }
        self.lookahead = self.chars.next();
        self.lookahead
    }

    fn bump_n(&mut self, n: usize) -> Option<(usize, char)> {
        for _ in 0..n {
            self.bump();
        }
        self.lookahead
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    fn identifierish(&mut self, idx0: usize) -> Lined<Token<'input>> {
        let line = self.line;
        let word = match self.take_while(is_identifier_continue) {
            Some(end) => &self.text[idx0..end],
            None => &self.text[idx0..],
        };

        let tok = KEYWORDS
            .iter()
            .filter(|&&(w, _)| w == word)
            .map(|(_, t)| *t)
            .next()
            .unwrap_or(Ident(word));

        (line, tok)
    }

    /// Scans a number literal starting at `idx0`. Returns `None` when the
    /// text there has no digits at all (a bare `.`).
    fn number(&mut self, idx0: usize) -> Option<Lined<Token<'input>>> {
        lazy_static! {
            static ref NUMBER_RE: Regex = Regex::new(r"^[0-9]*(\.[0-9]*)?([eE][-+]?[0-9]+)?").unwrap();
        }

        let len = NUMBER_RE.find(&self.text[idx0..]).map_or(0, |m| m.end());
        let literal = &self.text[idx0..idx0 + len];
        if !literal.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }

        let line = self.line;
        self.bump_n(literal.chars().count());
        Some((line, Num(literal)))
    }

    fn line_comment(&mut self) {
        self.take_until(|c| c == '\n');
    }

    fn unknown_char(&mut self, c: char) {
        warn!(line = self.line, "unknown character {:?}", c);
        self.diagnostics.push(ParserError::new(
            self.line,
            ErrorCode::UnknownCharacter,
            format!("unknown character '{c}'"),
        ));
    }

    fn consume(&mut self, tok: Token<'input>) -> Option<Lined<Token<'input>>> {
        let line = self.line;
        self.bump();
        Some((line, tok))
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Lined<Token<'input>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.line;
            return match self.lookahead {
                Some((_, '/')) => {
                    match self.bump() {
                        Some((_, '/')) => {
                            self.line_comment();
                            continue;
                        }
                        // we've already bumped, don't consume
                        _ => Some((line, Div)),
                    }
                }
                Some((_, '=')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(Eq),
                        _ => Some((line, Assign)),
                    }
                }
                Some((_, '!')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(Neq),
                        // a lone '!' is reported and skipped; whatever
                        // follows it is scanned normally
                        _ => {
                            self.unknown_char('!');
                            continue;
                        }
                    }
                }
                Some((_, '<')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(Lte),
                        _ => Some((line, Lt)),
                    }
                }
                Some((_, '>')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(Gte),
                        _ => Some((line, Gt)),
                    }
                }
                Some((_, '+')) => self.consume(Plus),
                Some((_, '-')) => self.consume(Minus),
                Some((_, '*')) => self.consume(Mul),
                Some((_, ',')) => self.consume(Comma),
                Some((_, ':')) => self.consume(Colon),
                Some((_, ';')) => self.consume(Semicolon),
                Some((_, '(')) => self.consume(LParen),
                Some((_, ')')) => self.consume(RParen),
                Some((_, '{')) => self.consume(LBrace),
                Some((_, '}')) => self.consume(RBrace),
                Some((i, c)) if is_identifier_start(c) => Some(self.identifierish(i)),
                Some((i, c)) if is_number_start(c) => match self.number(i) {
                    Some(tok) => Some(tok),
                    None => {
                        self.bump();
                        self.unknown_char(c);
                        continue;
                    }
                },
                Some((_, c)) if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                Some((_, c)) => {
                    self.bump(); // eat whatever is killing us
                    self.unknown_char(c);
                    continue;
                }
                None => None,
            };
        }
    }
}

/// Whether `word` scans as a keyword, and so can't be used as a name.
pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|&(w, _)| w == word)
}

fn is_number_start(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
