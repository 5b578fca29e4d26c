// Copyright 2026 The CellML Text Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs;

use clap::{Parser, Subcommand};

use cellml_text::ast::Model;
use cellml_text::{ParserOptions, generate_model, latex, parse_with_options, xml};

const EXIT_FAILURE: i32 = 1;

macro_rules! die(
    ($($arg:tt)*) => { {
        eprintln!($($arg)*);
        std::process::exit(EXIT_FAILURE)
    } }
);

/// Convert between CellML Text, CellML XML and LaTeX.
#[derive(Parser, Debug)]
#[command(name = "cellml-text", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile CellML Text into CellML XML
    ToXml {
        /// Print the whole parse result (xml, errors, warnings) as JSON
        #[arg(long)]
        json: bool,
        /// Path to write output to instead of stdout
        #[arg(long)]
        output: Option<String>,
        path: String,
    },
    /// Render CellML XML as CellML Text
    ToText {
        #[arg(long)]
        output: Option<String>,
        path: String,
    },
    /// Render every equation as LaTeX; input may be CellML Text or XML
    Latex {
        #[arg(long)]
        output: Option<String>,
        path: String,
    },
}

fn read_input(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => die!("error: couldn't read {}: {}", path, err),
    }
}

fn write_output(output: Option<String>, contents: &str) {
    match output {
        Some(path) => {
            if let Err(err) = fs::write(&path, contents) {
                die!("error: couldn't write {}: {}", path, err);
            }
        }
        None => print!("{}", contents),
    }
}

fn parse_text(source: &str) -> Model {
    let result = parse_with_options(source, &ParserOptions::default());
    for warning in result.warnings.iter() {
        eprintln!("warning: {}", warning);
    }
    match result.model {
        Some(model) => model,
        None => {
            for err in result.errors.iter() {
                eprintln!("{}", err);
            }
            std::process::exit(EXIT_FAILURE)
        }
    }
}

fn to_xml(path: &str, json: bool, output: Option<String>) {
    let source = read_input(path);

    if json {
        let result = parse_with_options(&source, &ParserOptions::default());
        let contents = match serde_json::to_string_pretty(&result) {
            Ok(contents) => contents,
            Err(err) => die!("error: {}", err),
        };
        write_output(output, &format!("{}\n", contents));
        if !result.is_ok() {
            std::process::exit(EXIT_FAILURE);
        }
        return;
    }

    let model = parse_text(&source);
    match xml::to_xml(&model) {
        Ok(contents) => write_output(output, &format!("{}\n", contents)),
        Err(err) => die!("error: {}", err),
    }
}

fn to_text(path: &str, output: Option<String>) {
    let source = read_input(path);
    let model = match xml::read_model(&source) {
        Ok(model) => model,
        Err(err) => die!("error: {}", err),
    };
    write_output(output, &generate_model(&model));
}

fn to_latex(path: &str, output: Option<String>) {
    let source = read_input(path);
    let model = if source.trim_start().starts_with('<') {
        match xml::read_model(&source) {
            Ok(model) => model,
            Err(err) => die!("error: {}", err),
        }
    } else {
        parse_text(&source)
    };

    let mut contents = String::new();
    for component in model.components.iter() {
        if component.maths.is_empty() {
            continue;
        }
        contents.push_str(&format!("% {}\n", component.name));
        for math in component.maths.iter() {
            contents.push_str(&latex::convert(math));
            contents.push('\n');
        }
    }
    write_output(output, &contents);
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::ToXml { json, output, path } => to_xml(&path, json, output),
        Command::ToText { output, path } => to_text(&path, output),
        Command::Latex { output, path } => to_latex(&path, output),
    }
}
