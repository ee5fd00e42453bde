//! The shorthand command-line interface.
//!
//! `scan` lists the units found in files; `check` reports malformed ones.
//! Neither runs callbacks: the CLI knows the grammar, not the application's
//! processors.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, NamedSource, WrapErr};
use termcolor::StandardStream;
use tracing::{debug, Level};
use walkdir::WalkDir;

use crate::cli::args::{Command, ShorthandArgs};
use crate::diagnostics::SourceArc;
use crate::scanner::{self, Imbalance, Unit};
use crate::{binding, err_ctx, EngineConfig, Grammar, ParamShape, ShorthandError};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = ShorthandArgs::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path).unwrap_or_else(|e| {
            output::print_error(e);
            process::exit(2);
        }),
        None => EngineConfig::default(),
    };

    let result = match args.command {
        Command::Scan { path, extensions } => handle_scan(&path, &extensions, &config.grammar).map(|_| 0),
        Command::Check { path, extensions } => handle_check(&path, &extensions, &config.grammar),
    };

    match result {
        Ok(0) => {}
        Ok(findings) => {
            debug!(findings, "check failed");
            process::exit(1);
        }
        Err(report) => {
            eprintln!("{report:?}");
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn handle_scan(path: &Path, extensions: &[String], grammar: &Grammar) -> miette::Result<()> {
    let mut stdout = StandardStream::stdout(output::color_choice());
    let files = collect_files(path, extensions);
    let mut total = 0;
    for file in &files {
        let source = read_source(file)?;
        for unit in scanner::units(&source, grammar) {
            let (name, args) = split_unit(&unit, grammar);
            let items = binding::split_arguments(args, grammar);
            output::print_unit(&mut stdout, file, &source, unit.span, name, &items);
            total += 1;
        }
    }
    output::print_summary(total, files.len(), 0);
    Ok(())
}

fn handle_check(path: &Path, extensions: &[String], grammar: &Grammar) -> miette::Result<usize> {
    let files = collect_files(path, extensions);
    let mut units = 0;
    let mut findings = 0;
    for file in &files {
        let source = read_source(file)?;
        units += scanner::units(&source, grammar).len();
        for error in check_source(&file.display().to_string(), &source, grammar) {
            output::print_error(error);
            findings += 1;
        }
    }
    output::print_summary(units, files.len(), findings);
    Ok(findings)
}

// ============================================================================
// HELPERS
// ============================================================================

/// Every problem in `source` that would stop a substitution, in text order.
///
/// Units are checked against the grammar alone: a valid name, and an argument
/// list any shape could accept.
pub fn check_source(name: &str, source: &str, grammar: &Grammar) -> Vec<ShorthandError> {
    let mut findings: Vec<(usize, ShorthandError)> = Vec::new();
    if let Some(imbalance) = scanner::find_imbalance(source, grammar) {
        let (span, message) = match imbalance {
            Imbalance::Unclosed(span) => (span, format!("'{}' is never closed", grammar.lead_in())),
            Imbalance::Unopened(span) => (span, format!("'{}' closes nothing", grammar.lead_out())),
        };
        let src: SourceArc = Arc::new(NamedSource::new(name, source.to_string()));
        let help = format!("escape literal delimiters as {}{}", grammar.escape(), grammar.lead_in());
        findings.push((span.start, err_ctx!(OpenShorthand, message, &src, span, help)));
    }
    for unit in scanner::units(source, grammar) {
        let (callee, args) = split_unit(&unit, grammar);
        let items = binding::split_arguments(args, grammar);
        let checked = grammar
            .check_name(callee)
            .and_then(|_| binding::bind(callee, &ParamShape::variadic(), &items, grammar));
        if let Err(e) = checked {
            findings.push((unit.span.start, e.with_named_snippet(name, source, unit.span)));
        }
    }
    findings.sort_by_key(|(offset, _)| *offset);
    findings.into_iter().map(|(_, e)| e).collect()
}

/// Splits a unit's inner text into its name and raw argument span.
fn split_unit<'t>(unit: &Unit<'t>, grammar: &Grammar) -> (&'t str, Option<&'t str>) {
    match grammar.find_unescaped(unit.inner, grammar.separator()) {
        Some(pos) => (
            &unit.inner[..pos],
            Some(&unit.inner[pos + grammar.separator().len_utf8()..]),
        ),
        None => (unit.inner, None),
    }
}

fn collect_files(path: &Path, extensions: &[String]) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            extensions.is_empty()
                || e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| extensions.iter().any(|wanted| wanted.trim_start_matches('.') == ext))
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect()
}

fn read_source(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot read '{}'", path.display()))
}
