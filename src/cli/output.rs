//! Handles all user-facing output for the CLI.
//!
//! Listings go to stdout, coloured when stdout is a terminal. Diagnostics go
//! to stderr as `miette` reports.

use std::io::{IsTerminal, Write};
use std::path::Path;

use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::{RawItem, ShorthandError, Span};

// ============================================================================
// LISTINGS
// ============================================================================

/// Prints one unit as `path:line:col  name  item, item, ...`.
pub fn print_unit(
    stdout: &mut StandardStream,
    path: &Path,
    source: &str,
    span: Span,
    name: &str,
    items: &[RawItem<'_>],
) {
    let (line, column) = line_col(source, span.start);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = write!(stdout, "{}:{}:{}", path.display(), line, column);
    let _ = stdout.reset();
    let _ = write!(stdout, "  ");
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = write!(stdout, "{}", name);
    let _ = stdout.reset();

    let rendered: Vec<String> = items
        .iter()
        .map(|item| match item {
            RawItem::Positional(value) => format!("{:?}", value),
            RawItem::Keyword(key, value) => format!("{}={:?}", key, value),
        })
        .collect();
    if rendered.is_empty() {
        let _ = writeln!(stdout);
    } else {
        let _ = writeln!(stdout, "  {}", rendered.join(", "));
    }
}

/// Colour only when stdout is a terminal and `NO_COLOR` is unset.
pub fn color_choice() -> ColorChoice {
    if std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Prints the closing summary line, green when nothing was found wrong.
pub fn print_summary(units: usize, files: usize, findings: usize) {
    let mut stdout = StandardStream::stdout(color_choice());
    let color = if findings == 0 { Color::Green } else { Color::Red };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(
        stdout,
        "{} unit(s) in {} file(s), {} finding(s)",
        units, files, findings
    );
    let _ = stdout.reset();
}

pub fn print_error(error: ShorthandError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

/// One-based line and column (in characters) of a byte offset.
fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    (line, before[line_start..].chars().count() + 1)
}
