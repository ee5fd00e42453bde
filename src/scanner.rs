//! Locates shorthand units in text.
//!
//! A unit is the smallest span between an active opening delimiter and the
//! next active closing delimiter with no active opening delimiter in between.
//! "Active" means not escaped. Because only innermost units are found, nested
//! shorthand resolves from the inside out over successive passes.

use serde::{Deserialize, Serialize};

use crate::Grammar;

/// Byte range in the scanned text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// An empty span overlaps a span that contains its position, or another
    /// empty span at the same position.
    pub fn overlaps(&self, other: &Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (false, false) => self.start < other.end && other.start < self.end,
            (true, false) => other.start <= self.start && self.start < other.end,
            (false, true) => self.start <= other.start && other.start < self.end,
            (true, true) => self.start == other.start,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

/// One innermost shorthand unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit<'t> {
    /// Span of the whole unit, delimiters included.
    pub span: Span,
    /// Text between the delimiters, escapes untouched.
    pub inner: &'t str,
}

/// Which delimiter is unbalanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imbalance {
    /// An opening delimiter with no closing partner
    Unclosed(Span),
    /// A closing delimiter with no opening partner
    Unopened(Span),
}

enum Token {
    Open,
    Close,
    Newline,
}

/// Walks `text` and reports every active delimiter and line break in order.
fn tokens(text: &str, grammar: &Grammar) -> Vec<(usize, Token)> {
    let lead_in = grammar.lead_in();
    let lead_out = grammar.lead_out();
    let mut found = Vec::new();
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        let Some(c) = rest.chars().next() else {
            break;
        };
        if c == grammar.escape() {
            i += c.len_utf8();
            if let Some(next) = text[i..].chars().next() {
                i += next.len_utf8();
            }
            continue;
        }
        if rest.starts_with(lead_in) {
            found.push((i, Token::Open));
            i += lead_in.len();
        } else if rest.starts_with(lead_out) {
            found.push((i, Token::Close));
            i += lead_out.len();
        } else {
            if c == '\n' {
                found.push((i, Token::Newline));
            }
            i += c.len_utf8();
        }
    }
    found
}

/// Finds all innermost units, left to right, without overlap.
pub fn units<'t>(text: &'t str, grammar: &Grammar) -> Vec<Unit<'t>> {
    let mut units = Vec::new();
    let mut open: Option<usize> = None;
    for (pos, token) in tokens(text, grammar) {
        match token {
            Token::Open => open = Some(pos),
            Token::Close => {
                if let Some(start) = open.take() {
                    let end = pos + grammar.lead_out().len();
                    units.push(Unit {
                        span: Span::new(start, end),
                        inner: &text[start + grammar.lead_in().len()..pos],
                    });
                }
            }
            Token::Newline if !grammar.multiline() => open = None,
            Token::Newline => {}
        }
    }
    units
}

/// Reports the first unbalanced active delimiter, if any.
///
/// Without multiline support, an opening delimiter still open at a line break
/// is unclosed.
pub fn find_imbalance(text: &str, grammar: &Grammar) -> Option<Imbalance> {
    let mut stack: Vec<usize> = Vec::new();
    for (pos, token) in tokens(text, grammar) {
        match token {
            Token::Open => stack.push(pos),
            Token::Close => {
                if stack.pop().is_none() {
                    return Some(Imbalance::Unopened(Span::new(
                        pos,
                        pos + grammar.lead_out().len(),
                    )));
                }
            }
            Token::Newline => {
                if !grammar.multiline() {
                    if let Some(&start) = stack.first() {
                        return Some(Imbalance::Unclosed(Span::new(
                            start,
                            start + grammar.lead_in().len(),
                        )));
                    }
                }
            }
        }
    }
    stack
        .first()
        .map(|&start| Imbalance::Unclosed(Span::new(start, start + grammar.lead_in().len())))
}
