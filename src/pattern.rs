//! Pattern compilation: turning a callback name and a grammar into a matcher.
//!
//! Delimited matchers work in two steps. The scanner finds innermost units,
//! then the compiled regex is applied to each unit's inner text:
//! `^name(?:SEP(?P<args>.*))?$`. The single `args` capture spans the whole
//! argument list, which the binder splits later.
//!
//! Raw matchers run a user regex over the whole text. Unnamed groups become
//! positional values and named groups become named values.

use regex::Regex;
use tracing::debug;

use crate::binding::BoundCall;
use crate::scanner::{self, Span};
use crate::shape::{ParamShape, Slot, SlotKind};
use crate::{err_msg, Grammar, ShorthandError};

/// How a processor finds its matches.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Units whose inner text starts with one fixed callback name
    Shorthand { regex: Regex },
    /// Every unit, whatever its name
    Switchboard,
    /// A raw regex over the whole text
    Raw {
        regex: Regex,
        unnamed: Vec<usize>,
        named: Vec<(String, usize)>,
    },
}

/// Captured argument text of one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedArgs<'t> {
    /// Argument span of a unit; `None` when the name had no separator after it
    Delimited(Option<&'t str>),
    /// Capture groups of a raw pattern, one value per group
    Captured(BoundCall),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    pub span: Span,
    pub args: MatchedArgs<'t>,
}

/// Compiles the unit matcher for one callback name.
///
/// Names containing grammar characters are rejected here, at construction
/// time, so substitution never meets an ambiguous pattern.
pub fn compile_shorthand(name: &str, grammar: &Grammar) -> Result<Matcher, ShorthandError> {
    grammar.check_name(name)?;
    let pattern = format!(
        "(?s)^{}(?:{}(?P<args>.*))?$",
        regex::escape(name),
        regex::escape(&grammar.separator().to_string())
    );
    let regex = Regex::new(&pattern)
        .map_err(|e| err_msg!(Grammar, "Cannot compile matcher for '{}': {}", name, e))?;
    debug!(name, pattern = %pattern, "compiled shorthand matcher");
    Ok(Matcher::Shorthand { regex })
}

/// Compiles a raw regex and derives the shape its groups imply.
///
/// Unnamed group `n` becomes a required positional slot named `n`. A named
/// group becomes a named slot defaulting to no value.
pub fn compile_raw(pattern: &str) -> Result<(Matcher, ParamShape), ShorthandError> {
    let regex = Regex::new(pattern)
        .map_err(|e| err_msg!(Grammar, "Invalid pattern '{}': {}", pattern, e))?;
    let mut unnamed = Vec::new();
    let mut named = Vec::new();
    let mut slots = Vec::new();
    for (index, group) in regex.capture_names().enumerate().skip(1) {
        match group {
            Some(name) => {
                named.push((name.to_string(), index));
                slots.push(Slot::new(name, SlotKind::Named, None));
            }
            None => {
                unnamed.push(index);
                slots.push(Slot::new(index.to_string(), SlotKind::Required, None));
            }
        }
    }
    // Required slots must lead, whatever the group order.
    slots.sort_by_key(|slot| slot.kind() != SlotKind::Required);
    debug!(pattern, groups = unnamed.len() + named.len(), "compiled raw matcher");
    Ok((
        Matcher::Raw {
            regex,
            unnamed,
            named,
        },
        ParamShape::from_slots(slots),
    ))
}

impl Matcher {
    /// Whether this matcher works on delimited units.
    pub fn is_delimited(&self) -> bool {
        !matches!(self, Matcher::Raw { .. })
    }

    /// All non-overlapping matches in `text`, left to right.
    pub fn find<'t>(&self, text: &'t str, grammar: &Grammar) -> Vec<Match<'t>> {
        match self {
            Matcher::Shorthand { regex } => scanner::units(text, grammar)
                .into_iter()
                .filter_map(|unit| {
                    let caps = regex.captures(unit.inner)?;
                    Some(Match {
                        span: unit.span,
                        args: MatchedArgs::Delimited(caps.name("args").map(|m| m.as_str())),
                    })
                })
                .collect(),
            Matcher::Switchboard => scanner::units(text, grammar)
                .into_iter()
                .map(|unit| Match {
                    span: unit.span,
                    args: MatchedArgs::Delimited(Some(unit.inner)),
                })
                .collect(),
            Matcher::Raw {
                regex,
                unnamed,
                named,
            } => regex
                .captures_iter(text)
                .filter_map(|caps| {
                    let whole = caps.get(0)?;
                    let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
                    let mut call = BoundCall::new();
                    for &index in unnamed {
                        call.push_positional(index.to_string(), group(index));
                    }
                    for (name, index) in named {
                        call.push_named(name.as_str(), group(*index));
                    }
                    Some(Match {
                        span: Span::new(whole.start(), whole.end()),
                        args: MatchedArgs::Captured(call),
                    })
                })
                .collect(),
        }
    }
}
