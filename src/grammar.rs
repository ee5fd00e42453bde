//! # Shorthand Grammar
//!
//! The delimiter/separator configuration shared by matching and production.
//!
//! A shorthand unit reads `OPEN name SEP arg SEP key=value CLOSE`, by default
//! `{{name|arg|key=value}}`. The escape character makes any reserved character
//! literal: `\|` inside an argument is a pipe, not a separator.
//!
//! A `Grammar` is validated on construction and never changes afterwards. Build
//! custom grammars with [`Grammar::builder`] or deserialize them from config.

use serde::{Deserialize, Serialize};

use crate::{err_msg, ShorthandError};

/// Validated delimiter, separator and escaping rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GrammarSpec", into = "GrammarSpec")]
pub struct Grammar {
    lead_in: String,
    lead_out: String,
    separator: char,
    assignment: char,
    escape: char,
    multiline: bool,
}

/// Unvalidated grammar fields, as written in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrammarSpec {
    pub lead_in: String,
    pub lead_out: String,
    pub separator: char,
    pub assignment: char,
    pub escape: char,
    pub multiline: bool,
}

impl Default for GrammarSpec {
    fn default() -> Self {
        Self {
            lead_in: "{{".to_string(),
            lead_out: "}}".to_string(),
            separator: '|',
            assignment: '=',
            escape: '\\',
            multiline: false,
        }
    }
}

impl TryFrom<GrammarSpec> for Grammar {
    type Error = ShorthandError;

    fn try_from(spec: GrammarSpec) -> Result<Self, Self::Error> {
        let grammar = Grammar {
            lead_in: spec.lead_in,
            lead_out: spec.lead_out,
            separator: spec.separator,
            assignment: spec.assignment,
            escape: spec.escape,
            multiline: spec.multiline,
        };
        grammar.validate()?;
        Ok(grammar)
    }
}

impl From<Grammar> for GrammarSpec {
    fn from(grammar: Grammar) -> Self {
        Self {
            lead_in: grammar.lead_in,
            lead_out: grammar.lead_out,
            separator: grammar.separator,
            assignment: grammar.assignment,
            escape: grammar.escape,
            multiline: grammar.multiline,
        }
    }
}

impl Default for Grammar {
    fn default() -> Self {
        let spec = GrammarSpec::default();
        Grammar {
            lead_in: spec.lead_in,
            lead_out: spec.lead_out,
            separator: spec.separator,
            assignment: spec.assignment,
            escape: spec.escape,
            multiline: spec.multiline,
        }
    }
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder {
            spec: GrammarSpec::default(),
        }
    }

    pub fn lead_in(&self) -> &str {
        &self.lead_in
    }

    pub fn lead_out(&self) -> &str {
        &self.lead_out
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn assignment(&self) -> char {
        self.assignment
    }

    pub fn escape(&self) -> char {
        self.escape
    }

    /// Whether a unit may span several lines.
    pub fn multiline(&self) -> bool {
        self.multiline
    }

    fn validate(&self) -> Result<(), ShorthandError> {
        if self.lead_in.is_empty() || self.lead_out.is_empty() {
            return Err(err_msg!(Grammar, "Delimiters must not be empty"));
        }
        if self.lead_in.starts_with(&self.lead_out) || self.lead_out.starts_with(&self.lead_in) {
            return Err(err_msg!(
                Grammar,
                "Delimiters '{}' and '{}' must be distinct and neither may prefix the other",
                self.lead_in,
                self.lead_out
            ));
        }
        for (label, c) in [
            ("separator", self.separator),
            ("assignment operator", self.assignment),
            ("escape character", self.escape),
        ] {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                return Err(err_msg!(
                    Grammar,
                    "The {} '{}' must be punctuation",
                    label,
                    c.escape_default()
                ));
            }
            if self.lead_in.contains(c) || self.lead_out.contains(c) {
                return Err(err_msg!(
                    Grammar,
                    "The {} '{}' also appears in a delimiter",
                    label,
                    c
                ));
            }
        }
        if self.separator == self.assignment
            || self.separator == self.escape
            || self.assignment == self.escape
        {
            return Err(err_msg!(
                Grammar,
                "Separator, assignment operator and escape character must all differ"
            ));
        }
        Ok(())
    }

    /// Whether `c` has grammatical meaning and needs escaping inside arguments.
    pub fn is_reserved(&self, c: char) -> bool {
        c == self.escape
            || c == self.separator
            || c == self.assignment
            || self.lead_in.contains(c)
            || self.lead_out.contains(c)
    }

    /// Rejects callback names that the grammar could not match literally.
    pub fn check_name(&self, name: &str) -> Result<(), ShorthandError> {
        if name.is_empty() {
            return Err(err_msg!(Grammar, "Callback names must not be empty"));
        }
        if let Some(c) = name
            .chars()
            .find(|c| self.is_reserved(*c) || c.is_whitespace())
        {
            return Err(err_msg!(
                Grammar,
                "Callback name '{}' contains the reserved character '{}'",
                name,
                c.escape_default()
            ));
        }
        Ok(())
    }

    /// Escapes every reserved character in `value`.
    ///
    /// With `guard_assignment`, only an assignment operator that would make the
    /// value read as `name=value` is escaped; all others stay literal.
    pub fn escape_value(&self, value: &str, guard_assignment: bool) -> String {
        let keyword_like = guard_assignment && crate::binding::looks_like_keyword(value, self);
        let mut out = String::with_capacity(value.len());
        let mut guarded = false;
        for c in value.chars() {
            let needs_escape = if c == self.assignment {
                keyword_like && !guarded
            } else {
                self.is_reserved(c)
            };
            if c == self.assignment && needs_escape {
                guarded = true;
            }
            if needs_escape {
                out.push(self.escape);
            }
            out.push(c);
        }
        out
    }

    /// Reverses [`escape_value`](Self::escape_value).
    ///
    /// The escape character is dropped only before a reserved character.
    /// Anywhere else it is kept literally.
    pub fn unescape(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c == self.escape {
                if let Some(&next) = chars.peek() {
                    if self.is_reserved(next) {
                        out.push(next);
                        chars.next();
                        continue;
                    }
                }
            }
            out.push(c);
        }
        out
    }

    /// Byte offset of the first occurrence of `target` not preceded by an escape.
    pub fn find_unescaped(&self, raw: &str, target: char) -> Option<usize> {
        let mut escaped = false;
        for (i, c) in raw.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if c == self.escape {
                escaped = true;
            } else if c == target {
                return Some(i);
            }
        }
        None
    }

    /// Splits `raw` on every unescaped `target`. Escapes are left in place.
    pub fn split_unescaped<'a>(&self, raw: &'a str, target: char) -> Vec<&'a str> {
        let mut parts = Vec::new();
        let mut start = 0;
        let mut escaped = false;
        for (i, c) in raw.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if c == self.escape {
                escaped = true;
            } else if c == target {
                parts.push(&raw[start..i]);
                start = i + c.len_utf8();
            }
        }
        parts.push(&raw[start..]);
        parts
    }
}

/// Builder for custom grammars; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    spec: GrammarSpec,
}

impl GrammarBuilder {
    pub fn lead_in(mut self, lead_in: impl Into<String>) -> Self {
        self.spec.lead_in = lead_in.into();
        self
    }

    pub fn lead_out(mut self, lead_out: impl Into<String>) -> Self {
        self.spec.lead_out = lead_out.into();
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.spec.separator = separator;
        self
    }

    pub fn assignment(mut self, assignment: char) -> Self {
        self.spec.assignment = assignment;
        self
    }

    pub fn escape(mut self, escape: char) -> Self {
        self.spec.escape = escape;
        self
    }

    pub fn multiline(mut self, multiline: bool) -> Self {
        self.spec.multiline = multiline;
        self
    }

    pub fn build(self) -> Result<Grammar, ShorthandError> {
        Grammar::try_from(self.spec)
    }
}
