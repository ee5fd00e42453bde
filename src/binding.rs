//! Argument binding: raw unit text to a concrete call.
//!
//! The argument span of a unit is split on unescaped separators. Each item is
//! positional unless the text before its first unescaped assignment operator is
//! an identifier, in which case it is a `name=value` keyword item.
//!
//! Positional items fill positional slots in declaration order. Keyword items
//! fill optional or named slots by name. Slots left unfilled take their
//! default, but only when truly absent: an explicitly empty item binds `""`.

use crate::shape::IDENTIFIER;
use crate::{BindingFault, Grammar, ParamShape, ShorthandError, SlotKind};

/// One separator-delimited item of an argument span, escapes untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawItem<'a> {
    Positional(&'a str),
    Keyword(&'a str, &'a str),
}

/// Splits an item at its first unescaped assignment operator, if the text
/// before it is an identifier.
pub(crate) fn keyword_split<'a>(item: &'a str, grammar: &Grammar) -> Option<(&'a str, &'a str)> {
    let pos = grammar.find_unescaped(item, grammar.assignment())?;
    let key = &item[..pos];
    if IDENTIFIER.is_match(key) {
        Some((key, &item[pos + grammar.assignment().len_utf8()..]))
    } else {
        None
    }
}

pub(crate) fn looks_like_keyword(item: &str, grammar: &Grammar) -> bool {
    keyword_split(item, grammar).is_some()
}

/// Splits an argument span into classified items.
///
/// `None` means the unit had no separator after its name: no arguments at all.
/// `Some("")` is one explicitly empty argument.
pub fn split_arguments<'a>(args: Option<&'a str>, grammar: &Grammar) -> Vec<RawItem<'a>> {
    let Some(args) = args else {
        return Vec::new();
    };
    grammar
        .split_unescaped(args, grammar.separator())
        .into_iter()
        .map(|item| match keyword_split(item, grammar) {
            Some((key, value)) => RawItem::Keyword(key, value),
            None => RawItem::Positional(item),
        })
        .collect()
}

/// Concrete argument values for one callback invocation.
///
/// Positional values come in declaration order, required slots first. Named
/// values come in declaration order too, or in order of appearance for
/// variadic shapes. A value of `None` is a slot defaulting to "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundCall {
    positional: Vec<(String, Option<String>)>,
    named: Vec<(String, Option<String>)>,
}

impl BoundCall {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_positional(&mut self, name: impl Into<String>, value: Option<String>) {
        self.positional.push((name.into(), value));
    }

    pub(crate) fn push_named(&mut self, name: impl Into<String>, value: Option<String>) {
        self.named.push((name.into(), value));
    }

    pub fn positional(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.positional
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.named
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn positional_values(&self) -> Vec<Option<&str>> {
        self.positional.iter().map(|(_, v)| v.as_deref()).collect()
    }

    /// Positional value by index.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(|(_, v)| v.as_deref())
    }

    /// Any slot's value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.positional
            .iter()
            .chain(self.named.iter())
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binds classified items to `shape`. `name` is only used in error messages.
pub fn bind(
    name: &str,
    shape: &ParamShape,
    items: &[RawItem<'_>],
    grammar: &Grammar,
) -> Result<BoundCall, ShorthandError> {
    if shape.is_variadic() {
        return bind_variadic(name, items, grammar);
    }

    let slots = shape.slots();
    let positional_slots: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_positional())
        .map(|(i, _)| i)
        .collect();

    // Outer `None`: not supplied. Inner value: what was supplied.
    let mut supplied: Vec<Option<String>> = vec![None; slots.len()];
    let mut next_positional = 0;
    let mut keyword_seen = false;

    for item in items {
        match *item {
            RawItem::Positional(text) => {
                if keyword_seen {
                    return Err(ShorthandError::binding(
                        BindingFault::PositionalAfterKeyword,
                        format!("'{}': positional argument '{}' follows a named argument", name, text),
                    ));
                }
                let Some(&index) = positional_slots.get(next_positional) else {
                    return Err(ShorthandError::binding(
                        BindingFault::ArityTooHigh,
                        format!(
                            "'{}' takes at most {} positional argument(s)",
                            name,
                            positional_slots.len()
                        ),
                    ));
                };
                supplied[index] = Some(grammar.unescape(text));
                next_positional += 1;
            }
            RawItem::Keyword(key, text) => {
                keyword_seen = true;
                let Some(index) = slots.iter().position(|slot| slot.name() == key) else {
                    return Err(ShorthandError::binding(
                        BindingFault::UnknownKeyword,
                        format!("'{}' has no parameter named '{}'", name, key),
                    ));
                };
                if supplied[index].is_some() {
                    return Err(ShorthandError::binding(
                        BindingFault::DuplicateBinding,
                        format!("'{}': parameter '{}' is bound twice", name, key),
                    ));
                }
                if slots[index].kind() == SlotKind::Required {
                    return Err(ShorthandError::binding(
                        BindingFault::PositionalOnly,
                        format!("'{}': required parameter '{}' cannot be passed by name", name, key),
                    ));
                }
                supplied[index] = Some(grammar.unescape(text));
            }
        }
    }

    let missing: Vec<&str> = slots
        .iter()
        .zip(&supplied)
        .filter(|(slot, value)| slot.kind() == SlotKind::Required && value.is_none())
        .map(|(slot, _)| slot.name())
        .collect();
    if !missing.is_empty() {
        return Err(ShorthandError::binding(
            BindingFault::ArityTooLow,
            format!(
                "'{}' requires {} positional argument(s), got {}; missing {}",
                name,
                shape.required_count(),
                next_positional,
                missing.join(", ")
            ),
        ));
    }

    let mut call = BoundCall::new();
    for (slot, value) in slots.iter().zip(supplied) {
        let value = value.or_else(|| slot.default().map(str::to_string));
        if slot.is_positional() {
            call.push_positional(slot.name(), value);
        } else {
            call.push_named(slot.name(), value);
        }
    }
    Ok(call)
}

fn bind_variadic(
    name: &str,
    items: &[RawItem<'_>],
    grammar: &Grammar,
) -> Result<BoundCall, ShorthandError> {
    let mut call = BoundCall::new();
    let mut keyword_seen = false;
    for item in items {
        match *item {
            RawItem::Positional(text) => {
                if keyword_seen {
                    return Err(ShorthandError::binding(
                        BindingFault::PositionalAfterKeyword,
                        format!("'{}': positional argument '{}' follows a named argument", name, text),
                    ));
                }
                let index = call.positional.len().to_string();
                call.push_positional(index, Some(grammar.unescape(text)));
            }
            RawItem::Keyword(key, text) => {
                keyword_seen = true;
                if call.named.iter().any(|(n, _)| n == key) {
                    return Err(ShorthandError::binding(
                        BindingFault::DuplicateBinding,
                        format!("'{}': parameter '{}' is bound twice", name, key),
                    ));
                }
                call.push_named(key, Some(grammar.unescape(text)));
            }
        }
    }
    Ok(call)
}

#[cfg(test)]
mod binding_tests {
    use super::*;

    fn f_shape() -> ParamShape {
        // f(arg, kw0=1, kw1=None)
        ParamShape::builder()
            .required("arg")
            .named("kw0", "1")
            .named_unset("kw1")
            .build()
            .unwrap()
    }

    fn bind_str(shape: &ParamShape, args: Option<&str>) -> Result<BoundCall, ShorthandError> {
        let grammar = Grammar::default();
        bind("f", shape, &split_arguments(args, &grammar), &grammar)
    }

    #[test]
    fn test_split_classifies_items() {
        let grammar = Grammar::default();
        let items = split_arguments(Some("|+1|defense=-1|1=1"), &grammar);
        assert_eq!(
            items,
            vec![
                RawItem::Positional(""),
                RawItem::Positional("+1"),
                RawItem::Keyword("defense", "-1"),
                RawItem::Positional("1=1"),
            ]
        );
        assert!(split_arguments(None, &grammar).is_empty());
        assert_eq!(split_arguments(Some(""), &grammar), vec![RawItem::Positional("")]);
    }

    #[test]
    fn test_all_present() {
        let call = bind_str(&f_shape(), Some("1|kw0=2|kw1=3")).unwrap();
        assert_eq!(call.get("arg"), Some("1"));
        assert_eq!(call.get("kw0"), Some("2"));
        assert_eq!(call.get("kw1"), Some("3"));
    }

    #[test]
    fn test_missing_keywords_take_defaults() {
        let call = bind_str(&f_shape(), Some("1|kw1=1")).unwrap();
        assert_eq!(call.get("kw0"), Some("1"));
        assert_eq!(call.get("kw1"), Some("1"));
        let call = bind_str(&f_shape(), Some("1")).unwrap();
        assert_eq!(call.get("kw1"), None);
    }

    #[test]
    fn test_value_may_contain_assignment() {
        let call = bind_str(&f_shape(), Some("1=1|kw0=arg=1")).unwrap();
        assert_eq!(call.get("arg"), Some("1=1"));
        assert_eq!(call.get("kw0"), Some("arg=1"));
    }

    #[test]
    fn test_escaped_items() {
        let call = bind_str(&f_shape(), Some(r"a\|b\=c|kw0=\{\{x\}\}")).unwrap();
        assert_eq!(call.get("arg"), Some("a|b=c"));
        assert_eq!(call.get("kw0"), Some("{{x}}"));
        let call = bind_str(&f_shape(), Some(r"kw0\=1")).unwrap();
        assert_eq!(call.get("arg"), Some("kw0=1"));
    }

    #[test]
    fn test_faults() {
        let cases = [
            (None, BindingFault::ArityTooLow),
            (Some("kw0=1"), BindingFault::ArityTooLow),
            (Some("arg=1"), BindingFault::PositionalOnly),
            (Some("1|arg=2"), BindingFault::DuplicateBinding),
            (Some("1|2"), BindingFault::ArityTooHigh),
            (Some("1|kw2=1"), BindingFault::UnknownKeyword),
            (Some("1|kw0=1|kw0=2"), BindingFault::DuplicateBinding),
            (Some("1|kw0=1|x"), BindingFault::PositionalAfterKeyword),
        ];
        for (args, fault) in cases {
            let err = bind_str(&f_shape(), args).unwrap_err();
            assert_eq!(err.binding_fault(), Some(fault), "args: {:?}", args);
        }
    }

    #[test]
    fn test_variadic() {
        let grammar = Grammar::default();
        let items = split_arguments(Some("x|y|k=v"), &grammar);
        let call = bind("*", &ParamShape::variadic(), &items, &grammar).unwrap();
        assert_eq!(call.positional_values(), vec![Some("x"), Some("y")]);
        assert_eq!(call.get("k"), Some("v"));
        assert_eq!(call.arg(1), Some("y"));
    }
}
