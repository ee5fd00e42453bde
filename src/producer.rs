//! The inverse of substitution: rendering the shorthand unit for a call.
//!
//! Production follows the binder's rules backwards, so binding the produced
//! text yields the same call after default-filling:
//!
//! - Positional values are emitted in slot order until the first unset
//!   optional slot. Set optional slots after that gap are written as
//!   `name=value`, since a positional item there would bind to the wrong slot.
//! - Named slots are written as `name=value` in declaration order.
//! - In [`ProductionMode::Minimal`], values equal to their slot's default are
//!   left out.

use serde::{Deserialize, Serialize};

use crate::shape::SlotKind;
use crate::{err_msg, Grammar, ParamShape, ShorthandError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionMode {
    /// Omit arguments equal to their default
    #[default]
    Minimal,
    /// Write out every argument that has a value, defaults included
    Exhaustive,
}

/// Renders units for one callback name and shape.
#[derive(Debug, Clone)]
pub struct Producer<'a> {
    name: &'a str,
    shape: &'a ParamShape,
    grammar: &'a Grammar,
    mode: ProductionMode,
}

impl<'a> Producer<'a> {
    pub fn new(name: &'a str, shape: &'a ParamShape, grammar: &'a Grammar) -> Self {
        Self {
            name,
            shape,
            grammar,
            mode: ProductionMode::default(),
        }
    }

    pub fn mode(mut self, mode: ProductionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn produce(&self, positional: &[&str], named: &[(&str, &str)]) -> Result<String, ShorthandError> {
        if self.shape.is_variadic() {
            return Err(err_msg!(
                Production,
                "'{}' accepts any arguments, so there is no canonical form to produce",
                self.name
            ));
        }
        let values = self.collect(positional, named)?;

        for value in values.iter().flatten() {
            if !self.grammar.multiline() && value.contains('\n') {
                return Err(err_msg!(
                    Production,
                    "'{}': value {:?} contains a line break but the grammar is single-line",
                    self.name,
                    value
                ));
            }
        }

        let slots = self.shape.slots();
        let mut items: Vec<String> = Vec::new();
        let mut keywords: Vec<String> = Vec::new();
        let mut gap = false;
        for (slot, value) in slots.iter().zip(&values) {
            match (slot.kind(), value) {
                (SlotKind::Named, Some(v)) => keywords.push(self.keyword_item(slot.name(), v)),
                (SlotKind::Named, None) => {}
                (_, None) => gap = true,
                (_, Some(v)) if gap => keywords.push(self.keyword_item(slot.name(), v)),
                (_, Some(v)) => items.push(self.grammar.escape_value(v, true)),
            }
        }
        // Binding rejects positional items after keyword items.
        items.extend(keywords);

        let mut out = String::new();
        out.push_str(self.grammar.lead_in());
        out.push_str(self.name);
        for item in &items {
            out.push(self.grammar.separator());
            out.push_str(item);
        }
        out.push_str(self.grammar.lead_out());
        Ok(out)
    }

    fn keyword_item(&self, name: &str, value: &str) -> String {
        format!(
            "{}{}{}",
            name,
            self.grammar.assignment(),
            self.grammar.escape_value(value, false)
        )
    }

    /// Resolves the supplied arguments to one value per slot, `None` meaning
    /// "leave out".
    fn collect(&self, positional: &[&str], named: &[(&str, &str)]) -> Result<Vec<Option<String>>, ShorthandError> {
        let slots = self.shape.slots();
        let positional_slots: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_positional())
            .map(|(i, _)| i)
            .collect();
        if positional.len() > positional_slots.len() {
            return Err(err_msg!(
                Production,
                "'{}' takes at most {} positional argument(s), got {}",
                self.name,
                positional_slots.len(),
                positional.len()
            ));
        }

        let mut supplied: Vec<Option<String>> = vec![None; slots.len()];
        for (&index, value) in positional_slots.iter().zip(positional) {
            supplied[index] = Some(value.to_string());
        }
        for (key, value) in named {
            let Some(index) = slots.iter().position(|s| s.name() == *key) else {
                return Err(err_msg!(Production, "'{}' has no parameter named '{}'", self.name, key));
            };
            if slots[index].kind() == SlotKind::Required {
                return Err(err_msg!(
                    Production,
                    "'{}': required parameter '{}' must be given positionally",
                    self.name,
                    key
                ));
            }
            if supplied[index].is_some() {
                return Err(err_msg!(Production, "'{}': parameter '{}' is given twice", self.name, key));
            }
            supplied[index] = Some(value.to_string());
        }

        if let Some(missing) = slots
            .iter()
            .zip(&supplied)
            .find(|(s, v)| s.kind() == SlotKind::Required && v.is_none())
        {
            return Err(err_msg!(
                Production,
                "'{}' requires a value for '{}'",
                self.name,
                missing.0.name()
            ));
        }

        Ok(slots
            .iter()
            .zip(supplied)
            .map(|(slot, value)| {
                if slot.kind() == SlotKind::Required {
                    return value;
                }
                match self.mode {
                    ProductionMode::Minimal => value.filter(|v| Some(v.as_str()) != slot.default()),
                    ProductionMode::Exhaustive => value.or_else(|| slot.default().map(str::to_string)),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod producer_tests {
    use super::*;

    fn hyperlink() -> ParamShape {
        ParamShape::builder()
            .required("href")
            .named("text", "")
            .build()
            .unwrap()
    }

    fn melee() -> ParamShape {
        ParamShape::builder()
            .required("to_hit")
            .optional("damage", "0")
            .optional("reach", "5")
            .named("defense", "")
            .build()
            .unwrap()
    }

    #[test]
    fn test_hyperlink() {
        let grammar = Grammar::default();
        let shape = hyperlink();
        let text = Producer::new("hyperlink", &shape, &grammar)
            .produce(&["https://example.org/"], &[("text", "Example")])
            .unwrap();
        assert_eq!(text, "{{hyperlink|https://example.org/|text=Example}}");
    }

    #[test]
    fn test_minimal_drops_defaults() {
        let grammar = Grammar::default();
        let shape = melee();
        let producer = Producer::new("melee", &shape, &grammar);
        assert_eq!(producer.produce(&["+1", "0"], &[]).unwrap(), "{{melee|+1}}");
        assert_eq!(
            producer.produce(&["+1"], &[("reach", "10")]).unwrap(),
            "{{melee|+1|reach=10}}"
        );
        assert_eq!(
            producer.produce(&["", "2"], &[("defense", "-1")]).unwrap(),
            "{{melee||2|defense=-1}}"
        );
    }

    #[test]
    fn test_exhaustive_writes_defaults() {
        let grammar = Grammar::default();
        let shape = melee();
        let text = Producer::new("melee", &shape, &grammar)
            .mode(ProductionMode::Exhaustive)
            .produce(&["+1"], &[])
            .unwrap();
        assert_eq!(text, "{{melee|+1|0|5|defense=}}");
    }

    #[test]
    fn test_values_are_escaped() {
        let grammar = Grammar::default();
        let shape = hyperlink();
        let text = Producer::new("hyperlink", &shape, &grammar)
            .produce(&["a=b"], &[("text", "x|y}}")])
            .unwrap();
        assert_eq!(text, r"{{hyperlink|a\=b|text=x\|y\}\}}}");
    }

    #[test]
    fn test_production_errors() {
        let grammar = Grammar::default();
        let shape = melee();
        let producer = Producer::new("melee", &shape, &grammar);
        assert!(producer.produce(&[], &[]).is_err());
        assert!(producer.produce(&["1", "2", "3", "4"], &[]).is_err());
        assert!(producer.produce(&["1"], &[("to_hit", "2")]).is_err());
        assert!(producer.produce(&["1", "2"], &[("damage", "3")]).is_err());
        assert!(producer.produce(&["1"], &[("parry", "3")]).is_err());
        assert!(producer.produce(&["1\n2"], &[]).is_err());
        let variadic = ParamShape::variadic();
        assert!(Producer::new("any", &variadic, &grammar).produce(&[], &[]).is_err());
    }
}
