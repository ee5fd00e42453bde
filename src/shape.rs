//! Parameter shapes: the declared argument slots of a callback.
//!
//! A shape is computed once, when a callback is registered, and drives every
//! later binding and production for that callback.
//!
//! ```rust
//! use shorthand::ParamShape;
//! // melee(to_hit, damage, defense='')
//! let shape = ParamShape::builder()
//!     .required("to_hit")
//!     .required("damage")
//!     .named("defense", "")
//!     .build()
//!     .unwrap();
//! assert_eq!(shape.positional_count(), 2);
//! ```

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{err_msg, ShorthandError};

/// Identifier syntax shared by slot names and keyword detection.
pub(crate) static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\W\d]\w*$").expect("identifier pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Positional, no default; omission is an error
    Required,
    /// Positional with a default; may also be supplied by name
    Optional,
    /// Supplied by name only, with a default
    Named,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    name: String,
    kind: SlotKind,
    default: Option<String>,
}

impl Slot {
    pub(crate) fn new(name: impl Into<String>, kind: SlotKind, default: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// `None` means the slot defaults to "no value".
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, SlotKind::Required | SlotKind::Optional)
    }
}

/// Ordered slots plus calling-convention flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamShape {
    slots: Vec<Slot>,
    accepts_context: bool,
    variadic: bool,
}

impl ParamShape {
    /// A shape with no slots: the callback takes no arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Accepts any positional and named items, in any number.
    pub fn variadic() -> Self {
        Self {
            slots: Vec::new(),
            accepts_context: false,
            variadic: true,
        }
    }

    pub fn builder() -> ShapeBuilder {
        ShapeBuilder::default()
    }

    pub(crate) fn from_slots(slots: Vec<Slot>) -> Self {
        Self {
            slots,
            accepts_context: false,
            variadic: false,
        }
    }

    /// Same shape, with the context passed to the callback.
    pub fn with_context(mut self) -> Self {
        self.accepts_context = true;
        self
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn positional(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.is_positional())
    }

    pub fn named(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().filter(|s| s.kind == SlotKind::Named)
    }

    pub fn positional_count(&self) -> usize {
        self.positional().count()
    }

    pub fn required_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.kind == SlotKind::Required)
            .count()
    }

    pub fn accepts_context(&self) -> bool {
        self.accepts_context
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }
}

/// Collects slots in declaration order and validates them in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ShapeBuilder {
    slots: Vec<Slot>,
    accepts_context: bool,
}

impl ShapeBuilder {
    pub fn required(mut self, name: &str) -> Self {
        self.push(name, SlotKind::Required, None);
        self
    }

    pub fn optional(mut self, name: &str, default: &str) -> Self {
        self.push(name, SlotKind::Optional, Some(default.to_string()));
        self
    }

    /// Optional positional slot defaulting to no value.
    pub fn optional_unset(mut self, name: &str) -> Self {
        self.push(name, SlotKind::Optional, None);
        self
    }

    pub fn named(mut self, name: &str, default: &str) -> Self {
        self.push(name, SlotKind::Named, Some(default.to_string()));
        self
    }

    /// Named slot defaulting to no value.
    pub fn named_unset(mut self, name: &str) -> Self {
        self.push(name, SlotKind::Named, None);
        self
    }

    pub fn with_context(mut self) -> Self {
        self.accepts_context = true;
        self
    }

    fn push(&mut self, name: &str, kind: SlotKind, default: Option<String>) {
        self.slots.push(Slot::new(name, kind, default));
    }

    pub fn build(self) -> Result<ParamShape, ShorthandError> {
        let mut seen = HashSet::new();
        let mut optional_seen = false;
        for slot in &self.slots {
            if !IDENTIFIER.is_match(&slot.name) {
                return Err(err_msg!(Shape, "Slot name '{}' is not an identifier", slot.name));
            }
            if !seen.insert(slot.name.as_str()) {
                return Err(err_msg!(Shape, "Slot '{}' is declared twice", slot.name));
            }
            match slot.kind {
                SlotKind::Required if optional_seen => {
                    return Err(err_msg!(
                        Shape,
                        "Required slot '{}' follows an optional slot",
                        slot.name
                    ));
                }
                SlotKind::Optional => optional_seen = true,
                _ => {}
            }
        }
        Ok(ParamShape {
            slots: self.slots,
            accepts_context: self.accepts_context,
            variadic: false,
        })
    }
}
