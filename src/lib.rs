//! # Shorthand
//!
//! A bidirectional template-substitution engine. Callbacks are registered
//! under a name with a declared parameter shape; text containing
//! `{{name|arg|key=value}}` units is rewritten by calling them, and the
//! inverse direction renders the unit that would reproduce a given call.
//!
//! ```rust
//! use shorthand::{ParamShape, Registry};
//!
//! let mut registry: Registry = Registry::new();
//! let shape = ParamShape::builder().required("href").named("text", "").build().unwrap();
//! registry
//!     .register("hyperlink", shape, |call| {
//!         let href = call.get("href").unwrap_or_default();
//!         let text = call.get("text").filter(|t| !t.is_empty()).unwrap_or(href);
//!         Ok(format!("<a href=\"{}\">{}</a>", href, text))
//!     })
//!     .unwrap();
//!
//! let unit = registry
//!     .produce("hyperlink", &["https://example.org/"], &[("text", "Example")])
//!     .unwrap();
//! assert_eq!(unit, "{{hyperlink|https://example.org/|text=Example}}");
//! assert_eq!(
//!     registry.substitute(&unit, None).unwrap(),
//!     "<a href=\"https://example.org/\">Example</a>"
//! );
//! ```

pub use crate::binding::{BoundCall, RawItem};
pub use crate::config::EngineConfig;
pub use crate::diagnostics::{
    to_error_source, BindingFault, BoxedError, ErrorContext, ErrorType, ShorthandError,
};
pub use crate::grammar::{Grammar, GrammarBuilder, GrammarSpec};
pub use crate::processor::{Call, Callback, CallbackResult, Processor};
pub use crate::producer::{ProductionMode, Producer};
pub use crate::registry::{
    Convergence, MalformedPolicy, Registry, Substitution, SubstitutionOptions, DEFAULT_MAX_PASSES,
};
pub use crate::scanner::Span;
pub use crate::shape::{ParamShape, ShapeBuilder, Slot, SlotKind};

pub mod binding;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod grammar;
pub mod pattern;
pub mod processor;
pub mod producer;
pub mod registry;
pub mod scanner;
pub mod shape;
