//! Unified, `miette`-based diagnostics for the shorthand engine.
//!
//! Every failure the engine can report is a [`ShorthandError`]. Simple errors are
//! built with the `err_msg!` and `err_ctx!` macros; binding, callback and
//! non-convergence errors carry extra structured data and have dedicated
//! constructors.
//!
//! # Error Construction Macros
//!
//! - `err_msg!(Grammar, "Delimiter '{}' is empty", which)` for message-only errors.
//! - `err_ctx!(UnknownShorthand, message, src, span)` when a source and span are known.
//! - `err_ctx!(OpenShorthand, message, src, span, help)` to attach a help line.
//!
//! Errors raised below the substitution layer (binding, callbacks) do not know
//! the text they came from. The substitutor attaches it afterwards with
//! [`ShorthandError::with_snippet`], so reports always point at the offending unit.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::Span;

pub type SourceArc = Arc<NamedSource<String>>;

/// Boxed error type returned by failing callbacks.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Type-safe error classification, one entry per `ShorthandError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Invalid delimiters, separators or callback names
    Grammar,
    /// Invalid parameter shape declarations
    Shape,
    /// Raw argument text could not be bound to a parameter shape
    Binding,
    /// A callback failed
    Callback,
    /// Recursive substitution hit its pass bound
    NonConvergence,
    /// Duplicate registration
    Registry,
    /// A shorthand unit no processor accepts
    UnknownShorthand,
    /// Unbalanced delimiters left in the output
    OpenShorthand,
    /// Requested shorthand text cannot be produced
    Production,
    /// Configuration could not be read or parsed
    Config,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Grammar => "grammar",
            ErrorType::Shape => "shape",
            ErrorType::Binding => "binding",
            ErrorType::Callback => "callback",
            ErrorType::NonConvergence => "non_convergence",
            ErrorType::Registry => "registry",
            ErrorType::UnknownShorthand => "unknown_shorthand",
            ErrorType::OpenShorthand => "open_shorthand",
            ErrorType::Production => "production",
            ErrorType::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The specific reason a binding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingFault {
    /// Fewer positional arguments than required slots
    ArityTooLow,
    /// More positional arguments than positional slots
    ArityTooHigh,
    /// A `name=value` item naming no declared slot
    UnknownKeyword,
    /// A slot supplied twice
    DuplicateBinding,
    /// A positional item following a `name=value` item
    PositionalAfterKeyword,
    /// A `name=value` item naming a required slot
    PositionalOnly,
}

/// Minimal error context: where the error happened and how to fix it.
#[derive(Debug, Default)]
pub struct ErrorContext {
    pub source: Option<SourceArc>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }

    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            source: None,
            span: None,
            help: Some(help.into()),
        }
    }
}

/// Unified error type for all shorthand engine failure modes.
#[derive(Debug, Error)]
pub enum ShorthandError {
    #[error("Grammar error: {message}")]
    Grammar {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Shape error: {message}")]
    Shape {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Binding error: {message}")]
    Binding {
        fault: BindingFault,
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Callback '{name}' failed: {message}")]
    Callback {
        name: String,
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Substitution did not converge: {message}")]
    NonConvergence {
        passes: usize,
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Registry conflict: {message}")]
    Registry {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Unknown shorthand: {message}")]
    UnknownShorthand {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Open shorthand: {message}")]
    OpenShorthand {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Production error: {message}")]
    Production {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
    #[error("Config error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedError>,
    },
}

impl ShorthandError {
    /// Builds a binding error of the given fault.
    pub fn binding(fault: BindingFault, message: impl Into<String>) -> Self {
        ShorthandError::Binding {
            fault,
            message: message.into(),
            ctx: ErrorContext::none(),
            source: None,
        }
    }

    /// Wraps a callback failure, keeping the callback's own error as the source.
    pub fn callback(name: &str, error: BoxedError) -> Self {
        ShorthandError::Callback {
            name: name.to_string(),
            message: error.to_string(),
            ctx: ErrorContext::none(),
            source: Some(error),
        }
    }

    pub fn non_convergence(passes: usize) -> Self {
        ShorthandError::NonConvergence {
            passes,
            message: format!("text still changing after {} passes", passes),
            ctx: ErrorContext::with_help(
                "a callback probably produces shorthand that re-triggers itself or another processor",
            ),
            source: None,
        }
    }

    fn ctx(&self) -> &ErrorContext {
        match self {
            ShorthandError::Grammar { ctx, .. }
            | ShorthandError::Shape { ctx, .. }
            | ShorthandError::Binding { ctx, .. }
            | ShorthandError::Callback { ctx, .. }
            | ShorthandError::NonConvergence { ctx, .. }
            | ShorthandError::Registry { ctx, .. }
            | ShorthandError::UnknownShorthand { ctx, .. }
            | ShorthandError::OpenShorthand { ctx, .. }
            | ShorthandError::Production { ctx, .. }
            | ShorthandError::Config { ctx, .. } => ctx,
        }
    }

    fn ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            ShorthandError::Grammar { ctx, .. }
            | ShorthandError::Shape { ctx, .. }
            | ShorthandError::Binding { ctx, .. }
            | ShorthandError::Callback { ctx, .. }
            | ShorthandError::NonConvergence { ctx, .. }
            | ShorthandError::Registry { ctx, .. }
            | ShorthandError::UnknownShorthand { ctx, .. }
            | ShorthandError::OpenShorthand { ctx, .. }
            | ShorthandError::Production { ctx, .. }
            | ShorthandError::Config { ctx, .. } => ctx,
        }
    }

    fn message(&self) -> &str {
        match self {
            ShorthandError::Grammar { message, .. }
            | ShorthandError::Shape { message, .. }
            | ShorthandError::Binding { message, .. }
            | ShorthandError::Callback { message, .. }
            | ShorthandError::NonConvergence { message, .. }
            | ShorthandError::Registry { message, .. }
            | ShorthandError::UnknownShorthand { message, .. }
            | ShorthandError::OpenShorthand { message, .. }
            | ShorthandError::Production { message, .. }
            | ShorthandError::Config { message, .. } => message,
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ShorthandError::Grammar { .. } => ErrorType::Grammar,
            ShorthandError::Shape { .. } => ErrorType::Shape,
            ShorthandError::Binding { .. } => ErrorType::Binding,
            ShorthandError::Callback { .. } => ErrorType::Callback,
            ShorthandError::NonConvergence { .. } => ErrorType::NonConvergence,
            ShorthandError::Registry { .. } => ErrorType::Registry,
            ShorthandError::UnknownShorthand { .. } => ErrorType::UnknownShorthand,
            ShorthandError::OpenShorthand { .. } => ErrorType::OpenShorthand,
            ShorthandError::Production { .. } => ErrorType::Production,
            ShorthandError::Config { .. } => ErrorType::Config,
        }
    }

    /// The binding fault, for binding errors.
    pub fn binding_fault(&self) -> Option<BindingFault> {
        match self {
            ShorthandError::Binding { fault, .. } => Some(*fault),
            _ => None,
        }
    }

    /// Attaches the text being processed and the span of the offending unit.
    ///
    /// An already attached source is kept, so the innermost location wins.
    pub fn with_snippet(self, text: &str, span: Span) -> Self {
        self.with_named_snippet("input", text, span)
    }

    /// Like [`with_snippet`](Self::with_snippet) with an explicit source name,
    /// usually a file path.
    pub fn with_named_snippet(mut self, name: &str, text: &str, span: Span) -> Self {
        let ctx = self.ctx_mut();
        if ctx.source.is_none() {
            ctx.source = Some(Arc::new(NamedSource::new(name, text.to_string())));
            ctx.span = Some(span);
        }
        self
    }
}

impl Diagnostic for ShorthandError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("shorthand::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.ctx();
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.message().to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a source string into an `Arc<NamedSource<String>>` for use in error contexts.
pub fn to_error_source<S: AsRef<str>>(source: S) -> SourceArc {
    Arc::new(NamedSource::new("input", source.as_ref().to_string()))
}

/// Constructs a `ShorthandError` variant with a formatted message and no context.
///
/// Only for variants whose fields are exactly `message`, `ctx` and `source`.
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr, $($arg:expr),+ $(,)?) => {
        $crate::ShorthandError::$variant {
            message: format!($msg, $($arg),+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::ShorthandError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a `ShorthandError` variant with a message, a source and a span,
/// and optionally a help line.
#[macro_export]
macro_rules! err_ctx {
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::ShorthandError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
            },
            source: None,
        }
    };
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::ShorthandError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: None,
            },
            source: None,
        }
    };
}
