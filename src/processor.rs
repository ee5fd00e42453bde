//! One-way processors: one matcher, one callback, one parameter shape.
//!
//! A processor replaces every match of its matcher with the output of its
//! callback. It never looks at the text it produced; recursion belongs to
//! [`Registry::collective_substitute`](crate::Registry::collective_substitute).

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::binding::{self, BoundCall};
use crate::diagnostics::BoxedError;
use crate::pattern::{self, Match, MatchedArgs, Matcher};
use crate::producer::{ProductionMode, Producer};
use crate::scanner::Span;
use crate::{err_msg, Grammar, ParamShape, ShorthandError};

/// What a callback returns: replacement text, or its own error.
pub type CallbackResult = Result<String, BoxedError>;

/// A shareable callback taking the bound call.
pub type Callback<C> = Arc<dyn Fn(&Call<'_, C>) -> CallbackResult + Send + Sync>;

/// Everything a callback sees for one match.
pub struct Call<'a, C> {
    name: &'a str,
    args: BoundCall,
    context: Option<&'a C>,
}

impl<'a, C> Call<'a, C> {
    /// Name of the processor being invoked.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn args(&self) -> &BoundCall {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.arg(index)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.args.get(name)
    }

    /// The caller's context, if one was supplied and the shape accepts it.
    pub fn context(&self) -> Option<&'a C> {
        self.context
    }
}

pub struct Processor<C = ()> {
    name: String,
    grammar: Grammar,
    matcher: Matcher,
    shape: ParamShape,
    callback: Callback<C>,
}

impl<C> fmt::Debug for Processor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<shorthand processor for {}>", self.name)
    }
}

impl<C> Processor<C> {
    /// A processor for `{{name|...}}` units in the default grammar.
    pub fn shorthand<F>(name: &str, shape: ParamShape, callback: F) -> Result<Self, ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        Self::shorthand_with_grammar(Grammar::default(), name, shape, callback)
    }

    pub fn shorthand_with_grammar<F>(
        grammar: Grammar,
        name: &str,
        shape: ParamShape,
        callback: F,
    ) -> Result<Self, ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        let matcher = pattern::compile_shorthand(name, &grammar)?;
        Ok(Self {
            name: name.to_string(),
            grammar,
            matcher,
            shape,
            callback: Arc::new(callback),
        })
    }

    /// A processor for a raw regex; the shape is derived from its groups.
    pub fn pattern<F>(name: &str, pattern: &str, callback: F) -> Result<Self, ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        let (matcher, shape) = pattern::compile_raw(pattern)?;
        Ok(Self {
            name: name.to_string(),
            grammar: Grammar::default(),
            matcher,
            shape,
            callback: Arc::new(callback),
        })
    }

    /// A catch-all processor handling every unit.
    ///
    /// The callback receives the unit's name as positional argument 0, then
    /// the remaining positional items, then the `name=value` items. It always
    /// receives the context.
    pub fn switchboard<F>(name: &str, grammar: Grammar, callback: F) -> Self
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            grammar,
            matcher: Matcher::Switchboard,
            shape: ParamShape::variadic().with_context(),
            callback: Arc::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &ParamShape {
        &self.shape
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Whether this processor matches delimited units rather than a raw regex.
    pub fn is_delimited(&self) -> bool {
        self.matcher.is_delimited()
    }

    pub(crate) fn find<'t>(&self, text: &'t str) -> Vec<Match<'t>> {
        self.matcher.find(text, &self.grammar)
    }

    /// Binds one match and runs the callback. Errors carry no snippet yet.
    pub(crate) fn invoke(&self, found: &Match<'_>, context: Option<&C>) -> Result<String, ShorthandError> {
        let args = match &found.args {
            MatchedArgs::Delimited(raw) => {
                let items = binding::split_arguments(*raw, &self.grammar);
                binding::bind(&self.name, &self.shape, &items, &self.grammar)?
            }
            MatchedArgs::Captured(call) => call.clone(),
        };
        self.call(args, context)
    }

    /// Runs the callback on an already bound call.
    pub fn call(&self, args: BoundCall, context: Option<&C>) -> Result<String, ShorthandError> {
        let call = Call {
            name: &self.name,
            args,
            context: if self.shape.accepts_context() {
                context
            } else {
                None
            },
        };
        (self.callback)(&call).map_err(|e| ShorthandError::callback(&self.name, e))
    }

    pub fn substitute(&self, text: &str) -> Result<String, ShorthandError> {
        self.substitute_with(text, None)
    }

    pub fn substitute_with(&self, text: &str, context: Option<&C>) -> Result<String, ShorthandError> {
        self.substitute_counted(text, context).map(|(text, _)| text)
    }

    /// Substitutes and also reports how many matches were replaced.
    pub fn substitute_counted(
        &self,
        text: &str,
        context: Option<&C>,
    ) -> Result<(String, usize), ShorthandError> {
        let found = self.find(text);
        let mut replacements = Vec::with_capacity(found.len());
        for m in &found {
            let output = self
                .invoke(m, context)
                .map_err(|e| e.with_snippet(text, m.span))?;
            replacements.push((m.span, output));
        }
        debug!(processor = %self.name, replacements = replacements.len(), "substituted");
        Ok((splice(text, &mut replacements), found.len()))
    }

    /// Renders the unit that would bind to these arguments.
    pub fn produce(&self, positional: &[&str], named: &[(&str, &str)]) -> Result<String, ShorthandError> {
        self.produce_with(ProductionMode::Minimal, positional, named)
    }

    pub fn produce_with(
        &self,
        mode: ProductionMode,
        positional: &[&str],
        named: &[(&str, &str)],
    ) -> Result<String, ShorthandError> {
        if !matches!(self.matcher, Matcher::Shorthand { .. }) {
            return Err(err_msg!(
                Production,
                "Processor '{}' does not match a fixed shorthand name and cannot produce text",
                self.name
            ));
        }
        Producer::new(&self.name, &self.shape, &self.grammar)
            .mode(mode)
            .produce(positional, named)
    }
}

/// Replaces each span with its text. Spans must not overlap.
pub(crate) fn splice(text: &str, replacements: &mut [(Span, String)]) -> String {
    // An insertion at a span's start goes before that span's replacement.
    replacements.sort_by_key(|(span, _)| (span.start, span.end));
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (span, replacement) in replacements.iter() {
        out.push_str(&text[cursor..span.start]);
        out.push_str(replacement);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
