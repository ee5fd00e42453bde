//! Processor registry and collective substitution.
//!
//! # Registration
//!
//! | Method                | Overwrites | Error on Duplicate |
//! |-----------------------|------------|--------------------|
//! | register              | No         | Yes                |
//! | register_or_replace   | Yes        | No                 |
//! | add                   | No         | Yes                |
//! | add_or_replace        | Yes        | No                 |
//! | register!             | No         | Yes                |
//!
//! Registration order matters: it is the order processors run in within a
//! pass, and where two processors match overlapping text the earlier one wins.
//! An empty raw match inside or at the start of a claimed span counts as
//! overlapping it. Delimited processors must use the registry's grammar.
//!
//! # Passes
//!
//! Every processor matches against the text as it stood at the start of the
//! pass. Replacements are spliced in at the end of the pass, so text produced
//! in pass N is only seen by matching in pass N+1. With `recursive` set,
//! passes repeat until the text stops changing or `max_passes` is reached.
//!
//! ```rust
//! use shorthand::{ParamShape, Registry};
//! let mut registry: Registry = Registry::new();
//! registry
//!     .register("wood", ParamShape::empty(), |_| Ok("The bark is gray.".to_string()))
//!     .unwrap();
//! assert_eq!(registry.substitute("{{wood}}", None).unwrap(), "The bark is gray.");
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::processor::{splice, Call, CallbackResult, Processor};
use crate::producer::ProductionMode;
use crate::scanner::{self, Imbalance, Span};
use crate::{err_ctx, err_msg, to_error_source, ErrorType, Grammar, ParamShape, ShorthandError};

/// Default bound on recursive passes.
pub const DEFAULT_MAX_PASSES: usize = 128;

// ============================================================================
// SUBSTITUTION OPTIONS AND OUTCOME
// ============================================================================

/// What to do with units that cannot be bound or that nothing handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Abort the whole substitution with the error
    #[default]
    Propagate,
    /// Leave the unit as written and log a warning
    LeaveVerbatim,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubstitutionOptions {
    pub recursive: bool,
    pub max_passes: usize,
    /// Raise non-convergence as an error instead of reporting it.
    pub strict_convergence: bool,
    pub malformed: MalformedPolicy,
    /// Reject output with unbalanced delimiters.
    pub check_balance: bool,
}

impl Default for SubstitutionOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_passes: DEFAULT_MAX_PASSES,
            strict_convergence: false,
            malformed: MalformedPolicy::default(),
            check_balance: true,
        }
    }
}

impl SubstitutionOptions {
    /// One pass, no recursion.
    pub fn single_pass() -> Self {
        Self {
            recursive: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// The last pass changed nothing
    FixedPoint,
    /// Recursion was off; exactly one pass ran
    SinglePass,
    /// `max_passes` ran and the text was still changing
    BoundReached,
}

/// Result of a collective substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub text: String,
    pub passes: usize,
    /// Total replacements across all passes.
    pub replacements: usize,
    pub convergence: Convergence,
}

impl Substitution {
    pub fn converged(&self) -> bool {
        self.convergence != Convergence::BoundReached
    }
}

/// What one pass produced.
struct PassOutcome {
    text: String,
    replacements: usize,
    /// Units a delimited processor replaced with identical text
    unchanged: Vec<Span>,
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Ordered, uniquely named set of processors sharing a context type.
pub struct Registry<C = ()> {
    grammar: Grammar,
    processors: Vec<Processor<C>>,
    index: HashMap<String, usize>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::with_grammar(Grammar::default())
    }
}

impl<C> std::fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("grammar", &self.grammar)
            .field("processors", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose shorthand processors all use `grammar`.
    pub fn with_grammar(grammar: Grammar) -> Self {
        Self {
            grammar,
            processors: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    // --- Registration ---

    /// Registers a shorthand processor for `name`.
    ///
    /// # Errors
    /// Fails if `name` is already registered or is not a valid callback name.
    pub fn register<F>(&mut self, name: &str, shape: ParamShape, callback: F) -> Result<(), ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        self.ensure_free(name)?;
        let processor = Processor::shorthand_with_grammar(self.grammar.clone(), name, shape, callback)?;
        self.add(processor)
    }

    /// Registers a shorthand processor, replacing any existing one in place.
    ///
    /// # Returns
    /// The replaced processor, if there was one. A replacement keeps the
    /// original registration position.
    pub fn register_or_replace<F>(
        &mut self,
        name: &str,
        shape: ParamShape,
        callback: F,
    ) -> Result<Option<Processor<C>>, ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        let processor = Processor::shorthand_with_grammar(self.grammar.clone(), name, shape, callback)?;
        self.add_or_replace(processor)
    }

    /// Registers a raw regex processor.
    pub fn register_pattern<F>(&mut self, name: &str, pattern: &str, callback: F) -> Result<(), ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        self.ensure_free(name)?;
        self.add(Processor::pattern(name, pattern, callback)?)
    }

    /// Registers a processor that handles every unit in the registry grammar.
    ///
    /// Register it last: it matches every unit, so any processor registered
    /// after it never sees a delimited unit.
    pub fn register_switchboard<F>(&mut self, name: &str, callback: F) -> Result<(), ShorthandError>
    where
        F: Fn(&Call<'_, C>) -> CallbackResult + Send + Sync + 'static,
    {
        self.ensure_free(name)?;
        self.add(Processor::switchboard(name, self.grammar.clone(), callback))
    }

    /// Adds a prebuilt processor under its own name.
    ///
    /// # Errors
    /// Fails if the name is taken, or if the processor matches units in a
    /// grammar other than the registry's.
    pub fn add(&mut self, processor: Processor<C>) -> Result<(), ShorthandError> {
        self.ensure_free(processor.name())?;
        self.ensure_grammar(&processor)?;
        debug!(name = processor.name(), position = self.processors.len(), "registered processor");
        self.index.insert(processor.name().to_string(), self.processors.len());
        self.processors.push(processor);
        Ok(())
    }

    pub fn add_or_replace(&mut self, processor: Processor<C>) -> Result<Option<Processor<C>>, ShorthandError> {
        self.ensure_grammar(&processor)?;
        match self.index.get(processor.name()) {
            Some(&position) => {
                debug!(name = processor.name(), position, "replaced processor");
                Ok(Some(std::mem::replace(&mut self.processors[position], processor)))
            }
            None => {
                self.index.insert(processor.name().to_string(), self.processors.len());
                self.processors.push(processor);
                Ok(None)
            }
        }
    }

    /// Removes a processor by name. Later processors move up one position.
    pub fn unregister(&mut self, name: &str) -> Option<Processor<C>> {
        let position = self.index.remove(name)?;
        let removed = self.processors.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Unit checks scan with the registry grammar, so every delimited
    /// processor must share it. Raw processors never scan units.
    fn ensure_grammar(&self, processor: &Processor<C>) -> Result<(), ShorthandError> {
        if processor.is_delimited() && processor.grammar() != &self.grammar {
            return Err(err_msg!(
                Registry,
                "'{}' uses the delimiters '{}' '{}' but this registry uses '{}' '{}'",
                processor.name(),
                processor.grammar().lead_in(),
                processor.grammar().lead_out(),
                self.grammar.lead_in(),
                self.grammar.lead_out()
            ));
        }
        Ok(())
    }

    fn ensure_free(&self, name: &str) -> Result<(), ShorthandError> {
        if self.index.contains_key(name) {
            return Err(err_msg!(Registry, "'{}' is already registered", name));
        }
        Ok(())
    }

    // --- Lookup ---

    pub fn get(&self, name: &str) -> Option<&Processor<C>> {
        self.index.get(name).map(|&i| &self.processors[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processors.iter().map(|p| p.name())
    }

    pub fn processors(&self) -> impl Iterator<Item = &Processor<C>> {
        self.processors.iter()
    }

    // --- Production ---

    /// Renders the unit that calls `name` with these arguments.
    pub fn produce(&self, name: &str, positional: &[&str], named: &[(&str, &str)]) -> Result<String, ShorthandError> {
        self.produce_with(ProductionMode::Minimal, name, positional, named)
    }

    pub fn produce_with(
        &self,
        mode: ProductionMode,
        name: &str,
        positional: &[&str],
        named: &[(&str, &str)],
    ) -> Result<String, ShorthandError> {
        let processor = self
            .get(name)
            .ok_or_else(|| err_msg!(UnknownShorthand, "No processor named '{}' is registered", name))?;
        processor.produce_with(mode, positional, named)
    }

    // --- Substitution ---

    /// Recursive substitution with default options.
    pub fn substitute(&self, text: &str, context: Option<&C>) -> Result<String, ShorthandError> {
        self.collective_substitute(text, context, &SubstitutionOptions::default())
            .map(|outcome| outcome.text)
    }

    /// Applies every processor to `text`, pass after pass.
    pub fn collective_substitute(
        &self,
        text: &str,
        context: Option<&C>,
        options: &SubstitutionOptions,
    ) -> Result<Substitution, ShorthandError> {
        let max_passes = options.max_passes.max(1);
        let mut current = text.to_string();
        let mut passes = 0;
        let mut replacements = 0;

        let mut unchanged: Vec<Span>;
        let convergence = loop {
            passes += 1;
            let outcome = self.pass(&current, context, options)?;
            debug!(pass = passes, replacements = outcome.replacements, "substitution pass");
            replacements += outcome.replacements;
            let changed = outcome.text != current;
            current = outcome.text;
            unchanged = outcome.unchanged;
            if !options.recursive {
                break Convergence::SinglePass;
            }
            if !changed {
                break Convergence::FixedPoint;
            }
            if passes >= max_passes {
                break Convergence::BoundReached;
            }
        };

        match convergence {
            Convergence::BoundReached if options.strict_convergence => {
                return Err(ShorthandError::non_convergence(passes));
            }
            Convergence::BoundReached => {
                warn!(passes, "substitution did not reach a fixed point");
            }
            Convergence::FixedPoint => {
                self.check_unchanged(&current, &unchanged, options)?;
                self.check_unknown(&current, options)?;
                self.check_balance(&current, options)?;
            }
            Convergence::SinglePass => self.check_balance(&current, options)?,
        }

        Ok(Substitution {
            text: current,
            passes,
            replacements,
            convergence,
        })
    }

    /// One pass: match everything against `text`, call back, splice.
    fn pass(
        &self,
        text: &str,
        context: Option<&C>,
        options: &SubstitutionOptions,
    ) -> Result<PassOutcome, ShorthandError> {
        let mut claimed: Vec<(Span, String)> = Vec::new();
        let mut unchanged = Vec::new();
        for processor in &self.processors {
            for found in processor.find(text) {
                if claimed.iter().any(|(span, _)| span.overlaps(&found.span)) {
                    continue;
                }
                match processor.invoke(&found, context) {
                    Ok(output) => {
                        if processor.is_delimited() && output == text[found.span.start..found.span.end] {
                            unchanged.push(found.span);
                        }
                        claimed.push((found.span, output));
                    }
                    Err(e)
                        if e.error_type() == ErrorType::Binding
                            && options.malformed == MalformedPolicy::LeaveVerbatim =>
                    {
                        let unit = &text[found.span.start..found.span.end];
                        warn!(processor = processor.name(), unit, "left verbatim: {}", e);
                    }
                    Err(e) => return Err(e.with_snippet(text, found.span)),
                }
            }
        }
        let replacements = claimed.len();
        Ok(PassOutcome {
            text: splice(text, &mut claimed),
            replacements,
            unchanged,
        })
    }

    fn has_delimited(&self) -> bool {
        self.processors.iter().any(|p| p.is_delimited())
    }

    /// Units whose callback returned the unit itself in the final pass.
    ///
    /// The text stops changing, but only because the unit re-triggers its
    /// own processor; nothing was actually substituted.
    fn check_unchanged(
        &self,
        text: &str,
        unchanged: &[Span],
        options: &SubstitutionOptions,
    ) -> Result<(), ShorthandError> {
        let Some(&span) = unchanged.first() else {
            return Ok(());
        };
        let unit = &text[span.start..span.end];
        match options.malformed {
            MalformedPolicy::Propagate => {
                let src = to_error_source(text);
                Err(err_ctx!(
                    UnknownShorthand,
                    format!("unable to substitute for '{}'", unit),
                    &src,
                    span,
                    "the callback returned its own unit unchanged"
                ))
            }
            MalformedPolicy::LeaveVerbatim => {
                warn!(unit, "unit substitutes to itself; left verbatim");
                Ok(())
            }
        }
    }

    /// Units left at a fixed point that no processor matches.
    fn check_unknown(&self, text: &str, options: &SubstitutionOptions) -> Result<(), ShorthandError> {
        if !self.has_delimited() {
            return Ok(());
        }
        let handled: HashSet<Span> = self
            .processors
            .iter()
            .filter(|p| p.is_delimited())
            .flat_map(|p| p.find(text))
            .map(|m| m.span)
            .collect();
        let Some(unit) = scanner::units(text, &self.grammar)
            .into_iter()
            .find(|unit| !handled.contains(&unit.span))
        else {
            return Ok(());
        };
        match options.malformed {
            MalformedPolicy::Propagate => {
                let src = to_error_source(text);
                Err(err_ctx!(
                    UnknownShorthand,
                    format!("no processor handles '{}'", unit.inner),
                    &src,
                    unit.span,
                    format!("registered: {}", self.names().collect::<Vec<_>>().join(", "))
                ))
            }
            MalformedPolicy::LeaveVerbatim => {
                warn!(unit = unit.inner, "unknown shorthand left verbatim");
                Ok(())
            }
        }
    }

    fn check_balance(&self, text: &str, options: &SubstitutionOptions) -> Result<(), ShorthandError> {
        if !options.check_balance || !self.has_delimited() {
            return Ok(());
        }
        let Some(imbalance) = scanner::find_imbalance(text, &self.grammar) else {
            return Ok(());
        };
        let (span, message) = match imbalance {
            Imbalance::Unclosed(span) => (span, format!("'{}' is never closed", self.grammar.lead_in())),
            Imbalance::Unopened(span) => (span, format!("'{}' closes nothing", self.grammar.lead_out())),
        };
        match options.malformed {
            MalformedPolicy::Propagate => {
                error!(start = span.start, "{}", message);
                let src = to_error_source(text);
                Err(err_ctx!(
                    OpenShorthand,
                    message,
                    &src,
                    span,
                    format!("escape literal delimiters as {}{}", self.grammar.escape(), self.grammar.lead_in())
                ))
            }
            MalformedPolicy::LeaveVerbatim => {
                warn!(start = span.start, "{}", message);
                Ok(())
            }
        }
    }
}

/// Registers a function item under its own identifier.
///
/// ```rust
/// use shorthand::{register, Call, CallbackResult, ParamShape, Registry};
/// fn wood(_: &Call<'_, ()>) -> CallbackResult {
///     Ok("The bark is gray.".to_string())
/// }
/// let mut registry: Registry = Registry::new();
/// register!(registry, wood).unwrap();
/// assert!(registry.contains("wood"));
/// ```
#[macro_export]
macro_rules! register {
    ($registry:expr, $func:ident) => {
        $registry.register(stringify!($func), $crate::ParamShape::empty(), $func)
    };
    ($registry:expr, $func:ident, $shape:expr) => {
        $registry.register(stringify!($func), $shape, $func)
    };
}

#[cfg(test)]
mod registry_tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn constant(text: &'static str) -> impl Fn(&Call<'_, ()>) -> CallbackResult + Send + Sync + 'static {
        move |_| Ok(text.to_string())
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry: Registry = Registry::new();
        registry.register("a", ParamShape::empty(), constant("1")).unwrap();
        let err = registry.register("a", ParamShape::empty(), constant("2")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Registry);
        let old = registry.register_or_replace("a", ParamShape::empty(), constant("2")).unwrap();
        assert!(old.is_some());
        assert_eq!(registry.substitute("{{a}}", None).unwrap(), "2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_keeps_order() {
        let mut registry: Registry = Registry::new();
        for name in ["a", "b", "c"] {
            registry.register(name, ParamShape::empty(), constant("x")).unwrap();
        }
        assert!(registry.unregister("a").is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(registry.get("c").unwrap().name(), "c");
        assert!(registry.unregister("a").is_none());
    }

    #[test]
    fn test_earlier_registration_wins_overlap() {
        let mut registry: Registry = Registry::new();
        registry.register_pattern("digits", "[0-9]+", constant("#")).unwrap();
        registry.register_pattern("pairs", "[0-9][a-z]", constant("@")).unwrap();
        let outcome = registry
            .collective_substitute("12a b3c", None, &SubstitutionOptions::single_pass())
            .unwrap();
        assert_eq!(outcome.text, "#a b#c");
    }

    #[test]
    fn test_pass_sees_only_start_text() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry: Registry = Registry::new();
        let log = Arc::clone(&calls);
        registry
            .register("a", ParamShape::empty(), move |_| {
                log.lock().unwrap().push("a");
                Ok("{{b}}".to_string())
            })
            .unwrap();
        let log = Arc::clone(&calls);
        registry
            .register("b", ParamShape::empty(), move |_| {
                log.lock().unwrap().push("b");
                Ok("done".to_string())
            })
            .unwrap();
        let outcome = registry
            .collective_substitute("{{a}}", None, &SubstitutionOptions::single_pass())
            .unwrap();
        assert_eq!(outcome.text, "{{b}}");
        assert_eq!(*calls.lock().unwrap(), vec!["a"]);
        assert_eq!(registry.substitute("{{a}}", None).unwrap(), "done");
    }

    #[test]
    fn test_unknown_unit_at_fixed_point() {
        let mut registry: Registry = Registry::new();
        registry.register("a", ParamShape::empty(), constant("x")).unwrap();
        let err = registry.substitute("{{a}} {{zzz}}", None).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnknownShorthand);

        let options = SubstitutionOptions {
            malformed: MalformedPolicy::LeaveVerbatim,
            ..SubstitutionOptions::default()
        };
        let outcome = registry.collective_substitute("{{a}} {{zzz}}", None, &options).unwrap();
        assert_eq!(outcome.text, "x {{zzz}}");
    }

    #[test]
    fn test_open_shorthand_reported() {
        let mut registry: Registry = Registry::new();
        registry.register("a", ParamShape::empty(), constant("{{")).unwrap();
        let err = registry.substitute("{{a}}", None).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::OpenShorthand);
        let options = SubstitutionOptions {
            check_balance: false,
            ..SubstitutionOptions::default()
        };
        assert_eq!(registry.collective_substitute("{{a}}", None, &options).unwrap().text, "{{");
    }

    #[test]
    fn test_raw_only_registry_skips_unit_checks() {
        let mut registry: Registry = Registry::new();
        registry.register_pattern("b", "b", constant("bb")).unwrap();
        let outcome = registry
            .collective_substitute("{{abc", None, &SubstitutionOptions::single_pass())
            .unwrap();
        assert_eq!(outcome.text, "{{abbc");
    }

    #[test]
    fn test_add_rejects_foreign_grammar() {
        let square = Grammar::builder().lead_in("[[").lead_out("]]").build().unwrap();
        let mut registry: Registry = Registry::new();
        let foreign: Processor = Processor::shorthand_with_grammar(square.clone(), "a", ParamShape::empty(), constant("1")).unwrap();
        assert_eq!(registry.add(foreign).unwrap_err().error_type(), ErrorType::Registry);
        let foreign: Processor = Processor::shorthand_with_grammar(square, "a", ParamShape::empty(), constant("1")).unwrap();
        assert_eq!(registry.add_or_replace(foreign).unwrap_err().error_type(), ErrorType::Registry);
        assert!(registry.is_empty());

        let raw: Processor = Processor::pattern("raw", "b", constant("c")).unwrap();
        registry.add(raw).unwrap();
        let native: Processor = Processor::shorthand("a", ParamShape::empty(), constant("1")).unwrap();
        assert!(registry.add_or_replace(native).unwrap().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_produce_unknown_name() {
        let registry: Registry = Registry::new();
        let err = registry.produce("nothing", &[], &[]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnknownShorthand);
    }
}
