//! Engine configuration: grammar plus substitution options.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```yaml
//! grammar:
//!   lead_in: "[["
//!   lead_out: "]]"
//! substitution:
//!   max_passes: 16
//!   malformed: leave_verbatim
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ErrorContext, Grammar, Registry, ShorthandError, SubstitutionOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub grammar: Grammar,
    pub substitution: SubstitutionOptions,
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ShorthandError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| config_error("YAML", e))
    }

    pub fn from_json_str(text: &str) -> Result<Self, ShorthandError> {
        serde_json::from_str(text).map_err(|e| config_error("JSON", e))
    }

    /// Loads a config file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self, ShorthandError> {
        let text = fs::read_to_string(path).map_err(|e| ShorthandError::Config {
            message: format!("Cannot read '{}': {}", path.display(), e),
            ctx: ErrorContext::none(),
            source: Some(Box::new(e)),
        })?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// An empty registry using this config's grammar.
    pub fn registry<C>(&self) -> Registry<C> {
        Registry::with_grammar(self.grammar.clone())
    }
}

fn config_error<E>(format: &str, error: E) -> ShorthandError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ShorthandError::Config {
        message: format!("Invalid {} config: {}", format, error),
        ctx: ErrorContext::none(),
        source: Some(Box::new(error)),
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use crate::{ErrorType, MalformedPolicy};

    #[test]
    fn test_empty_yaml_is_default() {
        let config = EngineConfig::from_yaml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.grammar.lead_in(), "{{");
    }

    #[test]
    fn test_partial_yaml() {
        let config = EngineConfig::from_yaml_str(
            "grammar:\n  lead_in: \"[[\"\n  lead_out: \"]]\"\nsubstitution:\n  max_passes: 16\n  malformed: leave_verbatim\n",
        )
        .unwrap();
        assert_eq!(config.grammar.lead_in(), "[[");
        assert_eq!(config.grammar.separator(), '|');
        assert_eq!(config.substitution.max_passes, 16);
        assert!(config.substitution.recursive);
        assert_eq!(config.substitution.malformed, MalformedPolicy::LeaveVerbatim);
    }

    #[test]
    fn test_invalid_grammar_rejected() {
        let err = EngineConfig::from_json_str(r#"{"grammar": {"separator": "="}}"#).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("must all differ"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(EngineConfig::from_yaml_str("grammer: {}\n").is_err());
    }
}
