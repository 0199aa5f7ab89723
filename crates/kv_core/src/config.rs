//! Grammar configuration
//!
//! Tunables of the file-name grammar that are not part of a study's schema shape:
//! the multi-value separator, the processed-data suffixes appended by the data
//! pipeline, and the file extensions the ingestion side scans for.

use crate::error::ConfigError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{env, fs};

pub const GRAMMAR_CONFIG_PATH_ENV: &str = "KV_GRAMMAR_CONFIG_PATH";

pub const DEFAULT_SEPARATOR: char = '+';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GrammarConfig {
    /// Joins several sub-values inside one slot of a multi-value variable (`CMJ+SJ`).
    pub multi_value_separator: char,

    /// Trailing `_<suffix>` markers stripped from the stem before tokenizing.
    pub processed_suffixes: Vec<String>,

    /// Extensions (without dot, case-insensitive) considered data files when scanning.
    pub extensions: Vec<String>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            multi_value_separator: DEFAULT_SEPARATOR,
            processed_suffixes: vec![
                "Cinematica".to_string(),
                "Cinetica".to_string(),
                "Electromiografica".to_string(),
            ],
            extensions: vec!["txt".to_string(), "csv".to_string()],
        }
    }
}

impl GrammarConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GrammarConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sep = self.multi_value_separator;
        // ';' and '=' delimit comparison group keys
        if sep.is_whitespace() || sep.is_alphanumeric() || matches!(sep, '_' | '.' | ';' | '=') {
            return Err(ConfigError::Invalid(format!(
                "multi_value_separator '{}' must be punctuation other than '_', '.', ';' or '='",
                sep
            )));
        }

        for suffix in &self.processed_suffixes {
            if suffix.is_empty() || !suffix.chars().all(|c| c.is_alphanumeric()) {
                return Err(ConfigError::Invalid(format!(
                    "processed suffix '{}' must be a non-empty alphanumeric word",
                    suffix
                )));
            }
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("at least one extension is required".to_string()));
        }
        for ext in &self.extensions {
            if ext.is_empty() || ext.starts_with('.') || !ext.chars().all(|c| c.is_alphanumeric()) {
                return Err(ConfigError::Invalid(format!(
                    "extension '{}' must be alphanumeric and given without the leading dot",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Loads the config named by `KV_GRAMMAR_CONFIG_PATH`, falling back to the defaults
    /// when the variable is unset or blank.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let Ok(path) = env::var(GRAMMAR_CONFIG_PATH_ENV) else {
            return Ok(Self::default());
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;

        let config = Self::from_json(&content)?;
        tracing::debug!(path, "loaded grammar config from {}", GRAMMAR_CONFIG_PATH_ENV);
        Ok(config)
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GrammarConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.multi_value_separator, '+');
        assert!(config.accepts_extension("TXT"));
        assert!(!config.accepts_extension("xlsx"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GrammarConfig::from_json(r#"{ "multi_value_separator": "&" }"#).unwrap();
        assert_eq!(config.multi_value_separator, '&');
        assert_eq!(config.extensions, vec!["txt", "csv"]);
    }

    #[test]
    fn test_rejects_whitespace_separator() {
        let result = GrammarConfig::from_json(r#"{ "multi_value_separator": " " }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_group_key_delimiters() {
        for sep in [';', '=', '_'] {
            let config = GrammarConfig { multi_value_separator: sep, ..Default::default() };
            assert!(config.validate().is_err(), "separator {sep:?} should be rejected");
        }
    }

    #[test]
    fn test_rejects_dotted_extension() {
        let config = GrammarConfig { extensions: vec![".txt".to_string()], ..Default::default() };
        assert!(config.validate().is_err());
    }
}
